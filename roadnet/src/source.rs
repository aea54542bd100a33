//! Sources of raw OSM data.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bbox::BoundingBox;
use crate::error::Result;
use crate::network::NetworkType;
use crate::osm::OsmResponse;

/// Something that can provide OSM elements for a bounding box.
///
/// Implementations may return more than was asked for; the pipeline filters
/// ways by network type and crops nodes to the box afterwards.
pub trait OsmSource: Send + Sync {
    /// Fetch the ways (and their nodes) of `network` inside `bbox`.
    fn fetch(&self, bbox: &BoundingBox, network: NetworkType) -> Result<OsmResponse>;

    /// Short human-readable description, for logs.
    fn describe(&self) -> String;
}

impl<T: OsmSource + ?Sized> OsmSource for Arc<T> {
    fn fetch(&self, bbox: &BoundingBox, network: NetworkType) -> Result<OsmResponse> {
        (**self).fetch(bbox, network)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Serves a saved Overpass JSON response from disk.
///
/// The file is re-read on every fetch, so it can be replaced while a
/// service is running.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a source reading from `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The file this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OsmSource for FileSource {
    fn fetch(&self, _bbox: &BoundingBox, _network: NetworkType) -> Result<OsmResponse> {
        let file = File::open(self.path())?;
        OsmResponse::from_reader(BufReader::new(file))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path().display())
    }
}
