pub mod graph;
pub mod info;
pub mod query_string;

use roadnet::overpass::OverpassConfig;
use roadnet::{FileSource, RoadGraphServiceBuilder};
use std::path::PathBuf;

/// Where OSM data comes from.
pub struct SourceArgs {
    pub osm_file: Option<PathBuf>,
    pub overpass_url: Option<String>,
    pub timeout: u64,
}

impl SourceArgs {
    /// A builder over the saved file if given, else over Overpass.
    pub fn builder(self) -> RoadGraphServiceBuilder {
        match self.osm_file {
            Some(path) => RoadGraphServiceBuilder::new(FileSource::new(path)),
            None => {
                let mut config = OverpassConfig::default().with_timeout(self.timeout);
                if let Some(url) = self.overpass_url {
                    config = config.with_endpoint(url);
                }
                RoadGraphServiceBuilder::overpass(config)
            }
        }
    }
}
