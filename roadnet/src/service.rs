//! High-level road network extraction.
//!
//! [`RoadGraphService`] ties the pipeline together: fetch OSM data for a
//! slightly enlarged box, build the graph, simplify it, then crop it back
//! to the requested box and keep its largest connected part.
//!
//! ```ignore
//! use roadnet::{BoundingBox, NetworkType, RoadGraphServiceBuilder};
//! use roadnet::overpass::OverpassConfig;
//!
//! let service = RoadGraphServiceBuilder::overpass(OverpassConfig::default()).build();
//! let bbox = BoundingBox::new(45.08, 45.06, 7.69, 7.67);
//! let graph = service.graph_from_bbox(&bbox, NetworkType::Drive, true)?;
//! println!("{} intersections", graph.node_count());
//! ```

use std::time::Instant;

use crate::bbox::BoundingBox;
use crate::build::build_graph;
use crate::error::{Result, RoadnetError};
use crate::graph::RoadGraph;
use crate::network::NetworkType;
use crate::simplify::simplify_graph;
use crate::source::{FileSource, OsmSource};
use crate::truncate::{retain_largest_component, street_counts, truncate_to_bbox};

#[cfg(feature = "download")]
use crate::overpass::{OverpassConfig, OverpassSource};

/// Default distance in meters by which the download box is enlarged.
///
/// Simplifying on a larger area keeps streets that cross the box edge from
/// being cut at arbitrary shape points.
pub const DEFAULT_BUFFER_METERS: f64 = 500.0;

/// Default maximum side length in meters of a single data source query.
///
/// Larger boxes are split into a grid of sub-boxes that are fetched one by
/// one, which keeps each Overpass query within the server's time and memory
/// limits.
pub const DEFAULT_MAX_QUERY_SIDE_METERS: f64 = 50_000.0;

/// Extracts road networks for bounding boxes.
pub struct RoadGraphService {
    source: Box<dyn OsmSource>,
    buffer_meters: f64,
    max_query_side_meters: f64,
    strict: bool,
}

impl RoadGraphService {
    /// Create a service with default settings over `source`.
    pub fn new(source: impl OsmSource + 'static) -> Self {
        RoadGraphServiceBuilder::new(source).build()
    }

    /// Create a builder for more configuration options.
    pub fn builder(source: impl OsmSource + 'static) -> RoadGraphServiceBuilder {
        RoadGraphServiceBuilder::new(source)
    }

    /// Build the street graph of `network` inside `bbox`.
    ///
    /// # Errors
    ///
    /// A bound that is NaN or infinite, any failure of the data source, an
    /// empty response, or a box that contains no graph nodes.
    pub fn graph_from_bbox(
        &self,
        bbox: &BoundingBox,
        network: NetworkType,
        simplify: bool,
    ) -> Result<RoadGraph> {
        if !bbox.is_finite() {
            return Err(RoadnetError::NonFiniteBbox);
        }

        let start = Instant::now();
        let buffered = bbox.buffered(self.buffer_meters);

        let cells = buffered.subdivide(self.max_query_side_meters);
        if cells.len() > 1 {
            tracing::info!(sub_boxes = cells.len(), "Splitting query area");
        }
        let responses = cells
            .iter()
            .map(|cell| self.source.fetch(cell, network))
            .collect::<Result<Vec<_>>>()?;

        let mut graph = build_graph(&responses, network)?;
        truncate_to_bbox(&mut graph, &buffered)?;

        if simplify {
            simplify_graph(&mut graph, self.strict)?;
        }

        // counted before cropping so streets leaving the box still count
        let counts = street_counts(&graph);

        truncate_to_bbox(&mut graph, bbox)?;
        retain_largest_component(&mut graph);

        let ids: Vec<_> = graph.nodes().map(|(id, _)| id).collect();
        for id in ids {
            if let Some(node) = graph.node_mut(id) {
                node.street_count = counts.get(&id).copied();
            }
        }

        tracing::info!(
            network = %network,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Extracted road graph"
        );

        Ok(graph)
    }

    /// Extract the graph and serialize its edges as GeoJSON.
    #[cfg(feature = "geojson")]
    pub fn edges_geojson(
        &self,
        bbox: &BoundingBox,
        network: NetworkType,
        simplify: bool,
    ) -> Result<String> {
        let graph = self.graph_from_bbox(bbox, network, simplify)?;
        let (_nodes, edges) = crate::export::graph_to_tables(&graph)?;
        edges.to_geojson_string()
    }

    /// Description of the data source, for logs.
    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    /// Distance the download box is enlarged by, in meters.
    pub fn buffer_meters(&self) -> f64 {
        self.buffer_meters
    }

    /// Maximum side length of a single query, in meters.
    pub fn max_query_side_meters(&self) -> f64 {
        self.max_query_side_meters
    }

    /// Whether strict simplification is used.
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

/// Builder for creating [`RoadGraphService`] with custom configuration.
///
/// # Example
///
/// ```ignore
/// use roadnet::{FileSource, RoadGraphServiceBuilder};
///
/// let service = RoadGraphServiceBuilder::new(FileSource::new("turin.json"))
///     .buffer_meters(250.0)
///     .strict(false)
///     .build();
/// ```
pub struct RoadGraphServiceBuilder {
    source: Box<dyn OsmSource>,
    buffer_meters: f64,
    max_query_side_meters: f64,
    strict: bool,
}

impl RoadGraphServiceBuilder {
    /// Create a builder over the given data source.
    pub fn new(source: impl OsmSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            buffer_meters: DEFAULT_BUFFER_METERS,
            max_query_side_meters: DEFAULT_MAX_QUERY_SIDE_METERS,
            strict: true,
        }
    }

    /// Create a builder querying an Overpass server.
    #[cfg(feature = "download")]
    pub fn overpass(config: OverpassConfig) -> Self {
        Self::new(OverpassSource::new(config))
    }

    /// Create a builder from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `ROADNET_OSM_FILE` | Serve a saved Overpass response instead of querying | None |
    /// | `ROADNET_OVERPASS_URL` | Overpass interpreter endpoint | overpass-api.de |
    /// | `ROADNET_OVERPASS_TIMEOUT` | Query timeout in seconds | 180 |
    /// | `ROADNET_OVERPASS_RETRIES` | Retries on busy responses | 2 |
    /// | `ROADNET_BUFFER_METERS` | Download box buffer | 500 |
    /// | `ROADNET_MAX_QUERY_SIDE_METERS` | Largest side of a single query | 50000 |
    ///
    /// # Errors
    ///
    /// Without the `download` feature, returns an error if
    /// `ROADNET_OSM_FILE` is not set.
    pub fn from_env() -> Result<Self> {
        let builder = match std::env::var("ROADNET_OSM_FILE") {
            Ok(path) => Self::new(FileSource::new(path)),
            Err(_) => Self::network_from_env()?,
        };

        let buffer_meters = parse_env("ROADNET_BUFFER_METERS").unwrap_or(DEFAULT_BUFFER_METERS);
        let max_side = parse_env("ROADNET_MAX_QUERY_SIDE_METERS")
            .unwrap_or(DEFAULT_MAX_QUERY_SIDE_METERS);

        Ok(builder
            .buffer_meters(buffer_meters)
            .max_query_side_meters(max_side))
    }

    #[cfg(feature = "download")]
    fn network_from_env() -> Result<Self> {
        let mut config = OverpassConfig::default();
        if let Ok(url) = std::env::var("ROADNET_OVERPASS_URL") {
            config = config.with_endpoint(url);
        }
        if let Some(timeout) = parse_env("ROADNET_OVERPASS_TIMEOUT") {
            config = config.with_timeout(timeout);
        }
        if let Some(retries) = parse_env("ROADNET_OVERPASS_RETRIES") {
            config = config.with_max_retries(retries);
        }
        Ok(Self::overpass(config))
    }

    #[cfg(not(feature = "download"))]
    fn network_from_env() -> Result<Self> {
        Err(RoadnetError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "ROADNET_OSM_FILE environment variable not set",
        )))
    }

    /// Set the download buffer distance in meters.
    pub fn buffer_meters(mut self, meters: f64) -> Self {
        self.buffer_meters = meters;
        self
    }

    /// Set the largest side of a single query in meters.
    pub fn max_query_side_meters(mut self, meters: f64) -> Self {
        self.max_query_side_meters = meters;
        self
    }

    /// Enable or disable strict simplification.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Build the service.
    pub fn build(self) -> RoadGraphService {
        RoadGraphService {
            source: self.source,
            buffer_meters: self.buffer_meters,
            max_query_side_meters: self.max_query_side_meters,
            strict: self.strict,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::OsmResponse;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::NamedTempFile;

    /// Main Street runs 1-2-3-5 (two-way); Side Street 3-4-6 (one-way);
    /// a far-away residential pair 10-11 forms a separate island.
    const DISTRICT: &str = r#"{"elements": [
        {"type": "node", "id": 1, "lat": 45.000, "lon": 7.000},
        {"type": "node", "id": 2, "lat": 45.000, "lon": 7.001},
        {"type": "node", "id": 3, "lat": 45.000, "lon": 7.002},
        {"type": "node", "id": 5, "lat": 45.000, "lon": 7.003},
        {"type": "node", "id": 4, "lat": 45.001, "lon": 7.002},
        {"type": "node", "id": 6, "lat": 45.002, "lon": 7.002},
        {"type": "node", "id": 10, "lat": 45.004, "lon": 7.004},
        {"type": "node", "id": 11, "lat": 45.004, "lon": 7.005},
        {"type": "way", "id": 100, "nodes": [1, 2, 3, 5],
         "tags": {"highway": "residential", "name": "Main Street"}},
        {"type": "way", "id": 200, "nodes": [3, 4, 6],
         "tags": {"highway": "tertiary", "name": "Side Street", "oneway": "yes"}},
        {"type": "way", "id": 300, "nodes": [10, 11],
         "tags": {"highway": "residential"}}
    ]}"#;

    fn district_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(DISTRICT.as_bytes()).unwrap();
        file
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(45.01, 44.99, 7.01, 6.99)
    }

    #[test]
    fn test_graph_from_bbox_simplified() {
        let file = district_file();
        let service = RoadGraphService::new(FileSource::new(file.path()));

        let graph = service
            .graph_from_bbox(&bbox(), NetworkType::Drive, true)
            .unwrap();

        assert!(graph.is_simplified());
        // island 10-11 dropped, shape points 2 and 4 merged away
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 5);
        assert_eq!(graph.node(3).unwrap().street_count, Some(3));
        assert_eq!(graph.node(1).unwrap().street_count, Some(1));
    }

    #[test]
    fn test_graph_from_bbox_unsimplified() {
        let file = district_file();
        let service = RoadGraphService::new(FileSource::new(file.path()));

        let graph = service
            .graph_from_bbox(&bbox(), NetworkType::Drive, false)
            .unwrap();

        assert!(!graph.is_simplified());
        assert_eq!(graph.node_count(), 6);
        assert_eq!(graph.edge_count(), 8);
    }

    #[test]
    fn test_crop_to_requested_box() {
        let file = district_file();
        let service = RoadGraphService::builder(FileSource::new(file.path()))
            .buffer_meters(0.0)
            .build();

        // only the western half of Main Street
        let bbox = BoundingBox::new(45.0005, 44.9995, 7.0025, 6.9995);
        let graph = service
            .graph_from_bbox(&bbox, NetworkType::Drive, true)
            .unwrap();

        assert!(graph.contains_node(1));
        assert!(graph.contains_node(3));
        assert!(!graph.contains_node(5));
        assert!(!graph.contains_node(6));
    }

    #[test]
    fn test_box_without_nodes_is_error() {
        let file = district_file();
        let service = RoadGraphService::new(FileSource::new(file.path()));

        let far_away = BoundingBox::new(10.01, 10.0, 10.01, 10.0);
        let result = service.graph_from_bbox(&far_away, NetworkType::Drive, true);
        assert!(matches!(result, Err(RoadnetError::NoNodesInBbox)));
    }

    #[test]
    fn test_empty_response_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"elements": []}"#).unwrap();
        let service = RoadGraphService::new(FileSource::new(file.path()));

        let result = service.graph_from_bbox(&bbox(), NetworkType::Drive, true);
        assert!(matches!(result, Err(RoadnetError::EmptyResponse)));
    }

    #[test]
    fn test_non_finite_box_is_error() {
        let file = district_file();
        let service = RoadGraphService::new(FileSource::new(file.path()));

        for bbox in [
            BoundingBox::new(f64::INFINITY, 44.99, 7.01, 6.99),
            BoundingBox::new(f64::NAN, 44.99, 7.01, 6.99),
            BoundingBox::new(45.01, 44.99, 7.01, f64::NEG_INFINITY),
        ] {
            let result = service.graph_from_bbox(&bbox, NetworkType::Drive, true);
            assert!(matches!(result, Err(RoadnetError::NonFiniteBbox)));
        }
    }

    /// Records every box it is asked for and serves the same file each time.
    struct RecordingSource {
        file: FileSource,
        requested: Mutex<Vec<BoundingBox>>,
    }

    impl OsmSource for RecordingSource {
        fn fetch(&self, bbox: &BoundingBox, network: NetworkType) -> Result<OsmResponse> {
            self.requested.lock().unwrap().push(*bbox);
            self.file.fetch(bbox, network)
        }

        fn describe(&self) -> String {
            "recording".to_string()
        }
    }

    #[test]
    fn test_large_box_is_fetched_in_sub_boxes() {
        let file = district_file();
        let source = Arc::new(RecordingSource {
            file: FileSource::new(file.path()),
            requested: Mutex::new(Vec::new()),
        });

        let service = RoadGraphService::builder(Arc::clone(&source))
            .max_query_side_meters(1_000.0)
            .build();
        let graph = service
            .graph_from_bbox(&bbox(), NetworkType::Drive, true)
            .unwrap();

        let requested = source.requested.lock().unwrap();
        assert!(requested.len() > 1);
        let buffered = bbox().buffered(DEFAULT_BUFFER_METERS);
        assert_eq!(requested[0].south, buffered.south);
        assert_eq!(requested[requested.len() - 1].north, buffered.north);

        // every sub-box returned the whole file; repeated ways must not
        // turn into parallel edges
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 5);
    }

    #[cfg(feature = "geojson")]
    #[test]
    fn test_edges_geojson() {
        let file = district_file();
        let service = RoadGraphService::new(FileSource::new(file.path()));

        let json = service
            .edges_geojson(&bbox(), NetworkType::Drive, true)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_builder_defaults() {
        let service = RoadGraphService::new(FileSource::new("unused.json"));
        assert_eq!(service.buffer_meters(), DEFAULT_BUFFER_METERS);
        assert_eq!(service.max_query_side_meters(), DEFAULT_MAX_QUERY_SIDE_METERS);
        assert!(service.is_strict());
        assert!(service.source_description().contains("unused.json"));
    }

    #[test]
    fn test_from_env_prefers_osm_file() {
        let original = std::env::var("ROADNET_OSM_FILE").ok();
        std::env::set_var("ROADNET_OSM_FILE", "/tmp/roadnet-test.json");

        let service = RoadGraphServiceBuilder::from_env().unwrap().build();
        assert!(service
            .source_description()
            .contains("/tmp/roadnet-test.json"));

        match original {
            Some(v) => std::env::set_var("ROADNET_OSM_FILE", v),
            None => std::env::remove_var("ROADNET_OSM_FILE"),
        }
    }
}
