//! # roadnet - OpenStreetMap Road Network Library
//!
//! Builds routable street graphs from OpenStreetMap data and exports them as
//! GeoJSON.
//!
//! ## Features
//!
//! - **Network filters**: drive, drive_service, walk, bike, all, all_private
//! - **Topology simplification**: merges shape points into curved edges
//! - **Deterministic output**: ordered graphs serialize to identical bytes
//! - **Pluggable sources**: query Overpass, or replay a saved response
//!
//! ## Quick Start
//!
//! ```ignore
//! use roadnet::{BoundingBox, FileSource, NetworkType, RoadGraphService};
//!
//! let service = RoadGraphService::new(FileSource::new("turin.json"));
//! let bbox = BoundingBox::new(45.08, 45.06, 7.69, 7.67);
//! let graph = service.graph_from_bbox(&bbox, NetworkType::Drive, true)?;
//! println!("{} nodes, {} edges", graph.node_count(), graph.edge_count());
//! ```
//!
//! ## Pipeline
//!
//! 1. Enlarge the box by a buffer and fetch the matching ways with their nodes,
//!    one sub-box at a time for large areas
//! 2. Split ways into directed edges, adding the reverse of two-way streets
//! 3. Crop to the enlarged box and simplify
//! 4. Crop to the requested box and keep the largest connected part
//!
//! ## Cargo Features
//!
//! - `download`: Overpass API client (uses `reqwest`)
//! - `geojson`: node and edge tables with GeoJSON export

pub mod bbox;
pub mod build;
pub mod distance;
pub mod error;
pub mod graph;
pub mod network;
pub mod osm;
pub mod service;
pub mod simplify;
pub mod source;
pub mod truncate;

#[cfg(feature = "download")]
pub mod overpass;

#[cfg(feature = "geojson")]
pub mod export;

// Re-export main types at crate root for convenience
pub use bbox::BoundingBox;
pub use error::{Result, RoadnetError};
pub use graph::RoadGraph;
pub use network::NetworkType;
pub use service::{RoadGraphService, RoadGraphServiceBuilder};
pub use source::{FileSource, OsmSource};
