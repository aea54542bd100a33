//! Error types for the roadnet library.

use thiserror::Error;

/// Errors that can occur while extracting a road network.
#[derive(Error, Debug)]
pub enum RoadnetError {
    /// IO error when reading saved responses.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The OSM response could not be decoded.
    #[error("Invalid OSM response: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error talking to the Overpass API.
    #[cfg(feature = "download")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Overpass API answered with a non-success status.
    #[error("Overpass API returned HTTP {status}: {reason}")]
    Overpass { status: u16, reason: String },

    /// A bounding box bound is NaN or infinite.
    #[error("Bounding box coordinates must be finite numbers")]
    NonFiniteBbox,

    /// The data source returned no elements at all.
    #[error("There are no data elements in the response JSON")]
    EmptyResponse,

    /// Truncation to the bounding box left no nodes.
    #[error("Found no graph nodes within the requested polygon")]
    NoNodesInBbox,

    /// Export was requested for a graph without nodes.
    #[error("graph contains no nodes")]
    NoNodes,

    /// Export was requested for a graph without edges.
    #[error("graph contains no edges")]
    NoEdges,

    /// `simplify_graph` was called on an already simplified graph.
    #[error("This graph has already been simplified, cannot simplify it again.")]
    AlreadySimplified,

    /// A path branched where simplification expected a chain.
    #[error("Unexpected simplify pattern handling at node {node}")]
    SimplifyPattern { node: i64 },

    /// Network type name not recognised.
    #[error("Unrecognized network type: {name}")]
    UnknownNetworkType { name: String },
}

/// Result type alias using [`RoadnetError`].
pub type Result<T> = std::result::Result<T, RoadnetError>;
