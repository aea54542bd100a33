//! Overpass JSON response model.
//!
//! Only the parts of the response needed to build a street graph are
//! decoded: nodes with coordinates and ways with their node references.
//! Relations and any other element kinds are accepted and ignored.

use std::collections::BTreeMap;
use std::io::Read;

use serde::Deserialize;

use crate::error::Result;

/// OSM element identifier.
pub type OsmId = i64;

/// A single element of an Overpass response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OsmElement {
    /// A point with coordinates.
    Node {
        id: OsmId,
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    /// An ordered list of node references.
    Way {
        id: OsmId,
        #[serde(default)]
        nodes: Vec<OsmId>,
        #[serde(default)]
        tags: BTreeMap<String, String>,
    },
    /// A relation; members are not used.
    Relation { id: OsmId },
    /// Anything else Overpass may emit (`area`, `count`, ...).
    #[serde(other)]
    Other,
}

/// A decoded Overpass response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OsmResponse {
    /// Elements in response order.
    #[serde(default)]
    pub elements: Vec<OsmElement>,
}

impl OsmResponse {
    /// Parse a response from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a response from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Whether the response carries no elements at all.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over nodes as `(id, lat, lon, tags)`.
    pub fn nodes(
        &self,
    ) -> impl Iterator<Item = (OsmId, f64, f64, &BTreeMap<String, String>)> + '_ {
        self.elements.iter().filter_map(|e| match e {
            OsmElement::Node { id, lat, lon, tags } => Some((*id, *lat, *lon, tags)),
            _ => None,
        })
    }

    /// Iterate over ways as `(id, node refs, tags)`.
    pub fn ways(
        &self,
    ) -> impl Iterator<Item = (OsmId, &[OsmId], &BTreeMap<String, String>)> + '_ {
        self.elements.iter().filter_map(|e| match e {
            OsmElement::Way { id, nodes, tags } => Some((*id, nodes.as_slice(), tags)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": 0.6,
        "generator": "Overpass API",
        "osm3s": {"timestamp_osm_base": "2024-01-01T00:00:00Z"},
        "elements": [
            {"type": "node", "id": 1, "lat": 45.0, "lon": 7.0},
            {"type": "node", "id": 2, "lat": 45.001, "lon": 7.0, "tags": {"highway": "traffic_signals"}},
            {"type": "way", "id": 10, "nodes": [1, 2], "tags": {"highway": "residential"}},
            {"type": "relation", "id": 99, "members": []},
            {"type": "area", "id": 3600000001}
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let response = OsmResponse::from_json(SAMPLE).unwrap();
        assert_eq!(response.elements.len(), 5);
        assert_eq!(response.nodes().count(), 2);

        let (id, refs, tags) = response.ways().next().unwrap();
        assert_eq!(id, 10);
        assert_eq!(refs, &[1, 2]);
        assert_eq!(tags.get("highway").map(String::as_str), Some("residential"));

        assert!(matches!(response.elements[4], OsmElement::Other));
    }

    #[test]
    fn test_missing_elements_is_empty() {
        let response = OsmResponse::from_json(r#"{"version": 0.6}"#).unwrap();
        assert!(response.is_empty());
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(OsmResponse::from_json("<html>rate limited</html>").is_err());
    }
}
