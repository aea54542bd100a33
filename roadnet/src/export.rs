//! Geometry tables and GeoJSON export.
//!
//! This module is only available when the `geojson` feature is enabled.
//!
//! A graph is flattened into two tables: one row per node (point geometry)
//! and one row per edge (line geometry). Each table serializes to a GeoJSON
//! `FeatureCollection` in which every feature carries every column of its
//! table, with `null` where a row has no value.
//!
//! # Example
//!
//! ```ignore
//! use roadnet::export::graph_to_tables;
//!
//! let (nodes, edges) = graph_to_tables(&graph)?;
//! let geojson = edges.to_geojson_string()?;
//! ```

use std::collections::BTreeSet;

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value as GeoJsonValue};
use serde_json::Value;

use crate::error::{Result, RoadnetError};
use crate::graph::{Coord, EdgeKey, NodeId, RoadGraph};

/// One intersection.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    /// OSM node id.
    pub id: NodeId,
    /// `y`, `x`, `street_count` and retained node tags.
    pub properties: JsonObject,
    /// Position as `[lon, lat]`.
    pub coord: Coord,
}

/// One road segment.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRow {
    /// `(u, v, key)` of the edge.
    pub key: EdgeKey,
    /// Edge attributes plus `length`.
    pub properties: JsonObject,
    /// Shape of the segment as `[lon, lat]` pairs.
    pub line: Vec<Coord>,
}

/// Point table of graph nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTable {
    /// Rows in node id order.
    pub rows: Vec<NodeRow>,
}

/// Line table of graph edges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeTable {
    /// Rows in `(u, v, key)` order.
    pub rows: Vec<EdgeRow>,
}

/// Convert a graph into its node and edge tables.
///
/// Edges without a stored geometry get the straight line between their
/// endpoints.
///
/// # Errors
///
/// Returns [`RoadnetError::NoNodes`] or [`RoadnetError::NoEdges`] for an
/// empty graph.
pub fn graph_to_tables(graph: &RoadGraph) -> Result<(NodeTable, EdgeTable)> {
    if graph.node_count() == 0 {
        return Err(RoadnetError::NoNodes);
    }
    if graph.edge_count() == 0 {
        return Err(RoadnetError::NoEdges);
    }

    let nodes = graph
        .nodes()
        .map(|(id, node)| {
            let mut properties = JsonObject::new();
            properties.insert("y".to_string(), Value::from(node.y));
            properties.insert("x".to_string(), Value::from(node.x));
            properties.insert(
                "street_count".to_string(),
                node.street_count.map(Value::from).unwrap_or(Value::Null),
            );
            for (k, v) in &node.tags {
                properties.insert(k.clone(), v.clone());
            }
            NodeRow {
                id,
                properties,
                coord: node.coord(),
            }
        })
        .collect();

    let mut edges = Vec::with_capacity(graph.edge_count());
    for (key, edge) in graph.edges() {
        let line = match &edge.geometry {
            Some(geometry) => geometry.clone(),
            None => {
                let (Some(u), Some(v)) = (graph.node(key.u), graph.node(key.v)) else {
                    continue;
                };
                vec![u.coord(), v.coord()]
            }
        };

        let mut properties = edge.attributes.clone();
        properties.insert("length".to_string(), Value::from(edge.length));
        edges.push(EdgeRow {
            key: *key,
            properties,
            line,
        });
    }

    Ok((NodeTable { rows: nodes }, EdgeTable { rows: edges }))
}

impl NodeTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Convert to a GeoJSON feature collection of points.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let columns = columns(self.rows.iter().map(|r| &r.properties));
        let features = self
            .rows
            .iter()
            .map(|row| {
                feature(
                    GeoJsonValue::Point(row.coord.to_vec()),
                    row.id.to_string(),
                    &row.properties,
                    &columns,
                )
            })
            .collect();
        collection(features)
    }

    /// Serialize to a GeoJSON string.
    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_feature_collection())?)
    }
}

impl EdgeTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Convert to a GeoJSON feature collection of line strings.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let columns = columns(self.rows.iter().map(|r| &r.properties));
        let features = self
            .rows
            .iter()
            .map(|row| {
                let line = row.line.iter().map(|c| c.to_vec()).collect();
                feature(
                    GeoJsonValue::LineString(line),
                    format!("({}, {}, {})", row.key.u, row.key.v, row.key.key),
                    &row.properties,
                    &columns,
                )
            })
            .collect();
        collection(features)
    }

    /// Serialize to a GeoJSON string.
    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_feature_collection())?)
    }
}

/// Union of property names over all rows.
fn columns<'a>(rows: impl Iterator<Item = &'a JsonObject>) -> BTreeSet<&'a str> {
    rows.flat_map(|p| p.keys().map(String::as_str)).collect()
}

fn feature(
    geometry: GeoJsonValue,
    id: String,
    properties: &JsonObject,
    columns: &BTreeSet<&str>,
) -> Feature {
    let properties: JsonObject = columns
        .iter()
        .map(|&c| (c.to_string(), properties.get(c).cloned().unwrap_or(Value::Null)))
        .collect();

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: Some(Id::String(id)),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_graph;
    use crate::network::NetworkType;
    use crate::osm::OsmResponse;
    use crate::simplify::simplify_graph;
    use geojson::GeoJson;

    const GRID: &str = r#"{"elements": [
        {"type": "node", "id": 1, "lat": 45.0, "lon": 7.000, "tags": {"highway": "traffic_signals"}},
        {"type": "node", "id": 2, "lat": 45.0, "lon": 7.001},
        {"type": "node", "id": 3, "lat": 45.0, "lon": 7.002},
        {"type": "node", "id": 4, "lat": 45.001, "lon": 7.002},
        {"type": "way", "id": 100, "nodes": [1, 2, 3],
         "tags": {"highway": "residential", "name": "Main Street"}},
        {"type": "way", "id": 200, "nodes": [3, 4],
         "tags": {"highway": "tertiary", "oneway": "yes"}}
    ]}"#;

    fn simplified() -> RoadGraph {
        let response = OsmResponse::from_json(GRID).unwrap();
        let mut graph = build_graph(&[response], NetworkType::Drive).unwrap();
        simplify_graph(&mut graph, true).unwrap();
        graph
    }

    #[test]
    fn test_empty_graph_is_error() {
        let graph = RoadGraph::new();
        assert!(matches!(graph_to_tables(&graph), Err(RoadnetError::NoNodes)));
    }

    #[test]
    fn test_tables() {
        let (nodes, edges) = graph_to_tables(&simplified()).unwrap();
        assert_eq!(nodes.len(), 3);
        // 1->3, 3->1 and 3->4
        assert_eq!(edges.len(), 3);

        let straight = edges.rows.iter().find(|r| r.key.u == 3 && r.key.v == 4).unwrap();
        assert_eq!(straight.line, vec![[7.002, 45.0], [7.002, 45.001]]);

        let curved = edges.rows.iter().find(|r| r.key.u == 1).unwrap();
        assert_eq!(curved.line.len(), 3);
    }

    #[test]
    fn test_edges_feature_collection() {
        let (_, edges) = graph_to_tables(&simplified()).unwrap();
        let fc = edges.to_feature_collection();
        assert_eq!(fc.features.len(), 3);

        for feature in &fc.features {
            let geometry = feature.geometry.as_ref().unwrap();
            assert!(matches!(geometry.value, GeoJsonValue::LineString(_)));

            // every feature carries every column
            let props = feature.properties.as_ref().unwrap();
            for column in ["highway", "length", "name", "oneway", "osmid", "reversed"] {
                assert!(props.contains_key(column), "missing {}", column);
            }
        }

        let side = &fc.features[2];
        assert_eq!(side.id, Some(Id::String("(3, 4, 0)".to_string())));
        assert_eq!(side.properties.as_ref().unwrap()["name"], Value::Null);
    }

    #[test]
    fn test_nodes_feature_collection() {
        let mut graph = simplified();
        graph.node_mut(3).unwrap().street_count = Some(2);
        let (nodes, _) = graph_to_tables(&graph).unwrap();
        let fc = nodes.to_feature_collection();

        let first = &fc.features[0];
        assert_eq!(first.id, Some(Id::String("1".to_string())));
        let props = first.properties.as_ref().unwrap();
        assert_eq!(props["highway"], Value::from("traffic_signals"));
        assert_eq!(props["street_count"], Value::Null);

        let third = fc.features[1].properties.as_ref().unwrap();
        assert_eq!(third["street_count"], Value::from(2));
        assert_eq!(third["highway"], Value::Null);
    }

    #[test]
    fn test_geojson_string_round_trip_is_stable() {
        let (_, edges) = graph_to_tables(&simplified()).unwrap();
        let first = edges.to_geojson_string().unwrap();
        let parsed: GeoJson = first.parse().unwrap();
        assert_eq!(serde_json::to_string(&parsed).unwrap(), first);
    }
}
