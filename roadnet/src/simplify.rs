//! Topology simplification.
//!
//! OSM ways are split into many short segments at every shape point. This
//! module merges chains of segments into single edges, keeping only nodes
//! that are real intersections or dead ends ("endpoints"). The shape of each
//! merged chain is preserved in the new edge's geometry.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::distance::round_mm;
use crate::error::{Result, RoadnetError};
use crate::graph::{Attributes, Edge, NodeId, RoadGraph};

/// Simplify the graph in place.
///
/// With `strict` set, a node where two different OSM ways meet is always an
/// endpoint, even if it looks like a plain shape point topologically.
///
/// # Errors
///
/// - [`RoadnetError::AlreadySimplified`] if the graph was simplified before.
/// - [`RoadnetError::SimplifyPattern`] if a chain unexpectedly branches.
pub fn simplify_graph(graph: &mut RoadGraph, strict: bool) -> Result<()> {
    if graph.is_simplified() {
        return Err(RoadnetError::AlreadySimplified);
    }

    let initial_nodes = graph.node_count();
    let initial_edges = graph.edge_count();

    let endpoints: BTreeSet<NodeId> = graph
        .nodes()
        .map(|(id, _)| id)
        .filter(|&id| is_endpoint(graph, id, strict))
        .collect();

    let paths = paths_to_simplify(graph, &endpoints)?;

    let mut interior = BTreeSet::new();
    let mut merged = Vec::with_capacity(paths.len());
    for path in &paths {
        merged.push((path[0], path[path.len() - 1], merge_path(graph, path)));
        interior.extend(path[1..path.len() - 1].iter().copied());
    }

    for (u, v, edge) in merged {
        graph.add_edge(u, v, edge);
    }
    for id in interior {
        graph.remove_node(id);
    }
    graph.mark_simplified();

    tracing::debug!(
        initial_nodes,
        initial_edges,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Simplified graph"
    );

    Ok(())
}

/// Decide whether a node must survive simplification.
///
/// A node is an endpoint if any of these hold:
/// 1. it is its own neighbour (self-loop);
/// 2. it has no incoming or no outgoing edges;
/// 3. it does not have exactly two neighbours with total degree 2 or 4;
/// 4. in strict mode, its incident edges come from more than one OSM way.
pub fn is_endpoint(graph: &RoadGraph, id: NodeId, strict: bool) -> bool {
    let mut neighbors: BTreeSet<NodeId> = graph.successors(id).into_iter().collect();
    neighbors.extend(graph.predecessors(id));

    if neighbors.contains(&id) {
        return true;
    }
    if graph.out_degree(id) == 0 || graph.in_degree(id) == 0 {
        return true;
    }
    let degree = graph.degree(id);
    if !(neighbors.len() == 2 && (degree == 2 || degree == 4)) {
        return true;
    }
    if strict {
        let mut osmids: Vec<&Value> = Vec::new();
        let incident = graph.in_edges(id).chain(graph.out_edges(id));
        for (_, edge) in incident {
            if let Some(osmid) = edge.attributes.get("osmid") {
                if !osmids.contains(&osmid) {
                    osmids.push(osmid);
                }
            }
        }
        return osmids.len() > 1;
    }
    false
}

fn paths_to_simplify(
    graph: &RoadGraph,
    endpoints: &BTreeSet<NodeId>,
) -> Result<Vec<Vec<NodeId>>> {
    let mut paths = Vec::new();
    for &endpoint in endpoints {
        for successor in graph.successors(endpoint) {
            if !endpoints.contains(&successor) {
                paths.push(build_path(graph, endpoint, successor, endpoints)?);
            }
        }
    }
    Ok(paths)
}

/// Walk from `endpoint` through `first` until the next endpoint.
fn build_path(
    graph: &RoadGraph,
    endpoint: NodeId,
    first: NodeId,
    endpoints: &BTreeSet<NodeId>,
) -> Result<Vec<NodeId>> {
    let mut path = vec![endpoint, first];

    for candidate in graph.successors(first) {
        if path.contains(&candidate) {
            continue;
        }
        let mut current = candidate;
        path.push(current);

        while !endpoints.contains(&current) {
            let next: Vec<NodeId> = graph
                .successors(current)
                .into_iter()
                .filter(|n| !path.contains(n))
                .collect();

            match next.as_slice() {
                [only] => {
                    current = *only;
                    path.push(current);
                }
                [] => {
                    if graph.successors(current).contains(&endpoint) {
                        // a ring that closes back on its starting endpoint
                        path.push(endpoint);
                    } else {
                        tracing::warn!(
                            node = current,
                            "Unexpected simplify pattern: dead end inside a chain"
                        );
                    }
                    return Ok(path);
                }
                _ => return Err(RoadnetError::SimplifyPattern { node: current }),
            }
        }
        return Ok(path);
    }

    Ok(path)
}

/// Merge the edges along `path` into a single edge.
fn merge_path(graph: &RoadGraph, path: &[NodeId]) -> Edge {
    let mut values: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    let mut length = 0.0;

    for pair in path.windows(2) {
        let (u, v) = (pair[0], pair[1]);
        if graph.edge_count_between(u, v) != 1 {
            tracing::warn!(u, v, "Multiple edges between nodes along a simplified path");
        }
        let Some((_, edge)) = graph.out_edges(u).find(|(k, _)| k.v == v) else {
            continue;
        };

        length += edge.length;
        for (key, value) in &edge.attributes {
            values.entry(key.clone()).or_default().push(value.clone());
        }
    }

    let attributes: Attributes = values
        .into_iter()
        .map(|(key, list)| (key, collapse(list)))
        .collect();

    let geometry = path
        .iter()
        .filter_map(|id| graph.node(*id))
        .map(|node| node.coord())
        .collect();

    Edge {
        attributes,
        length: round_mm(length),
        geometry: Some(geometry),
    }
}

/// A single value if all are equal, else the distinct values in first-seen order.
fn collapse(list: Vec<Value>) -> Value {
    let mut unique: Vec<Value> = Vec::with_capacity(list.len());
    for value in list {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    if unique.len() == 1 {
        unique.remove(0)
    } else {
        Value::Array(unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_graph;
    use crate::graph::EdgeKey;
    use crate::network::NetworkType;
    use crate::osm::OsmResponse;

    /// Main Street (two-way) runs 1-2-3-5, Side Street (one-way) runs 3-4-6.
    const GRID: &str = r#"{"elements": [
        {"type": "node", "id": 1, "lat": 45.0, "lon": 7.000},
        {"type": "node", "id": 2, "lat": 45.0, "lon": 7.001},
        {"type": "node", "id": 3, "lat": 45.0, "lon": 7.002},
        {"type": "node", "id": 5, "lat": 45.0, "lon": 7.003},
        {"type": "node", "id": 4, "lat": 45.001, "lon": 7.002},
        {"type": "node", "id": 6, "lat": 45.002, "lon": 7.002},
        {"type": "way", "id": 100, "nodes": [1, 2, 3, 5],
         "tags": {"highway": "residential", "name": "Main Street"}},
        {"type": "way", "id": 200, "nodes": [3, 4, 6],
         "tags": {"highway": "tertiary", "name": "Side Street", "oneway": "yes"}}
    ]}"#;

    fn grid() -> RoadGraph {
        let response = OsmResponse::from_json(GRID).unwrap();
        build_graph(&[response], NetworkType::Drive).unwrap()
    }

    #[test]
    fn test_endpoints() {
        let g = grid();
        assert!(is_endpoint(&g, 1, true)); // dead end
        assert!(!is_endpoint(&g, 2, true)); // shape point on a two-way street
        assert!(is_endpoint(&g, 3, true)); // intersection
        assert!(!is_endpoint(&g, 4, true)); // shape point on a one-way street
        assert!(is_endpoint(&g, 6, true)); // no outgoing edges
    }

    #[test]
    fn test_simplify_grid() {
        let mut g = grid();
        simplify_graph(&mut g, true).unwrap();

        assert!(g.is_simplified());
        assert_eq!(g.node_count(), 4);
        assert!(!g.contains_node(2));
        assert!(!g.contains_node(4));
        // 1<->3 merged, 3<->5 untouched, 3->6 merged
        assert_eq!(g.edge_count(), 5);

        let merged = g.edge(&EdgeKey::new(1, 3, 0)).unwrap();
        let geometry = merged.geometry.as_ref().unwrap();
        assert_eq!(geometry.len(), 3);
        assert_eq!(geometry[1], [7.001, 45.0]);
        assert_eq!(merged.attributes["name"], Value::from("Main Street"));
        assert_eq!(merged.attributes["osmid"], Value::from(100));
        assert!((merged.length - 157.3).abs() < 0.5);

        let untouched = g.edge(&EdgeKey::new(3, 5, 0)).unwrap();
        assert!(untouched.geometry.is_none());

        let side = g.edge(&EdgeKey::new(3, 6, 0)).unwrap();
        assert_eq!(side.attributes["oneway"], Value::Bool(true));
        assert!(g.edge(&EdgeKey::new(6, 3, 0)).is_none());
    }

    #[test]
    fn test_simplify_twice_is_error() {
        let mut g = grid();
        simplify_graph(&mut g, true).unwrap();
        assert!(matches!(
            simplify_graph(&mut g, true),
            Err(RoadnetError::AlreadySimplified)
        ));
    }

    #[test]
    fn test_mixed_attributes_become_lists() {
        // two ways meeting at node 2 with nothing else there
        let json = r#"{"elements": [
            {"type": "node", "id": 1, "lat": 45.0, "lon": 7.000},
            {"type": "node", "id": 2, "lat": 45.0, "lon": 7.001},
            {"type": "node", "id": 3, "lat": 45.0, "lon": 7.002},
            {"type": "way", "id": 10, "nodes": [1, 2],
             "tags": {"highway": "residential", "name": "Elm Street"}},
            {"type": "way", "id": 11, "nodes": [2, 3],
             "tags": {"highway": "secondary", "name": "Elm Street"}}
        ]}"#;
        let response = OsmResponse::from_json(json).unwrap();

        // strict keeps node 2 because two ways meet there
        let mut strict = build_graph(&[response.clone()], NetworkType::Drive).unwrap();
        simplify_graph(&mut strict, true).unwrap();
        assert!(strict.contains_node(2));

        let mut loose = build_graph(&[response], NetworkType::Drive).unwrap();
        simplify_graph(&mut loose, false).unwrap();
        assert!(!loose.contains_node(2));

        let edge = loose.edge(&EdgeKey::new(1, 3, 0)).unwrap();
        assert_eq!(edge.attributes["name"], Value::from("Elm Street"));
        assert_eq!(edge.attributes["osmid"], serde_json::json!([10, 11]));
        assert_eq!(
            edge.attributes["highway"],
            serde_json::json!(["residential", "secondary"])
        );
    }

    #[test]
    fn test_collapse() {
        assert_eq!(collapse(vec![Value::from(1), Value::from(1)]), Value::from(1));
        assert_eq!(
            collapse(vec![Value::from(2), Value::from(1), Value::from(2)]),
            serde_json::json!([2, 1])
        );
    }
}
