//! Building a street graph from OSM elements.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use crate::distance::{great_circle, round_mm};
use crate::error::{Result, RoadnetError};
use crate::graph::{Attributes, Edge, Node, NodeId, RoadGraph};
use crate::network::NetworkType;
use crate::osm::OsmResponse;

/// Way tags carried over to edge attributes.
pub const USEFUL_WAY_TAGS: &[&str] = &[
    "bridge",
    "tunnel",
    "oneway",
    "lanes",
    "ref",
    "name",
    "highway",
    "maxspeed",
    "service",
    "access",
    "area",
    "landuse",
    "width",
    "est_width",
    "junction",
];

/// Node tags carried over to node attributes.
pub const USEFUL_NODE_TAGS: &[&str] = &["ref", "highway"];

/// `oneway` values that make a way one-way.
const ONEWAY_VALUES: &[&str] = &["yes", "true", "1", "-1", "reverse", "T", "F"];

/// `oneway` values meaning the way is one-way against its node order.
const REVERSED_VALUES: &[&str] = &["-1", "reverse", "T"];

/// Build a directed street graph from one or more Overpass responses.
///
/// Ways that do not satisfy the network filter are ignored. Every
/// consecutive pair of way nodes becomes an edge carrying the way's
/// attributes; two-way streets get an edge in each direction.
///
/// # Errors
///
/// Returns [`RoadnetError::EmptyResponse`] if the responses contain no
/// elements at all.
pub fn build_graph(responses: &[OsmResponse], network: NetworkType) -> Result<RoadGraph> {
    if responses.iter().all(OsmResponse::is_empty) {
        return Err(RoadnetError::EmptyResponse);
    }

    let mut positions: HashMap<NodeId, Node> = HashMap::new();
    for response in responses {
        for (id, lat, lon, tags) in response.nodes() {
            let mut node = Node::new(lat, lon);
            node.tags = pick_tags(tags, USEFUL_NODE_TAGS);
            positions.insert(id, node);
        }
    }

    let mut graph = RoadGraph::new();
    let mut skipped_segments = 0usize;
    let mut seen_ways = HashSet::new();

    for response in responses {
        for (way_id, refs, tags) in response.ways() {
            // overlapping sub-box responses repeat ways
            if !network.matches(tags) || !seen_ways.insert(way_id) {
                continue;
            }

            let mut nodes = dedup_consecutive(refs);
            if nodes.len() < 2 {
                continue;
            }

            let one_way = is_one_way(tags, network);
            if one_way && is_reversed(tags) {
                nodes.reverse();
            }

            let mut attributes = pick_tags(tags, USEFUL_WAY_TAGS);
            attributes.insert("osmid".to_string(), Value::from(way_id));
            attributes.insert("oneway".to_string(), Value::Bool(one_way));

            for pair in nodes.windows(2) {
                let (u, v) = (pair[0], pair[1]);
                let (Some(from), Some(to)) = (positions.get(&u), positions.get(&v)) else {
                    skipped_segments += 1;
                    continue;
                };
                let length = round_mm(great_circle(from.y, from.x, to.y, to.x));

                for id in [u, v] {
                    if !graph.contains_node(id) {
                        graph.add_node(id, positions[&id].clone());
                    }
                }

                let mut forward = attributes.clone();
                forward.insert("reversed".to_string(), Value::Bool(false));
                graph.add_edge(
                    u,
                    v,
                    Edge {
                        attributes: forward,
                        length,
                        geometry: None,
                    },
                );

                if !one_way {
                    let mut backward = attributes.clone();
                    backward.insert("reversed".to_string(), Value::Bool(true));
                    graph.add_edge(
                        v,
                        u,
                        Edge {
                            attributes: backward,
                            length,
                            geometry: None,
                        },
                    );
                }
            }
        }
    }

    if skipped_segments > 0 {
        tracing::warn!(
            skipped_segments,
            "Skipped way segments referencing nodes missing from the response"
        );
    }

    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        network = %network,
        "Built street graph"
    );

    Ok(graph)
}

/// Whether a way is one-way for the given network.
fn is_one_way(tags: &BTreeMap<String, String>, network: NetworkType) -> bool {
    if network.is_bidirectional() {
        return false;
    }
    if let Some(oneway) = tags.get("oneway") {
        if ONEWAY_VALUES.contains(&oneway.as_str()) {
            return true;
        }
    }
    tags.get("junction").map(String::as_str) == Some("roundabout")
}

/// Whether a one-way way runs against its node order.
fn is_reversed(tags: &BTreeMap<String, String>) -> bool {
    tags.get("oneway")
        .map(|v| REVERSED_VALUES.contains(&v.as_str()))
        .unwrap_or(false)
}

fn pick_tags(tags: &BTreeMap<String, String>, keep: &[&str]) -> Attributes {
    tags.iter()
        .filter(|(k, _)| keep.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

fn dedup_consecutive(refs: &[NodeId]) -> Vec<NodeId> {
    let mut nodes = refs.to_vec();
    nodes.dedup();
    nodes
}
