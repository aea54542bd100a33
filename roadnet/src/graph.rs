//! Directed street multigraph.
//!
//! Nodes are OSM nodes (intersections and shape points), edges are directed
//! street segments. Parallel edges between the same pair of nodes are told
//! apart by a per-pair `key`, starting at 0.
//!
//! Nodes and edges live in ordered maps so every traversal, and therefore
//! every serialized output, is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

/// OSM node identifier.
pub type NodeId = i64;

/// A `[lon, lat]` coordinate pair, in GeoJSON order.
pub type Coord = [f64; 2];

/// Free-form attributes attached to nodes and edges.
pub type Attributes = Map<String, Value>;

/// Identifies one edge of the multigraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    /// Origin node.
    pub u: NodeId,
    /// Destination node.
    pub v: NodeId,
    /// Distinguishes parallel edges from `u` to `v`.
    pub key: u32,
}

impl EdgeKey {
    /// Create a new edge key.
    pub fn new(u: NodeId, v: NodeId, key: u32) -> Self {
        Self { u, v, key }
    }
}

/// A graph node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Latitude.
    pub y: f64,
    /// Longitude.
    pub x: f64,
    /// Retained OSM tags.
    pub tags: Attributes,
    /// Number of physical streets meeting at this node, once computed.
    pub street_count: Option<u32>,
}

impl Node {
    /// Create a node at the given position with no tags.
    pub fn new(y: f64, x: f64) -> Self {
        Self {
            y,
            x,
            tags: Attributes::new(),
            street_count: None,
        }
    }

    /// The node position as a `[lon, lat]` pair.
    pub fn coord(&self) -> Coord {
        [self.x, self.y]
    }
}

/// A directed graph edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Attributes such as `osmid`, `name`, `highway`, `oneway`, `reversed`.
    pub attributes: Attributes,
    /// Length in meters.
    pub length: f64,
    /// Full shape of the edge. `None` means a straight segment from `u` to `v`.
    pub geometry: Option<Vec<Coord>>,
}

/// Directed multigraph of streets.
#[derive(Debug, Clone, Default)]
pub struct RoadGraph {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeKey, Edge>,
    /// Incoming edge keys per node, for predecessor lookups.
    incoming: BTreeMap<NodeId, BTreeSet<EdgeKey>>,
    simplified: bool,
}

impl RoadGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, replacing any previous node with the same id.
    pub fn add_node(&mut self, id: NodeId, node: Node) {
        self.nodes.insert(id, node);
    }

    /// Insert an edge from `u` to `v` and return its key.
    ///
    /// Both nodes are expected to be present already.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId, edge: Edge) -> EdgeKey {
        let key = self
            .edges
            .range(EdgeKey::new(u, v, 0)..=EdgeKey::new(u, v, u32::MAX))
            .next_back()
            .map(|(k, _)| k.key + 1)
            .unwrap_or(0);
        let edge_key = EdgeKey::new(u, v, key);
        self.edges.insert(edge_key, edge);
        self.incoming.entry(v).or_default().insert(edge_key);
        edge_key
    }

    /// Remove a node together with every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&id)?;

        let outgoing: Vec<EdgeKey> = self.out_edges(id).map(|(k, _)| *k).collect();
        for key in outgoing {
            self.remove_edge(&key);
        }
        if let Some(incoming) = self.incoming.remove(&id) {
            for key in incoming {
                self.edges.remove(&key);
            }
        }

        Some(node)
    }

    /// Remove a single edge.
    pub fn remove_edge(&mut self, key: &EdgeKey) -> Option<Edge> {
        let edge = self.edges.remove(key)?;
        if let Some(incoming) = self.incoming.get_mut(&key.v) {
            incoming.remove(key);
        }
        Some(edge)
    }

    /// Keep only the nodes for which `keep` returns true.
    pub fn retain_nodes(&mut self, mut keep: impl FnMut(NodeId, &Node) -> bool) {
        let doomed: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(id, node)| !keep(**id, node))
            .map(|(id, _)| *id)
            .collect();
        for id in doomed {
            self.remove_node(id);
        }
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Mutable access to a node.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Whether the node exists.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Look up an edge.
    pub fn edge(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// All edges in `(u, v, key)` order.
    pub fn edges(&self) -> impl Iterator<Item = (&EdgeKey, &Edge)> + '_ {
        self.edges.iter()
    }

    /// Edges leaving `id`, ordered by destination then key.
    pub fn out_edges(&self, id: NodeId) -> impl Iterator<Item = (&EdgeKey, &Edge)> + '_ {
        self.edges
            .range(EdgeKey::new(id, NodeId::MIN, 0)..=EdgeKey::new(id, NodeId::MAX, u32::MAX))
    }

    /// Edges arriving at `id`.
    pub fn in_edges(&self, id: NodeId) -> impl Iterator<Item = (&EdgeKey, &Edge)> + '_ {
        self.incoming
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|key| self.edges.get_key_value(key))
    }

    /// Distinct successor nodes, sorted.
    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self.out_edges(id).map(|(k, _)| k.v).collect();
        out.dedup();
        out
    }

    /// Distinct predecessor nodes, sorted.
    pub fn predecessors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self.in_edges(id).map(|(k, _)| k.u).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Number of outgoing edges, counting parallel edges.
    pub fn out_degree(&self, id: NodeId) -> usize {
        self.out_edges(id).count()
    }

    /// Number of incoming edges, counting parallel edges.
    pub fn in_degree(&self, id: NodeId) -> usize {
        self.incoming.get(&id).map(BTreeSet::len).unwrap_or(0)
    }

    /// Total degree; a self-loop contributes 2.
    pub fn degree(&self, id: NodeId) -> usize {
        self.in_degree(id) + self.out_degree(id)
    }

    /// Number of edges from `u` to `v`.
    pub fn edge_count_between(&self, u: NodeId, v: NodeId) -> usize {
        self.edges
            .range(EdgeKey::new(u, v, 0)..=EdgeKey::new(u, v, u32::MAX))
            .count()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether [`crate::simplify::simplify_graph`] has run on this graph.
    pub fn is_simplified(&self) -> bool {
        self.simplified
    }

    pub(crate) fn mark_simplified(&mut self) {
        self.simplified = true;
    }
}
