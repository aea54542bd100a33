//! Cropping graphs to a bounding box and keeping connected parts.

use std::collections::{BTreeSet, HashMap};

use crate::bbox::BoundingBox;
use crate::error::{Result, RoadnetError};
use crate::graph::{NodeId, RoadGraph};

/// Remove every node outside `bbox`, along with its edges.
///
/// # Errors
///
/// Returns [`RoadnetError::NoNodesInBbox`] if no node lies inside the box.
pub fn truncate_to_bbox(graph: &mut RoadGraph, bbox: &BoundingBox) -> Result<()> {
    graph.retain_nodes(|_, node| bbox.contains(node.y, node.x));
    if graph.node_count() == 0 {
        return Err(RoadnetError::NoNodesInBbox);
    }
    Ok(())
}

/// Keep only the largest weakly connected component.
///
/// Ties are broken in favour of the component holding the smallest node id.
pub fn retain_largest_component(graph: &mut RoadGraph) {
    let components = weak_components(graph);
    let Some(largest) = components
        .into_iter()
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.first().cmp(&a.first())))
    else {
        return;
    };

    let keep: BTreeSet<NodeId> = largest.into_iter().collect();
    graph.retain_nodes(|id, _| keep.contains(&id));
}

/// Weakly connected components, each sorted by node id.
pub fn weak_components(graph: &RoadGraph) -> Vec<Vec<NodeId>> {
    let mut sets = DisjointSet::default();
    for (id, _) in graph.nodes() {
        sets.make(id);
    }
    for (key, _) in graph.edges() {
        sets.union(key.u, key.v);
    }

    let mut groups: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for (id, _) in graph.nodes() {
        let root = sets.find(id);
        groups.entry(root).or_default().push(id);
    }

    let mut components: Vec<Vec<NodeId>> = groups.into_values().collect();
    components.sort_by_key(|c| c[0]);
    components
}

/// Count the physical streets meeting at each node.
///
/// Direction and parallel edges are ignored: each distinct neighbour counts
/// once. A self-loop counts twice, since the street both leaves and enters.
pub fn street_counts(graph: &RoadGraph) -> HashMap<NodeId, u32> {
    let mut pairs: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
    for (key, _) in graph.edges() {
        pairs.insert((key.u.min(key.v), key.u.max(key.v)));
    }

    let mut counts: HashMap<NodeId, u32> = graph.nodes().map(|(id, _)| (id, 0)).collect();
    for (a, b) in pairs {
        *counts.entry(a).or_default() += 1;
        *counts.entry(b).or_default() += 1;
    }
    counts
}

/// Union-find keyed by node id, with path halving.
#[derive(Default)]
struct DisjointSet {
    parent: HashMap<NodeId, NodeId>,
    size: HashMap<NodeId, usize>,
}

impl DisjointSet {
    fn make(&mut self, id: NodeId) {
        self.parent.entry(id).or_insert(id);
        self.size.entry(id).or_insert(1);
    }

    fn find(&mut self, mut id: NodeId) -> NodeId {
        self.make(id);
        while self.parent[&id] != id {
            let grandparent = self.parent[&self.parent[&id]];
            self.parent.insert(id, grandparent);
            id = grandparent;
        }
        id
    }

    fn union(&mut self, a: NodeId, b: NodeId) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[&ra] >= self.size[&rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent.insert(small, big);
        let merged = self.size[&big] + self.size[&small];
        self.size.insert(big, merged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Attributes, Edge, Node};

    fn edge() -> Edge {
        Edge {
            attributes: Attributes::new(),
            length: 1.0,
            geometry: None,
        }
    }

    /// Two islands: 1-2-3 and 10-11, plus isolated node 20.
    fn islands() -> RoadGraph {
        let mut g = RoadGraph::new();
        let positions = [
            (1, 45.0),
            (2, 45.001),
            (3, 45.002),
            (10, 45.1),
            (11, 45.101),
            (20, 46.0),
        ];
        for (id, lat) in positions {
            g.add_node(id, Node::new(lat, 7.0));
        }
        g.add_edge(1, 2, edge());
        g.add_edge(2, 1, edge());
        g.add_edge(3, 2, edge());
        g.add_edge(10, 11, edge());
        g
    }

    #[test]
    fn test_truncate_to_bbox() {
        let mut g = islands();
        truncate_to_bbox(&mut g, &BoundingBox::new(45.05, 44.9, 7.1, 6.9)).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn test_truncate_to_empty_bbox_is_error() {
        let mut g = islands();
        let result = truncate_to_bbox(&mut g, &BoundingBox::new(10.0, 9.0, 10.0, 9.0));
        assert!(matches!(result, Err(RoadnetError::NoNodesInBbox)));
    }

    #[test]
    fn test_components() {
        let g = islands();
        let components = weak_components(&g);
        assert_eq!(components, vec![vec![1, 2, 3], vec![10, 11], vec![20]]);
    }

    #[test]
    fn test_retain_largest_component() {
        let mut g = islands();
        retain_largest_component(&mut g);
        assert_eq!(g.node_count(), 3);
        assert!(g.contains_node(3)); // weakly connected through 3->2
        assert!(!g.contains_node(10));
    }

    #[test]
    fn test_largest_component_tie_prefers_smallest_id() {
        let mut g = RoadGraph::new();
        for id in [5, 6, 1, 2] {
            g.add_node(id, Node::new(0.0, 0.0));
        }
        g.add_edge(5, 6, edge());
        g.add_edge(2, 1, edge());
        retain_largest_component(&mut g);
        assert!(g.contains_node(1));
        assert!(!g.contains_node(5));
    }

    #[test]
    fn test_street_counts() {
        let mut g = islands();
        g.add_edge(20, 20, edge());
        let counts = street_counts(&g);
        assert_eq!(counts[&1], 1); // 1<->2 is one street
        assert_eq!(counts[&2], 2);
        assert_eq!(counts[&3], 1);
        assert_eq!(counts[&20], 2); // self-loop
    }
}
