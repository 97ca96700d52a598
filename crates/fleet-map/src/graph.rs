//! Graph-based warehouse map representation.

use fleet_core::{FleetError, FleetResult, NodeId};
use std::collections::HashMap;

/// A node in the warehouse grid: an id and its planar coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
}

/// A directed, positively-weighted edge between two nodes.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub cost: f64,
}

/// The warehouse grid graph. Pure data: load once, query many times.
#[derive(Debug, Clone, Default)]
pub struct WarehouseMap {
    nodes: HashMap<NodeId, Node>,
    adjacency: HashMap<NodeId, Vec<(NodeId, f64)>>,
}

impl WarehouseMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from a flat list of nodes and edges, failing if an edge
    /// references a node that wasn't declared.
    pub fn build(nodes: Vec<Node>, edges: Vec<Edge>) -> FleetResult<Self> {
        let mut map = Self::default();
        for node in nodes {
            map.adjacency.entry(node.id).or_default();
            map.nodes.insert(node.id, node);
        }
        for edge in edges {
            if !map.nodes.contains_key(&edge.from) {
                return Err(FleetError::node_not_found(edge.from));
            }
            if !map.nodes.contains_key(&edge.to) {
                return Err(FleetError::node_not_found(edge.to));
            }
            map.adjacency
                .entry(edge.from)
                .or_default()
                .push((edge.to, edge.cost));
        }
        Ok(map)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn is_valid(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.adjacency
            .get(&node)
            .into_iter()
            .flat_map(|v| v.iter().copied())
    }

    /// Euclidean distance between two nodes; the planner's heuristic.
    ///
    /// Admissible here because every edge on this grid costs at least one
    /// unit, so straight-line distance never overestimates true path cost.
    pub fn heuristic(&self, a: NodeId, b: NodeId) -> f64 {
        match (self.nodes.get(&a), self.nodes.get(&b)) {
            (Some(na), Some(nb)) => ((na.x - nb.x).powi(2) + (na.y - nb.y).powi(2)).sqrt(),
            _ => f64::INFINITY,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_map() -> WarehouseMap {
        // 0 -- 1 -- 2, unit spacing, bidirectional unit-cost edges.
        let nodes = vec![
            Node { id: NodeId(0), x: 0.0, y: 0.0 },
            Node { id: NodeId(1), x: 1.0, y: 0.0 },
            Node { id: NodeId(2), x: 2.0, y: 0.0 },
        ];
        let edges = vec![
            Edge { from: NodeId(0), to: NodeId(1), cost: 1.0 },
            Edge { from: NodeId(1), to: NodeId(0), cost: 1.0 },
            Edge { from: NodeId(1), to: NodeId(2), cost: 1.0 },
            Edge { from: NodeId(2), to: NodeId(1), cost: 1.0 },
        ];
        WarehouseMap::build(nodes, edges).unwrap()
    }

    #[test]
    fn rejects_edge_with_unknown_endpoint() {
        let nodes = vec![Node { id: NodeId(0), x: 0.0, y: 0.0 }];
        let edges = vec![Edge { from: NodeId(0), to: NodeId(99), cost: 1.0 }];
        assert!(WarehouseMap::build(nodes, edges).is_err());
    }

    #[test]
    fn neighbors_and_heuristic() {
        let map = line_map();
        let n: Vec<_> = map.neighbors(NodeId(1)).collect();
        assert_eq!(n, vec![(NodeId(0), 1.0), (NodeId(2), 1.0)]);
        assert_eq!(map.heuristic(NodeId(0), NodeId(2)), 2.0);
    }
}
