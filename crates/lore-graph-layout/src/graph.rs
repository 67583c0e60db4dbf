//! Internal graph representation and the adapter that builds it from
//! external snapshots.

use std::collections::{HashMap, HashSet};

use glam::DVec2;

use crate::config::ForceSimulationConfig;
use crate::error::{LayoutError, Result};

/// A node as the simulation sees it. Created by the adapter, mutated only by
/// the simulation driver, discarded on the next reload.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Node {
    /// Stable name copied from the caller (the external ID).
    pub name: String,
    /// Current position.
    pub pos: DVec2,
    /// Current velocity.
    pub vel: DVec2,
    /// Per-tick force accumulator.
    pub(crate) acc: DVec2,
    /// Visual radius; zero means "unset, use the configured default".
    pub radius: f64,
    /// Pinned nodes are exempt from integration and keep their position.
    pub is_pinned: bool,
    /// Sum of incident edge weights, maintained by the adapter.
    pub(crate) degree: f64,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn at(name: impl Into<String>, pos: DVec2) -> Self {
        Self {
            name: name.into(),
            pos,
            ..Default::default()
        }
    }

    /// Sum of incident edge weights after graph construction.
    pub fn degree(&self) -> f64 {
        self.degree
    }

    /// Mass of the node in force formulas.
    pub(crate) fn size(&self) -> f64 {
        self.degree
    }
}

/// An edge between two internal node indices.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    /// Edge weight; values ≤ 0 are treated as unset and default to 1.
    pub value: f64,
}

impl Edge {
    pub fn new(source: usize, target: usize, value: f64) -> Self {
        Self {
            source,
            target,
            value,
        }
    }
}

/// Checks the structural invariants the simulation relies on: every edge
/// endpoint in bounds and no self-edges.
pub(crate) fn validate_edges(node_count: usize, edges: &[Edge]) -> Result<()> {
    for (i, edge) in edges.iter().enumerate() {
        if edge.source == edge.target {
            return Err(LayoutError::InvalidGraph(format!(
                "edge {i} is a self-edge on node {}",
                edge.source
            )));
        }
        if edge.source >= node_count || edge.target >= node_count {
            return Err(LayoutError::InvalidGraph(format!(
                "edge {i} ({} -> {}) references a node outside 0..{node_count}",
                edge.source, edge.target
            )));
        }
    }
    Ok(())
}

/// Prepares caller-supplied nodes and edges for simulation: seeds missing
/// positions, applies the default radius, normalizes unset edge weights and
/// rebuilds degrees from scratch. Safe to call repeatedly on the same data.
pub(crate) fn prepare(nodes: &mut [Node], edges: &mut [Edge], conf: &ForceSimulationConfig) {
    for node in nodes.iter_mut() {
        if node.pos.length() == 0.0 {
            node.pos = conf.random_point_inside();
        }
        if node.radius <= 0.0 {
            node.radius = conf.default_node_radius;
        }
        node.degree = 0.0;
    }
    for edge in edges.iter_mut() {
        if edge.value <= 0.0 {
            edge.value = 1.0;
        }
        nodes[edge.source].degree += edge.value;
        nodes[edge.target].degree += edge.value;
    }
}

/// Validates an external snapshot at the public API boundary: unique node
/// IDs, known endpoints, no self-edges, no duplicate undirected edges,
/// weights inside their domain (finite and non-negative; zero means unset).
pub(crate) fn validate_snapshot(graph: &lore_graph_core::Graph) -> Result<()> {
    let mut ids = HashSet::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        if !ids.insert(node.id.as_str()) {
            return Err(LayoutError::InvalidGraph(format!(
                "duplicate node id '{}'",
                node.id
            )));
        }
    }
    let mut pairs = HashSet::with_capacity(graph.edges.len());
    for edge in &graph.edges {
        if edge.from == edge.to {
            return Err(LayoutError::InvalidGraph(format!(
                "edge '{}' is a self-edge on '{}'",
                edge.id, edge.from
            )));
        }
        if !ids.contains(edge.from.as_str()) || !ids.contains(edge.to.as_str()) {
            return Err(LayoutError::InvalidGraph(format!(
                "edge '{}' references unknown node ('{}' -> '{}')",
                edge.id, edge.from, edge.to
            )));
        }
        if !edge.weight.is_finite() || edge.weight < 0.0 {
            return Err(LayoutError::InvalidGraph(format!(
                "edge '{}' has weight {} outside its domain",
                edge.id, edge.weight
            )));
        }
        let pair = if edge.from <= edge.to {
            (edge.from.as_str(), edge.to.as_str())
        } else {
            (edge.to.as_str(), edge.from.as_str())
        };
        if !pairs.insert(pair) {
            return Err(LayoutError::InvalidGraph(format!(
                "duplicate edge between '{}' and '{}'",
                edge.from, edge.to
            )));
        }
    }
    Ok(())
}

/// Builds internal nodes/edges plus the external-ID lookup tables from a
/// validated snapshot.
pub(crate) fn from_snapshot(
    graph: &lore_graph_core::Graph,
) -> Result<(
    Vec<Node>,
    Vec<Edge>,
    HashMap<String, usize>,
    HashMap<String, usize>,
)> {
    let mut nodes = Vec::with_capacity(graph.nodes.len());
    let mut node_lookup = HashMap::with_capacity(graph.nodes.len());
    for (i, node) in graph.nodes.iter().enumerate() {
        nodes.push(Node::new(node.id.clone()));
        node_lookup.insert(node.id.clone(), i);
    }

    let mut edges = Vec::with_capacity(graph.edges.len());
    let mut edge_lookup = HashMap::with_capacity(graph.edges.len());
    for (i, edge) in graph.edges.iter().enumerate() {
        let source = *node_lookup.get(&edge.from).ok_or_else(|| {
            LayoutError::Internal(format!("endpoint '{}' missing after validation", edge.from))
        })?;
        let target = *node_lookup.get(&edge.to).ok_or_else(|| {
            LayoutError::Internal(format!("endpoint '{}' missing after validation", edge.to))
        })?;
        edges.push(Edge::new(source, target, edge.weight));
        edge_lookup.insert(edge.id.clone(), i);
    }

    Ok((nodes, edges, node_lookup, edge_lookup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lore_graph_core as model;
    use std::sync::Arc;

    fn fixed_conf() -> ForceSimulationConfig {
        ForceSimulationConfig {
            random_float: Arc::new(|| 0.25),
            ..Default::default()
        }
    }

    #[test]
    fn prepare_seeds_unset_positions_only() {
        let conf = fixed_conf();
        let mut nodes = vec![Node::new("a"), Node::at("b", DVec2::new(3.0, 4.0))];
        let mut edges = vec![];
        prepare(&mut nodes, &mut edges, &conf);
        assert_eq!(nodes[0].pos, DVec2::new(250.0, 250.0));
        assert_eq!(nodes[1].pos, DVec2::new(3.0, 4.0));
        assert_eq!(nodes[0].radius, conf.default_node_radius);
    }

    #[test]
    fn prepare_normalizes_weights_and_rebuilds_degrees() {
        let conf = fixed_conf();
        let mut nodes = vec![Node::new("a"), Node::new("b"), Node::new("c")];
        let mut edges = vec![Edge::new(0, 1, 0.0), Edge::new(1, 2, 2.5)];
        prepare(&mut nodes, &mut edges, &conf);
        assert_eq!(edges[0].value, 1.0);
        assert_eq!(nodes[0].degree(), 1.0);
        assert_eq!(nodes[1].degree(), 3.5);
        assert_eq!(nodes[2].degree(), 2.5);

        // A second pass must not double-count.
        prepare(&mut nodes, &mut edges, &conf);
        assert_eq!(nodes[1].degree(), 3.5);
    }

    #[test]
    fn validate_edges_rejects_self_and_out_of_bounds() {
        assert!(validate_edges(2, &[Edge::new(0, 1, 1.0)]).is_ok());
        assert!(matches!(
            validate_edges(2, &[Edge::new(1, 1, 1.0)]),
            Err(LayoutError::InvalidGraph(_))
        ));
        assert!(matches!(
            validate_edges(2, &[Edge::new(0, 2, 1.0)]),
            Err(LayoutError::InvalidGraph(_))
        ));
    }

    fn snapshot(edges: Vec<model::Edge>) -> model::Graph {
        model::Graph {
            nodes: vec![
                model::Node {
                    id: "1".into(),
                    ..Default::default()
                },
                model::Node {
                    id: "2".into(),
                    ..Default::default()
                },
            ],
            edges,
        }
    }

    fn edge(id: &str, from: &str, to: &str, weight: f64) -> model::Edge {
        model::Edge {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            weight,
        }
    }

    #[test]
    fn validate_snapshot_accepts_simple_graph() {
        assert!(validate_snapshot(&snapshot(vec![edge("e", "1", "2", 5.0)])).is_ok());
    }

    #[test]
    fn validate_snapshot_rejects_violations() {
        let cases = [
            snapshot(vec![edge("e", "1", "1", 1.0)]),
            snapshot(vec![edge("e", "1", "3", 1.0)]),
            snapshot(vec![edge("e", "1", "2", -1.0)]),
            snapshot(vec![edge("e", "1", "2", f64::NAN)]),
            snapshot(vec![edge("a", "1", "2", 1.0), edge("b", "2", "1", 1.0)]),
        ];
        for graph in cases {
            assert!(matches!(
                validate_snapshot(&graph),
                Err(LayoutError::InvalidGraph(_))
            ));
        }

        let mut dup_nodes = snapshot(vec![]);
        dup_nodes.nodes.push(model::Node {
            id: "1".into(),
            ..Default::default()
        });
        assert!(validate_snapshot(&dup_nodes).is_err());
    }

    #[test]
    fn from_snapshot_builds_lookup_tables() {
        let graph = snapshot(vec![edge("55", "2", "1", 5.0)]);
        let (nodes, edges, node_lookup, edge_lookup) = from_snapshot(&graph).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(edges, vec![Edge::new(1, 0, 5.0)]);
        assert_eq!(node_lookup["1"], 0);
        assert_eq!(node_lookup["2"], 1);
        assert_eq!(edge_lookup["55"], 0);
    }
}
