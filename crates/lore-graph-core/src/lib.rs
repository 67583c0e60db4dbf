//! Core domain types shared across the lore-graph workspace.
//!
//! The knowledge graph is collaboratively edited, so every entity carries a
//! stable string identifier assigned by the store. The layout engine treats
//! these types as a read-only snapshot; it never mutates anything here except
//! `Node::position` when answering a position query.

use serde::{Deserialize, Serialize};

/// A point in layout space. The engine is 2-D; `z` is carried for API
/// compatibility with 3-D clients and is always written as zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// Creates a position on the z = 0 plane.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// A node of the knowledge graph as seen by clients.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier assigned by the graph store.
    pub id: String,
    /// Human readable description shown in clients.
    #[serde(default)]
    pub description: String,
    /// Layout position, filled in by the layout engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// A weighted, undirected edge between two nodes.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Stable identifier assigned by the graph store.
    pub id: String,
    /// External ID of the first endpoint.
    pub from: String,
    /// External ID of the second endpoint.
    pub to: String,
    /// Aggregated vote weight. Zero means "not voted on yet".
    #[serde(default)]
    pub weight: f64,
}

/// A snapshot of the knowledge graph: what the store hands to the layout
/// engine and what position queries are answered against.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    /// Creates an empty graph snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of nodes in the snapshot.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges in the snapshot.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_defaults_to_plane() {
        let p = Position::new(1.5, -2.0);
        assert_eq!(p.z, 0.0);
    }

    #[test]
    fn graph_roundtrips_through_json() {
        let g = Graph {
            nodes: vec![Node {
                id: "n1".into(),
                description: "intro to calculus".into(),
                position: Some(Position::new(3.0, 4.0)),
            }],
            edges: vec![Edge {
                id: "e1".into(),
                from: "n1".into(),
                to: "n2".into(),
                weight: 5.0,
            }],
        };
        let json = serde_json::to_string(&g).unwrap();
        let back: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(g, back);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let g: Graph = serde_json::from_str(r#"{"nodes":[{"id":"a"}]}"#).unwrap();
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.edge_count(), 0);
        assert!(g.nodes[0].position.is_none());
    }
}
