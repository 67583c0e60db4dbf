//! Force-directed layout engine for the lore-graph knowledge graph.
//!
//! Two layers:
//!
//! - [`ForceSimulation`] — pure computation. Given nodes, weighted edges and
//!   a [`ForceSimulationConfig`], it iterates attraction along edges,
//!   Barnes-Hut (or naive) repulsion between all bodies, optional center
//!   gravity and a damped integrator until the simulation temperature decays
//!   to its target.
//! - [`Layouter`] — stateful façade. It keeps the last computed layout,
//!   diffs incoming snapshots against it so surviving nodes keep their
//!   positions, and answers position queries while a layout converges.
//!
//! ```text
//! snapshot ──▶ adapter ──▶ ┌───────────────────────────────┐
//!                          │ per tick:                     │
//!                          │  gravity → attraction →       │
//!                          │  repulsion (sharded workers,  │
//!                          │  Barnes-Hut quadtree) →       │
//!                          │  integrate → α update         │
//!                          └──────────────┬────────────────┘
//!                                         ▼
//!                        positions, preserved across reloads
//! ```
//!
//! The repulsion pass shards nodes across a worker pool; every worker reads
//! a shared immutable snapshot and writes only its own output slot, so ticks
//! are deterministic under a fixed [`RandomSource`].

mod config;
mod error;
mod forces;
mod geom;
mod graph;
mod layouter;
mod quadtree;
mod sim;

pub use config::{ForceSimulationConfig, RandomSource};
pub use error::{LayoutError, Result};
pub use geom::{is_close, is_close_tol, is_close_vec, Rect};
pub use graph::{Edge, Node};
pub use layouter::Layouter;
pub use quadtree::{Body, QuadTree};
pub use sim::{CancelToken, ForceSimulation, LayoutStats};

/// Re-exported so callers can name positions without depending on glam
/// directly.
pub use glam::DVec2;
