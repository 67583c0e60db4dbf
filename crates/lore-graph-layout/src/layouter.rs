//! Stateful online layouter: holds the last simulation state, accepts
//! replacement snapshots and answers position queries while the layout
//! converges.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex, PoisonError, RwLock};
use std::time::Duration;

use lore_graph_core as model;
use tracing::{debug, info};

use crate::config::ForceSimulationConfig;
use crate::error::{LayoutError, Result};
use crate::graph::{self, Edge, Node};
use crate::sim::{CancelToken, ForceSimulation};

/// Alpha decay for the short simulation that places nodes unknown to the
/// current layout. Steeper than the regular schedule: a handful of nodes
/// placed at query time must not cost a full convergence run.
const SYNTHESIS_ALPHA_DECAY: f64 = 0.1;

/// Everything the layouter remembers from the last completed run.
#[derive(Debug, Default)]
struct SimulationState {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_lookup: HashMap<String, usize>,
    edge_lookup: HashMap<String, usize>,
}

/// One-shot latch: starts closed, opens exactly once, observed by any number
/// of waiters. Waiting parks on a condvar (no spinning) and re-checks the
/// cancel token between wakeups.
struct Latch {
    opened: Mutex<bool>,
    signal: Condvar,
}

impl Latch {
    fn new() -> Self {
        Self {
            opened: Mutex::new(false),
            signal: Condvar::new(),
        }
    }

    fn open(&self) {
        let mut opened = self.opened.lock().unwrap_or_else(PoisonError::into_inner);
        *opened = true;
        self.signal.notify_all();
    }

    /// Blocks until the latch opens; returns false if `cancel` fired first.
    fn wait(&self, cancel: &CancelToken) -> bool {
        let mut opened = self.opened.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *opened {
                return true;
            }
            if cancel.is_cancelled() {
                return false;
            }
            let (guard, _timeout) = self
                .signal
                .wait_timeout(opened, Duration::from_millis(20))
                .unwrap_or_else(PoisonError::into_inner);
            opened = guard;
        }
    }
}

/// Online layouter. All methods take `&self`; the instance is meant to be
/// shared across request handlers.
pub struct Layouter {
    sim: ForceSimulation,
    state: RwLock<SimulationState>,
    reload_guard: Mutex<()>,
    initial_layout: Latch,
}

impl Layouter {
    pub fn new() -> Self {
        Self::with_config(ForceSimulationConfig::default())
    }

    pub fn with_config(conf: ForceSimulationConfig) -> Self {
        Self {
            sim: ForceSimulation::new(conf),
            state: RwLock::new(SimulationState::default()),
            reload_guard: Mutex::new(()),
            initial_layout: Latch::new(),
        }
    }

    /// Replaces the layout with one computed for `snapshot`. Reloads are
    /// serialized; a concurrent call waits its turn and then runs against
    /// the committed state. Nodes surviving from the previous snapshot keep
    /// their position and velocity as the simulation's starting point.
    ///
    /// On an invalid snapshot the layouter state is untouched. Cancellation
    /// commits the partial layout as a best-effort result.
    pub fn reload(&self, cancel: &CancelToken, snapshot: &model::Graph) -> Result<()> {
        let _serialized = self
            .reload_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        graph::validate_snapshot(snapshot)?;
        let (mut nodes, mut edges, node_lookup, edge_lookup) = self.internal_from(snapshot)?;

        let stats = self.sim.compute_layout(cancel, &mut nodes, &mut edges)?;

        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            *state = SimulationState {
                nodes,
                edges,
                node_lookup,
                edge_lookup,
            };
            info!(
                nodes = state.nodes.len(),
                edges = state.edges.len(),
                iterations = stats.iterations,
                elapsed_ms = stats.total_time.as_millis() as u64,
                "layout reloaded"
            );
        }
        self.initial_layout.open();
        Ok(())
    }

    /// Internal index of the node behind external ID `id` in the committed
    /// layout. Indices are only stable until the next [`reload`](Self::reload).
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .node_lookup
            .get(id)
            .copied()
    }

    /// Internal index of the edge behind external ID `id` in the committed
    /// layout. Indices are only stable until the next [`reload`](Self::reload).
    pub fn edge_index(&self, id: &str) -> Option<usize> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .edge_lookup
            .get(id)
            .copied()
    }

    /// Builds the internal graph for `snapshot`, carrying position and
    /// velocity over for every external ID that survives from the current
    /// state.
    fn internal_from(
        &self,
        snapshot: &model::Graph,
    ) -> Result<(
        Vec<Node>,
        Vec<Edge>,
        HashMap<String, usize>,
        HashMap<String, usize>,
    )> {
        let (mut nodes, edges, node_lookup, edge_lookup) = graph::from_snapshot(snapshot)?;
        let prev = self.state.read().unwrap_or_else(PoisonError::into_inner);
        for node in &mut nodes {
            if let Some(&i) = prev.node_lookup.get(&node.name) {
                node.pos = prev.nodes[i].pos;
                node.vel = prev.nodes[i].vel;
            }
        }
        Ok((nodes, edges, node_lookup, edge_lookup))
    }

    /// Fills `graph.nodes[*].position` from the current layout. Blocks until
    /// the first reload has completed (or `cancel` fires); later calls never
    /// block. IDs unknown to the layout never fail the call: they are placed
    /// by a short simulation against their known neighbors, pinned where
    /// they currently stand.
    pub fn get_node_positions(
        &self,
        cancel: &CancelToken,
        graph: &mut model::Graph,
    ) -> Result<()> {
        if !self.initial_layout.wait(cancel) {
            debug!("position query cancelled before initial layout");
            return Ok(());
        }

        let mut missing = Vec::new();
        {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            for (i, node) in graph.nodes.iter_mut().enumerate() {
                match state.node_lookup.get(&node.id) {
                    Some(&idx) => {
                        let internal = state.nodes.get(idx).ok_or_else(|| {
                            LayoutError::Internal(format!(
                                "lookup for '{}' points past {} nodes",
                                node.id,
                                state.nodes.len()
                            ))
                        })?;
                        node.position = Some(model::Position::new(internal.pos.x, internal.pos.y));
                    }
                    None => missing.push(i),
                }
            }
        }

        if missing.is_empty() {
            return Ok(());
        }
        debug!(count = missing.len(), "synthesizing positions for unknown ids");
        self.synthesize_positions(cancel, graph, &missing)
    }

    /// Places query nodes that the current layout has never seen: seed them
    /// randomly, pin their known neighbors at today's positions and relax
    /// the small graph with a steep alpha schedule.
    fn synthesize_positions(
        &self,
        cancel: &CancelToken,
        graph: &mut model::Graph,
        missing: &[usize],
    ) -> Result<()> {
        let mut nodes = Vec::with_capacity(missing.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(missing.len());
        for &i in missing {
            let id = &graph.nodes[i].id;
            index
                .entry(id.clone())
                .or_insert_with_key(|key| {
                    nodes.push(Node::new(key.clone()));
                    nodes.len() - 1
                });
        }

        let mut edges = Vec::new();
        {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            for edge in &graph.edges {
                if !index.contains_key(&edge.from) && !index.contains_key(&edge.to) {
                    continue;
                }
                let Some(source) = resolve_endpoint(&edge.from, &mut index, &mut nodes, &state)
                else {
                    continue;
                };
                let Some(target) = resolve_endpoint(&edge.to, &mut index, &mut nodes, &state)
                else {
                    continue;
                };
                if source == target {
                    continue;
                }
                let value = if edge.weight.is_finite() && edge.weight > 0.0 {
                    edge.weight
                } else {
                    0.0
                };
                edges.push(Edge::new(source, target, value));
            }
        }

        let sim = ForceSimulation::new(ForceSimulationConfig {
            alpha_decay: SYNTHESIS_ALPHA_DECAY,
            parallelization: 1,
            ..self.sim.config().clone()
        });
        sim.compute_layout(cancel, &mut nodes, &mut edges)?;

        for &i in missing {
            let node = &mut graph.nodes[i];
            if let Some(&idx) = index.get(&node.id) {
                let pos = nodes[idx].pos;
                node.position = Some(model::Position::new(pos.x, pos.y));
            }
        }
        Ok(())
    }
}

impl Default for Layouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps an edge endpoint into the synthesis graph: missing nodes are already
/// present, known nodes join pinned at their current position, anything else
/// drops the edge.
fn resolve_endpoint(
    id: &str,
    index: &mut HashMap<String, usize>,
    nodes: &mut Vec<Node>,
    state: &SimulationState,
) -> Option<usize> {
    if let Some(&i) = index.get(id) {
        return Some(i);
    }
    let &internal = state.node_lookup.get(id)?;
    let mut pinned = Node::at(id, state.nodes[internal].pos);
    pinned.is_pinned = true;
    index.insert(id.to_string(), nodes.len());
    nodes.push(pinned);
    Some(nodes.len() - 1)
}
