//! Simulation driver: the tick loop, temperature schedule, worker sharding
//! and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::DVec2;
use rayon::prelude::*;
use tracing::{debug, trace, warn};

use crate::config::ForceSimulationConfig;
use crate::error::Result;
use crate::forces;
use crate::geom::{clamp_vec, clamp_vec_symmetric};
use crate::graph::{self, Edge, Node};
use crate::quadtree::{Body, QuadTree};

/// Alpha is considered converged once it is within this distance of
/// `alpha_target`.
const CONVERGENCE_EPSILON: f64 = 0.005;

/// Hard cap on ticks per layout run, independent of the alpha schedule.
const MAX_ITERATIONS: usize = 2000;

/// Componentwise velocity limit applied each tick.
const VELOCITY_LIMIT: f64 = 100.0;

/// Cooperative cancellation flag, polled at tick boundaries. Clone it to
/// hand one end to the caller and keep one in the layout call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; the running layout returns at the next tick
    /// boundary with its current positions.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// What a layout run did: how many ticks and how long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutStats {
    pub iterations: usize,
    pub total_time: Duration,
}

/// The force simulator. Construction is cheap apart from spawning the worker
/// pool; the instance is reusable for any number of layout runs with the
/// same configuration.
pub struct ForceSimulation {
    conf: ForceSimulationConfig,
    pool: Option<rayon::ThreadPool>,
}

impl ForceSimulation {
    pub fn new(conf: ForceSimulationConfig) -> Self {
        let pool = if conf.parallelization > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(conf.parallelization)
                .build()
            {
                Ok(pool) => Some(pool),
                Err(err) => {
                    warn!(%err, "worker pool unavailable, repulsion runs single-threaded");
                    None
                }
            }
        } else {
            None
        };
        Self { conf, pool }
    }

    pub fn config(&self) -> &ForceSimulationConfig {
        &self.conf
    }

    /// Runs the simulation until the temperature reaches its target, the
    /// iteration cap is hit, or `cancel` fires. Node positions are updated
    /// in place; edges are normalized in place (unset weights become 1).
    ///
    /// On cancellation the current positions are returned as-is, without the
    /// NaN sanitation pass: a best-effort snapshot.
    pub fn compute_layout(
        &self,
        cancel: &CancelToken,
        nodes: &mut [Node],
        edges: &mut [Edge],
    ) -> Result<LayoutStats> {
        graph::validate_edges(nodes.len(), edges)?;
        graph::prepare(nodes, edges, &self.conf);

        let mut quadtree = self
            .conf
            .barnes_hut
            .then(|| QuadTree::new(self.conf.rect, self.conf.capacity));

        let start = Instant::now();
        let mut alpha = self.conf.alpha_init;
        let mut iterations = 0usize;
        let cancelled = loop {
            if cancel.is_cancelled() {
                break true;
            }

            self.tick(alpha, nodes, edges, quadtree.as_mut());

            alpha += (self.conf.alpha_target - alpha) * self.conf.alpha_decay;
            iterations += 1;
            if alpha <= self.conf.alpha_target + CONVERGENCE_EPSILON
                || iterations >= MAX_ITERATIONS
            {
                break false;
            }
        };

        if cancelled {
            debug!(iterations, "layout cancelled, returning partial positions");
        } else {
            self.sanitize(nodes);
        }

        let stats = LayoutStats {
            iterations,
            total_time: start.elapsed(),
        };
        debug!(
            iterations = stats.iterations,
            elapsed_ms = stats.total_time.as_millis() as u64,
            nodes = nodes.len(),
            edges = edges.len(),
            "layout finished"
        );
        Ok(stats)
    }

    /// One tick: reset accumulators, gravity, attraction, sharded
    /// repulsion, then the single-threaded integration tail.
    fn tick(&self, alpha: f64, nodes: &mut [Node], edges: &[Edge], quadtree: Option<&mut QuadTree>) {
        for node in nodes.iter_mut() {
            node.acc = DVec2::ZERO;
        }

        if self.conf.gravity {
            self.gravity_pass(alpha, nodes);
        }
        self.attraction_pass(nodes, edges);
        self.repulsion_pass(nodes, quadtree);
        self.integration_pass(nodes);
    }

    fn gravity_pass(&self, alpha: f64, nodes: &mut [Node]) {
        let center = self.conf.rect.center();
        for node in nodes.iter_mut() {
            let delta = center - node.pos;
            node.acc += delta * (self.conf.gravity_strength * node.size() * alpha);
        }
    }

    fn attraction_pass(&self, nodes: &mut [Node], edges: &[Edge]) {
        for edge in edges {
            let force = forces::attraction(
                &nodes[edge.source],
                &nodes[edge.target],
                edge.value,
                &self.conf,
            );
            nodes[edge.source].acc -= force;
            nodes[edge.target].acc += force;
        }
    }

    /// Per-node repulsion over an immutable `(index, pos, mass)` snapshot.
    /// Workers read the shared snapshot/tree and write only their own output
    /// slot; results are collected index-ordered, so the outcome does not
    /// depend on scheduling.
    fn repulsion_pass(&self, nodes: &mut [Node], quadtree: Option<&mut QuadTree>) {
        let snapshot: Vec<Body> = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| Body {
                index,
                pos: node.pos,
                mass: node.size(),
            })
            .collect();

        let quadtree: Option<&QuadTree> = if let Some(qt) = quadtree {
            qt.clear();
            for body in &snapshot {
                if !qt.insert(*body) {
                    trace!(index = body.index, "body outside world rect, skipped by quadtree");
                }
            }
            qt.calculate_masses();
            Some(&*qt)
        } else {
            None
        };

        let conf = &self.conf;
        let force_on = |body: &Body| -> DVec2 {
            match quadtree {
                Some(qt) => qt.calculate_force(body, conf.theta, conf),
                None => snapshot
                    .iter()
                    .filter(|other| other.index != body.index)
                    .fold(DVec2::ZERO, |acc, other| {
                        acc + forces::repulsion(body.pos, body.mass, other.pos, other.mass, conf)
                    }),
            }
        };

        let forces: Vec<DVec2> = match &self.pool {
            Some(pool) => pool.install(|| snapshot.par_iter().map(force_on).collect()),
            None => snapshot.iter().map(force_on).collect(),
        };

        for (node, force) in nodes.iter_mut().zip(forces) {
            node.acc += force;
        }
    }

    fn integration_pass(&self, nodes: &mut [Node]) {
        let limit = DVec2::new(
            self.conf.screen_multiplier_to_clamp_position * self.conf.rect.width,
            self.conf.screen_multiplier_to_clamp_position * self.conf.rect.height,
        );
        for node in nodes.iter_mut() {
            if node.is_pinned {
                continue;
            }
            node.vel += node.acc;
            node.vel *= 1.0 - self.conf.velocity_decay;
            node.vel = clamp_vec_symmetric(node.vel, VELOCITY_LIMIT);
            node.pos += node.vel * self.conf.frame_time;
            node.pos = clamp_vec(node.pos, -limit, limit);
        }
    }

    /// Resets any node whose position went NaN to a random point inside the
    /// world rect. Velocity is zeroed too so the NaN cannot resurface when
    /// the node is carried into a later run.
    fn sanitize(&self, nodes: &mut [Node]) {
        for node in nodes.iter_mut() {
            if node.pos.x.is_nan() || node.pos.y.is_nan() {
                node.pos = self.conf.random_point_inside();
                node.vel = DVec2::ZERO;
            }
        }
    }

    /// Spring force on `from` toward `to` over an edge of weight `weight`.
    /// Exposed for callers that tune force parameters.
    pub fn attraction_force(&self, from: &Node, to: &Node, weight: f64) -> DVec2 {
        forces::attraction(from, to, weight, &self.conf)
    }

    /// Repulsion exerted on `a` by `b`, using node degrees as masses.
    pub fn repulsion_force(&self, a: &Node, b: &Node) -> DVec2 {
        forces::repulsion(a.pos, a.size(), b.pos, b.size(), &self.conf)
    }
}
