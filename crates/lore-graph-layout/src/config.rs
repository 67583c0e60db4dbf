//! Simulation configuration.

use std::fmt;
use std::sync::Arc;

use glam::DVec2;
use rand::Rng;

use crate::geom::Rect;

/// Injectable source of uniform floats in `[0, 1)`. This is the only source
/// of nondeterminism in the engine; supply a seeded or constant closure for
/// reproducible layouts.
pub type RandomSource = Arc<dyn Fn() -> f64 + Send + Sync>;

/// Configuration for one simulation run. Immutable once the simulation is
/// constructed and freely shareable across worker threads.
#[derive(Clone)]
pub struct ForceSimulationConfig {
    /// Integration step Δt.
    pub frame_time: f64,
    /// Lower bound on pair distances in force formulas; keeps the kernels
    /// finite when two bodies coincide.
    pub min_distance_between_nodes: f64,
    /// Initial simulation temperature.
    pub alpha_init: f64,
    /// Temperature the schedule decays toward.
    pub alpha_target: f64,
    /// Per-tick interpolation factor of the temperature schedule:
    /// `alpha += (alpha_target - alpha) * alpha_decay`.
    pub alpha_decay: f64,
    /// Scales the Coulomb-like repulsion between bodies.
    pub repulsion_multiplier: f64,
    /// Whether every node is pulled toward the rect center.
    pub gravity: bool,
    /// Strength of the center pull, scaled by node size and temperature.
    pub gravity_strength: f64,
    /// Worker count for the sharded repulsion pass. Values below 2 run the
    /// pass on the calling thread.
    pub parallelization: usize,
    /// Use the Barnes-Hut quadtree instead of the O(n²) pairwise sum.
    pub barnes_hut: bool,
    /// Barnes-Hut approximation threshold: a cell of side `s` at distance
    /// `d` is summarized as a point mass when `s / d < theta`.
    pub theta: f64,
    /// World bounds; also the domain for initial placement and NaN
    /// resampling.
    pub rect: Rect,
    /// Positions are clamped to `±(this × rect dimensions)` after
    /// integration.
    pub screen_multiplier_to_clamp_position: f64,
    /// Multiplicative velocity damping per tick, in `[0, 1]`.
    pub velocity_decay: f64,
    /// Radius applied to nodes that do not carry one.
    pub default_node_radius: f64,
    /// Maximum bodies per quadtree leaf before it subdivides.
    pub capacity: usize,
    /// Uniform float source in `[0, 1)`.
    pub random_float: RandomSource,
}

impl ForceSimulationConfig {
    /// Draws a uniform point inside the configured rect.
    pub fn random_point_inside(&self) -> DVec2 {
        self.rect.sample_inside(|| (self.random_float)())
    }
}

impl Default for ForceSimulationConfig {
    fn default() -> Self {
        Self {
            frame_time: 0.016,
            min_distance_between_nodes: 1e-2,
            alpha_init: 1.0,
            alpha_target: 0.0,
            alpha_decay: 0.0235,
            repulsion_multiplier: 10.0,
            gravity: false,
            gravity_strength: 0.5,
            parallelization: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            barnes_hut: true,
            theta: 0.75,
            rect: Rect::new(0.0, 0.0, 1000.0, 1000.0),
            screen_multiplier_to_clamp_position: 100.0,
            velocity_decay: 0.1,
            default_node_radius: 1.0,
            capacity: 10,
            random_float: Arc::new(|| rand::rng().random::<f64>()),
        }
    }
}

impl fmt::Debug for ForceSimulationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForceSimulationConfig")
            .field("frame_time", &self.frame_time)
            .field("min_distance_between_nodes", &self.min_distance_between_nodes)
            .field("alpha_init", &self.alpha_init)
            .field("alpha_target", &self.alpha_target)
            .field("alpha_decay", &self.alpha_decay)
            .field("repulsion_multiplier", &self.repulsion_multiplier)
            .field("gravity", &self.gravity)
            .field("gravity_strength", &self.gravity_strength)
            .field("parallelization", &self.parallelization)
            .field("barnes_hut", &self.barnes_hut)
            .field("theta", &self.theta)
            .field("rect", &self.rect)
            .field(
                "screen_multiplier_to_clamp_position",
                &self.screen_multiplier_to_clamp_position,
            )
            .field("velocity_decay", &self.velocity_decay)
            .field("default_node_radius", &self.default_node_radius)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
