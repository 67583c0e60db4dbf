//! Force kernels. All distances are clamped from below by
//! `min_distance_between_nodes` so no kernel can produce a singularity.

use glam::DVec2;

use crate::config::ForceSimulationConfig;
use crate::graph::Node;

/// Spring force along an edge of weight `weight`, returned from the
/// perspective of `from`: subtract it from `from`'s accumulator and add it
/// to `to`'s. The magnitude grows linearly with the surface distance
/// between the two nodes, so overlapping nodes are pushed apart by the same
/// spring that pulls distant ones together.
pub(crate) fn attraction(
    from: &Node,
    to: &Node,
    weight: f64,
    conf: &ForceSimulationConfig,
) -> DVec2 {
    let delta = from.pos - to.pos;
    let dist = delta.length().max(conf.min_distance_between_nodes);
    let unit = delta / dist;
    unit * ((dist - from.radius - to.radius) * weight)
}

/// Coulomb-like repulsion exerted on the body at `pos_a`, with magnitude
/// `repulsion_multiplier · size_a · size_b / d` over the clamped distance.
/// Works identically for real nodes and quadtree cluster summaries.
pub(crate) fn repulsion(
    pos_a: DVec2,
    size_a: f64,
    pos_b: DVec2,
    size_b: f64,
    conf: &ForceSimulationConfig,
) -> DVec2 {
    let delta = pos_a - pos_b;
    let dist = delta.length().max(conf.min_distance_between_nodes);
    let unit = delta / dist;
    unit * (conf.repulsion_multiplier * size_a * size_b / dist)
}
