//! End-to-end tests for the force simulation: convergence scenarios and the
//! invariants callers rely on.

use std::sync::{Arc, Mutex, PoisonError};

use lore_graph_layout::{
    CancelToken, DVec2, Edge, ForceSimulation, ForceSimulationConfig, Node, RandomSource, Rect,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn constant_source(value: f64) -> RandomSource {
    Arc::new(move || value)
}

fn seeded_source(seed: u64) -> RandomSource {
    let rng = Mutex::new(StdRng::seed_from_u64(seed));
    Arc::new(move || rng.lock().unwrap_or_else(PoisonError::into_inner).random())
}

fn run(
    conf: ForceSimulationConfig,
    mut nodes: Vec<Node>,
    mut edges: Vec<Edge>,
) -> (Vec<Node>, lore_graph_layout::LayoutStats) {
    let sim = ForceSimulation::new(conf);
    let stats = sim
        .compute_layout(&CancelToken::new(), &mut nodes, &mut edges)
        .expect("layout");
    (nodes, stats)
}

// ============================================================================
// Convergence scenarios
// ============================================================================

#[test]
fn connected_nodes_contract_toward_their_midpoint() {
    let conf = ForceSimulationConfig {
        random_float: constant_source(1.0),
        ..Default::default()
    };
    let nodes = vec![
        Node::at("A", DVec2::new(1.0, 1.0)),
        Node::at("B", DVec2::new(200.0, 200.0)),
    ];
    let edges = vec![Edge::new(0, 1, 1.0)];
    let (nodes, stats) = run(conf, nodes, edges);

    // The pair settles around its midpoint, (100.5, 100.5).
    for node in &nodes {
        assert!(node.pos.x > 90.0 && node.pos.x < 110.0, "{node:?}");
        assert!(node.pos.y > 90.0 && node.pos.y < 110.0, "{node:?}");
    }
    assert!(stats.total_time.as_nanos() > 0);
    assert_eq!(stats.iterations, 223);
}

#[test]
fn overlapping_connected_nodes_separate() {
    let conf = ForceSimulationConfig {
        random_float: constant_source(1.0),
        ..Default::default()
    };
    let nodes = vec![
        Node::at("A", DVec2::new(9.0, 9.0)),
        Node::at("B", DVec2::new(10.0, 10.0)),
    ];
    let edges = vec![Edge::new(0, 1, 1.0)];
    let (nodes, _) = run(conf, nodes, edges);

    assert!(nodes[0].pos.x < 8.0, "{:?}", nodes[0]);
    assert!(nodes[0].pos.y < 8.0, "{:?}", nodes[0]);
    assert!(nodes[1].pos.x > 10.0, "{:?}", nodes[1]);
    assert!(nodes[1].pos.y > 10.0, "{:?}", nodes[1]);
}

#[test]
fn cancelled_before_the_first_tick_returns_inputs_unchanged() {
    let sim = ForceSimulation::new(ForceSimulationConfig {
        random_float: constant_source(1.0),
        ..Default::default()
    });
    let cancel = CancelToken::new();
    cancel.cancel();

    let p0 = DVec2::new(1.0, 1.0);
    let p1 = DVec2::new(2.0, 2.0);
    let mut nodes = vec![Node::at("A", p0), Node::at("B", p1)];
    let mut edges = vec![];
    let stats = sim
        .compute_layout(&cancel, &mut nodes, &mut edges)
        .expect("layout");

    assert_eq!(nodes[0].pos, p0);
    assert_eq!(nodes[1].pos, p1);
    assert_eq!(stats.iterations, 0);
}

#[test]
fn attraction_force_is_exact_for_known_inputs() {
    let sim = ForceSimulation::new(ForceSimulationConfig::default());
    let mut from = Node::at("from", DVec2::new(1.0, 1.0));
    let mut to = Node::at("to", DVec2::new(4.0, 5.0));
    from.radius = 1.0;
    to.radius = 1.0;

    let f = sim.attraction_force(&from, &to, 1.0);
    assert!((f.x - -1.8).abs() < 1e-9, "{f:?}");
    assert!((f.y - -2.4).abs() < 1e-9, "{f:?}");

    from.pos = DVec2::new(10.0, 10.0);
    to.pos = DVec2::new(40.0, 50.0);
    let f = sim.attraction_force(&from, &to, 1.0);
    assert!((f.x - -28.8).abs() < 1e-9, "{f:?}");
    assert!((f.y - -38.4).abs() < 1e-9, "{f:?}");
}

// ============================================================================
// Invariants
// ============================================================================

fn ring_graph(n: usize) -> (Vec<Node>, Vec<Edge>) {
    let nodes = (0..n).map(|i| Node::new(format!("n{i}"))).collect();
    let edges = (0..n)
        .map(|i| Edge::new(i, (i + 1) % n, 1.0 + (i % 3) as f64))
        .collect();
    (nodes, edges)
}

#[test]
fn fixed_rng_makes_layouts_bit_identical() {
    let positions = |seed: u64| -> Vec<DVec2> {
        let conf = ForceSimulationConfig {
            random_float: seeded_source(seed),
            parallelization: 4,
            ..Default::default()
        };
        let (nodes, edges) = ring_graph(40);
        let (nodes, _) = run(conf, nodes, edges);
        nodes.into_iter().map(|n| n.pos).collect()
    };
    assert_eq!(positions(42), positions(42));
    assert_ne!(positions(42), positions(43));
}

#[test]
fn output_stays_inside_the_clamp_rectangle() {
    let conf = ForceSimulationConfig {
        rect: Rect::new(0.0, 0.0, 50.0, 40.0),
        screen_multiplier_to_clamp_position: 2.0,
        random_float: seeded_source(9),
        ..Default::default()
    };
    let limit_x = 2.0 * 50.0;
    let limit_y = 2.0 * 40.0;
    let (nodes, edges) = ring_graph(30);
    let (nodes, _) = run(conf, nodes, edges);
    for node in &nodes {
        assert!(node.pos.x.abs() <= limit_x, "{node:?}");
        assert!(node.pos.y.abs() <= limit_y, "{node:?}");
    }
}

#[test]
fn no_nan_positions_on_normal_termination() {
    let conf = ForceSimulationConfig {
        random_float: seeded_source(4),
        ..Default::default()
    };
    let (nodes, edges) = ring_graph(25);
    let (nodes, stats) = run(conf, nodes, edges);
    for node in &nodes {
        assert!(!node.pos.x.is_nan() && !node.pos.y.is_nan(), "{node:?}");
    }
    assert!(stats.iterations <= 2000);
}

#[test]
fn degrees_account_for_every_edge_twice() {
    let conf = ForceSimulationConfig {
        random_float: seeded_source(6),
        ..Default::default()
    };
    let sim = ForceSimulation::new(conf);
    let (mut nodes, mut edges) = ring_graph(12);
    sim.compute_layout(&CancelToken::new(), &mut nodes, &mut edges)
        .expect("layout");

    let degree_sum: f64 = nodes.iter().map(|n| n.degree()).sum();
    let weight_sum: f64 = edges.iter().map(|e| e.value).sum();
    assert!((degree_sum - 2.0 * weight_sum).abs() < 1e-9);
}

#[test]
fn barnes_hut_scales_to_a_larger_graph() {
    // A few hundred nodes through the quadtree path: everything stays
    // finite and inside bounds, and the run respects the iteration cap.
    let conf = ForceSimulationConfig {
        random_float: seeded_source(123),
        barnes_hut: true,
        ..Default::default()
    };
    let n = 300;
    let nodes: Vec<Node> = (0..n).map(|i| Node::new(format!("n{i}"))).collect();
    let mut edges = Vec::new();
    for i in 1..n {
        edges.push(Edge::new(i, (i - 1) / 2, 1.0));
    }
    let (nodes, stats) = run(conf, nodes, edges);
    assert!(stats.iterations <= 2000);
    for node in &nodes {
        assert!(node.pos.x.is_finite() && node.pos.y.is_finite());
    }
}
