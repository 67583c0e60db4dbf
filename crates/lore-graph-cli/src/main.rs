//! lg-layout - run a force simulation on the graph received on stdin.
//!
//! Reads one JSON object (`{"nodes": [...], "edges": [...]}`), computes a
//! layout and writes the same object with every node position populated to
//! stdout. Diagnostics go to stderr so the output stream stays parseable.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use lore_graph_layout::{
    CancelToken, DVec2, Edge, ForceSimulation, ForceSimulationConfig, Node, RandomSource, Rect,
};

/// Compute a force-directed layout for a JSON graph (stdin -> stdout).
#[derive(Parser, Debug)]
#[command(name = "lg-layout", version, about)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// World width the layout unfolds in.
    #[arg(long, default_value_t = 20_000.0)]
    width: f64,

    /// World height the layout unfolds in.
    #[arg(long, default_value_t = 10_000.0)]
    height: f64,

    /// Disable the Barnes-Hut approximation and use exact pairwise
    /// repulsion.
    #[arg(long)]
    naive: bool,

    /// Barnes-Hut approximation threshold.
    #[arg(long, default_value_t = 0.75)]
    theta: f64,

    /// Pull strength toward the world center; 0 disables gravity.
    #[arg(long, default_value_t = 0.1)]
    gravity_strength: f64,

    /// Worker threads for the repulsion pass.
    #[arg(long, default_value_t = 2 * num_cpus::get())]
    parallelism: usize,

    /// Seed for the layout RNG; fixed seeds give reproducible output.
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn config(&self) -> ForceSimulationConfig {
        let random_float: RandomSource = match self.seed {
            Some(seed) => {
                let rng = Mutex::new(StdRng::seed_from_u64(seed));
                Arc::new(move || rng.lock().unwrap_or_else(PoisonError::into_inner).random())
            }
            None => Arc::new(|| rand::rng().random()),
        };
        ForceSimulationConfig {
            frame_time: 1.0,
            min_distance_between_nodes: 100.0,
            alpha_init: 1.0,
            alpha_decay: 0.005,
            alpha_target: 0.10,
            repulsion_multiplier: 10.0,
            gravity: self.gravity_strength > 0.0,
            gravity_strength: self.gravity_strength,
            parallelization: self.parallelism,
            barnes_hut: !self.naive,
            theta: self.theta,
            rect: Rect::new(0.0, 0.0, self.width, self.height),
            screen_multiplier_to_clamp_position: 1000.0,
            random_float,
            ..Default::default()
        }
    }
}

/// Wire format of the graph on stdin/stdout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct WireGraph {
    #[serde(default)]
    nodes: Vec<WireNode>,
    #[serde(default)]
    edges: Vec<WireEdge>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireNode {
    id: String,
    #[serde(default)]
    pos: Option<WirePosition>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct WirePosition {
    x: f64,
    y: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireEdge {
    source: usize,
    target: usize,
    #[serde(default)]
    value: f64,
}

impl WireGraph {
    fn into_layout(self) -> (Vec<Node>, Vec<Edge>) {
        let nodes = self
            .nodes
            .into_iter()
            .map(|n| match n.pos {
                Some(p) => Node::at(n.id, DVec2::new(p.x, p.y)),
                None => Node::new(n.id),
            })
            .collect();
        let edges = self
            .edges
            .into_iter()
            .map(|e| Edge::new(e.source, e.target, e.value))
            .collect();
        (nodes, edges)
    }

    fn from_layout(nodes: &[Node], edges: &[Edge]) -> Self {
        Self {
            nodes: nodes
                .iter()
                .map(|n| WireNode {
                    id: n.name.clone(),
                    pos: Some(WirePosition {
                        x: n.pos.x,
                        y: n.pos.y,
                    }),
                })
                .collect(),
            edges: edges
                .iter()
                .map(|e| WireEdge {
                    source: e.source,
                    target: e.target,
                    value: e.value,
                })
                .collect(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let wire: WireGraph =
        serde_json::from_reader(io::stdin().lock()).context("reading graph from stdin")?;
    let (mut nodes, mut edges) = wire.into_layout();

    let conf = cli.config();
    debug!(?conf, nodes = nodes.len(), edges = edges.len(), "starting layout");

    let sim = ForceSimulation::new(conf.clone());
    let stats = sim
        .compute_layout(&CancelToken::new(), &mut nodes, &mut edges)
        .context("computing layout")?;

    // The driver already sanitizes, but the output contract is absolute: no
    // NaN ever reaches stdout.
    for node in &mut nodes {
        if node.pos.x.is_nan() || node.pos.y.is_nan() {
            node.pos = conf.random_point_inside();
        }
    }

    serde_json::to_writer(io::stdout().lock(), &WireGraph::from_layout(&nodes, &edges))
        .context("writing graph to stdout")?;
    println!();

    info!(
        iterations = stats.iterations,
        elapsed_ms = stats.total_time.as_millis() as u64,
        "layout computed"
    );
    Ok(())
}
