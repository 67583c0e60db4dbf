//! Barnes-Hut quadtree: approximate O(log n) repulsion queries by
//! summarizing distant clusters as point masses.

use glam::DVec2;

use crate::config::ForceSimulationConfig;
use crate::forces;
use crate::geom::Rect;

/// A point mass inserted into the tree: an internal node's index, position
/// and mass (its degree). Cluster summaries reuse the same two quantities
/// (centroid and total mass), so the force kernel treats both shapes
/// uniformly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub index: usize,
    pub pos: DVec2,
    pub mass: f64,
}

/// One cell of the quadtree. The root is rebuilt from scratch every
/// simulation tick: `clear` → `insert` all bodies → `calculate_masses`.
#[derive(Debug)]
pub struct QuadTree {
    region: Rect,
    capacity: usize,
    center: DVec2,
    total_mass: f64,
    bodies: Vec<Body>,
    children: Option<Box<[QuadTree; 4]>>,
}

impl QuadTree {
    pub fn new(region: Rect, capacity: usize) -> Self {
        Self {
            region,
            capacity: capacity.max(1),
            center: DVec2::ZERO,
            total_mass: 0.0,
            bodies: Vec::new(),
            children: None,
        }
    }

    /// Mass-weighted centroid of everything below this cell.
    pub fn center(&self) -> DVec2 {
        self.center
    }

    /// Total mass of everything below this cell.
    pub fn total_mass(&self) -> f64 {
        self.total_mass
    }

    /// Resets mass, centroid, bodies and children; the region is preserved
    /// so the tree can be refilled for the next tick.
    pub fn clear(&mut self) {
        self.center = DVec2::ZERO;
        self.total_mass = 0.0;
        self.bodies.clear();
        self.children = None;
    }

    /// Inserts a body, returning whether its position lies within this
    /// cell's region. A full leaf subdivides once and redistributes; a body
    /// on a shared child boundary goes to the first containing child, which
    /// keeps placement deterministic.
    pub fn insert(&mut self, body: Body) -> bool {
        if !self.region.contains(body.pos) {
            return false;
        }
        if self.children.is_none() {
            if self.bodies.len() < self.capacity {
                self.bodies.push(body);
                return true;
            }
            self.subdivide();
        }
        if let Some(children) = self.children.as_deref_mut() {
            for child in children {
                if child.insert(body) {
                    return true;
                }
            }
        }
        false
    }

    fn subdivide(&mut self) {
        let Rect {
            x,
            y,
            width,
            height,
        } = self.region;
        let (hw, hh) = (width / 2.0, height / 2.0);
        let mut children = Box::new([
            QuadTree::new(Rect::new(x, y, hw, hh), self.capacity),
            QuadTree::new(Rect::new(x + hw, y, hw, hh), self.capacity),
            QuadTree::new(Rect::new(x, y + hh, hw, hh), self.capacity),
            QuadTree::new(Rect::new(x + hw, y + hh, hw, hh), self.capacity),
        ]);
        for body in self.bodies.drain(..) {
            for child in children.iter_mut() {
                if child.insert(body) {
                    break;
                }
            }
        }
        self.children = Some(children);
    }

    /// Bottom-up aggregation of total mass and mass-weighted centroid. A
    /// cell whose accumulated mass is zero keeps a zero centroid and is
    /// skipped by force queries.
    pub fn calculate_masses(&mut self) {
        self.total_mass = 0.0;
        self.center = DVec2::ZERO;
        match self.children.as_deref_mut() {
            None => {
                for body in &self.bodies {
                    self.total_mass += body.mass;
                    self.center += body.pos * body.mass;
                }
            }
            Some(children) => {
                for child in children {
                    child.calculate_masses();
                    self.total_mass += child.total_mass;
                    self.center += child.center * child.total_mass;
                }
            }
        }
        if self.total_mass > 0.0 {
            self.center /= self.total_mass;
        }
    }

    /// Net repulsion exerted on `body` by everything in this cell. Leaves
    /// sum exact pairwise forces (skipping the body itself); an internal
    /// cell of side `s` at distance `d` with `s / d < theta` is summarized
    /// as a single point mass at its centroid, otherwise the query recurses.
    pub fn calculate_force(&self, body: &Body, theta: f64, conf: &ForceSimulationConfig) -> DVec2 {
        match self.children.as_deref() {
            None => self
                .bodies
                .iter()
                .filter(|other| other.index != body.index)
                .fold(DVec2::ZERO, |acc, other| {
                    acc + forces::repulsion(body.pos, body.mass, other.pos, other.mass, conf)
                }),
            Some(children) => {
                if self.total_mass <= 0.0 {
                    return DVec2::ZERO;
                }
                let d = (body.pos - self.center).length();
                let s = self.region.width;
                if s / d < theta {
                    forces::repulsion(body.pos, body.mass, self.center, self.total_mass, conf)
                } else {
                    children.iter().fold(DVec2::ZERO, |acc, child| {
                        acc + child.calculate_force(body, theta, conf)
                    })
                }
            }
        }
    }
}
