//! Force Layout
//!
//! One step of a spring/repulsion simulation over a scope's nodes. The input
//! snapshot is never mutated; the result is a complete new snapshot that can
//! be fed straight into the next step.

use crate::node::Node;
use crate::types::{EdgeMap, Hash};
use std::collections::BTreeMap;
use std::f64::consts::TAU;

/// Nodes of a layout snapshot keyed by node hash
pub type ForceNodeMap = BTreeMap<Hash, ForceNode>;

/// Distance assumed between coincident nodes when computing repulsion
const COINCIDENT_DISTANCE: f64 = 1.0;
const COINCIDENT_EPSILON_SQ: f64 = 1e-12;
const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_749_895;

/// Layout-side view of a node
#[derive(Debug, Clone, PartialEq)]
pub struct ForceNode {
    pub node_hash: Hash,
    pub title: String,
    pub thumbnail: String,
    /// Pinned nodes keep their position and still push and pull others
    pub movable: bool,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub links: EdgeMap,
    pub referers: EdgeMap,
}

impl ForceNode {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.vx.is_finite() && self.vy.is_finite()
    }
}

/// Movable node at the origin carrying the node's edges
pub fn node_to_force_node(node: &Node) -> ForceNode {
    ForceNode {
        node_hash: node.hash.clone(),
        title: node.title.clone(),
        thumbnail: node.thumbnail.clone(),
        movable: true,
        x: 0.0,
        y: 0.0,
        vx: 0.0,
        vy: 0.0,
        links: node.vector.clone(),
        referers: node.referers.clone(),
    }
}

/// Box that velocities are reflected against when enabled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

/// Simulation constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub repulsion: f64,
    pub spring: f64,
    pub damping: f64,
    /// Reflection is off unless bounds are given
    pub bounds: Option<Bounds>,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            repulsion: 600.0,
            spring: 0.05,
            damping: 0.7,
            bounds: None,
        }
    }
}

/// Advance every movable node by one simulation step.
pub fn step(nodes: &ForceNodeMap, params: &LayoutParams) -> ForceNodeMap {
    nodes
        .iter()
        .map(|(hash, node)| (hash.clone(), step_node(hash, node, nodes, params)))
        .collect()
}

fn step_node(hash: &str, node: &ForceNode, nodes: &ForceNodeMap, params: &LayoutParams) -> ForceNode {
    let mut next = node.clone();
    if !node.movable {
        next.vx = 0.0;
        next.vy = 0.0;
        return next;
    }

    let (mut fx, mut fy) = (0.0, 0.0);

    for (other_hash, other) in nodes {
        if other_hash == hash {
            continue;
        }
        let (rx, ry) = repulsion_between(hash, node, other_hash, other, params.repulsion);
        fx += rx;
        fy += ry;
    }

    let mut merged = node.links.clone();
    for (target, labels) in &node.referers {
        merged.insert(target.clone(), labels.clone());
    }
    for (target_hash, labels) in &merged {
        if target_hash == &node.node_hash {
            continue;
        }
        let Some(target) = nodes.get(target_hash) else {
            continue;
        };
        // One spring per label
        for _ in labels {
            fx += params.spring * (target.x - node.x);
            fy += params.spring * (target.y - node.y);
        }
    }

    let mut vx = (node.vx + fx) * params.damping;
    let mut vy = (node.vy + fy) * params.damping;

    if let Some(bounds) = params.bounds {
        if node.x + vx <= 0.0 || bounds.width <= node.x + vx {
            vx = -vx;
        }
        if node.y + vy <= 0.0 || bounds.height <= node.y + vy {
            vy = -vy;
        }
    }

    next.vx = vx;
    next.vy = vy;
    next.x = node.x + vx;
    next.y = node.y + vy;
    next
}

fn repulsion_between(
    hash: &str,
    node: &ForceNode,
    other_hash: &str,
    other: &ForceNode,
    strength: f64,
) -> (f64, f64) {
    let dx = node.x - other.x;
    let dy = node.y - other.y;
    let distance_sq = dx * dx + dy * dy;
    if distance_sq > COINCIDENT_EPSILON_SQ {
        return (strength * dx / distance_sq, strength * dy / distance_sq);
    }

    let (dir_x, dir_y) = coincident_direction(hash, other_hash);
    let magnitude = strength / COINCIDENT_DISTANCE;
    (dir_x * magnitude, dir_y * magnitude)
}

/// Unit direction separating a coincident pair; opposite for the two members.
fn coincident_direction(hash: &str, other_hash: &str) -> (f64, f64) {
    let (first, second, sign) = if hash <= other_hash {
        (hash, other_hash, 1.0)
    } else {
        (other_hash, hash, -1.0)
    };
    let seed = first
        .bytes()
        .chain(std::iter::once(b':'))
        .chain(second.bytes())
        .fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| {
            (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        });
    let angle = ((seed % 1_000_003) as f64 * GOLDEN_RATIO_CONJUGATE).fract() * TAU;
    (sign * angle.cos(), sign * angle.sin())
}
