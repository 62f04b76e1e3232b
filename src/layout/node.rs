//! A single placed node, either a paper (level 0) or a coarsened cluster of
//! nodes from the level below.

use crate::paper::PaperId;
use rand::Rng;

/// Index of a node within a [`super::Layout`]'s arena. Indices are only
/// valid against the `Layout` that produced them; coarsening allocates a
/// fresh arena per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone)]
pub struct LayoutNode {
    /// Stable id: the paper's date-based id at level 0, a synthetic
    /// counter (assigned at coarsening time) above it.
    pub id: u32,
    /// `Some` only at level 0, where a node corresponds to exactly one
    /// paper.
    pub paper: Option<PaperId>,
    pub x: f64,
    pub y: f64,
    pub mass: f64,
    pub radius: f64,
    /// Force accumulated during the current iteration; zeroed at the start
    /// of every step.
    pub fx: f64,
    pub fy: f64,
    /// Indices into the owning `Layout::links` incident to this node.
    pub link_ids: Vec<u32>,
    /// Set once this node is merged into a coarser node during
    /// coarsening.
    pub coarse_parent: Option<NodeId>,
    /// Populated only on coarse nodes: the one or two nodes in the level
    /// below that were merged to form this one.
    pub children: Vec<NodeId>,
}

impl LayoutNode {
    pub fn new(id: u32, paper: Option<PaperId>) -> Self {
        LayoutNode {
            id,
            paper,
            x: 0.0,
            y: 0.0,
            mass: 1.0,
            radius: 1.0,
            fx: 0.0,
            fy: 0.0,
            link_ids: Vec::new(),
            coarse_parent: None,
            children: Vec::new(),
        }
    }
}

/// Weighted average of a node's immediate neighbours' positions, jittered
/// so that newly placed nodes never start exactly on top of a neighbour.
/// Falls back to a uniform draw in `[-50, 50]^2` for an isolated node, so
/// disconnected nodes spread out instead of stacking on top of each other.
/// Mirrors `layout_node_compute_best_start_position`.
pub fn compute_best_start_position(
    layout: &super::Layout,
    node: NodeId,
    jitter: f64,
    rng: &mut impl Rng,
) -> (f64, f64) {
    let n = &layout.nodes[node.0 as usize];
    let mut wx = 0.0;
    let mut wy = 0.0;
    let mut total_w = 0.0;
    for &link_id in &n.link_ids {
        let link = &layout.links[link_id as usize];
        let other = if link.a == node { link.b } else { link.a };
        let o = &layout.nodes[other.0 as usize];
        wx += o.x * link.weight;
        wy += o.y * link.weight;
        total_w += link.weight;
    }

    if total_w == 0.0 {
        return (rng.gen_range(-50.0..=50.0), rng.gen_range(-50.0..=50.0));
    }

    let base_x = wx / total_w;
    let base_y = wy / total_w;
    let angle = rng.gen::<f64>() * std::f64::consts::TAU;
    let r = rng.gen::<f64>() * jitter;
    (base_x + r * angle.cos(), base_y + r * angle.sin())
}

/// Copy each coarse node's position down onto the children that were
/// merged into it, with a small jitter so children don't start perfectly
/// coincident. Mirrors `layout_node_propagate_position_to_children`.
pub fn propagate_positions_to_children(coarse: &super::Layout, fine: &mut super::Layout, jitter: f64, rng: &mut impl Rng) {
    for coarse_node in &coarse.nodes {
        for &child in &coarse_node.children {
            let angle = rng.gen::<f64>() * std::f64::consts::TAU;
            let r = rng.gen::<f64>() * jitter;
            let fine_node = &mut fine.nodes[child.0 as usize];
            fine_node.x = coarse_node.x + r * angle.cos();
            fine_node.y = coarse_node.y + r * angle.sin();
        }
    }
}
