//! The multi-level layout hierarchy (component D): one [`Layout`] per level,
//! finest at level 0 (one node per included paper) up through successively
//! coarser levels built by [`coarsen::build_reduced_from_layout`].
//!
//! Grounded in `layout.c`'s `layout_t`/`layout_node_t`/`layout_link_t`
//! triple, translated from linked pointer structures to index arenas
//! (`NodeId`) the way [`crate::paper`] and [`crate::quadtree`] already do.

pub mod coarsen;
pub mod node;

pub use coarsen::build_reduced_from_layout;
pub use node::{compute_best_start_position, propagate_positions_to_children, LayoutNode, NodeId};

use crate::paper::PaperGraph;
use crate::quadtree::QuadItem;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tunables for the link-weight formula in [`build_from_papers`] (§4.D).
/// Kept as a small `Copy` struct, the same shape as [`crate::force::ForceParams`],
/// so a caller can plumb both through one configuration surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkWeightParams {
    /// Scales every real citation link's `ref_freq^2` weight.
    pub factor_ref_link: f64,
    /// Scales `refs_other_weight`, added on top of the ref-freq term when
    /// a paper supplies it.
    pub factor_other_link: f64,
    /// When set, a link's weight is additionally scaled down the further
    /// apart its two papers' ids (dates) are, so stale citations pull less
    /// strongly than a same-era pair with the same `ref_freq`.
    pub age_weaken: bool,
}

impl Default for LinkWeightParams {
    fn default() -> Self {
        LinkWeightParams { factor_ref_link: 1.0, factor_other_link: 1.0, age_weaken: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutLink {
    pub a: NodeId,
    pub b: NodeId,
    /// Structural weight: `1.0` for a real citation link (unless
    /// overridden by a paper's explicit `refs_other_weight`), `0.25` for a
    /// synthetic link added to keep the graph connected.
    pub weight: f64,
    /// Raw in-text reference count, carried through so the force engine
    /// can optionally fold it into the attractive force at apply time
    /// (`ForceParams::use_ref_freq`).
    pub ref_freq: i32,
}

pub struct Layout {
    pub nodes: Vec<LayoutNode>,
    pub links: Vec<LayoutLink>,
    pub level: u32,
}

/// `radius = sqrt(mass / pi)`: node area, not radius, scales with mass, so
/// a paper with four times the citations draws twice the radius. A
/// convenience a loader can call to derive `Paper::radius` from mass
/// before handing papers to this crate; not used internally, since §4.D
/// has radius flow the other way once nodes exist (copied from the paper
/// at the finest level, summed in quadrature while coarsening).
pub fn radius_from_mass(mass: f64) -> f64 {
    (mass.max(0.0) / std::f64::consts::PI).sqrt()
}

/// Sum weights and reference-frequency counts of links that connect the
/// same unordered pair of nodes, and drop self-loops. Used both to collapse
/// duplicate citation links into one and to combine fine-level links that
/// land on the same coarse-level pair. Mirrors `layout_combine_duplicate_links`
/// / `count_links`+`add_links`.
pub fn dedup_links(links: Vec<LayoutLink>) -> Vec<LayoutLink> {
    let mut by_pair: HashMap<(u32, u32), usize> = HashMap::new();
    let mut out: Vec<LayoutLink> = Vec::with_capacity(links.len());
    for link in links {
        if link.a == link.b {
            continue;
        }
        let key = if link.a.0 < link.b.0 { (link.a.0, link.b.0) } else { (link.b.0, link.a.0) };
        match by_pair.get(&key) {
            Some(&i) => {
                out[i].weight += link.weight;
                out[i].ref_freq += link.ref_freq;
            }
            None => {
                by_pair.insert(key, out.len());
                out.push(link);
            }
        }
    }
    out
}

impl Layout {
    /// Recompute each node's `link_ids` from `links`. Must be called after
    /// any operation that adds, removes, or reorders links.
    pub fn rebuild_node_link_lists(&mut self) {
        for n in &mut self.nodes {
            n.link_ids.clear();
        }
        for (i, link) in self.links.iter().enumerate() {
            self.nodes[link.a.0 as usize].link_ids.push(i as u32);
            self.nodes[link.b.0 as usize].link_ids.push(i as u32);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rotate every node's position about the origin by `angle` radians.
    /// Mirrors `layout_rotate_all`; a supplemental feature not named in the
    /// distilled force/coarsening description but present in the original
    /// (used to de-bias the initial random layout's orientation before the
    /// first refinement pass).
    pub fn rotate_all(&mut self, angle: f64) {
        let (s, c) = angle.sin_cos();
        for n in &mut self.nodes {
            let (x, y) = (n.x, n.y);
            n.x = x * c - y * s;
            n.y = x * s + y * c;
        }
    }

    /// Recompute each node's `mass`/`radius`. At level 0 this asks `graph`
    /// to recompute the underlying paper's mass from its included citation
    /// count and copies both `mass` and `radius` straight from the paper
    /// (§4.D: "for finest nodes copy from the paper"); coarser levels
    /// already have their mass/radius set by
    /// [`coarsen::build_reduced_from_layout`] at build time and are left
    /// untouched here, matching a top-down-only walk over the finest
    /// level.
    pub fn recompute_mass_radius(&mut self, graph: &mut PaperGraph, base_mass: f64, exponent: f64) {
        for n in &mut self.nodes {
            if let Some(pid) = n.paper {
                graph.get_mut(pid).recompute_mass(base_mass, exponent);
                let paper = graph.get(pid);
                n.mass = paper.mass;
                n.radius = paper.radius;
            }
        }
    }

    /// Binary search by stable `id`. Valid because nodes are built by
    /// walking `graph.papers`, which `PaperGraph` keeps sorted by id, so a
    /// level-0 layout's node order is a (included-only) subsequence of
    /// that same order.
    pub fn get_node_by_id(&self, id: u32) -> Option<NodeId> {
        self.nodes
            .binary_search_by_key(&id, |n| n.id)
            .ok()
            .map(|i| NodeId(i as u32))
    }

    /// Linear scan for the (first) node whose disc contains `(x, y)`.
    /// Mirrors `layout_get_node_at`, used for hit-testing a screen point
    /// against the layout; O(n) in the original too since picking is not
    /// on the hot path.
    pub fn get_node_at(&self, x: f64, y: f64) -> Option<NodeId> {
        self.nodes.iter().position(|n| {
            let dx = n.x - x;
            let dy = n.y - y;
            dx * dx + dy * dy <= n.radius * n.radius
        }).map(|i| NodeId(i as u32))
    }

    /// Snapshot positions/masses as fixed-point integers scaled by 20,
    /// mirroring `layout_node_export_quantities`'s on-disk format.
    pub fn export_quantities(&self) -> Vec<(i32, i32, i32)> {
        self.nodes
            .iter()
            .map(|n| ((n.x * 20.0).round() as i32, (n.y * 20.0).round() as i32, (n.radius * 20.0).round() as i32))
            .collect()
    }

    /// Inverse of [`Self::export_quantities`], restoring only `x`/`y`.
    /// `radius` is deliberately not re-imported, matching
    /// `layout_node_import_quantities` leaving it untouched: a renderer
    /// reads the exported radius but this crate always re-derives its own
    /// via [`Self::recompute_mass_radius`].
    pub fn import_quantities(&mut self, data: &[(i32, i32, i32)]) {
        for (n, &(x, y, _radius)) in self.nodes.iter_mut().zip(data) {
            n.x = x as f64 / 20.0;
            n.y = y as f64 / 20.0;
        }
    }

    /// One-line summary mirroring `layout_print`'s console report.
    pub fn summary(&self) -> String {
        let (min_x, max_x, min_y, max_y) = self.nodes.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(min_x, max_x, min_y, max_y), n| {
                (min_x.min(n.x), max_x.max(n.x), min_y.min(n.y), max_y.max(n.y))
            },
        );
        let total_mass: f64 = self.nodes.iter().map(|n| n.mass).sum();
        format!(
            "level {}: {} nodes, {} links, total mass {:.1}, bbox [{:.1}, {:.1}] x [{:.1}, {:.1}]",
            self.level,
            self.nodes.len(),
            self.links.len(),
            total_mass,
            min_x,
            max_x,
            min_y,
            max_y
        )
    }

    /// Positions, masses and radii as a flat list ready to hand to
    /// [`crate::quadtree::QuadTree::build`].
    pub fn quad_items(&self) -> Vec<QuadItem> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| QuadItem { x: n.x, y: n.y, mass: n.mass, radius: n.radius, node: NodeId(i as u32) })
            .collect()
    }
}

/// Build the level-0 layout: one node per included paper, plus links from
/// every transitively-kept citation reference and every `fake_link`.
/// Mirrors `layout_build_from_papers`; the per-link weight formula is
/// spelled out at §4.D:
///
/// ```text
/// w = factor_ref_link * ref_freq^2
/// if age_weaken: w *= 0.4 + 0.6 * exp(-(1e-7 * (id_self - id_ref))^2)
/// if refs_other_weight present: w += factor_other_link * refs_other_weight[j]
/// fake-link weight = 0.25
/// ```
pub fn build_from_papers(graph: &PaperGraph, params: &LinkWeightParams) -> Layout {
    let mut nodes = Vec::with_capacity(graph.len());
    let mut index_to_node: Vec<Option<NodeId>> = vec![None; graph.len()];
    for (i, p) in graph.papers.iter().enumerate() {
        if !p.included {
            continue;
        }
        index_to_node[i] = Some(NodeId(nodes.len() as u32));
        nodes.push(LayoutNode::new(p.id, Some(crate::paper::PaperId(i as u32))));
    }

    let mut links = Vec::new();
    for (i, p) in graph.papers.iter().enumerate() {
        let Some(a) = index_to_node[i] else { continue };

        for (j, &r) in p.refs.iter().enumerate() {
            if p.refs_tred_computed[j] == 0 {
                continue; // transitively redundant, dropped from the layout entirely.
            }
            let Some(b) = index_to_node[r.0 as usize] else { continue };

            let ref_freq = p.refs_ref_freq[j];
            let mut weight = params.factor_ref_link * (ref_freq as f64).powi(2);
            if params.age_weaken {
                let id_ref = graph.get(r).id;
                let d = 1e-7 * (p.id as f64 - id_ref as f64);
                weight *= 0.4 + 0.6 * (-(d * d)).exp();
            }
            if let Some(other) = p.refs_other_weight.as_ref() {
                weight += params.factor_other_link * other[j];
            }

            links.push(LayoutLink { a, b, weight, ref_freq });
        }

        for &f in &p.fake_links {
            if let Some(b) = index_to_node[f.0 as usize] {
                links.push(LayoutLink { a, b, weight: 0.25, ref_freq: 0 });
            }
        }
    }

    let mut layout = Layout { nodes, links: dedup_links(links), level: 0 };
    layout.rebuild_node_link_lists();
    debug!("built finest layout: {} nodes, {} links", layout.nodes.len(), layout.links.len());
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::{date_to_unique_id, Paper, PaperId};

    fn paper(day: u32, index: u32) -> Paper {
        Paper::new(date_to_unique_id(2000, 1, day), index)
    }

    #[test]
    fn build_from_papers_skips_excluded_and_redundant_edges() {
        let mut a = paper(1, 0);
        let mut b = paper(2, 1);
        let mut c = paper(3, 2);
        b.refs = vec![PaperId(0)];
        b.refs_ref_freq = vec![1];
        b.refs_tred_computed = vec![1];
        c.refs = vec![PaperId(0), PaperId(1)];
        c.refs_ref_freq = vec![1, 1];
        c.refs_tred_computed = vec![0, 1]; // C->A dropped, C->B kept
        c.included = true;
        a.included = false; // excluded outright
        a.refs_tred_computed = vec![];

        let graph = PaperGraph::new(vec![a, b, c]);
        let layout = build_from_papers(&graph, &LinkWeightParams::default());

        assert_eq!(layout.len(), 2); // only B and C are included
        assert_eq!(layout.links.len(), 1); // B<->C only; A is excluded so B->A can't appear either
    }

    /// Scenario A (§8): B references A once with ref_freq=1; with
    /// `factor_ref_link=1` and no age weakening, the single link weighs 1.
    #[test]
    fn single_ref_freq_one_link_weighs_one() {
        let a = paper(1, 0);
        let mut b = paper(2, 1);
        b.refs = vec![PaperId(0)];
        b.refs_ref_freq = vec![1];
        b.refs_tred_computed = vec![1];

        let graph = PaperGraph::new(vec![a, b]);
        let layout = build_from_papers(&graph, &LinkWeightParams { factor_ref_link: 1.0, factor_other_link: 1.0, age_weaken: false });

        assert_eq!(layout.links.len(), 1);
        assert!((layout.links[0].weight - 1.0).abs() < 1e-9);
    }

    /// Scenario B (§8): A<-B<-C, every `refs_ref_freq=2`, `factor_ref_link=0.5`:
    /// every link weight is `0.5 * 2^2 = 2`.
    #[test]
    fn ref_freq_two_with_half_factor_gives_weight_two() {
        let a = paper(1, 0);
        let mut b = paper(2, 1);
        let mut c = paper(3, 2);
        b.refs = vec![PaperId(0)];
        b.refs_ref_freq = vec![2];
        b.refs_tred_computed = vec![1];
        c.refs = vec![PaperId(1)];
        c.refs_ref_freq = vec![2];
        c.refs_tred_computed = vec![1];

        let graph = PaperGraph::new(vec![a, b, c]);
        let layout = build_from_papers(&graph, &LinkWeightParams { factor_ref_link: 0.5, factor_other_link: 1.0, age_weaken: false });

        assert_eq!(layout.links.len(), 2);
        for link in &layout.links {
            assert!((link.weight - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn dedup_links_sums_weight_and_drops_self_loops() {
        let links = vec![
            LayoutLink { a: NodeId(0), b: NodeId(1), weight: 1.0, ref_freq: 2 },
            LayoutLink { a: NodeId(1), b: NodeId(0), weight: 0.25, ref_freq: 1 },
            LayoutLink { a: NodeId(2), b: NodeId(2), weight: 5.0, ref_freq: 0 },
        ];
        let out = dedup_links(links);
        assert_eq!(out.len(), 1);
        assert!((out[0].weight - 1.25).abs() < 1e-9);
        assert_eq!(out[0].ref_freq, 3);
    }

    #[test]
    fn node_ids_stay_sorted_by_id_for_binary_search() {
        let a = paper(1, 0);
        let b = paper(2, 1);
        let c = paper(3, 2);
        let graph = PaperGraph::new(vec![a, b, c]);
        let layout = build_from_papers(&graph, &LinkWeightParams::default());
        let target_id = graph.get(PaperId(1)).id;
        let found = layout.get_node_by_id(target_id).unwrap();
        assert_eq!(layout.nodes[found.0 as usize].id, target_id);
    }

    #[test]
    fn rotate_all_preserves_pairwise_distances() {
        let mut layout = Layout {
            nodes: vec![LayoutNode::new(0, None), LayoutNode::new(1, None)],
            links: Vec::new(),
            level: 0,
        };
        layout.nodes[0].x = 1.0;
        layout.nodes[0].y = 0.0;
        layout.nodes[1].x = -1.0;
        layout.nodes[1].y = 0.0;
        let before = (layout.nodes[0].x - layout.nodes[1].x).hypot(layout.nodes[0].y - layout.nodes[1].y);
        layout.rotate_all(1.3);
        let after = (layout.nodes[0].x - layout.nodes[1].x).hypot(layout.nodes[0].y - layout.nodes[1].y);
        assert!((before - after).abs() < 1e-9);
    }

    #[test]
    fn rotate_all_pivots_on_the_origin_not_the_centroid() {
        // A single node off-centre from the origin: rotating by a quarter
        // turn about the origin sends (x, 0) to (0, x), not back to itself
        // (which is what pivoting on its own centroid would do).
        let mut layout = Layout { nodes: vec![LayoutNode::new(0, None)], links: Vec::new(), level: 0 };
        layout.nodes[0].x = 5.0;
        layout.nodes[0].y = 0.0;
        layout.rotate_all(std::f64::consts::FRAC_PI_2);
        assert!(layout.nodes[0].x.abs() < 1e-9);
        assert!((layout.nodes[0].y - 5.0).abs() < 1e-9);
    }

    /// Property 10 (§8): `import(export(x,y)) = (round(x*20)/20, round(y*20)/20)`.
    /// Mass is untouched by either direction; radius round-trips through
    /// the third slot but is not re-imported (§4.D).
    #[test]
    fn position_export_round_trips_xy_and_exports_radius_not_mass() {
        let mut layout = Layout { nodes: vec![LayoutNode::new(0, None)], links: Vec::new(), level: 0 };
        layout.nodes[0].x = 1.234;
        layout.nodes[0].y = -5.678;
        layout.nodes[0].mass = 9.0;
        layout.nodes[0].radius = 2.5;

        let data = layout.export_quantities();
        assert_eq!(data[0].2, 50); // radius * 20, not mass * 20 (180)

        layout.nodes[0].x = 0.0;
        layout.nodes[0].y = 0.0;
        layout.nodes[0].mass = 0.0;
        layout.nodes[0].radius = 0.0;
        layout.import_quantities(&data);

        assert!((layout.nodes[0].x - (1.234f64 * 20.0).round() / 20.0).abs() < 1e-9);
        assert!((layout.nodes[0].y - (-5.678f64 * 20.0).round() / 20.0).abs() < 1e-9);
        assert_eq!(layout.nodes[0].mass, 0.0); // not restored
        assert_eq!(layout.nodes[0].radius, 0.0); // not restored
    }
}
