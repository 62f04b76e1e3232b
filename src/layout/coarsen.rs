//! Greedy heavy-edge-matching coarsening: builds the next level up of the
//! layout hierarchy from the level below. Ported from
//! `layout_build_reduced_from_layout` / `node_weight_cmp`.

use super::{dedup_links, Layout, LayoutLink, LayoutNode, NodeId};
use log::debug;

fn max_incident_weight(layout: &Layout, idx: usize) -> f64 {
    layout.nodes[idx]
        .link_ids
        .iter()
        .map(|&l| layout.links[l as usize].weight)
        .fold(0.0, f64::max)
}

fn heaviest_unmatched_neighbour(layout: &Layout, idx: usize, matched: &[bool]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for &link_id in &layout.nodes[idx].link_ids {
        let link = &layout.links[link_id as usize];
        let other = if link.a.0 as usize == idx { link.b } else { link.a };
        let other = other.0 as usize;
        if matched[other] {
            continue;
        }
        if best.map_or(true, |(_, w)| link.weight > w) {
            best = Some((other, link.weight));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Build the next coarser level from `fine`, stamping each fine node's
/// `coarse_parent` as a side effect.
///
/// Nodes are visited heaviest-incident-edge-first (ties broken by lower
/// mass first, so small unmerged nodes get priority to find a partner
/// before the graph runs out of candidates); each unmatched node is paired
/// with its heaviest unmatched neighbour, or promoted to a coarse node by
/// itself if none remains.
pub fn build_reduced_from_layout(fine: &mut Layout) -> Layout {
    let n = fine.nodes.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        let wa = max_incident_weight(fine, a);
        let wb = max_incident_weight(fine, b);
        wb.partial_cmp(&wa)
            .unwrap()
            .then_with(|| fine.nodes[a].mass.partial_cmp(&fine.nodes[b].mass).unwrap())
    });

    let mut matched = vec![false; n];
    let mut coarse_of: Vec<Option<usize>> = vec![None; n];
    let mut coarse_nodes: Vec<LayoutNode> = Vec::new();
    let mut next_id = fine.nodes.iter().map(|n| n.id).max().map(|m| m + 1).unwrap_or(0);

    for &i in &order {
        if matched[i] {
            continue;
        }
        matched[i] = true;
        let partner = heaviest_unmatched_neighbour(fine, i, &matched);

        let coarse_idx = coarse_nodes.len();
        let a = &fine.nodes[i];
        let mut mass = a.mass;
        let mut radius_sq = a.radius * a.radius;
        let mut x = a.x * a.mass;
        let mut y = a.y * a.mass;
        let mut children = vec![NodeId(i as u32)];

        if let Some(j) = partner {
            matched[j] = true;
            let b = &fine.nodes[j];
            mass += b.mass;
            radius_sq += b.radius * b.radius;
            x += b.x * b.mass;
            y += b.y * b.mass;
            children.push(NodeId(j as u32));
        }
        x /= mass;
        y /= mass;

        for &c in &children {
            coarse_of[c.0 as usize] = Some(coarse_idx);
        }

        let mut node = LayoutNode::new(next_id, None);
        next_id += 1;
        node.x = x;
        node.y = y;
        node.mass = mass;
        node.radius = radius_sq.sqrt();
        node.children = children;
        coarse_nodes.push(node);
    }

    for i in 0..n {
        fine.nodes[i].coarse_parent = coarse_of[i].map(|c| NodeId(c as u32));
    }

    let mut coarse_links = Vec::with_capacity(fine.links.len());
    for link in &fine.links {
        let ca = coarse_of[link.a.0 as usize].expect("every fine node is assigned a coarse parent");
        let cb = coarse_of[link.b.0 as usize].expect("every fine node is assigned a coarse parent");
        if ca == cb {
            continue; // matched pair's own link disappears into the merge.
        }
        coarse_links.push(LayoutLink {
            a: NodeId(ca as u32),
            b: NodeId(cb as u32),
            weight: link.weight,
            ref_freq: link.ref_freq,
        });
    }

    let mut coarse = Layout {
        nodes: coarse_nodes,
        links: dedup_links(coarse_links),
        level: fine.level + 1,
    };
    coarse.rebuild_node_link_lists();
    debug!(
        "coarsened level {} -> {}: {} nodes ({} links) -> {} nodes ({} links)",
        fine.level,
        coarse.level,
        fine.nodes.len(),
        fine.links.len(),
        coarse.nodes.len(),
        coarse.links.len(),
    );
    coarse
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutNode;

    fn chain(n: usize) -> Layout {
        let nodes: Vec<LayoutNode> = (0..n).map(|i| LayoutNode::new(i as u32, None)).collect();
        let links = (0..n - 1)
            .map(|i| LayoutLink { a: NodeId(i as u32), b: NodeId(i as u32 + 1), weight: 1.0, ref_freq: 1 })
            .collect();
        let mut layout = Layout { nodes, links, level: 0 };
        layout.rebuild_node_link_lists();
        layout
    }

    #[test]
    fn every_fine_node_gets_exactly_one_coarse_parent() {
        let mut fine = chain(6);
        let coarse = build_reduced_from_layout(&mut fine);
        for node in &fine.nodes {
            assert!(node.coarse_parent.is_some());
        }
        assert!(coarse.nodes.len() < fine.nodes.len());
    }

    #[test]
    fn coarse_nodes_conserve_total_mass() {
        let mut fine = chain(7);
        for (i, n) in fine.nodes.iter_mut().enumerate() {
            n.mass = 1.0 + i as f64;
        }
        let fine_total: f64 = fine.nodes.iter().map(|n| n.mass).sum();
        let coarse = build_reduced_from_layout(&mut fine);
        let coarse_total: f64 = coarse.nodes.iter().map(|n| n.mass).sum();
        assert!((fine_total - coarse_total).abs() < 1e-9);
    }

    #[test]
    fn coarse_radius_is_root_sum_square_of_children() {
        let mut fine = chain(7);
        for (i, n) in fine.nodes.iter_mut().enumerate() {
            n.radius = 1.0 + i as f64;
        }
        let coarse = build_reduced_from_layout(&mut fine);
        for node in &coarse.nodes {
            let expected: f64 = node.children.iter().map(|&c| fine.nodes[c.0 as usize].radius.powi(2)).sum();
            assert!((node.radius.powi(2) - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn coarse_links_have_no_self_loops() {
        let mut fine = chain(10);
        let coarse = build_reduced_from_layout(&mut fine);
        for link in &coarse.links {
            assert_ne!(link.a, link.b);
        }
    }

    #[test]
    fn singleton_graph_promotes_without_partner() {
        let mut fine = chain(1);
        let coarse = build_reduced_from_layout(&mut fine);
        assert_eq!(coarse.nodes.len(), 1);
        assert_eq!(coarse.nodes[0].children.len(), 1);
    }
}
