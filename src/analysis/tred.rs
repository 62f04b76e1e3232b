//! Transitive reduction of the directed citation DAG (component B).
//!
//! For each paper `p`, walk its references from the last array slot to the
//! first. A reference to the non-past (`refs[j].index >= p.index`) is kept
//! and skipped — this cannot happen for a well-formed citation DAG where
//! every reference predates its referrer, but mirrors the original's own
//! defensive branch exactly. For a genuine past reference `p -> v`: if `v`
//! was already reached this outer iteration via some other, longer route
//! through already-kept edges, the direct edge is dropped and the
//! surviving path that reached `v` has its edge multiplicities bumped
//! instead (walking the recorded follow-back chain); otherwise the edge is
//! kept and a DFS marks everything transitively reachable from `v` through
//! kept edges as "visited this iteration", recording how each node was
//! reached so a later hit can walk back. Ported from
//! `Common_compute_tred` / `compute_tred_refs_mark`.

use crate::paper::{PaperGraph, PaperId};

fn mark_reachable(graph: &mut PaperGraph, top_index: u32, cur: PaperId, follow_back: (PaperId, usize)) {
    if graph.get(cur).tred_visit_index == top_index {
        return;
    }
    graph.get_mut(cur).tred_visit_index = top_index;
    graph.get_mut(cur).tred_follow_back = Some(follow_back);

    let cur_index = graph.get(cur).index;
    let refs = graph.get(cur).refs.clone();
    let marks = graph.get(cur).refs_tred_computed.clone();
    for (i, r) in refs.into_iter().enumerate() {
        if marks[i] != 0 && graph.get(r).index < cur_index {
            mark_reachable(graph, top_index, r, (cur, i));
        }
    }
}

/// Recompute `refs_tred_computed` for every paper in `graph`.
pub fn compute_tred(graph: &mut PaperGraph) {
    for p in &mut graph.papers {
        p.tred_visit_index = 0;
        for m in &mut p.refs_tred_computed {
            *m = 0;
        }
        p.tred_follow_back = None;
    }

    for i in 0..graph.len() {
        let p_id = PaperId(i as u32);
        graph.get_mut(p_id).tred_follow_back = None;
        let p_index = graph.get(p_id).index;
        let refs = graph.get(p_id).refs.clone();

        for j in (0..refs.len()).rev() {
            let ref_id = refs[j];
            let ref_index = graph.get(ref_id).index;

            if ref_index >= p_index {
                graph.get_mut(p_id).refs_tred_computed[j] = 1;
                continue;
            }

            if graph.get(ref_id).tred_visit_index == p_index {
                // Already reached `ref_id` this iteration by some other
                // surviving path; thicken that path instead of keeping
                // this direct edge.
                let mut walker = graph.get(ref_id).tred_follow_back;
                while let Some((p2, edge)) = walker {
                    graph.get_mut(p2).refs_tred_computed[edge] += 1;
                    walker = graph.get(p2).tred_follow_back;
                }
                continue;
            }

            graph.get_mut(p_id).refs_tred_computed[j] = 1;
            mark_reachable(graph, p_index, ref_id, (p_id, j));
        }
    }
}
