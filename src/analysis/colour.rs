//! Connected-component colouring over the included subgraph (component B).
//!
//! Mirrors `Common_recompute_colours` / `paper_paint` in the original: an
//! explicit LIFO stack drives the flood fill (recursion would blow the
//! stack on a pathological graph, per the original's own design note), and
//! both `refs` and `cites` are followed so the colouring is over the
//! undirected closure of the citation DAG.

use crate::paper::{PaperGraph, PaperId};
use log::info;

/// Repaint every paper's `colour` and `num_with_my_colour`. Non-included
/// papers get colour `0`. If `verbose`, logs a histogram of component
/// sizes at `info!` level (mirrors the `verbose` branch's printed
/// histogram).
pub fn recompute_colours(graph: &mut PaperGraph, verbose: bool) {
    for p in &mut graph.papers {
        p.colour = 0;
    }

    let mut stack: Vec<PaperId> = Vec::new();
    let mut next_colour = 1u32;

    for i in 0..graph.len() {
        let id = PaperId(i as u32);
        if !graph.get(id).included || graph.get(id).colour != 0 {
            continue;
        }
        let colour = next_colour;
        next_colour += 1;

        debug_assert_eq!(graph.get(id).colour, 0);
        graph.get_mut(id).colour = colour;
        stack.push(id);

        while let Some(cur) = stack.pop() {
            debug_assert_eq!(graph.get(cur).colour, colour);
            let neighbours: Vec<PaperId> = graph
                .get(cur)
                .refs
                .iter()
                .chain(graph.get(cur).cites.iter())
                .copied()
                .collect();
            for n in neighbours {
                let np = graph.get(n);
                if np.included && np.colour != colour {
                    debug_assert_eq!(np.colour, 0);
                    graph.get_mut(n).colour = colour;
                    stack.push(n);
                }
            }
        }
    }

    let num_colours = next_colour; // colours are 1..num_colours
    let mut population = vec![0u32; num_colours as usize];
    for p in &graph.papers {
        population[p.colour as usize] += 1;
    }
    for p in &mut graph.papers {
        p.num_with_my_colour = population[p.colour as usize];
    }

    if verbose {
        log_histogram(&population);
    }
}

fn log_histogram(population: &[u32]) {
    use std::collections::BTreeMap;
    let mut sizes: BTreeMap<u32, u32> = BTreeMap::new();
    for &n in &population[1..] {
        *sizes.entry(n).or_insert(0) += 1;
    }
    info!(
        "{} colours, {} unique sizes",
        population.len().saturating_sub(1),
        sizes.len()
    );
    for (size, count) in sizes {
        info!("size {size} occurred {count} times");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::{date_to_unique_id, Paper};

    fn mutual(a: usize, b: usize, papers: &mut [Paper]) {
        papers[a].refs.push(PaperId(b as u32));
        papers[a].refs_ref_freq.push(1);
    }

    #[test]
    fn isolated_triangle_is_one_colour() {
        let mut papers: Vec<Paper> = (0..3)
            .map(|i| Paper::new(date_to_unique_id(2000, 1, 1 + i as u32), i as u32))
            .collect();
        mutual(0, 1, &mut papers);
        mutual(1, 2, &mut papers);
        mutual(2, 0, &mut papers);

        let mut graph = PaperGraph::new(papers);
        graph.build_citation_links().unwrap();
        recompute_colours(&mut graph, false);

        let c0 = graph.get(PaperId(0)).colour;
        assert_ne!(c0, 0);
        assert_eq!(graph.get(PaperId(1)).colour, c0);
        assert_eq!(graph.get(PaperId(2)).colour, c0);
        assert_eq!(graph.get(PaperId(0)).num_with_my_colour, 3);
    }

    #[test]
    fn excluded_papers_stay_colour_zero() {
        let mut papers: Vec<Paper> = (0..2)
            .map(|i| Paper::new(date_to_unique_id(2000, 1, 1 + i as u32), i as u32))
            .collect();
        papers[1].included = false;
        mutual(0, 1, &mut papers);

        let mut graph = PaperGraph::new(papers);
        graph.build_citation_links().unwrap();
        recompute_colours(&mut graph, false);

        assert_ne!(graph.get(PaperId(0)).colour, 0);
        assert_eq!(graph.get(PaperId(1)).colour, 0);
    }

    #[test]
    fn two_disjoint_pairs_get_different_colours() {
        let mut papers: Vec<Paper> = (0..4)
            .map(|i| Paper::new(date_to_unique_id(2000, 1, 1 + i as u32), i as u32))
            .collect();
        mutual(0, 1, &mut papers);
        mutual(2, 3, &mut papers);

        let mut graph = PaperGraph::new(papers);
        graph.build_citation_links().unwrap();
        recompute_colours(&mut graph, false);

        assert_eq!(graph.get(PaperId(0)).colour, graph.get(PaperId(1)).colour);
        assert_eq!(graph.get(PaperId(2)).colour, graph.get(PaperId(3)).colour);
        assert_ne!(graph.get(PaperId(0)).colour, graph.get(PaperId(2)).colour);
    }
}
