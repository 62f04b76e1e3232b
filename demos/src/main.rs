//! Synthetic citation graph generator and layout runner, gated behind the
//! `demo` feature so the library itself never depends on a logging
//! backend. Graph generation follows the random-forward-edge approach
//! `mock-graph-generator`'s large-graph generator uses to keep a DAG
//! (`source < target`), here reinterpreted as "every reference points to
//! an earlier paper".

use citegraph_layout::driver::{Driver, DriverConfig};
use citegraph_layout::paper::{date_to_unique_id, Paper, PaperGraph};
use citegraph_layout::{analysis, LayoutError};
use log::info;
use rand::Rng;
use std::sync::atomic::AtomicBool;

fn generate_papers(node_count: usize, edge_density: f64) -> PaperGraph {
    let mut rng = rand::thread_rng();
    let mut papers: Vec<Paper> = (0..node_count)
        .map(|i| {
            let day = 1 + (i as u32 % 28);
            let month = 1 + (i as u32 / 28 % 12);
            let year = 2000 + i as u32 / (28 * 12);
            Paper::new(date_to_unique_id(year, month, day), i as u32)
        })
        .collect();

    for i in 0..node_count {
        for j in 0..i {
            if rng.gen_bool(edge_density) {
                papers[i].refs.push(citegraph_layout::PaperId(j as u32));
                papers[i].refs_ref_freq.push(rng.gen_range(1..=3));
            }
        }
    }
    for p in &mut papers {
        if !p.refs.is_empty() {
            p.refs_tred_computed = vec![0; p.refs.len()];
        }
    }

    PaperGraph::new(papers)
}

fn main() -> Result<(), LayoutError> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let node_count = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(500usize);
    let edge_density = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0.01f64);

    info!("generating {node_count} synthetic papers at edge density {edge_density}");
    let mut graph = generate_papers(node_count, edge_density);

    graph.build_citation_links()?;
    graph.recompute_num_included_cites();
    analysis::recompute_colours(&mut graph, true);
    analysis::compute_tred(&mut graph);

    info!("built citation graph, starting multi-level layout driver");
    let mut driver = Driver::new(&mut graph, DriverConfig::default());
    let stop = AtomicBool::new(false);
    driver.run(&stop);

    println!("{}", driver.current_layout().summary());
    println!(
        "final energy {:.4}, step size {:.6}, max link force {:.4}, max total force {:.4}",
        driver.energy,
        driver.step_size(),
        driver.max_link_force_mag,
        driver.max_total_force_mag
    );

    Ok(())
}
