//! The iteration driver (component F): owns the level hierarchy, runs one
//! force step at a time on the currently active level, adapts the step
//! size to the trend in total system energy, and promotes the simulation
//! down to the next finer level once the current one settles.
//!
//! The original's driver loop lived in `mapcairo.c`'s event loop rather
//! than as a standalone module — interleaved with drawing code that was
//! filtered out of the retrieved source — so this is built from the info
//! panel fields it tracked (`energy`, `step_size`, `max_link_force_mag`,
//! `max_total_force_mag`, `mass_cites_exponent`) and the multi-level
//! uncoarsen/refine/interpolate cycle the coarsening stub outlines.

use crate::force::{self, ForceParams};
use crate::layout::{self, Layout, LinkWeightParams};
use crate::paper::PaperGraph;
use crate::quadtree::QuadTree;
use log::trace;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DriverConfig {
    pub force: ForceParams,
    pub link_weight: LinkWeightParams,
    pub initial_step_size: f64,
    /// Multiplier applied to the step size after an iteration that
    /// reduced total energy.
    pub step_grow: f64,
    /// Multiplier applied after an iteration that increased it.
    pub step_shrink: f64,
    /// A level is considered settled once its step size decays below
    /// this, or `max_iterations_per_level` is hit, whichever comes first.
    pub min_step_size: f64,
    pub max_iterations_per_level: u32,
    /// Random jitter radius applied when a coarse node's position is
    /// copied down onto its children.
    pub start_jitter: f64,
    /// Exponent applied to included-citation count when recomputing a
    /// paper's mass (`Paper::recompute_mass`).
    pub mass_cites_exponent: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            force: ForceParams::default(),
            link_weight: LinkWeightParams::default(),
            initial_step_size: 1.0,
            step_grow: 1.1,
            step_shrink: 0.5,
            min_step_size: 1e-3,
            max_iterations_per_level: 200,
            start_jitter: 0.5,
            mass_cites_exponent: 0.5,
        }
    }
}

/// Drives the multi-level force simulation from the coarsest level down to
/// level 0, one [`Driver::step`] at a time.
pub struct Driver {
    config: DriverConfig,
    /// `levels[0]` is the finest (one node per paper); the last entry is
    /// the coarsest.
    levels: Vec<Layout>,
    current_level: usize,
    iterations_this_level: u32,
    step_size: f64,
    prev_energy: f64,
    pub energy: f64,
    pub max_link_force_mag: f64,
    pub max_total_force_mag: f64,
}

impl Driver {
    /// Build the level hierarchy from `graph`'s included papers and place
    /// the coarsest level randomly, ready for [`Driver::step`].
    ///
    /// Assumes the caller already ran [`PaperGraph::build_citation_links`],
    /// [`PaperGraph::recompute_num_included_cites`], and
    /// [`crate::analysis::compute_tred`] on `graph` — mass and link
    /// selection both read their output.
    pub fn new(graph: &mut PaperGraph, config: DriverConfig) -> Self {
        let mut finest = layout::build_from_papers(graph, &config.link_weight);
        finest.recompute_mass_radius(graph, 1.0, config.mass_cites_exponent);

        let mut levels = vec![finest];
        loop {
            let prev_len = levels.last().unwrap().len();
            if prev_len <= 2 {
                break;
            }
            let coarse = layout::build_reduced_from_layout(levels.last_mut().unwrap());
            if coarse.len() >= prev_len {
                break; // coarsening stalled; stop the hierarchy here.
            }
            levels.push(coarse);
        }

        let mut rng = rand::thread_rng();
        if let Some(top) = levels.last_mut() {
            let scale = (top.len().max(1) as f64).sqrt() * 10.0;
            for n in &mut top.nodes {
                n.x = rng.gen::<f64>() * scale - scale / 2.0;
                n.y = rng.gen::<f64>() * scale - scale / 2.0;
            }
        }

        let current_level = levels.len() - 1;
        Driver {
            config,
            levels,
            current_level,
            iterations_this_level: 0,
            step_size: config.initial_step_size,
            prev_energy: f64::INFINITY,
            energy: 0.0,
            max_link_force_mag: 0.0,
            max_total_force_mag: 0.0,
        }
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn current_layout(&self) -> &Layout {
        &self.levels[self.current_level]
    }

    /// Run one force-and-advance iteration on the currently active level.
    /// Returns `false` once level 0 has settled and there is nothing left
    /// to do.
    pub fn step(&mut self) -> bool {
        let level = &mut self.levels[self.current_level];

        let items = level.quad_items();
        let tree = QuadTree::build(&items);

        force::zero_forces(level);
        let max_link = force::apply_attractive_forces(level, &self.config.force);
        force::apply_repulsive_forces(level, &tree, &self.config.force);

        let mut energy = 0.0f64;
        let mut max_total = 0.0f64;
        for n in &level.nodes {
            let mag_sq = n.fx * n.fx + n.fy * n.fy;
            energy += mag_sq;
            max_total = max_total.max(mag_sq.sqrt());
        }

        for n in &mut level.nodes {
            let inv_mass = if n.mass > 0.0 { 1.0 / n.mass } else { 1.0 };
            n.x += self.step_size * n.fx * inv_mass;
            n.y += self.step_size * n.fy * inv_mass;
        }

        self.max_link_force_mag = max_link;
        self.max_total_force_mag = max_total;
        self.energy = energy;

        if energy < self.prev_energy {
            self.step_size *= self.config.step_grow;
        } else {
            self.step_size *= self.config.step_shrink;
        }
        self.prev_energy = energy;
        self.iterations_this_level += 1;

        trace!(
            "level {} iter {}: energy {:.4}, step size {:.6}, max link force {:.4}, max total force {:.4}",
            self.current_level,
            self.iterations_this_level,
            self.energy,
            self.step_size,
            self.max_link_force_mag,
            self.max_total_force_mag,
        );

        let settled = self.step_size < self.config.min_step_size
            || self.iterations_this_level >= self.config.max_iterations_per_level;

        if !settled {
            return true;
        }

        if self.current_level == 0 {
            return false;
        }

        let fine_idx = self.current_level - 1;
        let (fine_slice, coarse_slice) = self.levels.split_at_mut(self.current_level);
        let mut rng = rand::thread_rng();
        layout::propagate_positions_to_children(&coarse_slice[0], &mut fine_slice[fine_idx], self.config.start_jitter, &mut rng);

        self.current_level = fine_idx;
        self.iterations_this_level = 0;
        self.step_size = self.config.initial_step_size;
        self.prev_energy = f64::INFINITY;
        true
    }

    /// Run to completion, checking `stop` between iterations so a caller
    /// on another thread can request early termination.
    pub fn run(&mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::Relaxed) {
            if !self.step() {
                break;
            }
        }
    }
}
