//! Paper records and the citation cross-links between them (component A).
//!
//! A [`Paper`] is an arena entry: callers hand us a slice of papers already
//! sorted by [`Paper::id`], and every reference/citation is stored as an
//! index into that same slice rather than a pointer, so the whole graph can
//! be torn down in one step and no lifetime threading is needed between
//! papers and the layout built from them.

use crate::error::{LayoutError, Result};

/// Index of a paper within a [`PaperGraph`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaperId(pub u32);

impl PaperId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Stable, externally-assigned category tag. Unknown category strings are
/// the loader's problem to map to [`Category::Unknown`] (§6, §7); this
/// crate never inspects the string form itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Category(pub u16);

impl Category {
    pub const UNKNOWN: Category = Category(0);
}

impl Default for Category {
    fn default() -> Self {
        Category::UNKNOWN
    }
}

/// Encode a calendar date as the 32-bit id used throughout the system.
///
/// `id = (year-1800)*10_000_000 + month*625_000 + day*15_625`. The 15_625
/// granularity leaves 15_625 free values per day for a loader to disambiguate
/// same-day papers (§6).
pub fn date_to_unique_id(year: u32, month: u32, day: u32) -> u32 {
    (year - 1800) * 10_000_000 + month * 625_000 + day * 15_625
}

/// Inverse of [`date_to_unique_id`].
pub fn unique_id_to_date(id: u32) -> (u32, u32, u32) {
    let year = id / 10_000_000 + 1800;
    let month = (id % 10_000_000) / 625_000 + 1;
    let day = (id % 625_000) / 15_625 + 1;
    (year, month, day)
}

/// A single paper. Attributes other than `refs`/`refs_ref_freq`/
/// `refs_other_weight` are mutated only by the analyses in
/// [`crate::analysis`] and by layout binding; identity (`id`, `index`) never
/// changes after construction.
#[derive(Debug, Clone)]
pub struct Paper {
    /// Date-encoded identity, see [`date_to_unique_id`].
    pub id: u32,
    /// Position in the caller's id-sorted input order. Used by transitive
    /// reduction to decide what counts as "past" (§4.B); distinct from `id`
    /// because two papers can share a day and still need a total order.
    pub index: u32,
    pub category: Category,
    pub included: bool,
    pub mass: f64,
    pub radius: f64,
    /// Normalised age in `[0, 1]`.
    pub age: f64,

    /// Outgoing reference targets.
    pub refs: Vec<PaperId>,
    /// Per-reference frequency weight, parallel to `refs`.
    pub refs_ref_freq: Vec<i32>,
    /// Optional per-reference additional weight, parallel to `refs`.
    pub refs_other_weight: Option<Vec<f64>>,
    /// Transitive-reduction mark per reference, parallel to `refs`. Nonzero
    /// means "kept"; the integer value is a rendering hint for edge
    /// thickness, not a multiplicity guarantee (§9 Open Question).
    pub refs_tred_computed: Vec<u32>,

    /// Non-citation links a caller wants the layout to attract on, e.g.
    /// same-author or same-venue pairs (supplemented from the original,
    /// see SPEC_FULL.md). Always weighted `0.25` in [`crate::layout`].
    pub fake_links: Vec<PaperId>,

    /// Back-pointers built once by [`PaperGraph::build_citation_links`].
    pub cites: Vec<PaperId>,

    pub num_included_cites: u32,
    /// Connected-component label; `0` means unpainted / not included.
    pub colour: u32,
    pub num_with_my_colour: u32,

    pub(crate) tred_visit_index: u32,
    pub(crate) tred_follow_back: Option<(PaperId, usize)>,
}

impl Paper {
    pub fn new(id: u32, index: u32) -> Self {
        Paper {
            id,
            index,
            category: Category::UNKNOWN,
            included: true,
            mass: 1.0,
            radius: 1.0,
            age: 0.0,
            refs: Vec::new(),
            refs_ref_freq: Vec::new(),
            refs_other_weight: None,
            refs_tred_computed: Vec::new(),
            fake_links: Vec::new(),
            cites: Vec::new(),
            num_included_cites: 0,
            colour: 0,
            num_with_my_colour: 0,
            tred_visit_index: 0,
            tred_follow_back: None,
        }
    }

    /// Rescale `base_mass` by `num_included_cites.powf(exponent)`, the
    /// mass-from-citations heuristic the renderer's info panel exposes as a
    /// tunable in the original (`mass_cites_exponent`). Additive
    /// convenience; spec.md's contract already allows a loader to set
    /// `mass` however it likes.
    pub fn recompute_mass(&mut self, base_mass: f64, exponent: f64) {
        self.mass = base_mass * (1.0 + self.num_included_cites as f64).powf(exponent);
    }
}

/// Owns the paper arena and the operations that only make sense over the
/// whole set (building citation links, counting included citations).
#[derive(Debug, Default)]
pub struct PaperGraph {
    pub papers: Vec<Paper>,
}

impl PaperGraph {
    pub fn new(papers: Vec<Paper>) -> Self {
        PaperGraph { papers }
    }

    pub fn get(&self, id: PaperId) -> &Paper {
        &self.papers[id.idx()]
    }

    pub fn get_mut(&mut self, id: PaperId) -> &mut Paper {
        &mut self.papers[id.idx()]
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Binary search over `papers` by `id`, requiring the caller sorted them
    /// first (§6). Returns `None` if absent.
    pub fn find_by_id(&self, id: u32) -> Option<PaperId> {
        self.papers
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|i| PaperId(i as u32))
    }

    /// Build `cites` back-pointers from every paper's `refs`, in two passes:
    /// the first sizes each `cites` vector by counting incoming edges, the
    /// second fills it in. Mirrors `Common_build_citation_links`, which
    /// pre-sizes `cites` with `num_cites` and then reuses `num_cites` as a
    /// fill cursor; here `Vec::with_capacity` + `push` plays that role.
    pub fn build_citation_links(&mut self) -> Result<()> {
        if self.papers.is_empty() {
            return Err(LayoutError::EmptyGraph);
        }

        let mut incoming = vec![0u32; self.papers.len()];
        for paper in &self.papers {
            for r in &paper.refs {
                incoming[r.idx()] += 1;
            }
        }

        for (i, paper) in self.papers.iter_mut().enumerate() {
            paper.cites = Vec::with_capacity(incoming[i] as usize);
        }

        for i in 0..self.papers.len() {
            let refs = self.papers[i].refs.clone();
            let self_id = PaperId(i as u32);
            for r in refs {
                self.papers[r.idx()].cites.push(self_id);
            }
        }

        Ok(())
    }

    /// Recompute `num_included_cites` for every paper: zero all counts, then
    /// for each included paper, for each reference with positive
    /// `ref_freq`, bump the referent's count if the referent is also
    /// included. Mirrors `Common_recompute_num_included_cites`.
    pub fn recompute_num_included_cites(&mut self) {
        for paper in &mut self.papers {
            paper.num_included_cites = 0;
        }

        for i in 0..self.papers.len() {
            if !self.papers[i].included {
                continue;
            }
            let refs = self.papers[i].refs.clone();
            let freqs = self.papers[i].refs_ref_freq.clone();
            for (r, freq) in refs.iter().zip(freqs.iter()) {
                if *freq > 0 && self.papers[r.idx()].included {
                    self.papers[r.idx()].num_included_cites += 1;
                }
            }
        }
    }
}
