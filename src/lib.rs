//! Multi-level force-directed layout engine for citation graphs.
//!
//! Pipeline: load papers into a [`paper::PaperGraph`], run
//! [`paper::PaperGraph::build_citation_links`] and
//! [`paper::PaperGraph::recompute_num_included_cites`], then
//! [`analysis::recompute_colours`] and [`analysis::compute_tred`], and
//! finally hand the graph to [`driver::Driver::new`] to build the layout
//! hierarchy and step it to a settled position.

pub mod analysis;
pub mod driver;
pub mod error;
pub mod force;
pub mod keyword;
pub mod layout;
pub mod paper;
pub mod quadtree;

pub use driver::{Driver, DriverConfig};
pub use error::{LayoutError, Result};
pub use force::ForceParams;
pub use keyword::KeywordSet;
pub use layout::LinkWeightParams;
pub use paper::{Category, Paper, PaperGraph, PaperId};
