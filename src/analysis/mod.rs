//! Graph analyses run once after loading (component B): connected-component
//! colouring and transitive reduction of the citation DAG.

pub mod colour;
pub mod tred;

pub use colour::recompute_colours;
pub use tred::compute_tred;
