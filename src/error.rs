use thiserror::Error;

/// Failures the core can report. Invariant violations (a painted node
/// repainted, a leaf treated as internal, a post-symmetrisation self link)
/// are programmer errors and remain `assert!`/`debug_assert!` panics rather
/// than variants here, matching the source's treatment of such conditions
/// as unreachable given valid input.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("allocation failed while building {0}")]
    Alloc(&'static str),
    #[error("operation requires at least one node")]
    EmptyGraph,
}

pub type Result<T> = std::result::Result<T, LayoutError>;
