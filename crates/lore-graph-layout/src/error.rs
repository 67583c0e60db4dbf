//! Error types for layout operations.

use thiserror::Error;

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Errors that can occur while building or laying out a graph.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The input graph violates a structural invariant (self-edge, duplicate
    /// edge, unknown endpoint, weight outside its domain). The layouter's
    /// state is unchanged when this is returned.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// An internal invariant was violated. This indicates a bug in the
    /// engine; the current layout call is abandoned.
    #[error("layout invariant violated: {0}")]
    Internal(String),
}
