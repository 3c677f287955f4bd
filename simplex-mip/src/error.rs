//! Error types for the branch-and-bound layer.

use thiserror::Error;

/// Errors reported by the branch-and-bound driver.
#[derive(Debug, Error)]
pub enum MipError {
    /// The problem or the supplied root relaxation is not usable as a
    /// starting point for the search.
    #[error("invalid search input: {0}")]
    InvalidInput(String),

    /// The root relaxation is unbounded, so the integer problem is either
    /// unbounded or infeasible and the search cannot distinguish the two.
    #[error("relaxation is unbounded")]
    UnboundedRelaxation,

    /// Round-off kept breaking a subproblem solve and recovery restarts
    /// stopped making progress.
    #[error("numerical failure: {0}")]
    NumericalFailure(String),

    /// An error surfaced from the simplex engine.
    #[error(transparent)]
    Core(#[from] simplex_core::SimplexError),
}

/// Result alias for branch-and-bound operations.
pub type MipResult<T> = Result<T, MipError>;
