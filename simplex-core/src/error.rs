//! Error types for the simplex engine.

use thiserror::Error;

/// Errors reported by the simplex engine.
#[derive(Debug, Error)]
pub enum SimplexError {
    /// Problem data is malformed (inconsistent dimensions, bad bounds, etc.).
    #[error("invalid problem: {0}")]
    InvalidProblem(String),

    /// A basis description does not form a valid partition.
    #[error("invalid basis: {0}")]
    InvalidBasis(String),

    /// The basis matrix stayed singular or ill-conditioned through the whole
    /// pivot-tolerance ladder.
    #[error("basis matrix is unusable: {0}")]
    BasisUnusable(#[from] crate::factor::FactorError),

    /// Round-off kept breaking feasibility and restarts with a fresh
    /// factorization stopped making progress.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),
}

/// Result alias for simplex operations.
pub type SimplexResult<T> = Result<T, SimplexError>;
