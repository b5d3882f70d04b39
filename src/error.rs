//! This module defines the custom error types for the library.
//!
//! Every failure the eigensolvers can report is a variant of [`LanczosErrorKind`],
//! wrapped in the public [`LanczosError`] newtype. The variants group into the
//! classes callers care about:
//!
//! - **dimension**: a vector or excited-state index does not fit the operator;
//! - **state**: a reconstructed vector collapsed, or the basis history needed to
//!   rebuild it is gone;
//! - **convergence**: the tridiagonal QL iteration hit its cap;
//! - **allocation**: the requested basis storage is over the configured limit;
//! - **configuration**: the requested mode is not supported.
//!
//! Note that [`faer::linalg::evd::EvdError`] does not implement the standard
//! [`std::error::Error`] trait, so we wrap it manually.
use thiserror::Error;

/// Represents all possible errors that can occur during an eigensolver run.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct LanczosError(#[from] LanczosErrorKind);

impl LanczosError {
    /// The underlying error kind, for matching on the failure class.
    pub fn kind(&self) -> &LanczosErrorKind {
        &self.0
    }

    /// `true` for the dimension class (vector size or excited index).
    pub fn is_dimension_error(&self) -> bool {
        matches!(
            self.0,
            LanczosErrorKind::DimensionMismatch { .. }
                | LanczosErrorKind::ExcitedIndexOutOfRange { .. }
        )
    }

    /// `true` for the state class (collapsed vector or missing basis history).
    pub fn is_state_error(&self) -> bool {
        matches!(
            self.0,
            LanczosErrorKind::ZeroNorm { .. } | LanczosErrorKind::InsufficientHistory { .. }
        )
    }
}

/// The distinct kinds of errors.
#[derive(Error, Debug, PartialEq)]
pub enum LanczosErrorKind {
    /// A caller-supplied vector does not match the operator rank.
    #[error("Dimension mismatch: operator has rank {rank} but vector has {vector_rows} rows.")]
    DimensionMismatch { rank: usize, vector_rows: usize },

    /// An excited state beyond the operator's spectrum was requested.
    #[error("Excited state {index} requested, but the operator only has rank {rank}.")]
    ExcitedIndexOutOfRange { index: usize, rank: usize },

    /// The reconstructed eigenvector has (near-)zero norm: the Krylov subspace collapsed.
    #[error(
        "Reconstructed vector has norm {norm:e} after {steps} steps (rank {rank}); the Krylov subspace collapsed."
    )]
    ZeroNorm { rank: usize, steps: usize, norm: f64 },

    /// Eigenvector reconstruction asked for more basis vectors than are available.
    #[error(
        "Insufficient Lanczos history: {requested} coefficients supplied but only {available} basis vectors are available."
    )]
    InsufficientHistory { requested: usize, available: usize },

    /// The implicit-shift QL iteration exceeded its iteration cap.
    #[error(
        "Tridiagonal eigensolver did not converge for size {size} within {max_iterations} iterations (internal error)."
    )]
    NoConvergence { size: usize, max_iterations: usize },

    /// The requested Lanczos basis storage exceeds the configured or addressable limit.
    #[error("Cannot allocate Lanczos basis for rank {rank} and {steps} steps: {reason}.")]
    Allocation {
        rank: usize,
        steps: usize,
        reason: String,
    },

    /// Indicates that an invalid input parameter was provided to a function.
    #[error("Invalid input parameter: {0}")]
    InputError(String),

    /// A mode reachable only through explicit options that has no result to return.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// The dense form of the operator is not Hermitian.
    #[error("Operator is not Hermitian: H[{row},{col}] != conj(H[{col},{row}]).")]
    NotHermitian { row: usize, col: usize },

    /// Wraps an error originating from [`faer`]'s eigendecomposition module.
    #[error("A numerical error occurred during the dense eigendecomposition: {0:?}")]
    EvdError(faer::linalg::evd::EvdError),
}

// Manually implement PartialEq for the public error type.
// We compare the inner `LanczosErrorKind`.
impl PartialEq for LanczosError {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_error_message() {
        let error = LanczosError(LanczosErrorKind::DimensionMismatch {
            rank: 100,
            vector_rows: 99,
        });
        let expected_message = "Dimension mismatch: operator has rank 100 but vector has 99 rows.";
        assert_eq!(error.to_string(), expected_message);
        assert!(error.is_dimension_error());
        assert!(!error.is_state_error());
    }

    #[test]
    fn test_no_convergence_error_message() {
        let error = LanczosError(LanczosErrorKind::NoConvergence {
            size: 7,
            max_iterations: 30,
        });
        let expected_message = "Tridiagonal eigensolver did not converge for size 7 within 30 iterations (internal error).";
        assert_eq!(error.to_string(), expected_message);
    }

    #[test]
    fn test_insufficient_history_is_state_error() {
        let error = LanczosError::from(LanczosErrorKind::InsufficientHistory {
            requested: 5,
            available: 0,
        });
        assert!(error.is_state_error());
        assert_eq!(
            error.to_string(),
            "Insufficient Lanczos history: 5 coefficients supplied but only 0 basis vectors are available."
        );
    }

    #[test]
    fn test_evd_error_message() {
        let evd_error = faer::linalg::evd::EvdError::NoConvergence;
        let error = LanczosError(LanczosErrorKind::EvdError(evd_error));
        let expected_message =
            "A numerical error occurred during the dense eigendecomposition: NoConvergence";
        assert_eq!(error.to_string(), expected_message);
    }
}
