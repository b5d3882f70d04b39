//! This module provides the high-level eigensolvers.
//!
//! Both solvers implement [`EigenSolver`], so a caller can hold a
//! `&mut dyn EigenSolver<T>` and switch between the Lanczos and Davidson variants
//! without touching the rest of the code:
//!
//! - [`LanczosSolver`]: Krylov tridiagonalization with incremental convergence checks.
//!   The workhorse for extremal eigenvalues of large sparse operators.
//! - [`DavidsonSolver`]: subspace expansion with diagonally preconditioned corrections,
//!   suited to diagonally dominant operators.
//!
//! Both take an optional starting vector. When none is supplied a random vector is
//! drawn from a generator seeded with [`SolverParams::seed`], so repeated calls with
//! the same parameters are reproducible.

pub mod davidson;
pub mod lanczos;

pub use davidson::DavidsonSolver;
pub use lanczos::{LanczosSolver, Termination};

use crate::{
    algorithms::{dense, normalized},
    error::{LanczosError, LanczosErrorKind},
    operator::{HermitianOperator, to_dense},
    params::SolverParams,
    scalar::Scalar,
};
use faer::{Mat, MatRef};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// An eigenvalue and its (full-space) eigenvector.
#[derive(Debug, Clone)]
pub struct EigenPair<T: Scalar> {
    pub energy: f64,
    pub vector: Mat<T>,
}

/// The contract shared by the iterative eigensolvers.
pub trait EigenSolver<T: Scalar> {
    /// The algebraically smallest eigenpair.
    fn compute_ground_state(
        &mut self,
        initial: Option<MatRef<'_, T>>,
    ) -> Result<EigenPair<T>, LanczosError>;

    /// The `excited`-th eigenpair in ascending order; index 0 is the ground state.
    fn compute_excited_state(
        &mut self,
        initial: Option<MatRef<'_, T>>,
        excited: usize,
    ) -> Result<EigenPair<T>, LanczosError>;
}

/// A normalized vector with entries drawn uniformly from `[-0.5, 0.5)`.
pub fn random_vector<T: Scalar>(rank: usize, seed: u64) -> Mat<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    let y = Mat::from_fn(rank, 1, |_, _| T::from_real(rng.random::<f64>() - 0.5));
    normalized(y.as_ref()).unwrap_or(y)
}

/// Checks the caller's starting vector (or draws one) and returns it normalized,
/// together with the norm it had on entry.
pub(crate) fn starting_vector<T: Scalar>(
    rank: usize,
    initial: Option<MatRef<'_, T>>,
    seed: u64,
) -> Result<(Mat<T>, f64), LanczosError> {
    let Some(initial) = initial else {
        return Ok((random_vector(rank, seed), 1.0));
    };
    if initial.nrows() != rank || initial.ncols() != 1 {
        return Err(LanczosErrorKind::DimensionMismatch {
            rank,
            vector_rows: initial.nrows(),
        }
        .into());
    }
    let original_norm = crate::algorithms::norm(initial);
    if !original_norm.is_finite() {
        return Err(LanczosErrorKind::InputError(
            "the initial vector has non-finite entries".to_string(),
        )
        .into());
    }
    let y = normalized(initial).ok_or_else(|| {
        LanczosErrorKind::InputError("the initial vector must not be zero".to_string())
    })?;
    Ok((y, original_norm))
}

/// Rejects excited-state indices outside the operator's spectrum.
pub(crate) fn check_excited_index(rank: usize, excited: usize) -> Result<(), LanczosError> {
    if excited >= rank {
        return Err(LanczosErrorKind::ExcitedIndexOutOfRange {
            index: excited,
            rank,
        }
        .into());
    }
    Ok(())
}

/// Debug mode: materializes the operator, checks it is Hermitian and logs its
/// dense spectrum. Never produces an eigenpair.
pub(crate) fn dump_dense_spectrum<T, O>(
    name: &str,
    operator: &O,
    excited: usize,
    thread_id: usize,
) -> Result<EigenPair<T>, LanczosError>
where
    T: Scalar,
    O: HermitianOperator<T> + ?Sized,
{
    let dense_matrix = to_dense(operator);
    dense::check_hermitian(&dense_matrix)?;
    log::debug!("{name}[{thread_id}]: matrix is Hermitian, rank {}", dense_matrix.nrows());
    log::debug!("{name}[{thread_id}]: {dense_matrix:?}");

    let eigen = dense::hermitian_eigen(&dense_matrix)?;
    let ground_vector: Vec<T> = (0..dense_matrix.nrows())
        .map(|i| eigen.eigenvectors[(i, 0)])
        .collect();
    log::debug!("{name}[{thread_id}]: ground state {ground_vector:?}");
    log::debug!(
        "{name}[{thread_id}]: eigs[{excited}]={}",
        eigen.eigenvalues[excited]
    );

    Err(LanczosErrorKind::UnsupportedConfiguration(
        "debug mode only dumps the dense spectrum".to_string(),
    )
    .into())
}

/// Shared validation of the solver parameters, logged once per construction.
pub(crate) fn validated(
    name: &str,
    rank: usize,
    params: SolverParams,
) -> Result<SolverParams, LanczosError> {
    params.validate()?;
    log::info!(
        "{name}[{}]: Constructing... mat.rank={rank} maximum steps={} maximum eps={:e} requested",
        params.thread_id,
        params.steps,
        params.tolerance
    );
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    #[test]
    fn test_random_vector_is_normalized_and_seeded() {
        let a: Mat<f64> = random_vector(17, 7);
        let b: Mat<f64> = random_vector(17, 7);
        let c: Mat<f64> = random_vector(17, 8);
        assert!((crate::algorithms::norm(a.as_ref()) - 1.0).abs() < 1e-14);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_starting_vector_rejects_wrong_size() {
        let v: Mat<f64> = mat![[1.0], [2.0]];
        let err = starting_vector(3, Some(v.as_ref()), 0).unwrap_err();
        assert!(err.is_dimension_error());
    }

    #[test]
    fn test_starting_vector_rejects_zero() {
        let v = Mat::<f64>::zeros(3, 1);
        let err = starting_vector(3, Some(v.as_ref()), 0).unwrap_err();
        assert!(matches!(err.kind(), LanczosErrorKind::InputError(_)));
    }

    #[test]
    fn test_starting_vector_rejects_non_finite_entries() {
        for bad in [f64::NAN, f64::INFINITY] {
            let v: Mat<f64> = mat![[1.0], [bad], [0.0]];
            let err = starting_vector(3, Some(v.as_ref()), 0).unwrap_err();
            match err.kind() {
                LanczosErrorKind::InputError(message) => {
                    assert!(message.contains("non-finite"), "{message}");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_debug_dump_is_unsupported() {
        let h: Mat<f64> = mat![[2.0, 1.0], [1.0, 2.0]];
        let err = dump_dense_spectrum("test", &h, 1, 0).unwrap_err();
        assert!(matches!(
            err.kind(),
            LanczosErrorKind::UnsupportedConfiguration(_)
        ));

        let skew: Mat<f64> = mat![[0.0, 1.0], [-1.0, 0.0]];
        let err = dump_dense_spectrum("test", &skew, 0, 0).unwrap_err();
        assert!(matches!(err.kind(), LanczosErrorKind::NotHermitian { .. }));
    }
}
