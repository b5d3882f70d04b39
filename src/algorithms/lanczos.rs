//! The Lanczos basis store and the three-term recurrence step.
//!
//! ** NOTE: We recommend using the high-level [`crate::solvers::LanczosSolver`] instead.
//! This module is intended for use cases where fine-grained control over the Lanczos
//! process is required.
//!
//! [`LanczosVectors`] owns the orthonormal basis `v_0 ... v_{m-1}` for one
//! decomposition. Two memory modes trade storage against work:
//!
//! - **Generous** ([`BasisStorage::Generous`]): every basis vector is kept in a
//!   `rank x steps` matrix, `O(rank * steps)` memory. Eigenvector reconstruction is a
//!   single matrix-vector product with the stored basis, and full reorthogonalization
//!   is available.
//! - **Lean** ([`BasisStorage::Lean`]): only the initial vector is kept, `O(rank)`
//!   memory. Reconstruction replays the recurrence from the saved initial vector,
//!   which doubles the number of operator applications.
//!
//! The replayed vectors are bit-identical to the ones generated during the
//! decomposition because the step is deterministic.

use super::{BREAKDOWN_TOLERANCE, LanczosStep, dot, norm, scale_in_place, subtract_scaled};
use crate::{
    error::{LanczosError, LanczosErrorKind},
    operator::HermitianOperator,
    scalar::Scalar,
    tridiagonal::TridiagonalMatrix,
};
use faer::{Accum, Mat, MatRef, Par, linalg::matmul::matmul};
use serde::{Deserialize, Serialize};

/// How many Lanczos vectors are retained during a decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BasisStorage {
    /// Keep every basis vector.
    Generous,
    /// Keep only the initial vector and replay the recurrence on demand.
    Lean,
}

/// Storage and recurrence for the Lanczos basis of one operator.
pub struct LanczosVectors<'a, T: Scalar, O: HermitianOperator<T> + ?Sized> {
    operator: &'a O,
    storage: BasisStorage,
    reorthogonalize: bool,
    memory_limit_bytes: Option<usize>,
    data: Option<Mat<T>>,
    steps: usize,
    stored: usize,
    initial: Option<Mat<T>>,
}

impl<'a, T: Scalar, O: HermitianOperator<T> + ?Sized> LanczosVectors<'a, T, O> {
    pub fn new(operator: &'a O, storage: BasisStorage, reorthogonalize: bool) -> Self {
        Self {
            operator,
            storage,
            reorthogonalize,
            memory_limit_bytes: None,
            data: None,
            steps: 0,
            stored: 0,
            initial: None,
        }
    }

    /// Caps the bytes the generous basis may occupy.
    pub fn with_memory_limit(mut self, limit: Option<usize>) -> Self {
        self.memory_limit_bytes = limit;
        self
    }

    pub fn storage(&self) -> BasisStorage {
        self.storage
    }

    /// Number of basis vectors written since the last [`Self::resize`].
    pub fn stored(&self) -> usize {
        self.stored
    }

    /// The stored basis `[v_0 ... v_{m-1}]`, available in generous mode only.
    pub fn basis(&self) -> Option<MatRef<'_, T>> {
        self.data
            .as_ref()
            .map(|data| data.as_ref().get(.., 0..self.stored))
    }

    /// Largest entry of `|V^H V - I|` over the stored basis, available in generous
    /// mode only. Zero means the basis is exactly orthonormal.
    pub fn orthogonality_loss(&self) -> Option<f64> {
        let basis = self.basis()?;
        let identity = Mat::<T>::identity(basis.ncols(), basis.ncols());
        Some((&identity - basis.adjoint() * basis).norm_max())
    }

    /// Prepares storage for `steps` vectors of dimension `rank`.
    pub fn resize(&mut self, rank: usize, steps: usize) -> Result<(), LanczosError> {
        if steps > rank {
            return Err(LanczosErrorKind::Allocation {
                rank,
                steps,
                reason: "more Lanczos steps than the operator rank".to_string(),
            }
            .into());
        }
        self.steps = steps;
        self.stored = 0;
        self.initial = None;
        if self.storage == BasisStorage::Lean {
            self.data = None;
            return Ok(());
        }

        let bytes = rank
            .checked_mul(steps)
            .and_then(|entries| entries.checked_mul(std::mem::size_of::<T>()))
            .ok_or_else(|| LanczosErrorKind::Allocation {
                rank,
                steps,
                reason: "basis size overflows the address space".to_string(),
            })?;
        if let Some(limit) = self.memory_limit_bytes {
            if bytes > limit {
                return Err(LanczosErrorKind::Allocation {
                    rank,
                    steps,
                    reason: format!("{bytes} bytes requested, limit is {limit}"),
                }
                .into());
            }
        }
        self.data = Some(Mat::zeros(rank, steps));
        Ok(())
    }

    /// Drops every basis vector beyond the first `steps`.
    pub fn truncate(&mut self, steps: usize) {
        self.steps = self.steps.min(steps);
        self.stored = self.stored.min(steps);
        if let Some(data) = self.data.as_mut() {
            if data.ncols() > steps {
                *data = data.as_ref().get(.., 0..steps).to_owned();
            }
        }
    }

    /// Records the normalized starting vector used for replay.
    pub fn save_initial_vector(&mut self, y: MatRef<'_, T>) {
        self.initial = Some(y.to_owned());
    }

    /// Stores `y` as basis vector `j`.
    pub fn set_vector(&mut self, j: usize, y: MatRef<'_, T>) {
        if let Some(data) = self.data.as_mut() {
            data.col_mut(j).copy_from(y.col(0));
        }
        self.stored = self.stored.max(j + 1);
    }

    /// One step of the three-term recurrence.
    ///
    /// On entry `y` holds `v_j` and `x` holds `-b_{j-1} v_{j-1}` (zero for `j = 0`).
    /// The step forms `x += H y`, takes `a_j = Re <y|x>`, removes the `v_j` component
    /// (and, with reorthogonalization, the components along every stored vector),
    /// and sets `b_j = ||x||`. On exit `y` holds `v_{j+1}` and `x` holds `-b_j v_j`.
    ///
    /// A numerically zero `b_j` is reported through [`LanczosStep::exhausted`]; the
    /// unnormalized residual is then left in `y`.
    pub fn one_step_decomposition(&self, x: &mut Mat<T>, y: &mut Mat<T>) -> LanczosStep {
        self.operator.matrix_vector_product(x.as_mut(), y.as_ref());

        let a = dot(y.as_ref(), x.as_ref()).real_part();
        subtract_scaled(x, T::from_real(a), y.as_ref());

        if self.reorthogonalize {
            if let Some(basis) = self.basis() {
                for k in 0..basis.ncols() {
                    let v_k = basis.get(.., k..k + 1);
                    let overlap = dot(v_k, x.as_ref());
                    subtract_scaled(x, overlap, v_k);
                }
            }
        }

        let b = norm(x.as_ref());
        let exhausted = b.abs() < BREAKDOWN_TOLERANCE;

        // Swap roles: y <- x / b, x <- -b * (old y).
        std::mem::swap(x, y);
        if !exhausted {
            scale_in_place(y, 1.0 / b);
        }
        scale_in_place(x, -b);

        LanczosStep { a, b, exhausted }
    }

    /// Tests whether `H y` lies in the span of `y`, i.e. `y` is already an eigenvector.
    ///
    /// On success the tridiagonal matrix becomes the single pair `(<y|H|y>, 0)` and
    /// `y` is stored as the only basis vector.
    pub fn is_hy_zero(&mut self, y: MatRef<'_, T>, ab: &mut TridiagonalMatrix) -> bool {
        log::info!("Testing whether the initial vector spans an invariant subspace...");
        let mut x = Mat::<T>::zeros(y.nrows(), 1);
        self.operator.matrix_vector_product(x.as_mut(), y);

        let a = dot(y, x.as_ref()).real_part();
        subtract_scaled(&mut x, T::from_real(a), y);
        if norm(x.as_ref()) >= BREAKDOWN_TOLERANCE {
            return false;
        }

        ab.clear();
        ab.push(a, 0.0);
        self.save_initial_vector(y);
        self.set_vector(0, y);
        self.truncate(1);
        true
    }

    /// Builds `z = sum_j c_j v_j` from tridiagonal-eigenvector coefficients.
    pub fn hook_for_z(&self, coefficients: &[f64]) -> Result<Mat<T>, LanczosError> {
        let k = coefficients.len();
        match self.storage {
            BasisStorage::Generous => {
                let basis = self.basis().ok_or(LanczosErrorKind::InsufficientHistory {
                    requested: k,
                    available: 0,
                })?;
                if k > basis.ncols() {
                    return Err(LanczosErrorKind::InsufficientHistory {
                        requested: k,
                        available: basis.ncols(),
                    }
                    .into());
                }
                let c = Mat::<T>::from_fn(k, 1, |j, _| T::from_real(coefficients[j]));
                let mut z = Mat::<T>::zeros(basis.nrows(), 1);
                matmul(
                    z.as_mut(),
                    Accum::Replace,
                    basis.get(.., 0..k),
                    c.as_ref(),
                    T::from_real(1.0),
                    Par::Seq,
                );
                Ok(z)
            }
            BasisStorage::Lean => {
                let initial = self
                    .initial
                    .as_ref()
                    .ok_or(LanczosErrorKind::InsufficientHistory {
                        requested: k,
                        available: 0,
                    })?;
                if k > self.steps {
                    return Err(LanczosErrorKind::InsufficientHistory {
                        requested: k,
                        available: self.steps,
                    }
                    .into());
                }
                let n = initial.nrows();
                let mut x = Mat::<T>::zeros(n, 1);
                let mut y = initial.clone();
                let mut z = Mat::<T>::zeros(n, 1);
                for (j, &c_j) in coefficients.iter().enumerate() {
                    subtract_scaled(&mut z, T::from_real(-c_j), y.as_ref());
                    if j + 1 < k {
                        self.one_step_decomposition(&mut x, &mut y);
                    }
                }
                Ok(z)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    fn run_steps(
        vectors: &mut LanczosVectors<'_, f64, Mat<f64>>,
        start: &Mat<f64>,
        steps: usize,
    ) -> TridiagonalMatrix {
        let n = start.nrows();
        vectors.resize(n, steps).unwrap();
        vectors.save_initial_vector(start.as_ref());
        let mut x = Mat::<f64>::zeros(n, 1);
        let mut y = start.clone();
        let mut ab = TridiagonalMatrix::new();
        for j in 0..steps {
            vectors.set_vector(j, y.as_ref());
            let step = vectors.one_step_decomposition(&mut x, &mut y);
            ab.push(step.a, step.b);
            if step.exhausted {
                vectors.truncate(j + 1);
                break;
            }
        }
        ab
    }

    #[test]
    fn test_two_by_two_recurrence() {
        let h: Mat<f64> = mat![[2.0, 1.0], [1.0, 2.0]];
        let start: Mat<f64> = mat![[1.0], [0.0]];
        let mut vectors = LanczosVectors::new(&h, BasisStorage::Generous, false);
        let ab = run_steps(&mut vectors, &start, 2);

        assert_eq!(ab.len(), 2);
        assert_eq!(ab.a(0), 2.0);
        assert_eq!(ab.b(0), 1.0);
        assert_eq!(ab.a(1), 2.0);
        assert!(ab.b(1) < BREAKDOWN_TOLERANCE);
        let basis = vectors.basis().unwrap();
        assert_eq!(basis[(1, 1)], 1.0);
        assert_eq!(vectors.orthogonality_loss(), Some(0.0));
    }

    #[test]
    fn test_replay_matches_stored_basis() {
        let h: Mat<f64> = mat![
            [4.0, 1.0, 0.0, 0.5],
            [1.0, 3.0, 1.0, 0.0],
            [0.0, 1.0, 2.0, 1.0],
            [0.5, 0.0, 1.0, 1.0],
        ];
        let start: Mat<f64> = mat![[0.5], [0.5], [0.5], [0.5]];
        let coefficients = [0.1, -0.7, 0.3, 0.2];

        let mut generous = LanczosVectors::new(&h, BasisStorage::Generous, false);
        run_steps(&mut generous, &start, 4);
        let mut lean = LanczosVectors::new(&h, BasisStorage::Lean, false);
        run_steps(&mut lean, &start, 4);

        let z_generous = generous.hook_for_z(&coefficients).unwrap();
        let z_lean = lean.hook_for_z(&coefficients).unwrap();
        for i in 0..4 {
            assert!((z_generous[(i, 0)] - z_lean[(i, 0)]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_lean_reconstruction_needs_initial_vector() {
        let h: Mat<f64> = mat![[1.0, 0.0], [0.0, 2.0]];
        let mut vectors = LanczosVectors::new(&h, BasisStorage::Lean, false);
        vectors.resize(2, 2).unwrap();
        let err = vectors.hook_for_z(&[1.0]).unwrap_err();
        assert!(err.is_state_error());
    }

    #[test]
    fn test_generous_reconstruction_beyond_history_fails() {
        let h: Mat<f64> = mat![[1.0, 0.0], [0.0, 2.0]];
        let start: Mat<f64> = mat![[1.0], [0.0]];
        let mut vectors = LanczosVectors::new(&h, BasisStorage::Generous, false);
        run_steps(&mut vectors, &start, 2);
        // `start` is an eigenvector: only one basis vector survives.
        let err = vectors.hook_for_z(&[1.0, 0.0]).unwrap_err();
        assert_eq!(
            *err.kind(),
            LanczosErrorKind::InsufficientHistory {
                requested: 2,
                available: 1
            }
        );
    }

    #[test]
    fn test_memory_limit_rejects_large_basis() {
        let h = Mat::<f64>::identity(10, 10);
        let mut vectors =
            LanczosVectors::new(&h, BasisStorage::Generous, false).with_memory_limit(Some(100));
        let err = vectors.resize(10, 10).unwrap_err();
        assert!(matches!(err.kind(), LanczosErrorKind::Allocation { .. }));
        assert!(vectors.resize(10, 1).is_ok());
    }

    #[test]
    fn test_is_hy_zero_detects_eigenvector() {
        let h: Mat<f64> = mat![[3.0, 0.0], [0.0, 1.0]];
        let mut vectors = LanczosVectors::new(&h, BasisStorage::Lean, false);
        vectors.resize(2, 2).unwrap();
        let mut ab = TridiagonalMatrix::new();

        let not_eigen: Mat<f64> = mat![[0.6], [0.8]];
        assert!(!vectors.is_hy_zero(not_eigen.as_ref(), &mut ab));
        assert!(ab.is_empty());

        let eigen: Mat<f64> = mat![[1.0], [0.0]];
        assert!(vectors.is_hy_zero(eigen.as_ref(), &mut ab));
        assert_eq!(ab.pairs().collect::<Vec<_>>(), vec![(3.0, 0.0)]);
    }
}
