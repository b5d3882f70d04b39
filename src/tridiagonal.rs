//! The tridiagonal matrix produced by the Lanczos recurrence.
//!
//! The symmetric Lanczos process generates two sequences of real scalars, `a_j`
//! (diagonal) and `b_j` (off-diagonal), which define the `m x m` tridiagonal matrix
//!
//! ```text
//!            | a[0]  b[0]                     |
//!            | b[0]  a[1]  b[1]               |
//!     T(m) = |       b[1]   .    .            |
//!            |              .  a[m-2]  b[m-2] |
//!            |              .  b[m-2]  a[m-1] |
//! ```
//!
//! One `(a_j, b_j)` pair is recorded per Lanczos step. The last `b` is the residual
//! norm of the final step and lies outside `T(m)`; it is kept so that the sequence
//! round-trips through persistence unchanged.

use crate::{
    algorithms::tridiagonal_eigen::{self, TridiagonalEigen},
    error::{LanczosError, LanczosErrorKind},
};
use faer::Mat;
use serde::{Deserialize, Serialize};

/// Ordered `(a_i, b_i)` coefficients of a real symmetric tridiagonal matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TridiagonalMatrix {
    a: Vec<f64>,
    b: Vec<f64>,
}

impl TridiagonalMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(steps: usize) -> Self {
        Self {
            a: Vec::with_capacity(steps),
            b: Vec::with_capacity(steps),
        }
    }

    /// Builds a matrix from explicit coefficient sequences of equal length.
    pub fn from_coefficients(a: Vec<f64>, b: Vec<f64>) -> Result<Self, LanczosError> {
        if a.len() != b.len() {
            return Err(LanczosErrorKind::InputError(format!(
                "diagonal has {} entries but off-diagonal has {}",
                a.len(),
                b.len()
            ))
            .into());
        }
        Ok(Self { a, b })
    }

    /// Appends the coefficients of one Lanczos step.
    pub fn push(&mut self, a: f64, b: f64) {
        self.a.push(a);
        self.b.push(b);
    }

    /// Resizes to `len` pairs, zero-filling new entries.
    pub fn resize(&mut self, len: usize) {
        self.a.resize(len, 0.0);
        self.b.resize(len, 0.0);
    }

    /// Keeps only the first `len` pairs.
    pub fn truncate(&mut self, len: usize) {
        self.a.truncate(len);
        self.b.truncate(len);
    }

    pub fn clear(&mut self) {
        self.a.clear();
        self.b.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.a.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    #[inline]
    pub fn a(&self, i: usize) -> f64 {
        self.a[i]
    }

    #[inline]
    pub fn b(&self, i: usize) -> f64 {
        self.b[i]
    }

    pub fn diagonal(&self) -> &[f64] {
        &self.a
    }

    pub fn off_diagonal(&self) -> &[f64] {
        &self.b
    }

    /// Diagonal and off-diagonal of the leading `n x n` block.
    pub fn leading(&self, n: usize) -> (&[f64], &[f64]) {
        (&self.a[..n], &self.b[..n])
    }

    /// Iterates over the `(a_i, b_i)` records in step order.
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.a.iter().copied().zip(self.b.iter().copied())
    }

    /// Expands the matrix into its dense `m x m` form.
    pub fn build_dense_matrix(&self) -> Mat<f64> {
        let m = self.len();
        Mat::from_fn(m, m, |i, j| {
            if i == j {
                self.a[i]
            } else if j == i + 1 {
                self.b[i]
            } else if i == j + 1 {
                self.b[j]
            } else {
                0.0
            }
        })
    }

    /// Full diagonalization of the leading `n x n` block.
    pub fn diagonalize(
        &self,
        n: usize,
        want_vectors: bool,
        max_iterations: usize,
    ) -> Result<TridiagonalEigen, LanczosError> {
        let (a, b) = self.leading(n);
        tridiagonal_eigen::diagonalize(a, b, want_vectors, max_iterations)
    }

    /// The `index`-th eigenpair in ascending order, with the eigenvector expressed
    /// in the tridiagonal basis.
    pub fn excited(
        &self,
        index: usize,
        max_iterations: usize,
    ) -> Result<(f64, Vec<f64>), LanczosError> {
        if index >= self.len() {
            return Err(LanczosErrorKind::ExcitedIndexOutOfRange {
                index,
                rank: self.len(),
            }
            .into());
        }
        let eigen = self.diagonalize(self.len(), true, max_iterations)?;
        let order = eigen.sorted_order();
        let column = order[index];
        let vector = eigen
            .eigenvector(column)
            .ok_or(LanczosErrorKind::InsufficientHistory {
                requested: self.len(),
                available: 0,
            })?;
        Ok((eigen.eigenvalues[column], vector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_expansion_places_couplings() {
        let ab = TridiagonalMatrix::from_coefficients(vec![1.0, 2.0, 3.0], vec![0.5, 0.25, 9.0])
            .unwrap();
        let t = ab.build_dense_matrix();
        assert_eq!(t.nrows(), 3);
        assert_eq!(t[(0, 1)], 0.5);
        assert_eq!(t[(1, 0)], 0.5);
        assert_eq!(t[(2, 1)], 0.25);
        assert_eq!(t[(0, 2)], 0.0);
        // The trailing residual norm is not part of T.
        assert_eq!(t[(2, 2)], 3.0);
    }

    #[test]
    fn test_resize_and_truncate() {
        let mut ab = TridiagonalMatrix::new();
        ab.push(1.0, 2.0);
        ab.resize(3);
        assert_eq!(ab.len(), 3);
        assert_eq!(ab.a(2), 0.0);
        ab.truncate(1);
        assert_eq!(ab.pairs().collect::<Vec<_>>(), vec![(1.0, 2.0)]);
    }

    #[test]
    fn test_excited_state_of_two_by_two() {
        let ab = TridiagonalMatrix::from_coefficients(vec![2.0, 2.0], vec![1.0, 0.0]).unwrap();
        let (e0, v0) = ab.excited(0, 100).unwrap();
        let (e1, v1) = ab.excited(1, 100).unwrap();
        assert!((e0 - 1.0).abs() < 1e-12);
        assert!((e1 - 3.0).abs() < 1e-12);
        assert!((v0[0] + v0[1]).abs() < 1e-12);
        assert!((v1[0] - v1[1]).abs() < 1e-12);
        assert!(ab.excited(2, 100).is_err());
    }

    #[test]
    fn test_mismatched_coefficients_rejected() {
        let err = TridiagonalMatrix::from_coefficients(vec![1.0], vec![]).unwrap_err();
        assert!(matches!(err.kind(), LanczosErrorKind::InputError(_)));
    }
}
