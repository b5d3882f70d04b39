//! This module defines the operator abstraction consumed by the eigensolvers.
//!
//! The Lanczos and Davidson iterations never look at individual matrix entries;
//! they only apply the operator to vectors. [`HermitianOperator`] formalizes that
//! contract with *accumulate* semantics: `matrix_vector_product(acc, rhs)` performs
//! `acc += H * rhs`, which lets the three-term recurrence fold the
//! `-b_{j-1} v_{j-1}` term into the accumulator before the product.
//!
//! Implementations are provided for `faer`'s dense `Mat`/`MatRef` and for
//! `SparseColMat`. The solvers only hold shared references, so an operator used
//! from several solver instances concurrently must not mutate internal state
//! without its own synchronization.

use crate::scalar::Scalar;
use faer::{
    Accum, Mat, MatMut, MatRef, Par,
    linalg::matmul::matmul,
    sparse::{SparseColMat, linalg::matmul::sparse_dense_matmul},
};

/// A Hermitian (or real-symmetric) linear operator `H`.
///
/// # Example
///
/// ```
/// use faer::mat;
/// use lanczos_eigensolver::operator::HermitianOperator;
///
/// let h = mat![[2.0, 1.0], [1.0, 2.0]];
/// let x = mat![[1.0], [0.0]];
/// let mut acc = mat![[10.0], [10.0]];
/// h.matrix_vector_product(acc.as_mut(), x.as_ref());
/// assert_eq!(acc, mat![[12.0], [11.0]]);
/// ```
pub trait HermitianOperator<T: Scalar> {
    /// The dimension of the (square) operator.
    fn rank(&self) -> usize;

    /// Accumulates `H * rhs` into `acc`.
    ///
    /// Both `acc` and `rhs` are `rank() x 1` column matrices.
    ///
    /// # Panics
    ///
    /// Implementations may panic if the dimensions do not match the rank.
    fn matrix_vector_product(&self, acc: MatMut<'_, T>, rhs: MatRef<'_, T>);

    /// The diagonal entries `H_ii`.
    ///
    /// The default applies the operator to unit vectors, which costs `rank()`
    /// products; storage-backed operators override it.
    fn diagonal(&self) -> Vec<T> {
        let n = self.rank();
        let mut unit = Mat::<T>::zeros(n, 1);
        let mut diag = Vec::with_capacity(n);
        for i in 0..n {
            unit[(i, 0)] = T::from_real(1.0);
            let mut image = Mat::<T>::zeros(n, 1);
            self.matrix_vector_product(image.as_mut(), unit.as_ref());
            diag.push(image[(i, 0)]);
            unit[(i, 0)] = T::from_real(0.0);
        }
        diag
    }
}

impl<'a, T: Scalar> HermitianOperator<T> for MatRef<'a, T> {
    #[inline]
    fn rank(&self) -> usize {
        self.nrows()
    }

    fn matrix_vector_product(&self, acc: MatMut<'_, T>, rhs: MatRef<'_, T>) {
        assert_eq!(
            self.ncols(),
            rhs.nrows(),
            "Dimension mismatch: operator columns ({}) do not match vector rows ({}).",
            self.ncols(),
            rhs.nrows(),
        );
        matmul(acc, Accum::Add, *self, rhs, T::from_real(1.0), Par::Seq);
    }

    fn diagonal(&self) -> Vec<T> {
        (0..self.nrows()).map(|i| self[(i, i)]).collect()
    }
}

impl<T: Scalar> HermitianOperator<T> for Mat<T> {
    #[inline]
    fn rank(&self) -> usize {
        self.nrows()
    }

    #[inline]
    fn matrix_vector_product(&self, acc: MatMut<'_, T>, rhs: MatRef<'_, T>) {
        self.as_ref().matrix_vector_product(acc, rhs)
    }

    fn diagonal(&self) -> Vec<T> {
        // `Mat` has an inherent `diagonal` returning a view; call the trait's.
        HermitianOperator::<T>::diagonal(&self.as_ref())
    }
}

impl<T: Scalar> HermitianOperator<T> for SparseColMat<usize, T> {
    #[inline]
    fn rank(&self) -> usize {
        self.nrows()
    }

    fn matrix_vector_product(&self, acc: MatMut<'_, T>, rhs: MatRef<'_, T>) {
        assert_eq!(
            self.ncols(),
            rhs.nrows(),
            "Dimension mismatch: operator columns ({}) do not match vector rows ({}).",
            self.ncols(),
            rhs.nrows(),
        );
        sparse_dense_matmul(
            acc,
            Accum::Add,
            self.as_ref(),
            rhs,
            T::from_real(1.0),
            Par::Seq,
        );
    }

    fn diagonal(&self) -> Vec<T> {
        let mut diag = vec![T::from_real(0.0); self.nrows()];
        for triplet in self.triplet_iter() {
            if triplet.row == triplet.col {
                diag[triplet.row] = diag[triplet.row] + *triplet.val;
            }
        }
        diag
    }
}

/// Materializes the operator as a dense matrix, one column per unit vector.
pub fn to_dense<T: Scalar, O: HermitianOperator<T> + ?Sized>(operator: &O) -> Mat<T> {
    let n = operator.rank();
    let mut dense = Mat::<T>::zeros(n, n);
    let mut unit = Mat::<T>::zeros(n, 1);
    for j in 0..n {
        unit[(j, 0)] = T::from_real(1.0);
        let mut column = Mat::<T>::zeros(n, 1);
        operator.matrix_vector_product(column.as_mut(), unit.as_ref());
        dense.col_mut(j).copy_from(column.col(0));
        unit[(j, 0)] = T::from_real(0.0);
    }
    dense
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::{mat, sparse::Triplet};
    use num_complex::Complex64;

    #[test]
    fn test_dense_product_accumulates() {
        let matrix: Mat<f64> = mat![[2.0, -1.0, 0.0], [-1.0, 2.0, -1.0], [0.0, -1.0, 2.0],];
        let vector: Mat<f64> = mat![[1.0], [2.0], [3.0]];
        let mut acc: Mat<f64> = mat![[1.0], [1.0], [1.0]];

        let operator: &dyn HermitianOperator<f64> = &matrix;
        operator.matrix_vector_product(acc.as_mut(), vector.as_ref());

        assert_eq!(acc, mat![[1.0], [1.0], [5.0]]);
        assert_eq!(operator.rank(), 3);
        assert_eq!(operator.diagonal(), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_sparse_matches_dense() {
        let triplets = [
            Triplet { row: 0, col: 0, val: 4.0 },
            Triplet { row: 0, col: 2, val: 1.5 },
            Triplet { row: 2, col: 0, val: 1.5 },
            Triplet { row: 1, col: 1, val: -3.0 },
        ];
        let sparse = SparseColMat::try_new_from_triplets(3, 3, &triplets).unwrap();
        let dense = to_dense(&sparse);
        let expected: Mat<f64> = mat![[4.0, 0.0, 1.5], [0.0, -3.0, 0.0], [1.5, 0.0, 0.0],];
        assert_eq!(dense, expected);
        assert_eq!(
            HermitianOperator::<f64>::diagonal(&sparse),
            vec![4.0, -3.0, 0.0]
        );

        let x: Mat<f64> = mat![[1.0], [2.0], [3.0]];
        let mut acc: Mat<f64> = mat![[1.0], [1.0], [1.0]];
        sparse.matrix_vector_product(acc.as_mut(), x.as_ref());
        // acc += H x with H x = (4 + 4.5, -6, 1.5)
        assert_eq!(acc, mat![[9.5], [-5.0], [2.5]]);
    }

    #[test]
    fn test_owned_matrix_diagonal_through_trait() {
        let m: Mat<f64> = mat![[3.0, 1.0, 0.0], [1.0, -2.0, 0.5], [0.0, 0.5, 7.0]];
        assert_eq!(HermitianOperator::<f64>::diagonal(&m), vec![3.0, -2.0, 7.0]);

        fn generic_diagonal<O: HermitianOperator<f64>>(op: &O) -> Vec<f64> {
            op.diagonal()
        }
        assert_eq!(generic_diagonal(&m), vec![3.0, -2.0, 7.0]);
        assert_eq!(generic_diagonal(&m.as_ref()), vec![3.0, -2.0, 7.0]);
    }

    #[test]
    fn test_default_diagonal_applies_unit_vectors() {
        struct Shifted(Mat<f64>);
        impl HermitianOperator<f64> for Shifted {
            fn rank(&self) -> usize {
                self.0.nrows()
            }
            fn matrix_vector_product(&self, acc: MatMut<'_, f64>, rhs: MatRef<'_, f64>) {
                self.0.matrix_vector_product(acc, rhs)
            }
        }
        let op = Shifted(mat![[1.0, 2.0], [2.0, 5.0]]);
        assert_eq!(op.diagonal(), vec![1.0, 5.0]);
    }

    #[test]
    fn test_complex_hermitian_product() {
        let i = Complex64::new(0.0, 1.0);
        let one = Complex64::new(1.0, 0.0);
        let h = Mat::from_fn(2, 2, |r, c| match (r, c) {
            (0, 0) => one,
            (0, 1) => -i,
            (1, 0) => i,
            _ => one,
        });
        let x = Mat::from_fn(2, 1, |r, _| if r == 0 { one } else { i });
        let mut acc = Mat::<Complex64>::zeros(2, 1);
        h.matrix_vector_product(acc.as_mut(), x.as_ref());
        // [[1, -i], [i, 1]] * (1, i) = (1 + 1, i + i)
        assert_eq!(acc[(0, 0)], Complex64::new(2.0, 0.0));
        assert_eq!(acc[(1, 0)], Complex64::new(0.0, 2.0));
    }
}
