//! Dense Hermitian eigenproblems for small matrices.
//!
//! Used for the projected matrices of the Davidson iteration and for the dense
//! reference spectrum printed in debug mode. The decomposition itself is delegated
//! to `faer`'s self-adjoint EVD, which handles real symmetric and complex Hermitian
//! matrices alike.

use crate::{
    error::{LanczosError, LanczosErrorKind},
    scalar::Scalar,
};
use faer::{Mat, Side};

/// Eigenvalues in ascending order with matching eigenvector columns.
#[derive(Debug, Clone)]
pub struct DenseEigen<T: Scalar> {
    pub eigenvalues: Vec<f64>,
    pub eigenvectors: Mat<T>,
}

impl<T: Scalar> DenseEigen<T> {
    pub fn eigenvector(&self, k: usize) -> Mat<T> {
        let n = self.eigenvectors.nrows();
        Mat::from_fn(n, 1, |i, _| self.eigenvectors[(i, k)])
    }
}

/// Checks `M[i, j] == conj(M[j, i])` up to a tolerance relative to the largest entry.
pub fn check_hermitian<T: Scalar>(m: &Mat<T>) -> Result<(), LanczosError> {
    let n = m.nrows();
    let mut scale = 0.0f64;
    for j in 0..n {
        for i in 0..n {
            scale = scale.max(m[(i, j)].abs_sq().sqrt());
        }
    }
    let tolerance = 1e-12 * scale.max(1.0);
    for j in 0..n {
        for i in j..n {
            let diff = m[(i, j)] - m[(j, i)].conjugate();
            if diff.abs_sq().sqrt() > tolerance {
                return Err(LanczosErrorKind::NotHermitian { row: i, col: j }.into());
            }
        }
    }
    Ok(())
}

/// Full eigendecomposition of a Hermitian matrix.
pub fn hermitian_eigen<T: Scalar>(m: &Mat<T>) -> Result<DenseEigen<T>, LanczosError> {
    let n = m.nrows();
    let evd = m
        .as_ref()
        .self_adjoint_eigen(Side::Lower)
        .map_err(LanczosErrorKind::EvdError)?;
    let s = evd.S();
    let u = evd.U();

    // The eigenvalues of a Hermitian matrix are real; faer stores them as `T`.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| s[i].real_part().total_cmp(&s[j].real_part()));
    Ok(DenseEigen {
        eigenvalues: order.iter().map(|&k| s[k].real_part()).collect(),
        eigenvectors: Mat::from_fn(n, n, |i, k| u[(i, order[k])]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;
    use num_complex::Complex64;

    #[test]
    fn test_real_symmetric_two_by_two() {
        let m: Mat<f64> = mat![[2.0, 1.0], [1.0, 2.0]];
        let eigen = hermitian_eigen(&m).unwrap();
        assert!((eigen.eigenvalues[0] - 1.0).abs() < 1e-12);
        assert!((eigen.eigenvalues[1] - 3.0).abs() < 1e-12);
        let v = eigen.eigenvector(0);
        assert!((v[(0, 0)] + v[(1, 0)]).abs() < 1e-12);
    }

    #[test]
    fn test_complex_hermitian_two_by_two() {
        // [[1, -i], [i, 1]] has eigenvalues 0 and 2.
        let i = Complex64::new(0.0, 1.0);
        let one = Complex64::new(1.0, 0.0);
        let m = Mat::from_fn(2, 2, |r, c| match (r, c) {
            (0, 1) => -i,
            (1, 0) => i,
            _ => one,
        });
        let eigen = hermitian_eigen(&m).unwrap();
        assert!(eigen.eigenvalues[0].abs() < 1e-12);
        assert!((eigen.eigenvalues[1] - 2.0).abs() < 1e-12);

        // M v = 0 for the lowest eigenvector.
        let v = eigen.eigenvector(0);
        let mv0 = m[(0, 0)] * v[(0, 0)] + m[(0, 1)] * v[(1, 0)];
        let mv1 = m[(1, 0)] * v[(0, 0)] + m[(1, 1)] * v[(1, 0)];
        assert!(mv0.norm() < 1e-12 && mv1.norm() < 1e-12);
    }

    #[test]
    fn test_degenerate_complex_eigenvectors_are_orthonormal() {
        let m = Mat::<Complex64>::identity(2, 2);
        let eigen = hermitian_eigen(&m).unwrap();
        assert!((eigen.eigenvalues[0] - 1.0).abs() < 1e-12);
        assert!((eigen.eigenvalues[1] - 1.0).abs() < 1e-12);

        let v = &eigen.eigenvectors;
        let gram = v.adjoint() * v;
        let identity = Mat::<Complex64>::identity(2, 2);
        assert!((&gram - &identity).norm_max() < 1e-12);
    }

    #[test]
    fn test_non_hermitian_detected() {
        let m: Mat<f64> = mat![[1.0, 2.0], [3.0, 1.0]];
        let err = check_hermitian(&m).unwrap_err();
        assert_eq!(*err.kind(), LanczosErrorKind::NotHermitian { row: 1, col: 0 });
    }
}
