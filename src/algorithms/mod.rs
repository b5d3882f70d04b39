//! Low-level building blocks of the eigensolvers.
//!
//! ** NOTE: We recommend using the high-level solvers in [`crate::solvers`] instead.
//! These modules are public for use cases that need fine-grained control, such as
//! inspecting the stored Lanczos basis or diagonalizing a tridiagonal matrix directly.
//!
//! - [`lanczos`]: the Lanczos basis store and the three-term recurrence step.
//! - [`tridiagonal_eigen`]: implicit-shift QL diagonalization of a symmetric tridiagonal matrix.
//! - [`dense`]: dense Hermitian eigenproblems for small projected matrices.

pub mod dense;
pub mod lanczos;
pub mod tridiagonal_eigen;

use crate::scalar::Scalar;
use faer::{Mat, MatRef, Scale};

/// Residual norms below this value mean the Krylov subspace is invariant.
pub const BREAKDOWN_TOLERANCE: f64 = 1e-10;

/// The scalar output of one Lanczos step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanczosStep {
    /// Diagonal coefficient `a_j = Re <v_j | H v_j>`.
    pub a: f64,
    /// Residual norm `b_j`, the coupling to the next basis vector.
    pub b: f64,
    /// Set when `b_j` is numerically zero: the recurrence cannot continue.
    pub exhausted: bool,
}

/// Inner product `<x | y> = x^H y` of two column vectors.
pub fn dot<T: Scalar>(x: MatRef<'_, T>, y: MatRef<'_, T>) -> T {
    (x.adjoint() * y)[(0, 0)]
}

/// Euclidean norm of a column vector.
#[inline]
pub fn norm<T: Scalar>(x: MatRef<'_, T>) -> f64 {
    x.norm_l2()
}

/// `y <- y - alpha * x`.
pub(crate) fn subtract_scaled<T: Scalar>(y: &mut Mat<T>, alpha: T, x: MatRef<'_, T>) {
    *y -= x * Scale(alpha);
}

/// Scales a column vector in place by a real factor.
pub(crate) fn scale_in_place<T: Scalar>(x: &mut Mat<T>, factor: f64) {
    *x *= Scale(T::from_real(factor));
}

/// Returns `x / ||x||`, or `None` for a zero or non-finite vector.
pub(crate) fn normalized<T: Scalar>(x: MatRef<'_, T>) -> Option<Mat<T>> {
    let nrm = norm(x);
    if nrm == 0.0 || !nrm.is_finite() {
        return None;
    }
    Some(x * Scale(T::from_real(1.0 / nrm)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;
    use num_complex::Complex64;

    #[test]
    fn test_dot_conjugates_left_argument() {
        let i = Complex64::new(0.0, 1.0);
        let x = Mat::from_fn(2, 1, |r, _| if r == 0 { i } else { Complex64::new(1.0, 0.0) });
        let value = dot(x.as_ref(), x.as_ref());
        assert_eq!(value, Complex64::new(2.0, 0.0));
    }

    #[test]
    fn test_normalized_rejects_zero_vector() {
        let zero = Mat::<f64>::zeros(3, 1);
        assert!(normalized(zero.as_ref()).is_none());

        let v: Mat<f64> = mat![[3.0], [4.0]];
        let u = normalized(v.as_ref()).unwrap();
        assert!((norm(u.as_ref()) - 1.0).abs() < 1e-15);
        assert!((u[(0, 0)] - 0.6).abs() < 1e-15);
    }

    #[test]
    fn test_subtract_scaled_complex_axpy() {
        let i = Complex64::new(0.0, 1.0);
        let one = Complex64::new(1.0, 0.0);
        let mut y = Mat::from_fn(2, 1, |_, _| one);
        let x = Mat::from_fn(2, 1, |r, _| if r == 0 { one } else { i });
        subtract_scaled(&mut y, i, x.as_ref());
        // (1, 1) - i (1, i) = (1 - i, 2)
        assert_eq!(y[(0, 0)], Complex64::new(1.0, -1.0));
        assert_eq!(y[(1, 0)], Complex64::new(2.0, 0.0));
        assert!((norm(y.as_ref()) - 6.0f64.sqrt()).abs() < 1e-15);

        scale_in_place(&mut y, 0.5);
        assert_eq!(y[(1, 0)], Complex64::new(1.0, 0.0));
    }
}
