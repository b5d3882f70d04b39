//! Scalar types accepted by the solvers.
//!
//! The Lanczos recurrence only needs a handful of operations on the vector
//! entries: conjugation, the real part of an inner product, and scaling by the
//! real tridiagonal coefficients. [`Scalar`] collects exactly those on top of
//! [`faer::traits::ComplexField`], so the same code path serves real-symmetric
//! (`f64`) and Hermitian ([`num_complex::Complex64`]) operators.

use faer::traits::ComplexField;
use num_complex::Complex64;
use std::fmt::Debug;
use std::ops::{Add, Mul, Neg, Sub};

/// Entry type of operators and vectors handled by the eigensolvers.
pub trait Scalar:
    ComplexField<Real = f64>
    + Copy
    + Debug
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
{
    /// `true` when the imaginary part carries information.
    const IS_COMPLEX: bool;

    fn from_real(re: f64) -> Self;

    /// Builds a value from real and imaginary parts. Real scalars drop `im`.
    fn from_parts(re: f64, im: f64) -> Self;

    fn real_part(self) -> f64;

    fn imag_part(self) -> f64;

    fn conjugate(self) -> Self;

    /// Multiplies by a real factor.
    fn scaled(self, factor: f64) -> Self;

    /// Squared modulus.
    #[inline]
    fn abs_sq(self) -> f64 {
        let re = self.real_part();
        let im = self.imag_part();
        re * re + im * im
    }
}

impl Scalar for f64 {
    const IS_COMPLEX: bool = false;

    #[inline]
    fn from_real(re: f64) -> Self {
        re
    }

    #[inline]
    fn from_parts(re: f64, _im: f64) -> Self {
        re
    }

    #[inline]
    fn real_part(self) -> f64 {
        self
    }

    #[inline]
    fn imag_part(self) -> f64 {
        0.0
    }

    #[inline]
    fn conjugate(self) -> Self {
        self
    }

    #[inline]
    fn scaled(self, factor: f64) -> Self {
        self * factor
    }

    #[inline]
    fn abs_sq(self) -> f64 {
        self * self
    }
}

impl Scalar for Complex64 {
    const IS_COMPLEX: bool = true;

    #[inline]
    fn from_real(re: f64) -> Self {
        Complex64::new(re, 0.0)
    }

    #[inline]
    fn from_parts(re: f64, im: f64) -> Self {
        Complex64::new(re, im)
    }

    #[inline]
    fn real_part(self) -> f64 {
        self.re
    }

    #[inline]
    fn imag_part(self) -> f64 {
        self.im
    }

    #[inline]
    fn conjugate(self) -> Self {
        Complex64::new(self.re, -self.im)
    }

    #[inline]
    fn scaled(self, factor: f64) -> Self {
        Complex64::new(self.re * factor, self.im * factor)
    }
}
