//! Spectral functions from Lanczos coefficients.
//!
//! Starting the Lanczos recurrence from `|psi> = A|phi_0>` turns the tridiagonal
//! coefficients into the continued fraction
//!
//! ```text
//!                          1
//! f(w) = -------------------------------------
//!                              b_0^2
//!         w - a_0 - ---------------------------
//!                                 b_1^2
//!                    w - a_1 - ---------------
//!                                 w - a_2 - ...
//! ```
//!
//! which equals `<psi| (w - H)^-1 |psi>` (up to the norm of `psi`) restricted to
//! the Krylov subspace. Diagonalizing `T` gives the same function as a sum of
//! poles, `f(w) = sum_l I_l / (w - e_l)`, with intensities `I_l = U_{0l}^2`.
//!
//! [`ContinuedFraction`] attaches the ground-state energy `Eg`, a weight and a sign
//! to one coefficient chain and evaluates the Green's-function contribution
//!
//! ```text
//! I(z) = weight * sum_l I_l / (z - s (Eg - e_l))
//! ```
//!
//! where `s = -1` for the particle branch and `s = +1` for the hole branch.
//! [`TwoContinuedFraction`] adds both branches.

use crate::{
    algorithms::tridiagonal_eigen, error::LanczosError, tridiagonal::TridiagonalMatrix,
};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// The sign `s` in front of `(Eg - e_l)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    /// `s = +1`: `<phi_0| A^dagger (z - (Eg - e_l))^-1 A |phi_0>`.
    Positive,
    /// `s = -1`: `<phi_0| A (z + (Eg - e_l))^-1 A^dagger |phi_0>`.
    Negative,
}

impl Sign {
    pub fn factor(self) -> f64 {
        match self {
            Sign::Positive => 1.0,
            Sign::Negative => -1.0,
        }
    }

    pub fn from_factor(isign: i32) -> Self {
        if isign < 0 {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }
}

/// Whether spectra are sampled on the real axis or at Matsubara frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrequencyKind {
    #[default]
    Real,
    Matsubara,
}

/// Upper bound on the number of real-axis samples of one plot.
pub const MAX_PLOT_POINTS: usize = 10_000_000;

/// Sampling grid for [`ContinuedFraction::plot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotParams {
    pub omega1: f64,
    pub omega2: f64,
    pub delta_omega: f64,
    /// Broadening: real-axis points are evaluated at `omega + i delta`.
    pub delta: f64,
    /// Inverse temperature for Matsubara frequencies.
    pub beta: f64,
    pub number_of_matsubaras: usize,
}

impl PlotParams {
    pub fn real_axis(omega1: f64, omega2: f64, delta_omega: f64, delta: f64) -> Self {
        Self {
            omega1,
            omega2,
            delta_omega,
            delta,
            beta: 0.0,
            number_of_matsubaras: 0,
        }
    }

    /// Number of real-axis points, `floor((omega2 - omega1) / delta_omega)`,
    /// capped at [`MAX_PLOT_POINTS`].
    pub fn real_points(&self) -> usize {
        if self.delta_omega <= 0.0 || self.omega2 <= self.omega1 {
            return 0;
        }
        let count = (self.omega2 - self.omega1) / self.delta_omega;
        if count.is_nan() {
            return 0;
        }
        if count >= MAX_PLOT_POINTS as f64 {
            log::warn!(
                "frequency grid [{}, {}] with step {:e} is too fine, keeping the first {MAX_PLOT_POINTS} points",
                self.omega1,
                self.omega2,
                self.delta_omega
            );
            return MAX_PLOT_POINTS;
        }
        count as usize
    }

    /// The `index`-th fermionic Matsubara frequency, centered on zero.
    pub fn matsubara(&self, index: usize) -> f64 {
        let half = (self.number_of_matsubaras / 2) as i64;
        let factor = 2.0 * PI / self.beta;
        let shifted = index as i64 - half;
        if shifted >= 0 {
            factor * (shifted + 1) as f64
        } else {
            factor * shifted as f64
        }
    }
}

/// One sampled point of a spectrum: the abscissa and the complex value there.
pub type PlotPoint = (f64, Complex64);

/// A continued fraction with its pole decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuedFraction {
    ab: TridiagonalMatrix,
    energy: f64,
    weight: f64,
    sign: Sign,
    frequency: FrequencyKind,
    poles: Vec<f64>,
    intensities: Vec<f64>,
}

impl ContinuedFraction {
    /// Builds the fraction and diagonalizes its tridiagonal matrix.
    ///
    /// A zero weight marks an absent branch: nothing is diagonalized and
    /// [`Self::i_of_omega`] is identically zero.
    pub fn new(
        ab: TridiagonalMatrix,
        energy: f64,
        weight: f64,
        sign: Sign,
        frequency: FrequencyKind,
        max_iterations: usize,
    ) -> Result<Self, LanczosError> {
        let mut cf = Self {
            ab,
            energy,
            weight,
            sign,
            frequency,
            poles: Vec::new(),
            intensities: Vec::new(),
        };
        cf.diagonalize(max_iterations)?;
        Ok(cf)
    }

    /// The zero-weight fraction standing in for a missing branch.
    pub fn empty(frequency: FrequencyKind) -> Self {
        Self {
            ab: TridiagonalMatrix::new(),
            energy: 0.0,
            weight: 0.0,
            sign: Sign::Positive,
            frequency,
            poles: Vec::new(),
            intensities: Vec::new(),
        }
    }

    fn diagonalize(&mut self, max_iterations: usize) -> Result<(), LanczosError> {
        self.poles.clear();
        self.intensities.clear();
        if self.weight == 0.0 || self.ab.is_empty() {
            return Ok(());
        }
        let eigen = tridiagonal_eigen::diagonalize(
            self.ab.diagonal(),
            self.ab.off_diagonal(),
            true,
            max_iterations,
        )?;
        if let Some(z) = eigen.eigenvectors.as_ref() {
            self.intensities = (0..z.ncols()).map(|l| z[(0, l)] * z[(0, l)]).collect();
        }
        self.poles = eigen.eigenvalues;
        Ok(())
    }

    pub fn tridiagonal(&self) -> &TridiagonalMatrix {
        &self.ab
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn frequency(&self) -> FrequencyKind {
        self.frequency
    }

    /// Eigenvalues `e_l` of the tridiagonal matrix.
    pub fn poles(&self) -> &[f64] {
        &self.poles
    }

    /// Squared first components `U_{0l}^2` of the eigenvectors; they sum to one.
    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    /// Number of Lanczos levels in the chain.
    pub fn len(&self) -> usize {
        self.ab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ab.is_empty()
    }

    /// Evaluates the fraction at `z`, from the deepest level up.
    ///
    /// The last `b` lies outside the tridiagonal matrix and does not enter.
    pub fn evaluate(&self, z: Complex64) -> Complex64 {
        let mut g = Complex64::new(0.0, 0.0);
        for i in (0..self.ab.len()).rev() {
            let coupling = if i + 1 < self.ab.len() {
                self.ab.b(i) * self.ab.b(i)
            } else {
                0.0
            };
            g = (z - self.ab.a(i) - coupling * g).inv();
        }
        g
    }

    /// The weighted Green's-function contribution at `z`.
    pub fn i_of_omega(&self, z: Complex64) -> Complex64 {
        if self.weight == 0.0 {
            return Complex64::new(0.0, 0.0);
        }
        let s = self.sign.factor();
        let sum: Complex64 = self
            .poles
            .iter()
            .zip(&self.intensities)
            .map(|(&e, &intensity)| intensity / (z - s * (self.energy - e)))
            .sum();
        sum * self.weight
    }

    /// Samples [`Self::i_of_omega`] on the grid of `params`.
    pub fn plot(&self, params: &PlotParams) -> Vec<PlotPoint> {
        match self.frequency {
            FrequencyKind::Real => self.plot_real(params),
            FrequencyKind::Matsubara => self.plot_matsubara(params),
        }
    }

    fn plot_real(&self, params: &PlotParams) -> Vec<PlotPoint> {
        (0..params.real_points())
            .map(|k| {
                let omega = params.omega1 + k as f64 * params.delta_omega;
                (omega, self.i_of_omega(Complex64::new(omega, params.delta)))
            })
            .collect()
    }

    fn plot_matsubara(&self, params: &PlotParams) -> Vec<PlotPoint> {
        (0..params.number_of_matsubaras)
            .map(|n| {
                let omega_n = params.matsubara(n);
                (omega_n, self.i_of_omega(Complex64::new(0.0, omega_n)))
            })
            .collect()
    }
}

/// Particle and hole contributions combined into one spectral function.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoContinuedFraction {
    pub plus: ContinuedFraction,
    pub minus: ContinuedFraction,
}

impl TwoContinuedFraction {
    pub fn new(plus: ContinuedFraction, minus: ContinuedFraction) -> Self {
        if plus.frequency() != minus.frequency() && minus.weight() != 0.0 {
            log::warn!(
                "TwoContinuedFraction: branches use different frequency kinds ({:?} and {:?})",
                plus.frequency(),
                minus.frequency()
            );
        }
        Self { plus, minus }
    }

    /// A combination whose minus branch is absent.
    pub fn plus_only(plus: ContinuedFraction) -> Self {
        let minus = ContinuedFraction::empty(plus.frequency());
        Self { plus, minus }
    }

    pub fn i_of_omega(&self, z: Complex64) -> Complex64 {
        self.plus.i_of_omega(z) + self.minus.i_of_omega(z)
    }

    /// Pointwise sum of both branches, sampled on the plus branch's axis.
    pub fn plot(&self, params: &PlotParams) -> Vec<PlotPoint> {
        let mut points = self.plus.plot(params);
        let minus = self.minus.plot(params);
        for (point, (_, value)) in points.iter_mut().zip(minus) {
            point.1 += value;
        }
        points
    }
}
