//! The Davidson eigensolver.
//!
//! Each iteration solves the eigenproblem of the operator projected onto the current
//! orthonormal subspace `V`, forms the Ritz pair `(theta, u = V s)` for the target
//! index and its residual `r = H u - theta u`, and expands `V` with the diagonally
//! preconditioned correction `t_i = r_i / (theta - H_ii)`. A correction is admitted
//! only if it survives orthogonalization against `V` with enough of its norm left
//! (see [`algorithm4_14`]).

use super::{
    EigenPair, EigenSolver, check_excited_index, dump_dense_spectrum, starting_vector, validated,
};
use crate::{
    algorithms::{dense, norm, normalized, subtract_scaled},
    error::{LanczosError, LanczosErrorKind},
    operator::HermitianOperator,
    params::SolverParams,
    scalar::Scalar,
};
use faer::{Accum, Mat, MatRef, Par, linalg::matmul::matmul};

const NAME: &str = "DavidsonSolver";

/// Residual norm used when the configured tolerance is zero.
const DEFAULT_RESIDUAL_TOLERANCE: f64 = 1e-10;

/// Preconditioner denominators below this magnitude are not inverted.
const PRECONDITIONER_GUARD: f64 = 1e-8;

/// Orthogonalizes `t` against the orthonormal columns of `basis` and decides whether
/// it adds a new direction.
///
/// One Gram-Schmidt pass is accepted if `t` keeps more than `ratio` of its squared
/// norm. Otherwise cancellation may have spoiled orthogonality, so a second pass is
/// made and `t` is accepted only if that pass again keeps more than `ratio` of what
/// was left. A rejected `t` lies (numerically) in the span of `basis`.
pub fn algorithm4_14<T: Scalar>(t: &mut Mat<T>, basis: MatRef<'_, T>, ratio: f64) -> bool {
    let tau_in = norm(t.as_ref()).powi(2);
    if tau_in == 0.0 {
        return false;
    }
    if basis.ncols() == 0 {
        return true;
    }

    let project_out = |t: &mut Mat<T>| {
        let overlaps = basis.adjoint() * t.as_ref();
        matmul(
            t.as_mut(),
            Accum::Add,
            basis,
            overlaps.as_ref(),
            T::from_real(-1.0),
            Par::Seq,
        );
        norm(t.as_ref()).powi(2)
    };

    let tau_first = project_out(t);
    if tau_first / tau_in > ratio {
        return true;
    }
    if tau_first == 0.0 {
        return false;
    }
    let tau_second = project_out(t);
    tau_second / tau_first > ratio
}

/// Why the last Davidson run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DavidsonStop {
    Converged,
    SubspaceFull,
    NoNewDirection,
}

/// Davidson solver with a diagonal (Jacobi) preconditioner.
pub struct DavidsonSolver<'a, T: Scalar, O: HermitianOperator<T> + ?Sized> {
    operator: &'a O,
    params: SolverParams,
    diagonal: Vec<T>,
    iterations: usize,
    residual_norm: f64,
    stop: Option<DavidsonStop>,
}

impl<'a, T: Scalar, O: HermitianOperator<T> + ?Sized> DavidsonSolver<'a, T, O> {
    pub fn new(operator: &'a O, params: SolverParams) -> Result<Self, LanczosError> {
        let params = validated(NAME, operator.rank(), params)?;
        Ok(Self {
            operator,
            params,
            diagonal: operator.diagonal(),
            iterations: 0,
            residual_norm: f64::INFINITY,
            stop: None,
        })
    }

    /// Subspace size reached by the last run.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Residual norm `||H u - theta u||` of the last Ritz pair.
    pub fn residual_norm(&self) -> f64 {
        self.residual_norm
    }

    pub fn last_stop(&self) -> Option<DavidsonStop> {
        self.stop
    }

    fn tolerance(&self) -> f64 {
        if self.params.tolerance > 0.0 {
            self.params.tolerance
        } else {
            DEFAULT_RESIDUAL_TOLERANCE
        }
    }

    fn precondition(&self, theta: f64, residual: &Mat<T>) -> Mat<T> {
        Mat::from_fn(residual.nrows(), 1, |i, _| {
            let denominator = theta - self.diagonal[i].real_part();
            if denominator.abs() < PRECONDITIONER_GUARD {
                residual[(i, 0)]
            } else {
                residual[(i, 0)].scaled(1.0 / denominator)
            }
        })
    }

    /// A unit vector outside the span of `basis`, trying first the coordinates with
    /// the largest preconditioned weight `1 / |theta - H_ii|`.
    fn fresh_direction(&self, theta: f64, basis: MatRef<'_, T>, ratio: f64) -> Option<Mat<T>> {
        let n = self.diagonal.len();
        let distance = |i: usize| (theta - self.diagonal[i].real_part()).abs();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| distance(i).total_cmp(&distance(j)));
        order.into_iter().find_map(|i| {
            let mut unit = Mat::<T>::zeros(n, 1);
            unit[(i, 0)] = T::from_real(1.0);
            algorithm4_14(&mut unit, basis, ratio).then_some(unit)
        })
    }

    fn solve(&mut self, mut t: Mat<T>, target: usize) -> Result<EigenPair<T>, LanczosError> {
        let rank = self.operator.rank();
        let thread_id = self.params.thread_id;
        let max_subspace = self.params.steps.min(rank).max(target + 1);
        let ratio = self.params.davidson_acceptance_ratio;
        let tolerance = self.tolerance();

        // `basis` holds the orthonormal `V` with `m` columns, `images` holds `H V`.
        let mut basis = Mat::<T>::zeros(rank, 0);
        let mut images = Mat::<T>::zeros(rank, 0);
        let mut m = 0;
        let mut best: Option<EigenPair<T>> = None;
        let mut residual = Mat::<T>::zeros(rank, 1);
        let mut stop = DavidsonStop::SubspaceFull;

        while m < max_subspace {
            let mut accepted = algorithm4_14(&mut t, basis.as_ref(), ratio);
            if !accepted && m > 0 {
                log::debug!("{NAME}[{thread_id}]: correction discarded, trying the raw residual");
                t = residual.clone();
                accepted = algorithm4_14(&mut t, basis.as_ref(), ratio);
            }
            if !accepted && m <= target {
                // The subspace is invariant but too small to hold the requested state.
                let theta = best.as_ref().map_or(0.0, |pair| pair.energy);
                if let Some(unit) = self.fresh_direction(theta, basis.as_ref(), ratio) {
                    log::debug!(
                        "{NAME}[{thread_id}]: subspace {m} is invariant, expanding with a unit vector"
                    );
                    t = unit;
                    accepted = true;
                }
            }
            let next = if accepted { normalized(t.as_ref()) } else { None };
            let Some(v) = next else {
                stop = DavidsonStop::NoNewDirection;
                break;
            };

            basis.resize_with(rank, m + 1, |_, _| T::from_real(0.0));
            images.resize_with(rank, m + 1, |_, _| T::from_real(0.0));
            basis.col_mut(m).copy_from(v.col(0));
            self.operator
                .matrix_vector_product(images.get_mut(.., m..m + 1), v.as_ref());
            m += 1;

            let projected = basis.adjoint() * &images;
            let eigen = dense::hermitian_eigen(&projected)?;
            let k = target.min(m - 1);
            let theta = eigen.eigenvalues[k];

            let s = eigen.eigenvectors.get(.., k..k + 1);
            let u = &basis * s;
            residual = &images * s;
            subtract_scaled(&mut residual, T::from_real(theta), u.as_ref());
            self.residual_norm = norm(residual.as_ref());
            log::debug!(
                "{NAME}[{thread_id}]: subspace {m} theta={theta} residual={:e}",
                self.residual_norm
            );
            best = Some(EigenPair {
                energy: theta,
                vector: u,
            });

            if m > target && self.residual_norm < tolerance {
                stop = DavidsonStop::Converged;
                break;
            }
            t = self.precondition(theta, &residual);
        }

        self.iterations = m;
        self.stop = Some(stop);
        log::info!(
            "{NAME}[{thread_id}]: stopped ({stop:?}) for mat.rank={rank} with subspace {} and residual {:e}",
            self.iterations,
            self.residual_norm
        );
        if stop != DavidsonStop::Converged && self.residual_norm >= tolerance {
            log::warn!(
                "{NAME}[{thread_id}]: residual {:e} above tolerance {tolerance:e}. Increasing the number of steps is recommended.",
                self.residual_norm
            );
        }

        if self.iterations <= target {
            return Err(LanczosErrorKind::ExcitedIndexOutOfRange {
                index: target,
                rank: self.iterations,
            }
            .into());
        }
        best.ok_or_else(|| {
            LanczosErrorKind::InputError(
                "the starting vector has no component to expand".to_string(),
            )
            .into()
        })
    }
}

impl<T: Scalar, O: HermitianOperator<T> + ?Sized> EigenSolver<T> for DavidsonSolver<'_, T, O> {
    fn compute_ground_state(
        &mut self,
        initial: Option<MatRef<'_, T>>,
    ) -> Result<EigenPair<T>, LanczosError> {
        self.compute_excited_state(initial, 0)
    }

    fn compute_excited_state(
        &mut self,
        initial: Option<MatRef<'_, T>>,
        excited: usize,
    ) -> Result<EigenPair<T>, LanczosError> {
        let rank = self.operator.rank();
        check_excited_index(rank, excited)?;
        let (y, _) = starting_vector(rank, initial, self.params.seed)?;
        if self.params.debug {
            return dump_dense_spectrum(NAME, self.operator, excited, self.params.thread_id);
        }
        let pair = self.solve(y, excited)?;
        log::info!(
            "{NAME}[{}]: Found eigenvalue {excited}= {:.8} after {} iterations",
            self.params.thread_id,
            pair.energy,
            self.iterations
        );
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::mat;

    #[test]
    fn test_acceptance_keeps_independent_direction() {
        let basis: Mat<f64> = mat![[1.0], [0.0], [0.0]];
        let mut t: Mat<f64> = mat![[1.0], [1.0], [0.0]];
        assert!(algorithm4_14(&mut t, basis.as_ref(), 0.25));
        assert_eq!(t[(0, 0)], 0.0);
        assert_eq!(t[(1, 0)], 1.0);
    }

    #[test]
    fn test_acceptance_rejects_dependent_direction() {
        let basis = Mat::<f64>::identity(2, 2);
        let mut t: Mat<f64> = mat![[0.3], [-2.0]];
        assert!(!algorithm4_14(&mut t, basis.as_ref(), 0.25));
        let mut zero = Mat::<f64>::zeros(2, 1);
        let empty = Mat::<f64>::zeros(2, 0);
        assert!(!algorithm4_14(&mut zero, empty.as_ref(), 0.25));
    }

    #[test]
    fn test_small_component_needs_second_pass() {
        // 1% of the squared norm survives the first pass: below the ratio, but the
        // second pass keeps all of it.
        let basis: Mat<f64> = mat![[1.0], [0.0]];
        let mut t: Mat<f64> = mat![[1.0], [0.1]];
        assert!(algorithm4_14(&mut t, basis.as_ref(), 0.25));
    }

    #[test]
    fn test_davidson_two_by_two() {
        let h: Mat<f64> = mat![[2.0, 1.0], [1.0, 2.0]];
        let start: Mat<f64> = mat![[1.0], [0.0]];
        let mut solver = DavidsonSolver::new(&h, SolverParams::default()).unwrap();
        let ground = solver.compute_ground_state(Some(start.as_ref())).unwrap();
        assert!((ground.energy - 1.0).abs() < 1e-12);
        assert!((ground.vector[(0, 0)] + ground.vector[(1, 0)]).abs() < 1e-12);

        let excited = solver
            .compute_excited_state(Some(start.as_ref()), 1)
            .unwrap();
        assert!((excited.energy - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_davidson_diagonal_operator_is_exact_after_one_step() {
        let h = Mat::<f64>::from_fn(4, 4, |i, j| if i == j { (i + 1) as f64 } else { 0.0 });
        let start: Mat<f64> = mat![[1.0], [0.0], [0.0], [0.0]];
        let mut solver = DavidsonSolver::new(&h, SolverParams::default()).unwrap();
        let pair = solver.compute_ground_state(Some(start.as_ref())).unwrap();
        assert!((pair.energy - 1.0).abs() < 1e-14);
        assert_eq!(solver.iterations(), 1);
        assert_eq!(solver.last_stop(), Some(DavidsonStop::Converged));
    }

    #[test]
    fn test_excited_state_from_eigenvector_start_expands_subspace() {
        let h = Mat::<f64>::from_fn(4, 4, |i, j| if i == j { (i + 1) as f64 } else { 0.0 });
        let start: Mat<f64> = mat![[1.0], [0.0], [0.0], [0.0]];
        let mut solver = DavidsonSolver::new(&h, SolverParams::default()).unwrap();
        let pair = solver
            .compute_excited_state(Some(start.as_ref()), 1)
            .unwrap();
        assert!((pair.energy - 2.0).abs() < 1e-12);
        assert!((pair.vector[(1, 0)].abs() - 1.0).abs() < 1e-12);
        assert_eq!(solver.iterations(), 2);
        assert_eq!(solver.last_stop(), Some(DavidsonStop::Converged));

        let third = solver
            .compute_excited_state(Some(start.as_ref()), 3)
            .unwrap();
        assert!((third.energy - 4.0).abs() < 1e-12);
    }
}
