//! The Lanczos eigensolver.
//!
//! A decomposition grows the Krylov basis one step at a time. After every step the
//! lowest eigenvalue of the leading tridiagonal block is recomputed and compared with
//! the previous estimate; once two consecutive estimates agree within the tolerance
//! (and at least five steps were taken, unless the operator itself is tiny) the
//! recurrence stops. Running out of the step budget is not an error: the result is
//! still usable, a warning recommends a larger budget.

use super::{
    EigenPair, EigenSolver, check_excited_index, dump_dense_spectrum, starting_vector, validated,
};
use crate::{
    algorithms::{lanczos::LanczosVectors, norm, tridiagonal_eigen},
    error::{LanczosError, LanczosErrorKind},
    operator::HermitianOperator,
    params::SolverParams,
    scalar::Scalar,
    tridiagonal::TridiagonalMatrix,
};
use faer::{Mat, MatRef};

const NAME: &str = "LanczosSolver";

/// Below this norm a reconstructed eigenvector means the Krylov subspace collapsed.
const MIN_EIGENVECTOR_NORM: f64 = 1e-6;

/// Why the last decomposition stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Consecutive ground-energy estimates agreed within the tolerance.
    Converged,
    /// The residual vanished: the Krylov subspace is invariant.
    InvariantSubspace,
    /// Every allowed step was used without meeting the tolerance.
    StepBudget,
    /// The initial vector was already an eigenvector.
    ImmediateEigenvector,
}

/// Lanczos solver for the extremal eigenpairs of a Hermitian operator.
pub struct LanczosSolver<'a, T: Scalar, O: HermitianOperator<T> + ?Sized> {
    operator: &'a O,
    params: SolverParams,
    vectors: LanczosVectors<'a, T, O>,
    ab: TridiagonalMatrix,
    termination: Option<Termination>,
    last_eps: Option<f64>,
}

impl<'a, T: Scalar, O: HermitianOperator<T> + ?Sized> LanczosSolver<'a, T, O> {
    pub fn new(operator: &'a O, params: SolverParams) -> Result<Self, LanczosError> {
        let params = validated(NAME, operator.rank(), params)?;
        let vectors = LanczosVectors::new(operator, params.storage(), params.reorthogonalize)
            .with_memory_limit(params.memory_limit_bytes);
        Ok(Self {
            operator,
            params,
            vectors,
            ab: TridiagonalMatrix::new(),
            termination: None,
            last_eps: None,
        })
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    /// The tridiagonal matrix of the last decomposition.
    pub fn tridiagonal(&self) -> &TridiagonalMatrix {
        &self.ab
    }

    /// The basis store of the last decomposition.
    pub fn lanczos_vectors(&self) -> &LanczosVectors<'a, T, O> {
        &self.vectors
    }

    pub fn last_termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Number of Lanczos steps kept by the last decomposition.
    pub fn steps_used(&self) -> usize {
        self.ab.len()
    }

    /// Runs the Lanczos recurrence from `initial` (or a seeded random vector).
    ///
    /// The resulting coefficients are available through [`Self::tridiagonal`]; they
    /// are also the input of the continued-fraction evaluator.
    pub fn decomposition(
        &mut self,
        initial: Option<MatRef<'_, T>>,
    ) -> Result<&TridiagonalMatrix, LanczosError> {
        let rank = self.operator.rank();
        let (mut y, _) = starting_vector(rank, initial, self.params.seed)?;
        self.decompose_normalized(&mut y)?;
        Ok(&self.ab)
    }

    fn decompose_normalized(&mut self, y: &mut Mat<T>) -> Result<(), LanczosError> {
        let rank = self.operator.rank();
        let thread_id = self.params.thread_id;
        let max_steps = self.params.steps.min(rank);
        if max_steps == 0 {
            return Err(LanczosErrorKind::InputError(
                "the step budget must be positive".to_string(),
            )
            .into());
        }

        self.vectors.resize(rank, max_steps)?;
        self.ab = TridiagonalMatrix::with_capacity(max_steps);
        self.termination = None;
        self.last_eps = None;

        if self.params.allows_zero && self.vectors.is_hy_zero(y.as_ref(), &mut self.ab) {
            log::info!("{NAME}[{thread_id}]: initial vector is an eigenvector, done after 1 step");
            self.termination = Some(Termination::ImmediateEigenvector);
            return Ok(());
        }

        self.vectors.save_initial_vector(y.as_ref());
        let mut x = Mat::<T>::zeros(rank, 1);
        let eps = self.params.tolerance;
        let cap = self.params.steps_for_energy_convergence;
        let mut eold = 100.0;
        let mut enew = 0.0;
        let mut exit_flag = false;
        let mut termination = Termination::StepBudget;

        for j in 0..max_steps {
            self.vectors.set_vector(j, y.as_ref());
            let step = self.vectors.one_step_decomposition(&mut x, y);
            self.ab.push(step.a, step.b);

            if eps > 0.0 {
                let (a, b) = self.ab.leading(j + 1);
                let (energy, _) = tridiagonal_eigen::ground(a, b, false, cap)?;
                enew = energy;
                log::debug!("{NAME}[{thread_id}]: step {j} a={} b={} e={enew}", step.a, step.b);
                if (enew - eold).abs() < eps {
                    exit_flag = true;
                }
                if exit_flag && (rank <= 4 || j >= 4) {
                    termination = Termination::Converged;
                    break;
                }
            }
            if step.exhausted {
                termination = Termination::InvariantSubspace;
                break;
            }
            eold = enew;
        }

        let used = self.ab.len();
        self.vectors.truncate(used);
        self.termination = Some(termination);
        if eps > 0.0 {
            self.last_eps = Some((enew - eold).abs());
        }

        match self.last_eps {
            Some(actual) => log::info!(
                "{NAME}[{thread_id}]: Decomposition done for mat.rank={rank} after {used} steps, actual eps={actual:e}"
            ),
            None => log::info!(
                "{NAME}[{thread_id}]: Decomposition done for mat.rank={rank} after {used} steps"
            ),
        }
        if termination == Termination::StepBudget && used != rank {
            log::warn!(
                "{NAME}[{thread_id}]: Maximum number of steps used. Increasing this maximum is recommended."
            );
        }
        Ok(())
    }

    fn found(&self, energy: f64, original_norm: f64, excited: usize) {
        let thread_id = self.params.thread_id;
        if !(1e-5..=100.0).contains(&original_norm) {
            log::warn!("{NAME}[{thread_id}]: initial vector norm={original_norm}");
        }
        let what = if excited > 0 {
            format!("{excited} excited")
        } else {
            "lowest".to_string()
        };
        log::info!(
            "{NAME}[{thread_id}]: Found {what} eigenvalue= {energy:.8} after {} iterations, orig. norm={original_norm}",
            self.ab.len()
        );
    }

    fn reconstruct(&self, coefficients: &[f64]) -> Result<Mat<T>, LanczosError> {
        let z = self.vectors.hook_for_z(coefficients)?;
        let z_norm = norm(z.as_ref());
        if z_norm < MIN_EIGENVECTOR_NORM {
            return Err(LanczosErrorKind::ZeroNorm {
                rank: self.operator.rank(),
                steps: self.ab.len(),
                norm: z_norm,
            }
            .into());
        }
        Ok(z)
    }
}

impl<T: Scalar, O: HermitianOperator<T> + ?Sized> EigenSolver<T> for LanczosSolver<'_, T, O> {
    fn compute_ground_state(
        &mut self,
        initial: Option<MatRef<'_, T>>,
    ) -> Result<EigenPair<T>, LanczosError> {
        let rank = self.operator.rank();
        let (mut y, original_norm) = starting_vector(rank, initial, self.params.seed)?;
        if self.params.debug {
            return dump_dense_spectrum(NAME, self.operator, 0, self.params.thread_id);
        }

        self.decompose_normalized(&mut y)?;
        let (energy, coefficients) = tridiagonal_eigen::ground(
            self.ab.diagonal(),
            self.ab.off_diagonal(),
            true,
            self.params.steps_for_energy_convergence,
        )
        .inspect_err(|_| log::error!("{NAME}[{}]: MatrixRank={rank}", self.params.thread_id))?;
        let coefficients = coefficients.ok_or(LanczosErrorKind::InsufficientHistory {
            requested: self.ab.len(),
            available: 0,
        })?;

        let vector = self.reconstruct(&coefficients)?;
        self.found(energy, original_norm, 0);
        Ok(EigenPair { energy, vector })
    }

    fn compute_excited_state(
        &mut self,
        initial: Option<MatRef<'_, T>>,
        excited: usize,
    ) -> Result<EigenPair<T>, LanczosError> {
        let rank = self.operator.rank();
        check_excited_index(rank, excited)?;
        if excited == 0 {
            return self.compute_ground_state(initial);
        }

        let (mut y, original_norm) = starting_vector(rank, initial, self.params.seed)?;
        if self.params.debug {
            return dump_dense_spectrum(NAME, self.operator, excited, self.params.thread_id);
        }

        self.decompose_normalized(&mut y)?;
        let (energy, coefficients) = self
            .ab
            .excited(excited, self.params.steps_for_energy_convergence)?;
        let vector = self.reconstruct(&coefficients)?;
        self.found(energy, original_norm, excited);
        log::warn!(
            "{NAME}[{}]: EXPERIMENTAL feature excited > 0 is in use",
            self.params.thread_id
        );
        Ok(EigenPair { energy, vector })
    }
}
