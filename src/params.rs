//! Solver configuration.
//!
//! [`SolverParams`] gathers every knob the Lanczos and Davidson solvers read. It
//! deserializes with defaults for missing fields, so a partial configuration
//! (for example from a CSV header row or a command line) is enough.

use crate::{
    algorithms::lanczos::BasisStorage,
    error::{LanczosError, LanczosErrorKind},
};
use serde::{Deserialize, Serialize};

/// Parameters shared by the iterative eigensolvers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Maximum number of Lanczos steps (Davidson subspace size); capped at the operator rank.
    pub steps: usize,
    /// Lanczos: energy agreement between consecutive steps that counts as converged.
    /// Davidson: residual norm that counts as converged. Zero disables the Lanczos check.
    pub tolerance: f64,
    /// Iteration cap of the tridiagonal QL eigensolver.
    pub steps_for_energy_convergence: usize,
    /// Keep every Lanczos vector instead of replaying the recurrence.
    pub generous_memory: bool,
    /// Reorthogonalize each new Lanczos vector against all stored ones.
    pub reorthogonalize: bool,
    /// Allow an early exit when the initial vector is already an eigenvector.
    pub allows_zero: bool,
    /// Dump the dense operator and its spectrum instead of solving.
    pub debug: bool,
    /// Identifies the calling thread in log messages.
    pub thread_id: usize,
    /// Seed for random starting vectors.
    pub seed: u64,
    /// Upper bound on the bytes of a stored Lanczos basis.
    pub memory_limit_bytes: Option<usize>,
    /// Davidson: fraction of its squared norm a correction must keep after orthogonalization.
    pub davidson_acceptance_ratio: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            steps: 200,
            tolerance: 1e-12,
            steps_for_energy_convergence: 10_000,
            generous_memory: false,
            reorthogonalize: false,
            allows_zero: false,
            debug: false,
            thread_id: 0,
            seed: 343_311,
            memory_limit_bytes: None,
            davidson_acceptance_ratio: 0.25,
        }
    }
}

impl SolverParams {
    /// Applies a comma-separated option string.
    ///
    /// Recognized options: `lanczosdebug`, `lanczosAllowsZero`, `lanczosReortho`
    /// (implies `lanczosLotaMemory`) and `lanczosLotaMemory`.
    pub fn with_options(mut self, options: &str) -> Self {
        for option in options.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match option {
                "lanczosdebug" => self.debug = true,
                "lanczosAllowsZero" => self.allows_zero = true,
                "lanczosReortho" => {
                    self.reorthogonalize = true;
                    self.generous_memory = true;
                }
                "lanczosLotaMemory" => self.generous_memory = true,
                other => log::debug!("ignoring unrecognized solver option '{other}'"),
            }
        }
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_generous_memory(mut self, generous: bool) -> Self {
        self.generous_memory = generous;
        self
    }

    pub fn with_reorthogonalization(mut self, reorthogonalize: bool) -> Self {
        self.reorthogonalize = reorthogonalize;
        self
    }

    pub fn storage(&self) -> BasisStorage {
        if self.generous_memory {
            BasisStorage::Generous
        } else {
            BasisStorage::Lean
        }
    }

    /// Rejects parameter combinations the solvers cannot honor.
    pub fn validate(&self) -> Result<(), LanczosError> {
        if self.reorthogonalize && !self.generous_memory {
            return Err(LanczosErrorKind::UnsupportedConfiguration(
                "reorthogonalization needs the generous-memory basis".to_string(),
            )
            .into());
        }
        if !(self.tolerance >= 0.0) {
            return Err(LanczosErrorKind::InputError(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            ))
            .into());
        }
        if !(self.davidson_acceptance_ratio > 0.0 && self.davidson_acceptance_ratio < 1.0) {
            return Err(LanczosErrorKind::InputError(format!(
                "Davidson acceptance ratio must lie in (0, 1), got {}",
                self.davidson_acceptance_ratio
            ))
            .into());
        }
        if self.steps_for_energy_convergence == 0 {
            return Err(LanczosErrorKind::InputError(
                "the tridiagonal iteration cap must be positive".to_string(),
            )
            .into());
        }
        Ok(())
    }
}
