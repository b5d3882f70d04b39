//! Ground-state runner.
//!
//! Loads a sparse symmetric operator from a triplet file (or generates a random one),
//! computes the requested eigenpair with the Lanczos or Davidson solver, and prints
//! the energy. The Lanczos coefficients can be saved either bare or as a continued
//! fraction anchored at the computed energy, the format read by `combine_cf`.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use faer::sparse::SparseColMat;
use lanczos_eigensolver::{
    ContinuedFraction, DavidsonSolver, EigenPair, EigenSolver, LanczosSolver, SolverParams,
    continued_fraction::{FrequencyKind, Sign},
    utils::{
        data_loader::{load_sparse_operator, save_continued_fraction, save_tridiagonal},
        perf::timed,
        problems::random_sparse_symmetric,
    },
};
use std::path::PathBuf;

/// Sign of the continued-fraction branch written with `--cf-out`.
#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
enum BranchSign {
    Positive,
    Negative,
}

impl From<BranchSign> for Sign {
    fn from(sign: BranchSign) -> Self {
        match sign {
            BranchSign::Positive => Sign::Positive,
            BranchSign::Negative => Sign::Negative,
        }
    }
}

/// Which iterative method computes the eigenpair.
#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
enum SolverKind {
    Lanczos,
    Davidson,
}

#[derive(Parser, Debug)]
#[clap(
    name = "ground-state",
    about = "Computes the lowest (or an excited) eigenpair of a sparse Hermitian operator."
)]
struct GroundStateArgs {
    /// Triplet file: first data line is the rank, then `row col value` per entry.
    #[clap(long, value_name = "PATH", conflicts_with = "size")]
    input: Option<PathBuf>,

    /// Mirror off-diagonal entries of the input file (file lists one triangle).
    #[clap(long)]
    mirror: bool,

    /// Rank of a randomly generated operator, used when no input file is given.
    #[clap(long, default_value_t = 500)]
    size: usize,

    /// Off-diagonal couplings per row of the random operator.
    #[clap(long, default_value_t = 6)]
    couplings: usize,

    #[clap(long, value_enum, default_value_t = SolverKind::Lanczos)]
    solver: SolverKind,

    #[clap(long, default_value_t = 200)]
    steps: usize,

    #[clap(long, default_value_t = 1e-12)]
    tolerance: f64,

    #[clap(long, default_value_t = 343_311)]
    seed: u64,

    /// Comma-separated solver options, e.g. `lanczosReortho,lanczosAllowsZero`.
    #[clap(long, default_value = "")]
    options: String,

    /// Index of the eigenpair to compute; 0 is the ground state.
    #[clap(long, default_value_t = 0)]
    excited: usize,

    /// Where to save the Lanczos coefficients (`.bin` for binary, CSV otherwise).
    #[clap(long, value_name = "PATH")]
    tridiagonal_out: Option<PathBuf>,

    /// Where to save the coefficients as a continued fraction with the computed
    /// energy as `Eg`, readable by `combine_cf`.
    #[clap(long, value_name = "PATH")]
    cf_out: Option<PathBuf>,

    /// Weight of the continued fraction written with `--cf-out`.
    #[clap(long, default_value_t = 1.0)]
    cf_weight: f64,

    #[clap(long, value_enum, default_value_t = BranchSign::Positive)]
    cf_sign: BranchSign,

    /// Tag the continued fraction for Matsubara sampling instead of the real axis.
    #[clap(long)]
    cf_matsubara: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;
    let args = GroundStateArgs::parse();

    let operator: SparseColMat<usize, f64> = match &args.input {
        Some(path) => load_sparse_operator(path, args.mirror)
            .with_context(|| format!("Failed to load operator from {path:?}"))?,
        None => random_sparse_symmetric(args.size, args.couplings, args.seed)?,
    };
    log::info!(
        "Operator of rank {} with {} stored entries",
        operator.nrows(),
        operator.triplet_iter().count()
    );

    let params = SolverParams::default()
        .with_steps(args.steps)
        .with_tolerance(args.tolerance)
        .with_seed(args.seed)
        .with_options(&args.options);

    if (args.tridiagonal_out.is_some() || args.cf_out.is_some())
        && args.solver == SolverKind::Davidson
    {
        return Err(anyhow!(
            "--tridiagonal-out and --cf-out require the Lanczos solver"
        ));
    }
    let max_ql_iterations = params.steps_for_energy_convergence;

    let (pair, elapsed) = match args.solver {
        SolverKind::Lanczos => {
            let mut solver = LanczosSolver::new(&operator, params)?;
            let (pair, elapsed) = timed(|| solve(&mut solver, args.excited));
            let pair = pair?;
            log::info!(
                "Lanczos used {} steps ({:?})",
                solver.steps_used(),
                solver.last_termination()
            );
            if let Some(path) = &args.tridiagonal_out {
                save_tridiagonal(path, solver.tridiagonal())
                    .with_context(|| format!("Failed to write coefficients to {path:?}"))?;
                log::info!("Saved Lanczos coefficients to {path:?}");
            }
            if let Some(path) = &args.cf_out {
                let frequency = if args.cf_matsubara {
                    FrequencyKind::Matsubara
                } else {
                    FrequencyKind::Real
                };
                let cf = ContinuedFraction::new(
                    solver.tridiagonal().clone(),
                    pair.energy,
                    args.cf_weight,
                    args.cf_sign.into(),
                    frequency,
                    max_ql_iterations,
                )?;
                save_continued_fraction(path, &cf)
                    .with_context(|| format!("Failed to write continued fraction to {path:?}"))?;
                log::info!("Saved continued fraction with Eg = {} to {path:?}", pair.energy);
            }
            (pair, elapsed)
        }
        SolverKind::Davidson => {
            let mut solver = DavidsonSolver::new(&operator, params)?;
            let (pair, elapsed) = timed(|| solve(&mut solver, args.excited));
            let pair = pair?;
            log::info!(
                "Davidson used {} iterations, residual {:e} ({:?})",
                solver.iterations(),
                solver.residual_norm(),
                solver.last_stop()
            );
            (pair, elapsed)
        }
    };

    log::info!("Solved in {:.3} s", elapsed.as_secs_f64());
    println!("{:.15}", pair.energy);
    Ok(())
}

fn solve(
    solver: &mut dyn EigenSolver<f64>,
    excited: usize,
) -> Result<EigenPair<f64>> {
    let pair = if excited == 0 {
        solver.compute_ground_state(None)?
    } else {
        solver.compute_excited_state(None, excited)?
    };
    Ok(pair)
}
