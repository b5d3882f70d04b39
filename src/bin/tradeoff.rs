//! Experiment runner for the memory-computation trade-off of the basis storage modes.
//!
//! This executable acts as an orchestrator. It spawns one isolated child process per
//! storage mode (`generous`, `lean`) so that peak-memory readings are independent,
//! then collects the children's CSV output into a single file.
use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use faer::sparse::SparseColMat;
use lanczos_eigensolver::{
    EigenSolver, LanczosSolver, SolverParams,
    utils::{
        data_loader::load_sparse_operator,
        perf::{peak_rss_kb, timed},
        problems::random_sparse_symmetric,
    },
};
use serde::{Deserialize, Serialize};
use std::{
    path::PathBuf,
    process::{Command, Stdio},
};

/// Environment variable through which the orchestrator tells a worker which
/// storage mode to measure.
const VARIANT_ENV_VAR: &str = "LANCZOS_EXPERIMENT_VARIANT";

/// The basis storage mode measured by one worker process.
#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum StorageVariant {
    Generous,
    Lean,
}

#[derive(Parser, Debug)]
#[clap(
    name = "tradeoff-runner",
    about = "Compares time and peak memory of the generous and lean Lanczos basis storage."
)]
struct TradeoffArgs {
    /// Triplet file with the operator; a random operator is generated when omitted.
    #[clap(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Mirror off-diagonal entries of the input file.
    #[clap(long)]
    mirror: bool,

    /// Rank of the random operator.
    #[clap(long, default_value_t = 50_000)]
    size: usize,

    #[clap(long, default_value_t = 8)]
    couplings: usize,

    #[clap(long, default_value_t = 7)]
    seed: u64,

    #[clap(long, default_value_t = 50)]
    k_start: usize,

    #[clap(long, default_value_t = 500)]
    k_end: usize,

    #[clap(long, default_value_t = 50)]
    k_step: usize,

    /// Path to the output CSV file where results will be written.
    #[clap(long, value_name = "PATH")]
    output: PathBuf,
}

/// One measurement produced by a worker process.
#[derive(Debug, Serialize, Deserialize)]
struct TradeoffResult {
    variant: StorageVariant,
    k: usize,
    energy: f64,
    time_s: f64,
    rss_kb: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;

    if let Ok(variant_str) = std::env::var(VARIANT_ENV_VAR) {
        let variant = StorageVariant::from_str(&variant_str, true)
            .map_err(|_| anyhow!("Invalid variant string in env var: {}", variant_str))?;
        run_worker(variant)
    } else {
        run_orchestrator()
    }
}

fn run_orchestrator() -> Result<()> {
    let args = TradeoffArgs::parse();
    log::info!("Orchestrator starting experiment...");

    let mut child_handles = Vec::new();
    for variant in [StorageVariant::Generous, StorageVariant::Lean] {
        let name = variant
            .to_possible_value()
            .ok_or_else(|| anyhow!("Variant {variant:?} has no command-line name"))?;
        log::info!("Spawning worker for variant: {variant:?}");
        let child = Command::new(std::env::current_exe()?)
            .args(std::env::args_os().skip(1))
            .env(VARIANT_ENV_VAR, name.get_name())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn worker for variant {variant:?}"))?;
        child_handles.push((variant, child));
    }

    let mut all_results = Vec::new();
    for (variant, handle) in child_handles {
        log::info!("Waiting for worker {variant:?} to complete...");
        let output = handle.wait_with_output()?;
        if !output.status.success() {
            return Err(anyhow!(
                "Worker process for variant {:?} failed with status: {}",
                variant,
                output.status
            ));
        }

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(output.stdout.as_slice());
        for result in rdr.deserialize() {
            let record: TradeoffResult = result?;
            all_results.push(record);
        }
    }

    log::info!(
        "All workers finished. Consolidating results into {:?}...",
        &args.output
    );
    let mut writer = csv::Writer::from_path(&args.output)?;
    for record in all_results {
        writer.serialize(record)?;
    }
    writer.flush()?;

    log::info!("Experiment complete.");
    Ok(())
}

/// Measures one storage mode and prints headerless CSV rows to standard output.
fn run_worker(variant: StorageVariant) -> Result<()> {
    let args = TradeoffArgs::parse();
    log::info!("Worker for {variant:?} started.");

    let operator: SparseColMat<usize, f64> = match &args.input {
        Some(path) => load_sparse_operator(path, args.mirror)
            .with_context(|| format!("Failed to load operator from {path:?}"))?,
        None => random_sparse_symmetric(args.size, args.couplings, args.seed)?,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(std::io::stdout());

    for k in (args.k_start..=args.k_end.min(operator.nrows())).step_by(args.k_step.max(1)) {
        log::info!("Worker {variant:?}: Running for k = {k}...");
        let params = SolverParams::default()
            .with_steps(k)
            .with_tolerance(0.0)
            .with_seed(args.seed)
            .with_generous_memory(variant == StorageVariant::Generous);
        let mut solver = LanczosSolver::new(&operator, params)?;
        let (ground, elapsed) = timed(|| solver.compute_ground_state(None));
        let ground = ground?;

        writer.serialize(TradeoffResult {
            variant,
            k,
            energy: ground.energy,
            time_s: elapsed.as_secs_f64(),
            rss_kb: peak_rss_kb(),
        })?;
    }

    writer.flush()?;
    log::info!("Worker for {variant:?} finished.");
    Ok(())
}
