//! Continued-fraction combiner.
//!
//! Reads one or two saved continued fractions (particle and hole branches), adds
//! their Green's-function contributions and writes the sampled spectrum as CSV.
//! The inputs are the files written by `ground_state --cf-out`.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use lanczos_eigensolver::{
    TwoContinuedFraction,
    continued_fraction::{FrequencyKind, PlotParams},
    utils::data_loader::load_continued_fraction,
};
use serde::Serialize;
use std::{io::Write, path::PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "combine-cf",
    about = "Adds saved continued fractions and samples the resulting spectral function."
)]
struct CombineArgs {
    /// Continued fraction of the first branch.
    #[clap(long, value_name = "PATH")]
    plus: PathBuf,

    /// Continued fraction of the second branch, if any.
    #[clap(long, value_name = "PATH")]
    minus: Option<PathBuf>,

    #[clap(long, default_value_t = -10.0, allow_hyphen_values = true)]
    omega1: f64,

    #[clap(long, default_value_t = 10.0, allow_hyphen_values = true)]
    omega2: f64,

    #[clap(long, default_value_t = 0.01)]
    delta_omega: f64,

    /// Broadening of real-axis spectra.
    #[clap(long, default_value_t = 0.1)]
    delta: f64,

    /// Inverse temperature, used for Matsubara fractions.
    #[clap(long, default_value_t = 10.0)]
    beta: f64,

    #[clap(long, default_value_t = 128)]
    matsubaras: usize,

    /// Iteration cap of the tridiagonal eigensolver.
    #[clap(long, default_value_t = 10_000)]
    max_iterations: usize,

    /// Output CSV file; standard output when omitted.
    #[clap(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

/// One sampled point of the combined spectrum.
#[derive(Debug, Serialize)]
struct SpectrumRecord {
    omega: f64,
    re: f64,
    im: f64,
}

fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logger: {}", e))?;
    let args = CombineArgs::parse();

    let plus = load_continued_fraction(&args.plus, args.max_iterations)
        .with_context(|| format!("Failed to read continued fraction {:?}", args.plus))?;
    let combined = match &args.minus {
        Some(path) => {
            let minus = load_continued_fraction(path, args.max_iterations)
                .with_context(|| format!("Failed to read continued fraction {path:?}"))?;
            TwoContinuedFraction::new(plus, minus)
        }
        None => TwoContinuedFraction::plus_only(plus),
    };

    let params = PlotParams {
        omega1: args.omega1,
        omega2: args.omega2,
        delta_omega: args.delta_omega,
        delta: args.delta,
        beta: args.beta,
        number_of_matsubaras: args.matsubaras,
    };
    if combined.plus.frequency() == FrequencyKind::Matsubara && params.beta <= 0.0 {
        return Err(anyhow!("Matsubara spectra need a positive --beta"));
    }
    let points = combined.plot(&params);
    log::info!(
        "Sampled {} points ({:?} axis, {} + {} levels)",
        points.len(),
        combined.plus.frequency(),
        combined.plus.len(),
        combined.minus.len()
    );

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            std::fs::File::create(path).with_context(|| format!("Failed to create {path:?}"))?,
        ),
        None => Box::new(std::io::stdout()),
    };
    let mut writer = csv::Writer::from_writer(sink);
    for (omega, value) in points {
        writer.serialize(SpectrumRecord {
            omega,
            re: value.re,
            im: value.im,
        })?;
    }
    writer.flush()?;
    Ok(())
}
