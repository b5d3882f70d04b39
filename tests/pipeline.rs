//! End-to-end check of the command-line pipeline: `ground_state --cf-out` writes a
//! continued fraction that `combine_cf` samples into a spectrum.

use anyhow::{Result, ensure};
use lanczos_eigensolver::utils::data_loader::load_continued_fraction;
use std::{
    path::PathBuf,
    process::{Command, Output},
};

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("lanczos-pipeline-{}-{name}", std::process::id()))
}

fn run(command: &mut Command) -> Result<Output> {
    let output = command.output()?;
    ensure!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(output)
}

#[test]
fn test_ground_state_fraction_feeds_combiner() -> Result<()> {
    let cf_path = scratch_path("plus.cf");
    let spectrum_path = scratch_path("spectrum.csv");

    let ground = run(Command::new(env!("CARGO_BIN_EXE_ground_state")).args([
        "--size",
        "40",
        "--couplings",
        "4",
        "--steps",
        "40",
        "--cf-weight",
        "0.5",
        "--cf-sign",
        "negative",
        "--cf-out",
    ])
    .arg(&cf_path))?;
    let energy: f64 = String::from_utf8(ground.stdout)?.trim().parse()?;

    let cf = load_continued_fraction(&cf_path, 10_000)?;
    // The energy is printed with 15 decimals, the file keeps full precision.
    ensure!(
        (cf.energy() - energy).abs() < 1e-12 * energy.abs().max(1.0),
        "Eg {} != printed {energy}",
        cf.energy()
    );
    ensure!(cf.weight() == 0.5);
    ensure!(!cf.is_empty());

    run(Command::new(env!("CARGO_BIN_EXE_combine_cf"))
        .arg("--plus")
        .arg(&cf_path)
        .args(["--omega1=-2.0", "--omega2=2.0", "--delta-omega=0.5"])
        .arg("--output")
        .arg(&spectrum_path))?;

    let mut reader = csv::Reader::from_path(&spectrum_path)?;
    let rows: Vec<(f64, f64, f64)> = reader.deserialize().collect::<Result<_, _>>()?;
    ensure!(rows.len() == 8, "expected 8 samples, got {}", rows.len());
    for (omega, re, im) in rows {
        ensure!(re.is_finite() && im.is_finite());
        // A positive weight with positive broadening gives Im I(w + i delta) < 0.
        ensure!(im < 0.0, "Im I({omega}) = {im}");
    }

    std::fs::remove_file(&cf_path)?;
    std::fs::remove_file(&spectrum_path)?;
    Ok(())
}
