//! This module provides utilities for persisting Lanczos results and loading operators.
//!
//! - Tridiagonal matrices are stored as an ordered list of `(a, b)` pairs, one per
//!   Lanczos step, either as CSV text (`a,b` records) or as a little-endian binary
//!   stream (a `u64` count followed by the `f64` pairs).
//! - Continued fractions are the CSV records preceded by `#Key=value` header lines
//!   carrying the energy, weight, sign and frequency kind.
//! - Operators are read from a whitespace-separated triplet file: a `rank` line
//!   followed by `row col value` lines with 0-based indices.

use crate::{
    continued_fraction::{ContinuedFraction, FrequencyKind, Sign},
    error::LanczosError,
    tridiagonal::TridiagonalMatrix,
};
use faer::sparse::{SparseColMat, Triplet};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};
use thiserror::Error;

/// Represents all possible errors that can occur during data loading and parsing.
#[derive(Error, Debug)]
pub enum DataLoaderError {
    /// Wraps a standard I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Wraps an error from the CSV reader or writer.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Occurs when a string cannot be parsed into an integer.
    #[error("Parse error: Failed to parse integer from '{0}'")]
    ParseInt(String),
    /// Occurs when a string cannot be parsed into a float.
    #[error("Parse error: Failed to parse float from '{0}'")]
    ParseFloat(String),
    /// Occurs when the end of a file is reached unexpectedly during parsing.
    #[error("Format error: Unexpected end of file while reading data.")]
    UnexpectedEof,
    /// Occurs when a line or header does not have the expected shape.
    #[error("Format error: {0}")]
    Format(String),
    /// Occurs if the sparse matrix construction fails internally.
    #[error("Internal error: Failed to construct the sparse matrix from triplets.")]
    SparseMatrixConstructionError,
    /// Wraps a failure while rebuilding a loaded object.
    #[error(transparent)]
    Lanczos(#[from] LanczosError),
}

/// One CSV record of a tridiagonal matrix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct AbRecord {
    a: f64,
    b: f64,
}

/// Writes the `(a, b)` pairs as CSV with an `a,b` header.
pub fn write_tridiagonal_csv<W: Write>(
    writer: W,
    ab: &TridiagonalMatrix,
) -> Result<(), DataLoaderError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (a, b) in ab.pairs() {
        wtr.serialize(AbRecord { a, b })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads `(a, b)` CSV records; lines starting with `#` are skipped.
pub fn read_tridiagonal_csv<R: Read>(reader: R) -> Result<TridiagonalMatrix, DataLoaderError> {
    let mut rdr = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut ab = TridiagonalMatrix::new();
    for record in rdr.deserialize::<AbRecord>() {
        let record = record?;
        ab.push(record.a, record.b);
    }
    Ok(ab)
}

/// Writes the pair count as a little-endian `u64`, then each `a` and `b` as `f64`.
pub fn write_tridiagonal_binary<W: Write>(
    mut writer: W,
    ab: &TridiagonalMatrix,
) -> Result<(), DataLoaderError> {
    writer.write_all(&(ab.len() as u64).to_le_bytes())?;
    for (a, b) in ab.pairs() {
        writer.write_all(&a.to_le_bytes())?;
        writer.write_all(&b.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8; 8]) -> Result<(), DataLoaderError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => DataLoaderError::UnexpectedEof,
        _ => DataLoaderError::Io(e),
    })
}

/// Reads the stream written by [`write_tridiagonal_binary`].
pub fn read_tridiagonal_binary<R: Read>(
    mut reader: R,
) -> Result<TridiagonalMatrix, DataLoaderError> {
    let mut buf = [0u8; 8];
    read_exact_or_eof(&mut reader, &mut buf)?;
    let count = usize::try_from(u64::from_le_bytes(buf))
        .map_err(|_| DataLoaderError::Format("pair count does not fit in memory".to_string()))?;

    // The count comes from the file; do not trust it for the allocation.
    let mut ab = TridiagonalMatrix::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        read_exact_or_eof(&mut reader, &mut buf)?;
        let a = f64::from_le_bytes(buf);
        read_exact_or_eof(&mut reader, &mut buf)?;
        let b = f64::from_le_bytes(buf);
        ab.push(a, b);
    }
    Ok(ab)
}

/// Saves a tridiagonal matrix, choosing the format from the extension
/// (`.bin` for binary, anything else for CSV).
pub fn save_tridiagonal(
    path: impl AsRef<Path>,
    ab: &TridiagonalMatrix,
) -> Result<(), DataLoaderError> {
    let path = path.as_ref();
    let writer = BufWriter::new(File::create(path)?);
    if is_binary(path) {
        write_tridiagonal_binary(writer, ab)
    } else {
        write_tridiagonal_csv(writer, ab)
    }
}

/// Loads a tridiagonal matrix saved by [`save_tridiagonal`].
pub fn load_tridiagonal(path: impl AsRef<Path>) -> Result<TridiagonalMatrix, DataLoaderError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    if is_binary(path) {
        read_tridiagonal_binary(reader)
    } else {
        read_tridiagonal_csv(reader)
    }
}

fn is_binary(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bin")
}

/// Writes a continued fraction: header lines, then the `(a, b)` CSV records.
pub fn write_continued_fraction<W: Write>(
    mut writer: W,
    cf: &ContinuedFraction,
) -> Result<(), DataLoaderError> {
    let frequency = match cf.frequency() {
        FrequencyKind::Real => "Real",
        FrequencyKind::Matsubara => "Matsubara",
    };
    writeln!(writer, "#FreqEnum={frequency}")?;
    writeln!(writer, "#CFWeight={}", cf.weight())?;
    writeln!(writer, "#CFEnergy={}", cf.energy())?;
    writeln!(writer, "#CFIsign={}", cf.sign().factor() as i32)?;
    write_tridiagonal_csv(writer, cf.tridiagonal())
}

fn header_value<'a>(headers: &'a [(String, String)], key: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn parse_float(value: &str) -> Result<f64, DataLoaderError> {
    value
        .parse::<f64>()
        .map_err(|_| DataLoaderError::ParseFloat(value.to_string()))
}

/// Reads a continued fraction written by [`write_continued_fraction`] and
/// recomputes its poles.
pub fn read_continued_fraction<R: Read>(
    mut reader: R,
    max_iterations: usize,
) -> Result<ContinuedFraction, DataLoaderError> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;

    let mut headers = Vec::new();
    for line in content.lines().map(str::trim) {
        let Some(header) = line.strip_prefix('#') else {
            continue;
        };
        let (key, value) = header
            .split_once('=')
            .ok_or_else(|| DataLoaderError::Format(format!("malformed header line '{line}'")))?;
        headers.push((key.trim().to_string(), value.trim().to_string()));
    }

    let require = |key: &str| {
        header_value(&headers, key)
            .ok_or_else(|| DataLoaderError::Format(format!("missing header '#{key}='")))
    };
    let weight = parse_float(require("CFWeight")?)?;
    let energy = parse_float(require("CFEnergy")?)?;
    let isign_text = require("CFIsign")?;
    let isign = isign_text
        .parse::<i32>()
        .map_err(|_| DataLoaderError::ParseInt(isign_text.to_string()))?;
    let frequency = match header_value(&headers, "FreqEnum") {
        Some("Matsubara") => FrequencyKind::Matsubara,
        Some("Real") | None => FrequencyKind::Real,
        Some(other) => {
            return Err(DataLoaderError::Format(format!(
                "unknown frequency kind '{other}'"
            )));
        }
    };

    let ab = read_tridiagonal_csv(content.as_bytes())?;
    Ok(ContinuedFraction::new(
        ab,
        energy,
        weight,
        Sign::from_factor(isign),
        frequency,
        max_iterations,
    )?)
}

pub fn save_continued_fraction(
    path: impl AsRef<Path>,
    cf: &ContinuedFraction,
) -> Result<(), DataLoaderError> {
    write_continued_fraction(BufWriter::new(File::create(path)?), cf)
}

pub fn load_continued_fraction(
    path: impl AsRef<Path>,
    max_iterations: usize,
) -> Result<ContinuedFraction, DataLoaderError> {
    read_continued_fraction(BufReader::new(File::open(path)?), max_iterations)
}

/// Parses a triplet file into a sparse operator.
///
/// Blank lines and lines starting with `#` or `%` are ignored. The first data line
/// holds the rank, every further line `row col value`. With `mirror` set, each
/// off-diagonal entry is also stored at its transposed position, so a file may list
/// only one triangle of a symmetric matrix.
pub fn read_sparse_operator<R: BufRead>(
    reader: R,
    mirror: bool,
) -> Result<SparseColMat<usize, f64>, DataLoaderError> {
    let mut rank: Option<usize> = None;
    let mut triplets: Vec<Triplet<usize, usize, f64>> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() || parts[0].starts_with('#') || parts[0].starts_with('%') {
            continue;
        }
        let parse_index = |s: &str| {
            s.parse::<usize>()
                .map_err(|_| DataLoaderError::ParseInt(s.to_string()))
        };

        let Some(n) = rank else {
            rank = Some(parse_index(parts[0])?);
            continue;
        };
        if parts.len() != 3 {
            return Err(DataLoaderError::Format(format!(
                "expected 'row col value', found '{line}'"
            )));
        }
        let row = parse_index(parts[0])?;
        let col = parse_index(parts[1])?;
        let val = parse_float(parts[2])?;
        if row >= n || col >= n {
            return Err(DataLoaderError::Format(format!(
                "entry ({row}, {col}) outside a rank-{n} operator"
            )));
        }
        triplets.push(Triplet { row, col, val });
        if mirror && row != col {
            triplets.push(Triplet {
                row: col,
                col: row,
                val,
            });
        }
    }

    let n = rank.ok_or(DataLoaderError::UnexpectedEof)?;
    SparseColMat::try_new_from_triplets(n, n, &triplets)
        .map_err(|_| DataLoaderError::SparseMatrixConstructionError)
}

/// Loads a sparse operator from a triplet file; see [`read_sparse_operator`].
pub fn load_sparse_operator(
    path: impl AsRef<Path>,
    mirror: bool,
) -> Result<SparseColMat<usize, f64>, DataLoaderError> {
    read_sparse_operator(BufReader::new(File::open(path)?), mirror)
}
