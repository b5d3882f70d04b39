//! Common utilities for persistence and performance measurement.
//!
//! - **`data_loader`**: reads and writes tridiagonal matrices (CSV or binary) and
//!   continued fractions, and parses sparse operators from triplet files.
//! - **`problems`**: synthetic test operators (Strakos spectra, random sparse
//!   symmetric matrices).
//! - **`perf`**: peak resident memory on Linux and a wall-clock timing helper, used
//!   by the experiment binaries.

pub mod data_loader;
pub mod perf;
pub mod problems;
