//! Synthetic operators for experiments and tests.

use crate::utils::data_loader::DataLoaderError;
use faer::sparse::{SparseColMat, Triplet};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// The Strakos spectrum
/// `lambda_i = l1 + (i / (n - 1)) (ln - l1) rho^(n - 1 - i)`, `i = 0 .. n-1`.
///
/// Eigenvalues accumulate near `l1` and spread out towards `ln`; for `rho < 1` the
/// Lanczos recurrence loses orthogonality quickly on this spectrum.
pub fn strakos_spectrum(n: usize, l1: f64, ln: f64, rho: f64) -> Vec<f64> {
    if n == 1 {
        return vec![l1];
    }
    (0..n)
        .map(|i| {
            let t = i as f64 / (n - 1) as f64;
            l1 + t * (ln - l1) * rho.powi((n - 1 - i) as i32)
        })
        .collect()
}

/// A sparse diagonal operator with the given eigenvalues.
pub fn diagonal_operator(values: &[f64]) -> Result<SparseColMat<usize, f64>, DataLoaderError> {
    let n = values.len();
    let triplets: Vec<_> = values
        .iter()
        .enumerate()
        .map(|(i, &val)| Triplet { row: i, col: i, val })
        .collect();
    SparseColMat::try_new_from_triplets(n, n, &triplets)
        .map_err(|_| DataLoaderError::SparseMatrixConstructionError)
}

/// A random sparse symmetric operator: a diagonal in `[0, n)` plus about
/// `couplings_per_row` off-diagonal entries per row drawn from `[-1, 1)`.
pub fn random_sparse_symmetric(
    n: usize,
    couplings_per_row: usize,
    seed: u64,
) -> Result<SparseColMat<usize, f64>, DataLoaderError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut triplets = Vec::with_capacity(n * (2 * couplings_per_row + 1));
    for i in 0..n {
        triplets.push(Triplet {
            row: i,
            col: i,
            val: rng.random::<f64>() * n as f64,
        });
        if n < 2 {
            continue;
        }
        for _ in 0..couplings_per_row.div_ceil(2) {
            let j = rng.random_range(0..n);
            if j == i {
                continue;
            }
            let val = 2.0 * rng.random::<f64>() - 1.0;
            triplets.push(Triplet { row: i, col: j, val });
            triplets.push(Triplet { row: j, col: i, val });
        }
    }
    // Repeated (i, j) pairs are summed, which keeps the matrix symmetric.
    SparseColMat::try_new_from_triplets(n, n, &triplets)
        .map_err(|_| DataLoaderError::SparseMatrixConstructionError)
}

/// Largest distance from an exact eigenvalue to its nearest approximation.
///
/// Infinite when `approx` is empty. Ghost copies in `approx` do not lower the
/// value, missing eigenvalues raise it.
pub fn spectrum_deviation(exact: &[f64], approx: &[f64]) -> f64 {
    exact
        .iter()
        .map(|&lambda| {
            approx
                .iter()
                .map(|&theta| (lambda - theta).abs())
                .fold(f64::INFINITY, f64::min)
        })
        .fold(0.0, f64::max)
}
