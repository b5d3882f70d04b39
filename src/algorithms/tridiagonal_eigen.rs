//! Implicit-shift QL diagonalization of a real symmetric tridiagonal matrix.
//!
//! The solver works column by column. For each `l` it scans forward for the first
//! negligible off-diagonal entry `e[m]` (the matrix decouples there), and while
//! `m != l` it applies one implicitly shifted QL sweep: a Wilkinson-type shift from
//! the leading 2x2 block at `(l, l+1)` followed by a cascade of Givens rotations
//! from `m-1` down to `l`. When eigenvectors are requested the rotations are
//! accumulated into an `n x n` matrix that starts as the identity.
//!
//! The total number of sweeps over all `l` is capped; hitting the cap is reported
//! as [`LanczosErrorKind::NoConvergence`] instead of returning an unconverged
//! spectrum.
//!
//! Scratch storage (`d`, `e` and the rotation accumulator) is owned by the call and
//! released on every exit path.

use crate::error::{LanczosError, LanczosErrorKind};
use faer::Mat;

/// Eigenvalues (and optionally eigenvectors) of a tridiagonal matrix.
///
/// Eigenvalues are in the order the QL sweeps leave them on the diagonal, which is
/// not sorted. Column `k` of `eigenvectors` belongs to `eigenvalues[k]`.
#[derive(Debug, Clone)]
pub struct TridiagonalEigen {
    pub eigenvalues: Vec<f64>,
    pub eigenvectors: Option<Mat<f64>>,
    /// Number of QL sweeps (including the final deflation checks) performed.
    pub iterations: usize,
}

impl TridiagonalEigen {
    /// Index of the algebraically smallest eigenvalue (first one on ties).
    pub fn lowest_index(&self) -> usize {
        let mut best = 0;
        for (i, &value) in self.eigenvalues.iter().enumerate().skip(1) {
            if value < self.eigenvalues[best] {
                best = i;
            }
        }
        best
    }

    /// Indices that sort the eigenvalues in ascending order.
    pub fn sorted_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.eigenvalues.len()).collect();
        order.sort_by(|&i, &j| self.eigenvalues[i].total_cmp(&self.eigenvalues[j]));
        order
    }

    /// Copies eigenvector `k` out of the accumulated rotations.
    pub fn eigenvector(&self, k: usize) -> Option<Vec<f64>> {
        let z = self.eigenvectors.as_ref()?;
        Some((0..z.nrows()).map(|i| z[(i, k)]).collect())
    }
}

/// Diagonalizes the tridiagonal matrix with diagonal `a` and off-diagonal `b`.
///
/// `b[i]` couples rows `i` and `i + 1`; `b[n - 1]` is ignored. Both slices are
/// copied, the caller's coefficients are never modified.
pub fn diagonalize(
    a: &[f64],
    b: &[f64],
    want_vectors: bool,
    max_iterations: usize,
) -> Result<TridiagonalEigen, LanczosError> {
    let n = a.len();
    if b.len() < n {
        return Err(LanczosErrorKind::InputError(format!(
            "off-diagonal has {} entries, expected at least {}",
            b.len(),
            n
        ))
        .into());
    }

    let mut d = a.to_vec();
    let mut e = b[..n].to_vec();
    if n > 0 {
        e[n - 1] = 0.0;
    }
    let mut z = want_vectors.then(|| Mat::<f64>::identity(n, n));
    let mut iterations = 0usize;

    for l in 0..n {
        loop {
            iterations += 1;
            if iterations > max_iterations {
                log::error!("tridiagonal QL: premature exit for size {n} (may indicate an internal error)");
                return Err(LanczosErrorKind::NoConvergence {
                    size: n,
                    max_iterations,
                }
                .into());
            }

            // Look for a single small off-diagonal element to split the matrix.
            let mut m = l;
            while m + 1 < n {
                let dd = d[m].abs() + d[m + 1].abs();
                if e[m].abs() + dd == dd {
                    break;
                }
                m += 1;
            }
            if m == l {
                break;
            }

            let mut g = (d[l + 1] - d[l]) / (2.0 * e[l]);
            let mut r = g.hypot(1.0);
            let shift = if g >= 0.0 { r.abs() } else { -r.abs() };
            g = d[m] - d[l] + e[l] / (g + shift);

            let mut s = 1.0;
            let mut c = 1.0;
            let mut p = 0.0;
            let mut underflow = false;
            for i in (l..m).rev() {
                let f = s * e[i];
                let h = c * e[i];
                r = f.hypot(g);
                e[i + 1] = r;
                if r == 0.0 {
                    // Recover from underflow and restart the sweep for this `l`.
                    d[i + 1] -= p;
                    e[m] = 0.0;
                    underflow = true;
                    break;
                }
                s = f / r;
                c = g / r;
                g = d[i + 1] - p;
                r = (d[i] - g) * s + 2.0 * c * h;
                p = s * r;
                d[i + 1] = g + p;
                g = c * r - h;

                if let Some(z) = z.as_mut() {
                    for k in 0..n {
                        let f = z[(k, i + 1)];
                        z[(k, i + 1)] = s * z[(k, i)] + c * f;
                        z[(k, i)] = c * z[(k, i)] - s * f;
                    }
                }
            }
            if underflow {
                continue;
            }
            d[l] -= p;
            e[l] = g;
            e[m] = 0.0;
        }
    }

    Ok(TridiagonalEigen {
        eigenvalues: d,
        eigenvectors: z,
        iterations,
    })
}

/// The algebraically smallest eigenvalue of the leading `a.len() x a.len()` block,
/// and its eigenvector in tridiagonal coordinates when `want_vector` is set.
pub fn ground(
    a: &[f64],
    b: &[f64],
    want_vector: bool,
    max_iterations: usize,
) -> Result<(f64, Option<Vec<f64>>), LanczosError> {
    if a.is_empty() {
        return Err(LanczosErrorKind::InputError(
            "cannot diagonalize an empty tridiagonal matrix".to_string(),
        )
        .into());
    }
    let eigen = diagonalize(a, b, want_vector, max_iterations)?;
    let lowest = eigen.lowest_index();
    Ok((eigen.eigenvalues[lowest], eigen.eigenvector(lowest)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Residual `||T v - lambda v||` for a tridiagonal matrix.
    fn residual(a: &[f64], b: &[f64], lambda: f64, v: &[f64]) -> f64 {
        let n = a.len();
        let mut acc = 0.0;
        for i in 0..n {
            let mut tv = a[i] * v[i];
            if i > 0 {
                tv += b[i - 1] * v[i - 1];
            }
            if i + 1 < n {
                tv += b[i] * v[i + 1];
            }
            acc += (tv - lambda * v[i]).powi(2);
        }
        acc.sqrt()
    }

    #[test]
    fn test_one_by_one() {
        let (e, v) = ground(&[4.5], &[123.0], true, 10).unwrap();
        assert_eq!(e, 4.5);
        assert_eq!(v.unwrap(), vec![1.0]);
    }

    #[test]
    fn test_discrete_laplacian_spectrum() {
        // Eigenvalues of tridiag(-1, 2, -1) are 2 - 2 cos(k pi / (n + 1)).
        let n = 12;
        let a = vec![2.0; n];
        let b = vec![-1.0; n];
        let eigen = diagonalize(&a, &b, true, 10_000).unwrap();
        let mut values = eigen.eigenvalues.clone();
        values.sort_by(f64::total_cmp);
        for (k, value) in values.iter().enumerate() {
            let exact = 2.0 - 2.0 * ((k + 1) as f64 * std::f64::consts::PI / (n + 1) as f64).cos();
            assert!((value - exact).abs() < 1e-12, "k={k}: {value} vs {exact}");
        }
        for k in 0..n {
            let v = eigen.eigenvector(k).unwrap();
            assert!(residual(&a, &b, eigen.eigenvalues[k], &v) < 1e-12);
        }
    }

    #[test]
    fn test_eigenvectors_are_orthonormal() {
        let a = [1.0, -3.0, 0.5, 2.0, 7.0];
        let b = [0.3, 1.1, -2.0, 0.01, 0.0];
        let eigen = diagonalize(&a, &b, true, 10_000).unwrap();
        let z = eigen.eigenvectors.as_ref().unwrap();
        for p in 0..5 {
            for q in 0..5 {
                let dot: f64 = (0..5).map(|k| z[(k, p)] * z[(k, q)]).sum();
                let expected = if p == q { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_ground_picks_smallest() {
        let (e, _) = ground(&[2.0, 2.0], &[1.0, 0.0], false, 100).unwrap();
        assert!((e - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_decoupled_blocks_deflate_immediately() {
        // Zero couplings: every row is already converged, one check per row.
        let eigen = diagonalize(&[3.0, -1.0, 2.0], &[0.0, 0.0, 0.0], false, 3).unwrap();
        assert_eq!(eigen.eigenvalues, vec![3.0, -1.0, 2.0]);
        assert_eq!(eigen.iterations, 3);
        assert_eq!(eigen.lowest_index(), 1);
        assert_eq!(eigen.sorted_order(), vec![1, 2, 0]);
    }

    #[test]
    fn test_iteration_cap_is_an_error() {
        let err = diagonalize(&[1.0, 2.0, 3.0], &[1.0, 1.0, 0.0], false, 1).unwrap_err();
        assert_eq!(
            *err.kind(),
            LanczosErrorKind::NoConvergence {
                size: 3,
                max_iterations: 1
            }
        );
    }
}
