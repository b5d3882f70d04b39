//! Lanczos and Davidson eigensolvers for large sparse Hermitian operators.
//!
//! This crate computes extremal eigenpairs of a Hermitian (or real-symmetric) operator
//! `H` that is only available through its action on vectors, and turns the Lanczos
//! tridiagonalization into spectral functions via continued fractions.
//!
//! Built on the [`faer`] linear algebra framework. Vectors are `n x 1` [`faer::Mat`]
//! columns, and the scalar type is either `f64` or [`num_complex::Complex64`].
//!
//! ## Components
//!
//! **Operator** ([`operator::HermitianOperator`]): the matrix-vector product with
//! accumulate semantics. Implemented for dense and sparse `faer` matrices.
//!
//! **Lanczos solver** ([`LanczosSolver`]): grows a Krylov basis with the three-term
//! recurrence, checks convergence of the lowest eigenvalue after every step, and
//! rebuilds the eigenvector either from the stored basis (generous memory) or by
//! replaying the recurrence (lean memory, twice the operator applications).
//!
//! **Tridiagonal eigensolver** ([`algorithms::tridiagonal_eigen`]): implicit-shift QL
//! with deflation and an iteration cap.
//!
//! **Davidson solver** ([`DavidsonSolver`]): subspace expansion with a diagonal
//! preconditioner, sharing the [`EigenSolver`] contract with the Lanczos solver.
//!
//! **Continued fractions** ([`continued_fraction`]): Green's-function contributions
//! evaluated from the tridiagonal coefficients.
//!
//! ## Example Usage
//!
//! The following example computes the ground state of the rank-2 operator
//! `[[2, 1], [1, 2]]` starting from `(1, 0)`. The Krylov space is exhausted after two
//! steps, so the answer is exact: energy 1 with eigenvector proportional to `(1, -1)`.
//!
//! ```rust
//! use faer::mat;
//! use lanczos_eigensolver::{EigenSolver, LanczosSolver, SolverParams};
//!
//! let h = mat![[2.0, 1.0], [1.0, 2.0]];
//! let start = mat![[1.0], [0.0]];
//!
//! let mut solver = LanczosSolver::new(&h, SolverParams::default()).unwrap();
//! let ground = solver.compute_ground_state(Some(start.as_ref())).unwrap();
//! assert!((ground.energy - 1.0).abs() < 1e-12);
//! assert!((ground.vector[(0, 0)] + ground.vector[(1, 0)]).abs() < 1e-12);
//!
//! // Excited states reuse the same decomposition (experimental).
//! let excited = solver.compute_excited_state(Some(start.as_ref()), 1).unwrap();
//! assert!((excited.energy - 3.0).abs() < 1e-12);
//! ```
//!
//! ## Memory Trade-off
//!
//! With [`SolverParams::generous_memory`] the solver stores the `rank x steps` basis,
//! which also enables full reorthogonalization ([`SolverParams::reorthogonalize`]).
//! Without it only `O(rank)` memory is used and the eigenvector is rebuilt by a
//! second pass over the recurrence.

pub mod algorithms;
pub mod continued_fraction;
pub mod error;
pub mod operator;
pub mod params;
pub mod scalar;
pub mod solvers;
pub mod tridiagonal;
pub mod utils;

// Re-export the main API for convenient access.
pub use continued_fraction::{ContinuedFraction, TwoContinuedFraction};
pub use error::{LanczosError, LanczosErrorKind};
pub use operator::HermitianOperator;
pub use params::SolverParams;
pub use scalar::Scalar;
pub use solvers::{DavidsonSolver, EigenPair, EigenSolver, LanczosSolver};
pub use tridiagonal::TridiagonalMatrix;
