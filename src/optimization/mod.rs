//! optimization — likelihood maximization, stable numerics, error surface.
//!
//! Purpose
//! -------
//! Provide the fitting machinery shared by every spatial model: an
//! Argmin-backed L-BFGS maximizer for log-likelihoods, log-space numerical
//! primitives used by the density library, and the single error enum that
//! every model-layer failure is eventually reported as.
//!
//! Key behaviors
//! -------------
//! - `loglik_optimizer` maximizes a user log-likelihood `ℓ(θ)` over an
//!   unconstrained vector and reports an `OptimOutcome` with diagnostics.
//! - `numerical_stability` supplies floored logarithms, a stable logistic
//!   pair and `log_sum_exp`, so mixtures over mask points, call directions
//!   and source-strength nodes never overflow.
//! - `errors::OptError` absorbs data errors (`ScrError`), parameter-table
//!   errors (`ParamError`) and Argmin failures behind `OptResult<T>`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The optimizer only ever sees `θ`, the link-scaled vector of the
//!   parameters active in the current phase; bounds are enforced by the
//!   model layer by clamping, not by the solver.
//! - Invalid `θ` and non-finite log-likelihoods are recoverable errors.
//!
//! Conventions
//! -----------
//! - Solvers maximize `ℓ` by minimizing the cost `c(θ) = -ℓ(θ)`; outcomes are
//!   reported on the `ℓ` scale.
//! - Logging is left to the model layer; nothing here writes to the `log`
//!   facade except through Argmin observers when `obs_slog` is enabled.
//!
//! Downstream usage
//! ----------------
//! - `SpatialModel` implements `LogLikelihood` and calls `maximize` once per
//!   estimation phase.
//! - `inference::hessian` reuses `finite_diff` for the observed information.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_ascr::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
