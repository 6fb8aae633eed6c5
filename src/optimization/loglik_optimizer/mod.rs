//! loglik_optimizer — argmin-backed L-BFGS maximization of log-likelihoods.
//!
//! Purpose
//! -------
//! Maximize any [`LogLikelihood`] over an unconstrained vector `θ`. Spatial
//! models call [`maximize`] once per estimation phase with the link-scaled
//! vector of the parameters active in that phase.
//!
//! Key behaviors
//! -------------
//! - [`maximize`] validates `θ₀` with [`LogLikelihood::check`], builds an
//!   L-BFGS solver with the configured line search ([`builders`]) and runs it
//!   ([`run::run_lbfgs`]).
//! - [`adapter::ArgMinAdapter`] presents `c(θ) = -ℓ(θ)` to argmin and
//!   finite-differences the cost when a model has no analytic gradient.
//! - [`finite_diff::compute_hessian`] differentiates a gradient map for the
//!   observed information used by standard errors.
//!
//! Invariants & assumptions
//! ------------------------
//! - Models implement `ℓ` and optionally `∇ℓ`, never the cost.
//! - Non-finite log-likelihoods, gradients and estimates are errors.
//! - [`OptimOutcome::value`] is on the `ℓ` scale.
//!
//! Testing notes
//! -------------
//! - Submodule tests cover sign conventions ([`adapter`]), solver wiring
//!   ([`builders`]), Hessian construction ([`finite_diff`]), validation and
//!   configuration ([`validation`], [`traits`]).
//! - Spatial model tests run [`maximize`] end to end.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_ascr::optimization::loglik_optimizer::prelude::*;
//
// to import the main optimizer surface in a single line.

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
