//! numerical_stability — log-space helpers shared by the likelihood engine.
//!
//! Purpose
//! -------
//! Collect numerically stable scalar transforms and the small tolerances
//! that the density library, the likelihood assembler and the inference
//! layer share. Centralizing them keeps every module on the same density
//! floor and the same logistic/logit conventions.
//!
//! Key behaviors
//! -------------
//! - Provide floored logarithms (`safe_ln`, `safe_ln_1m`) so that
//!   per-detector probability products can be accumulated in log space
//!   without producing `-∞`.
//! - Provide overflow-free logistic/logit transforms used by the logit
//!   link of the parameter transform manager.
//! - Provide a max-shifted `log_sum_exp` for integrating log densities
//!   over grid points and quadrature nodes.
//! - Centralize tolerances (`DENSITY_FLOOR`, `LOG_DENSITY_FLOOR`,
//!   `EIGEN_EPS`).
//!
//! Invariants & assumptions
//! ------------------------
//! - All helpers are pure functions of their `f64` arguments.
//! - `NaN` inputs are propagated rather than masked so that a broken
//!   evaluation is still reported as a non-finite objective upstream.
//!
//! Conventions
//! -----------
//! - This module never logs, performs I/O, or touches global state.
//!
//! Downstream usage
//! ----------------
//! - `spatial::core::params` builds its logit link on `safe_logistic` and
//!   `safe_logit`.
//! - `spatial::core::aux_density` and `spatial::models::likelihood` use the
//!   floored logs and `log_sum_exp` in their hot loops.
//! - `inference::hessian` uses `EIGEN_EPS` for eigenvalue truncation.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] check agreement with naïve formulas,
//!   floor behavior, and tail stability.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    DENSITY_FLOOR, EIGEN_EPS, LOG_DENSITY_FLOOR, log_sum_exp, safe_ln, safe_ln_1m, safe_logistic,
    safe_logit,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_ascr::optimization::numerical_stability::prelude::*;
//
// to import the main numerical-stability surface in a single line.

pub mod prelude {
    pub use super::transformations::{
        DENSITY_FLOOR, EIGEN_EPS, LOG_DENSITY_FLOOR, log_sum_exp, safe_ln, safe_ln_1m,
        safe_logistic, safe_logit,
    };
}
