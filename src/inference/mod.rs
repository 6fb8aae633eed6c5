//! inference — post-estimation standard errors.
//!
//! Purpose
//! -------
//! Quantify uncertainty of maximum-likelihood estimates from the observed
//! information at the optimum. Standard errors are computed in the
//! optimizer's parameter space `θ` and mapped back to natural parameters
//! with the delta method.
//!
//! Key behaviors
//! -------------
//! - [`calc_standard_errors`] finite-differences a cost-gradient map into the
//!   observed information and returns `sqrt(diag(J⁺))`.
//! - [`delta_method`] rescales one optimizer-space SE through its parameter's
//!   link derivative and scale factor.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are evaluated at an interior optimum; near-singular directions
//!   of `J` are truncated rather than inverted.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`hessian`] cover analytic quadratics, singular
//!   directions and the delta-method mapping.

pub mod hessian;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::hessian::{calc_standard_errors, delta_method};
