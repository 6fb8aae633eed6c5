//! Numerical stability utilities.
//!
//! Provides safe implementations of the scalar transforms used when
//! likelihood surfaces are accumulated over many grid points and detectors.
//! Probabilities and densities are combined in log space, so the helpers here
//! focus on keeping `ln` away from zero and `exp` away from overflow.
//!
//! # Provided items
//! - [`DENSITY_FLOOR`]: smallest density/probability allowed into a `ln`.
//! - [`LOG_DENSITY_FLOOR`]: `ln(DENSITY_FLOOR)`, the matching log-space floor.
//! - [`EIGEN_EPS`]: eigenvalue cutoff for pseudoinverses of observed information.
//! - [`safe_ln`]: `ln(max(x, DENSITY_FLOOR))`.
//! - [`safe_ln_1m`]: `ln(1 - p)` with the same floor, accurate for small `p`.
//! - [`safe_logistic`]: overflow-free `1 / (1 + exp(-x))`.
//! - [`safe_logit`]: `ln(p / (1 - p))` computed as a difference of logs.
//! - [`log_sum_exp`]: max-shifted `ln Σ exp(xᵢ)`.
//!
//! # Rationale
//! Products of per-detector probabilities underflow quickly on realistic
//! arrays (tens of detectors, thousands of grid points); summing logs and
//! recombining with a max shift keeps every evaluation finite.

/// Smallest density or probability value passed to `ln`.
///
/// Values below this are clamped before taking logs so that a single
/// grid point with zero detection probability never produces `-∞`.
pub const DENSITY_FLOOR: f64 = 1e-300;

/// `ln(DENSITY_FLOOR)`, used as the floor for quantities already in log space.
pub const LOG_DENSITY_FLOOR: f64 = -690.775_527_898_213_7;

/// Eigenvalues at or below this magnitude are treated as numerically zero
/// when pseudo-inverting observed information matrices.
pub const EIGEN_EPS: f64 = 1e-10;

/// Floored natural logarithm: `ln(max(x, DENSITY_FLOOR))`.
///
/// `NaN` inputs propagate so that genuinely broken evaluations are still
/// reported upstream as non-finite objectives.
#[inline]
pub fn safe_ln(x: f64) -> f64 {
    if x.is_nan() {
        return x;
    }
    if x > DENSITY_FLOOR { x.ln() } else { LOG_DENSITY_FLOOR }
}

/// Floored `ln(1 - p)`.
///
/// Uses `ln_1p(-p)` so small detection probabilities keep full precision,
/// and clamps `p → 1` to [`LOG_DENSITY_FLOOR`].
#[inline]
pub fn safe_ln_1m(p: f64) -> f64 {
    if p.is_nan() {
        return p;
    }
    let q = 1.0 - p;
    if q > DENSITY_FLOOR { (-p).ln_1p() } else { LOG_DENSITY_FLOOR }
}

/// Numerically stable logistic function `σ(x) = 1 / (1 + exp(-x))`.
///
/// Branches on the sign of `x` so the exponential is always of a
/// non-positive argument and never overflows.
#[inline]
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Logit `ln(p / (1 - p))` evaluated as `ln(p) - ln_1p(-p)`.
///
/// Callers are responsible for `0 < p < 1`; boundary values yield `±∞`.
#[inline]
pub fn safe_logit(p: f64) -> f64 {
    p.ln() - (-p).ln_1p()
}

/// Max-shifted log-sum-exp over an iterator of log values.
///
/// Returns `-∞` for an empty iterator or when every term is `-∞`.
pub fn log_sum_exp<I: IntoIterator<Item = f64> + Clone>(values: I) -> f64 {
    let max = values.clone().into_iter().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.into_iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}
