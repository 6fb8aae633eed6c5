//! inference::hessian — standard errors from the observed information.
//!
//! Purpose
//! -------
//! Turn a finite-difference Hessian of the negative log-likelihood at the
//! optimum into standard errors, first in optimizer space and then on the
//! natural parameter scale.
//!
//! Key behaviors
//! -------------
//! - [`calc_standard_errors`] differentiates a cost-gradient map with
//!   [`compute_hessian`] to obtain the observed information `J(θ̂)`, copies it
//!   into a `nalgebra::DMatrix` and takes the square root of the diagonal of
//!   its eigen-truncated pseudoinverse.
//! - [`delta_method`] maps optimizer-space SEs to natural-scale SEs through
//!   the link derivative and the scale factor:
//!   `SE(x) = |dx/dη| · SE(θ) / sf`, since `θ = η · sf`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The gradient map is the gradient of the *cost* `−ℓ(θ)` of the total
//!   (not average) log-likelihood, so `J(θ̂)` is the observed information.
//! - Eigenvalues at or below [`EIGEN_EPS`] are treated as zero. A parameter
//!   with weight on such a direction is not identified by the data and gets
//!   a `NaN` SE instead of an understated finite one.
//!
//! Conventions
//! -----------
//! - No explicit inverse is formed; the symmetric eigendecomposition is used
//!   throughout.
//! - Errors are reported via [`OptResult<T>`].
//!
//! Downstream usage
//! ----------------
//! - `SpatialModel::fit` calls [`calc_standard_errors`] after the final
//!   phase and [`delta_method`] per estimated parameter. Failure leaves the
//!   fit's standard errors unset instead of failing the fit.
use crate::{
    optimization::{
        errors::OptResult, loglik_optimizer::finite_diff::compute_hessian,
        numerical_stability::transformations::EIGEN_EPS,
    },
    spatial::core::params::ParamSpec,
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Squared eigenvector weight on dropped directions above which a
/// parameter's SE is reported as `NaN`.
const UNIDENTIFIED_LOADING: f64 = 1e-6;

/// Standard errors in optimizer space from a cost-gradient map.
///
/// Parameters
/// ----------
/// - `f`: gradient of the cost `θ ↦ ∇(−ℓ)(θ)`; must be C¹ near `theta_hat`.
/// - `theta_hat`: optimum at which the observed information is evaluated.
///
/// Returns
/// -------
/// Length-`n` vector of SEs aligned with `theta_hat`; `NaN` for parameters
/// along flat directions of the observed information.
///
/// Errors
/// ------
/// Any error from [`compute_hessian`], e.g. non-finite Hessian entries.
///
/// Examples
/// --------
/// ```rust
/// # use ndarray::array;
/// # use rust_ascr::inference::hessian::calc_standard_errors;
/// let a = array![[4.0, 0.0], [0.0, 1.0]];
/// let f = |theta: &ndarray::Array1<f64>| -> ndarray::Array1<f64> { a.dot(theta) };
/// let se = calc_standard_errors(&f, &array![1.0, -1.0]).unwrap();
/// assert!((se[0] - 0.5).abs() < 1e-6);
/// assert!((se[1] - 1.0).abs() < 1e-6);
/// ```
pub fn calc_standard_errors<F: Fn(&Array1<f64>) -> Array1<f64>>(
    f: &F, theta_hat: &Array1<f64>,
) -> OptResult<Array1<f64>> {
    let obs_info = compute_hessian(f, theta_hat)?;
    let mut obs_info_nalg = DMatrix::<f64>::zeros(obs_info.nrows(), obs_info.ncols());
    fill_dmatrix(&obs_info, &mut obs_info_nalg);
    Ok(solve_for_se(obs_info_nalg, theta_hat.len()))
}

/// Natural-scale SE of one parameter from its optimizer-space SE.
pub fn delta_method(spec: &ParamSpec, estimate: f64, se_theta: f64) -> f64 {
    spec.link.dnatural_dlink(estimate).abs() * se_theta / spec.scale_factor
}

// ---- Helper methods ----

/// Copy a square `ndarray` matrix into a preallocated `DMatrix`.
fn fill_dmatrix(obs_info: &Array2<f64>, obs_info_nalg: &mut DMatrix<f64>) {
    for ((i, j), &v) in obs_info.indexed_iter() {
        obs_info_nalg[(i, j)] = v;
    }
}

/// `sqrt(diag(J⁺))` with eigenvalues `<= EIGEN_EPS` dropped:
/// `Var(θ̂_i) = Σ_{k: λ_k > EIGEN_EPS} Q[i,k]² / λ_k` for `J = Q Λ Qᵀ`.
///
/// `NaN` when `Σ_{k: λ_k <= EIGEN_EPS} Q[i,k]²` exceeds
/// [`UNIDENTIFIED_LOADING`].
fn solve_for_se(obs_info_nalg: DMatrix<f64>, n: usize) -> Array1<f64> {
    let eigen_decomp = obs_info_nalg.symmetric_eigen();
    let q = eigen_decomp.eigenvectors;
    let eigenvals = eigen_decomp.eigenvalues;
    Array1::from_shape_fn(n, |i| {
        let (mut var, mut dropped) = (0.0, 0.0);
        for (k, &lambda) in eigenvals.iter().enumerate() {
            let w = q[(i, k)] * q[(i, k)];
            if lambda > EIGEN_EPS {
                var += w / lambda;
            } else {
                dropped += w;
            }
        }
        if dropped > UNIDENTIFIED_LOADING { f64::NAN } else { var.sqrt() }
    })
}
