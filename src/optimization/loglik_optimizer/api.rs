//! Entry point for maximizing a [`LogLikelihood`].
//!
//! Picks the L-BFGS line search named in [`MLEOptions`], wraps the model in an
//! [`ArgMinAdapter`] (which exposes the cost `-ℓ(θ)` to argmin) and hands the
//! run to [`run_lbfgs`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        OptimOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, LogLikelihood, MLEOptions},
    },
};

/// Maximize `ℓ(θ)` from `theta0` with L-BFGS.
///
/// `f.check(theta0, data)` runs once before any solver is built, so a
/// malformed starting vector fails fast with the model's own error.
///
/// # Errors
/// - Anything returned by `f.check`.
/// - Invalid tolerances or line-search settings from the builders.
/// - Solver failures during the run, and non-finite `θ̂` or `ℓ(θ̂)`.
///
/// # Example
/// ```no_run
/// use ndarray::{Array1, array};
/// use rust_ascr::optimization::{
///     errors::{OptError, OptResult},
///     loglik_optimizer::{LogLikelihood, MLEOptions, Tolerances, maximize, traits::LineSearcher},
/// };
///
/// struct Quadratic;
/// impl LogLikelihood for Quadratic {
///     type Data = ();
///     fn value(&self, theta: &Array1<f64>, _: &()) -> OptResult<f64> {
///         Ok(-theta.dot(theta))
///     }
///     fn check(&self, _: &Array1<f64>, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let tols = Tolerances::new(Some(1e-8), None, Some(200))?;
/// let opts = MLEOptions::new(tols, LineSearcher::HagerZhang, false, None)?;
/// let out = maximize(&Quadratic, array![0.1, -0.2], &(), &opts)?;
/// assert!(out.value <= 0.0);
/// # Ok::<(), OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}
