//! Runs a prepared argmin solver and converts its final state into an
//! [`OptimOutcome`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, LogLikelihood, MLEOptions, OptimOutcome, Theta, adapter::ArgMinAdapter,
    },
};
use argmin::core::{CostFunction, Executor, Gradient, State};
use argmin_math::ArgminL2Norm;
use log::{debug, log_enabled};

/// Execute `solver` on `problem` starting at `theta0`.
///
/// Shared by both line-search variants. The iteration cap comes from
/// `opts.tols.max_iter`; gradient and cost tolerances are already baked into
/// the solver by the builders.
///
/// With `log` at debug level the starting log-likelihood and gradient norm
/// are reported before the first iteration. With the `obs_slog` feature and
/// `opts.verbose`, argmin's terminal observer also reports every iteration.
///
/// # Errors
/// - Solver and line-search failures converted from `argmin::core::Error`.
/// - Non-finite `θ̂` or `ℓ(θ̂)` rejected by [`OptimOutcome::new`].
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: argmin::core::Solver<
            ArgMinAdapter<'a, F>,
            argmin::core::IterState<Theta, Grad, (), (), (), f64>,
        > + Send
        + 'static,
{
    if log_enabled!(log::Level::Debug) {
        log_initial_state(&theta0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    OptimOutcome::new(
        result.take_best_param(),
        -result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
    )
}

// ---- Helper Methods ----

fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: LogLikelihood,
{
    let ll0 = -problem.cost(theta0)?;
    let g0n = problem.gradient(theta0).ok().map(|g| g.l2_norm());
    debug!(
        "L-BFGS start: loglik = {:.6}{}",
        ll0,
        g0n.map(|n| format!(", |grad| = {n:.6}")).unwrap_or_default()
    );
    Ok(())
}
