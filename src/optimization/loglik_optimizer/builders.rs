//! L-BFGS solver construction.
//!
//! The builders pick the line search, apply the L-BFGS history size
//! (`opts.lbfgs_mem`, else [`DEFAULT_LBFGS_MEM`]) and wire the gradient and
//! cost tolerances from [`MLEOptions`]. Starting point and iteration cap are
//! runtime concerns applied by `run_lbfgs`.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// L-BFGS with the Hager–Zhang line search.
///
/// # Errors
/// Tolerances rejected by argmin.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

/// L-BFGS with the More–Thuente line search.
///
/// # Errors
/// Tolerances rejected by argmin.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// Apply whichever tolerances are set; unset ones keep argmin's defaults.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::loglik_optimizer::traits::{LineSearcher, Tolerances};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction with each line search, with default and explicit
    //   history sizes.
    // - Tolerance wiring, including the all-`None` case.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Both builders succeed for the default fitting options.
    //
    // Given
    // -----
    // - `MLEOptions::default()` and a copy switched to Hager–Zhang with
    //   history 11.
    //
    // Expect
    // ------
    // - Both builders return `Ok`.
    fn builders_accept_default_and_explicit_memory() {
        let defaults = MLEOptions::default();
        assert!(build_optimizer_more_thuente(&defaults).is_ok());
        let opts = MLEOptions::new(defaults.tols, LineSearcher::HagerZhang, false, Some(11))
            .expect("MLEOptions should be valid");
        assert!(build_optimizer_hager_zhang(&opts).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // `configure_lbfgs` applies present tolerances and skips absent ones.
    //
    // Given
    // -----
    // - Both tolerances set; then only `max_iter` set.
    //
    // Expect
    // ------
    // - `Ok` in both cases.
    fn configure_lbfgs_handles_present_and_absent_tolerances() {
        let both = Tolerances::new(Some(1e-6), Some(1e-8), Some(100)).expect("valid tolerances");
        let opts = MLEOptions::new(both, LineSearcher::HagerZhang, false, None).expect("valid");
        assert!(configure_lbfgs(LBFGS::new(HagerZhangLS::new(), DEFAULT_LBFGS_MEM), &opts).is_ok());

        let iters_only = Tolerances::new(None, None, Some(50)).expect("valid tolerances");
        let opts = MLEOptions::new(iters_only, LineSearcher::MoreThuente, false, None).expect("valid");
        assert!(configure_lbfgs(LBFGS::new(MoreThuenteLS::new(), DEFAULT_LBFGS_MEM), &opts).is_ok());
    }
}
