//! Bridge from [`LogLikelihood`] to argmin's `CostFunction` / `Gradient`.
//!
//! argmin minimizes, so the adapter reports the cost `c(θ) = -ℓ(θ)`.
//! Analytic log-likelihood gradients are negated; when a model has none, the
//! cost itself is finite-differenced and no sign flip is needed.
//!
//! Spatial likelihoods clamp parameters to their bounds and floor
//! per-detection terms, so a finite-difference probe can still land on a
//! failing evaluation (e.g. a link-scale value that overflows). Those
//! failures are captured and trigger a forward-difference retry.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

/// A model and its data viewed as an argmin minimization problem.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }

    /// Finite-difference gradient of the cost.
    ///
    /// Central differences first; forward differences when any probe failed
    /// or the central result is not a valid gradient.
    fn fd_cost_gradient(&self, theta: &Theta) -> Result<Grad, Error> {
        let probe_err: RefCell<Option<Error>> = RefCell::new(None);
        let cost = |t: &Theta| -> f64 {
            self.cost(t).unwrap_or_else(|e| {
                let mut slot = probe_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                f64::NAN
            })
        };
        let central = theta.central_diff(&cost);
        if probe_err.borrow().is_none() && validate_grad(&central, theta.len()).is_ok() {
            return Ok(central);
        }
        forward_diff(theta, &cost, &probe_err)
    }
}

impl<'a, F: LogLikelihood> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    /// `-ℓ(θ)`; a non-finite `ℓ` is reported as [`OptError::NonFiniteCost`].
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta, self.data)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(-output)
    }
}

impl<'a, F: LogLikelihood> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Gradient of the cost at `θ`.
    ///
    /// # Errors
    /// - Errors from the model's `grad` other than
    ///   [`OptError::GradientNotImplemented`].
    /// - The first failing cost probe of the forward-difference retry.
    /// - Wrong-length or non-finite gradients.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, theta.len())?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => self.fd_cost_gradient(theta),
            Err(e) => Err(e.into()),
        }
    }
}

// ---- Helper Methods ----

/// Forward differences of `func`, returning the first captured probe error
/// if any.
fn forward_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, probe_err: &RefCell<Option<Error>>,
) -> Result<Grad, Error> {
    probe_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = probe_err.take() {
        return Err(err);
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}
