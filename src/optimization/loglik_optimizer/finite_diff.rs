//! Finite-difference Hessians of a gradient map.
//!
//! [`compute_hessian`] differentiates a gradient function with central
//! differences, falls back to forward differences when the central result has
//! non-finite entries, and symmetrizes the accepted matrix. Standard errors of
//! spatial fits are computed from this Hessian of the cost gradient.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, Theta,
        types::Hessian,
        validation::validate_hessian,
    },
};
use finitediff::FiniteDiff;

/// Symmetric finite-difference Hessian of the gradient map `f` at `theta`.
///
/// # Errors
/// [`OptError::HessianDimMismatch`](crate::optimization::errors::OptError::HessianDimMismatch)
/// or [`OptError::InvalidHessian`](crate::optimization::errors::OptError::InvalidHessian)
/// when the forward-difference fallback is also invalid.
///
/// # Example
/// ```rust
/// use rust_ascr::optimization::loglik_optimizer::{Theta, finite_diff::compute_hessian};
/// let grad_fn = |theta: &Theta| theta.mapv(|x| 2.0 * x);
/// let h = compute_hessian(&grad_fn, &ndarray::array![1.0, -3.0]).unwrap();
/// assert!((h[[0, 0]] - 2.0).abs() < 1e-6);
/// assert!(h[[0, 1]].abs() < 1e-6);
/// ```
pub fn compute_hessian<F: Fn(&Theta) -> Grad>(f: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let central = theta.central_hessian(f);
    let mut hess = match validate_hessian(&central, dim) {
        Ok(()) => central,
        Err(_) => {
            let forward = theta.forward_hessian(f);
            validate_hessian(&forward, dim)?;
            forward
        }
    };
    symmetrize_hess(&mut hess);
    Ok(hess)
}

// ---- Helper methods ----

/// Replace each off-diagonal pair by its mean.
fn symmetrize_hess(hess: &mut Hessian) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptError;
    use approx::assert_relative_eq;
    use ndarray::{Array1, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Hessians of linear gradient maps, including a non-symmetric one.
    // - Non-finite gradients surfacing as `InvalidHessian`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A linear gradient map yields its matrix, symmetrized.
    //
    // Given
    // -----
    // - g(θ) = A·θ with A = [[2, 1], [0, 4]].
    //
    // Expect
    // ------
    // - H ≈ [[2, 0.5], [0.5, 4]].
    fn linear_gradient_map_gives_symmetrized_matrix() {
        let a = array![[2.0, 1.0], [0.0, 4.0]];
        let grad_fn = |theta: &Theta| a.dot(theta);
        let h = compute_hessian(&grad_fn, &array![0.3, -0.7]).unwrap();
        assert_relative_eq!(h[[0, 0]], 2.0, epsilon = 1e-6);
        assert_relative_eq!(h[[1, 1]], 4.0, epsilon = 1e-6);
        assert_relative_eq!(h[[0, 1]], 0.5, epsilon = 1e-6);
        assert_eq!(h[[0, 1]], h[[1, 0]]);
    }

    #[test]
    // Purpose
    // -------
    // A gradient map that returns NaN cannot produce a Hessian.
    //
    // Given
    // -----
    // - g(θ) = (NaN).
    //
    // Expect
    // ------
    // - `InvalidHessian`.
    fn non_finite_gradient_is_rejected() {
        let grad_fn = |_theta: &Theta| Array1::from(vec![f64::NAN]);
        let err = compute_hessian(&grad_fn, &array![1.0]).unwrap_err();
        assert!(matches!(err, OptError::InvalidHessian { .. }));
    }
}
