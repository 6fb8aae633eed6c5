//! models — likelihood assembly, fitting and posterior location.
//!
//! Purpose
//! -------
//! Turn the per-fit artifacts of `spatial::core` into the quantities users
//! ask for: the log-likelihood at a parameter set, maximum-likelihood
//! estimates with standard errors, per-detection contributions, and
//! posterior location surfaces.
//!
//! Key behaviors
//! -------------
//! - [`likelihood`] evaluates the full-likelihood SCR objective with
//!   pattern sharing and local integration, floors non-finite per-detection
//!   terms, and reports clamping and flooring as [`NumericalWarning`]s.
//! - [`fit`] wraps a [`FitContext`](crate::spatial::core::FitContext) and a
//!   resolved parameter table in [`SpatialModel`], which implements
//!   [`LogLikelihood`](crate::optimization::loglik_optimizer::LogLikelihood)
//!   and runs phased L-BFGS fits.
//! - [`locate`] builds normalized posterior surfaces by information type and
//!   extracts contour levels and modes from them.
//!
//! Invariants & assumptions
//! ------------------------
//! - Evaluation never mutates the context; repeated calls at the same values
//!   return identical results.
//! - The likelihood uses local sets when configured; posterior surfaces
//!   always use the whole mask.
//!
//! Testing notes
//! -------------
//! - Unit tests in each submodule cover closed-form one-point likelihoods,
//!   local/global agreement, fit-state errors and surface helpers.
//! - `tests/integration_spatial_pipeline.rs` runs data → fit → locate.

pub mod fit;
pub mod likelihood;
pub mod locate;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::fit::{ActiveSet, FitResult, SpatialModel};
pub use self::likelihood::{
    Contributions, Evaluation, NumericalWarning, detection_contributions, evaluate,
};
pub use self::locate::{InfoType, contour_levels, posterior_surface, surface_mode};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_ascr::spatial::models::prelude::*;
//
// to import the model surface in a single line.

pub mod prelude {
    pub use super::fit::{FitResult, SpatialModel};
    pub use super::likelihood::Evaluation;
    pub use super::locate::{InfoType, contour_levels, surface_mode};
}
