//! spatial — acoustic spatial capture–recapture: data, densities, models.
//!
//! Purpose
//! -------
//! Estimate animal call density from detections on an array of acoustic
//! detectors. A detection records which detectors fired and, optionally,
//! bearings, distances, signal strengths and arrival times. Density is
//! estimated by maximizing the full SCR likelihood integrated over a
//! discrete mask of candidate source locations.
//!
//! Key behaviors
//! -------------
//! - [`core`] validates inputs and derives geometry, unique capture patterns,
//!   local integration sets, parameter tables and start values.
//! - [`models`] assembles the likelihood, fits [`SpatialModel`] phase by
//!   phase and builds posterior location surfaces.
//! - [`errors`] defines [`ScrError`] (data and configuration) and
//!   [`ParamError`] (parameter table and transforms), both convertible into
//!   the optimizer's `OptError`.
//!
//! Conventions
//! -----------
//! - Coordinates are planar and share one length unit; density is per unit
//!   area in that unit squared.
//! - All densities are handled in log space until the final normalization of
//!   posterior surfaces.
//!
//! Downstream usage
//! ----------------
//! ```text
//! let mut model = SpatialModel::new(detectors, mask, capture, options, &overrides)?;
//! let fit = model.fit()?;
//! let surface = model.locate(0, InfoType::Combined)?;
//! ```

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    CaptureHistory, CaptureKind, DetFnKind, Detectors, FitContext, Integration, Mask,
    ModelOptions, ParamName, ParamOverrides, ParamValues, SignalStrengthOptions, SourceModel,
    SsLink,
};
pub use self::errors::{ParamError, ParamResult, ScrError, ScrResult};
pub use self::models::{FitResult, InfoType, SpatialModel};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_ascr::spatial::prelude::*;
//
// to import the data, configuration and model surface in a single line.

pub mod prelude {
    pub use super::core::prelude::*;
    pub use super::errors::{ParamError, ScrError};
    pub use super::models::prelude::*;
}
