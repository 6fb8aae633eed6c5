//! core — per-fit data, geometry, parameters and densities.
//!
//! Purpose
//! -------
//! Collect the building blocks of a spatial capture–recapture fit: validated
//! input containers, the geometry engine, the capture compressor and local
//! selector, the resolved configuration record, the parameter transform
//! manager, and the density library (detection functions, auxiliary
//! densities, quadrature). The likelihood and posterior engines in
//! `spatial::models` are written purely in terms of these pieces.
//!
//! Key behaviors
//! -------------
//! - [`FitContext::new`] validates options against data once and derives
//!   geometry ([`Geometry`]), unique patterns ([`PatternTable`]) and local
//!   integration sets ([`LocalSets`]).
//! - [`ParamTable::resolve`] fills in bounds, phases, scale factors and start
//!   values ([`derive_start`]) around partial [`ParamOverrides`].
//! - [`DetectionFunction`] and [`AuxModel`] evaluate every density on the
//!   mask in log space.
//!
//! Invariants & assumptions
//! ------------------------
//! - Everything derived in [`FitContext`] is a pure function of the inputs
//!   and is never recomputed during optimization.
//! - Matrices indexed by detector and mask point are `(k × m)`.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based. Detections are rows and detectors are columns of
//!   every capture-history component; detector order is never changed.
//! - Bearings are compass bearings in radians, clockwise from north.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests for its own invariants; end-to-end
//!   behavior is covered by `tests/integration_spatial_pipeline.rs`.

pub mod aux_density;
pub mod compress;
pub mod context;
pub mod data;
pub mod detfn;
pub mod geometry;
pub mod local;
pub mod options;
pub mod params;
pub mod quadrature;
pub mod start_values;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::aux_density::AuxModel;
pub use self::compress::PatternTable;
pub use self::context::FitContext;
pub use self::data::{CaptureHistory, CaptureKind, Detectors, Mask};
pub use self::detfn::{DetectionFunction, DetectionSurfaces, SignalModel};
pub use self::geometry::Geometry;
pub use self::local::{LocalSets, select_local};
pub use self::options::{
    DetFnKind, Integration, ModelOptions, SignalStrengthOptions, SourceModel, SsLink,
};
pub use self::params::{
    LinkKind, ParamName, ParamOverrides, ParamSpec, ParamTable, ParamValues, Phase,
};
pub use self::quadrature::Quadrature;
pub use self::start_values::derive_start;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_ascr::spatial::core::prelude::*;
//
// to import the everyday configuration and data types in a single line.

pub mod prelude {
    pub use super::{
        CaptureHistory, CaptureKind, DetFnKind, Detectors, FitContext, Integration, Mask,
        ModelOptions, ParamName, ParamOverrides, SignalStrengthOptions, SsLink,
    };
}
