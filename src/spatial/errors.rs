//! Errors for spatial capture–recapture models (data validation, option
//! checks, parameter-table resolution, and fit-state misuse).
//!
//! This module defines a model error type, [`ScrError`], and a parameter error
//! type, [`ParamError`], used across the Rust core and the optional Python
//! bindings. Both implement `Display`/`Error`; with the `python-bindings`
//! feature they convert into a Python `ValueError`.
//!
//! ## Conventions
//! - **Indices are 0-based**: detections are rows and detectors are columns
//!   of every capture-history component.
//! - Every message names the offending component, option or parameter.
//! - Numerical trouble during a likelihood evaluation is *not* reported here;
//!   it is clamped and recorded as a warning on the evaluation itself.
use crate::spatial::core::params::{LinkKind, ParamName};

/// Crate-wide result alias for spatial model operations that may produce
/// [`ScrError`].
pub type ScrResult<T> = Result<T, ScrError>;

/// Result alias for parameter-table paths that may produce [`ParamError`].
pub type ParamResult<T> = Result<T, ParamError>;

/// Unified error type for spatial capture–recapture modeling.
///
/// Covers coordinate and capture-history validation (data errors),
/// option cross-checks (configuration errors) and misuse of a model that has
/// not been fitted yet.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrError {
    // ---- Coordinates ----
    /// Coordinate array has no rows.
    EmptyCoordinates { component: &'static str },

    /// Coordinate array does not have the expected number of columns.
    CoordinateDim { component: &'static str, expected: usize, found: usize },

    /// Two coordinate arrays have different dimensionality.
    DimensionMismatch { left: usize, right: usize },

    /// A coordinate is NaN/±inf.
    NonFiniteCoordinate { component: &'static str, row: usize, value: f64 },

    /// Cell area must be finite and > 0.
    InvalidCellArea { value: f64 },

    /// Buffer must be non-negative (and not NaN).
    InvalidBuffer { value: f64 },

    // ---- Capture history ----
    /// The mandatory `binary` component is absent.
    MissingBinary,

    /// Capture history has no detections.
    EmptyCaptureHistory,

    /// Unknown capture component name.
    UnknownCaptureKind { name: String },

    /// Component has a different number of rows than `binary`.
    ComponentRowMismatch { component: &'static str, expected: usize, found: usize },

    /// Component has a different number of columns than there are detectors.
    DetectorCountMismatch { component: &'static str, expected: usize, found: usize },

    /// A `binary` entry is not 0 or 1.
    NonBinaryValue { row: usize, col: usize, value: f64 },

    /// A detection row in which no detector fired.
    ZeroDetectionRow { row: usize },

    /// A capture-history entry is NaN/±inf.
    NonFiniteCapture { component: &'static str, row: usize, col: usize, value: f64 },

    // ---- Options ----
    /// Unknown detection-function name.
    UnknownDetFn { name: String },

    /// Unknown signal-strength link name.
    UnknownSsLink { name: String },

    /// Unknown posterior information type.
    UnknownInfoType { name: String },

    /// Signal-strength cutoffs must be finite with lower < upper.
    InvalidCutoff { cutoff: f64, lower_cutoff: Option<f64>, reason: &'static str },

    /// Directional calling and heterogeneous source strength were both requested.
    DirectionalAndHeterogeneous,

    /// A quadrature-point count of zero.
    ZeroQuadPoints { option: &'static str },

    /// Signal-strength detection function configured without signal options.
    MissingSignalOptions,

    /// Signal options supplied for a non signal-strength detection function.
    UnexpectedSignalOptions { detfn: &'static str },

    /// Sound speed must be finite and > 0.
    InvalidSoundSpeed { value: f64 },

    /// A component the configuration needs is missing from the capture history.
    MissingComponent { component: &'static str, reason: &'static str },

    /// A component is present that the configuration cannot use.
    IncompatibleComponent { component: &'static str, reason: &'static str },

    // ---- Fit state / location ----
    /// Model hasn't been fitted yet.
    ModelNotFitted,

    /// Requested detection index is out of range.
    UnknownDetection { index: usize, n_detections: usize },

    /// Requested posterior information type has no supporting component.
    InfoTypeUnavailable { info: &'static str, reason: &'static str },

    /// Contour probability must lie in (0, 1].
    InvalidProbability { value: f64 },
}

impl std::error::Error for ScrError {}

impl std::fmt::Display for ScrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Coordinates ----
            ScrError::EmptyCoordinates { component } => {
                write!(f, "{component} coordinates are empty.")
            }
            ScrError::CoordinateDim { component, expected, found } => {
                write!(f, "{component} coordinates must have {expected} columns; got {found}.")
            }
            ScrError::DimensionMismatch { left, right } => {
                write!(f, "Coordinate dimensionality mismatch: {left} vs {right} columns.")
            }
            ScrError::NonFiniteCoordinate { component, row, value } => {
                write!(f, "{component} coordinate at row {row} is non-finite: {value}")
            }
            ScrError::InvalidCellArea { value } => {
                write!(f, "Mask cell area must be finite and > 0; got: {value}")
            }
            ScrError::InvalidBuffer { value } => {
                write!(f, "Mask buffer must be >= 0; got: {value}")
            }
            // ---- Capture history ----
            ScrError::MissingBinary => {
                write!(f, "Capture history must contain a 'binary' component.")
            }
            ScrError::EmptyCaptureHistory => {
                write!(f, "Capture history contains no detections.")
            }
            ScrError::UnknownCaptureKind { name } => {
                write!(f, "Unknown capture component '{name}'.")
            }
            ScrError::ComponentRowMismatch { component, expected, found } => {
                write!(
                    f,
                    "Capture component '{component}' has {found} detections; expected {expected}."
                )
            }
            ScrError::DetectorCountMismatch { component, expected, found } => {
                write!(
                    f,
                    "Capture component '{component}' has {found} columns; expected {expected} detectors."
                )
            }
            ScrError::NonBinaryValue { row, col, value } => {
                write!(f, "Capture component 'binary' has non 0/1 value {value} at ({row}, {col}).")
            }
            ScrError::ZeroDetectionRow { row } => {
                write!(f, "Capture component 'binary' row {row} has no detections.")
            }
            ScrError::NonFiniteCapture { component, row, col, value } => {
                write!(f, "Capture component '{component}' has non-finite value {value} at ({row}, {col}).")
            }
            // ---- Options ----
            ScrError::UnknownDetFn { name } => {
                write!(f, "Unknown detection function '{name}'; valid options are hn, hr, th, lth, ss.")
            }
            ScrError::UnknownSsLink { name } => {
                write!(f, "Unknown signal-strength link '{name}'; valid options are identity, log, spherical.")
            }
            ScrError::UnknownInfoType { name } => {
                write!(f, "Unknown posterior information type '{name}'.")
            }
            ScrError::InvalidCutoff { cutoff, lower_cutoff, reason } => match lower_cutoff {
                Some(lower) => write!(
                    f,
                    "Invalid signal-strength cutoffs (cutoff = {cutoff}, lower_cutoff = {lower}): {reason}"
                ),
                None => write!(f, "Invalid signal-strength cutoff {cutoff}: {reason}"),
            },
            ScrError::DirectionalAndHeterogeneous => {
                write!(f, "Options 'directional' and 'het_source' cannot both be enabled.")
            }
            ScrError::ZeroQuadPoints { option } => {
                write!(f, "Option '{option}' must be greater than zero.")
            }
            ScrError::MissingSignalOptions => {
                write!(f, "Detection function 'ss' requires signal-strength options.")
            }
            ScrError::UnexpectedSignalOptions { detfn } => {
                write!(f, "Signal-strength options given for detection function '{detfn}'.")
            }
            ScrError::InvalidSoundSpeed { value } => {
                write!(f, "Option 'sound_speed' must be finite and > 0; got: {value}")
            }
            ScrError::MissingComponent { component, reason } => {
                write!(f, "Capture component '{component}' is required: {reason}")
            }
            ScrError::IncompatibleComponent { component, reason } => {
                write!(f, "Capture component '{component}' cannot be used: {reason}")
            }
            // ---- Fit state / location ----
            ScrError::ModelNotFitted => {
                write!(f, "Model hasn't been fitted yet.")
            }
            ScrError::UnknownDetection { index, n_detections } => {
                write!(f, "Detection index {index} out of range for {n_detections} detections.")
            }
            ScrError::InfoTypeUnavailable { info, reason } => {
                write!(f, "Posterior information type '{info}' unavailable: {reason}")
            }
            ScrError::InvalidProbability { value } => {
                write!(f, "Contour probability must lie in (0, 1]; got: {value}")
            }
        }
    }
}

/// Errors raised while resolving or transforming model parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// Value lies on or outside the domain of the parameter's link.
    DomainError { name: ParamName, value: f64, link: LinkKind },

    /// Lower bound is not strictly below the upper bound.
    InvertedBounds { name: ParamName, lower: f64, upper: f64 },

    /// Start (or fixed) value lies outside the bounds.
    StartOutOfBounds { name: ParamName, value: f64, lower: f64, upper: f64 },

    /// Override names a parameter the configured model does not use.
    NotApplicable { name: ParamName },

    /// Unknown parameter name.
    UnknownParam { name: String },

    /// No start value was supplied and none could be derived.
    MissingStart { name: ParamName },

    /// A parameter needed for evaluation has no value.
    MissingValue { name: ParamName },

    /// Scale factor must be finite and > 0.
    InvalidScaleFactor { name: ParamName, value: f64 },

    /// Phase numbers start at 1.
    InvalidPhase { name: ParamName, phase: u32 },

    /// Theta length mismatch for the active parameter set.
    ThetaLengthMismatch { expected: usize, actual: usize },

    /// Unconstrained optimization input must have finite values.
    InvalidThetaInput { index: usize, value: f64 },
}

impl std::error::Error for ParamError {}

impl std::fmt::Display for ParamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamError::DomainError { name, value, link } => {
                write!(
                    f,
                    "Parameter '{name}' value {value} is outside the {} link domain: {}",
                    link.as_str(),
                    link.domain_message()
                )
            }
            ParamError::InvertedBounds { name, lower, upper } => {
                write!(f, "Parameter '{name}' bounds must satisfy lower < upper; got [{lower}, {upper}]")
            }
            ParamError::StartOutOfBounds { name, value, lower, upper } => {
                write!(f, "Parameter '{name}' start value {value} lies outside [{lower}, {upper}]")
            }
            ParamError::NotApplicable { name } => {
                write!(f, "Parameter '{name}' is not used by the configured model")
            }
            ParamError::UnknownParam { name } => {
                write!(f, "Unknown parameter name '{name}'")
            }
            ParamError::MissingStart { name } => {
                write!(f, "Parameter '{name}' has no start value and none can be derived")
            }
            ParamError::MissingValue { name } => {
                write!(f, "Parameter '{name}' has no value")
            }
            ParamError::InvalidScaleFactor { name, value } => {
                write!(f, "Parameter '{name}' scale factor must be finite and > 0, got {value}")
            }
            ParamError::InvalidPhase { name, phase } => {
                write!(f, "Parameter '{name}' phase must be >= 1, got {phase}")
            }
            ParamError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Theta length mismatch: expected {expected}, got {actual}")
            }
            ParamError::InvalidThetaInput { index, value } => {
                write!(f, "Theta input at index {index} must be finite, got {value}")
            }
        }
    }
}

#[cfg(feature = "python-bindings")]
impl From<ScrError> for pyo3::PyErr {
    fn from(err: ScrError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

#[cfg(feature = "python-bindings")]
impl From<ParamError> for pyo3::PyErr {
    fn from(err: ParamError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
