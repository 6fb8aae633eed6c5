//! Detector, mask and capture-history containers.
//!
//! Purpose
//! -------
//! Provide small, validated containers for the inputs of a spatial
//! capture–recapture fit: detector locations, the integration mask, and the
//! capture history with its optional auxiliary measurements. This module
//! centralizes input validation so that downstream geometry, compression and
//! likelihood code can assume clean, shape-consistent data.
//!
//! Key behaviors
//! -------------
//! - [`Detectors`] and [`Mask`] enforce 2-D, finite, non-empty coordinates;
//!   the mask additionally carries its cell area and buffer distance.
//! - [`CaptureKind`] names the capture-history components and parses the
//!   names used at the Python boundary.
//! - [`CaptureHistory`] enforces the presence of `binary`, equal shapes
//!   across components, 0/1 binary entries, finite values, and at least one
//!   firing detector per detection.
//!
//! Invariants & assumptions
//! ------------------------
//! - Detector order is the capture-history column order and is never
//!   reordered.
//! - Auxiliary entries are only meaningful where the matching `binary` entry
//!   is 1; other entries are ignored, not validated against zero.
//!
//! Conventions
//! -----------
//! - Coordinates are `(n × 2)` arrays of `(x, y)` rows.
//! - Capture components are `(detections × detectors)` arrays.
//! - Bearings are radians clockwise from north; times are in the same time
//!   unit as the configured sound speed's denominator.
//!
//! Downstream usage
//! ----------------
//! - Construct these types at the boundary where raw arrays enter the crate,
//!   then hand them to `FitContext::new`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover happy paths and every data-error variant raised here.
use crate::spatial::errors::{ScrError, ScrResult};
use ndarray::{Array2, ArrayView1};
use std::{collections::BTreeMap, str::FromStr};

/// Detector locations, one `(x, y)` row per detector.
#[derive(Debug, Clone, PartialEq)]
pub struct Detectors {
    pub coords: Array2<f64>,
}

impl Detectors {
    /// Validate and wrap detector coordinates.
    ///
    /// # Errors
    /// - [`ScrError::EmptyCoordinates`] for zero rows.
    /// - [`ScrError::CoordinateDim`] unless there are exactly 2 columns.
    /// - [`ScrError::NonFiniteCoordinate`] for NaN/±inf entries.
    pub fn new(coords: Array2<f64>) -> ScrResult<Self> {
        validate_coords(&coords, "detector")?;
        Ok(Self { coords })
    }

    pub fn len(&self) -> usize {
        self.coords.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.nrows() == 0
    }
}

/// Integration mask: grid points, the area each represents, and the buffer
/// distance used by the local selector.
///
/// Invariants
/// ----------
/// - `cell_area` is finite and > 0.
/// - `buffer >= 0`; `f64::INFINITY` is accepted and means "every point is
///   local to every detector".
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub coords: Array2<f64>,
    pub cell_area: f64,
    pub buffer: f64,
}

impl Mask {
    pub fn new(coords: Array2<f64>, cell_area: f64, buffer: f64) -> ScrResult<Self> {
        validate_coords(&coords, "mask")?;
        if !cell_area.is_finite() || cell_area <= 0.0 {
            return Err(ScrError::InvalidCellArea { value: cell_area });
        }
        if buffer.is_nan() || buffer < 0.0 {
            return Err(ScrError::InvalidBuffer { value: buffer });
        }
        Ok(Self { coords, cell_area, buffer })
    }

    pub fn len(&self) -> usize {
        self.coords.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.nrows() == 0
    }

    /// Half the side length of a square cell, used as the tolerance of
    /// known-distance measurements.
    pub fn half_cell_width(&self) -> f64 {
        0.5 * self.cell_area.sqrt()
    }
}

/// Name of a capture-history component.
///
/// Ordering follows declaration order, so iterating a [`CaptureHistory`]
/// always visits `binary` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CaptureKind {
    Binary,
    Bearing,
    Distance,
    SignalStrength,
    TimeOfArrival,
    KnownDistance,
}

impl CaptureKind {
    pub const ALL: [CaptureKind; 6] = [
        CaptureKind::Binary,
        CaptureKind::Bearing,
        CaptureKind::Distance,
        CaptureKind::SignalStrength,
        CaptureKind::TimeOfArrival,
        CaptureKind::KnownDistance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureKind::Binary => "binary",
            CaptureKind::Bearing => "bearing",
            CaptureKind::Distance => "distance",
            CaptureKind::SignalStrength => "signal-strength",
            CaptureKind::TimeOfArrival => "time-of-arrival",
            CaptureKind::KnownDistance => "known-distance",
        }
    }
}

impl std::fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureKind {
    type Err = ScrError;

    /// Parse a component name (case-insensitive). Accepts the canonical
    /// hyphenated names plus the short forms `bincapt`, `bearing`, `dist`,
    /// `ss`, `toa` and `mrds`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "binary" | "bincapt" => Ok(CaptureKind::Binary),
            "bearing" => Ok(CaptureKind::Bearing),
            "distance" | "dist" => Ok(CaptureKind::Distance),
            "signal-strength" | "ss" => Ok(CaptureKind::SignalStrength),
            "time-of-arrival" | "toa" => Ok(CaptureKind::TimeOfArrival),
            "known-distance" | "mrds" => Ok(CaptureKind::KnownDistance),
            _ => Err(ScrError::UnknownCaptureKind { name: s.to_string() }),
        }
    }
}

/// Validated capture history keyed by component.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureHistory {
    components: BTreeMap<CaptureKind, Array2<f64>>,
}

impl CaptureHistory {
    /// Validate a set of capture components against the detector count.
    ///
    /// # Errors
    /// - [`ScrError::MissingBinary`] when `binary` is absent.
    /// - [`ScrError::EmptyCaptureHistory`] when `binary` has zero rows.
    /// - [`ScrError::DetectorCountMismatch`] / [`ScrError::ComponentRowMismatch`]
    ///   for shape disagreements, naming the component.
    /// - [`ScrError::NonFiniteCapture`] for NaN/±inf entries.
    /// - [`ScrError::NonBinaryValue`] / [`ScrError::ZeroDetectionRow`] for
    ///   malformed `binary` rows.
    pub fn new(
        components: BTreeMap<CaptureKind, Array2<f64>>, n_detectors: usize,
    ) -> ScrResult<Self> {
        let binary = components.get(&CaptureKind::Binary).ok_or(ScrError::MissingBinary)?;
        let n_detections = binary.nrows();
        if n_detections == 0 {
            return Err(ScrError::EmptyCaptureHistory);
        }
        for (kind, array) in &components {
            let component = kind.as_str();
            if array.ncols() != n_detectors {
                return Err(ScrError::DetectorCountMismatch {
                    component,
                    expected: n_detectors,
                    found: array.ncols(),
                });
            }
            if array.nrows() != n_detections {
                return Err(ScrError::ComponentRowMismatch {
                    component,
                    expected: n_detections,
                    found: array.nrows(),
                });
            }
            if let Some(((row, col), &value)) =
                array.indexed_iter().find(|(_, v)| !v.is_finite())
            {
                return Err(ScrError::NonFiniteCapture { component, row, col, value });
            }
        }
        for (row, values) in binary.rows().into_iter().enumerate() {
            if let Some((col, &value)) =
                values.iter().enumerate().find(|(_, v)| **v != 0.0 && **v != 1.0)
            {
                return Err(ScrError::NonBinaryValue { row, col, value });
            }
            if values.iter().all(|&v| v == 0.0) {
                return Err(ScrError::ZeroDetectionRow { row });
            }
        }
        Ok(Self { components })
    }

    /// Build from a binary matrix alone.
    pub fn binary_only(binary: Array2<f64>) -> ScrResult<Self> {
        let n_detectors = binary.ncols();
        let mut components = BTreeMap::new();
        components.insert(CaptureKind::Binary, binary);
        Self::new(components, n_detectors)
    }

    pub fn n_detections(&self) -> usize {
        self.binary().nrows()
    }

    pub fn n_detectors(&self) -> usize {
        self.binary().ncols()
    }

    pub fn binary(&self) -> &Array2<f64> {
        // Presence is checked in `new`.
        &self.components[&CaptureKind::Binary]
    }

    pub fn get(&self, kind: CaptureKind) -> Option<&Array2<f64>> {
        self.components.get(&kind)
    }

    pub fn has(&self, kind: CaptureKind) -> bool {
        self.components.contains_key(&kind)
    }

    /// Components present, in [`CaptureKind`] order.
    pub fn kinds(&self) -> Vec<CaptureKind> {
        self.components.keys().copied().collect()
    }

    /// Measurements of `kind` for one detection, if the component exists.
    pub fn row(&self, kind: CaptureKind, detection: usize) -> Option<ArrayView1<'_, f64>> {
        self.components.get(&kind).map(|a| a.row(detection))
    }
}

// ---- Helper Methods ----

fn validate_coords(coords: &Array2<f64>, component: &'static str) -> ScrResult<()> {
    if coords.nrows() == 0 {
        return Err(ScrError::EmptyCoordinates { component });
    }
    if coords.ncols() != 2 {
        return Err(ScrError::CoordinateDim { component, expected: 2, found: coords.ncols() });
    }
    if let Some(((row, _), &value)) = coords.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(ScrError::NonFiniteCoordinate { component, row, value });
    }
    Ok(())
}
