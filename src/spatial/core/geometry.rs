//! Geometry engine — distances, bearings and time-of-arrival statistics.
//!
//! Purpose
//! -------
//! Precompute every geometric quantity the density library needs, once per
//! fit: detector-to-mask distances and compass bearings, detector-to-detector
//! distances (for the colocated-array shortcut), and the time-of-arrival
//! residual sum of squares for each detection.
//!
//! Key behaviors
//! -------------
//! - [`pairwise_distances`] rejects arrays of different dimensionality before
//!   computing anything.
//! - [`compass_bearing`] returns radians in `[0, 2π)`, clockwise from north.
//! - [`toa_ssq`] evaluates `Σ_j (r_j − r̄)²` with `r_j = t_j − d_j / c` over
//!   the firing detectors, per requested mask point.
//!
//! Invariants & assumptions
//! ------------------------
//! - Output matrices are `(detectors × points)`; row order is detector order.
//! - All quantities are pure functions of their inputs and deterministic.
//!
//! Downstream usage
//! ----------------
//! - `FitContext::new` builds a [`Geometry`] once and keeps it read-only for
//!   every likelihood evaluation and posterior surface.
use crate::spatial::{
    core::data::{Detectors, Mask},
    errors::{ScrError, ScrResult},
};
use ndarray::{Array1, Array2, ArrayView1};
use std::f64::consts::TAU;

/// Precomputed detector/mask geometry for one fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// `distances[[j, x]]`: detector `j` to mask point `x`.
    pub distances: Array2<f64>,
    /// `bearings[[j, x]]`: compass bearing from detector `j` to mask point `x`.
    pub bearings: Array2<f64>,
    /// Detector-to-detector distances.
    pub detector_distances: Array2<f64>,
    /// All detectors share one location.
    pub colocated: bool,
}

impl Geometry {
    pub fn new(detectors: &Detectors, mask: &Mask) -> ScrResult<Self> {
        let distances = pairwise_distances(&detectors.coords, &mask.coords)?;
        let bearings = pairwise_bearings(&detectors.coords, &mask.coords)?;
        let detector_distances = pairwise_distances(&detectors.coords, &detectors.coords)?;
        let colocated = detector_distances.iter().all(|&d| d == 0.0);
        Ok(Self { distances, bearings, detector_distances, colocated })
    }

    pub fn n_detectors(&self) -> usize {
        self.distances.nrows()
    }

    pub fn n_points(&self) -> usize {
        self.distances.ncols()
    }

    /// Mean nearest-neighbour distance between distinct detector locations.
    ///
    /// Returns `None` for a single detector or a colocated array.
    pub fn mean_spacing(&self) -> Option<f64> {
        let k = self.detector_distances.nrows();
        let nearest: Vec<f64> = (0..k)
            .filter_map(|i| {
                self.detector_distances
                    .row(i)
                    .iter()
                    .copied()
                    .filter(|&d| d > 0.0)
                    .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.min(d))))
            })
            .collect();
        if nearest.is_empty() {
            None
        } else {
            Some(nearest.iter().sum::<f64>() / nearest.len() as f64)
        }
    }
}

/// Euclidean distances between every row of `from` and every row of `to`.
///
/// # Errors
/// [`ScrError::DimensionMismatch`] when the column counts differ.
pub fn pairwise_distances(from: &Array2<f64>, to: &Array2<f64>) -> ScrResult<Array2<f64>> {
    if from.ncols() != to.ncols() {
        return Err(ScrError::DimensionMismatch { left: from.ncols(), right: to.ncols() });
    }
    Ok(Array2::from_shape_fn((from.nrows(), to.nrows()), |(i, j)| {
        euclidean(from.row(i), to.row(j))
    }))
}

/// Compass bearings from every row of `from` to every row of `to`.
///
/// # Errors
/// [`ScrError::CoordinateDim`] unless both arrays are 2-D.
pub fn pairwise_bearings(from: &Array2<f64>, to: &Array2<f64>) -> ScrResult<Array2<f64>> {
    for (component, array) in [("detector", from), ("mask", to)] {
        if array.ncols() != 2 {
            return Err(ScrError::CoordinateDim { component, expected: 2, found: array.ncols() });
        }
    }
    Ok(Array2::from_shape_fn((from.nrows(), to.nrows()), |(i, j)| {
        compass_bearing(to[[j, 0]] - from[[i, 0]], to[[j, 1]] - from[[i, 1]])
    }))
}

/// Bearing of the displacement `(dx, dy)` in `[0, 2π)`, clockwise from north.
#[inline]
pub fn compass_bearing(dx: f64, dy: f64) -> f64 {
    let b = dx.atan2(dy);
    if b < 0.0 { b + TAU } else { b }
}

/// Time-of-arrival residual sum of squares for one detection.
///
/// For each mask point in `points`, computes `r_j = arrivals[j] − d[j, x]/c`
/// over the detectors in `fired`, and returns `Σ_j (r_j − r̄)²`. With fewer
/// than two firing detectors every entry is zero.
pub fn toa_ssq(
    arrivals: ArrayView1<'_, f64>, fired: &[usize], distances: &Array2<f64>, points: &[usize],
    sound_speed: f64,
) -> Array1<f64> {
    let k = fired.len();
    if k < 2 {
        return Array1::zeros(points.len());
    }
    let mut residuals = vec![0.0; k];
    Array1::from_iter(points.iter().map(|&x| {
        for (r, &j) in residuals.iter_mut().zip(fired) {
            *r = arrivals[j] - distances[[j, x]] / sound_speed;
        }
        let mean = residuals.iter().sum::<f64>() / k as f64;
        residuals.iter().map(|r| (r - mean).powi(2)).sum()
    }))
}

// ---- Helper Methods ----

#[inline]
fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(p, q)| (p - q).powi(2)).sum::<f64>().sqrt()
}
