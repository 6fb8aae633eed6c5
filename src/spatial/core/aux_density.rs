//! Auxiliary conditional densities of per-detection measurements.
//!
//! Each density is evaluated for one detection at a set of mask points,
//! conditioned on which detectors fired, and combined across firing
//! detectors as a product (sum in log space):
//!
//! - bearing: von Mises around the true compass bearing, concentration `κ`;
//! - distance: gamma with shape `α` and rate `α / d(j, x)`;
//! - time of arrival: `(2πσ²)^{(1−k)/2} · exp(−ssq / (2σ²))` from the
//!   precomputed residual sum of squares, `k` firing detectors (unit density
//!   when `k < 2`);
//! - known distance: indicator that the recorded distance is within half a
//!   cell width of the true distance.
//!
//! Signal strength is part of the detection surfaces and lives in `detfn`.
//! The log forms are used by the likelihood; linear wrappers are provided
//! for inspection.
use crate::{
    optimization::numerical_stability::transformations::LOG_DENSITY_FLOOR,
    spatial::{
        core::{
            data::{CaptureHistory, CaptureKind},
            geometry::Geometry,
            params::{ParamName, ParamValues},
        },
        errors::ParamResult,
    },
};
use ndarray::Array1;
use statrs::function::gamma::ln_gamma;
use std::f64::consts::TAU;

/// `ln I₀(x)`, modified Bessel function of the first kind, order zero.
///
/// Polynomial approximations of Abramowitz & Stegun 9.8.1–9.8.2 (relative
/// error below 2e-7).
pub fn ln_bessel_i0(x: f64) -> f64 {
    let ax = x.abs();
    if ax <= 3.75 {
        let t = (ax / 3.75).powi(2);
        let poly = 1.0
            + t * (3.515_622_9
                + t * (3.089_942_4
                    + t * (1.206_749_2 + t * (0.265_973_2 + t * (0.036_076_8 + t * 0.004_581_3)))));
        poly.ln()
    } else {
        let t = 3.75 / ax;
        let poly = 0.398_942_28
            + t * (0.013_285_92
                + t * (0.002_253_19
                    + t * (-0.001_575_65
                        + t * (0.009_162_81
                            + t * (-0.020_577_06
                                + t * (0.026_355_37 + t * (-0.016_476_33 + t * 0.003_923_77)))))));
        ax - 0.5 * ax.ln() + poly.ln()
    }
}

/// Von Mises log density of `observed` around `mean`.
#[inline]
pub fn ln_von_mises(observed: f64, mean: f64, kappa: f64) -> f64 {
    kappa * (observed - mean).cos() - TAU.ln() - ln_bessel_i0(kappa)
}

/// Gamma log density of a recorded distance with shape `alpha` and mean
/// `true_distance`.
#[inline]
pub fn ln_gamma_distance(observed: f64, true_distance: f64, alpha: f64) -> f64 {
    if true_distance <= 0.0 || observed <= 0.0 {
        return LOG_DENSITY_FLOOR;
    }
    let rate = alpha / true_distance;
    alpha * rate.ln() - ln_gamma(alpha) + (alpha - 1.0) * observed.ln() - rate * observed
}

/// Time-of-arrival log density for `k` firing detectors.
#[inline]
pub fn ln_toa(ssq: f64, k: usize, sigma: f64) -> f64 {
    if k < 2 {
        return 0.0;
    }
    let var = sigma * sigma;
    0.5 * (1.0 - k as f64) * (TAU * var).ln() - ssq / (2.0 * var)
}

/// Known-distance log indicator.
#[inline]
pub fn ln_known_distance(observed: f64, true_distance: f64, half_cell: f64) -> f64 {
    if (true_distance - observed).abs() <= half_cell { 0.0 } else { f64::NEG_INFINITY }
}

pub fn von_mises_density(observed: f64, mean: f64, kappa: f64) -> f64 {
    ln_von_mises(observed, mean, kappa).exp()
}

pub fn gamma_distance_density(observed: f64, true_distance: f64, alpha: f64) -> f64 {
    ln_gamma_distance(observed, true_distance, alpha).exp()
}

pub fn toa_density(ssq: f64, k: usize, sigma: f64) -> f64 {
    ln_toa(ssq, k, sigma).exp()
}

/// Auxiliary measurement model for the components present in a fit.
///
/// A field is `Some` exactly when the matching component is present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuxModel {
    pub kappa: Option<f64>,
    pub alpha: Option<f64>,
    pub sigma_toa: Option<f64>,
    pub known_distance: bool,
    pub half_cell: f64,
}

impl AuxModel {
    /// Parameters required by the auxiliary components in `kinds`.
    pub fn param_names(kinds: &[CaptureKind]) -> Vec<ParamName> {
        kinds
            .iter()
            .filter_map(|k| match k {
                CaptureKind::Bearing => Some(ParamName::Kappa),
                CaptureKind::Distance => Some(ParamName::Alpha),
                CaptureKind::TimeOfArrival => Some(ParamName::SigmaToa),
                _ => None,
            })
            .collect()
    }

    pub fn from_values(
        capture: &CaptureHistory, values: &ParamValues, half_cell: f64,
    ) -> ParamResult<Self> {
        let pick = |kind: CaptureKind, name: ParamName| -> ParamResult<Option<f64>> {
            if capture.has(kind) { values.require(name).map(Some) } else { Ok(None) }
        };
        Ok(Self {
            kappa: pick(CaptureKind::Bearing, ParamName::Kappa)?,
            alpha: pick(CaptureKind::Distance, ParamName::Alpha)?,
            sigma_toa: pick(CaptureKind::TimeOfArrival, ParamName::SigmaToa)?,
            known_distance: capture.has(CaptureKind::KnownDistance),
            half_cell,
        })
    }

    /// True when any per-detection measurement enters the likelihood.
    pub fn is_active(&self) -> bool {
        self.kappa.is_some() || self.alpha.is_some() || self.sigma_toa.is_some() || self.known_distance
    }

    /// Joint log density of the auxiliary measurements of `detection` at
    /// each of `points`.
    ///
    /// `toa_ssq`, when given, is aligned with `points`.
    pub fn ln_density(
        &self, capture: &CaptureHistory, geometry: &Geometry, detection: usize, fired: &[usize],
        points: &[usize], toa_ssq: Option<&Array1<f64>>,
    ) -> Array1<f64> {
        let mut out = Array1::zeros(points.len());
        if let (Some(kappa), Some(obs)) = (self.kappa, capture.row(CaptureKind::Bearing, detection)) {
            for (o, &x) in out.iter_mut().zip(points) {
                *o += fired
                    .iter()
                    .map(|&j| ln_von_mises(obs[j], geometry.bearings[[j, x]], kappa))
                    .sum::<f64>();
            }
        }
        if let (Some(alpha), Some(obs)) = (self.alpha, capture.row(CaptureKind::Distance, detection)) {
            for (o, &x) in out.iter_mut().zip(points) {
                *o += fired
                    .iter()
                    .map(|&j| ln_gamma_distance(obs[j], geometry.distances[[j, x]], alpha))
                    .sum::<f64>();
            }
        }
        if let (Some(sigma), Some(ssq)) = (self.sigma_toa, toa_ssq) {
            for (o, &s) in out.iter_mut().zip(ssq.iter()) {
                *o += ln_toa(s, fired.len(), sigma);
            }
        }
        if self.known_distance {
            if let Some(obs) = capture.row(CaptureKind::KnownDistance, detection) {
                for (o, &x) in out.iter_mut().zip(points) {
                    *o += fired
                        .iter()
                        .map(|&j| ln_known_distance(obs[j], geometry.distances[[j, x]], self.half_cell))
                        .sum::<f64>();
                }
            }
        }
        out
    }

    /// Log density of one component alone; zero when the component is not
    /// part of the model.
    pub fn ln_component(
        &self, kind: CaptureKind, capture: &CaptureHistory, geometry: &Geometry, detection: usize,
        fired: &[usize], points: &[usize], toa_ssq: Option<&Array1<f64>>,
    ) -> Array1<f64> {
        let only = AuxModel {
            kappa: self.kappa.filter(|_| kind == CaptureKind::Bearing),
            alpha: self.alpha.filter(|_| kind == CaptureKind::Distance),
            sigma_toa: self.sigma_toa.filter(|_| kind == CaptureKind::TimeOfArrival),
            known_distance: self.known_distance && kind == CaptureKind::KnownDistance,
            half_cell: self.half_cell,
        };
        only.ln_density(capture, geometry, detection, fired, points, toa_ssq)
    }
}
