//! Posterior location engine.
//!
//! Builds, for one detection and a fitted parameter set, a mask-indexed
//! surface proportional to the posterior probability that the individual
//! was at each mask point, from one information source or all of them
//! combined. Surfaces are evaluated over the whole mask (never the local
//! sets), in log space, and normalized so that `Σ surface · a = 1`.
//!
//! For signal-strength models the `SignalStrength` surface is the joint
//! density of the detection pattern and recorded strengths, and it replaces
//! the capture term in the combined surface.
use crate::{
    optimization::errors::OptResult,
    spatial::{
        core::{
            context::FitContext, data::CaptureKind, geometry::toa_ssq, params::ParamValues,
        },
        errors::{ScrError, ScrResult},
        models::likelihood::Terms,
    },
};
use ndarray::Array1;
use std::str::FromStr;

/// Information used to build a posterior surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoType {
    Capture,
    Bearing,
    Distance,
    SignalStrength,
    TimeOfArrival,
    Combined,
}

impl InfoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::Capture => "capture",
            InfoType::Bearing => "bearing",
            InfoType::Distance => "distance",
            InfoType::SignalStrength => "signal-strength",
            InfoType::TimeOfArrival => "time-of-arrival",
            InfoType::Combined => "combined",
        }
    }
}

impl FromStr for InfoType {
    type Err = ScrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "capture" | "capt" | "bincapt" => Ok(InfoType::Capture),
            "bearing" => Ok(InfoType::Bearing),
            "distance" | "dist" => Ok(InfoType::Distance),
            "signal-strength" | "ss" => Ok(InfoType::SignalStrength),
            "time-of-arrival" | "toa" => Ok(InfoType::TimeOfArrival),
            "combined" => Ok(InfoType::Combined),
            _ => Err(ScrError::UnknownInfoType { name: s.to_string() }),
        }
    }
}

/// Normalized posterior surface of `detection` over the whole mask.
///
/// # Errors
/// - [`ScrError::UnknownDetection`] for an out-of-range index.
/// - [`ScrError::InfoTypeUnavailable`] when the model has no such
///   information.
/// - Parameter errors when `values` lacks a model parameter.
pub fn posterior_surface(
    ctx: &FitContext, values: &ParamValues, detection: usize, info: InfoType,
) -> OptResult<Array1<f64>> {
    let n = ctx.n_detections();
    if detection >= n {
        return Err(ScrError::UnknownDetection { index: detection, n_detections: n }.into());
    }
    let terms = Terms::new(ctx, values)?;
    let points: Vec<usize> = (0..ctx.mask.len()).collect();
    let p = ctx.patterns.row_to_pattern[detection];
    let pattern = &ctx.patterns.patterns[p];
    let fired = &ctx.patterns.fired[p];

    let ssq = match ctx.capture.get(CaptureKind::TimeOfArrival) {
        Some(arrivals) => Some(toa_ssq(
            arrivals.row(detection),
            fired,
            &ctx.geometry.distances,
            &points,
            ctx.options.sound_speed,
        )),
        None => None,
    };
    let component = |kind: CaptureKind| -> ScrResult<Array1<f64>> {
        if !ctx.capture.has(kind) {
            return Err(ScrError::InfoTypeUnavailable {
                info: kind.as_str(),
                reason: "the capture history has no such component.",
            });
        }
        Ok(terms.aux.ln_component(
            kind,
            &ctx.capture,
            &ctx.geometry,
            detection,
            fired,
            &points,
            ssq.as_ref(),
        ))
    };

    let ln_surface = match info {
        InfoType::Capture => {
            Array1::from_iter(points.iter().map(|&x| terms.surfaces.ln_capture(pattern, x)))
        }
        InfoType::SignalStrength => {
            if terms.detfn.signal_model().is_none() {
                return Err(ScrError::InfoTypeUnavailable {
                    info: "signal-strength",
                    reason: "the model does not use the signal-strength detection function.",
                }
                .into());
            }
            terms.ln_capture(detection, &points)
        }
        InfoType::Bearing => component(CaptureKind::Bearing)?,
        InfoType::Distance => component(CaptureKind::Distance)?,
        InfoType::TimeOfArrival => component(CaptureKind::TimeOfArrival)?,
        InfoType::Combined => {
            terms.ln_capture(detection, &points) + terms.ln_aux(detection, &points, ssq.as_ref())
        }
    };
    Ok(normalize(ln_surface, ctx.mask.cell_area))
}

/// Density thresholds whose super-level sets contain each of `probs`.
///
/// `surface` must be normalized so that `Σ surface · cell_area = 1`.
///
/// # Errors
/// [`ScrError::InvalidProbability`] for probabilities outside `(0, 1]`.
pub fn contour_levels(surface: &Array1<f64>, cell_area: f64, probs: &[f64]) -> ScrResult<Vec<f64>> {
    if let Some(&value) = probs.iter().find(|&&q| !(q > 0.0 && q <= 1.0)) {
        return Err(ScrError::InvalidProbability { value });
    }
    let mut sorted: Vec<f64> = surface.iter().copied().collect();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let mut cumulative = Vec::with_capacity(sorted.len());
    let mut acc = 0.0;
    for &v in &sorted {
        acc += v * cell_area;
        cumulative.push(acc);
    }
    Ok(probs
        .iter()
        .map(|&q| {
            let idx = cumulative
                .iter()
                .position(|&c| c >= q - 1e-12)
                .unwrap_or(sorted.len().saturating_sub(1));
            sorted.get(idx).copied().unwrap_or(f64::NAN)
        })
        .collect())
}

/// Index of the largest value of a surface.
pub fn surface_mode(surface: &Array1<f64>) -> Option<usize> {
    surface
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

// ---- Helper Methods ----

fn normalize(ln_surface: Array1<f64>, cell_area: f64) -> Array1<f64> {
    let max = ln_surface.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return Array1::from_elem(ln_surface.len(), 1.0 / (ln_surface.len() as f64 * cell_area));
    }
    let unnorm = ln_surface.mapv(|v| (v - max).exp());
    let total = unnorm.sum() * cell_area;
    unnorm / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Info-type parsing.
    // - Contour levels and the surface mode on a hand-built surface.
    // - Probability validation.
    // Surfaces from fitted contexts are covered in the integration tests.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Information types parse from short and long names.
    //
    // Given
    // -----
    // - "toa", "Signal_Strength", "capt", "gps".
    //
    // Expect
    // ------
    // - Matching variants; "gps" is `UnknownInfoType`.
    fn info_type_parses_names() {
        assert_eq!("toa".parse::<InfoType>().unwrap(), InfoType::TimeOfArrival);
        assert_eq!("Signal_Strength".parse::<InfoType>().unwrap(), InfoType::SignalStrength);
        assert_eq!("capt".parse::<InfoType>().unwrap(), InfoType::Capture);
        assert!(matches!("gps".parse::<InfoType>(), Err(ScrError::UnknownInfoType { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Contour levels pick the smallest density whose super-level set
    // reaches each probability.
    //
    // Given
    // -----
    // - Surface (0.1, 0.5, 0.3, 0.1) with unit cells.
    //
    // Expect
    // ------
    // - 50% → 0.5, 80% → 0.3, 100% → 0.1; mode at index 1.
    fn contour_levels_follow_cumulative_mass() {
        let surface = array![0.1, 0.5, 0.3, 0.1];
        let levels = contour_levels(&surface, 1.0, &[0.5, 0.8, 1.0]).unwrap();
        assert_relative_eq!(levels[0], 0.5);
        assert_relative_eq!(levels[1], 0.3);
        assert_relative_eq!(levels[2], 0.1);
        assert_eq!(surface_mode(&surface), Some(1));
    }

    #[test]
    // Purpose
    // -------
    // Probabilities outside (0, 1] are rejected.
    //
    // Given
    // -----
    // - 0.0 and 1.5.
    //
    // Expect
    // ------
    // - `InvalidProbability`.
    fn contour_levels_reject_invalid_probabilities() {
        let surface = array![0.5, 0.5];
        assert_eq!(
            contour_levels(&surface, 1.0, &[0.0]).unwrap_err(),
            ScrError::InvalidProbability { value: 0.0 }
        );
        assert!(contour_levels(&surface, 1.0, &[1.5]).is_err());
    }

    #[test]
    // Purpose
    // -------
    // Normalization makes the surface integrate to one.
    //
    // Given
    // -----
    // - Log values (0, ln 3) with cell area 2.
    //
    // Expect
    // ------
    // - (1/8, 3/8).
    fn normalize_integrates_to_one() {
        let s = normalize(array![0.0, 3.0_f64.ln()], 2.0);
        assert_relative_eq!(s[0], 0.125, epsilon = 1e-14);
        assert_relative_eq!(s[1], 0.375, epsilon = 1e-14);
    }
}
