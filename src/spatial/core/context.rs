//! Immutable per-fit context.
//!
//! [`FitContext`] owns the validated inputs of one fit together with every
//! artifact derived from them before optimization starts: geometry, the
//! unique pattern table, local integration sets and per-detection
//! time-of-arrival statistics. It is built once, cross-checks the options
//! against the data, and is shared by reference with every likelihood
//! evaluation and posterior surface. Nothing in it changes afterwards.
use crate::spatial::{
    core::{
        aux_density::AuxModel,
        compress::PatternTable,
        data::{CaptureHistory, CaptureKind, Detectors, Mask},
        detfn::DetectionFunction,
        geometry::{Geometry, toa_ssq},
        local::{LocalSets, select_local},
        options::{DetFnKind, ModelOptions},
        params::ParamName,
    },
    errors::{ScrError, ScrResult},
};
use log::debug;
use ndarray::Array1;

/// Validated inputs plus derived, read-only artifacts of one fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitContext {
    pub detectors: Detectors,
    pub mask: Mask,
    pub capture: CaptureHistory,
    pub options: ModelOptions,
    pub geometry: Geometry,
    pub patterns: PatternTable,
    pub local: LocalSets,
    /// Per detection, aligned with its pattern's local set. Empty unless the
    /// time-of-arrival component is present.
    pub toa_ssq: Vec<Array1<f64>>,
}

impl FitContext {
    /// Cross-check options against data and derive every per-fit artifact.
    ///
    /// # Errors
    /// - [`ScrError::DetectorCountMismatch`] when the capture history and the
    ///   detector set disagree.
    /// - [`ScrError::MissingComponent`] / [`ScrError::IncompatibleComponent`]
    ///   when the detection function and the `signal-strength` component do
    ///   not match.
    /// - Geometry errors from [`Geometry::new`].
    pub fn new(
        detectors: Detectors, mask: Mask, capture: CaptureHistory, options: ModelOptions,
    ) -> ScrResult<Self> {
        if capture.n_detectors() != detectors.len() {
            return Err(ScrError::DetectorCountMismatch {
                component: "binary",
                expected: detectors.len(),
                found: capture.n_detectors(),
            });
        }
        let has_ss = capture.has(CaptureKind::SignalStrength);
        match (options.detfn, has_ss) {
            (DetFnKind::SignalStrength, false) => {
                return Err(ScrError::MissingComponent {
                    component: "signal-strength",
                    reason: "the signal-strength detection function needs recorded strengths.",
                });
            }
            (kind, true) if kind != DetFnKind::SignalStrength => {
                return Err(ScrError::IncompatibleComponent {
                    component: "signal-strength",
                    reason: "recorded strengths require the signal-strength detection function.",
                });
            }
            _ => {}
        }

        let geometry = Geometry::new(&detectors, &mask)?;
        let patterns = PatternTable::from_binary(capture.binary());
        let local = select_local(&patterns, &geometry.distances, mask.buffer, options.integration);

        let toa_ssq = match capture.get(CaptureKind::TimeOfArrival) {
            Some(arrivals) => (0..capture.n_detections())
                .map(|i| {
                    let p = patterns.row_to_pattern[i];
                    toa_ssq(
                        arrivals.row(i),
                        &patterns.fired[p],
                        &geometry.distances,
                        &local.points[p],
                        options.sound_speed,
                    )
                })
                .collect(),
            None => Vec::new(),
        };

        debug!(
            "fit context: {} detections, {} unique patterns, {} mask points, mean local set {:.1}, colocated = {}",
            capture.n_detections(),
            patterns.n_patterns(),
            mask.len(),
            local.mean_size(),
            geometry.colocated,
        );
        Ok(Self { detectors, mask, capture, options, geometry, patterns, local, toa_ssq })
    }

    /// Every parameter of the configured model: `D`, the detection
    /// function's parameters, then auxiliary parameters.
    pub fn param_names(&self) -> Vec<ParamName> {
        let mut names = vec![ParamName::D];
        names.extend(DetectionFunction::param_names(
            self.options.detfn,
            self.options.ss_options.as_ref(),
        ));
        names.extend(AuxModel::param_names(&self.capture.kinds()));
        names
    }

    /// True when identical binary patterns carry distinct per-detection
    /// measurements and must be evaluated detection by detection.
    pub fn per_detection(&self) -> bool {
        self.capture.kinds().iter().any(|k| *k != CaptureKind::Binary)
    }

    pub fn n_detections(&self) -> usize {
        self.capture.n_detections()
    }
}
