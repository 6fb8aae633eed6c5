//! Model options — the resolved configuration record of a fit.
//!
//! Purpose
//! -------
//! Collect every configuration knob of a spatial capture–recapture fit in
//! one place: the detection-function family, signal-strength settings,
//! sound speed, integration mode, and optimizer options. Toggles that change
//! which code paths run (directional calling, heterogeneous source strength)
//! are resolved once into explicit variants so hot numeric loops never test
//! option flags.
//!
//! Key behaviors
//! -------------
//! - [`DetFnKind`] and [`SsLink`] parse short and long names.
//! - [`SignalStrengthOptions::new`] validates cutoffs and resolves the
//!   directional / heterogeneous toggles into a [`SourceModel`].
//! - [`ModelOptions::new`] checks that signal options are given exactly when
//!   the signal-strength detection function is selected.
//!
//! Invariants & assumptions
//! ------------------------
//! - Constructed options are internally consistent; cross-checks against the
//!   capture history happen in `FitContext::new`.
//!
//! Conventions
//! -----------
//! - Sound speed is in distance units per time unit of the arrival times.
//!
//! Testing notes
//! -------------
//! - Unit tests cover parsing, every configuration error, and defaults.
use crate::{
    optimization::loglik_optimizer::MLEOptions,
    spatial::errors::{ScrError, ScrResult},
};
use std::str::FromStr;

/// Default speed of sound in air (metres per second).
pub const DEFAULT_SOUND_SPEED: f64 = 330.0;

/// Default number of call directions integrated over.
pub const DEFAULT_DIR_QUADPOINTS: usize = 8;

/// Default number of Gauss–Hermite nodes for source-strength heterogeneity.
pub const DEFAULT_HET_SOURCE_QUADPOINTS: usize = 15;

/// Detection-function family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetFnKind {
    HalfNormal,
    HazardRate,
    Threshold,
    LogThreshold,
    SignalStrength,
}

impl DetFnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetFnKind::HalfNormal => "hn",
            DetFnKind::HazardRate => "hr",
            DetFnKind::Threshold => "th",
            DetFnKind::LogThreshold => "lth",
            DetFnKind::SignalStrength => "ss",
        }
    }
}

impl FromStr for DetFnKind {
    type Err = ScrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', ' '], "-").as_str() {
            "hn" | "half-normal" | "halfnormal" => Ok(DetFnKind::HalfNormal),
            "hr" | "hazard-rate" | "hazardrate" => Ok(DetFnKind::HazardRate),
            "th" | "threshold" => Ok(DetFnKind::Threshold),
            "lth" | "log-threshold" | "logthreshold" => Ok(DetFnKind::LogThreshold),
            "ss" | "signal-strength" | "signalstrength" => Ok(DetFnKind::SignalStrength),
            _ => Err(ScrError::UnknownDetFn { name: s.to_string() }),
        }
    }
}

/// Link between distance and expected received signal strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SsLink {
    Identity,
    Log,
    Spherical,
}

impl FromStr for SsLink {
    type Err = ScrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "identity" => Ok(SsLink::Identity),
            "log" => Ok(SsLink::Log),
            "spherical" => Ok(SsLink::Spherical),
            _ => Err(ScrError::UnknownSsLink { name: s.to_string() }),
        }
    }
}

/// How the source of a call is modelled, resolved once from the toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceModel {
    /// Same source strength in every direction.
    Omnidirectional,
    /// Strength depends on call direction; `n` equally spaced directions.
    Directional { n: usize },
    /// Source strength varies between calls; `n` Gauss–Hermite nodes.
    Heterogeneous { n: usize },
}

/// Signal-strength detection settings.
///
/// Fields
/// ------
/// - `link`: distance-to-strength link.
/// - `cutoff`: strength above which a call counts as detected.
/// - `lower_cutoff`: optional lower recording threshold. When set, a
///   detector records the call above `lower_cutoff`, while the call is only
///   counted as detected when some detector exceeds `cutoff`.
/// - `source`: resolved [`SourceModel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalStrengthOptions {
    pub link: SsLink,
    pub cutoff: f64,
    pub lower_cutoff: Option<f64>,
    pub source: SourceModel,
}

impl SignalStrengthOptions {
    /// Validate cutoffs and resolve the source toggles.
    ///
    /// `n_dir_quadpoints` / `n_het_source_quadpoints` default to
    /// [`DEFAULT_DIR_QUADPOINTS`] / [`DEFAULT_HET_SOURCE_QUADPOINTS`].
    ///
    /// # Errors
    /// - [`ScrError::InvalidCutoff`] for non-finite cutoffs or
    ///   `lower_cutoff >= cutoff`.
    /// - [`ScrError::DirectionalAndHeterogeneous`] when both toggles are set.
    /// - [`ScrError::ZeroQuadPoints`] for a zero point count on an enabled toggle.
    pub fn new(
        link: SsLink, cutoff: f64, lower_cutoff: Option<f64>, directional: bool,
        het_source: bool, n_dir_quadpoints: Option<usize>, n_het_source_quadpoints: Option<usize>,
    ) -> ScrResult<Self> {
        if !cutoff.is_finite() {
            return Err(ScrError::InvalidCutoff {
                cutoff,
                lower_cutoff,
                reason: "cutoff must be finite.",
            });
        }
        if let Some(lower) = lower_cutoff {
            if !lower.is_finite() {
                return Err(ScrError::InvalidCutoff {
                    cutoff,
                    lower_cutoff,
                    reason: "lower_cutoff must be finite.",
                });
            }
            if lower >= cutoff {
                return Err(ScrError::InvalidCutoff {
                    cutoff,
                    lower_cutoff,
                    reason: "lower_cutoff must be below cutoff.",
                });
            }
        }
        let source = match (directional, het_source) {
            (true, true) => return Err(ScrError::DirectionalAndHeterogeneous),
            (true, false) => {
                let n = n_dir_quadpoints.unwrap_or(DEFAULT_DIR_QUADPOINTS);
                if n == 0 {
                    return Err(ScrError::ZeroQuadPoints { option: "n_dir_quadpoints" });
                }
                SourceModel::Directional { n }
            }
            (false, true) => {
                let n = n_het_source_quadpoints.unwrap_or(DEFAULT_HET_SOURCE_QUADPOINTS);
                if n == 0 {
                    return Err(ScrError::ZeroQuadPoints { option: "n_het_source_quadpoints" });
                }
                SourceModel::Heterogeneous { n }
            }
            (false, false) => SourceModel::Omnidirectional,
        };
        Ok(Self { link, cutoff, lower_cutoff, source })
    }

    /// Omnidirectional options with no lower cutoff.
    pub fn simple(link: SsLink, cutoff: f64) -> ScrResult<Self> {
        Self::new(link, cutoff, None, false, false, None, None)
    }
}

/// Integration domain per detection pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Integration {
    /// Whole mask for every pattern.
    Global,
    /// Points within the buffer of every firing detector.
    #[default]
    Local,
}

/// Resolved configuration for one fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    pub detfn: DetFnKind,
    pub ss_options: Option<SignalStrengthOptions>,
    pub sound_speed: f64,
    pub integration: Integration,
    pub mle_opts: MLEOptions,
}

impl ModelOptions {
    /// Build validated model options.
    ///
    /// `sound_speed` defaults to [`DEFAULT_SOUND_SPEED`].
    ///
    /// # Errors
    /// - [`ScrError::MissingSignalOptions`] / [`ScrError::UnexpectedSignalOptions`]
    ///   when `ss_options` does not match `detfn`.
    /// - [`ScrError::InvalidSoundSpeed`] for non-finite or non-positive speeds.
    pub fn new(
        detfn: DetFnKind, ss_options: Option<SignalStrengthOptions>, sound_speed: Option<f64>,
        integration: Integration, mle_opts: MLEOptions,
    ) -> ScrResult<Self> {
        match (detfn, &ss_options) {
            (DetFnKind::SignalStrength, None) => return Err(ScrError::MissingSignalOptions),
            (kind, Some(_)) if kind != DetFnKind::SignalStrength => {
                return Err(ScrError::UnexpectedSignalOptions { detfn: kind.as_str() });
            }
            _ => {}
        }
        let sound_speed = sound_speed.unwrap_or(DEFAULT_SOUND_SPEED);
        if !sound_speed.is_finite() || sound_speed <= 0.0 {
            return Err(ScrError::InvalidSoundSpeed { value: sound_speed });
        }
        Ok(Self { detfn, ss_options, sound_speed, integration, mle_opts })
    }

    /// Options for a non signal-strength detection function with defaults
    /// everywhere else.
    pub fn with_detfn(detfn: DetFnKind) -> ScrResult<Self> {
        Self::new(detfn, None, None, Integration::default(), MLEOptions::default())
    }
}
