//! Parameter transform manager — names, links, bounds, phases, scale factors.
//!
//! Purpose
//! -------
//! Own everything that sits between natural-scale model parameters and the
//! unconstrained vector the optimizer moves. Each parameter has a link
//! transform, box bounds on the natural scale, an estimation phase (or is
//! fixed), and a scale factor that conditions the optimizer's steps.
//!
//! Key behaviors
//! -------------
//! - [`LinkKind`] maps natural ↔ link scale (identity, log, logit) and fails
//!   with [`ParamError::DomainError`] on domain boundaries.
//! - [`ParamTable::resolve`] merges user [`ParamOverrides`] with automatic
//!   defaults: explicit overrides always win, `D` is resolved last, and a
//!   parameter with no start value is a fatal error.
//! - Default scale factors are `max_k |η_k| / |η_i|` over estimated link
//!   starts `η`, with non-finite results replaced by 1.
//! - [`ParamTable::to_theta`] / [`ParamTable::apply_theta`] map between
//!   natural values and the optimizer vector `θ_i = link(x_i) · sf_i` for a
//!   given active set.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every resolved start value lies within its bounds and the link is
//!   invertible there.
//! - The manager is stateless given a parameter name and a value; a
//!   [`ParamTable`] is immutable after resolution.
//!
//! Conventions
//! -----------
//! - [`ParamValues`] is a dense, name-indexed store; absent parameters hold
//!   `None`.
//! - Phases start at 1; a parameter of phase `k` is optimized in every
//!   phase `>= k`.
//!
//! Downstream usage
//! ----------------
//! - `SpatialModel` resolves a table once at construction and drives phased
//!   fitting with `active_names` / `to_theta` / `apply_theta`.
//! - `inference` uses [`LinkKind::dnatural_dlink`] for delta-method SEs.
//!
//! Testing notes
//! -------------
//! - Unit tests cover link round-trips, boundary domain errors, override
//!   precedence, scale-factor defaults and θ mapping.
use crate::{
    optimization::numerical_stability::transformations::{safe_logistic, safe_logit},
    spatial::errors::{ParamError, ParamResult},
};
use std::{collections::HashMap, str::FromStr};

/// Number of distinct model parameters.
pub const N_PARAMS: usize = 16;

/// Model parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamName {
    D,
    G0,
    Sigma,
    Z,
    Shape,
    Scale,
    Shape1,
    Shape2,
    B0Ss,
    B1Ss,
    B2Ss,
    SigmaB0Ss,
    SigmaSs,
    Kappa,
    Alpha,
    SigmaToa,
}

impl ParamName {
    pub const ALL: [ParamName; N_PARAMS] = [
        ParamName::D,
        ParamName::G0,
        ParamName::Sigma,
        ParamName::Z,
        ParamName::Shape,
        ParamName::Scale,
        ParamName::Shape1,
        ParamName::Shape2,
        ParamName::B0Ss,
        ParamName::B1Ss,
        ParamName::B2Ss,
        ParamName::SigmaB0Ss,
        ParamName::SigmaSs,
        ParamName::Kappa,
        ParamName::Alpha,
        ParamName::SigmaToa,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamName::D => "D",
            ParamName::G0 => "g0",
            ParamName::Sigma => "sigma",
            ParamName::Z => "z",
            ParamName::Shape => "shape",
            ParamName::Scale => "scale",
            ParamName::Shape1 => "shape.1",
            ParamName::Shape2 => "shape.2",
            ParamName::B0Ss => "b0.ss",
            ParamName::B1Ss => "b1.ss",
            ParamName::B2Ss => "b2.ss",
            ParamName::SigmaB0Ss => "sigma.b0.ss",
            ParamName::SigmaSs => "sigma.ss",
            ParamName::Kappa => "kappa",
            ParamName::Alpha => "alpha",
            ParamName::SigmaToa => "sigma.toa",
        }
    }

    /// Default link transform.
    pub fn default_link(&self) -> LinkKind {
        match self {
            ParamName::G0 => LinkKind::Logit,
            ParamName::Shape | ParamName::Shape2 => LinkKind::Identity,
            _ => LinkKind::Log,
        }
    }
}

impl std::fmt::Display for ParamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamName {
    type Err = ParamError;

    /// Parse a parameter name. Dots and underscores are interchangeable and
    /// matching is case-insensitive except for `D`, which also accepts `d`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase().replace('_', ".");
        ParamName::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().to_lowercase() == normalized)
            .ok_or_else(|| ParamError::UnknownParam { name: s.to_string() })
    }
}

/// Link transform between natural and optimizer scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Identity,
    Log,
    Logit,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Identity => "identity",
            LinkKind::Log => "log",
            LinkKind::Logit => "logit",
        }
    }

    pub fn domain_message(&self) -> &'static str {
        match self {
            LinkKind::Identity => "value must be finite.",
            LinkKind::Log => "value must be finite and > 0.",
            LinkKind::Logit => "value must lie strictly inside (0, 1).",
        }
    }

    /// Default natural-scale bounds for parameters on this link.
    pub fn default_bounds(&self) -> (f64, f64) {
        match self {
            LinkKind::Identity => (-1e10, 1e10),
            LinkKind::Log => (1e-12, 1e12),
            LinkKind::Logit => (1e-10, 1.0 - 1e-10),
        }
    }

    /// Natural → link scale.
    ///
    /// # Errors
    /// [`ParamError::DomainError`] at or beyond the domain boundary.
    pub fn to_link(&self, name: ParamName, x: f64) -> ParamResult<f64> {
        let in_domain = match self {
            LinkKind::Identity => x.is_finite(),
            LinkKind::Log => x.is_finite() && x > 0.0,
            LinkKind::Logit => x > 0.0 && x < 1.0,
        };
        if !in_domain {
            return Err(ParamError::DomainError { name, value: x, link: *self });
        }
        Ok(match self {
            LinkKind::Identity => x,
            LinkKind::Log => x.ln(),
            LinkKind::Logit => safe_logit(x),
        })
    }

    /// Link → natural scale.
    pub fn from_link(&self, eta: f64) -> f64 {
        match self {
            LinkKind::Identity => eta,
            LinkKind::Log => eta.exp(),
            LinkKind::Logit => safe_logistic(eta),
        }
    }

    /// Derivative `dx/dη` expressed through the natural value `x`.
    pub fn dnatural_dlink(&self, x: f64) -> f64 {
        match self {
            LinkKind::Identity => 1.0,
            LinkKind::Log => x,
            LinkKind::Logit => x * (1.0 - x),
        }
    }
}

/// Estimation status of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Fixed,
    Estimated(u32),
}

/// Resolved settings of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: ParamName,
    pub link: LinkKind,
    pub lower: f64,
    pub upper: f64,
    pub phase: Phase,
    pub start: f64,
    pub scale_factor: f64,
}

impl ParamSpec {
    pub fn is_estimated(&self) -> bool {
        matches!(self.phase, Phase::Estimated(_))
    }

    /// Clamp `x` into `[lower, upper]`.
    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.lower, self.upper)
    }
}

/// Partial user overrides. Anything absent is filled in automatically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamOverrides {
    pub start: HashMap<ParamName, f64>,
    pub bounds: HashMap<ParamName, (f64, f64)>,
    pub phases: HashMap<ParamName, u32>,
    pub scale_factors: HashMap<ParamName, f64>,
    pub fixed: HashMap<ParamName, f64>,
    pub links: HashMap<ParamName, LinkKind>,
}

impl ParamOverrides {
    fn names(&self) -> impl Iterator<Item = &ParamName> {
        self.start
            .keys()
            .chain(self.bounds.keys())
            .chain(self.phases.keys())
            .chain(self.scale_factors.keys())
            .chain(self.fixed.keys())
            .chain(self.links.keys())
    }
}

/// Dense name-indexed parameter values on the natural scale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParamValues {
    values: [Option<f64>; N_PARAMS],
}

impl ParamValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: ParamName) -> Option<f64> {
        self.values[name.index()]
    }

    /// Value of a parameter the caller requires.
    ///
    /// # Errors
    /// [`ParamError::MissingValue`] when absent.
    pub fn require(&self, name: ParamName) -> ParamResult<f64> {
        self.get(name).ok_or(ParamError::MissingValue { name })
    }

    pub fn set(&mut self, name: ParamName, value: f64) {
        self.values[name.index()] = Some(value);
    }

    /// Present `(name, value)` pairs in [`ParamName`] order.
    pub fn iter(&self) -> impl Iterator<Item = (ParamName, f64)> + '_ {
        ParamName::ALL.iter().filter_map(|&p| self.get(p).map(|v| (p, v)))
    }
}

impl FromIterator<(ParamName, f64)> for ParamValues {
    fn from_iter<I: IntoIterator<Item = (ParamName, f64)>>(iter: I) -> Self {
        let mut values = ParamValues::new();
        for (name, value) in iter {
            values.set(name, value);
        }
        values
    }
}

/// Resolved parameter table of one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTable {
    pub specs: Vec<ParamSpec>,
}

impl ParamTable {
    /// Resolve the table for the parameters `names` used by a model.
    ///
    /// Parameters
    /// ----------
    /// - `names`: parameters the configured model uses.
    /// - `overrides`: partial user settings; explicit entries always win.
    /// - `derive`: automatic start-value source, called with a parameter
    ///   name and the values resolved so far. `D` is always derived last.
    ///
    /// Errors
    /// ------
    /// - [`ParamError::NotApplicable`] if an override names an unused parameter.
    /// - [`ParamError::MissingStart`] if no start value can be found.
    /// - [`ParamError::InvertedBounds`], [`ParamError::StartOutOfBounds`],
    ///   [`ParamError::DomainError`], [`ParamError::InvalidScaleFactor`],
    ///   [`ParamError::InvalidPhase`] for inconsistent settings.
    pub fn resolve<F>(names: &[ParamName], overrides: &ParamOverrides, mut derive: F) -> ParamResult<Self>
    where
        F: FnMut(ParamName, &ParamValues) -> Option<f64>,
    {
        if let Some(&name) = overrides.names().find(|n| !names.contains(n)) {
            return Err(ParamError::NotApplicable { name });
        }
        let mut order: Vec<ParamName> = names.iter().copied().filter(|&n| n != ParamName::D).collect();
        if names.contains(&ParamName::D) {
            order.push(ParamName::D);
        }

        let mut resolved = ParamValues::new();
        let mut specs = Vec::with_capacity(order.len());
        for name in order {
            let link = overrides.links.get(&name).copied().unwrap_or_else(|| name.default_link());
            let (lower, upper) =
                overrides.bounds.get(&name).copied().unwrap_or_else(|| link.default_bounds());
            if !(lower < upper) {
                return Err(ParamError::InvertedBounds { name, lower, upper });
            }
            let fixed = overrides.fixed.get(&name).copied();
            let start = match fixed.or_else(|| overrides.start.get(&name).copied()) {
                Some(v) => v,
                None => derive(name, &resolved).ok_or(ParamError::MissingStart { name })?,
            };
            if !(start >= lower && start <= upper) {
                return Err(ParamError::StartOutOfBounds { name, value: start, lower, upper });
            }
            link.to_link(name, start)?;
            let phase = match fixed {
                Some(_) => Phase::Fixed,
                None => {
                    let phase = overrides.phases.get(&name).copied().unwrap_or(1);
                    if phase == 0 {
                        return Err(ParamError::InvalidPhase { name, phase });
                    }
                    Phase::Estimated(phase)
                }
            };
            resolved.set(name, start);
            specs.push(ParamSpec { name, link, lower, upper, phase, start, scale_factor: 1.0 });
        }
        specs.sort_by_key(|s| s.name);

        let max_abs = specs
            .iter()
            .filter(|s| s.is_estimated())
            .filter_map(|s| s.link.to_link(s.name, s.start).ok())
            .fold(0.0_f64, |acc, eta| acc.max(eta.abs()));
        for spec in specs.iter_mut() {
            spec.scale_factor = match overrides.scale_factors.get(&spec.name) {
                Some(&sf) => {
                    if !sf.is_finite() || sf <= 0.0 {
                        return Err(ParamError::InvalidScaleFactor { name: spec.name, value: sf });
                    }
                    sf
                }
                None => {
                    let eta = spec.link.to_link(spec.name, spec.start)?;
                    default_scale_factor(max_abs, eta)
                }
            };
        }
        Ok(Self { specs })
    }

    pub fn spec(&self, name: ParamName) -> Option<&ParamSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<ParamName> {
        self.specs.iter().map(|s| s.name).collect()
    }

    pub fn start_values(&self) -> ParamValues {
        self.specs.iter().map(|s| (s.name, s.start)).collect()
    }

    /// Distinct estimation phases, ascending.
    pub fn phases(&self) -> Vec<u32> {
        let mut phases: Vec<u32> = self
            .specs
            .iter()
            .filter_map(|s| match s.phase {
                Phase::Estimated(p) => Some(p),
                Phase::Fixed => None,
            })
            .collect();
        phases.sort_unstable();
        phases.dedup();
        phases
    }

    /// Parameters optimized during `phase`: every estimated parameter whose
    /// phase is `<= phase`, in table order.
    pub fn active_names(&self, phase: u32) -> Vec<ParamName> {
        self.specs
            .iter()
            .filter(|s| matches!(s.phase, Phase::Estimated(p) if p <= phase))
            .map(|s| s.name)
            .collect()
    }

    /// Natural values → optimizer vector for `active`.
    ///
    /// # Errors
    /// [`ParamError::MissingValue`] or [`ParamError::DomainError`].
    pub fn to_theta(&self, values: &ParamValues, active: &[ParamName]) -> ParamResult<Vec<f64>> {
        active
            .iter()
            .map(|&name| {
                let spec = self.spec(name).ok_or(ParamError::NotApplicable { name })?;
                let x = values.require(name)?;
                Ok(spec.link.to_link(name, x)? * spec.scale_factor)
            })
            .collect()
    }

    /// Optimizer vector for `active` → natural values, starting from `base`
    /// for every inactive parameter.
    ///
    /// # Errors
    /// [`ParamError::ThetaLengthMismatch`] or [`ParamError::InvalidThetaInput`].
    pub fn apply_theta(
        &self, theta: &[f64], active: &[ParamName], base: &ParamValues,
    ) -> ParamResult<ParamValues> {
        if theta.len() != active.len() {
            return Err(ParamError::ThetaLengthMismatch {
                expected: active.len(),
                actual: theta.len(),
            });
        }
        let mut values = *base;
        for (index, (&t, &name)) in theta.iter().zip(active).enumerate() {
            if !t.is_finite() {
                return Err(ParamError::InvalidThetaInput { index, value: t });
            }
            let spec = self.spec(name).ok_or(ParamError::NotApplicable { name })?;
            values.set(name, spec.link.from_link(t / spec.scale_factor));
        }
        Ok(values)
    }
}

// ---- Helper Methods ----

fn default_scale_factor(max_abs: f64, eta: f64) -> f64 {
    let sf = max_abs / eta.abs();
    if sf.is_finite() && sf > 0.0 { sf } else { 1.0 }
}
