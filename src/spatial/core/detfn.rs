//! Detection functions — closed tagged variant over the supported families.
//!
//! Purpose
//! -------
//! Evaluate the probability that a detector records a call from a source at
//! distance `d`, and precompute per-detector, per-mask-point detection
//! surfaces in log space for the likelihood assembler and the posterior
//! location engine.
//!
//! Key behaviors
//! -------------
//! - [`DetectionFunction::from_values`] resolves a [`DetFnKind`] plus natural
//!   parameter values into a variant carrying exactly its parameters.
//! - Binary families: half-normal, hazard-rate, threshold, log-threshold.
//! - [`SignalModel`] covers the signal-strength family: a Gaussian
//!   observation around an expected received strength (identity, log or
//!   spherical-spreading link), detected above a cutoff. Directional calling
//!   and heterogeneous source strength are integrated out over quadrature
//!   nodes, so every surface is a weighted mixture of per-node surfaces.
//! - [`DetectionFunction::surfaces`] computes all surfaces once per
//!   parameter vector. For colocated arrays one detector row is computed and
//!   copied to the rest.
//!
//! Invariants & assumptions
//! ------------------------
//! - Surface weights are positive and sum to one.
//! - `ln_hit`, `ln_miss`, `ln_miss_detect` are floored logs, never `-∞`.
//! - With a lower cutoff, `ln_hit`/`ln_miss` refer to recording above the
//!   lower cutoff and `ln_miss_detect` to exceeding the upper cutoff; without
//!   one the two coincide.
//!
//! Conventions
//! -----------
//! - Matrices are `(detectors × mask points)` like [`Geometry`].
//! - The call direction `φ` is a compass bearing; the angle used by the
//!   directional model is `φ − (bearing(detector → x) + π)`, the deviation
//!   of the call from the direction pointing at the detector.
use crate::{
    optimization::numerical_stability::transformations::{
        LOG_DENSITY_FLOOR, log_sum_exp, safe_ln, safe_ln_1m,
    },
    spatial::{
        core::{
            geometry::Geometry,
            options::{DetFnKind, SignalStrengthOptions, SourceModel, SsLink},
            params::{ParamName, ParamValues},
            quadrature::Quadrature,
        },
        errors::{ParamError, ParamResult},
    },
};
use ndarray::{Array1, Array2, ArrayView1};
use statrs::function::erf::{erf, erfc};
use std::f64::consts::{PI, SQRT_2, TAU};

/// Detection function with its natural-scale parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionFunction {
    HalfNormal { g0: f64, sigma: f64 },
    HazardRate { g0: f64, sigma: f64, z: f64 },
    Threshold { shape: f64, scale: f64 },
    LogThreshold { shape1: f64, shape2: f64, scale: f64 },
    SignalStrength(SignalModel),
}

impl DetectionFunction {
    /// Parameters used by the family `kind` in its configuration.
    pub fn param_names(kind: DetFnKind, ss: Option<&SignalStrengthOptions>) -> Vec<ParamName> {
        match kind {
            DetFnKind::HalfNormal => vec![ParamName::G0, ParamName::Sigma],
            DetFnKind::HazardRate => vec![ParamName::G0, ParamName::Sigma, ParamName::Z],
            DetFnKind::Threshold => vec![ParamName::Shape, ParamName::Scale],
            DetFnKind::LogThreshold => vec![ParamName::Shape1, ParamName::Shape2, ParamName::Scale],
            DetFnKind::SignalStrength => {
                let mut names = vec![ParamName::B0Ss, ParamName::B1Ss];
                match ss.map(|o| o.source) {
                    Some(SourceModel::Directional { .. }) => names.push(ParamName::B2Ss),
                    Some(SourceModel::Heterogeneous { .. }) => names.push(ParamName::SigmaB0Ss),
                    _ => {}
                }
                names.push(ParamName::SigmaSs);
                names
            }
        }
    }

    /// Resolve the variant from natural parameter values.
    ///
    /// # Errors
    /// [`ParamError::MissingValue`] when a required parameter is absent.
    pub fn from_values(
        kind: DetFnKind, ss: Option<&SignalStrengthOptions>, values: &ParamValues,
    ) -> ParamResult<Self> {
        Ok(match kind {
            DetFnKind::HalfNormal => DetectionFunction::HalfNormal {
                g0: values.require(ParamName::G0)?,
                sigma: values.require(ParamName::Sigma)?,
            },
            DetFnKind::HazardRate => DetectionFunction::HazardRate {
                g0: values.require(ParamName::G0)?,
                sigma: values.require(ParamName::Sigma)?,
                z: values.require(ParamName::Z)?,
            },
            DetFnKind::Threshold => DetectionFunction::Threshold {
                shape: values.require(ParamName::Shape)?,
                scale: values.require(ParamName::Scale)?,
            },
            DetFnKind::LogThreshold => DetectionFunction::LogThreshold {
                shape1: values.require(ParamName::Shape1)?,
                shape2: values.require(ParamName::Shape2)?,
                scale: values.require(ParamName::Scale)?,
            },
            DetFnKind::SignalStrength => {
                let opts = ss.ok_or(ParamError::MissingValue { name: ParamName::B0Ss })?;
                DetectionFunction::SignalStrength(SignalModel::from_values(opts, values)?)
            }
        })
    }

    /// Probability of detection at distance `d`.
    ///
    /// For the signal-strength family this is the probability of exceeding
    /// the (upper) cutoff for an average source calling straight at the
    /// detector.
    pub fn prob(&self, d: f64) -> f64 {
        match *self {
            DetectionFunction::HalfNormal { g0, sigma } => {
                g0 * (-(d * d) / (2.0 * sigma * sigma)).exp()
            }
            DetectionFunction::HazardRate { g0, sigma, z } => {
                g0 * (1.0 - (-(d / sigma).powf(-z)).exp())
            }
            DetectionFunction::Threshold { shape, scale } => 0.5 - 0.5 * erf(d / scale - shape),
            DetectionFunction::LogThreshold { shape1, shape2, scale } => {
                0.5 - 0.5 * erf(shape1 - (shape2 - scale * d).exp())
            }
            DetectionFunction::SignalStrength(ref m) => {
                m.prob_exceed(m.expected(m.b0, d, 1.0), m.cutoff)
            }
        }
    }

    pub fn signal_model(&self) -> Option<&SignalModel> {
        match self {
            DetectionFunction::SignalStrength(m) => Some(m),
            _ => None,
        }
    }

    /// Detection surfaces over every detector and mask point.
    pub fn surfaces(&self, geometry: &Geometry) -> DetectionSurfaces {
        let (k, m) = (geometry.n_detectors(), geometry.n_points());
        let colocated = geometry.colocated;
        match self {
            DetectionFunction::SignalStrength(model) => model.surfaces(geometry),
            _ => {
                let p = fill(k, m, colocated, |j, x| self.prob(geometry.distances[[j, x]]));
                let ln_hit = p.mapv(safe_ln);
                let ln_miss = p.mapv(safe_ln_1m);
                DetectionSurfaces {
                    nodes: vec![NodeSurface {
                        ln_weight: 0.0,
                        ln_hit,
                        ln_miss_detect: ln_miss.clone(),
                        ln_miss,
                        expected: None,
                    }],
                }
            }
        }
    }
}

/// Signal-strength detection model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalModel {
    pub link: SsLink,
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub sigma_b0: f64,
    pub sigma: f64,
    pub cutoff: f64,
    pub lower_cutoff: Option<f64>,
    pub source: SourceModel,
}

impl SignalModel {
    pub fn from_values(opts: &SignalStrengthOptions, values: &ParamValues) -> ParamResult<Self> {
        let b2 = match opts.source {
            SourceModel::Directional { .. } => values.require(ParamName::B2Ss)?,
            _ => 0.0,
        };
        let sigma_b0 = match opts.source {
            SourceModel::Heterogeneous { .. } => values.require(ParamName::SigmaB0Ss)?,
            _ => 0.0,
        };
        Ok(Self {
            link: opts.link,
            b0: values.require(ParamName::B0Ss)?,
            b1: values.require(ParamName::B1Ss)?,
            b2,
            sigma_b0,
            sigma: values.require(ParamName::SigmaSs)?,
            cutoff: opts.cutoff,
            lower_cutoff: opts.lower_cutoff,
            source: opts.source,
        })
    }

    /// Expected received strength at distance `d` for source strength `b0`
    /// and call-angle cosine `cos_theta` (1 when calling at the detector).
    pub fn expected(&self, b0: f64, d: f64, cos_theta: f64) -> f64 {
        let slope = self.b1 - self.b2 * (cos_theta - 1.0);
        match self.link {
            SsLink::Identity => b0 - slope * d,
            SsLink::Log => (b0 - slope * d).exp(),
            SsLink::Spherical => {
                if d >= 1.0 {
                    b0 - 20.0 * d.log10() - slope * (d - 1.0)
                } else {
                    b0
                }
            }
        }
    }

    /// `P(Y > threshold)` for `Y ~ N(expected, σ²)`.
    #[inline]
    pub fn prob_exceed(&self, expected: f64, threshold: f64) -> f64 {
        0.5 * erfc((threshold - expected) / (self.sigma * SQRT_2))
    }

    /// `ln P(Y <= threshold)` for `Y ~ N(expected, σ²)`, floored.
    #[inline]
    fn ln_prob_below(&self, expected: f64, threshold: f64) -> f64 {
        safe_ln(0.5 * erfc((expected - threshold) / (self.sigma * SQRT_2)))
    }

    /// Gaussian log density of an observed strength.
    #[inline]
    pub fn ln_density(&self, observed: f64, expected: f64) -> f64 {
        let z = (observed - expected) / self.sigma;
        -0.5 * (TAU * self.sigma * self.sigma).ln() - 0.5 * z * z
    }

    /// Threshold above which a detector records the call.
    pub fn record_threshold(&self) -> f64 {
        self.lower_cutoff.unwrap_or(self.cutoff)
    }

    pub fn quadrature(&self) -> Quadrature {
        match self.source {
            SourceModel::Omnidirectional => Quadrature::single(),
            SourceModel::Directional { n } => Quadrature::directions(n),
            SourceModel::Heterogeneous { n } => Quadrature::gauss_hermite(n),
        }
    }

    fn surfaces(&self, geometry: &Geometry) -> DetectionSurfaces {
        let (k, m) = (geometry.n_detectors(), geometry.n_points());
        let colocated = geometry.colocated;
        let record = self.record_threshold();
        let quad = self.quadrature();
        let nodes = quad
            .nodes
            .iter()
            .zip(&quad.weights)
            .map(|(&node, &weight)| {
                let expected = fill(k, m, colocated, |j, x| {
                    let d = geometry.distances[[j, x]];
                    match self.source {
                        SourceModel::Omnidirectional => self.expected(self.b0, d, 1.0),
                        SourceModel::Directional { .. } => {
                            let toward = geometry.bearings[[j, x]] + PI;
                            self.expected(self.b0, d, (node - toward).cos())
                        }
                        SourceModel::Heterogeneous { .. } => {
                            self.expected(self.b0 + self.sigma_b0 * node, d, 1.0)
                        }
                    }
                });
                let ln_hit = expected.mapv(|e| safe_ln(self.prob_exceed(e, record)));
                let ln_miss = expected.mapv(|e| self.ln_prob_below(e, record));
                let ln_miss_detect = match self.lower_cutoff {
                    Some(_) => expected.mapv(|e| self.ln_prob_below(e, self.cutoff)),
                    None => ln_miss.clone(),
                };
                NodeSurface {
                    ln_weight: weight.ln(),
                    ln_hit,
                    ln_miss,
                    ln_miss_detect,
                    expected: Some(expected),
                }
            })
            .collect();
        DetectionSurfaces { nodes }
    }
}

/// Detection surfaces for one quadrature node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSurface {
    pub ln_weight: f64,
    /// `ln P(detector j records | x)`.
    pub ln_hit: Array2<f64>,
    /// `ln(1 − P(detector j records | x))`.
    pub ln_miss: Array2<f64>,
    /// `ln(1 − P(detector j detects | x))` for the detection criterion.
    pub ln_miss_detect: Array2<f64>,
    /// Expected received strength, signal-strength models only.
    pub expected: Option<Array2<f64>>,
}

/// Mixture of per-node detection surfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSurfaces {
    pub nodes: Vec<NodeSurface>,
}

impl DetectionSurfaces {
    /// `p·(x)`: probability that at least one detector detects a call from
    /// each mask point.
    pub fn p_dot(&self) -> Array1<f64> {
        let m = self.nodes.first().map_or(0, |n| n.ln_miss_detect.ncols());
        Array1::from_shape_fn(m, |x| {
            self.nodes
                .iter()
                .map(|n| n.ln_weight.exp() * -n.ln_miss_detect.column(x).sum().exp_m1())
                .sum()
        })
    }

    /// `ln P(pattern | x)` for a binary pattern.
    pub fn ln_capture(&self, pattern: &[bool], x: usize) -> f64 {
        let terms = self.nodes.iter().map(|n| {
            let inner: f64 = pattern
                .iter()
                .enumerate()
                .map(|(j, &hit)| if hit { n.ln_hit[[j, x]] } else { n.ln_miss[[j, x]] })
                .sum();
            n.ln_weight + inner
        });
        mixture(terms)
    }

    /// `ln f(pattern, strengths | x)`: Gaussian strength densities at the
    /// recording detectors and `1 − p` at the rest.
    pub fn ln_capture_ss(
        &self, model: &SignalModel, pattern: &[bool], strengths: ArrayView1<'_, f64>, x: usize,
    ) -> f64 {
        let terms = self.nodes.iter().map(|n| {
            let inner: f64 = pattern
                .iter()
                .enumerate()
                .map(|(j, &hit)| match (&n.expected, hit) {
                    (Some(e), true) => model.ln_density(strengths[j], e[[j, x]]),
                    (None, true) => n.ln_hit[[j, x]],
                    (_, false) => n.ln_miss[[j, x]],
                })
                .sum();
            n.ln_weight + inner
        });
        mixture(terms)
    }
}

// ---- Helper Methods ----

fn mixture<I: Iterator<Item = f64> + Clone>(terms: I) -> f64 {
    let v = log_sum_exp(terms);
    if v.is_nan() { v } else { v.max(LOG_DENSITY_FLOOR) }
}

/// Fill a `(k × m)` matrix; colocated arrays evaluate row 0 only.
fn fill<F: Fn(usize, usize) -> f64>(k: usize, m: usize, colocated: bool, f: F) -> Array2<f64> {
    if colocated && k > 1 {
        let row = Array1::from_shape_fn(m, |x| f(0, x));
        Array2::from_shape_fn((k, m), |(_, x)| row[x])
    } else {
        Array2::from_shape_fn((k, m), |(j, x)| f(j, x))
    }
}
