//! Likelihood assembler.
//!
//! Purpose
//! -------
//! Turn a natural-scale parameter set into the negative log-likelihood of a
//! spatial capture–recapture model and its effective sampled area:
//!
//! ```text
//! ℓ = −D·esa + Σ_i ln( D·a·Σ_{x∈L(u_i)} f_capt(w_i | x)·f_aux(y_i | x) ) − ln n!
//! esa = a·Σ_{x∈mask} p·(x)
//! ```
//!
//! where `a` is the cell area, `L(u)` the (possibly local) integration set of
//! pattern `u`, `f_capt` the detection-pattern probability and `f_aux` the
//! joint auxiliary density.
//!
//! Key behaviors
//! -------------
//! - Detection surfaces are computed once per call and shared by every
//!   detection; outside signal-strength models the capture term over each
//!   local set is computed once per unique pattern.
//! - Without per-detection measurements, identical binary patterns share one
//!   term weighted by their frequency; otherwise each detection contributes
//!   its own term.
//! - Parameters outside their bounds are clamped and recorded as
//!   [`NumericalWarning::OutOfBounds`]; per-detection terms below the density
//!   floor are clamped and recorded as [`NumericalWarning::DensityFloor`].
//!   Both are logged at debug level.
//! - A non-finite total is reported as [`OptError::NonFiniteCost`].
//!
//! Downstream usage
//! ----------------
//! - `SpatialModel` wraps [`evaluate`] for the optimizer and exposes
//!   [`detection_contributions`] for diagnostics.
use crate::{
    optimization::{
        errors::{OptError, OptResult},
        numerical_stability::transformations::{LOG_DENSITY_FLOOR, log_sum_exp},
    },
    spatial::core::{
        aux_density::AuxModel,
        context::FitContext,
        data::CaptureKind,
        detfn::{DetectionFunction, DetectionSurfaces},
        params::{ParamName, ParamTable, ParamValues},
    },
};
use log::debug;
use ndarray::Array1;
use statrs::function::gamma::ln_gamma;

/// Numerical clamp applied during an evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericalWarning {
    OutOfBounds { name: ParamName, value: f64, clamped: f64 },
    DensityFloor { detection: usize },
}

/// Result of one likelihood evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub neg_log_likelihood: f64,
    pub esa: f64,
    pub warnings: Vec<NumericalWarning>,
}

impl Evaluation {
    pub fn log_likelihood(&self) -> f64 {
        -self.neg_log_likelihood
    }
}

/// Per-detection log contributions.
#[derive(Debug, Clone, PartialEq)]
pub struct Contributions {
    pub values: Array1<f64>,
    pub warnings: Vec<NumericalWarning>,
}

/// Negative log-likelihood and effective sampled area at `values`.
///
/// # Errors
/// - [`OptError::ParameterDomain`] / [`OptError::ModelError`] when a required
///   parameter is missing or outside its link domain.
/// - [`OptError::NonFiniteCost`] when the total is not finite.
pub fn evaluate(ctx: &FitContext, table: &ParamTable, values: &ParamValues) -> OptResult<Evaluation> {
    let mut warnings = Vec::new();
    let values = clamp_to_bounds(table, values, &mut warnings);
    let terms = Terms::new(ctx, &values)?;
    let density = values.require(ParamName::D)?;
    let ln_da = (density * ctx.mask.cell_area).ln();
    let n = ctx.n_detections() as f64;

    let mut total = -density * terms.esa - ln_gamma(n + 1.0);
    if ctx.per_detection() {
        for i in 0..ctx.n_detections() {
            total += ln_da + terms.floored(terms.ln_integral(i), i, &mut warnings);
        }
    } else {
        for (p, &freq) in ctx.patterns.frequencies.iter().enumerate() {
            let first = ctx.patterns.members[p][0];
            let ln_int = terms.floored(terms.ln_pattern_integral(p), first, &mut warnings);
            total += freq as f64 * (ln_da + ln_int);
        }
    }
    if !total.is_finite() {
        return Err(OptError::NonFiniteCost { value: total });
    }
    Ok(Evaluation { neg_log_likelihood: -total, esa: terms.esa, warnings })
}

/// Per-detection log contributions `ln(D·a·Σ_x f_capt·f_aux)`, one per
/// detection in input order, with the clamps applied on the way.
pub fn detection_contributions(
    ctx: &FitContext, table: &ParamTable, values: &ParamValues,
) -> OptResult<Contributions> {
    let mut warnings = Vec::new();
    let values = clamp_to_bounds(table, values, &mut warnings);
    let terms = Terms::new(ctx, &values)?;
    let ln_da = (values.require(ParamName::D)? * ctx.mask.cell_area).ln();
    let values = Array1::from_shape_fn(ctx.n_detections(), |i| {
        ln_da + terms.floored(terms.ln_integral(i), i, &mut warnings)
    });
    Ok(Contributions { values, warnings })
}

// ---- Helper Methods ----

/// Densities at one parameter vector, shared across detections.
pub(crate) struct Terms<'a> {
    pub ctx: &'a FitContext,
    pub detfn: DetectionFunction,
    pub aux: AuxModel,
    pub surfaces: DetectionSurfaces,
    /// `ln f_capt(u | x)` over `L(u)` for every unique pattern; `None` for
    /// signal-strength models, whose capture term is per detection.
    pub pattern_capture: Option<Vec<Array1<f64>>>,
    pub esa: f64,
}

impl<'a> Terms<'a> {
    pub fn new(ctx: &'a FitContext, values: &ParamValues) -> OptResult<Self> {
        let detfn = DetectionFunction::from_values(
            ctx.options.detfn,
            ctx.options.ss_options.as_ref(),
            values,
        )?;
        let aux = AuxModel::from_values(&ctx.capture, values, ctx.mask.half_cell_width())?;
        let surfaces = detfn.surfaces(&ctx.geometry);
        let esa = ctx.mask.cell_area * surfaces.p_dot().sum();
        let pattern_capture = detfn.signal_model().is_none().then(|| {
            ctx.patterns
                .patterns
                .iter()
                .zip(&ctx.local.points)
                .map(|(pattern, points)| {
                    Array1::from_iter(points.iter().map(|&x| surfaces.ln_capture(pattern, x)))
                })
                .collect()
        });
        Ok(Self { ctx, detfn, aux, surfaces, pattern_capture, esa })
    }

    /// `ln f_capt(w_i | x)` for detection `i` at each of `points`.
    pub fn ln_capture(&self, i: usize, points: &[usize]) -> Array1<f64> {
        let p = self.ctx.patterns.row_to_pattern[i];
        let pattern = &self.ctx.patterns.patterns[p];
        let strengths = self.ctx.capture.row(CaptureKind::SignalStrength, i);
        match (self.detfn.signal_model(), strengths) {
            (Some(model), Some(ss)) => Array1::from_iter(
                points.iter().map(|&x| self.surfaces.ln_capture_ss(model, pattern, ss, x)),
            ),
            _ => Array1::from_iter(points.iter().map(|&x| self.surfaces.ln_capture(pattern, x))),
        }
    }

    /// `ln f_aux(y_i | x)` at each of `points`.
    pub fn ln_aux(&self, i: usize, points: &[usize], toa_ssq: Option<&Array1<f64>>) -> Array1<f64> {
        let p = self.ctx.patterns.row_to_pattern[i];
        self.aux.ln_density(
            &self.ctx.capture,
            &self.ctx.geometry,
            i,
            &self.ctx.patterns.fired[p],
            points,
            toa_ssq,
        )
    }

    /// `ln Σ_{x∈L} f_capt·f_aux` for detection `i` over its local set.
    fn ln_integral(&self, i: usize) -> f64 {
        let p = self.ctx.patterns.row_to_pattern[i];
        let points = &self.ctx.local.points[p];
        let mut joint = match &self.pattern_capture {
            Some(shared) => shared[p].clone(),
            None => self.ln_capture(i, points),
        };
        if self.aux.is_active() {
            joint += &self.ln_aux(i, points, self.ctx.toa_ssq.get(i));
        }
        log_sum_exp(joint.iter().copied())
    }

    /// `ln Σ_{x∈L} f_capt` shared by every detection with pattern `p`.
    fn ln_pattern_integral(&self, p: usize) -> f64 {
        match &self.pattern_capture {
            Some(shared) => log_sum_exp(shared[p].iter().copied()),
            None => {
                let pattern = &self.ctx.patterns.patterns[p];
                log_sum_exp(
                    self.ctx.local.points[p].iter().map(|&x| self.surfaces.ln_capture(pattern, x)),
                )
            }
        }
    }

    fn floored(&self, v: f64, detection: usize, warnings: &mut Vec<NumericalWarning>) -> f64 {
        if v.is_nan() || v >= LOG_DENSITY_FLOOR {
            return v;
        }
        debug!("detection {detection}: integrated density below floor, clamped");
        warnings.push(NumericalWarning::DensityFloor { detection });
        LOG_DENSITY_FLOOR
    }
}

fn clamp_to_bounds(
    table: &ParamTable, values: &ParamValues, warnings: &mut Vec<NumericalWarning>,
) -> ParamValues {
    let mut out = *values;
    for spec in &table.specs {
        if let Some(value) = values.get(spec.name) {
            let clamped = spec.clamp(value);
            if clamped != value && !value.is_nan() {
                debug!("parameter {} = {value} outside [{}, {}], clamped", spec.name, spec.lower, spec.upper);
                warnings.push(NumericalWarning::OutOfBounds { name: spec.name, value, clamped });
                out.set(spec.name, clamped);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        optimization::loglik_optimizer::MLEOptions,
        spatial::{
            core::{
                data::{CaptureHistory, Detectors, Mask},
                options::{DetFnKind, Integration, ModelOptions, SignalStrengthOptions, SsLink},
                params::ParamOverrides,
            },
            models::locate::{InfoType, posterior_surface},
        },
    };
    use approx::assert_relative_eq;
    use ndarray::{Array2, array};
    use std::collections::BTreeMap;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The closed-form likelihood on a one-point mask.
    // - Pattern sharing versus per-detection evaluation, and the per-pattern
    //   capture cache.
    // - Agreement of local and global integration with a large buffer,
    //   including time-of-arrival terms on a reduced local set.
    // - Directional and heterogeneous signal-strength mixtures.
    // - The known-distance indicator inside the full likelihood.
    // - Clamping of out-of-bounds parameters.
    // -------------------------------------------------------------------------

    fn hn_values(d: f64, g0: f64, sigma: f64) -> ParamValues {
        [(ParamName::D, d), (ParamName::G0, g0), (ParamName::Sigma, sigma)].into_iter().collect()
    }

    fn hn_context(binary: ndarray::Array2<f64>, buffer: f64, integration: Integration) -> FitContext {
        let det = Detectors::new(array![[0.0, 0.0], [2.0, 0.0]]).unwrap();
        let mask = Mask::new(
            array![[0.0, 1.0], [1.0, 1.0], [2.0, 1.0], [1.0, -1.0], [8.0, 8.0]],
            1.0,
            buffer,
        )
        .unwrap();
        let capture = CaptureHistory::binary_only(binary).unwrap();
        let mut opts = ModelOptions::with_detfn(DetFnKind::HalfNormal).unwrap();
        opts.integration = integration;
        FitContext::new(det, mask, capture, opts).unwrap()
    }

    fn table(ctx: &FitContext) -> ParamTable {
        ParamTable::resolve(&ctx.param_names(), &ParamOverrides::default(), |_, _| Some(0.5))
            .unwrap()
    }

    /// Row-major `n × n` grid starting at `(x0, x0)`.
    fn grid(n: usize, x0: f64, step: f64) -> Array2<f64> {
        Array2::from_shape_fn((n * n, 2), |(r, c)| {
            let (i, j) = (r / n, r % n);
            if c == 0 { x0 + i as f64 * step } else { x0 + j as f64 * step }
        })
    }

    fn ss_context(directional: bool, het_source: bool) -> FitContext {
        let det = Detectors::new(array![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]).unwrap();
        let mask = Mask::new(grid(5, -1.0, 1.0), 1.0, 4.0).unwrap();
        let mut components = BTreeMap::new();
        components.insert(
            CaptureKind::Binary,
            array![[1.0, 0.0, 1.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        );
        components.insert(
            CaptureKind::SignalStrength,
            array![[62.0, 0.0, 55.0], [70.0, 58.0, 0.0], [0.0, 58.0, 0.0]],
        );
        let capture = CaptureHistory::new(components, 3).unwrap();
        let ss = SignalStrengthOptions::new(
            SsLink::Identity,
            50.0,
            None,
            directional,
            het_source,
            None,
            None,
        )
        .unwrap();
        let opts = ModelOptions::new(
            DetFnKind::SignalStrength,
            Some(ss),
            None,
            Integration::Local,
            MLEOptions::default(),
        )
        .unwrap();
        FitContext::new(det, mask, capture, opts).unwrap()
    }

    fn ss_values(extra: &[(ParamName, f64)]) -> ParamValues {
        let mut values: ParamValues = [
            (ParamName::D, 0.5),
            (ParamName::B0Ss, 75.0),
            (ParamName::B1Ss, 8.0),
            (ParamName::SigmaSs, 6.0),
        ]
        .into_iter()
        .collect();
        for &(name, value) in extra {
            values.set(name, value);
        }
        values
    }

    const TOA_DETECTORS: [[f64; 2]; 3] = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]];

    /// Arrival time at detector `j` of a call made at `source` at time 1.
    fn arrival(source: [f64; 2], j: usize, speed: f64) -> f64 {
        let [x, y] = TOA_DETECTORS[j];
        1.0 + ((source[0] - x).powi(2) + (source[1] - y).powi(2)).sqrt() / speed
    }

    /// Detection 0 fires all three detectors from (4, 4); detection 1 fires
    /// the first two from (5, 2). Mask: 5×5 on [-5, 15]², cell area 25.
    fn toa_context(buffer: f64, integration: Integration) -> FitContext {
        let det = Detectors::new(Array2::from_shape_fn((3, 2), |(j, c)| TOA_DETECTORS[j][c]))
            .unwrap();
        let mask = Mask::new(grid(5, -5.0, 5.0), 25.0, buffer).unwrap();
        let mut opts = ModelOptions::with_detfn(DetFnKind::HalfNormal).unwrap();
        opts.integration = integration;
        let c = opts.sound_speed;
        let mut components = BTreeMap::new();
        components.insert(CaptureKind::Binary, array![[1.0, 1.0, 1.0], [1.0, 1.0, 0.0]]);
        components.insert(
            CaptureKind::TimeOfArrival,
            array![
                [arrival([4.0, 4.0], 0, c), arrival([4.0, 4.0], 1, c), arrival([4.0, 4.0], 2, c)],
                [arrival([5.0, 2.0], 0, c), arrival([5.0, 2.0], 1, c), 0.0],
            ],
        );
        let capture = CaptureHistory::new(components, 3).unwrap();
        FitContext::new(det, mask, capture, opts).unwrap()
    }

    fn toa_values() -> ParamValues {
        [
            (ParamName::D, 0.01),
            (ParamName::G0, 0.9),
            (ParamName::Sigma, 8.0),
            (ParamName::SigmaToa, 0.002),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    // Purpose
    // -------
    // A one-point mask reduces the likelihood to a closed form.
    //
    // Given
    // -----
    // - One detector, one mask point at distance 1, hn(g0 = 0.5, σ = 1),
    //   D = 2, a = 1, two detections.
    //
    // Expect
    // ------
    // - p = 0.5·e^{-1/2}, esa = p and
    //   ℓ = −2p + 2·ln(2·p) − ln 2.
    fn one_point_likelihood_matches_closed_form() {
        let det = Detectors::new(array![[0.0, 0.0]]).unwrap();
        let mask = Mask::new(array![[1.0, 0.0]], 1.0, 5.0).unwrap();
        let capture = CaptureHistory::binary_only(array![[1.0], [1.0]]).unwrap();
        let opts = ModelOptions::with_detfn(DetFnKind::HalfNormal).unwrap();
        let ctx = FitContext::new(det, mask, capture, opts).unwrap();
        let ev = evaluate(&ctx, &table(&ctx), &hn_values(2.0, 0.5, 1.0)).unwrap();

        let p = 0.5 * (-0.5_f64).exp();
        assert_relative_eq!(ev.esa, p, epsilon = 1e-12);
        let expected = -2.0 * p + 2.0 * (2.0 * p).ln() - 2.0_f64.ln();
        assert_relative_eq!(ev.log_likelihood(), expected, epsilon = 1e-10);
        assert!(ev.warnings.is_empty());
    }

    #[test]
    // Purpose
    // -------
    // Local and global integration agree when the buffer covers the mask.
    //
    // Given
    // -----
    // - Patterns [1,0], [1,1], [0,1], buffer 100 versus global integration.
    //
    // Expect
    // ------
    // - Identical log-likelihoods.
    fn local_matches_global_with_large_buffer() {
        let binary = array![[1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [1.0, 1.0]];
        let local = hn_context(binary.clone(), 100.0, Integration::Local);
        let global = hn_context(binary, 100.0, Integration::Global);
        let values = hn_values(0.3, 0.7, 1.5);
        let a = evaluate(&local, &table(&local), &values).unwrap();
        let b = evaluate(&global, &table(&global), &values).unwrap();
        assert_relative_eq!(a.neg_log_likelihood, b.neg_log_likelihood, epsilon = 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // Shared pattern terms equal the sum of per-detection contributions.
    //
    // Given
    // -----
    // - Four binary-only detections with a repeated pattern.
    //
    // Expect
    // ------
    // - ℓ = −D·esa − ln n! + Σ_i contribution_i.
    fn pattern_sharing_matches_detection_contributions() {
        let binary = array![[1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [1.0, 1.0]];
        let ctx = hn_context(binary, 2.0, Integration::Local);
        let t = table(&ctx);
        let values = hn_values(0.3, 0.7, 1.5);
        let ev = evaluate(&ctx, &t, &values).unwrap();
        let contributions = detection_contributions(&ctx, &t, &values).unwrap().values;
        let rebuilt = -0.3 * ev.esa - ln_gamma(5.0) + contributions.sum();
        assert_relative_eq!(ev.log_likelihood(), rebuilt, epsilon = 1e-10);
        assert_relative_eq!(contributions[1], contributions[3], epsilon = 1e-14);
    }

    #[test]
    // Purpose
    // -------
    // Out-of-bounds parameters are clamped and reported, not fatal.
    //
    // Given
    // -----
    // - g0 bounded to [0.1, 0.6] and evaluated at 0.9.
    //
    // Expect
    // ------
    // - An `OutOfBounds` warning and the same value as evaluating at 0.6.
    // - Per-detection contributions carry the same warning.
    fn out_of_bounds_values_are_clamped() {
        let ctx = hn_context(array![[1.0, 0.0]], 5.0, Integration::Local);
        let mut overrides = ParamOverrides::default();
        overrides.bounds.insert(ParamName::G0, (0.1, 0.6));
        let t = ParamTable::resolve(&ctx.param_names(), &overrides, |_, _| Some(0.5)).unwrap();
        let high = evaluate(&ctx, &t, &hn_values(0.3, 0.9, 1.5)).unwrap();
        let edge = evaluate(&ctx, &t, &hn_values(0.3, 0.6, 1.5)).unwrap();
        assert_eq!(
            high.warnings,
            vec![NumericalWarning::OutOfBounds { name: ParamName::G0, value: 0.9, clamped: 0.6 }]
        );
        assert_relative_eq!(high.neg_log_likelihood, edge.neg_log_likelihood);

        let contributions = detection_contributions(&ctx, &t, &hn_values(0.3, 0.9, 1.5)).unwrap();
        assert_eq!(contributions.warnings, high.warnings);
    }

    #[test]
    // Purpose
    // -------
    // Directional calling with no directional effect, and heterogeneous
    // source strength with no spread, reduce to the omnidirectional model.
    //
    // Given
    // -----
    // - The same signal-strength data under omnidirectional, directional
    //   (b2 = 1e-10) and heterogeneous (sigma_b0 = 1e-9) source models.
    //
    // Expect
    // ------
    // - Equal log-likelihoods and effective sampled areas.
    fn source_mixtures_reduce_to_omnidirectional() {
        let omni_ctx = ss_context(false, false);
        let omni = evaluate(&omni_ctx, &table(&omni_ctx), &ss_values(&[])).unwrap();

        let dir_ctx = ss_context(true, false);
        let dir_values = ss_values(&[(ParamName::B2Ss, 1e-10)]);
        let dir = evaluate(&dir_ctx, &table(&dir_ctx), &dir_values).unwrap();

        let het_ctx = ss_context(false, true);
        let het_values = ss_values(&[(ParamName::SigmaB0Ss, 1e-9)]);
        let het = evaluate(&het_ctx, &table(&het_ctx), &het_values).unwrap();

        for other in [&dir, &het] {
            assert_relative_eq!(other.neg_log_likelihood, omni.neg_log_likelihood, epsilon = 1e-6);
            assert_relative_eq!(other.esa, omni.esa, epsilon = 1e-8);
        }
    }

    #[test]
    // Purpose
    // -------
    // Calling away from detectors steepens the attenuation, so a positive
    // directional effect shrinks the effective sampled area.
    //
    // Given
    // -----
    // - Directional model with b2 = 2 versus the omnidirectional model.
    //
    // Expect
    // ------
    // - Smaller esa, a finite log-likelihood and a normalized combined
    //   posterior surface.
    fn directional_effect_lowers_esa() {
        let omni_ctx = ss_context(false, false);
        let omni = evaluate(&omni_ctx, &table(&omni_ctx), &ss_values(&[])).unwrap();
        let dir_ctx = ss_context(true, false);
        let values = ss_values(&[(ParamName::B2Ss, 2.0)]);
        let dir = evaluate(&dir_ctx, &table(&dir_ctx), &values).unwrap();
        assert!(dir.esa < omni.esa);
        assert!(dir.neg_log_likelihood.is_finite());
        let surface = posterior_surface(&dir_ctx, &values, 0, InfoType::Combined).unwrap();
        assert_relative_eq!(surface.sum(), 1.0, epsilon = 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // Time-of-arrival terms agree between local and global integration when
    // the buffer covers the mask.
    //
    // Given
    // -----
    // - Two TOA detections (three and two firing detectors), buffer 100.
    //
    // Expect
    // ------
    // - Identical log-likelihoods.
    fn toa_local_matches_global_with_large_buffer() {
        let local = toa_context(100.0, Integration::Local);
        let global = toa_context(100.0, Integration::Global);
        let values = toa_values();
        let a = evaluate(&local, &table(&local), &values).unwrap();
        let b = evaluate(&global, &table(&global), &values).unwrap();
        assert_relative_eq!(a.neg_log_likelihood, b.neg_log_likelihood, epsilon = 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // On a reduced local set, the TOA statistics stay aligned with the
    // set's points.
    //
    // Given
    // -----
    // - Buffer 11.5: the three-detector pattern keeps 6 of 25 points.
    // - A hand sum over those points of
    //   `Π_j g0·e^{−d²/2σ²} · (2πσ_t²)^{−1} · e^{−ssq/2σ_t²}`.
    //
    // Expect
    // ------
    // - Detection 0 contributes `ln(D·a) + ln(hand sum)`.
    fn toa_on_local_set_matches_hand_sum() {
        let ctx = toa_context(11.5, Integration::Local);
        let p = ctx.patterns.row_to_pattern[0];
        let points = &ctx.local.points[p];
        assert_eq!(points.len(), 6);

        let c = ctx.options.sound_speed;
        let (sigma, sigma_t) = (8.0_f64, 0.002_f64);
        let times: Vec<f64> = (0..3).map(|j| arrival([4.0, 4.0], j, c)).collect();
        let hand: f64 = points
            .iter()
            .map(|&x| {
                let d: Vec<f64> = (0..3).map(|j| ctx.geometry.distances[[j, x]]).collect();
                let ln_capt: f64 =
                    d.iter().map(|dj| 0.9_f64.ln() - dj * dj / (2.0 * sigma * sigma)).sum();
                let r: Vec<f64> = (0..3).map(|j| times[j] - d[j] / c).collect();
                let mean = r.iter().sum::<f64>() / 3.0;
                let ssq: f64 = r.iter().map(|v| (v - mean).powi(2)).sum();
                let var = sigma_t * sigma_t;
                (ln_capt - (std::f64::consts::TAU * var).ln() - ssq / (2.0 * var)).exp()
            })
            .sum();

        let values = toa_values();
        let contributions = detection_contributions(&ctx, &table(&ctx), &values).unwrap();
        let expected = (0.01_f64 * 25.0).ln() + hand.ln();
        assert_relative_eq!(contributions.values[0], expected, epsilon = 1e-9);
        assert!(contributions.warnings.is_empty());
    }

    #[test]
    // Purpose
    // -------
    // A known-distance detection places all posterior mass on the ring of
    // mask points at the recorded distance.
    //
    // Given
    // -----
    // - Detectors (0,0) and (4,0); a 5×5 unit mask on [0, 4]²; half cell
    //   width 0.5.
    // - One detection at detector 0 with known distance 2.
    //
    // Expect
    // ------
    // - Positive mass exactly at points with |d − 2| ≤ 0.5: (0,2), (1,2),
    //   (2,0), (2,1); zero elsewhere; a finite contribution.
    fn known_distance_restricts_to_ring() {
        let det = Detectors::new(array![[0.0, 0.0], [4.0, 0.0]]).unwrap();
        let mask = Mask::new(grid(5, 0.0, 1.0), 1.0, 10.0).unwrap();
        let mut components = BTreeMap::new();
        components.insert(CaptureKind::Binary, array![[1.0, 0.0]]);
        components.insert(CaptureKind::KnownDistance, array![[2.0, 0.0]]);
        let capture = CaptureHistory::new(components, 2).unwrap();
        let opts = ModelOptions::with_detfn(DetFnKind::HalfNormal).unwrap();
        let ctx = FitContext::new(det, mask, capture, opts).unwrap();
        let values = hn_values(1.0, 0.9, 2.0);

        let surface = posterior_surface(&ctx, &values, 0, InfoType::Combined).unwrap();
        let ring: Vec<usize> = (0..surface.len()).filter(|&x| surface[x] > 0.0).collect();
        assert_eq!(ring, vec![2, 7, 10, 11]);
        assert_relative_eq!(surface.sum(), 1.0, epsilon = 1e-10);

        let contributions = detection_contributions(&ctx, &table(&ctx), &values).unwrap();
        assert!(contributions.values[0].is_finite());
    }

    #[test]
    // Purpose
    // -------
    // The per-pattern capture cache equals the per-detection capture term
    // and is skipped for signal-strength models.
    //
    // Given
    // -----
    // - The TOA context (per-detection evaluation, half-normal) and the
    //   signal-strength context.
    //
    // Expect
    // ------
    // - Cached arrays equal `ln_capture` on each detection's local set.
    // - No cache for the signal-strength model.
    fn pattern_capture_cache_matches_per_detection_terms() {
        let ctx = toa_context(11.5, Integration::Local);
        let terms = Terms::new(&ctx, &toa_values()).unwrap();
        let shared = terms.pattern_capture.as_ref().unwrap();
        for i in 0..ctx.n_detections() {
            let p = ctx.patterns.row_to_pattern[i];
            let direct = terms.ln_capture(i, &ctx.local.points[p]);
            assert_eq!(shared[p], direct);
        }

        let ss_ctx = ss_context(false, false);
        let ss_terms = Terms::new(&ss_ctx, &ss_values(&[])).unwrap();
        assert!(ss_terms.pattern_capture.is_none());
    }
}
