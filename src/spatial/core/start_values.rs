//! Automatic start values from data summaries.
//!
//! Used by [`ParamTable::resolve`](crate::spatial::core::params::ParamTable::resolve)
//! for every parameter the user did not set. The heuristics aim for a
//! plausible, in-bounds starting point rather than a good estimate:
//!
//! - distance scales (`sigma`, threshold `scale`) follow the mean
//!   nearest-neighbour detector spacing, or a third of the mask buffer when
//!   the array has no spacing;
//! - signal-strength intercept and slope come from the strongest recorded
//!   strength and the cutoff, the error SD from the spread of recordings;
//! - measurement-error parameters use fixed moderate values;
//! - `D` is derived last as detections per effective sampled area under the
//!   already resolved detection parameters.
use crate::spatial::core::{
    context::FitContext,
    data::CaptureKind,
    detfn::DetectionFunction,
    options::{DetFnKind, SsLink},
    params::{ParamName, ParamValues},
};

/// Start value for `name`, given the values resolved so far.
///
/// Returns `None` when no sensible value can be derived.
pub fn derive_start(ctx: &FitContext, name: ParamName, resolved: &ParamValues) -> Option<f64> {
    let spacing = typical_spacing(ctx);
    let value = match name {
        ParamName::G0 => 0.95,
        ParamName::Sigma => spacing,
        ParamName::Z => 1.0,
        ParamName::Shape => 2.0,
        ParamName::Scale => match ctx.options.detfn {
            DetFnKind::LogThreshold => 2.0_f64.ln() / spacing,
            _ => spacing / 2.0,
        },
        ParamName::Shape1 => 2.0,
        ParamName::Shape2 => 4.0_f64.ln(),
        ParamName::B0Ss => ss_intercept(ctx)?,
        ParamName::B1Ss => ss_slope(ctx, spacing)?,
        ParamName::B2Ss => 0.1,
        ParamName::SigmaSs => ss_spread(ctx),
        ParamName::SigmaB0Ss => ss_spread(ctx) / 2.0,
        ParamName::Kappa => 10.0,
        ParamName::Alpha => 2.0,
        ParamName::SigmaToa => 1e-3,
        ParamName::D => density_start(ctx, resolved)?,
    };
    value.is_finite().then_some(value)
}

// ---- Helper Methods ----

fn typical_spacing(ctx: &FitContext) -> f64 {
    ctx.geometry
        .mean_spacing()
        .or_else(|| {
            let b = ctx.mask.buffer / 3.0;
            (b.is_finite() && b > 0.0).then_some(b)
        })
        .unwrap_or(1.0)
}

fn recorded_strengths(ctx: &FitContext) -> Vec<f64> {
    let (Some(ss), binary) = (ctx.capture.get(CaptureKind::SignalStrength), ctx.capture.binary())
    else {
        return Vec::new();
    };
    ss.iter().zip(binary.iter()).filter(|(_, b)| **b == 1.0).map(|(s, _)| *s).collect()
}

fn ss_intercept(ctx: &FitContext) -> Option<f64> {
    let max = recorded_strengths(ctx).into_iter().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return None;
    }
    match ctx.options.ss_options.map(|o| o.link) {
        Some(SsLink::Log) => Some(max.max(1e-3).ln()),
        _ => Some(max.max(1e-3)),
    }
}

fn ss_slope(ctx: &FitContext, spacing: f64) -> Option<f64> {
    let opts = ctx.options.ss_options?;
    let b0 = ss_intercept(ctx)?;
    let reach = match opts.link {
        SsLink::Log => b0 - opts.cutoff.max(1e-3).ln(),
        _ => b0 - opts.cutoff,
    };
    Some((reach / (2.0 * spacing)).max(1e-3))
}

fn ss_spread(ctx: &FitContext) -> f64 {
    let xs = recorded_strengths(ctx);
    if xs.len() < 2 {
        return 1.0;
    }
    let mean = xs.iter().sum::<f64>() / xs.len() as f64;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    let sd = var.sqrt();
    if sd.is_finite() && sd > 0.0 { sd } else { 1.0 }
}

fn density_start(ctx: &FitContext, resolved: &ParamValues) -> Option<f64> {
    let n = ctx.capture.n_detections() as f64;
    let total_area = ctx.mask.len() as f64 * ctx.mask.cell_area;
    let esa = DetectionFunction::from_values(
        ctx.options.detfn,
        ctx.options.ss_options.as_ref(),
        resolved,
    )
    .ok()
    .map(|f| ctx.mask.cell_area * f.surfaces(&ctx.geometry).p_dot().sum())
    .filter(|a| a.is_finite() && *a > 0.0)
    .unwrap_or(total_area);
    Some(n / esa)
}
