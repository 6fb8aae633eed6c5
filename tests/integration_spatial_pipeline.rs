//! End-to-end checks of the acoustic SCR pipeline through the public API:
//! data containers → context → likelihood / fit → posterior surfaces.
use approx::assert_relative_eq;
use ndarray::{Array2, array};
use rust_ascr::{
    optimization::loglik_optimizer::MLEOptions,
    spatial::{
        core::{
            CaptureHistory, CaptureKind, DetFnKind, Detectors, FitContext, Integration, Mask,
            ModelOptions, ParamName, ParamOverrides, ParamTable, ParamValues,
            SignalStrengthOptions, SsLink,
        },
        models::{
            InfoType, SpatialModel, contour_levels, detection_contributions, evaluate,
            posterior_surface, surface_mode,
        },
    },
};
use std::{collections::BTreeMap, f64::consts::PI};

// -----------------------------------------------------------------------------
// Scope
// -----
// These tests cover:
// - Bearing, time-of-arrival and combined posterior surfaces locating a call
//   at the expected mask point, including inconsistent bearings.
// - Pattern compression with per-detection signal strengths.
// - Local versus global integration for a model with auxiliary data.
// - A phased fit followed by posterior location and contour levels.
// -----------------------------------------------------------------------------

/// Row-major grid: index `i * n + j` holds `(x0 + i·step, x0 + j·step)`.
fn grid(n: usize, x0: f64, step: f64) -> Array2<f64> {
    Array2::from_shape_fn((n * n, 2), |(r, c)| {
        let (i, j) = (r / n, r % n);
        if c == 0 { x0 + i as f64 * step } else { x0 + j as f64 * step }
    })
}

fn values(pairs: &[(ParamName, f64)]) -> ParamValues {
    pairs.iter().copied().collect()
}

fn bearing_context(integration: Integration, buffer: f64) -> FitContext {
    let det = Detectors::new(array![[0.0, 0.0], [2.0, 0.0]]).unwrap();
    let mask = Mask::new(grid(5, -1.0, 1.0), 1.0, buffer).unwrap();
    let mut components = BTreeMap::new();
    components.insert(CaptureKind::Binary, array![[1.0, 1.0], [1.0, 0.0], [0.0, 1.0]]);
    components.insert(
        CaptureKind::Bearing,
        array![[PI / 4.0, 7.0 * PI / 4.0], [0.3, 0.0], [0.0, 5.9]],
    );
    let capture = CaptureHistory::new(components, 2).unwrap();
    let mut opts = ModelOptions::with_detfn(DetFnKind::HalfNormal).unwrap();
    opts.integration = integration;
    FitContext::new(det, mask, capture, opts).unwrap()
}

fn bearing_values() -> ParamValues {
    values(&[
        (ParamName::D, 1.0),
        (ParamName::G0, 0.9),
        (ParamName::Sigma, 1.5),
        (ParamName::Kappa, 50.0),
    ])
}

#[test]
// Purpose
// -------
// Crossing bearings from two detectors pin the call to their intersection.
//
// Given
// -----
// - Detectors at (0,0) and (2,0), a 5×5 unit mask on [-1, 3]².
// - Detection 0 heard at both with bearings π/4 and 7π/4.
//
// Expect
// ------
// - Bearing and combined surfaces both peak at (1,1) (index 12).
// - Both integrate to one over the mask.
fn crossing_bearings_locate_the_call() {
    let ctx = bearing_context(Integration::Local, 5.0);
    let vals = bearing_values();
    for info in [InfoType::Bearing, InfoType::Combined] {
        let surface = posterior_surface(&ctx, &vals, 0, info).unwrap();
        assert_eq!(surface_mode(&surface), Some(12), "{}", info.as_str());
        assert_relative_eq!(surface.sum() * ctx.mask.cell_area, 1.0, epsilon = 1e-10);
    }
    let capture_only = posterior_surface(&ctx, &vals, 0, InfoType::Capture).unwrap();
    assert_relative_eq!(capture_only.sum(), 1.0, epsilon = 1e-10);
    assert!(posterior_surface(&ctx, &vals, 0, InfoType::TimeOfArrival).is_err());
    assert!(posterior_surface(&ctx, &vals, 3, InfoType::Combined).is_err());
}

#[test]
// Purpose
// -------
// Inconsistent bearings from three detectors still give an interior mode.
//
// Given
// -----
// - Detectors at (0,0), (1,0), (0,1); a 5×5 unit mask on [-1, 3]².
// - One detection firing all three with bearings 0, π/2, π; kappa 10.
//
// Expect
// ------
// - The combined mode is (2,0) (index 16), away from the mask edge.
fn three_bearings_give_interior_mode() {
    let det = Detectors::new(array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]).unwrap();
    let mask = Mask::new(grid(5, -1.0, 1.0), 1.0, 10.0).unwrap();
    let mut components = BTreeMap::new();
    components.insert(CaptureKind::Binary, array![[1.0, 1.0, 1.0]]);
    components.insert(CaptureKind::Bearing, array![[0.0, PI / 2.0, PI]]);
    let capture = CaptureHistory::new(components, 3).unwrap();
    let opts = ModelOptions::with_detfn(DetFnKind::HalfNormal).unwrap();
    let ctx = FitContext::new(det, mask, capture, opts).unwrap();
    let vals = values(&[
        (ParamName::D, 1.0),
        (ParamName::G0, 0.9),
        (ParamName::Sigma, 5.0),
        (ParamName::Kappa, 10.0),
    ]);
    let surface = posterior_surface(&ctx, &vals, 0, InfoType::Combined).unwrap();
    let mode = surface_mode(&surface).unwrap();
    assert_eq!(mode, 16);
    let (x, y) = (ctx.mask.coords[[mode, 0]], ctx.mask.coords[[mode, 1]]);
    assert!(x > -1.0 && x < 3.0 && y > -1.0 && y < 3.0);
}

#[test]
// Purpose
// -------
// Arrival times alone locate a call heard on three detectors.
//
// Given
// -----
// - Detectors at (0,0), (100,0), (0,100); a 9×9 mask on [-50, 150]² with
//   spacing 25.
// - Arrival times generated from (50, 50) at the default sound speed.
//
// Expect
// ------
// - The time-of-arrival surface peaks at (50, 50) (index 40).
fn arrival_times_locate_the_call() {
    let det = Detectors::new(array![[0.0, 0.0], [100.0, 0.0], [0.0, 100.0]]).unwrap();
    let mask = Mask::new(grid(9, -50.0, 25.0), 625.0, 500.0).unwrap();
    let opts = ModelOptions::with_detfn(DetFnKind::HalfNormal).unwrap();
    let speed = opts.sound_speed;
    let source = [50.0, 50.0];
    let times = det.coords.rows().into_iter().map(|p| {
        let d = ((p[0] - source[0]).powi(2) + (p[1] - source[1]).powi(2)).sqrt();
        2.0 + d / speed
    });
    let toa = Array2::from_shape_vec((1, 3), times.collect()).unwrap();
    let mut components = BTreeMap::new();
    components.insert(CaptureKind::Binary, array![[1.0, 1.0, 1.0]]);
    components.insert(CaptureKind::TimeOfArrival, toa);
    let capture = CaptureHistory::new(components, 3).unwrap();
    let ctx = FitContext::new(det, mask, capture, opts).unwrap();

    let vals = values(&[
        (ParamName::D, 1e-4),
        (ParamName::G0, 0.9),
        (ParamName::Sigma, 60.0),
        (ParamName::SigmaToa, 1e-3),
    ]);
    let surface = posterior_surface(&ctx, &vals, 0, InfoType::TimeOfArrival).unwrap();
    assert_eq!(surface_mode(&surface), Some(40));
    assert_relative_eq!(surface.sum() * 625.0, 1.0, epsilon = 1e-10);
}

#[test]
// Purpose
// -------
// Detections sharing a pattern are compressed together while their
// signal strengths still give each its own contribution.
//
// Given
// -----
// - Three detectors in a line; two detections with pattern [1,0,1] and
//   different strengths; one with pattern [0,1,0].
//
// Expect
// ------
// - Two unique patterns with frequencies [2, 1].
// - Distinct finite contributions for the two [1,0,1] detections.
fn signal_strength_patterns_share_but_contributions_differ() {
    let det = Detectors::new(array![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]).unwrap();
    let mask = Mask::new(grid(5, -1.0, 1.0), 1.0, 4.0).unwrap();
    let mut components = BTreeMap::new();
    components.insert(CaptureKind::Binary, array![[1.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 0.0]]);
    components.insert(
        CaptureKind::SignalStrength,
        array![[62.0, 0.0, 55.0], [70.0, 0.0, 52.0], [0.0, 58.0, 0.0]],
    );
    let capture = CaptureHistory::new(components, 3).unwrap();
    let ss = SignalStrengthOptions::simple(SsLink::Identity, 50.0).unwrap();
    let opts = ModelOptions::new(
        DetFnKind::SignalStrength,
        Some(ss),
        None,
        Integration::Local,
        MLEOptions::default(),
    )
    .unwrap();
    let ctx = FitContext::new(det, mask, capture, opts).unwrap();
    assert_eq!(ctx.patterns.n_patterns(), 2);
    assert_eq!(ctx.patterns.frequencies, vec![2, 1]);
    assert!(ctx.per_detection());

    let vals = values(&[
        (ParamName::D, 0.5),
        (ParamName::B0Ss, 75.0),
        (ParamName::B1Ss, 8.0),
        (ParamName::SigmaSs, 6.0),
    ]);
    let table =
        ParamTable::resolve(&ctx.param_names(), &ParamOverrides::default(), |n, _| vals.get(n))
            .unwrap();
    let contributions = detection_contributions(&ctx, &table, &vals).unwrap().values;
    assert!(contributions.iter().all(|c| c.is_finite()));
    assert!((contributions[0] - contributions[1]).abs() > 1e-8);
    let ss_surface = posterior_surface(&ctx, &vals, 0, InfoType::SignalStrength).unwrap();
    assert_relative_eq!(ss_surface.sum(), 1.0, epsilon = 1e-10);
}

#[test]
// Purpose
// -------
// Local integration reproduces the global likelihood when every buffer
// covers the whole mask, with bearings in the model.
//
// Given
// -----
// - The bearing data set with buffer 10 (covers the mask) under both
//   integration modes.
//
// Expect
// ------
// - Equal log-likelihoods and effective sampled areas.
fn local_integration_matches_global_with_bearings() {
    let local = bearing_context(Integration::Local, 10.0);
    let global = bearing_context(Integration::Global, 10.0);
    let vals = bearing_values();
    let table = |ctx: &FitContext| {
        ParamTable::resolve(&ctx.param_names(), &ParamOverrides::default(), |n, _| vals.get(n))
            .unwrap()
    };
    let a = evaluate(&local, &table(&local), &vals).unwrap();
    let b = evaluate(&global, &table(&global), &vals).unwrap();
    assert_relative_eq!(a.log_likelihood(), b.log_likelihood(), epsilon = 1e-10);
    assert_relative_eq!(a.esa, b.esa, epsilon = 1e-12);
}

#[test]
// Purpose
// -------
// A full fit improves the likelihood and leaves a usable model for
// location.
//
// Given
// -----
// - Four detectors on a unit square, eight detections with noisy bearings.
// - g0 fixed at 0.9; sigma and kappa in phase 1, D in phase 2.
//
// Expect
// ------
// - Fitted log-likelihood ≥ start log-likelihood, positive estimates.
// - Normalized combined surfaces and contour levels that decrease as the
//   enclosed probability grows.
fn phased_fit_then_locate() {
    let det = Detectors::new(array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]).unwrap();
    let mask = Mask::new(grid(9, -1.5, 0.5), 0.25, 2.0).unwrap();
    let binary = array![
        [1.0, 1.0, 0.0, 0.0],
        [1.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0, 1.0],
        [1.0, 1.0, 1.0, 1.0],
        [0.0, 1.0, 0.0, 0.0],
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 1.0],
        [1.0, 1.0, 1.0, 0.0],
    ];
    let bearing = array![
        [0.2, 5.9, 0.0, 0.0],
        [0.9, 0.0, 2.1, 0.0],
        [0.0, 0.0, 1.4, 4.5],
        [0.8, 5.5, 2.3, 3.8],
        [0.0, 3.3, 0.0, 0.0],
        [4.0, 0.0, 0.0, 0.0],
        [0.0, 1.2, 0.0, 2.0],
        [0.6, 5.6, 2.6, 0.0],
    ];
    let mut components = BTreeMap::new();
    components.insert(CaptureKind::Binary, binary);
    components.insert(CaptureKind::Bearing, bearing);
    let capture = CaptureHistory::new(components, 4).unwrap();
    let opts = ModelOptions::with_detfn(DetFnKind::HalfNormal).unwrap();
    let mut overrides = ParamOverrides::default();
    overrides.fixed.insert(ParamName::G0, 0.9);
    overrides.phases.insert(ParamName::D, 2);
    let mut model = SpatialModel::new(det, mask, capture, opts, &overrides).unwrap();

    let start = model.evaluate(&model.table.start_values()).unwrap().log_likelihood();
    let fit = model.fit().unwrap().clone();
    assert!(fit.log_likelihood().is_finite());
    assert!(fit.log_likelihood() >= start - 1e-8);
    for name in [ParamName::D, ParamName::Sigma, ParamName::Kappa] {
        assert!(fit.params.get(name).unwrap() > 0.0, "{name}");
    }
    assert_eq!(fit.params.get(ParamName::G0), Some(0.9));

    let cell_area = model.context.mask.cell_area;
    let surface = model.locate(3, InfoType::Combined).unwrap();
    assert_relative_eq!(surface.sum() * cell_area, 1.0, epsilon = 1e-10);
    let levels = contour_levels(&surface, cell_area, &[0.5, 0.9, 0.99]).unwrap();
    assert!(levels[0] >= levels[1] && levels[1] >= levels[2]);
    assert_eq!(model.detection_contributions().unwrap().values.len(), 8);
}
