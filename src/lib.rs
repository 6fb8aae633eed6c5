//! rust_ascr — acoustic spatial capture–recapture density estimation.
//!
//! Purpose
//! -------
//! Estimate the density of calling animals from detections on an array of
//! acoustic detectors, using the full spatial capture–recapture likelihood
//! integrated over a discrete mask. Detections may carry bearings,
//! distances, received signal strengths and arrival times in addition to the
//! binary capture pattern. With the `python-bindings` feature, this module
//! also defines the `_rust_ascr` extension module.
//!
//! Key behaviors
//! -------------
//! - [`spatial`] holds the data containers, geometry, detection functions,
//!   auxiliary densities, likelihood, phased fitting and posterior location.
//! - [`optimization`] provides the L-BFGS maximizer and numerically stable
//!   log-space primitives.
//! - [`inference`] turns the observed information into standard errors.
//! - Under `python-bindings`, [`AcousticModel`] wraps
//!   [`SpatialModel`](spatial::models::SpatialModel) for Python callers.
//!
//! Conventions
//! -----------
//! - Rust errors ([`spatial::errors::ScrError`],
//!   [`spatial::errors::ParamError`],
//!   [`optimization::errors::OptError`]) are converted to `ValueError` at the
//!   PyO3 boundary.
//! - Logging goes through the `log` facade; binaries and Python hosts choose
//!   the logger.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; `tests/integration_spatial_pipeline.rs`
//!   runs complete fits and posterior surfaces.

pub mod inference;
pub mod optimization;
pub mod spatial;
#[cfg(feature = "python-bindings")]
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{
    prelude::*,
    types::{PyAny, PyDict},
};

#[cfg(feature = "python-bindings")]
use crate::{
    spatial::{
        core::data::{Detectors, Mask},
        models::{
            fit::SpatialModel,
            locate::{InfoType, contour_levels, surface_mode},
        },
    },
    utils::{
        build_model_options, extract_capture, extract_coords, extract_f64_array,
        extract_mle_opts, extract_overrides, extract_param_values,
    },
};

/// AcousticModel — Python-facing acoustic SCR model.
///
/// Constructed from detector and mask coordinates, a dict of capture
/// components (`"bincapt"`, `"bearing"`, `"dist"`, `"ss"`, `"toa"`,
/// `"mrds"`) and keyword configuration. `fit()` runs the phased
/// maximum-likelihood fit; fitted values, standard errors and posterior
/// surfaces are read back afterwards.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_ascr.models", unsendable)]
pub struct AcousticModel {
    inner: SpatialModel,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl AcousticModel {
    #[new]
    #[pyo3(
        signature = (
            traps,
            mask,
            cell_area,
            buffer,
            capt,
            detfn = "hn",
            ss_link = None,
            cutoff = None,
            lower_cutoff = None,
            directional = false,
            het_source = false,
            n_dir_quadpoints = None,
            n_het_source_quadpoints = None,
            sound_speed = None,
            local = true,
            sv = None,
            fix = None,
            bounds = None,
            phases = None,
            sf = None,
            tol_grad = None,
            tol_cost = None,
            max_iter = None,
            line_searcher = None,
            lbfgs_mem = None,
        ),
        text_signature = "(traps, mask, cell_area, buffer, capt, /, detfn='hn', ss_link=None, \
                          cutoff=None, lower_cutoff=None, directional=False, het_source=False, \
                          n_dir_quadpoints=None, n_het_source_quadpoints=None, sound_speed=None, \
                          local=True, sv=None, fix=None, bounds=None, phases=None, sf=None, \
                          tol_grad=None, tol_cost=None, max_iter=None, line_searcher=None, \
                          lbfgs_mem=None)"
    )]
    pub fn new<'py>(
        traps: &Bound<'py, PyAny>, mask: &Bound<'py, PyAny>, cell_area: f64, buffer: f64,
        capt: &Bound<'py, PyDict>, detfn: &str, ss_link: Option<&str>, cutoff: Option<f64>,
        lower_cutoff: Option<f64>, directional: bool, het_source: bool,
        n_dir_quadpoints: Option<usize>, n_het_source_quadpoints: Option<usize>,
        sound_speed: Option<f64>, local: bool, sv: Option<&Bound<'py, PyDict>>,
        fix: Option<&Bound<'py, PyDict>>, bounds: Option<&Bound<'py, PyDict>>,
        phases: Option<&Bound<'py, PyDict>>, sf: Option<&Bound<'py, PyDict>>,
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
        line_searcher: Option<&str>, lbfgs_mem: Option<usize>,
    ) -> PyResult<Self> {
        let detectors = Detectors::new(extract_coords(traps, "traps")?)?;
        let mask = Mask::new(extract_coords(mask, "mask")?, cell_area, buffer)?;
        let capture = extract_capture(capt, detectors.len())?;
        let mle_opts = extract_mle_opts(tol_grad, tol_cost, max_iter, line_searcher, lbfgs_mem)?;
        let options = build_model_options(
            detfn,
            ss_link,
            cutoff,
            lower_cutoff,
            directional,
            het_source,
            n_dir_quadpoints,
            n_het_source_quadpoints,
            sound_speed,
            local,
            mle_opts,
        )?;
        let overrides = extract_overrides(sv, fix, bounds, phases, sf)?;
        let inner = SpatialModel::new(detectors, mask, capture, options, &overrides)?;
        Ok(AcousticModel { inner })
    }

    /// `(negative log-likelihood, effective sampled area)` at natural-scale
    /// parameter values given as a dict.
    pub fn evaluate<'py>(&self, params: &Bound<'py, PyDict>) -> PyResult<(f64, f64)> {
        let values = extract_param_values(params)?;
        let evaluation = self.inner.evaluate(&values)?;
        Ok((evaluation.neg_log_likelihood, evaluation.esa))
    }

    pub fn fit(&mut self) -> PyResult<()> {
        self.inner.fit()?;
        Ok(())
    }

    /// Normalized posterior surface of one detection over the mask.
    #[pyo3(signature = (detection, info = "combined"))]
    pub fn locate(&self, detection: usize, info: &str) -> PyResult<Vec<f64>> {
        let info: InfoType = info.parse()?;
        Ok(self.inner.locate(detection, info)?.to_vec())
    }

    /// Density levels enclosing each probability mass of a posterior surface.
    #[pyo3(signature = (detection, probs, info = "combined"))]
    pub fn contour_levels<'py>(
        &self, py: Python<'py>, detection: usize, probs: &Bound<'py, PyAny>, info: &str,
    ) -> PyResult<Vec<f64>> {
        let info: InfoType = info.parse()?;
        let probs = extract_f64_array(py, probs)?;
        let surface = self.inner.locate(detection, info)?;
        let probs = probs.as_array().to_vec();
        Ok(contour_levels(&surface, self.inner.context.mask.cell_area, &probs)?)
    }

    /// Mask index of the posterior mode.
    #[pyo3(signature = (detection, info = "combined"))]
    pub fn mode(&self, detection: usize, info: &str) -> PyResult<Option<usize>> {
        let info: InfoType = info.parse()?;
        Ok(surface_mode(&self.inner.locate(detection, info)?))
    }

    #[getter]
    pub fn coefficients(&self) -> PyResult<Vec<(String, f64)>> {
        let fit = self.inner.fit_result()?;
        Ok(fit.params.iter().map(|(name, v)| (name.to_string(), v)).collect())
    }

    #[getter]
    pub fn standard_errors(&self) -> PyResult<Option<Vec<(String, f64)>>> {
        let fit = self.inner.fit_result()?;
        Ok(fit
            .standard_errors
            .as_ref()
            .map(|ses| ses.iter().map(|(name, se)| (name.to_string(), *se)).collect()))
    }

    #[getter]
    pub fn log_likelihood(&self) -> PyResult<f64> {
        Ok(self.inner.fit_result()?.log_likelihood())
    }

    #[getter]
    pub fn esa(&self) -> PyResult<f64> {
        Ok(self.inner.fit_result()?.esa())
    }

    #[getter]
    pub fn converged(&self) -> PyResult<bool> {
        let fit = self.inner.fit_result()?;
        Ok(fit.outcome.as_ref().is_none_or(|o| o.converged))
    }

    /// Per-detection log-likelihood contributions at the estimates.
    #[getter]
    pub fn contributions(&self) -> PyResult<Vec<f64>> {
        Ok(self.inner.detection_contributions()?.values.to_vec())
    }

    #[getter]
    pub fn warnings(&self) -> PyResult<Vec<String>> {
        let fit = self.inner.fit_result()?;
        Ok(fit.evaluation.warnings.iter().map(|w| format!("{w:?}")).collect())
    }
}

/// _rust_ascr — PyO3 module initializer.
///
/// Registers the `models` submodule and makes it importable as
/// `rust_ascr.models` through `sys.modules`.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_ascr<'py>(py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let models_mod = PyModule::new(py, "models")?;
    models_mod.add_class::<AcousticModel>()?;
    m.add_submodule(&models_mod)?;
    py.import("sys")?.getattr("modules")?.set_item("rust_ascr.models", models_mod)?;
    Ok(())
}
