//! Conversion helpers between Python objects and the spatial model types.
//!
//! Only compiled with the `python-bindings` feature. Every helper validates
//! shapes on the Python side of the boundary and defers value checks to the
//! Rust constructors, whose errors convert into `PyErr`.
use std::{collections::BTreeMap, str::FromStr};

use ndarray::Array2;
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1, PyReadonlyArray2,
};
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
    types::{PyAny, PyDict},
};

use crate::{
    optimization::loglik_optimizer::traits::{LineSearcher, MLEOptions, Tolerances},
    spatial::core::{
        data::{CaptureHistory, CaptureKind},
        options::{DetFnKind, Integration, ModelOptions, SignalStrengthOptions, SsLink},
        params::{ParamName, ParamOverrides, ParamValues},
    },
};

/// 1-D `float64` array from a numpy array, pandas Series or sequence.
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err("expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64")
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Owned `(rows × cols)` matrix from a 2-D numpy array, DataFrame or nested
/// sequence.
pub fn extract_f64_matrix<'py>(raw_data: &Bound<'py, PyAny>) -> PyResult<Array2<f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr_ro.as_array().to_owned());
    }
    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(frame_ro) = obj.extract::<PyReadonlyArray2<f64>>() {
            return Ok(frame_ro.as_array().to_owned());
        }
    }
    let rows: Vec<Vec<f64>> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err("expected a 2-D numpy.ndarray, pandas.DataFrame, or nested sequence")
    })?;
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(PyValueError::new_err("all rows must have the same length"));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((flat.len() / ncols.max(1), ncols), flat)
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Capture history from a dict of component name → `(n × k)` matrix.
pub fn extract_capture<'py>(
    capture: &Bound<'py, PyDict>, n_detectors: usize,
) -> PyResult<CaptureHistory> {
    let mut components = BTreeMap::new();
    for (key, value) in capture.iter() {
        let name: String = key.extract()?;
        let kind = CaptureKind::from_str(&name)?;
        components.insert(kind, extract_f64_matrix(&value)?);
    }
    Ok(CaptureHistory::new(components, n_detectors)?)
}

/// Parameter overrides from optional dicts keyed by parameter name.
pub fn extract_overrides<'py>(
    start: Option<&Bound<'py, PyDict>>, fixed: Option<&Bound<'py, PyDict>>,
    bounds: Option<&Bound<'py, PyDict>>, phases: Option<&Bound<'py, PyDict>>,
    scale_factors: Option<&Bound<'py, PyDict>>,
) -> PyResult<ParamOverrides> {
    let mut overrides = ParamOverrides::default();
    for (key, value) in dict_items(start)? {
        overrides.start.insert(key, value.extract()?);
    }
    for (key, value) in dict_items(fixed)? {
        overrides.fixed.insert(key, value.extract()?);
    }
    for (key, value) in dict_items(bounds)? {
        overrides.bounds.insert(key, value.extract()?);
    }
    for (key, value) in dict_items(phases)? {
        overrides.phases.insert(key, value.extract()?);
    }
    for (key, value) in dict_items(scale_factors)? {
        overrides.scale_factors.insert(key, value.extract()?);
    }
    Ok(overrides)
}

/// Natural-scale parameter values from a dict keyed by parameter name.
pub fn extract_param_values<'py>(values: &Bound<'py, PyDict>) -> PyResult<ParamValues> {
    let mut out = ParamValues::new();
    for (name, value) in dict_items(Some(values))? {
        out.set(name, value.extract()?);
    }
    Ok(out)
}

/// Validated model options from Python keyword arguments.
pub fn build_model_options(
    detfn: &str, ss_link: Option<&str>, cutoff: Option<f64>, lower_cutoff: Option<f64>,
    directional: bool, het_source: bool, n_dir_quadpoints: Option<usize>,
    n_het_source_quadpoints: Option<usize>, sound_speed: Option<f64>, local: bool,
    mle_opts: MLEOptions,
) -> PyResult<ModelOptions> {
    let detfn = DetFnKind::from_str(detfn)?;
    let ss_options = match cutoff {
        Some(cutoff) => {
            let link = match ss_link {
                Some(name) => SsLink::from_str(name)?,
                None => SsLink::Identity,
            };
            Some(SignalStrengthOptions::new(
                link,
                cutoff,
                lower_cutoff,
                directional,
                het_source,
                n_dir_quadpoints,
                n_het_source_quadpoints,
            )?)
        }
        None => None,
    };
    let integration = if local { Integration::Local } else { Integration::Global };
    Ok(ModelOptions::new(detfn, ss_options, sound_speed, integration, mle_opts)?)
}

pub fn extract_mle_opts(
    tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    line_searcher: Option<&str>, lbfgs_mem: Option<usize>,
) -> PyResult<MLEOptions> {
    let defaults = MLEOptions::default();
    let tols = if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
        defaults.tols
    } else {
        Tolerances::new(tol_grad, tol_cost, max_iter)?
    };
    let ls = match line_searcher {
        Some(name) => LineSearcher::from_str(name)?,
        None => defaults.line_searcher,
    };
    Ok(MLEOptions::new(tols, ls, false, lbfgs_mem.or(defaults.lbfgs_mem))?)
}

/// `(n × 2)` coordinates from a Python array.
pub fn extract_coords<'py>(raw: &Bound<'py, PyAny>, what: &str) -> PyResult<Array2<f64>> {
    let coords = extract_f64_matrix(raw)?;
    if coords.ncols() != 2 {
        return Err(PyValueError::new_err(format!("{what} must have exactly two columns")));
    }
    Ok(coords)
}

// ---- Helper Methods ----

fn dict_items<'py>(
    dict: Option<&Bound<'py, PyDict>>,
) -> PyResult<Vec<(ParamName, Bound<'py, PyAny>)>> {
    let Some(dict) = dict else {
        return Ok(Vec::new());
    };
    dict.iter()
        .map(|(key, value)| {
            let name: String = key.extract()?;
            Ok((ParamName::from_str(&name)?, value))
        })
        .collect()
}
