//! Python-boundary helpers shared by the `#[pyclass]` wrappers in the crate
//! root: argument parsing into validated core types and conversion of
//! exported columns into numpy arrays.
#[cfg(feature = "python-bindings")]
use ndarray::Array1;

#[cfg(feature = "python-bindings")]
use numpy::IntoPyArray; // Array1 → PyArray

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyDict};

#[cfg(feature = "python-bindings")]
use crate::projection::core::{
    aggregates::AggregateStrategy,
    options::{DriftCheck, EvalOptions},
    params::Horizon,
};

#[cfg(feature = "python-bindings")]
pub fn extract_horizon(duration_in_periods: usize, periods_per_year: usize) -> PyResult<Horizon> {
    Ok(Horizon::new(duration_in_periods, periods_per_year)?)
}

#[cfg(feature = "python-bindings")]
pub fn extract_strategy(strategy: Option<&str>) -> PyResult<AggregateStrategy> {
    let strategy_str = strategy.unwrap_or("incremental").to_lowercase();
    match strategy_str.as_str() {
        "incremental" | "running" => Ok(AggregateStrategy::Incremental),
        "recompute" | "rescan" => Ok(AggregateStrategy::Recompute),
        other => Err(PyValueError::new_err(format!(
            "invalid aggregate strategy {:?} (expected 'incremental' or 'recompute')",
            other
        ))),
    }
}

/// `None` keeps the build default; `Some(0.0)` disables the drift check.
#[cfg(feature = "python-bindings")]
pub fn extract_eval_options(drift_tolerance: Option<f64>) -> PyResult<EvalOptions> {
    let drift_check = match drift_tolerance {
        None => DriftCheck::for_build(),
        Some(tol) if tol == 0.0 => DriftCheck::Disabled,
        Some(tol) => DriftCheck::enabled(tol)?,
    };
    Ok(EvalOptions::new(drift_check, true))
}

/// Move named columns into a `dict[str, numpy.ndarray]`.
#[cfg(feature = "python-bindings")]
pub fn columns_to_dict<'py>(
    py: Python<'py>, columns: Vec<(&'static str, Array1<f64>)>,
) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    for (name, values) in columns {
        dict.set_item(name, values.into_pyarray(py))?;
    }
    Ok(dict)
}
