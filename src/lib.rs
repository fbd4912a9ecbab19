//! rust_projection — incremental line-by-line projections with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the demonstration projection models to Python via the
//! `_rust_projection` extension module. When the `python-bindings` feature is
//! enabled, this module defines the Python-facing classes and submodules used
//! by the `rust_projection` package.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust module (`projection`) as the public crate
//!   surface.
//! - Define `#[pyclass]` wrappers (`Amortization`, `CohortProjection`) and the
//!   `#[pymodule]` initializer for the `_rust_projection` extension.
//! - Register the `models` submodule under `rust_projection` so dotted
//!   imports work as expected.
//!
//! Invariants & assumptions
//! ------------------------
//! - All evaluation happens in the inner Rust modules; this file performs
//!   only FFI glue, argument conversion, and error mapping.
//! - Python wrappers validate their parameters at construction time, so a
//!   constructed object always holds parameters that pass
//!   `LineParams::validate`.
//!
//! Conventions
//! -----------
//! - Python-exposed classes live under `_rust_projection.models` and return
//!   results as `dict[str, numpy.ndarray]`, one entry per row field, flags
//!   encoded as `0.0` / `1.0`.
//! - Errors from core Rust code are converted to `ValueError` at the PyO3
//!   boundary.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on `projection` directly and can ignore
//!   the items guarded by the `python-bindings` feature.
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules and by the
//!   integration tests in `tests/`; the PyO3 layer is exercised from Python.

pub mod projection;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyDict};

#[cfg(feature = "python-bindings")]
use crate::{
    projection::{
        core::{evaluator::RowSequenceEvaluator, params::LineParams},
        models::{
            amortization::{self, AmortizationRow, LoanParams},
            cohort::{self, CohortParams, CohortRow},
        },
    },
    utils::{columns_to_dict, extract_eval_options, extract_horizon, extract_strategy},
};

/// Amortization — Python-facing wrapper for the loan schedule model.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `Amortization(principal, annual_rate, duration_in_periods, periods_per_year=12,
/// extra_payment=0.0, extra_payment_from=0, strategy=None, drift_tolerance=None)`:
/// - `strategy`: `"incremental"` (default) or `"recompute"` aggregates.
/// - `drift_tolerance`: `None` keeps the build default, `0.0` disables the
///   incremental-aggregate self-check.
///
/// Fields
/// ------
/// - `evaluator`: schedule evaluator built for `periods_per_year`.
/// - `params`: validated [`LoanParams`].
///
/// Notes
/// -----
/// - Rust callers should use `projection::models::amortization` directly.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_projection.models")]
pub struct Amortization {
    evaluator: RowSequenceEvaluator<LoanParams, AmortizationRow>,
    params: LoanParams,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl Amortization {
    #[new]
    #[pyo3(signature = (
        principal, annual_rate, duration_in_periods, periods_per_year = 12,
        extra_payment = 0.0, extra_payment_from = 0, strategy = None, drift_tolerance = None
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        principal: f64, annual_rate: f64, duration_in_periods: usize, periods_per_year: usize,
        extra_payment: f64, extra_payment_from: usize, strategy: Option<&str>,
        drift_tolerance: Option<f64>,
    ) -> PyResult<Amortization> {
        let horizon = extract_horizon(duration_in_periods, periods_per_year)?;
        let params = LoanParams::new(principal, annual_rate, horizon)
            .with_extra_payment(extra_payment, extra_payment_from);
        params.validate()?;

        let evaluator = amortization::evaluator(periods_per_year, extract_strategy(strategy)?)?
            .with_options(extract_eval_options(drift_tolerance)?);
        Ok(Amortization { evaluator, params })
    }

    /// Compute the schedule; returns `dict[str, numpy.ndarray]`.
    pub fn compute<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let rows = self.evaluator.compute_horizon(&self.params)?;
        columns_to_dict(py, amortization::columns(&rows))
    }

    #[getter]
    pub fn level_payment(&self) -> f64 {
        self.params.level_payment()
    }

    #[getter]
    pub fn row_count(&self) -> usize {
        self.params.horizon.row_count()
    }
}

/// CohortProjection — Python-facing wrapper for the seeded cohort model.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `CohortProjection(initial_population, birth_rate, mortality_rate,
/// maturity_lag, duration_in_periods, periods_per_year=12,
/// harvest_threshold=inf, harvest_fraction=0.0, max_harvests_per_year=0,
/// strategy=None, drift_tolerance=None)`.
///
/// Notes
/// -----
/// - `compute()` returns `row_count + 1` entries per column; entry 0 is the
///   seeded initial state.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_projection.models")]
pub struct CohortProjection {
    evaluator: RowSequenceEvaluator<CohortParams, CohortRow>,
    params: CohortParams,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl CohortProjection {
    #[new]
    #[pyo3(signature = (
        initial_population, birth_rate, mortality_rate, maturity_lag, duration_in_periods,
        periods_per_year = 12, harvest_threshold = f64::INFINITY, harvest_fraction = 0.0,
        max_harvests_per_year = 0, strategy = None, drift_tolerance = None
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        initial_population: f64, birth_rate: f64, mortality_rate: f64, maturity_lag: usize,
        duration_in_periods: usize, periods_per_year: usize, harvest_threshold: f64,
        harvest_fraction: f64, max_harvests_per_year: usize, strategy: Option<&str>,
        drift_tolerance: Option<f64>,
    ) -> PyResult<CohortProjection> {
        let harvest_threshold = cohort::harvest_threshold_or_never(harvest_threshold);
        let params = CohortParams {
            initial_population,
            birth_rate,
            mortality_rate,
            maturity_lag,
            harvest_threshold,
            harvest_fraction,
            max_harvests_per_year,
            horizon: extract_horizon(duration_in_periods, periods_per_year)?,
        };
        params.validate()?;

        let evaluator = cohort::evaluator(periods_per_year, extract_strategy(strategy)?)?
            .with_options(extract_eval_options(drift_tolerance)?);
        Ok(CohortProjection { evaluator, params })
    }

    /// Run the projection; returns `dict[str, numpy.ndarray]`.
    pub fn compute<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let rows = self.evaluator.compute_horizon(&self.params)?;
        columns_to_dict(py, cohort::columns(&rows))
    }

    #[getter]
    pub fn row_count(&self) -> usize {
        self.params.horizon.row_count() + 1
    }
}

/// _rust_projection — PyO3 module initializer for the Python extension.
///
/// Key behaviors
/// -------------
/// - Create the `models` submodule and attach it to `_rust_projection`.
/// - Register it in `sys.modules` so it is importable via a dotted path.
///
/// Errors
/// ------
/// - `PyErr`
///   If creating the submodule or manipulating `sys.modules` fails.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_projection<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let models_mod = PyModule::new(_py, "models")?;
    models(_py, m, &models_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?.getattr("modules")?.set_item("rust_projection.models", models_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn models<'py>(
    _py: Python, rust_projection: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<Amortization>()?;
    m.add_class::<CohortProjection>()?;
    rust_projection.add_submodule(m)?;
    Ok(())
}
