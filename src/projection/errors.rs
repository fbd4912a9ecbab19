//! Errors for line-by-line projections (parameter validation, formula plan
//! verification, history access, and aggregate self-checks).
//!
//! This module defines the evaluation error type, [`CalcError`], the parameter
//! error type, [`ParamError`], and the plan error type, [`PlanError`]. All
//! three implement `Display`/`Error`; with the `python-bindings` feature they
//! also convert to `PyErr`.
//!
//! ## Conventions
//! - **Indices are 0-based** and refer to positions in the output sequence,
//!   including a seeded row 0 when one is registered.
//! - Every error is fatal to the current `compute_results` call; no partial
//!   sequence is ever returned alongside an error.
//! - `UndefinedHistory` signals a formula-authoring bug (reading a row that
//!   does not exist yet), never a data problem.
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Crate-wide result alias for evaluation paths that may produce [`CalcError`].
pub type CalcResult<T> = Result<T, CalcError>;

/// Result alias for parameter validation paths that may produce [`ParamError`].
pub type ParamResult<T> = Result<T, ParamError>;

/// Result alias for formula-plan construction that may produce [`PlanError`].
pub type PlanResult<T> = Result<T, PlanError>;

/// Unified error type for row-sequence evaluation.
///
/// Covers parameter rejection, invalid formula plans, out-of-range history
/// reads, non-finite formula output, and incremental-aggregate drift.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcError {
    // ---- Before evaluation ----
    /// Parameters are missing or violate a documented domain constraint.
    InvalidParameters(ParamError),

    /// The registered formulas do not form a valid plan for the row type.
    InvalidPlan(PlanError),

    /// Drift tolerance must be finite and > 0.
    InvalidDriftTolerance { value: f64 },

    // ---- During evaluation ----
    /// The output buffer for `rows` rows could not be allocated.
    CapacityExceeded { rows: usize },

    /// A formula read a row outside `[0, index)`.
    UndefinedHistory { index: usize, requested: isize },

    /// A formula asked for an aggregate handle that this evaluator never issued.
    UnknownAggregate { handle: usize },

    /// A formula produced NaN/±inf.
    NonFiniteValue { index: usize, field: &'static str, value: f64 },

    /// Incremental aggregate disagrees with a full recomputation.
    AggregateDrift { aggregate: &'static str, index: usize, incremental: f64, recomputed: f64 },
}

impl std::error::Error for CalcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CalcError::InvalidParameters(err) => Some(err),
            CalcError::InvalidPlan(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for CalcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalcError::InvalidParameters(err) => {
                write!(f, "Invalid parameters: {err}")
            }
            CalcError::InvalidPlan(err) => {
                write!(f, "Invalid formula plan: {err}")
            }
            CalcError::InvalidDriftTolerance { value } => {
                write!(f, "Drift tolerance must be finite and > 0; got: {value}")
            }
            CalcError::UndefinedHistory { index, requested } => {
                write!(
                    f,
                    "Row {index} referenced row {requested}, outside the computed history [0, {index})"
                )
            }
            CalcError::UnknownAggregate { handle } => {
                write!(f, "Aggregate handle {handle} is not registered with this evaluator.")
            }
            CalcError::CapacityExceeded { rows } => {
                write!(f, "Cannot allocate an output sequence of {rows} rows")
            }
            CalcError::NonFiniteValue { index, field, value } => {
                write!(f, "Formula for '{field}' produced a non-finite value at row {index}: {value}")
            }
            CalcError::AggregateDrift { aggregate, index, incremental, recomputed } => {
                write!(
                    f,
                    "Aggregate '{aggregate}' drifted at row {index}: incremental {incremental}, recomputed {recomputed}"
                )
            }
        }
    }
}

impl From<ParamError> for CalcError {
    fn from(err: ParamError) -> CalcError {
        CalcError::InvalidParameters(err)
    }
}

impl From<PlanError> for CalcError {
    fn from(err: PlanError) -> CalcError {
        CalcError::InvalidPlan(err)
    }
}

/// Convert a [`CalcError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl From<CalcError> for PyErr {
    fn from(err: CalcError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// Errors specific to parameter construction and validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// A required parameter was not supplied.
    MissingParameter { name: &'static str },

    /// Parameter must be finite.
    NonFinite { name: &'static str, value: f64 },

    /// Parameter must be > 0.
    NonPositive { name: &'static str, value: f64 },

    /// Parameter must be >= 0.
    Negative { name: &'static str, value: f64 },

    /// Parameter must lie in `[min, max]`.
    OutOfRange { name: &'static str, value: f64, min: f64, max: f64 },

    /// Integer parameter is below its minimum.
    CountTooSmall { name: &'static str, value: usize, min: usize },

    /// `duration_in_periods * periods_per_year` does not fit in `usize`.
    HorizonOverflow { duration_in_periods: usize, periods_per_year: usize },
}

impl std::error::Error for ParamError {}

impl std::fmt::Display for ParamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamError::MissingParameter { name } => {
                write!(f, "Required parameter '{name}' is missing")
            }
            ParamError::NonFinite { name, value } => {
                write!(f, "Parameter '{name}' must be finite, got {value}")
            }
            ParamError::NonPositive { name, value } => {
                write!(f, "Parameter '{name}' must be finite and > 0, got {value}")
            }
            ParamError::Negative { name, value } => {
                write!(f, "Parameter '{name}' must be finite and >= 0, got {value}")
            }
            ParamError::OutOfRange { name, value, min, max } => {
                write!(f, "Parameter '{name}' must lie in [{min}, {max}], got {value}")
            }
            ParamError::CountTooSmall { name, value, min } => {
                write!(f, "Parameter '{name}' must be at least {min}, got {value}")
            }
            ParamError::HorizonOverflow { duration_in_periods, periods_per_year } => {
                write!(
                    f,
                    "Horizon overflow: {duration_in_periods} periods x {periods_per_year} sub-periods"
                )
            }
        }
    }
}

/// Convert a [`ParamError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl From<ParamError> for PyErr {
    fn from(err: ParamError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// Errors raised while verifying a formula plan against its row schema.
///
/// These are detected once, when an evaluator is built, never per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A formula writes a field the row type does not declare.
    UnknownField { field: &'static str },

    /// Two formulas write the same field.
    DuplicateField { field: &'static str },

    /// A declared field has no formula.
    MissingFormula { field: &'static str },

    /// A formula depends on a field the row type does not declare.
    UnknownDependency { field: &'static str, dependency: &'static str },

    /// Same-row dependencies form a cycle through these fields.
    CyclicDependency { fields: Vec<&'static str> },

    /// Trailing windows must cover at least one row.
    InvalidWindow { aggregate: &'static str },

    /// Two aggregates share a name.
    DuplicateAggregate { aggregate: &'static str },
}

impl std::error::Error for PlanError {}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::UnknownField { field } => {
                write!(f, "Formula writes undeclared field '{field}'")
            }
            PlanError::DuplicateField { field } => {
                write!(f, "Field '{field}' is produced by more than one formula")
            }
            PlanError::MissingFormula { field } => {
                write!(f, "Field '{field}' is declared but has no formula")
            }
            PlanError::UnknownDependency { field, dependency } => {
                write!(f, "Formula for '{field}' depends on undeclared field '{dependency}'")
            }
            PlanError::CyclicDependency { fields } => {
                write!(f, "Same-row dependency cycle through: {}", fields.join(", "))
            }
            PlanError::InvalidWindow { aggregate } => {
                write!(f, "Aggregate '{aggregate}' has an empty trailing window")
            }
            PlanError::DuplicateAggregate { aggregate } => {
                write!(f, "Aggregate name '{aggregate}' is registered twice")
            }
        }
    }
}

/// Convert a [`PlanError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl From<PlanError> for PyErr {
    fn from(err: PlanError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
