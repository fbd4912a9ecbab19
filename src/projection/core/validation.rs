//! Parameter validation helpers.
//!
//! Small, composable checks used by `LineParams::validate` implementations.
//! Each helper returns the validated value so checks can be written inline:
//!
//! ```
//! use rust_projection::projection::core::validation::{validate_positive, validate_unit_interval};
//!
//! let principal = validate_positive("principal", 250_000.0)?;
//! let rate = validate_unit_interval("annual_rate", 0.045)?;
//! # assert_eq!((principal, rate), (250_000.0, 0.045));
//! # Ok::<(), rust_projection::projection::errors::ParamError>(())
//! ```
//!
//! All helpers reject NaN/±inf first, so a non-finite value is always
//! reported as [`ParamError::NonFinite`] regardless of the range being checked.
use crate::projection::errors::{ParamError, ParamResult};

/// Require a finite value.
pub fn validate_finite(name: &'static str, value: f64) -> ParamResult<f64> {
    if !value.is_finite() {
        return Err(ParamError::NonFinite { name, value });
    }
    Ok(value)
}

/// Require a finite value > 0.
pub fn validate_positive(name: &'static str, value: f64) -> ParamResult<f64> {
    validate_finite(name, value)?;
    if value <= 0.0 {
        return Err(ParamError::NonPositive { name, value });
    }
    Ok(value)
}

/// Require a finite value >= 0.
pub fn validate_non_negative(name: &'static str, value: f64) -> ParamResult<f64> {
    validate_finite(name, value)?;
    if value < 0.0 {
        return Err(ParamError::Negative { name, value });
    }
    Ok(value)
}

/// Require a finite value in `[min, max]`.
pub fn validate_range(name: &'static str, value: f64, min: f64, max: f64) -> ParamResult<f64> {
    validate_finite(name, value)?;
    if value < min || value > max {
        return Err(ParamError::OutOfRange { name, value, min, max });
    }
    Ok(value)
}

/// Require a finite value in `[0, 1]` (rates, fractions).
pub fn validate_unit_interval(name: &'static str, value: f64) -> ParamResult<f64> {
    validate_range(name, value, 0.0, 1.0)
}

/// Require an integer parameter of at least `min`.
pub fn validate_count(name: &'static str, value: usize, min: usize) -> ParamResult<usize> {
    if value < min {
        return Err(ParamError::CountTooSmall { name, value, min });
    }
    Ok(value)
}

/// Unwrap an optional parameter.
pub fn require<T>(name: &'static str, value: Option<T>) -> ParamResult<T> {
    value.ok_or(ParamError::MissingParameter { name })
}
