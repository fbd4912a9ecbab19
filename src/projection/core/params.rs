//! Projection parameters — the fixed inputs shared by every row.
//!
//! Purpose
//! -------
//! Define the contract a domain parameter record fulfils before evaluation
//! starts, and the [`Horizon`] helper that turns a coarse duration into the
//! number of rows to produce.
//!
//! Key behaviors
//! -------------
//! - [`LineParams::validate`] rejects missing or out-of-domain values; the
//!   evaluator calls it once before allocating anything.
//! - [`LineParams::horizon`] optionally exposes the record's own horizon so
//!   callers can evaluate "for the configured duration" without repeating it.
//! - [`Horizon::row_count`] is `duration_in_periods × periods_per_year`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameters are borrowed immutably for the whole evaluation.
//! - A [`Horizon`] built through [`Horizon::new`] has `periods_per_year >= 1`
//!   and a row count that fits in `usize`.
//!
//! Conventions
//! -----------
//! - "Period" is the coarse unit of the duration (typically a year), and
//!   "sub-period" is one row (typically a month).
use crate::projection::{
    core::validation::validate_count,
    errors::{ParamError, ParamResult},
};

/// Contract for a domain parameter record.
pub trait LineParams {
    /// Reject missing or out-of-domain parameters.
    fn validate(&self) -> ParamResult<()>;

    /// Configured horizon, when the record carries one.
    fn horizon(&self) -> Option<Horizon> {
        None
    }
}

impl LineParams for () {
    fn validate(&self) -> ParamResult<()> {
        Ok(())
    }
}

/// Horizon — projection length expressed as periods × sub-periods.
///
/// Fields
/// ------
/// - `duration_in_periods`: number of coarse periods (e.g. years); may be 0.
/// - `periods_per_year`: rows per coarse period (e.g. 12 for monthly rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    duration_in_periods: usize,
    periods_per_year: usize,
}

impl Horizon {
    /// Validated horizon.
    ///
    /// # Errors
    /// - [`ParamError::CountTooSmall`] when `periods_per_year == 0`.
    /// - [`ParamError::HorizonOverflow`] when the row count overflows `usize`.
    pub fn new(duration_in_periods: usize, periods_per_year: usize) -> ParamResult<Self> {
        validate_count("periods_per_year", periods_per_year, 1)?;
        duration_in_periods
            .checked_mul(periods_per_year)
            .ok_or(ParamError::HorizonOverflow { duration_in_periods, periods_per_year })?;
        Ok(Horizon { duration_in_periods, periods_per_year })
    }

    pub fn duration_in_periods(&self) -> usize {
        self.duration_in_periods
    }

    pub fn periods_per_year(&self) -> usize {
        self.periods_per_year
    }

    /// Number of rows to compute.
    pub fn row_count(&self) -> usize {
        self.duration_in_periods * self.periods_per_year
    }
}
