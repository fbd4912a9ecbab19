//! Evaluation options — runtime switches for a row-sequence evaluator.
//!
//! Purpose
//! -------
//! Collect the knobs that change how an evaluation is checked, not what it
//! computes: the incremental-aggregate self-check and the non-finite guard.
//! Formulas and aggregates stay free of ad-hoc flags.
//!
//! Key behaviors
//! -------------
//! - [`DriftCheck`] enables the comparison of every running aggregate against
//!   a full recomputation after each row. Construction validates the
//!   tolerance.
//! - [`EvalOptions::default`] turns the drift check on in debug builds
//!   (tolerance `1e-6`) and off in release builds, and always guards against
//!   non-finite formula output.
//!
//! Invariants & assumptions
//! ------------------------
//! - `DriftCheck::Enabled { tolerance }` always carries a finite, positive
//!   tolerance when built through [`DriftCheck::enabled`].
//! - Options never influence the values of a successful evaluation; they only
//!   decide whether some evaluations fail.
//!
//! Testing notes
//! -------------
//! - Unit tests check tolerance validation and the documented defaults.
use crate::projection::errors::{CalcError, CalcResult};

/// Default relative tolerance for drift checks.
pub const DEFAULT_DRIFT_TOLERANCE: f64 = 1e-6;

/// Whether to cross-check incremental aggregates after every row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftCheck {
    Disabled,
    /// Relative tolerance, scaled by `max(1, |incremental|, |recomputed|)`.
    Enabled { tolerance: f64 },
}

impl DriftCheck {
    /// Validated drift check with the given relative tolerance.
    ///
    /// # Errors
    /// - [`CalcError::InvalidDriftTolerance`] unless `tolerance` is finite and > 0.
    pub fn enabled(tolerance: f64) -> CalcResult<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(CalcError::InvalidDriftTolerance { value: tolerance });
        }
        Ok(DriftCheck::Enabled { tolerance })
    }

    /// Debug builds check with [`DEFAULT_DRIFT_TOLERANCE`]; release builds skip.
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            DriftCheck::Enabled { tolerance: DEFAULT_DRIFT_TOLERANCE }
        } else {
            DriftCheck::Disabled
        }
    }
}

/// EvalOptions — checks applied while evaluating a row sequence.
///
/// Fields
/// ------
/// - `drift_check`: [`DriftCheck`]
///   Cross-check of incremental aggregates against recomputation.
/// - `guard_non_finite`: `bool`
///   Reject NaN/±inf formula output with `CalcError::NonFiniteValue`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalOptions {
    pub drift_check: DriftCheck,
    pub guard_non_finite: bool,
}

impl EvalOptions {
    pub fn new(drift_check: DriftCheck, guard_non_finite: bool) -> Self {
        EvalOptions { drift_check, guard_non_finite }
    }
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions { drift_check: DriftCheck::for_build(), guard_non_finite: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Verify tolerance validation in `DriftCheck::enabled`.
    //
    // Given
    // -----
    // - A valid tolerance and three invalid ones (0, negative, NaN).
    //
    // Expect
    // ------
    // - The valid one is stored; the others yield `InvalidDriftTolerance`.
    fn drift_check_enabled_validates_tolerance() {
        assert_eq!(DriftCheck::enabled(1e-6), Ok(DriftCheck::Enabled { tolerance: 1e-6 }));
        assert_eq!(DriftCheck::enabled(0.0), Err(CalcError::InvalidDriftTolerance { value: 0.0 }));
        assert_eq!(
            DriftCheck::enabled(-1.0),
            Err(CalcError::InvalidDriftTolerance { value: -1.0 })
        );
        assert!(matches!(
            DriftCheck::enabled(f64::NAN),
            Err(CalcError::InvalidDriftTolerance { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Verify the documented defaults.
    //
    // Given
    // -----
    // - `EvalOptions::default()` in a test (debug) build.
    //
    // Expect
    // ------
    // - The non-finite guard is on and the drift check follows the build.
    fn eval_options_default_matches_documented_defaults() {
        let opts = EvalOptions::default();

        assert!(opts.guard_non_finite);
        assert_eq!(opts.drift_check, DriftCheck::for_build());
        if cfg!(debug_assertions) {
            assert_eq!(
                opts.drift_check,
                DriftCheck::Enabled { tolerance: DEFAULT_DRIFT_TOLERANCE }
            );
        }
    }
}
