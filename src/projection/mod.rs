//! projection — incremental, line-by-line row-sequence evaluation.
//!
//! Purpose
//! -------
//! Provide the machinery for translating spreadsheet-style column formulas
//! into line-by-line calculation code: every output row depends on fixed
//! parameters and on prior rows, optionally summarized by running
//! aggregates, and the whole sequence is produced in one forward pass.
//!
//! Key behaviors
//! -------------
//! - [`core`] holds the evaluator, typed rows and fields, formulas and their
//!   verified plan, running aggregates, parameters and options.
//! - [`errors`] centralizes [`CalcError`], [`ParamError`] and [`PlanError`]
//!   with their result aliases.
//! - [`models`] contains two demonstration models (loan amortization and a
//!   seeded cohort projection).
//!
//! Invariants & assumptions
//! ------------------------
//! - Rows are computed in strictly increasing index order and never
//!   modified once appended.
//! - Errors abort the whole evaluation; callers never see a partial
//!   sequence.
//!
//! Downstream usage
//! ----------------
//! 1. Define a parameter record implementing [`LineParams`] and a row type
//!    implementing [`LineRow`].
//! 2. Register aggregates, formulas (and optionally a seed) on
//!    `RowSequenceEvaluator::builder()`, then `build()` it.
//! 3. Call `compute_results(&params, n)` or `compute_horizon(&params)` and
//!    read rows or export columns from the returned [`Sequence`].
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each submodule; `tests/` holds end-to-end
//!   checks across the models and property tests for the evaluator.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    AggregateHandle, AggregateSpec, AggregateStrategy, DriftCheck, EvalOptions, Field,
    FormulaContext, Horizon, LineParams, LineRow, Reduction, RowSequenceEvaluator, Sequence,
    Window,
};

pub use self::errors::{CalcError, CalcResult, ParamError, ParamResult, PlanError, PlanResult};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_projection::projection::prelude::*;
//
// to import the evaluator surface and error types in a single line.

pub mod prelude {
    pub use super::core::prelude::*;
    pub use super::{CalcError, CalcResult, ParamError, ParamResult, PlanError, PlanResult};
}
