//! core — rows, formulas, aggregates, and the line-by-line evaluator.
//!
//! Purpose
//! -------
//! Collect the building blocks of an incremental, single-pass row-sequence
//! calculation: a fixed parameter record, typed rows whose fields are filled
//! by registered formulas, an append-only sequence of finished rows, and
//! optional running aggregates maintained alongside the sequence. Domain
//! models in `projection::models` are assembled entirely from these parts.
//!
//! Key behaviors
//! -------------
//! - Describe rows and their columns with [`LineRow`], [`Field`] and the
//!   [`row_field!`](crate::row_field) macro; parameters with [`LineParams`]
//!   and [`Horizon`].
//! - Bind one formula per field ([`FieldFormula`] / [`RowFormula`]) and
//!   verify the set once in a [`FormulaPlan`]: full schema coverage, known
//!   dependencies, no same-row cycles, well-formed aggregates.
//! - Drive evaluation with [`RowSequenceEvaluator`]: validate parameters,
//!   optionally seed row 0, then compute rows in strictly increasing index
//!   order, absorbing each finished row into the [`RunningAggregates`].
//! - Give formulas a read-only [`FormulaContext`]: parameters, the finished
//!   prefix, the current partial row, and aggregates as of the previous row.
//!
//! Invariants & assumptions
//! ------------------------
//! - Row `i` depends only on parameters, rows `0..i`, fields of row `i`
//!   computed earlier in plan order, and aggregates over rows `0..i`.
//! - Out-of-range history reads are errors ([`CalcError::UndefinedHistory`]),
//!   never silent zeros.
//! - Evaluations are pure functions of `(params, row_count)`; an evaluator
//!   can be shared between threads.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based; a seeded row occupies index 0.
//! - Trailing windows of width `w` after row `i` cover rows
//!   `max(0, i + 1 - w)..=i`.
//! - Structured logging goes through `tracing`; the core never installs a
//!   subscriber.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests for its own contract; the evaluator
//!   tests exercise the modules together on small synthetic models.
//!
//! [`CalcError::UndefinedHistory`]: crate::projection::errors::CalcError::UndefinedHistory

pub mod aggregates;
pub mod context;
pub mod evaluator;
pub mod fields;
pub mod formula;
pub mod options;
pub mod params;
pub mod plan;
pub mod sequence;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::aggregates::{
    AggregateHandle, AggregateSpec, AggregateStrategy, Reduction, RunningAggregates, Window,
};
pub use self::context::{FormulaContext, Frame};
pub use self::evaluator::{EvaluatorBuilder, RowSequenceEvaluator, SeedFn};
pub use self::fields::{Field, FieldValue, LineRow};
pub use self::formula::{FieldFormula, FormulaFn, RowFormula};
pub use self::options::{DEFAULT_DRIFT_TOLERANCE, DriftCheck, EvalOptions};
pub use self::params::{Horizon, LineParams};
pub use self::plan::FormulaPlan;
pub use self::sequence::Sequence;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_projection::projection::core::prelude::*;
//
// to define a new row model in a single import.

pub mod prelude {
    pub use super::aggregates::{AggregateHandle, AggregateSpec, AggregateStrategy, Window};
    pub use super::context::FormulaContext;
    pub use super::evaluator::RowSequenceEvaluator;
    pub use super::fields::{Field, LineRow};
    pub use super::options::{DriftCheck, EvalOptions};
    pub use super::params::{Horizon, LineParams};
    pub use super::sequence::Sequence;
}
