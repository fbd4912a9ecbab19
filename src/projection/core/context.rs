//! Formula context — the read-only view a field formula receives.
//!
//! Purpose
//! -------
//! Give every formula exactly the inputs the line-by-line pattern allows:
//! the parameters, the finished prior rows, the row currently being built
//! (with the fields computed so far), and the aggregates as of the end of
//! the previous row. Nothing in the context can be mutated.
//!
//! Key behaviors
//! -------------
//! - [`FormulaContext::previous`] returns `None` at row 0; formulas use it
//!   to apply the zero-history convention explicitly.
//! - [`FormulaContext::prior`] and [`FormulaContext::row`] fail with
//!   [`CalcError::UndefinedHistory`] for anything outside `[0, index)`,
//!   so a mistranslated spreadsheet reference surfaces instead of reading 0.
//! - [`FormulaContext::aggregate`] honors each aggregate's strategy:
//!   running value (incremental) or a rescan of history (recompute).
//!
//! Conventions
//! -----------
//! - `index()` is the position the current row will occupy in the sequence,
//!   so `history().len() == index()`.
use crate::projection::{
    core::aggregates::{AggregateHandle, AggregateSpec, AggregateStrategy, RunningAggregates},
    errors::{CalcError, CalcResult},
};

/// Everything a row step shares across its formulas except the row itself.
///
/// Built by the evaluator for each row; opaque outside the crate.
pub struct Frame<'a, P, R> {
    pub(crate) params: &'a P,
    pub(crate) history: &'a [R],
    pub(crate) aggregates: &'a RunningAggregates,
    pub(crate) specs: &'a [AggregateSpec<R>],
}

/// Read-only inputs of one formula evaluation.
pub struct FormulaContext<'a, P, R> {
    frame: &'a Frame<'a, P, R>,
    current: &'a R,
}

impl<'a, P, R> FormulaContext<'a, P, R> {
    pub(crate) fn new(frame: &'a Frame<'a, P, R>, current: &'a R) -> Self {
        FormulaContext { frame, current }
    }

    /// Global parameters of this evaluation.
    pub fn params(&self) -> &'a P {
        self.frame.params
    }

    /// Index of the row under construction.
    pub fn index(&self) -> usize {
        self.frame.history.len()
    }

    /// The row under construction; fields not computed yet hold their default.
    pub fn current(&self) -> &'a R {
        self.current
    }

    /// Finished rows `0..index()`.
    pub fn history(&self) -> &'a [R] {
        self.frame.history
    }

    /// The row immediately before this one, or `None` at row 0.
    pub fn previous(&self) -> Option<&'a R> {
        self.frame.history.last()
    }

    /// The row `lag` steps back (`lag >= 1`).
    ///
    /// # Errors
    /// - [`CalcError::UndefinedHistory`] when `lag == 0` (that is the current
    ///   row, use [`current`](Self::current)) or when `lag > index()`.
    pub fn prior(&self, lag: usize) -> CalcResult<&'a R> {
        let index = self.index();
        if lag == 0 || lag > index {
            return Err(CalcError::UndefinedHistory {
                index,
                requested: index as isize - lag as isize,
            });
        }
        Ok(&self.frame.history[index - lag])
    }

    /// The finished row at absolute position `position`.
    ///
    /// # Errors
    /// - [`CalcError::UndefinedHistory`] when `position >= index()`.
    pub fn row(&self, position: usize) -> CalcResult<&'a R> {
        self.frame.history.get(position).ok_or(CalcError::UndefinedHistory {
            index: self.index(),
            requested: position as isize,
        })
    }

    /// The latest `rows` finished rows (fewer near the start of the sequence).
    pub fn trailing(&self, rows: usize) -> &'a [R] {
        let history = self.frame.history;
        &history[history.len().saturating_sub(rows)..]
    }

    /// Sum `f` over the latest `rows` finished rows by rescanning history.
    pub fn sum_trailing<F>(&self, rows: usize, f: F) -> f64
    where
        F: Fn(&R) -> f64,
    {
        self.trailing(rows).iter().map(f).sum()
    }

    /// Value of a registered aggregate over the finished rows.
    ///
    /// # Errors
    /// - [`CalcError::UnknownAggregate`] for a handle this evaluator never issued.
    pub fn aggregate(&self, handle: AggregateHandle) -> CalcResult<f64> {
        let spec = self
            .frame
            .specs
            .get(handle.0)
            .ok_or(CalcError::UnknownAggregate { handle: handle.0 })?;
        match spec.strategy() {
            AggregateStrategy::Incremental => self.frame.aggregates.get(handle),
            AggregateStrategy::Recompute => Ok(spec.recompute(self.frame.history)),
        }
    }
}
