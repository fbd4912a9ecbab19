//! Running aggregates — incrementally maintained sums and counts over history.
//!
//! Purpose
//! -------
//! Let formulas read historical sums (cumulative or over a trailing window,
//! optionally filtered by a row predicate) in O(1) instead of rescanning the
//! sequence for every row, while keeping a recompute-on-demand path that
//! serves as the reference behavior.
//!
//! Key behaviors
//! -------------
//! - [`AggregateSpec`] describes one aggregate: a per-row contribution
//!   (`source`, optional `filter`), a [`Reduction`], a [`Window`], and the
//!   [`AggregateStrategy`] formulas use when reading it.
//! - [`RunningAggregates`] holds one value per spec and is updated once per
//!   finished row by [`RunningAggregates::absorb`]: add the new contribution,
//!   subtract the contribution that leaves a trailing window.
//! - [`AggregateSpec::recompute`] is the naive reference: fold the window
//!   slice of a row history from scratch.
//! - [`RunningAggregates::verify`] compares both and reports
//!   [`CalcError::AggregateDrift`] beyond a relative tolerance.
//!
//! Invariants & assumptions
//! ------------------------
//! - After absorbing row `i`, `values[k] == specs[k].recompute(rows[..=i])`
//!   up to floating-point associativity.
//! - `Window::Trailing(w)` requires `w >= 1` (checked when the plan is built).
//! - The running values are a cache derived from the sequence; they are
//!   never a source of truth.
//!
//! Conventions
//! -----------
//! - `Window::Trailing(w)` after row `i` covers rows `max(0, i + 1 - w) ..= i`.
//! - A formula at row `i` reads aggregates as of the end of row `i - 1`, so a
//!   trailing window seen from a formula spans rows `i - w .. i`.
//! - Filtered-out rows contribute `0.0` to sums and are not counted.
//!
//! Testing notes
//! -------------
//! - Unit tests compare incremental maintenance with the naive reference for
//!   cumulative, trailing, filtered, and count aggregates, including the
//!   `N = 36, W = 12` constant-contribution case.
use crate::projection::errors::{CalcError, CalcResult};

/// Which rows an aggregate covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Every row from 0 through the latest.
    Cumulative,
    /// The latest `w` rows (fewer while the history is shorter than `w`).
    Trailing(usize),
}

/// How contributions are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Sum of `source(row)` over rows passing the filter.
    Sum,
    /// Number of rows passing the filter.
    Count,
}

/// How formulas read an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregateStrategy {
    /// O(1) read of the running value.
    #[default]
    Incremental,
    /// Rescan the window slice of history on every read.
    Recompute,
}

/// Opaque index of a registered aggregate, issued by the evaluator builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateHandle(pub(crate) usize);

impl AggregateHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// AggregateSpec — definition of one running aggregate over rows of `R`.
///
/// Fields
/// ------
/// - `name`: unique label, used in errors and lookups.
/// - `source`: per-row value for `Reduction::Sum` (ignored by `Count`).
/// - `filter`: optional predicate; rows failing it contribute nothing.
/// - `window`, `reduction`, `strategy`: see the respective enums.
pub struct AggregateSpec<R> {
    name: &'static str,
    source: fn(&R) -> f64,
    filter: Option<fn(&R) -> bool>,
    window: Window,
    reduction: Reduction,
    strategy: AggregateStrategy,
}

impl<R> Clone for AggregateSpec<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for AggregateSpec<R> {}

impl<R> std::fmt::Debug for AggregateSpec<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateSpec")
            .field("name", &self.name)
            .field("filtered", &self.filter.is_some())
            .field("window", &self.window)
            .field("reduction", &self.reduction)
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl<R> AggregateSpec<R> {
    /// Cumulative sum of `source` over all rows.
    pub fn sum(name: &'static str, source: fn(&R) -> f64) -> Self {
        AggregateSpec {
            name,
            source,
            filter: None,
            window: Window::Cumulative,
            reduction: Reduction::Sum,
            strategy: AggregateStrategy::Incremental,
        }
    }

    /// Cumulative count of rows for which `filter` holds.
    pub fn count(name: &'static str, filter: fn(&R) -> bool) -> Self {
        AggregateSpec {
            name,
            source: |_| 1.0,
            filter: Some(filter),
            window: Window::Cumulative,
            reduction: Reduction::Count,
            strategy: AggregateStrategy::Incremental,
        }
    }

    /// Restrict the aggregate to the latest `rows` rows.
    pub fn trailing(mut self, rows: usize) -> Self {
        self.window = Window::Trailing(rows);
        self
    }

    /// Only rows for which `filter` holds contribute.
    pub fn filtered(mut self, filter: fn(&R) -> bool) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Choose how formulas read this aggregate.
    pub fn with_strategy(mut self, strategy: AggregateStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }

    pub fn strategy(&self) -> AggregateStrategy {
        self.strategy
    }

    /// Contribution of a single row.
    pub fn contribution(&self, row: &R) -> f64 {
        if let Some(filter) = self.filter
            && !filter(row)
        {
            return 0.0;
        }
        match self.reduction {
            Reduction::Sum => (self.source)(row),
            Reduction::Count => 1.0,
        }
    }

    /// Reference value over `rows`, treating the last element as the latest row.
    ///
    /// O(window) per call; this is the recompute-on-demand strategy and the
    /// oracle for drift checks.
    pub fn recompute(&self, rows: &[R]) -> f64 {
        let start = match self.window {
            Window::Cumulative => 0,
            Window::Trailing(w) => rows.len().saturating_sub(w),
        };
        // `fold` from +0.0: `Iterator::sum` yields -0.0 for an empty slice.
        rows[start..].iter().fold(0.0, |acc, row| acc + self.contribution(row))
    }

    /// Same as [`recompute`](Self::recompute) over `history` followed by `row`.
    fn recompute_with(&self, history: &[R], row: &R) -> f64 {
        let start = match self.window {
            Window::Cumulative => 0,
            Window::Trailing(w) => (history.len() + 1).saturating_sub(w).min(history.len()),
        };
        history[start..]
            .iter()
            .chain(std::iter::once(row))
            .fold(0.0, |acc, row| acc + self.contribution(row))
    }
}

/// Current value of every registered aggregate.
///
/// Owned by a single evaluation; a fresh instance is allocated per
/// `compute_results` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningAggregates {
    names: Vec<&'static str>,
    values: Vec<f64>,
    rows_seen: usize,
}

impl RunningAggregates {
    /// Zeroed aggregates for `specs` (the empty-history convention).
    pub fn new<R>(specs: &[AggregateSpec<R>]) -> Self {
        RunningAggregates {
            names: specs.iter().map(|spec| spec.name).collect(),
            values: vec![0.0; specs.len()],
            rows_seen: 0,
        }
    }

    /// Value of the aggregate behind `handle`.
    pub fn get(&self, handle: AggregateHandle) -> CalcResult<f64> {
        self.values
            .get(handle.0)
            .copied()
            .ok_or(CalcError::UnknownAggregate { handle: handle.0 })
    }

    /// Value of the aggregate called `name`, if registered.
    pub fn by_name(&self, name: &str) -> Option<f64> {
        self.names.iter().position(|n| *n == name).map(|k| self.values[k])
    }

    /// Number of rows folded in so far.
    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }

    /// Fold a finished row into every aggregate.
    ///
    /// `history` holds the rows before `row`, so `row` sits at index
    /// `history.len()`. For trailing windows the row at `index - w` leaves
    /// the window and its contribution is subtracted.
    ///
    /// Subtraction cannot undo a non-finite contribution (`inf - inf` is
    /// NaN), so a trailing window that holds or sheds a non-finite value is
    /// refolded from `history` instead.
    pub fn absorb<R>(&mut self, specs: &[AggregateSpec<R>], history: &[R], row: &R) {
        let index = history.len();
        for (value, spec) in self.values.iter_mut().zip(specs) {
            let entering = spec.contribution(row);
            let leaving = match spec.window {
                Window::Trailing(w) if index >= w => Some(spec.contribution(&history[index - w])),
                _ => None,
            };
            let trailing = matches!(spec.window, Window::Trailing(_));
            let finite = value.is_finite() && entering.is_finite() && leaving.is_none_or(f64::is_finite);
            if trailing && !finite {
                *value = spec.recompute_with(history, row);
                continue;
            }
            *value += entering;
            if let Some(leaving) = leaving {
                *value -= leaving;
            }
        }
        self.rows_seen += 1;
    }

    /// Compare running values against a full recomputation over `rows`.
    ///
    /// # Errors
    /// - [`CalcError::AggregateDrift`] for the first aggregate whose values
    ///   differ by more than `tolerance * max(1, |incremental|, |recomputed|)`.
    ///   Non-finite values must match exactly (NaN matches NaN).
    pub fn verify<R>(&self, specs: &[AggregateSpec<R>], rows: &[R], tolerance: f64) -> CalcResult<()> {
        let index = rows.len().saturating_sub(1);
        for (&incremental, spec) in self.values.iter().zip(specs) {
            let recomputed = spec.recompute(rows);
            let agrees = if incremental.is_finite() && recomputed.is_finite() {
                let scale = 1.0_f64.max(incremental.abs()).max(recomputed.abs());
                (incremental - recomputed).abs() <= tolerance * scale
            } else {
                incremental == recomputed || (incremental.is_nan() && recomputed.is_nan())
            };
            if !agrees {
                return Err(CalcError::AggregateDrift {
                    aggregate: spec.name,
                    index,
                    incremental,
                    recomputed,
                });
            }
        }
        Ok(())
    }
}
