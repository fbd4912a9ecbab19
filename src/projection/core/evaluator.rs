//! Row-sequence evaluator — the line-by-line driver.
//!
//! Purpose
//! -------
//! Produce the full output sequence for a parameter record: one row per
//! index, each row filled field by field by the registered formulas, in
//! strictly increasing index order, with running aggregates updated after
//! every finished row.
//!
//! Key behaviors
//! -------------
//! - [`EvaluatorBuilder`] registers aggregates (returning handles formulas can
//!   capture), formulas bound to typed fields, an optional seed row, and
//!   [`EvalOptions`]. [`EvaluatorBuilder::build`] verifies the plan once.
//! - [`RowSequenceEvaluator::compute_results`] validates the parameters, then
//!   for each index: allocates a default row, runs the formulas in plan order,
//!   folds the finished row into the aggregates, and appends it.
//! - [`RowSequenceEvaluator::compute_horizon`] takes the row count from the
//!   parameters' own [`Horizon`](crate::projection::core::params::Horizon).
//!
//! Invariants & assumptions
//! ------------------------
//! - Deterministic: the output depends only on the parameters and the row
//!   count. Every call allocates its own sequence and aggregates; the
//!   evaluator itself is never mutated by an evaluation.
//! - Row `i + 1` starts only after row `i` is appended and absorbed.
//! - A seeded row sits at index 0, is never recomputed, and is absorbed into
//!   the aggregates like any other row.
//! - Any error aborts the whole call; no partial sequence escapes.
//!
//! Conventions
//! -----------
//! - Output length is `row_count`, or `row_count + 1` with a seed.
//! - Emits a `debug` span per evaluation, a `trace` event per row, and a
//!   `warn` event when an evaluation aborts.
//!
//! Downstream usage
//! ----------------
//! - Build one evaluator per model (see `projection::models`) and reuse it
//!   across parameter sets; it is `Send + Sync`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the threshold scenario row by row, seeding, row-0
//!   history, abort-on-error, determinism, strategy equivalence, the
//!   parameter gate, seeded aggregates, and non-finite seeds and
//!   contributions.
use crate::projection::{
    core::{
        aggregates::{AggregateHandle, AggregateSpec, RunningAggregates},
        context::{FormulaContext, Frame},
        fields::{Field, FieldValue, LineRow},
        formula::{FieldFormula, RowFormula},
        options::{DriftCheck, EvalOptions},
        params::LineParams,
        plan::FormulaPlan,
        sequence::Sequence,
        validation::require,
    },
    errors::CalcResult,
};

/// Boxed seed: builds row 0 directly from the parameters.
pub type SeedFn<P, R> = dyn Fn(&P) -> R + Send + Sync;

/// Collects formulas, aggregates, an optional seed, and options.
pub struct EvaluatorBuilder<P, R> {
    formulas: Vec<Box<dyn RowFormula<P, R>>>,
    aggregates: Vec<AggregateSpec<R>>,
    seed: Option<Box<SeedFn<P, R>>>,
    options: EvalOptions,
}

impl<P: 'static, R: LineRow> EvaluatorBuilder<P, R> {
    pub fn new() -> Self {
        EvaluatorBuilder {
            formulas: Vec::new(),
            aggregates: Vec::new(),
            seed: None,
            options: EvalOptions::default(),
        }
    }

    /// Register an aggregate and return the handle formulas read it through.
    pub fn aggregate(&mut self, spec: AggregateSpec<R>) -> AggregateHandle {
        self.aggregates.push(spec);
        AggregateHandle(self.aggregates.len() - 1)
    }

    /// Register the formula for `field`.
    ///
    /// `depends_on` lists the same-row fields `compute` reads through
    /// `ctx.current()`; prior rows and aggregates need no declaration.
    pub fn formula<T, F>(&mut self, field: Field<R, T>, depends_on: &[&'static str], compute: F) -> &mut Self
    where
        T: FieldValue,
        F: for<'a> Fn(&FormulaContext<'a, P, R>) -> CalcResult<T> + Send + Sync + 'static,
    {
        self.formulas.push(Box::new(FieldFormula::new(field, depends_on, compute)));
        self
    }

    /// Produce row 0 from the parameters instead of the formulas.
    pub fn seed<F>(&mut self, seed: F) -> &mut Self
    where
        F: Fn(&P) -> R + Send + Sync + 'static,
    {
        self.seed = Some(Box::new(seed));
        self
    }

    pub fn options(&mut self, options: EvalOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Verify the plan and build the evaluator.
    ///
    /// # Errors
    /// - [`CalcError::InvalidPlan`](crate::projection::errors::CalcError::InvalidPlan)
    ///   when formulas and the row schema disagree, dependencies loop, or an
    ///   aggregate is malformed.
    pub fn build(self) -> CalcResult<RowSequenceEvaluator<P, R>> {
        let plan = FormulaPlan::resolve(self.formulas, &self.aggregates)?;
        tracing::debug!(order = ?plan.order(), aggregates = self.aggregates.len(), "formula plan resolved");
        Ok(RowSequenceEvaluator {
            plan,
            aggregates: self.aggregates,
            seed: self.seed,
            options: self.options,
        })
    }
}

impl<P: 'static, R: LineRow> Default for EvaluatorBuilder<P, R> {
    fn default() -> Self {
        Self::new()
    }
}

/// RowSequenceEvaluator — computes a [`Sequence`] from parameters, row by row.
///
/// Fields
/// ------
/// - `plan`: formulas in verified evaluation order.
/// - `aggregates`: running-aggregate definitions, indexed by handle.
/// - `seed`: optional row-0 builder.
/// - `options`: drift check and non-finite guard.
///
/// Performance
/// -----------
/// - O(rows × formulas) plus O(rows × aggregates) for incremental
///   aggregates; recompute strategies and the drift check add O(window) per
///   read / per row.
pub struct RowSequenceEvaluator<P, R> {
    plan: FormulaPlan<P, R>,
    aggregates: Vec<AggregateSpec<R>>,
    seed: Option<Box<SeedFn<P, R>>>,
    options: EvalOptions,
}

impl<P: 'static, R: LineRow> RowSequenceEvaluator<P, R> {
    pub fn builder() -> EvaluatorBuilder<P, R> {
        EvaluatorBuilder::new()
    }
}

impl<P: LineParams, R: LineRow> RowSequenceEvaluator<P, R> {
    /// Evaluate `row_count` rows (plus a seeded row 0, if registered).
    ///
    /// # Errors
    /// - `CalcError::InvalidParameters` when `params.validate()` fails; no
    ///   formula runs in that case.
    /// - `CalcError::UndefinedHistory`, `UnknownAggregate`, `NonFiniteValue`
    ///   or any error returned by a formula.
    /// - `CalcError::AggregateDrift` when the drift check is enabled and an
    ///   incremental aggregate disagrees with its recomputation.
    /// - `CalcError::CapacityExceeded` when `row_count` rows cannot be
    ///   allocated up front.
    /// - `CalcError::NonFiniteValue` at index 0 when the guard is on and the
    ///   seed row holds NaN/±inf in a formula-produced field.
    pub fn compute_results(&self, params: &P, row_count: usize) -> CalcResult<Sequence<R>> {
        let seeded = self.seed.is_some();
        let _span = tracing::debug_span!("compute_results", row_count, seeded).entered();
        self.run(params, row_count)
            .inspect(|sequence| tracing::debug!(rows = sequence.len(), "evaluation complete"))
            .inspect_err(|err| tracing::warn!(error = %err, "evaluation aborted"))
    }

    /// Evaluate for the horizon configured in `params`.
    ///
    /// # Errors
    /// - `CalcError::InvalidParameters(ParamError::MissingParameter { name: "horizon" })`
    ///   when `params.horizon()` is `None`.
    /// - Everything [`compute_results`](Self::compute_results) returns.
    pub fn compute_horizon(&self, params: &P) -> CalcResult<Sequence<R>> {
        let horizon = require("horizon", params.horizon())?;
        self.compute_results(params, horizon.row_count())
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Replace the evaluation options, keeping the verified plan.
    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn plan(&self) -> &FormulaPlan<P, R> {
        &self.plan
    }

    pub fn aggregate_specs(&self) -> &[AggregateSpec<R>] {
        &self.aggregates
    }

    pub fn is_seeded(&self) -> bool {
        self.seed.is_some()
    }

    // ---- Helper Methods ----

    fn run(&self, params: &P, row_count: usize) -> CalcResult<Sequence<R>> {
        params.validate()?;

        let mut sequence = Sequence::try_with_capacity(
            row_count.saturating_add(usize::from(self.is_seeded())),
            self.is_seeded(),
        )?;
        let mut running = RunningAggregates::new(&self.aggregates);

        if let Some(seed) = &self.seed {
            let row = seed(params);
            if self.options.guard_non_finite {
                for formula in self.plan.formulas() {
                    formula.check_finite(&row, 0)?;
                }
            }
            self.finalize(&mut sequence, &mut running, row)?;
        }
        for _ in 0..row_count {
            let row = self.step(params, &sequence, &running)?;
            self.finalize(&mut sequence, &mut running, row)?;
        }
        Ok(sequence)
    }

    /// Build the next row from the finished prefix.
    fn step(&self, params: &P, sequence: &Sequence<R>, running: &RunningAggregates) -> CalcResult<R> {
        let frame =
            Frame { params, history: sequence.rows(), aggregates: running, specs: &self.aggregates };
        let mut row = R::default();
        for formula in self.plan.formulas() {
            formula.evaluate(&frame, &mut row, self.options.guard_non_finite)?;
        }
        tracing::trace!(index = sequence.len(), ?row, "row computed");
        Ok(row)
    }

    /// Absorb `row` into the aggregates, append it, and run the drift check.
    fn finalize(
        &self, sequence: &mut Sequence<R>, running: &mut RunningAggregates, row: R,
    ) -> CalcResult<()> {
        running.absorb(&self.aggregates, sequence.rows(), &row);
        sequence.push(row);
        if let DriftCheck::Enabled { tolerance } = self.options.drift_check {
            running.verify(&self.aggregates, sequence.rows(), tolerance)?;
        }
        Ok(())
    }
}
