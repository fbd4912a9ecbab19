//! Integration tests for the row-sequence evaluator and its models.
//!
//! Purpose
//! -------
//! - Validate the end-to-end pipeline through the public API only: define a
//!   parameter record and a row type outside the crate, register formulas
//!   and aggregates on the builder, evaluate, and read the sequence back.
//! - Check the evaluator-wide properties (length, determinism, strategy
//!   equivalence, row-0 safety) over generated inputs with `proptest`.
//!
//! Coverage
//! --------
//! - `projection::core`:
//!   - The threshold scenario (rate × prior field from a threshold index).
//!   - Windowed sums against a naive reference.
//!   - Drift detection, the non-finite guard, and option overrides.
//! - `projection::models`:
//!   - Amortization and cohort models run with both aggregate strategies.
//!
//! Exclusions
//! ----------
//! - Fine-grained plan verification and history-access errors; those are
//!   covered by unit tests.
//! - Python bindings.
use approx::assert_relative_eq;
use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
use rust_projection::{
    projection::{
        core::{
            aggregates::{AggregateSpec, AggregateStrategy},
            evaluator::RowSequenceEvaluator,
            fields::LineRow,
            options::{DriftCheck, EvalOptions},
            params::{Horizon, LineParams},
        },
        errors::{CalcError, ParamResult},
        models::{
            amortization::{self, LoanParams},
            cohort::{self, CohortParams},
        },
    },
    row_field,
};
use std::sync::atomic::{AtomicUsize, Ordering};

// ---- Scenario model ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScenarioParams {
    horizon: Horizon,
    rate: f64,
    threshold: usize,
    window: usize,
}

impl LineParams for ScenarioParams {
    fn validate(&self) -> ParamResult<()> {
        rust_projection::projection::core::validation::validate_non_negative("rate", self.rate)?;
        Ok(())
    }

    fn horizon(&self) -> Option<Horizon> {
        Some(self.horizon)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ScenarioRow {
    base: f64,
    value: f64,
    ones: f64,
    ones_in_window: f64,
}

impl LineRow for ScenarioRow {
    const FIELDS: &'static [&'static str] = &["base", "value", "ones", "ones_in_window"];
}

/// Purpose
/// -------
/// Build the scenario evaluator used by most tests in this file.
///
/// Columns
/// -------
/// - `base`: `10 + index` (an arbitrary, strictly increasing series).
/// - `value`: `rate × base[i - 1]` once `index >= threshold`, else `0`.
/// - `ones`: constant contribution `1`.
/// - `ones_in_window`: running sum of `ones` over the trailing `window` rows,
///   read as of the end of this row (aggregate before this row + this row).
fn scenario_evaluator(
    window: usize, strategy: AggregateStrategy,
) -> RowSequenceEvaluator<ScenarioParams, ScenarioRow> {
    let mut builder = RowSequenceEvaluator::<ScenarioParams, ScenarioRow>::builder();
    let trailing_ones = builder.aggregate(
        AggregateSpec::sum("ones_in_window", |r: &ScenarioRow| r.ones)
            .trailing(window)
            .with_strategy(strategy),
    );
    builder
        .formula(row_field!(ScenarioRow, base: f64), &[], |ctx| Ok(10.0 + ctx.index() as f64))
        .formula(row_field!(ScenarioRow, value: f64), &[], |ctx| {
            let p = ctx.params();
            if ctx.index() >= p.threshold { Ok(p.rate * ctx.prior(1)?.base) } else { Ok(0.0) }
        })
        .formula(row_field!(ScenarioRow, ones: f64), &[], |_| Ok(1.0))
        .formula(row_field!(ScenarioRow, ones_in_window: f64), &["ones"], move |ctx| {
            // Aggregates cover rows before this one; the oldest of those
            // leaves the window once this row is added.
            let before = ctx.aggregate(trailing_ones)?;
            let leaving = match ctx.index().checked_sub(window) {
                Some(k) => ctx.row(k)?.ones,
                None => 0.0,
            };
            Ok(before - leaving + ctx.current().ones)
        });
    builder.build().expect("scenario plan should verify")
}

fn scenario_params(duration_in_periods: usize, periods_per_year: usize) -> ScenarioParams {
    ScenarioParams {
        horizon: Horizon::new(duration_in_periods, periods_per_year)
            .expect("horizon should be valid"),
        rate: 0.1,
        threshold: 5,
        window: 12,
    }
}

#[test]
// Purpose
// -------
// Check the reference scenario end to end.
//
// Given
// -----
// - duration 2, 12 periods per year, rate 0.1, threshold 5.
//
// Expect
// ------
// - 24 rows; `value` is 0 for rows 0..=4 and `0.1 × base[i - 1]` after.
fn threshold_scenario_end_to_end() {
    // Arrange
    let params = scenario_params(2, 12);
    let evaluator = scenario_evaluator(params.window, AggregateStrategy::Incremental);

    // Act
    let rows = evaluator.compute_horizon(&params).expect("scenario should evaluate");

    // Assert
    assert_eq!(rows.len(), 24);
    for i in 0..5 {
        assert_eq!(rows[i].value, 0.0);
    }
    for i in 5..24 {
        assert_relative_eq!(rows[i].value, 0.1 * rows[i - 1].base, epsilon = 1e-12);
    }
}

#[test]
// Purpose
// -------
// Compare a windowed running sum with the closed-form reference.
//
// Given
// -----
// - N = 36 rows, W = 12, constant contribution 1, both strategies.
//
// Expect
// ------
// - The running sum after row i equals `min(i + 1, 12)`.
fn windowed_sum_matches_reference() {
    let params = scenario_params(3, 12);
    for strategy in [AggregateStrategy::Incremental, AggregateStrategy::Recompute] {
        // Arrange
        let evaluator = scenario_evaluator(12, strategy);

        // Act
        let rows = evaluator.compute_results(&params, 36).expect("evaluation should succeed");

        // Assert
        assert_eq!(rows.len(), 36);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.ones_in_window, (i + 1).min(12) as f64, "row {i} ({strategy:?})");
        }
    }
}

// ---- Self-checks ------------------------------------------------------------

static FLAKY_CALLS: AtomicUsize = AtomicUsize::new(0);

/// A contribution that changes every time it is read.
fn flaky_contribution(_: &ScenarioRow) -> f64 {
    FLAKY_CALLS.fetch_add(1, Ordering::SeqCst) as f64
}

#[test]
// Purpose
// -------
// Verify that the drift check catches an incremental aggregate that no
// longer matches its recomputation, and that disabling it lets the same
// evaluation through.
//
// Given
// -----
// - An aggregate whose contribution is not a pure function of the row.
//
// Expect
// ------
// - `AggregateDrift` at row 0 with the check enabled; success without it.
fn drift_check_reports_impure_contributions() {
    // Arrange
    let mut builder = RowSequenceEvaluator::<(), ScenarioRow>::builder();
    builder.aggregate(AggregateSpec::sum("flaky", flaky_contribution));
    builder
        .formula(row_field!(ScenarioRow, base: f64), &[], |_| Ok(1.0))
        .formula(row_field!(ScenarioRow, value: f64), &[], |_| Ok(0.0))
        .formula(row_field!(ScenarioRow, ones: f64), &[], |_| Ok(1.0))
        .formula(row_field!(ScenarioRow, ones_in_window: f64), &[], |_| Ok(0.0))
        .options(EvalOptions::new(DriftCheck::enabled(1e-9).expect("valid tolerance"), true));
    let checked = builder.build().expect("plan should verify");

    // Act
    let result = checked.compute_results(&(), 4);
    let unchecked =
        checked.with_options(EvalOptions::new(DriftCheck::Disabled, true)).compute_results(&(), 4);

    // Assert
    assert!(matches!(
        result,
        Err(CalcError::AggregateDrift { aggregate: "flaky", index: 0, .. })
    ));
    assert_eq!(unchecked.map(|rows| rows.len()), Ok(4));
}

#[test]
// Purpose
// -------
// Verify the non-finite guard and its opt-out.
//
// Given
// -----
// - A formula producing NaN at row 2.
//
// Expect
// ------
// - `NonFiniteValue { index: 2, field: "value" }` with the guard on.
// - With the guard off, NaN is stored and evaluation completes.
fn non_finite_guard_stops_nan_rows() {
    // Arrange
    let build = |guard: bool| {
        let mut builder = RowSequenceEvaluator::<(), ScenarioRow>::builder();
        builder
            .formula(row_field!(ScenarioRow, base: f64), &[], |ctx| Ok(ctx.index() as f64))
            .formula(row_field!(ScenarioRow, value: f64), &["base"], |ctx| {
                let base = ctx.current().base;
                Ok(if base == 2.0 { f64::NAN } else { base })
            })
            .formula(row_field!(ScenarioRow, ones: f64), &[], |_| Ok(1.0))
            .formula(row_field!(ScenarioRow, ones_in_window: f64), &[], |_| Ok(0.0))
            .options(EvalOptions::new(DriftCheck::Disabled, guard));
        builder.build().expect("plan should verify")
    };

    // Act
    let guarded = build(true).compute_results(&(), 5);
    let unguarded = build(false).compute_results(&(), 5).expect("unguarded run completes");

    // Assert
    assert!(matches!(
        guarded,
        Err(CalcError::NonFiniteValue { index: 2, field: "value", .. })
    ));
    assert!(unguarded[2].value.is_nan());
    assert_eq!(unguarded.len(), 5);
}

// ---- Models -----------------------------------------------------------------

#[test]
// Purpose
// -------
// Run both demonstration models through the one-shot helpers and check
// their headline invariants.
//
// Given
// -----
// - A 15-year loan at 5.5% with prepayments from year 3.
// - A harvested cohort over 3 years.
//
// Expect
// ------
// - The loan is paid off within the horizon and balances never go negative.
// - The cohort has N + 1 rows and a non-negative population throughout.
fn models_run_end_to_end() {
    // Arrange
    let loan = LoanParams::new(300_000.0, 0.055, Horizon::new(15, 12).expect("valid horizon"))
        .with_extra_payment(500.0, 36);
    let herd = CohortParams {
        initial_population: 200.0,
        birth_rate: 0.08,
        mortality_rate: 0.01,
        maturity_lag: 6,
        harvest_threshold: 250.0,
        harvest_fraction: 0.2,
        max_harvests_per_year: 2,
        horizon: Horizon::new(3, 12).expect("valid horizon"),
    };

    // Act
    let schedule = amortization::schedule(&loan).expect("schedule should evaluate");
    let projection = cohort::project(&herd).expect("projection should evaluate");

    // Assert
    assert_eq!(schedule.len(), 180);
    assert!(schedule.iter().all(|r| r.closing_balance >= 0.0));
    assert!(schedule.last().is_some_and(|r| r.paid_off));

    assert_eq!(projection.len(), 37);
    assert_eq!(projection.first_computed_index(), 1);
    assert!(projection.iter().all(|r| r.population >= 0.0));
}

// ---- Properties -------------------------------------------------------------

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(32))]

    #[test]
    fn prop_scenario_length_determinism_and_strategy_equivalence(
        duration in 0usize..5,
        periods_per_year in 1usize..13,
        window in 1usize..20,
        threshold in 1usize..30,
        rate in 0.0f64..1.0,
    ) {
        let params = ScenarioParams {
            horizon: Horizon::new(duration, periods_per_year).expect("valid horizon"),
            rate,
            threshold,
            window,
        };
        let incremental = scenario_evaluator(window, AggregateStrategy::Incremental);
        let recompute = scenario_evaluator(window, AggregateStrategy::Recompute);

        // With threshold >= 1 no formula reaches before row 0.
        let first = incremental.compute_horizon(&params).expect("scenario should evaluate");
        let second = incremental.compute_horizon(&params).expect("scenario should evaluate");
        let other = recompute.compute_horizon(&params).expect("scenario should evaluate");

        prop_assert_eq!(first.len(), duration * periods_per_year);
        prop_assert_eq!(&first, &second);
        for (a, b) in first.iter().zip(&other) {
            prop_assert!((a.ones_in_window - b.ones_in_window).abs() <= 1e-9);
            prop_assert_eq!(a.value, b.value);
        }
    }

    #[test]
    fn prop_amortization_strategies_agree_and_balances_stay_non_negative(
        principal in 1_000.0f64..1_000_000.0,
        annual_rate in 0.0f64..0.2,
        years in 1usize..31,
        extra in 0.0f64..2_000.0,
        extra_from in 0usize..120,
    ) {
        let params = LoanParams::new(principal, annual_rate, Horizon::new(years, 12).expect("valid horizon"))
            .with_extra_payment(extra, extra_from);
        let incremental = amortization::evaluator(12, AggregateStrategy::Incremental)
            .expect("plan should verify");
        let recompute = amortization::evaluator(12, AggregateStrategy::Recompute)
            .expect("plan should verify");

        let a = incremental.compute_horizon(&params).expect("schedule should evaluate");
        let b = recompute.compute_horizon(&params).expect("schedule should evaluate");

        prop_assert_eq!(a.len(), years * 12);
        prop_assert!(a.last().is_some_and(|r| r.paid_off));
        for (x, y) in a.iter().zip(&b) {
            prop_assert!(x.closing_balance >= 0.0);
            let scale = 1.0_f64.max(x.interest_prior_year.abs());
            prop_assert!((x.interest_prior_year - y.interest_prior_year).abs() <= 1e-6 * scale);
            prop_assert_eq!(x.payments_made, y.payments_made);
        }
    }
}
