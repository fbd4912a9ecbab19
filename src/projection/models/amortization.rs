//! Amortization — level-payment loan schedule, one row per payment period.
//!
//! Purpose
//! -------
//! Translate the classic loan-schedule spreadsheet (opening balance,
//! interest, payment, principal, closing balance, plus a few summary
//! columns) into a [`RowSequenceEvaluator`]. The model exercises every
//! piece of the core: previous-row reads, a threshold-gated column, a
//! trailing-window sum, a cumulative sum, and a flag-filtered count.
//!
//! Key behaviors
//! -------------
//! - Row 0 opens at the principal; row `i` opens at the closing balance of
//!   row `i - 1`.
//! - The scheduled payment is the level annuity payment for the horizon,
//!   capped at what is still owed.
//! - From `extra_payment_from` on, an additional prepayment is made (capped
//!   at the remaining balance), so the loan may be paid off early; later
//!   rows are all zero and flagged `paid_off`.
//! - `interest_prior_year` sums interest over the `periods_per_year` rows
//!   before the current one.
//!
//! Invariants & assumptions
//! ------------------------
//! - `closing_balance` never goes negative; balances within
//!   [`PAID_OFF_TOLERANCE`] of zero (relative to the principal) snap to
//!   exactly `0.0`, so rows after payoff are exact zeros.
//! - The trailing window is fixed when the evaluator is built; [`schedule`]
//!   builds it from the parameters' own horizon.
//!
//! Conventions
//! -----------
//! - Rates are nominal annual rates; the periodic rate is
//!   `annual_rate / periods_per_year`.
use crate::projection::{
    core::{
        aggregates::{AggregateSpec, AggregateStrategy},
        evaluator::RowSequenceEvaluator,
        fields::LineRow,
        params::{Horizon, LineParams},
        sequence::Sequence,
        validation::{validate_non_negative, validate_positive, validate_unit_interval},
    },
    errors::{CalcResult, ParamResult},
};
use ndarray::Array1;

/// Relative balance below which a loan counts as repaid.
pub const PAID_OFF_TOLERANCE: f64 = 1e-9;

/// LoanParams — inputs of a level-payment loan schedule.
///
/// Fields
/// ------
/// - `principal`: amount borrowed (> 0).
/// - `annual_rate`: nominal annual interest rate in `[0, 1]`.
/// - `horizon`: term; one row per payment period.
/// - `extra_payment`: additional prepayment per period (>= 0).
/// - `extra_payment_from`: first row index at which the prepayment applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoanParams {
    pub principal: f64,
    pub annual_rate: f64,
    pub horizon: Horizon,
    pub extra_payment: f64,
    pub extra_payment_from: usize,
}

impl LoanParams {
    /// Loan without prepayments.
    pub fn new(principal: f64, annual_rate: f64, horizon: Horizon) -> Self {
        LoanParams { principal, annual_rate, horizon, extra_payment: 0.0, extra_payment_from: 0 }
    }

    /// Add a fixed prepayment from row `from` on.
    pub fn with_extra_payment(mut self, amount: f64, from: usize) -> Self {
        self.extra_payment = amount;
        self.extra_payment_from = from;
        self
    }

    /// Interest rate per row.
    pub fn periodic_rate(&self) -> f64 {
        self.annual_rate / self.horizon.periods_per_year() as f64
    }

    /// Level payment that repays `principal` over the full horizon.
    ///
    /// Returns `0.0` for an empty horizon.
    pub fn level_payment(&self) -> f64 {
        let n = self.horizon.row_count();
        if n == 0 {
            return 0.0;
        }
        let r = self.periodic_rate();
        if r == 0.0 {
            return self.principal / n as f64;
        }
        self.principal * r / (1.0 - (1.0 + r).powi(-(n as i32)))
    }
}

impl LineParams for LoanParams {
    fn validate(&self) -> ParamResult<()> {
        validate_positive("principal", self.principal)?;
        validate_unit_interval("annual_rate", self.annual_rate)?;
        validate_non_negative("extra_payment", self.extra_payment)?;
        Ok(())
    }

    fn horizon(&self) -> Option<Horizon> {
        Some(self.horizon)
    }
}

/// One payment period of the schedule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmortizationRow {
    pub opening_balance: f64,
    pub interest: f64,
    pub scheduled_payment: f64,
    pub extra_payment: f64,
    pub principal_repaid: f64,
    pub closing_balance: f64,
    /// Interest over the `periods_per_year` rows before this one.
    pub interest_prior_year: f64,
    /// Interest up to and including this row.
    pub cumulative_interest: f64,
    /// Rows with a scheduled payment, up to and including this row.
    pub payments_made: f64,
    pub paid_off: bool,
}

impl LineRow for AmortizationRow {
    const FIELDS: &'static [&'static str] = &[
        "opening_balance",
        "interest",
        "scheduled_payment",
        "extra_payment",
        "principal_repaid",
        "closing_balance",
        "interest_prior_year",
        "cumulative_interest",
        "payments_made",
        "paid_off",
    ];
}

/// Build the schedule evaluator for `periods_per_year` rows per year.
///
/// # Errors
/// - `CalcError::InvalidPlan` if the window is empty (`periods_per_year == 0`).
pub fn evaluator(
    periods_per_year: usize, strategy: AggregateStrategy,
) -> CalcResult<RowSequenceEvaluator<LoanParams, AmortizationRow>> {
    let mut builder = RowSequenceEvaluator::<LoanParams, AmortizationRow>::builder();

    let prior_year = builder.aggregate(
        AggregateSpec::sum("interest_prior_year", |r: &AmortizationRow| r.interest)
            .trailing(periods_per_year)
            .with_strategy(strategy),
    );
    let total_interest = builder.aggregate(
        AggregateSpec::sum("cumulative_interest", |r: &AmortizationRow| r.interest)
            .with_strategy(strategy),
    );
    let payments = builder.aggregate(
        AggregateSpec::count("payments_made", |r: &AmortizationRow| r.scheduled_payment > 0.0)
            .with_strategy(strategy),
    );

    builder
        .formula(crate::row_field!(AmortizationRow, opening_balance: f64), &[], |ctx| {
            Ok(ctx.previous().map_or(ctx.params().principal, |prev| prev.closing_balance))
        })
        .formula(crate::row_field!(AmortizationRow, interest: f64), &["opening_balance"], |ctx| {
            Ok(ctx.current().opening_balance * ctx.params().periodic_rate())
        })
        .formula(
            crate::row_field!(AmortizationRow, scheduled_payment: f64),
            &["opening_balance", "interest"],
            |ctx| {
                let row = ctx.current();
                Ok(ctx.params().level_payment().min(row.opening_balance + row.interest))
            },
        )
        .formula(
            crate::row_field!(AmortizationRow, extra_payment: f64),
            &["opening_balance", "interest", "scheduled_payment"],
            |ctx| {
                let p = ctx.params();
                if ctx.index() < p.extra_payment_from {
                    return Ok(0.0);
                }
                let row = ctx.current();
                let owed = row.opening_balance + row.interest - row.scheduled_payment;
                Ok(p.extra_payment.min(owed).max(0.0))
            },
        )
        .formula(
            crate::row_field!(AmortizationRow, principal_repaid: f64),
            &["interest", "scheduled_payment", "extra_payment"],
            |ctx| {
                let row = ctx.current();
                Ok(row.scheduled_payment + row.extra_payment - row.interest)
            },
        )
        .formula(
            crate::row_field!(AmortizationRow, closing_balance: f64),
            &["opening_balance", "principal_repaid"],
            |ctx| {
                let row = ctx.current();
                let closing = row.opening_balance - row.principal_repaid;
                if closing <= PAID_OFF_TOLERANCE * ctx.params().principal { Ok(0.0) } else { Ok(closing) }
            },
        )
        .formula(crate::row_field!(AmortizationRow, interest_prior_year: f64), &[], move |ctx| {
            ctx.aggregate(prior_year)
        })
        .formula(
            crate::row_field!(AmortizationRow, cumulative_interest: f64),
            &["interest"],
            move |ctx| Ok(ctx.aggregate(total_interest)? + ctx.current().interest),
        )
        .formula(
            crate::row_field!(AmortizationRow, payments_made: f64),
            &["scheduled_payment"],
            move |ctx| {
                let paid_now = if ctx.current().scheduled_payment > 0.0 { 1.0 } else { 0.0 };
                Ok(ctx.aggregate(payments)? + paid_now)
            },
        )
        .formula(crate::row_field!(AmortizationRow, paid_off: bool), &["closing_balance"], |ctx| {
            Ok(ctx.current().closing_balance == 0.0)
        });

    builder.build()
}

/// Compute the full schedule for the loan's own horizon.
///
/// # Errors
/// - `CalcError::InvalidParameters` when `params` fail validation.
pub fn schedule(params: &LoanParams) -> CalcResult<Sequence<AmortizationRow>> {
    evaluator(params.horizon.periods_per_year(), AggregateStrategy::Incremental)?
        .compute_horizon(params)
}

/// Named numeric columns of a finished schedule, in row-schema order.
pub fn columns(sequence: &Sequence<AmortizationRow>) -> Vec<(&'static str, Array1<f64>)> {
    vec![
        ("opening_balance", sequence.column(&crate::row_field!(AmortizationRow, opening_balance: f64))),
        ("interest", sequence.column(&crate::row_field!(AmortizationRow, interest: f64))),
        ("scheduled_payment", sequence.column(&crate::row_field!(AmortizationRow, scheduled_payment: f64))),
        ("extra_payment", sequence.column(&crate::row_field!(AmortizationRow, extra_payment: f64))),
        ("principal_repaid", sequence.column(&crate::row_field!(AmortizationRow, principal_repaid: f64))),
        ("closing_balance", sequence.column(&crate::row_field!(AmortizationRow, closing_balance: f64))),
        (
            "interest_prior_year",
            sequence.column(&crate::row_field!(AmortizationRow, interest_prior_year: f64)),
        ),
        (
            "cumulative_interest",
            sequence.column(&crate::row_field!(AmortizationRow, cumulative_interest: f64)),
        ),
        ("payments_made", sequence.column(&crate::row_field!(AmortizationRow, payments_made: f64))),
        ("paid_off", sequence.column(&crate::row_field!(AmortizationRow, paid_off: bool))),
    ]
}
