//! Cohort — seeded population projection with lagged births and capped
//! harvests.
//!
//! Purpose
//! -------
//! A small ecology-style projection: a population grows through births that
//! depend on the population one maturity lag ago, shrinks through mortality,
//! and is harvested when it exceeds a threshold, at most a fixed number of
//! times per year.
//!
//! Key behaviors
//! -------------
//! - Row 0 is seeded from `initial_population`; rows `1..=N` are computed.
//! - `births = birth_rate × population[i - maturity_lag]` once
//!   `i >= maturity_lag`, else `0`.
//! - `deaths = mortality_rate × population[i - 1]`.
//! - A harvest happens when the pre-harvest population reaches
//!   `harvest_threshold` and fewer than `max_harvests_per_year` harvests
//!   happened in the previous `periods_per_year` rows (a flag-filtered
//!   trailing count).
//!
//! Invariants & assumptions
//! ------------------------
//! - Populations stay non-negative: mortality and harvest fractions are in
//!   `[0, 1]`.
//! - Any `periods_per_year` consecutive rows contain at most
//!   `max_harvests_per_year` harvests.
//!
//! Conventions
//! -----------
//! - Fields are registered out of dependency order (`population` first); the
//!   formula plan sorts them.
use crate::projection::{
    core::{
        aggregates::{AggregateSpec, AggregateStrategy},
        context::FormulaContext,
        evaluator::RowSequenceEvaluator,
        fields::LineRow,
        params::{Horizon, LineParams},
        sequence::Sequence,
        validation::{validate_count, validate_non_negative, validate_positive, validate_unit_interval},
    },
    errors::{CalcResult, ParamResult},
};
use ndarray::Array1;

/// CohortParams — inputs of a seeded population projection.
///
/// Fields
/// ------
/// - `initial_population`: seed population (> 0).
/// - `birth_rate`: births per mature individual per row (>= 0).
/// - `mortality_rate`: fraction dying per row, in `[0, 1]`.
/// - `maturity_lag`: rows until newborns reproduce (>= 1).
/// - `harvest_threshold`: pre-harvest population that triggers a harvest.
/// - `harvest_fraction`: fraction removed by a harvest, in `[0, 1]`.
/// - `max_harvests_per_year`: cap on harvests within any trailing year.
/// - `horizon`: number of computed rows (the seed row is extra).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CohortParams {
    pub initial_population: f64,
    pub birth_rate: f64,
    pub mortality_rate: f64,
    pub maturity_lag: usize,
    pub harvest_threshold: f64,
    pub harvest_fraction: f64,
    pub max_harvests_per_year: usize,
    pub horizon: Horizon,
}

impl LineParams for CohortParams {
    fn validate(&self) -> ParamResult<()> {
        validate_positive("initial_population", self.initial_population)?;
        validate_non_negative("birth_rate", self.birth_rate)?;
        validate_unit_interval("mortality_rate", self.mortality_rate)?;
        validate_count("maturity_lag", self.maturity_lag, 1)?;
        validate_non_negative("harvest_threshold", self.harvest_threshold)?;
        validate_unit_interval("harvest_fraction", self.harvest_fraction)?;
        Ok(())
    }

    fn horizon(&self) -> Option<Horizon> {
        Some(self.horizon)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CohortRow {
    /// Population at the end of the row, after harvest.
    pub population: f64,
    pub births: f64,
    pub deaths: f64,
    /// Harvests in the `periods_per_year` rows before this one.
    pub harvests_prior_year: f64,
    pub harvested: bool,
    pub harvest: f64,
}

impl LineRow for CohortRow {
    const FIELDS: &'static [&'static str] =
        &["population", "births", "deaths", "harvests_prior_year", "harvested", "harvest"];
}

/// Build the projection evaluator for `periods_per_year` rows per year.
///
/// # Errors
/// - `CalcError::InvalidPlan` if `periods_per_year == 0`.
pub fn evaluator(
    periods_per_year: usize, strategy: AggregateStrategy,
) -> CalcResult<RowSequenceEvaluator<CohortParams, CohortRow>> {
    let mut builder = RowSequenceEvaluator::<CohortParams, CohortRow>::builder();

    let recent_harvests = builder.aggregate(
        AggregateSpec::count("harvests_prior_year", |r: &CohortRow| r.harvested)
            .trailing(periods_per_year)
            .with_strategy(strategy),
    );

    builder
        .seed(|p: &CohortParams| CohortRow { population: p.initial_population, ..CohortRow::default() })
        .formula(
            crate::row_field!(CohortRow, population: f64),
            &["births", "deaths", "harvest"],
            |ctx| Ok(pre_harvest(ctx)? - ctx.current().harvest),
        )
        .formula(crate::row_field!(CohortRow, births: f64), &[], |ctx| {
            let p = ctx.params();
            if ctx.index() < p.maturity_lag {
                return Ok(0.0);
            }
            Ok(p.birth_rate * ctx.prior(p.maturity_lag)?.population)
        })
        .formula(crate::row_field!(CohortRow, deaths: f64), &[], |ctx| {
            Ok(ctx.params().mortality_rate * ctx.prior(1)?.population)
        })
        .formula(crate::row_field!(CohortRow, harvests_prior_year: f64), &[], move |ctx| {
            ctx.aggregate(recent_harvests)
        })
        .formula(
            crate::row_field!(CohortRow, harvested: bool),
            &["births", "deaths", "harvests_prior_year"],
            |ctx| {
                let p = ctx.params();
                let under_cap = ctx.current().harvests_prior_year < p.max_harvests_per_year as f64;
                Ok(under_cap && pre_harvest(ctx)? >= p.harvest_threshold)
            },
        )
        .formula(
            crate::row_field!(CohortRow, harvest: f64),
            &["births", "deaths", "harvested"],
            |ctx| {
                if !ctx.current().harvested {
                    return Ok(0.0);
                }
                Ok(ctx.params().harvest_fraction * pre_harvest(ctx)?)
            },
        );

    builder.build()
}

/// Map a `+inf` harvest threshold to `f64::MAX` ("never harvest").
///
/// Every other value is returned unchanged, so `-inf` and NaN still fail
/// `validate`.
pub fn harvest_threshold_or_never(threshold: f64) -> f64 {
    if threshold == f64::INFINITY { f64::MAX } else { threshold }
}

/// Project the population over the parameters' own horizon.
///
/// # Errors
/// - `CalcError::InvalidParameters` when `params` fail validation.
pub fn project(params: &CohortParams) -> CalcResult<Sequence<CohortRow>> {
    evaluator(params.horizon.periods_per_year(), AggregateStrategy::Incremental)?
        .compute_horizon(params)
}

/// Named numeric columns of a finished projection, in row-schema order.
pub fn columns(sequence: &Sequence<CohortRow>) -> Vec<(&'static str, Array1<f64>)> {
    vec![
        ("population", sequence.column(&crate::row_field!(CohortRow, population: f64))),
        ("births", sequence.column(&crate::row_field!(CohortRow, births: f64))),
        ("deaths", sequence.column(&crate::row_field!(CohortRow, deaths: f64))),
        ("harvests_prior_year", sequence.column(&crate::row_field!(CohortRow, harvests_prior_year: f64))),
        ("harvested", sequence.column(&crate::row_field!(CohortRow, harvested: bool))),
        ("harvest", sequence.column(&crate::row_field!(CohortRow, harvest: f64))),
    ]
}

// ---- Helper Methods ----

/// Previous population plus births minus deaths of the current row.
fn pre_harvest(ctx: &FormulaContext<'_, CohortParams, CohortRow>) -> CalcResult<f64> {
    let row = ctx.current();
    Ok(ctx.prior(1)?.population + row.births - row.deaths)
}
