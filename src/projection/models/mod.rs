//! models — small domain models built on the projection core.
//!
//! Purpose
//! -------
//! Show the field-formula contract end to end on two familiar spreadsheet
//! shapes, and give the Python bindings something concrete to expose.
//!
//! Key behaviors
//! -------------
//! - [`amortization`]: unseeded loan schedule with a threshold-gated
//!   prepayment, a trailing-year interest sum, a cumulative sum, and a
//!   filtered payment count.
//! - [`cohort`]: seeded population projection with lag-`k` history reads and
//!   a flag-filtered trailing count that caps harvests.
//!
//! Conventions
//! -----------
//! - Each model exposes `evaluator(periods_per_year, strategy)` to build a
//!   reusable evaluator, a one-shot helper over the parameters' own horizon,
//!   and `columns` for named `ndarray` export.

pub mod amortization;
pub mod cohort;

pub use self::amortization::{AmortizationRow, LoanParams};
pub use self::cohort::{CohortParams, CohortRow};

pub mod prelude {
    pub use super::amortization::{self, AmortizationRow, LoanParams};
    pub use super::cohort::{self, CohortParams, CohortRow};
}
