//! Field formulas — the plug-in contract replacing spreadsheet cell formulas.
//!
//! Each formula corresponds to one output column. It is a pure function of a
//! [`FormulaContext`] that returns the column's value; the evaluator, not the
//! formula, writes that value into the row through the formula's [`Field`].
//! A formula therefore cannot touch any other column.
//!
//! [`RowFormula`] is the type-erased interface the plan stores, so numeric
//! and flag columns can live in one ordered list.
use crate::projection::{
    core::{
        context::{FormulaContext, Frame},
        fields::{Field, FieldValue},
    },
    errors::{CalcError, CalcResult},
};

/// Boxed formula body for a column of type `T`.
pub type FormulaFn<P, R, T> = dyn for<'a> Fn(&FormulaContext<'a, P, R>) -> CalcResult<T> + Send + Sync;

/// Object-safe view of a registered formula.
pub trait RowFormula<P, R>: Send + Sync {
    /// Name of the single field this formula writes.
    fn produces(&self) -> &'static str;

    /// Same-row fields that must be computed before this one.
    fn depends_on(&self) -> &[&'static str];

    /// Compute the value from `frame` + `row` and write it into `row`.
    ///
    /// # Errors
    /// - Whatever the formula body returns.
    /// - [`CalcError::NonFiniteValue`] when `guard_non_finite` is set and the
    ///   value is NaN/±inf.
    fn evaluate(&self, frame: &Frame<'_, P, R>, row: &mut R, guard_non_finite: bool) -> CalcResult<()>;

    /// Check the value already stored in this formula's field of `row`.
    ///
    /// Used for rows that bypass `evaluate`, such as a seeded row 0.
    ///
    /// # Errors
    /// - [`CalcError::NonFiniteValue`] when the stored value is NaN/±inf.
    fn check_finite(&self, row: &R, index: usize) -> CalcResult<()>;
}

/// A formula bound to one typed column.
pub struct FieldFormula<P, R, T> {
    field: Field<R, T>,
    depends_on: Vec<&'static str>,
    compute: Box<FormulaFn<P, R, T>>,
}

impl<P, R, T: FieldValue> FieldFormula<P, R, T> {
    pub fn new<F>(field: Field<R, T>, depends_on: &[&'static str], compute: F) -> Self
    where
        F: for<'a> Fn(&FormulaContext<'a, P, R>) -> CalcResult<T> + Send + Sync + 'static,
    {
        FieldFormula { field, depends_on: depends_on.to_vec(), compute: Box::new(compute) }
    }

    pub fn field(&self) -> Field<R, T> {
        self.field
    }

    fn ensure_finite(&self, value: T, index: usize) -> CalcResult<()> {
        if value.is_finite_value() {
            return Ok(());
        }
        Err(CalcError::NonFiniteValue { index, field: self.field.name, value: value.to_f64() })
    }
}

impl<P, R, T: FieldValue> RowFormula<P, R> for FieldFormula<P, R, T> {
    fn produces(&self) -> &'static str {
        self.field.name
    }

    fn depends_on(&self) -> &[&'static str] {
        &self.depends_on
    }

    fn evaluate(&self, frame: &Frame<'_, P, R>, row: &mut R, guard_non_finite: bool) -> CalcResult<()> {
        let value = {
            let ctx = FormulaContext::new(frame, &*row);
            (self.compute)(&ctx)?
        };
        if guard_non_finite {
            self.ensure_finite(value, frame.history.len())?;
        }
        self.field.write(row, value);
        Ok(())
    }

    fn check_finite(&self, row: &R, index: usize) -> CalcResult<()> {
        self.ensure_finite(self.field.read(row), index)
    }
}
