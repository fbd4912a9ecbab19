//! Formula plan — verified, dependency-ordered list of field formulas.
//!
//! Purpose
//! -------
//! Turn a set of registered formulas into the fixed order in which they run
//! for every row, and prove up front that the set matches the row schema:
//! every declared field is produced exactly once, and same-row dependencies
//! never loop.
//!
//! Key behaviors
//! -------------
//! - [`FormulaPlan::resolve`] checks the formulas against `R::FIELDS` and the
//!   aggregate specs, then sorts the formulas topologically by their
//!   same-row dependencies.
//! - The sort is stable: among formulas whose dependencies are satisfied, the
//!   one registered first runs first. A plan whose registration order
//!   already respects dependencies therefore runs in registration order.
//!
//! Invariants & assumptions
//! ------------------------
//! - Only same-row dependencies appear in the graph. Reads of prior rows or
//!   aggregates are forward-only by construction and need no ordering.
//! - Verification runs once, when the evaluator is built; the per-row loop
//!   trusts the resolved order.
//!
//! Testing notes
//! -------------
//! - Unit tests cover each `PlanError` variant and the stable ordering rule.
use crate::projection::{
    core::{
        aggregates::{AggregateSpec, Window},
        fields::LineRow,
        formula::RowFormula,
    },
    errors::{PlanError, PlanResult},
};
use std::collections::HashSet;

/// Formulas in evaluation order.
pub struct FormulaPlan<P, R> {
    formulas: Vec<Box<dyn RowFormula<P, R>>>,
}

impl<P, R: LineRow> FormulaPlan<P, R> {
    /// Verify `formulas` against `R::FIELDS` and `aggregates`, and order them.
    ///
    /// # Errors
    /// - [`PlanError::UnknownField`], [`PlanError::DuplicateField`],
    ///   [`PlanError::MissingFormula`] when formulas and schema disagree.
    /// - [`PlanError::UnknownDependency`] for a dependency outside the schema.
    /// - [`PlanError::CyclicDependency`] when no valid order exists; lists the
    ///   fields left unresolved, in registration order.
    /// - [`PlanError::InvalidWindow`], [`PlanError::DuplicateAggregate`] for
    ///   malformed aggregates.
    pub fn resolve(
        formulas: Vec<Box<dyn RowFormula<P, R>>>, aggregates: &[AggregateSpec<R>],
    ) -> PlanResult<Self> {
        validate_aggregates(aggregates)?;

        let declared: HashSet<&'static str> = R::FIELDS.iter().copied().collect();
        let mut produced: HashSet<&'static str> = HashSet::with_capacity(formulas.len());
        for formula in &formulas {
            let field = formula.produces();
            if !declared.contains(field) {
                return Err(PlanError::UnknownField { field });
            }
            if !produced.insert(field) {
                return Err(PlanError::DuplicateField { field });
            }
            if let Some(&dependency) = formula.depends_on().iter().find(|d| !declared.contains(*d)) {
                return Err(PlanError::UnknownDependency { field, dependency });
            }
        }
        if let Some(&field) = R::FIELDS.iter().find(|f| !produced.contains(*f)) {
            return Err(PlanError::MissingFormula { field });
        }

        Ok(FormulaPlan { formulas: stable_topological_order(formulas)? })
    }
}

impl<P, R> FormulaPlan<P, R> {
    /// Formulas in the order they run for every row.
    pub fn formulas(&self) -> &[Box<dyn RowFormula<P, R>>] {
        &self.formulas
    }

    /// Field names in evaluation order.
    pub fn order(&self) -> Vec<&'static str> {
        self.formulas.iter().map(|f| f.produces()).collect()
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }
}

// ---- Helper Methods ----

fn validate_aggregates<R>(aggregates: &[AggregateSpec<R>]) -> PlanResult<()> {
    let mut names: HashSet<&'static str> = HashSet::with_capacity(aggregates.len());
    for spec in aggregates {
        if spec.window() == Window::Trailing(0) {
            return Err(PlanError::InvalidWindow { aggregate: spec.name() });
        }
        if !names.insert(spec.name()) {
            return Err(PlanError::DuplicateAggregate { aggregate: spec.name() });
        }
    }
    Ok(())
}

/// Repeatedly take the first pending formula whose dependencies are done.
///
/// O(n²) in the number of formulas, which is the number of columns.
fn stable_topological_order<P, R>(
    formulas: Vec<Box<dyn RowFormula<P, R>>>,
) -> PlanResult<Vec<Box<dyn RowFormula<P, R>>>> {
    let mut pending: Vec<Option<Box<dyn RowFormula<P, R>>>> = formulas.into_iter().map(Some).collect();
    let mut ordered = Vec::with_capacity(pending.len());
    let mut done: HashSet<&'static str> = HashSet::with_capacity(pending.len());

    while ordered.len() < pending.len() {
        let ready = pending.iter().position(|slot| {
            slot.as_ref().is_some_and(|f| f.depends_on().iter().all(|d| done.contains(d)))
        });
        match ready.and_then(|k| pending[k].take()) {
            Some(formula) => {
                done.insert(formula.produces());
                ordered.push(formula);
            }
            None => {
                let fields = pending.iter().flatten().map(|f| f.produces()).collect();
                return Err(PlanError::CyclicDependency { fields });
            }
        }
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::core::{context::FormulaContext, formula::FieldFormula};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Stable dependency ordering of formulas.
    // - Every `PlanError` variant raised by `FormulaPlan::resolve`.
    //
    // They intentionally DO NOT cover:
    // - Running the formulas (see `evaluator`).
    // -------------------------------------------------------------------------

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Triple {
        a: f64,
        b: f64,
        c: f64,
    }

    impl LineRow for Triple {
        const FIELDS: &'static [&'static str] = &["a", "b", "c"];
    }

    type Boxed = Box<dyn RowFormula<(), Triple>>;

    fn a(deps: &[&'static str]) -> Boxed {
        Box::new(FieldFormula::new(crate::row_field!(Triple, a: f64), deps, |_: &FormulaContext<'_, (), Triple>| Ok(1.0)))
    }

    fn b(deps: &[&'static str]) -> Boxed {
        Box::new(FieldFormula::new(crate::row_field!(Triple, b: f64), deps, |_: &FormulaContext<'_, (), Triple>| Ok(2.0)))
    }

    fn c(deps: &[&'static str]) -> Boxed {
        Box::new(FieldFormula::new(crate::row_field!(Triple, c: f64), deps, |_: &FormulaContext<'_, (), Triple>| Ok(3.0)))
    }

    fn resolve(formulas: Vec<Boxed>) -> PlanResult<FormulaPlan<(), Triple>> {
        FormulaPlan::resolve(formulas, &[])
    }

    #[test]
    // Purpose
    // -------
    // Verify that formulas registered out of dependency order are reordered,
    // and that independent formulas keep registration order.
    //
    // Given
    // -----
    // - Registration order c, b, a with c ← {a, b}; a and b independent.
    //
    // Expect
    // ------
    // - Evaluation order b, a, c.
    fn resolve_orders_by_dependency_then_registration() {
        // Arrange
        let formulas = vec![c(&["a", "b"]), b(&[]), a(&[])];

        // Act
        let plan = resolve(formulas).unwrap();

        // Assert
        assert_eq!(plan.order(), vec!["b", "a", "c"]);
        assert_eq!(plan.len(), 3);
    }

    #[test]
    // Purpose
    // -------
    // Verify that a plan already in dependency order is left untouched.
    //
    // Given
    // -----
    // - a, b ← a, c ← b.
    //
    // Expect
    // ------
    // - Evaluation order a, b, c.
    fn resolve_keeps_valid_registration_order() {
        let plan = resolve(vec![a(&[]), b(&["a"]), c(&["b"])]).unwrap();

        assert_eq!(plan.order(), vec!["a", "b", "c"]);
    }

    #[test]
    // Purpose
    // -------
    // Exercise each schema mismatch.
    //
    // Given
    // -----
    // - A missing formula, a duplicate, and an undeclared dependency.
    //
    // Expect
    // ------
    // - `MissingFormula`, `DuplicateField`, `UnknownDependency` respectively.
    fn resolve_rejects_schema_mismatches() {
        assert_eq!(
            resolve(vec![a(&[]), b(&[])]).err(),
            Some(PlanError::MissingFormula { field: "c" })
        );
        assert_eq!(
            resolve(vec![a(&[]), a(&[]), b(&[]), c(&[])]).err(),
            Some(PlanError::DuplicateField { field: "a" })
        );
        assert_eq!(
            resolve(vec![a(&["z"]), b(&[]), c(&[])]).err(),
            Some(PlanError::UnknownDependency { field: "a", dependency: "z" })
        );
    }

    #[test]
    // Purpose
    // -------
    // Verify that a formula writing an undeclared field is rejected.
    //
    // Given
    // -----
    // - A formula for a field named "d" built by hand.
    //
    // Expect
    // ------
    // - `UnknownField { field: "d" }`.
    fn resolve_rejects_undeclared_field() {
        // Arrange
        let d = crate::projection::core::fields::Field::<Triple, f64>::new(
            "d",
            |row| row.a,
            |row, v| row.a = v,
        );
        let rogue: Boxed = Box::new(FieldFormula::new(d, &[], |_: &FormulaContext<'_, (), Triple>| Ok(0.0)));

        // Act
        let err = resolve(vec![a(&[]), b(&[]), c(&[]), rogue]).err();

        // Assert
        assert_eq!(err, Some(PlanError::UnknownField { field: "d" }));
    }

    #[test]
    // Purpose
    // -------
    // Verify cycle detection, including self-dependencies.
    //
    // Given
    // -----
    // - a ← c, b independent, c ← a.
    // - A second plan where b depends on itself.
    //
    // Expect
    // ------
    // - `CyclicDependency` listing the unresolved fields in registration
    //   order.
    fn resolve_rejects_cycles() {
        assert_eq!(
            resolve(vec![a(&["c"]), b(&[]), c(&["a"])]).err(),
            Some(PlanError::CyclicDependency { fields: vec!["a", "c"] })
        );
        assert_eq!(
            resolve(vec![a(&[]), b(&["b"]), c(&[])]).err(),
            Some(PlanError::CyclicDependency { fields: vec!["b"] })
        );
    }

    #[test]
    // Purpose
    // -------
    // Verify aggregate validation.
    //
    // Given
    // -----
    // - An empty trailing window; two aggregates with the same name.
    //
    // Expect
    // ------
    // - `InvalidWindow` and `DuplicateAggregate` respectively.
    fn resolve_rejects_malformed_aggregates() {
        let empty_window = [AggregateSpec::sum("s", |t: &Triple| t.a).trailing(0)];
        let duplicated =
            [AggregateSpec::sum("s", |t: &Triple| t.a), AggregateSpec::sum("s", |t: &Triple| t.b)];

        assert_eq!(
            FormulaPlan::resolve(vec![a(&[]), b(&[]), c(&[])], &empty_window).err(),
            Some(PlanError::InvalidWindow { aggregate: "s" })
        );
        assert_eq!(
            FormulaPlan::resolve(vec![a(&[]), b(&[]), c(&[])], &duplicated).err(),
            Some(PlanError::DuplicateAggregate { aggregate: "s" })
        );
    }
}
