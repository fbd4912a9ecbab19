//! Sequence — the append-only arena of computed rows.
//!
//! Purpose
//! -------
//! Hold the output of one evaluation as an ordered, growing list of rows in
//! which the row index is the only handle. Formulas never hold references
//! into the sequence across steps; they receive a fresh view of the finished
//! prefix for every row.
//!
//! Key behaviors
//! -------------
//! - Rows are appended by the evaluator only; callers get read access.
//! - Records whether row 0 was seeded from parameters rather than computed.
//! - Exports columns as `ndarray::Array1<f64>` for downstream consumers
//!   (rendering, spreadsheet-compatible export, numerical post-processing).
//!
//! Invariants & assumptions
//! ------------------------
//! - Index order is dependency order: row `i` was computed from rows `0..i`.
//! - Rows are never modified after being pushed.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based. When seeded, `first_computed_index() == 1`.
use crate::projection::{
    core::fields::{Field, FieldValue},
    errors::{CalcError, CalcResult},
};
use ndarray::Array1;
use std::ops::Index;

/// Append-only list of finished rows produced by one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence<R> {
    rows: Vec<R>,
    seeded: bool,
}

impl<R> Sequence<R> {
    /// Empty sequence with room for `capacity` rows.
    ///
    /// # Errors
    /// - [`CalcError::CapacityExceeded`] when the buffer cannot be reserved.
    pub(crate) fn try_with_capacity(capacity: usize, seeded: bool) -> CalcResult<Self> {
        let mut rows = Vec::new();
        rows.try_reserve_exact(capacity).map_err(|_| CalcError::CapacityExceeded { rows: capacity })?;
        Ok(Sequence { rows, seeded })
    }

    pub(crate) fn push(&mut self, row: R) {
        self.rows.push(row);
    }

    /// Number of rows, including a seeded row 0.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether row 0 was produced by the seed instead of the formulas.
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Index of the first row produced by the formulas.
    pub fn first_computed_index(&self) -> usize {
        usize::from(self.seeded)
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.rows.get(index)
    }

    pub fn last(&self) -> Option<&R> {
        self.rows.last()
    }

    /// All rows as a slice.
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Rows produced by the formulas (excludes a seeded row 0).
    pub fn computed_rows(&self) -> &[R] {
        &self.rows[self.first_computed_index().min(self.rows.len())..]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    /// Consume the sequence and return its rows.
    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    /// Export one typed column as an `f64` array (flags become `1.0` / `0.0`).
    pub fn column<T: FieldValue>(&self, field: &Field<R, T>) -> Array1<f64> {
        self.column_by(|row| field.read_f64(row))
    }

    /// Export an arbitrary per-row projection as an `f64` array.
    pub fn column_by<F>(&self, f: F) -> Array1<f64>
    where
        F: Fn(&R) -> f64,
    {
        self.rows.iter().map(f).collect()
    }
}

impl<R> Index<usize> for Sequence<R> {
    type Output = R;

    fn index(&self, index: usize) -> &R {
        &self.rows[index]
    }
}

impl<'a, R> IntoIterator for &'a Sequence<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::core::fields::LineRow;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Tick {
        value: f64,
        flag: bool,
    }

    impl LineRow for Tick {
        const FIELDS: &'static [&'static str] = &["value", "flag"];
    }

    fn make_sequence(seeded: bool) -> Sequence<Tick> {
        let mut sequence = Sequence::try_with_capacity(3, seeded).unwrap();
        sequence.push(Tick { value: 1.0, flag: false });
        sequence.push(Tick { value: 2.0, flag: true });
        sequence.push(Tick { value: 3.0, flag: true });
        sequence
    }

    #[test]
    // Purpose
    // -------
    // Verify that seeded sequences report the seed row separately from the
    // computed rows.
    //
    // Given
    // -----
    // - A three-row sequence marked as seeded.
    //
    // Expect
    // ------
    // - `first_computed_index() == 1` and `computed_rows()` has two rows.
    fn seeded_sequence_separates_seed_from_computed_rows() {
        // Arrange + Act
        let sequence = make_sequence(true);

        // Assert
        assert_eq!(sequence.len(), 3);
        assert!(sequence.is_seeded());
        assert_eq!(sequence.first_computed_index(), 1);
        assert_eq!(sequence.computed_rows().len(), 2);
        assert_eq!(sequence.computed_rows()[0].value, 2.0);
    }

    #[test]
    // Purpose
    // -------
    // Verify column export for numeric and flag fields.
    //
    // Given
    // -----
    // - An unseeded three-row sequence.
    //
    // Expect
    // ------
    // - The `value` column matches the rows; the `flag` column maps to 0/1.
    fn column_export_maps_fields_to_f64_arrays() {
        // Arrange
        let sequence = make_sequence(false);
        let value = crate::row_field!(Tick, value: f64);
        let flag = crate::row_field!(Tick, flag: bool);

        // Act
        let values = sequence.column(&value);
        let flags = sequence.column(&flag);

        // Assert
        assert_eq!(values.to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(flags.to_vec(), vec![0.0, 1.0, 1.0]);
        assert_eq!(sequence.first_computed_index(), 0);
        assert_eq!(sequence[2].value, 3.0);
    }
}
