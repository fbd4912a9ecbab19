//! Typed row fields — the statically declared columns of a projection.
//!
//! Purpose
//! -------
//! Replace free-form, loosely typed row objects with explicit records. A row
//! type declares its column names once via [`LineRow::FIELDS`]; each column
//! is addressed through a [`Field`], which couples the name with a getter and
//! a setter so that a formula can write exactly one field and nothing else.
//!
//! Key behaviors
//! -------------
//! - [`FieldValue`] is implemented for `f64` and `bool`, the two value kinds a
//!   spreadsheet column translates into (amounts and flags).
//! - [`Field`] is `Copy`, so the same accessor can be shared by a formula,
//!   an aggregate source, and a column export without cloning.
//! - [`row_field!`](crate::row_field) builds a [`Field`] from a struct field
//!   name, keeping the column name and the Rust field name in sync.
//!
//! Invariants & assumptions
//! ------------------------
//! - Names in `LineRow::FIELDS` are unique and match the names used by the
//!   row's [`Field`] accessors; the formula plan verifies this at build time.
//! - `R::default()` is the documented "zero" row: every numeric field is
//!   `0.0` and every flag is `false` before formulas run.
//!
//! Conventions
//! -----------
//! - Flags convert to `1.0` / `0.0` wherever a numeric view is needed
//!   (aggregation, `ndarray` export).
use std::fmt::Debug;

/// Value kinds a row field may hold.
pub trait FieldValue: Copy + Default + PartialEq + Debug + Send + Sync + 'static {
    /// Numeric view used by aggregates and column export.
    fn to_f64(self) -> f64;

    /// `false` for NaN/±inf numbers; flags are always finite.
    fn is_finite_value(self) -> bool {
        true
    }
}

impl FieldValue for f64 {
    fn to_f64(self) -> f64 {
        self
    }

    fn is_finite_value(self) -> bool {
        self.is_finite()
    }
}

impl FieldValue for bool {
    fn to_f64(self) -> f64 {
        if self { 1.0 } else { 0.0 }
    }
}

/// Schema of a row type: the ordered list of column names it declares.
///
/// Every name listed here must be produced by exactly one registered formula.
pub trait LineRow: Default + Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Declared column names, in display order.
    const FIELDS: &'static [&'static str];
}

/// Field — named, typed accessor pair for one column of `R`.
///
/// Fields
/// ------
/// - `name`: column name; must appear in `R::FIELDS`.
/// - `get`: reads the column from a row.
/// - `set`: writes the column into a row under construction.
pub struct Field<R, T> {
    pub name: &'static str,
    pub get: fn(&R) -> T,
    pub set: fn(&mut R, T),
}

impl<R, T> Clone for Field<R, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R, T> Copy for Field<R, T> {}

impl<R, T> Debug for Field<R, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field").field("name", &self.name).finish()
    }
}

impl<R, T: FieldValue> Field<R, T> {
    /// Build a field accessor from a name and a getter/setter pair.
    pub fn new(name: &'static str, get: fn(&R) -> T, set: fn(&mut R, T)) -> Self {
        Field { name, get, set }
    }

    /// Read this column from `row`.
    pub fn read(&self, row: &R) -> T {
        (self.get)(row)
    }

    /// Read this column from `row` as `f64`.
    pub fn read_f64(&self, row: &R) -> f64 {
        (self.get)(row).to_f64()
    }

    /// Write `value` into this column of `row`.
    pub fn write(&self, row: &mut R, value: T) {
        (self.set)(row, value)
    }
}

/// Build a [`Field`] for a named struct field.
///
/// ```
/// use rust_projection::row_field;
/// use rust_projection::projection::core::fields::{Field, LineRow};
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Row {
///     balance: f64,
///     closed: bool,
/// }
///
/// impl LineRow for Row {
///     const FIELDS: &'static [&'static str] = &["balance", "closed"];
/// }
///
/// let balance: Field<Row, f64> = row_field!(Row, balance: f64);
/// let mut row = Row::default();
/// balance.write(&mut row, 12.5);
/// assert_eq!(balance.name, "balance");
/// assert_eq!(row.balance, 12.5);
/// ```
#[macro_export]
macro_rules! row_field {
    ($row:ty, $name:ident : $kind:ty) => {
        $crate::projection::core::fields::Field::<$row, $kind>::new(
            stringify!($name),
            |row: &$row| row.$name,
            |row: &mut $row, value: $kind| row.$name = value,
        )
    };
}
