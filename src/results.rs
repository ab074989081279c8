//! Row cursors over executed statements.
//!
//! Drivers implement [`RowSource`] to hand out raw per-field values; [`ResultCursor`] owns the
//! shared fetch-cache-then-coerce pipeline on top of it.

mod memory;

pub use memory::MemoryRows;

use tracing::error;

use crate::error::SqlExecError;
use crate::types::{Value, ValueType};

/// Driver-side access to the rows produced by one execution.
pub trait RowSource: Send {
    /// Number of columns in every row.
    fn fields_count(&self) -> usize;

    /// Whether the source is positioned past its last row.
    fn is_done(&self) -> bool;

    /// Move to the next row.
    ///
    /// # Errors
    /// Returns `SqlExecError` if the back-end fails while stepping.
    fn advance(&mut self) -> Result<(), SqlExecError>;

    /// Natural value of a field of the current row, or `None` if the back-end produced nothing.
    ///
    /// # Errors
    /// Returns `SqlExecError` if the field cannot be read.
    fn fetch_field(&mut self, index: usize) -> Result<Option<Value>, SqlExecError>;
}

/// Cursor over an executed statement's rows.
///
/// Fields are fetched on demand, at most once per row, and coerced to the expected type
/// declared with [`ResultCursor::set_expected_type`]. NULL fields are never coerced. Once the
/// cursor reports done it stays done.
pub struct ResultCursor {
    source: Box<dyn RowSource>,
    done: bool,
    fields: Vec<Option<Value>>,
    expected: Vec<Option<ValueType>>,
}

impl std::fmt::Debug for ResultCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCursor")
            .field("done", &self.done)
            .field("fields", &self.fields)
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}

impl ResultCursor {
    #[must_use]
    pub fn new(source: Box<dyn RowSource>) -> Self {
        let count = source.fields_count();
        Self {
            done: source.is_done(),
            fields: vec![None; count],
            expected: vec![None; count],
            source,
        }
    }

    /// A cursor with no columns that is already done.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Box::new(MemoryRows::new(0, Vec::new())))
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    #[must_use]
    pub fn fields_count(&self) -> usize {
        self.fields.len()
    }

    /// Advance to the next row.
    ///
    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` if the cursor is already done, or the driver's
    /// error if stepping fails.
    pub fn next(&mut self) -> Result<(), SqlExecError> {
        if self.done {
            return Err(SqlExecError::BadSequenceOfCalls(
                "no more rows in the result".into(),
            ));
        }

        self.fields.iter_mut().for_each(|field| *field = None);
        self.source.advance()?;
        if self.source.is_done() {
            self.done = true;
        }
        Ok(())
    }

    /// Declare the type a field must be coerced to.
    ///
    /// Applies to the current row's already-fetched field as well as to every later row.
    ///
    /// # Errors
    /// Returns `SqlExecError::OutOfRange` for an unknown field, or `SqlExecError::TypeMismatch`
    /// if the buffered field cannot be converted.
    pub fn set_expected_type(&mut self, index: usize, ty: ValueType) -> Result<(), SqlExecError> {
        let Some(slot) = self.expected.get_mut(index) else {
            return Err(field_out_of_range(index));
        };
        *slot = Some(ty);

        if let Some(Some(field)) = self.fields.get_mut(index) {
            coerce(field, ty)?;
        }
        Ok(())
    }

    /// Value of a field of the current row.
    ///
    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` if the cursor is done, `OutOfRange` for an
    /// unknown field, `Internal` if the driver yielded nothing, and `TypeMismatch` if the
    /// expected-type coercion fails.
    pub fn get_field(&mut self, index: usize) -> Result<&Value, SqlExecError> {
        if self.done {
            return Err(SqlExecError::BadSequenceOfCalls(
                "accessing a field of a finished result".into(),
            ));
        }
        if index >= self.fields.len() {
            return Err(field_out_of_range(index));
        }

        if self.fields[index].is_none() {
            let mut value = self.source.fetch_field(index)?.ok_or_else(|| {
                SqlExecError::Internal(format!("the driver yielded no value for field {index}"))
            })?;
            if let Some(ty) = self.expected[index] {
                coerce(&mut value, ty)?;
            }
            self.fields[index] = Some(value);
        }

        self.fields[index]
            .as_ref()
            .ok_or_else(|| SqlExecError::Internal(format!("field {index} was not fetched")))
    }
}

fn coerce(value: &mut Value, target: ValueType) -> Result<(), SqlExecError> {
    if value.is_null() || value.value_type() == target {
        return Ok(());
    }
    match value.convert(target) {
        Ok(converted) => {
            *value = converted;
            Ok(())
        }
        Err(err) => {
            error!("Cannot convert between data types from a database: {err}");
            Err(err)
        }
    }
}

fn field_out_of_range(index: usize) -> SqlExecError {
    SqlExecError::OutOfRange(format!("no field at index {index}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn two_rows() -> ResultCursor {
        ResultCursor::new(Box::new(MemoryRows::new(
            2,
            vec![
                vec![Value::Integer64(1), Value::Utf8Text("10".into())],
                vec![Value::Null, Value::Utf8Text("20".into())],
            ],
        )))
    }

    #[test]
    fn done_latch_never_resets() {
        let mut cursor = two_rows();
        assert!(!cursor.is_done());
        cursor.next().unwrap();
        assert!(!cursor.is_done());
        cursor.next().unwrap();
        assert!(cursor.is_done());

        for _ in 0..3 {
            assert_eq!(cursor.next().unwrap_err().kind(), ErrorKind::BadSequenceOfCalls);
            assert!(cursor.is_done());
        }
        assert_eq!(cursor.get_field(0).unwrap_err().kind(), ErrorKind::BadSequenceOfCalls);
    }

    #[test]
    fn zero_rows_is_done_immediately() {
        let cursor = ResultCursor::new(Box::new(MemoryRows::new(3, Vec::new())));
        assert!(cursor.is_done());
        assert_eq!(cursor.fields_count(), 3);
        assert!(ResultCursor::empty().is_done());
    }

    #[test]
    fn expected_type_applies_retroactively_and_to_later_rows() {
        let mut cursor = two_rows();
        assert_eq!(cursor.get_field(1).unwrap(), &Value::Utf8Text("10".into()));

        cursor.set_expected_type(1, ValueType::Integer64).unwrap();
        assert_eq!(cursor.get_field(1).unwrap(), &Value::Integer64(10));

        cursor.next().unwrap();
        assert_eq!(cursor.get_field(1).unwrap(), &Value::Integer64(20));
    }

    #[test]
    fn null_is_never_coerced() {
        let mut cursor = two_rows();
        cursor.set_expected_type(0, ValueType::Utf8Text).unwrap();
        assert_eq!(cursor.get_field(0).unwrap(), &Value::Utf8Text("1".into()));
        cursor.next().unwrap();
        assert_eq!(cursor.get_field(0).unwrap(), &Value::Null);
    }

    #[test]
    fn failed_coercion_is_a_typed_error() {
        let mut cursor = ResultCursor::new(Box::new(MemoryRows::new(
            1,
            vec![vec![Value::BinaryBlob(vec![1])]],
        )));
        cursor.get_field(0).unwrap();
        assert_eq!(
            cursor
                .set_expected_type(0, ValueType::Integer64)
                .unwrap_err()
                .kind(),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn unknown_field_is_out_of_range() {
        let mut cursor = two_rows();
        assert_eq!(cursor.get_field(2).unwrap_err().kind(), ErrorKind::OutOfRange);
        assert_eq!(
            cursor.set_expected_type(5, ValueType::Null).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
    }

    #[test]
    fn short_row_is_an_internal_error() {
        let mut cursor = ResultCursor::new(Box::new(MemoryRows::new(
            2,
            vec![vec![Value::Integer64(1)]],
        )));
        assert_eq!(cursor.get_field(1).unwrap_err().kind(), ErrorKind::Internal);
    }
}
