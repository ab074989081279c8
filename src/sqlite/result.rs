use rusqlite::types::Value as SqliteValue;

use crate::error::SqlExecError;
use crate::results::RowSource;
use crate::types::Value;

/// Rows of one `SQLite` execution, stepped to completion when the statement ran.
#[derive(Debug)]
pub struct SqliteRows {
    fields_count: usize,
    rows: Vec<Vec<SqliteValue>>,
    position: usize,
}

impl SqliteRows {
    pub(crate) fn new(fields_count: usize, rows: Vec<Vec<SqliteValue>>) -> Self {
        Self {
            fields_count,
            rows,
            position: 0,
        }
    }
}

fn from_sqlite_value(value: &SqliteValue) -> Result<Value, SqlExecError> {
    match value {
        SqliteValue::Null => Ok(Value::Null),
        SqliteValue::Integer(i) => Ok(Value::Integer64(*i)),
        SqliteValue::Text(s) => Ok(Value::Utf8Text(s.clone())),
        SqliteValue::Blob(bytes) => Ok(Value::BinaryBlob(bytes.clone())),
        SqliteValue::Real(_) => Err(SqlExecError::NotImplemented(
            "floating-point columns are not supported".into(),
        )),
    }
}

impl RowSource for SqliteRows {
    fn fields_count(&self) -> usize {
        self.fields_count
    }

    fn is_done(&self) -> bool {
        self.position >= self.rows.len()
    }

    fn advance(&mut self) -> Result<(), SqlExecError> {
        if self.position < self.rows.len() {
            self.position += 1;
        }
        Ok(())
    }

    fn fetch_field(&mut self, index: usize) -> Result<Option<Value>, SqlExecError> {
        self.rows
            .get(self.position)
            .and_then(|row| row.get(index))
            .map(from_sqlite_value)
            .transpose()
    }
}
