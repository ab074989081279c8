use tokio_postgres::Row;
use tokio_postgres::types::Type;

use crate::error::SqlExecError;
use crate::results::RowSource;
use crate::types::Value;

/// A field converted when the statement ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PgField {
    Value(Value),
    /// Column of a type the value model has no mapping for; reported only if fetched.
    Unsupported(String),
    /// OID column, resolved through the large-object store.
    LargeObject(u32),
}

/// Extract a field of `row`, leaving large objects as OIDs for the caller to read.
///
/// # Errors
/// Returns `SqlExecError::PostgresError` if the column cannot be decoded.
pub(crate) fn extract_field(row: &Row, idx: usize) -> Result<PgField, SqlExecError> {
    let ty = row.columns()[idx].type_();

    let value = match *ty {
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)?
            .map(|b| Value::Integer64(i64::from(b))),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|v| Value::Integer64(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map(|v| Value::Integer64(i64::from(v))),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::Integer64),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            row.try_get::<_, Option<String>>(idx)?.map(Value::Utf8Text)
        }
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Value::BinaryBlob),
        Type::OID => {
            return Ok(row
                .try_get::<_, Option<u32>>(idx)?
                .map_or(PgField::Value(Value::Null), PgField::LargeObject));
        }
        _ => return Ok(PgField::Unsupported(ty.name().to_string())),
    };

    Ok(PgField::Value(value.unwrap_or(Value::Null)))
}

/// Rows of one `PostgreSQL` execution.
#[derive(Debug)]
pub struct PostgresRows {
    fields_count: usize,
    rows: Vec<Vec<PgField>>,
    position: usize,
}

impl PostgresRows {
    pub(crate) fn new(fields_count: usize, rows: Vec<Vec<PgField>>) -> Self {
        Self {
            fields_count,
            rows,
            position: 0,
        }
    }
}

impl RowSource for PostgresRows {
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
        match self.rows.get(self.position).and_then(|row| row.get(index)) {
            None => Ok(None),
            Some(PgField::Value(value)) => Ok(Some(value.clone())),
            Some(PgField::Unsupported(name)) => Err(SqlExecError::NotImplemented(format!(
                "columns of type {name} are not supported"
            ))),
            Some(PgField::LargeObject(oid)) => Err(SqlExecError::Internal(format!(
                "large object {oid} was not read"
            ))),
        }
    }
}
