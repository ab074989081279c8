use rusqlite::types::Value as SqliteValue;

use crate::types::Value;

/// Convert a bound value to its rusqlite representation.
///
/// `SQLite` has no large-object store, so large objects are stored inline as blobs.
#[must_use]
pub fn to_sqlite_value(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Integer64(i) => SqliteValue::Integer(*i),
        Value::Utf8Text(s) => SqliteValue::Text(s.clone()),
        Value::BinaryBlob(bytes) | Value::LargeObject(bytes) => SqliteValue::Blob(bytes.clone()),
    }
}

/// Unified `SQLite` parameter container.
pub struct Params(pub Vec<SqliteValue>);

impl Params {
    #[must_use]
    pub fn convert(values: &[Value]) -> Self {
        Params(values.iter().map(to_sqlite_value).collect())
    }

    /// Build a borrowed params slice suitable for rusqlite execution.
    #[must_use]
    pub fn as_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.0.iter().map(|v| v as &dyn rusqlite::ToSql).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_objects_bind_as_blobs() {
        let params = Params::convert(&[
            Value::Null,
            Value::Integer64(-3),
            Value::Utf8Text("é".into()),
            Value::LargeObject(vec![1, 2]),
        ]);
        assert_eq!(
            params.0,
            vec![
                SqliteValue::Null,
                SqliteValue::Integer(-3),
                SqliteValue::Text("é".into()),
                SqliteValue::Blob(vec![1, 2]),
            ]
        );
        assert_eq!(params.as_refs().len(), 4);
    }
}
