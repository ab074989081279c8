use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Tag of a [`Value`]; also used to declare parameter and result column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Null,
    Integer64,
    Utf8Text,
    BinaryBlob,
    /// Binary payload stored through the back-end's large-object facility.
    LargeObject,
}

/// Values that can be bound as statement parameters or read back from result fields.
///
/// A value never changes tag; [`Value::convert`] always produces a new value.
/// ```rust
/// use sql_exec_core::prelude::*;
///
/// let id = Value::Integer64(42);
/// assert_eq!(id.convert(ValueType::Utf8Text)?, Value::Utf8Text("42".into()));
/// # Ok::<(), SqlExecError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// NULL value
    Null,
    /// Integer value (64-bit)
    Integer64(i64),
    /// Text value
    Utf8Text(String),
    /// Opaque binary data
    BinaryBlob(Vec<u8>),
    /// Binary data with large-object semantics
    LargeObject(Vec<u8>),
}

impl Value {
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Integer64(_) => ValueType::Integer64,
            Value::Utf8Text(_) => ValueType::Utf8Text,
            Value::BinaryBlob(_) => ValueType::BinaryBlob,
            Value::LargeObject(_) => ValueType::LargeObject,
        }
    }

    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer64(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let Value::Utf8Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Payload of a binary value, whether blob or large object.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::BinaryBlob(bytes) | Value::LargeObject(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Utf8Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Utf8Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::BinaryBlob(value)
    }
}

/// SQL dialect of a back-end.
///
/// Callers needing dialect-specific SQL fragments can branch on it; the core itself only hides
/// parameter binding and basic typed I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum Dialect {
    /// `PostgreSQL`: numbered `$n` placeholders, `DEFAULT` insert literal
    Postgres,
    /// `MySQL`: `?` placeholders, `NULL` insert literal
    MySql,
    /// `SQLite`: `?` placeholders, `NULL` insert literal
    Sqlite,
}
