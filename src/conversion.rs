//! Conversions between value tags.
//!
//! The matrix is closed: every (source, target) pair either always converts or always fails
//! with [`SqlExecError::TypeMismatch`]. Identity conversions always succeed.

use crate::error::SqlExecError;
use crate::types::{Value, ValueType};

impl Value {
    /// Produce a new value of the `target` tag.
    ///
    /// | source        | accepted targets                                  |
    /// |---------------|---------------------------------------------------|
    /// | `Null`        | `Null`                                            |
    /// | `Integer64`   | `Null`, `Utf8Text`, `BinaryBlob`, `LargeObject`   |
    /// | `Utf8Text`    | `Null`, `Integer64`, `BinaryBlob`, `LargeObject`  |
    /// | `BinaryBlob`  | `Null`, `BinaryBlob`                              |
    /// | `LargeObject` | `Null`, `BinaryBlob`                              |
    ///
    /// Integers are rendered in decimal. Text is parsed as a decimal `i64`; non-numeric or
    /// out-of-range text fails rather than truncating.
    ///
    /// # Errors
    /// Returns `SqlExecError::TypeMismatch` when the pair is outside the matrix or the text cannot
    /// be parsed.
    pub fn convert(&self, target: ValueType) -> Result<Value, SqlExecError> {
        if self.value_type() == target {
            return Ok(self.clone());
        }

        match (self, target) {
            (_, ValueType::Null) => Ok(Value::Null),
            (Value::Integer64(i), _) => Ok(text_as(i.to_string(), target)),
            (Value::Utf8Text(text), ValueType::Integer64) => {
                text.parse::<i64>().map(Value::Integer64).map_err(|e| {
                    SqlExecError::TypeMismatch(format!(
                        "cannot parse {text:?} as a 64-bit integer: {e}"
                    ))
                })
            }
            (Value::Utf8Text(text), _) => Ok(text_as(text.clone(), target)),
            (Value::LargeObject(bytes), ValueType::BinaryBlob) => {
                Ok(Value::BinaryBlob(bytes.clone()))
            }
            _ => Err(SqlExecError::TypeMismatch(format!(
                "cannot convert {:?} to {target:?}",
                self.value_type()
            ))),
        }
    }

    /// Human-readable rendering for logs.
    ///
    /// Never splice this into SQL text; values always travel as bound parameters.
    #[must_use]
    pub fn format(&self) -> String {
        match self {
            Value::Null => "(null)".to_string(),
            Value::Integer64(i) => i.to_string(),
            Value::Utf8Text(text) => text.clone(),
            Value::BinaryBlob(bytes) => format!("(binary - {} bytes)", bytes.len()),
            Value::LargeObject(bytes) => format!("(file - {} bytes)", bytes.len()),
        }
    }
}

// Only reached for Utf8Text, BinaryBlob and LargeObject targets.
fn text_as(text: String, target: ValueType) -> Value {
    match target {
        ValueType::BinaryBlob => Value::BinaryBlob(text.into_bytes()),
        ValueType::LargeObject => Value::LargeObject(text.into_bytes()),
        _ => Value::Utf8Text(text),
    }
}
