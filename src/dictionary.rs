use std::collections::HashMap;

use tracing::error;

use crate::error::SqlExecError;
use crate::types::Value;

/// Named parameters supplied for one statement execution.
///
/// Keys are unique; setting an existing key replaces (and drops) the previous value.
/// ```rust
/// use sql_exec_core::prelude::*;
///
/// let mut params = Dictionary::new();
/// params.set_integer("id", 7);
/// params.set_utf8("name", "alice");
/// assert_eq!(params.get("id")?, &Value::Integer64(7));
/// # Ok::<(), SqlExecError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    values: HashMap<String, Value>,
}

impl Dictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn set_utf8(&mut self, key: impl Into<String>, utf8: impl Into<String>) {
        self.set_value(key, Value::Utf8Text(utf8.into()));
    }

    pub fn set_binary(&mut self, key: impl Into<String>, binary: impl Into<Vec<u8>>) {
        self.set_value(key, Value::BinaryBlob(binary.into()));
    }

    /// Bind a payload destined for the back-end's large-object store.
    pub fn set_file(&mut self, key: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.set_value(key, Value::LargeObject(content.into()));
    }

    pub fn set_integer(&mut self, key: impl Into<String>, value: i64) {
        self.set_value(key, Value::Integer64(value));
    }

    pub fn set_null(&mut self, key: impl Into<String>) {
        self.set_value(key, Value::Null);
    }

    /// Look up a value by key.
    ///
    /// # Errors
    /// Returns `SqlExecError::InexistentItem` if the key was never set.
    pub fn get(&self, key: &str) -> Result<&Value, SqlExecError> {
        self.values.get(key).ok_or_else(|| {
            error!("Inexistent value in a dictionary: {key}");
            SqlExecError::InexistentItem(format!("no value for parameter {key:?}"))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn setting_a_key_twice_replaces_the_value() {
        let mut dict = Dictionary::new();
        dict.set_utf8("a", "first");
        dict.set_integer("a", 2);
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get("a").unwrap(), &Value::Integer64(2));
    }

    #[test]
    fn missing_key_is_inexistent_item() {
        let mut dict = Dictionary::new();
        dict.set_null("present");
        dict.remove("present");
        assert!(dict.is_empty());
        assert_eq!(dict.get("present").unwrap_err().kind(), ErrorKind::InexistentItem);
    }

    #[test]
    fn typed_setters_pick_the_right_tag() {
        let mut dict = Dictionary::new();
        dict.set_binary("b", vec![1u8, 2]);
        dict.set_file("f", b"abc".to_vec());
        assert_eq!(dict.get("b").unwrap(), &Value::BinaryBlob(vec![1, 2]));
        assert_eq!(dict.get("f").unwrap(), &Value::LargeObject(b"abc".to_vec()));
        assert!(dict.has_key("f"));
        assert_eq!(dict.iter().count(), 2);
    }
}
