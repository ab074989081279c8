use crate::dictionary::Dictionary;
use crate::error::SqlExecError;
use crate::types::{Dialect, Value, ValueType};

/// Placeholder syntax emitted for bound parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`, numbered across the whole statement.
    Numbered,
    /// A single `?` marker for every position (`MySQL`, `SQLite`).
    Anonymous,
}

impl Dialect {
    #[must_use]
    pub fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            Dialect::Postgres => PlaceholderStyle::Numbered,
            Dialect::MySql | Dialect::Sqlite => PlaceholderStyle::Anonymous,
        }
    }

    /// SQL literal rendered for an empty `${}` slot, i.e. "use the column default" in an INSERT.
    #[must_use]
    pub fn default_literal(self) -> &'static str {
        match self {
            Dialect::Postgres => "DEFAULT",
            Dialect::MySql | Dialect::Sqlite => "NULL",
        }
    }
}

/// Renders the text of one parameter occurrence while a [`Query`](crate::query::Query) is
/// formatted.
pub trait ParameterFormatter {
    /// Return the SQL text replacing the occurrence of `name` declared as `ty`.
    ///
    /// # Errors
    /// Returns `SqlExecError` if the formatter cannot render the slot.
    fn format(&mut self, name: &str, ty: ValueType) -> Result<String, SqlExecError>;
}

/// Formatter shared by all dialects.
///
/// Every occurrence consumes one positional slot, so a name repeated in the template is bound
/// once per occurrence. An empty name renders the dialect's default literal and takes no slot.
/// ```rust
/// use sql_exec_core::prelude::*;
///
/// let query = Query::new("INSERT INTO t VALUES(${}, ${a}, ${a})", false);
/// let mut formatter = DialectFormatter::new(Dialect::Postgres);
/// assert_eq!(query.format(&mut formatter)?, "INSERT INTO t VALUES(DEFAULT, $1, $2)");
/// assert_eq!(formatter.parameters_count(), 2);
/// # Ok::<(), SqlExecError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DialectFormatter {
    dialect: Dialect,
    parameters: Vec<(String, ValueType)>,
}

impl DialectFormatter {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn parameters_count(&self) -> usize {
        self.parameters.len()
    }

    /// # Errors
    /// Returns `SqlExecError::OutOfRange` past the last slot.
    pub fn parameter_name(&self, index: usize) -> Result<&str, SqlExecError> {
        self.parameters
            .get(index)
            .map(|(name, _)| name.as_str())
            .ok_or_else(|| out_of_range(index))
    }

    /// # Errors
    /// Returns `SqlExecError::OutOfRange` past the last slot.
    pub fn parameter_type(&self, index: usize) -> Result<ValueType, SqlExecError> {
        self.parameters
            .get(index)
            .map(|(_, ty)| *ty)
            .ok_or_else(|| out_of_range(index))
    }

    /// Consume the formatter, keeping the positional slots for binding.
    #[must_use]
    pub fn into_binding_plan(self) -> BindingPlan {
        BindingPlan {
            slots: self.parameters,
        }
    }
}

impl ParameterFormatter for DialectFormatter {
    fn format(&mut self, name: &str, ty: ValueType) -> Result<String, SqlExecError> {
        if name.is_empty() {
            return Ok(self.dialect.default_literal().to_string());
        }

        let placeholder = match self.dialect.placeholder_style() {
            PlaceholderStyle::Numbered => format!("${}", self.parameters.len() + 1),
            PlaceholderStyle::Anonymous => "?".to_string(),
        };
        self.parameters.push((name.to_string(), ty));
        Ok(placeholder)
    }
}

fn out_of_range(index: usize) -> SqlExecError {
    SqlExecError::OutOfRange(format!("no parameter slot at position {index}"))
}

/// Ordered (name, declared type) slots of a compiled statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingPlan {
    slots: Vec<(String, ValueType)>,
}

impl BindingPlan {
    pub fn slots(&self) -> impl Iterator<Item = (&str, ValueType)> {
        self.slots.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Resolve the positional argument list from a dictionary.
    ///
    /// A slot declared `Null` binds NULL, whether or not the dictionary has the key. A `Null`
    /// value is accepted for any declared type.
    ///
    /// # Errors
    /// Returns `SqlExecError::InexistentItem` for a missing key and `SqlExecError::TypeMismatch`
    /// when the value's tag differs from the declared type, including a non-NULL value bound
    /// to a slot that was never given a type.
    pub fn collect(&self, parameters: &Dictionary) -> Result<Vec<Value>, SqlExecError> {
        let mut values = Vec::with_capacity(self.slots.len());
        for (name, declared) in &self.slots {
            if *declared == ValueType::Null {
                if let Ok(value) = parameters.get(name) {
                    if !value.is_null() {
                        return Err(SqlExecError::TypeMismatch(format!(
                            "parameter {name:?} has no declared type but is bound as {:?}",
                            value.value_type()
                        )));
                    }
                }
                values.push(Value::Null);
                continue;
            }

            let value = parameters.get(name)?;
            if !value.is_null() && value.value_type() != *declared {
                return Err(SqlExecError::TypeMismatch(format!(
                    "parameter {name:?} is declared {declared:?} but bound as {:?}",
                    value.value_type()
                )));
            }
            values.push(value.clone());
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::query::Query;

    fn typed_query() -> Query {
        let mut query = Query::new("SELECT ${a} FROM t WHERE x=${b} AND y=${a}", true);
        query.set_type("a", ValueType::Integer64).unwrap();
        query.set_type("b", ValueType::Utf8Text).unwrap();
        query
    }

    #[test]
    fn numbered_placeholders_count_every_occurrence() {
        let mut formatter = DialectFormatter::new(Dialect::Postgres);
        let sql = typed_query().format(&mut formatter).unwrap();
        assert_eq!(sql, "SELECT $1 FROM t WHERE x=$2 AND y=$3");
        assert_eq!(formatter.parameters_count(), 3);
        assert_eq!(formatter.parameter_name(2).unwrap(), "a");
        assert_eq!(formatter.parameter_type(1).unwrap(), ValueType::Utf8Text);
        assert_eq!(formatter.parameter_name(3).unwrap_err().kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn anonymous_markers_for_sqlite_and_mysql() {
        for dialect in [Dialect::Sqlite, Dialect::MySql] {
            let mut formatter = DialectFormatter::new(dialect);
            let sql = typed_query().format(&mut formatter).unwrap();
            assert_eq!(sql, "SELECT ? FROM t WHERE x=? AND y=?");
        }
    }

    #[test]
    fn empty_slot_renders_dialect_default() {
        let query = Query::new("INSERT INTO t VALUES(${}, ${v})", false);

        let mut pg = DialectFormatter::new(Dialect::Postgres);
        assert_eq!(query.format(&mut pg).unwrap(), "INSERT INTO t VALUES(DEFAULT, $1)");

        let mut lite = DialectFormatter::new(Dialect::Sqlite);
        assert_eq!(query.format(&mut lite).unwrap(), "INSERT INTO t VALUES(NULL, ?)");
        assert_eq!(lite.parameters_count(), 1);
    }

    #[test]
    fn binding_plan_repeats_values_per_occurrence() {
        let mut formatter = DialectFormatter::new(Dialect::Sqlite);
        typed_query().format(&mut formatter).unwrap();
        let plan = formatter.into_binding_plan();

        let mut params = Dictionary::new();
        params.set_integer("a", 1);
        params.set_utf8("b", "two");
        assert_eq!(
            plan.collect(&params).unwrap(),
            vec![
                Value::Integer64(1),
                Value::Utf8Text("two".into()),
                Value::Integer64(1)
            ]
        );
    }

    #[test]
    fn binding_plan_rejects_missing_and_mistyped_values() {
        let mut formatter = DialectFormatter::new(Dialect::Sqlite);
        typed_query().format(&mut formatter).unwrap();
        let plan = formatter.into_binding_plan();

        let mut params = Dictionary::new();
        params.set_integer("a", 1);
        assert_eq!(plan.collect(&params).unwrap_err().kind(), ErrorKind::InexistentItem);

        params.set_integer("b", 2);
        assert_eq!(plan.collect(&params).unwrap_err().kind(), ErrorKind::TypeMismatch);

        params.set_null("b");
        assert_eq!(plan.collect(&params).unwrap()[1], Value::Null);
    }

    #[test]
    fn undeclared_slot_rejects_a_real_value() {
        let query = Query::new("INSERT INTO t VALUES(${v})", false);
        let mut formatter = DialectFormatter::new(Dialect::Sqlite);
        query.format(&mut formatter).unwrap();
        let plan = formatter.into_binding_plan();

        let mut params = Dictionary::new();
        params.set_integer("v", 42);
        assert_eq!(plan.collect(&params).unwrap_err().kind(), ErrorKind::TypeMismatch);

        params.set_null("v");
        assert_eq!(plan.collect(&params).unwrap(), vec![Value::Null]);
    }

    #[test]
    fn undeclared_slot_binds_null() {
        let query = Query::new("SELECT ${x}", true);
        let mut formatter = DialectFormatter::new(Dialect::Sqlite);
        query.format(&mut formatter).unwrap();
        let plan = formatter.into_binding_plan();
        assert_eq!(plan.collect(&Dictionary::new()).unwrap(), vec![Value::Null]);
    }
}
