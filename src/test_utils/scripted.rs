use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::dictionary::Dictionary;
use crate::error::{ErrorKind, SqlExecError};
use crate::query::Query;
use crate::results::{MemoryRows, RowSource};
use crate::translation::{BindingPlan, DialectFormatter};
use crate::types::{Dialect, Value};

#[derive(Debug, Default)]
struct Script {
    failing_opens: u32,
    unavailable_forever: bool,
    rejected_opens: bool,
    reported_dialect: Option<Dialect>,
    next_failure: Option<ErrorKind>,
    rows: HashMap<String, (usize, Vec<Vec<Value>>)>,
    tables: HashSet<String>,

    open_attempts: u32,
    closed: u32,
    compiled: u32,
    executed: Vec<String>,
    bound: Vec<Vec<Value>>,
    batches: Vec<String>,
    begins: u32,
    commits: u32,
    rollbacks: u32,
}

fn scripted_error(kind: ErrorKind) -> SqlExecError {
    let message = "scripted failure".to_string();
    match kind {
        ErrorKind::Unavailable => SqlExecError::Unavailable(message),
        ErrorKind::Database => SqlExecError::Database(message),
        ErrorKind::BadSequenceOfCalls => SqlExecError::BadSequenceOfCalls(message),
        ErrorKind::TypeMismatch => SqlExecError::TypeMismatch(message),
        ErrorKind::OutOfRange => SqlExecError::OutOfRange(message),
        ErrorKind::InexistentItem => SqlExecError::InexistentItem(message),
        ErrorKind::NotImplemented => SqlExecError::NotImplemented(message),
        ErrorKind::Config => SqlExecError::ConfigError(message),
        ErrorKind::Internal => SqlExecError::Internal(message),
    }
}

/// In-process back-end whose behaviour is scripted by the test and whose traffic is recorded.
///
/// Clones share the same script, so a test keeps one handle while the manager owns another.
/// ```rust
/// use sql_exec_core::prelude::*;
/// use sql_exec_core::test_utils::ScriptedBackend;
///
/// let backend = ScriptedBackend::new(Dialect::Postgres);
/// backend.set_rows("SELECT $1", 1, vec![vec![Value::Integer64(4)]]);
/// let manager = DatabaseManager::new(backend.clone(), ManagerOptions::default());
///
/// let mut statement = manager.cached_statement(statement_here!(), "SELECT ${x}")?;
/// statement.set_parameter_type("x", ValueType::Integer64)?;
/// let mut params = Dictionary::new();
/// params.set_integer("x", 4);
/// statement.execute_with(&params)?;
/// assert_eq!(statement.get_result_field(0)?, Value::Integer64(4));
/// drop(statement);
/// assert_eq!(backend.bound(), vec![vec![Value::Integer64(4)]]);
/// # Ok::<(), SqlExecError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    dialect: Dialect,
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Report the back-end unavailable for the next `count` connection attempts.
    pub fn fail_opens(&self, count: u32) {
        self.script.lock().failing_opens = count;
    }

    /// Report the back-end unavailable on every connection attempt.
    pub fn stay_unavailable(&self) {
        self.script.lock().unavailable_forever = true;
    }

    /// Fail every connection attempt with a permanent (non-retryable) error.
    pub fn reject_opens(&self) {
        self.script.lock().rejected_opens = true;
    }

    /// Make opened connections claim a different dialect than the factory.
    pub fn report_dialect(&self, dialect: Dialect) {
        self.script.lock().reported_dialect = Some(dialect);
    }

    /// Fail the next statement execution, begin, commit or rollback with an error of `kind`.
    pub fn fail_next(&self, kind: ErrorKind) {
        self.script.lock().next_failure = Some(kind);
    }

    /// Rows returned whenever the dialect-specific `sql` is executed.
    pub fn set_rows(&self, sql: &str, fields_count: usize, rows: Vec<Vec<Value>>) {
        self.script
            .lock()
            .rows
            .insert(sql.to_string(), (fields_count, rows));
    }

    pub fn add_table(&self, name: &str) {
        self.script.lock().tables.insert(name.to_string());
    }

    #[must_use]
    pub fn open_attempts(&self) -> u32 {
        self.script.lock().open_attempts
    }

    /// Number of connections that have been closed (dropped).
    #[must_use]
    pub fn closed_connections(&self) -> u32 {
        self.script.lock().closed
    }

    /// Number of statements prepared natively.
    #[must_use]
    pub fn compiled(&self) -> u32 {
        self.script.lock().compiled
    }

    /// Dialect-specific SQL of every successful execution, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.script.lock().executed.clone()
    }

    /// Positional arguments of every successful execution, in order.
    #[must_use]
    pub fn bound(&self) -> Vec<Vec<Value>> {
        self.script.lock().bound.clone()
    }

    #[must_use]
    pub fn batches(&self) -> Vec<String> {
        self.script.lock().batches.clone()
    }

    #[must_use]
    pub fn begins(&self) -> u32 {
        self.script.lock().begins
    }

    #[must_use]
    pub fn commits(&self) -> u32 {
        self.script.lock().commits
    }

    #[must_use]
    pub fn rollbacks(&self) -> u32 {
        self.script.lock().rollbacks
    }

    /// Open a scripted connection.
    ///
    /// # Errors
    /// Returns `SqlExecError::Unavailable` while opens are scripted to fail, or
    /// `SqlExecError::Database` when opens are rejected.
    pub fn open(&self) -> Result<ScriptedDatabase, SqlExecError> {
        let mut script = self.script.lock();
        script.open_attempts += 1;

        if script.rejected_opens {
            return Err(SqlExecError::Database("scripted open rejection".into()));
        }
        if script.unavailable_forever {
            return Err(scripted_error(ErrorKind::Unavailable));
        }
        if script.failing_opens > 0 {
            script.failing_opens -= 1;
            return Err(scripted_error(ErrorKind::Unavailable));
        }

        Ok(ScriptedDatabase {
            dialect: script.reported_dialect.unwrap_or(self.dialect),
            script: Arc::clone(&self.script),
        })
    }
}

/// Connection produced by a [`ScriptedBackend`].
#[derive(Debug)]
pub struct ScriptedDatabase {
    dialect: Dialect,
    script: Arc<Mutex<Script>>,
}

/// Statement compiled by a [`ScriptedDatabase`].
#[derive(Debug)]
pub struct ScriptedStatement {
    sql: String,
    plan: BindingPlan,
    read_only: bool,
}

impl ScriptedStatement {
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl ScriptedDatabase {
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn take_failure(&self) -> Result<(), SqlExecError> {
        match self.script.lock().next_failure.take() {
            Some(kind) => Err(scripted_error(kind)),
            None => Ok(()),
        }
    }

    /// # Errors
    /// Returns `SqlExecError` if the template cannot be formatted.
    pub fn compile(&mut self, query: &Query) -> Result<ScriptedStatement, SqlExecError> {
        let mut formatter = DialectFormatter::new(self.dialect);
        let sql = query.format(&mut formatter)?;
        self.script.lock().compiled += 1;
        Ok(ScriptedStatement {
            sql,
            plan: formatter.into_binding_plan(),
            read_only: query.is_read_only(),
        })
    }

    fn run(
        &mut self,
        statement: &ScriptedStatement,
        parameters: &Dictionary,
    ) -> Result<MemoryRows, SqlExecError> {
        self.take_failure()?;
        let arguments = statement.plan.collect(parameters)?;

        let mut script = self.script.lock();
        script.executed.push(statement.sql.clone());
        script.bound.push(arguments);
        let (fields_count, rows) = script
            .rows
            .get(&statement.sql)
            .cloned()
            .unwrap_or_default();
        Ok(MemoryRows::new(fields_count, rows))
    }

    /// # Errors
    /// Returns a scripted failure or a binding error.
    pub fn execute(
        &mut self,
        statement: &ScriptedStatement,
        parameters: &Dictionary,
    ) -> Result<Box<dyn RowSource>, SqlExecError> {
        Ok(Box::new(self.run(statement, parameters)?))
    }

    /// # Errors
    /// Returns a scripted failure or a binding error.
    pub fn execute_without_result(
        &mut self,
        statement: &ScriptedStatement,
        parameters: &Dictionary,
    ) -> Result<(), SqlExecError> {
        self.run(statement, parameters).map(|_| ())
    }

    /// # Errors
    /// Returns a scripted failure.
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), SqlExecError> {
        self.take_failure()?;
        self.script.lock().batches.push(sql.to_string());
        Ok(())
    }

    /// # Errors
    /// Returns a scripted failure.
    pub fn does_table_exist(&mut self, name: &str) -> Result<bool, SqlExecError> {
        self.take_failure()?;
        Ok(self.script.lock().tables.contains(name))
    }

    /// # Errors
    /// Returns a scripted failure.
    pub fn begin(&mut self) -> Result<(), SqlExecError> {
        self.take_failure()?;
        self.script.lock().begins += 1;
        Ok(())
    }

    /// # Errors
    /// Returns a scripted failure.
    pub fn commit(&mut self) -> Result<(), SqlExecError> {
        self.take_failure()?;
        self.script.lock().commits += 1;
        Ok(())
    }

    /// # Errors
    /// Returns a scripted failure.
    pub fn rollback(&mut self) -> Result<(), SqlExecError> {
        self.take_failure()?;
        self.script.lock().rollbacks += 1;
        Ok(())
    }
}

impl Drop for ScriptedDatabase {
    fn drop(&mut self) {
        self.script.lock().closed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_failures_are_consumed_in_order() {
        let backend = ScriptedBackend::new(Dialect::Sqlite);
        backend.fail_opens(2);
        assert!(backend.open().unwrap_err().is_unavailable());
        assert!(backend.open().unwrap_err().is_unavailable());
        assert!(backend.open().is_ok());
        assert_eq!(backend.open_attempts(), 3);
        assert_eq!(backend.closed_connections(), 1);
    }

    #[test]
    fn records_bound_arguments() {
        let backend = ScriptedBackend::new(Dialect::Sqlite);
        let mut db = backend.open().unwrap();
        let mut query = Query::new("UPDATE t SET v=${v}", false);
        query
            .set_type("v", crate::types::ValueType::Utf8Text)
            .unwrap();
        let statement = db.compile(&query).unwrap();
        assert_eq!(statement.sql(), "UPDATE t SET v=?");

        let mut params = Dictionary::new();
        params.set_utf8("v", "x");
        db.execute_without_result(&statement, &params).unwrap();
        assert_eq!(backend.bound(), vec![vec![Value::Utf8Text("x".into())]]);
    }
}
