//! Connection and statement manager.
//!
//! [`DatabaseManager`] owns the physical connection, the per-call-site statement cache and the
//! current transaction. Every operation runs under one recursive lock, so a thread holding a
//! [`CachedStatement`] may still call back into the manager.

mod cached_statement;

pub use cached_statement::CachedStatement;

use std::cell::RefCell;
use std::collections::HashMap;
use std::thread;

use parking_lot::ReentrantMutex;
use tracing::{error, info, trace, warn};

use crate::config::ManagerOptions;
use crate::driver::{Connection, ConnectionFactory, PrecompiledStatement};
use crate::error::SqlExecError;
use crate::location::StatementLocation;
use crate::query::Query;
use crate::transaction::{
    ExplicitTransaction, ImplicitTransaction, Transaction, TransactionState,
};
use crate::types::Dialect;

/// The transaction occupying the manager's single slot, tagged so handles can tell whether
/// the one they joined is still current.
#[derive(Debug)]
struct ActiveTransaction {
    id: u64,
    transaction: Transaction,
}

#[derive(Debug, Default)]
struct ManagerState {
    connection: Option<Connection>,
    statements: HashMap<StatementLocation, PrecompiledStatement>,
    transaction: Option<ActiveTransaction>,
    next_transaction_id: u64,
}

impl ManagerState {
    fn install(&mut self, transaction: Transaction) -> u64 {
        self.next_transaction_id += 1;
        let id = self.next_transaction_id;
        self.transaction = Some(ActiveTransaction { id, transaction });
        id
    }

    /// Roll back or drop the transaction, free every cached statement, then close the
    /// connection.
    fn close(&mut self) {
        if self.connection.is_none() && self.transaction.is_none() && self.statements.is_empty()
        {
            return;
        }

        trace!("Closing the connection to the database");
        if let Some(mut active) = self.transaction.take() {
            active.transaction.abandon(self.connection.as_mut());
        }
        self.statements.clear();
        self.connection = None;
        trace!("Connection to the database is closed");
    }

    /// Tear everything down if `err` means the connection is gone; otherwise leave state alone.
    fn close_if_unavailable(&mut self, err: &SqlExecError) {
        if err.is_unavailable() {
            error!("The database is not available, closing the connection");
            if let Some(mut active) = self.transaction.take() {
                active.transaction.abandon(None);
            }
            self.close();
        }
    }

    /// The connection backing an existing transaction.
    fn connection_mut(&mut self) -> Result<&mut Connection, SqlExecError> {
        self.connection
            .as_mut()
            .ok_or_else(|| SqlExecError::Internal("transaction without a connection".into()))
    }
}

/// Serialised access to one database through one connection.
///
/// ```rust
/// use sql_exec_core::prelude::*;
///
/// let manager = DatabaseManager::new(SqliteOptions::in_memory(), ManagerOptions::default());
/// manager.execute_batch("CREATE TABLE people(id INTEGER, name TEXT)")?;
///
/// manager.start_transaction()?;
/// {
///     let mut insert = manager.cached_statement(
///         statement_here!(),
///         "INSERT INTO people VALUES(${id}, ${name})",
///     )?;
///     insert.set_parameter_type("id", ValueType::Integer64)?;
///     insert.set_parameter_type("name", ValueType::Utf8Text)?;
///
///     let mut params = Dictionary::new();
///     params.set_integer("id", 1);
///     params.set_utf8("name", "alice");
///     insert.execute_with(&params)?;
/// }
/// manager.commit_transaction()?;
///
/// let mut count = manager.cached_statement(statement_here!(), "SELECT COUNT(*) FROM people")?;
/// count.set_read_only(true);
/// count.execute()?;
/// assert_eq!(count.get_result_field(0)?, Value::Integer64(1));
/// # Ok::<(), SqlExecError>(())
/// ```
pub struct DatabaseManager {
    factory: ConnectionFactory,
    dialect: Dialect,
    options: ManagerOptions,
    state: ReentrantMutex<RefCell<ManagerState>>,
}

impl std::fmt::Debug for DatabaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseManager")
            .field("factory", &self.factory)
            .field("dialect", &self.dialect)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DatabaseManager {
    /// Create a manager. No connection is opened until first use.
    #[must_use]
    pub fn new(factory: impl Into<ConnectionFactory>, options: ManagerOptions) -> Self {
        let factory = factory.into();
        Self {
            dialect: factory.dialect(),
            factory,
            options,
            state: ReentrantMutex::new(RefCell::new(ManagerState::default())),
        }
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// Open the connection now instead of on first use.
    ///
    /// # Errors
    /// Returns the last connection error once the retry budget is exhausted, or any
    /// non-transient error immediately.
    pub fn open(&self) -> Result<(), SqlExecError> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        self.ensure_connected(&mut state)
    }

    /// Drop the transaction (rolling back an explicit one), free every cached statement and
    /// close the connection. Safe to call repeatedly.
    pub fn close(&self) {
        let guard = self.state.lock();
        let Ok(mut state) = guard.try_borrow_mut() else {
            error!("Cannot close the database while one of its statements is in use");
            return;
        };
        state.close();
    }

    fn ensure_connected(&self, state: &mut ManagerState) -> Result<(), SqlExecError> {
        if state.connection.is_some() {
            return Ok(());
        }

        state.transaction = None;
        state.connection = Some(self.connect_with_retry()?);
        Ok(())
    }

    fn connect_with_retry(&self) -> Result<Connection, SqlExecError> {
        let retries = self.options.connection_retries;
        let mut failures = 0;

        loop {
            match self.factory.open() {
                Ok(connection) => {
                    if connection.dialect() != self.dialect {
                        return Err(SqlExecError::Internal(format!(
                            "connection speaks {:?}, expected {:?}",
                            connection.dialect(),
                            self.dialect
                        )));
                    }
                    return Ok(connection);
                }
                Err(err) if err.is_unavailable() => {
                    failures += 1;
                    if failures > retries {
                        error!("Timeout when connecting to the database, giving up");
                        return Err(err);
                    }
                    warn!(
                        attempt = failures,
                        retries, "Database is currently unavailable, retrying..."
                    );
                    thread::sleep(self.options.retry_delay());
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Join the current transaction, opening an implicit one if there is none.
    ///
    /// Returns the transaction id and whether it was created for the caller.
    fn join_transaction(&self, state: &mut ManagerState) -> Result<(u64, bool), SqlExecError> {
        if let Some(active) = &state.transaction {
            return Ok((active.id, false));
        }

        if let Err(err) = self.ensure_connected(state) {
            state.close_if_unavailable(&err);
            return Err(err);
        }
        trace!("Automatically creating a database transaction");
        let id = state.install(Transaction::Implicit(ImplicitTransaction::new(
            self.options.implicit_policy,
        )));
        Ok((id, true))
    }

    /// Start an explicit transaction.
    ///
    /// An implicit transaction still attached to the manager is committed first (or simply
    /// discarded if it never ran its statement).
    ///
    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` if an explicit transaction is already open,
    /// or the connection or BEGIN error.
    pub fn start_transaction(&self) -> Result<(), SqlExecError> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();

        if let Some(active) = state.transaction.as_mut() {
            match &mut active.transaction {
                Transaction::Explicit(_) => {
                    error!("Cannot start a transaction while another one is open");
                    return Err(SqlExecError::BadSequenceOfCalls(
                        "an explicit transaction is already open".into(),
                    ));
                }
                Transaction::Implicit(implicit) => {
                    if implicit.state() == TransactionState::Executed {
                        info!("Committing an uncommitted transaction to start another transaction");
                        implicit.commit()?;
                    } else {
                        trace!("Discarding an unused implicit transaction");
                    }
                }
            }
            state.transaction = None;
        }

        let begun = self.ensure_connected(&mut state).and_then(|()| {
            let connection = state.connection_mut()?;
            ExplicitTransaction::begin(connection)
        });
        match begun {
            Ok(explicit) => {
                state.install(Transaction::Explicit(explicit));
                Ok(())
            }
            Err(err) => {
                state.close_if_unavailable(&err);
                Err(err)
            }
        }
    }

    /// Commit the current transaction and release the slot.
    ///
    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` if there is no transaction, or the commit
    /// error (the transaction stays attached unless the connection was lost).
    pub fn commit_transaction(&self) -> Result<(), SqlExecError> {
        self.finish_transaction("commit", |transaction, connection| {
            transaction.commit(connection)
        })
    }

    /// Roll back the current transaction and release the slot.
    ///
    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` if there is no transaction or it is
    /// implicit, or the rollback error.
    pub fn rollback_transaction(&self) -> Result<(), SqlExecError> {
        self.finish_transaction("rollback", |transaction, connection| {
            transaction.rollback(connection)
        })
    }

    fn finish_transaction(
        &self,
        action: &str,
        finish: impl FnOnce(&mut Transaction, &mut Connection) -> Result<(), SqlExecError>,
    ) -> Result<(), SqlExecError> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        let state = &mut *state;

        let Some(active) = state.transaction.as_mut() else {
            error!("Cannot {action} a non-existing transaction");
            return Err(SqlExecError::BadSequenceOfCalls(format!(
                "no transaction to {action}"
            )));
        };

        let outcome = match state.connection.as_mut() {
            Some(connection) => finish(&mut active.transaction, connection),
            None => Err(SqlExecError::Internal("transaction without a connection".into())),
        };
        match outcome {
            Ok(()) => {
                state.transaction = None;
                Ok(())
            }
            Err(err) => {
                state.close_if_unavailable(&err);
                Err(err)
            }
        }
    }

    /// Whether the current transaction has only run read-only statements; `None` without a
    /// transaction.
    #[must_use]
    pub fn is_transaction_read_only(&self) -> Option<bool> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state
            .transaction
            .as_ref()
            .map(|active| active.transaction.is_read_only())
    }

    #[must_use]
    pub fn has_active_transaction(&self) -> bool {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.transaction.is_some()
    }

    #[must_use]
    pub fn cached_statements_count(&self) -> usize {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.statements.len()
    }

    fn with_connection<T>(
        &self,
        operation: impl FnOnce(&mut Connection) -> Result<T, SqlExecError>,
    ) -> Result<T, SqlExecError> {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();

        let outcome = self
            .ensure_connected(&mut state)
            .and_then(|()| operation(state.connection_mut()?));
        if let Err(err) = &outcome {
            state.close_if_unavailable(err);
        }
        outcome
    }

    /// Run raw SQL, e.g. a schema script, inside whatever transaction is current.
    ///
    /// # Errors
    /// Returns the connection error or the back-end's error.
    pub fn execute_batch(&self, sql: &str) -> Result<(), SqlExecError> {
        self.with_connection(|connection| connection.execute_batch(sql))
    }

    /// # Errors
    /// Returns the connection error or the back-end's error.
    pub fn does_table_exist(&self, name: &str) -> Result<bool, SqlExecError> {
        self.with_connection(|connection| connection.does_table_exist(name))
    }

    /// Bind a handle to the statement cached for `location`, compiling `sql` on first use.
    ///
    /// The handle holds the manager lock until dropped and joins the current transaction,
    /// opening an implicit one if needed; an implicit transaction it opened is committed
    /// when the handle is dropped.
    ///
    /// # Errors
    /// Returns the connection error if no connection could be opened.
    pub fn cached_statement(
        &self,
        location: StatementLocation,
        sql: &str,
    ) -> Result<CachedStatement<'_>, SqlExecError> {
        let guard = self.state.lock();
        let (transaction_id, owns_transaction, cached) = {
            let mut state = guard.try_borrow_mut().map_err(|_| {
                SqlExecError::BadSequenceOfCalls("manager state is already borrowed".into())
            })?;
            let (id, created) = self.join_transaction(&mut state)?;
            (id, created, state.statements.contains_key(&location))
        };

        let query = if cached {
            trace!("Reusing cached statement from {location}");
            None
        } else {
            Some(Query::new(sql, false))
        };

        Ok(CachedStatement::new(
            guard,
            location,
            query,
            transaction_id,
            owns_transaction,
        ))
    }
}

impl Drop for DatabaseManager {
    fn drop(&mut self) {
        self.state.get_mut().get_mut().close();
    }
}

#[cfg(all(test, feature = "test-utils"))]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::statement_here;
    use crate::test_utils::ScriptedBackend;

    fn manager(backend: &ScriptedBackend) -> DatabaseManager {
        DatabaseManager::new(
            backend.clone(),
            ManagerOptions::default().with_retry_delay_ms(0),
        )
    }

    #[test]
    fn connects_lazily_and_only_once() {
        let backend = ScriptedBackend::new(Dialect::Sqlite);
        let manager = manager(&backend);
        assert_eq!(backend.open_attempts(), 0);

        manager.execute_batch("CREATE TABLE t(v INTEGER)").unwrap();
        manager.open().unwrap();
        assert_eq!(backend.open_attempts(), 1);
        assert_eq!(backend.batches(), vec!["CREATE TABLE t(v INTEGER)".to_string()]);
    }

    #[test]
    fn transient_failures_are_retried() {
        let backend = ScriptedBackend::new(Dialect::Sqlite);
        backend.fail_opens(3);
        let manager = manager(&backend);
        manager.open().unwrap();
        assert_eq!(backend.open_attempts(), 4);
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let backend = ScriptedBackend::new(Dialect::Sqlite);
        backend.reject_opens();
        let manager = manager(&backend);
        assert_eq!(manager.open().unwrap_err().kind(), ErrorKind::Database);
        assert_eq!(backend.open_attempts(), 1);
    }

    #[test]
    fn dialect_mismatch_is_internal() {
        let backend = ScriptedBackend::new(Dialect::Sqlite);
        backend.report_dialect(Dialect::MySql);
        let manager = manager(&backend);
        assert_eq!(manager.open().unwrap_err().kind(), ErrorKind::Internal);
    }

    #[test]
    fn close_rolls_back_and_frees_statements() {
        let backend = ScriptedBackend::new(Dialect::Postgres);
        let manager = manager(&backend);
        manager.start_transaction().unwrap();
        manager
            .cached_statement(statement_here!(), "SELECT 1")
            .unwrap()
            .execute()
            .unwrap();
        assert_eq!(manager.cached_statements_count(), 1);

        manager.close();
        manager.close();
        assert_eq!(backend.rollbacks(), 1);
        assert_eq!(backend.closed_connections(), 1);
        assert_eq!(manager.cached_statements_count(), 0);
        assert!(!manager.has_active_transaction());
    }

    #[test]
    fn unavailable_mid_operation_forces_reconnect() {
        let backend = ScriptedBackend::new(Dialect::Sqlite);
        let manager = manager(&backend);
        manager.execute_batch("SELECT 1").unwrap();

        backend.fail_next(ErrorKind::Unavailable);
        assert!(manager.execute_batch("SELECT 2").unwrap_err().is_unavailable());
        assert_eq!(backend.closed_connections(), 1);

        manager.execute_batch("SELECT 3").unwrap();
        assert_eq!(backend.open_attempts(), 2);
    }

    #[test]
    fn other_errors_keep_the_connection() {
        let backend = ScriptedBackend::new(Dialect::Sqlite);
        let manager = manager(&backend);
        manager.start_transaction().unwrap();

        backend.fail_next(ErrorKind::Database);
        assert_eq!(
            manager.execute_batch("BROKEN").unwrap_err().kind(),
            ErrorKind::Database
        );
        assert!(manager.has_active_transaction());
        assert_eq!(backend.closed_connections(), 0);
        manager.rollback_transaction().unwrap();
    }

    #[test]
    fn commit_without_transaction_is_rejected() {
        let backend = ScriptedBackend::new(Dialect::Sqlite);
        let manager = manager(&backend);
        assert_eq!(
            manager.commit_transaction().unwrap_err().kind(),
            ErrorKind::BadSequenceOfCalls
        );
        assert_eq!(
            manager.rollback_transaction().unwrap_err().kind(),
            ErrorKind::BadSequenceOfCalls
        );
        assert_eq!(manager.is_transaction_read_only(), None);
    }

    #[test]
    fn read_only_flag_follows_executed_statements() {
        let backend = ScriptedBackend::new(Dialect::Sqlite);
        let manager = manager(&backend);
        manager.start_transaction().unwrap();
        assert_eq!(manager.is_transaction_read_only(), Some(true));

        let mut statement = manager
            .cached_statement(statement_here!(), "DELETE FROM t")
            .unwrap();
        statement.execute().unwrap();
        drop(statement);

        assert_eq!(manager.is_transaction_read_only(), Some(false));
        manager.commit_transaction().unwrap();
        assert_eq!(backend.commits(), 1);
    }
}
