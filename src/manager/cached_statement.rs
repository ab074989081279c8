use std::cell::RefCell;

use parking_lot::ReentrantMutexGuard;
use tracing::{error, trace};

use crate::dictionary::Dictionary;
use crate::error::SqlExecError;
use crate::location::StatementLocation;
use crate::query::Query;
use crate::results::ResultCursor;
use crate::transaction::{Transaction, TransactionState};
use crate::types::{Value, ValueType};

use super::ManagerState;

/// Handle on the statement cached for one call site.
///
/// Holds the manager lock for its whole lifetime. Parameter types and the read-only hint only
/// matter before the statement is first compiled; once cached they are ignored.
pub struct CachedStatement<'m> {
    guard: ReentrantMutexGuard<'m, RefCell<ManagerState>>,
    location: StatementLocation,
    query: Option<Query>,
    result: Option<ResultCursor>,
    transaction_id: u64,
    owns_transaction: bool,
}

impl std::fmt::Debug for CachedStatement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedStatement")
            .field("location", &self.location)
            .field("query", &self.query)
            .field("result", &self.result)
            .field("transaction_id", &self.transaction_id)
            .field("owns_transaction", &self.owns_transaction)
            .finish_non_exhaustive()
    }
}

impl<'m> CachedStatement<'m> {
    pub(super) fn new(
        guard: ReentrantMutexGuard<'m, RefCell<ManagerState>>,
        location: StatementLocation,
        query: Option<Query>,
        transaction_id: u64,
        owns_transaction: bool,
    ) -> Self {
        Self {
            guard,
            location,
            query,
            result: None,
            transaction_id,
            owns_transaction,
        }
    }

    #[must_use]
    pub fn location(&self) -> StatementLocation {
        self.location
    }

    /// Whether the statement was already compiled when this handle was created.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.query.is_none()
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        if let Some(query) = self.query.as_mut() {
            query.set_read_only(read_only);
        }
    }

    /// # Errors
    /// Returns `SqlExecError::OutOfRange` if the template has no such parameter.
    pub fn set_parameter_type(&mut self, name: &str, ty: ValueType) -> Result<(), SqlExecError> {
        match self.query.as_mut() {
            Some(query) => query.set_type(name, ty),
            None => Ok(()),
        }
    }

    /// Execute without parameters.
    ///
    /// # Errors
    /// See [`CachedStatement::execute_with`].
    pub fn execute(&mut self) -> Result<(), SqlExecError> {
        self.execute_with(&Dictionary::new())
    }

    /// Compile on first use, then execute within the transaction joined at creation.
    ///
    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` on a second execution, if the joined
    /// transaction has ended, or if it refuses another statement; otherwise compile, binding
    /// or driver errors.
    pub fn execute_with(&mut self, parameters: &Dictionary) -> Result<(), SqlExecError> {
        self.ensure_not_executed()?;
        let cursor = self.run(|transaction, connection, statement| {
            transaction.execute(connection, statement, parameters)
        })?;
        self.result = Some(cursor);
        Ok(())
    }

    /// Like [`CachedStatement::execute_with`], discarding any rows.
    ///
    /// # Errors
    /// See [`CachedStatement::execute_with`].
    pub fn execute_without_result(&mut self, parameters: &Dictionary) -> Result<(), SqlExecError> {
        self.ensure_not_executed()?;
        self.run(|transaction, connection, statement| {
            transaction.execute_without_result(connection, statement, parameters)
        })?;
        self.result = Some(ResultCursor::empty());
        Ok(())
    }

    fn ensure_not_executed(&self) -> Result<(), SqlExecError> {
        if self.result.is_some() {
            error!("Cannot execute twice a statement");
            return Err(SqlExecError::BadSequenceOfCalls(
                "the statement was already executed".into(),
            ));
        }
        Ok(())
    }

    fn run<T>(
        &mut self,
        operation: impl FnOnce(
            &mut Transaction,
            &mut crate::driver::Connection,
            &crate::driver::PrecompiledStatement,
        ) -> Result<T, SqlExecError>,
    ) -> Result<T, SqlExecError> {
        let mut state = self.guard.borrow_mut();
        let state = &mut *state;

        let outcome = (|| {
            let Some(active) = state
                .transaction
                .as_mut()
                .filter(|active| active.id == self.transaction_id)
            else {
                return Err(SqlExecError::BadSequenceOfCalls(
                    "the transaction of this statement has ended".into(),
                ));
            };
            let connection = state
                .connection
                .as_mut()
                .ok_or_else(|| SqlExecError::Internal("transaction without a connection".into()))?;

            if let Some(query) = &self.query {
                trace!("Caching statement from {}", self.location);
                let statement = connection.compile(query)?;
                state.statements.insert(self.location, statement);
                self.query = None;
            }
            let statement = state.statements.get(&self.location).ok_or_else(|| {
                SqlExecError::Internal(format!("no statement cached for {}", self.location))
            })?;

            operation(&mut active.transaction, connection, statement)
        })();

        if let Err(err) = &outcome {
            state.close_if_unavailable(err);
        }
        outcome
    }

    fn result_mut(&mut self) -> Result<&mut ResultCursor, SqlExecError> {
        self.result.as_mut().ok_or_else(|| {
            error!("Accessing the results of a statement without having executed it");
            SqlExecError::BadSequenceOfCalls("the statement has not been executed".into())
        })
    }

    fn checked<T>(&self, outcome: Result<T, SqlExecError>) -> Result<T, SqlExecError> {
        if let Err(err) = &outcome {
            if let Ok(mut state) = self.guard.try_borrow_mut() {
                state.close_if_unavailable(err);
            }
        }
        outcome
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` before execution.
    pub fn is_done(&self) -> Result<bool, SqlExecError> {
        self.result.as_ref().map(ResultCursor::is_done).ok_or_else(|| {
            error!("Accessing the results of a statement without having executed it");
            SqlExecError::BadSequenceOfCalls("the statement has not been executed".into())
        })
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` before execution or once done, or the
    /// driver's error.
    pub fn next(&mut self) -> Result<(), SqlExecError> {
        let outcome = self.result_mut().and_then(ResultCursor::next);
        self.checked(outcome)
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` before execution.
    pub fn get_result_fields_count(&self) -> Result<usize, SqlExecError> {
        self.result
            .as_ref()
            .map(ResultCursor::fields_count)
            .ok_or_else(|| {
                SqlExecError::BadSequenceOfCalls("the statement has not been executed".into())
            })
    }

    /// Declare the type a result field is coerced to. Ignored once the result is done.
    ///
    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` before execution, `OutOfRange` for an
    /// unknown field, or `TypeMismatch` if the current row's value cannot be converted.
    pub fn set_result_field_type(&mut self, index: usize, ty: ValueType) -> Result<(), SqlExecError> {
        let outcome = self.result_mut().and_then(|result| {
            if result.is_done() {
                Ok(())
            } else {
                result.set_expected_type(index, ty)
            }
        });
        self.checked(outcome)
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` before execution or once done,
    /// `OutOfRange` for an unknown field, or a conversion or driver error.
    pub fn get_result_field(&mut self, index: usize) -> Result<Value, SqlExecError> {
        let outcome = self
            .result_mut()
            .and_then(|result| result.get_field(index).cloned());
        self.checked(outcome)
    }
}

impl Drop for CachedStatement<'_> {
    fn drop(&mut self) {
        if !self.owns_transaction {
            return;
        }

        let Ok(mut state) = self.guard.try_borrow_mut() else {
            error!("Cannot commit the implicit transaction of {}", self.location);
            return;
        };
        let Some(active) = state.transaction.as_mut() else {
            return;
        };
        if active.id != self.transaction_id {
            return;
        }

        if let Transaction::Implicit(implicit) = &mut active.transaction {
            if implicit.state() == TransactionState::Executed {
                if let Err(err) = implicit.commit() {
                    error!("Cannot commit the implicit transaction of {}: {err}", self.location);
                }
            }
        }
        state.transaction = None;
    }
}
