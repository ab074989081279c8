//! Transaction state machines.
//!
//! An explicit transaction brackets any number of statements with native BEGIN/COMMIT. An
//! implicit transaction wraps exactly one statement in the back-end's autocommit mode.

mod explicit;
mod implicit;

pub use explicit::ExplicitTransaction;
pub use implicit::ImplicitTransaction;

use crate::dictionary::Dictionary;
use crate::driver::{Connection, PrecompiledStatement};
use crate::error::SqlExecError;
use crate::results::ResultCursor;

/// Lifecycle position of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    /// Explicit transaction accepting statements.
    Open,
    /// Implicit transaction that has not run its statement yet.
    Ready,
    /// Implicit transaction that has run its statement.
    Executed,
    Committed,
    RolledBack,
}

/// The transaction currently attached to a manager.
#[derive(Debug)]
pub enum Transaction {
    Explicit(ExplicitTransaction),
    Implicit(ImplicitTransaction),
}

impl Transaction {
    #[must_use]
    pub fn is_implicit(&self) -> bool {
        matches!(self, Transaction::Implicit(_))
    }

    /// `true` until a statement not marked read-only has been executed.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        match self {
            Transaction::Explicit(tx) => tx.is_read_only(),
            Transaction::Implicit(tx) => tx.is_read_only(),
        }
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        match self {
            Transaction::Explicit(tx) => tx.state(),
            Transaction::Implicit(tx) => tx.state(),
        }
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` if the transaction no longer accepts
    /// statements, or the driver's error.
    pub fn execute(
        &mut self,
        db: &mut Connection,
        statement: &PrecompiledStatement,
        parameters: &Dictionary,
    ) -> Result<ResultCursor, SqlExecError> {
        match self {
            Transaction::Explicit(tx) => tx.execute(db, statement, parameters),
            Transaction::Implicit(tx) => tx.execute(db, statement, parameters),
        }
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` if the transaction no longer accepts
    /// statements, or the driver's error.
    pub fn execute_without_result(
        &mut self,
        db: &mut Connection,
        statement: &PrecompiledStatement,
        parameters: &Dictionary,
    ) -> Result<(), SqlExecError> {
        match self {
            Transaction::Explicit(tx) => tx.execute_without_result(db, statement, parameters),
            Transaction::Implicit(tx) => tx.execute_without_result(db, statement, parameters),
        }
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` if the state does not allow a commit, or the
    /// driver's error.
    pub fn commit(&mut self, db: &mut Connection) -> Result<(), SqlExecError> {
        match self {
            Transaction::Explicit(tx) => tx.commit(db),
            Transaction::Implicit(tx) => tx.commit(),
        }
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` for implicit transactions and for explicit ones
    /// that are no longer open, or the driver's error.
    pub fn rollback(&mut self, db: &mut Connection) -> Result<(), SqlExecError> {
        match self {
            Transaction::Explicit(tx) => tx.rollback(db),
            Transaction::Implicit(tx) => tx.rollback(),
        }
    }

    /// Dismiss the transaction without an explicit outcome.
    ///
    /// An open explicit transaction is rolled back on `db` when the connection is still
    /// available. Failures are logged, never returned.
    pub fn abandon(&mut self, db: Option<&mut Connection>) {
        match self {
            Transaction::Explicit(tx) => tx.abandon(db),
            Transaction::Implicit(tx) => tx.abandon(),
        }
    }
}
