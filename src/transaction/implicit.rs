use tracing::{error, info};

use crate::config::ImplicitExecutionPolicy;
use crate::dictionary::Dictionary;
use crate::driver::{Connection, PrecompiledStatement};
use crate::error::SqlExecError;
use crate::results::ResultCursor;

use super::TransactionState;

/// Single-statement transaction relying on the back-end's autocommit.
///
/// No native BEGIN or COMMIT is issued: the statement is durable as soon as it has run, and
/// committing only closes the state machine. Rolling back is never possible.
#[derive(Debug)]
pub struct ImplicitTransaction {
    state: TransactionState,
    read_only: bool,
    policy: ImplicitExecutionPolicy,
}

impl ImplicitTransaction {
    #[must_use]
    pub fn new(policy: ImplicitExecutionPolicy) -> Self {
        Self {
            state: TransactionState::Ready,
            read_only: true,
            policy,
        }
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn check_state_for_execution(&self) -> Result<(), SqlExecError> {
        match self.state {
            TransactionState::Ready => Ok(()),
            TransactionState::Executed => match self.policy {
                ImplicitExecutionPolicy::Strict => Err(SqlExecError::BadSequenceOfCalls(
                    "cannot execute more than one statement in an implicit transaction".into(),
                )),
                ImplicitExecutionPolicy::Lenient => {
                    info!(
                        "Executing more than one statement in an implicit transaction, \
                         an explicit transaction should be opened"
                    );
                    Ok(())
                }
            },
            state => Err(SqlExecError::BadSequenceOfCalls(format!(
                "cannot execute in an implicit transaction that is {state:?}"
            ))),
        }
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` once committed, or on a second statement
    /// under the strict policy; otherwise the driver's error.
    pub fn execute(
        &mut self,
        db: &mut Connection,
        statement: &PrecompiledStatement,
        parameters: &Dictionary,
    ) -> Result<ResultCursor, SqlExecError> {
        self.check_state_for_execution()?;
        let rows = db.execute(statement, parameters)?;
        self.record(statement);
        Ok(ResultCursor::new(rows))
    }

    /// # Errors
    /// Same as [`ImplicitTransaction::execute`].
    pub fn execute_without_result(
        &mut self,
        db: &mut Connection,
        statement: &PrecompiledStatement,
        parameters: &Dictionary,
    ) -> Result<(), SqlExecError> {
        self.check_state_for_execution()?;
        db.execute_without_result(statement, parameters)?;
        self.record(statement);
        Ok(())
    }

    fn record(&mut self, statement: &PrecompiledStatement) {
        if !statement.is_read_only() {
            self.read_only = false;
        }
        self.state = TransactionState::Executed;
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` unless a statement has been executed.
    pub fn commit(&mut self) -> Result<(), SqlExecError> {
        match self.state {
            TransactionState::Executed => {
                self.state = TransactionState::Committed;
                Ok(())
            }
            TransactionState::Ready => Err(SqlExecError::BadSequenceOfCalls(
                "cannot commit an implicit transaction that has not been executed yet".into(),
            )),
            state => Err(SqlExecError::BadSequenceOfCalls(format!(
                "cannot commit an implicit transaction that is {state:?}"
            ))),
        }
    }

    /// # Errors
    /// Always returns `SqlExecError::BadSequenceOfCalls`.
    pub fn rollback(&mut self) -> Result<(), SqlExecError> {
        error!("Cannot roll back an implicit transaction");
        Err(SqlExecError::BadSequenceOfCalls(
            "an implicit transaction cannot be rolled back".into(),
        ))
    }

    pub(crate) fn abandon(&mut self) {
        if self.state == TransactionState::Executed {
            error!("An implicit transaction has not been committed");
        }
    }
}
