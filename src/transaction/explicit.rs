use tracing::{debug, error, warn};

use crate::dictionary::Dictionary;
use crate::driver::{Connection, PrecompiledStatement};
use crate::error::SqlExecError;
use crate::results::ResultCursor;

use super::TransactionState;

/// Transaction opened with a native BEGIN and closed by commit, rollback or abandonment.
#[derive(Debug)]
pub struct ExplicitTransaction {
    state: TransactionState,
    read_only: bool,
}

impl ExplicitTransaction {
    /// Issue BEGIN on `db`.
    ///
    /// # Errors
    /// Returns the driver's error if the back-end refuses to begin.
    pub fn begin(db: &mut Connection) -> Result<Self, SqlExecError> {
        db.begin()?;
        debug!("explicit transaction started");
        Ok(Self {
            state: TransactionState::Open,
            read_only: true,
        })
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn ensure_open(&self, action: &str) -> Result<(), SqlExecError> {
        if self.state == TransactionState::Open {
            Ok(())
        } else {
            Err(SqlExecError::BadSequenceOfCalls(format!(
                "cannot {action}: transaction is {:?}",
                self.state
            )))
        }
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` once committed or rolled back, or the
    /// driver's error.
    pub fn execute(
        &mut self,
        db: &mut Connection,
        statement: &PrecompiledStatement,
        parameters: &Dictionary,
    ) -> Result<ResultCursor, SqlExecError> {
        self.ensure_open("execute")?;
        let rows = db.execute(statement, parameters)?;
        self.record(statement);
        Ok(ResultCursor::new(rows))
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` once committed or rolled back, or the
    /// driver's error.
    pub fn execute_without_result(
        &mut self,
        db: &mut Connection,
        statement: &PrecompiledStatement,
        parameters: &Dictionary,
    ) -> Result<(), SqlExecError> {
        self.ensure_open("execute")?;
        db.execute_without_result(statement, parameters)?;
        self.record(statement);
        Ok(())
    }

    fn record(&mut self, statement: &PrecompiledStatement) {
        if !statement.is_read_only() {
            self.read_only = false;
        }
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` unless open, or the driver's error (the
    /// transaction then stays open).
    pub fn commit(&mut self, db: &mut Connection) -> Result<(), SqlExecError> {
        self.ensure_open("commit")?;
        db.commit()?;
        self.state = TransactionState::Committed;
        debug!("explicit transaction committed");
        Ok(())
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` unless open, or the driver's error (the
    /// transaction then stays open).
    pub fn rollback(&mut self, db: &mut Connection) -> Result<(), SqlExecError> {
        self.ensure_open("roll back")?;
        db.rollback()?;
        self.state = TransactionState::RolledBack;
        debug!("explicit transaction rolled back");
        Ok(())
    }

    pub(crate) fn abandon(&mut self, db: Option<&mut Connection>) {
        if self.state != TransactionState::Open {
            return;
        }

        match db {
            Some(db) => {
                warn!("An active transaction was dismissed, rolling back");
                if let Err(err) = db.rollback() {
                    error!("Cannot roll back a dismissed transaction: {err}");
                }
            }
            None => warn!("An active transaction was dismissed with its connection gone"),
        }
        self.state = TransactionState::RolledBack;
    }
}

impl Drop for ExplicitTransaction {
    fn drop(&mut self) {
        if self.state == TransactionState::Open {
            error!("An explicit transaction was dropped while still open");
        }
    }
}
