//! Back-end dispatch.
//!
//! The back-end is chosen once, when the [`ConnectionFactory`] is handed to the manager; every
//! connection and compiled statement it produces carries the same variant.

use crate::dictionary::Dictionary;
use crate::error::SqlExecError;
use crate::query::Query;
use crate::results::RowSource;
use crate::types::Dialect;

#[cfg(feature = "postgres")]
use crate::postgres::{PostgresDatabase, PostgresOptions, PostgresStatement};
#[cfg(feature = "sqlite")]
use crate::sqlite::{SqliteDatabase, SqliteOptions, SqliteStatement};
#[cfg(feature = "test-utils")]
use crate::test_utils::{ScriptedBackend, ScriptedDatabase, ScriptedStatement};

/// Opens physical connections to one back-end.
#[derive(Debug, Clone)]
pub enum ConnectionFactory {
    /// `SQLite` database file (or `:memory:`)
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteOptions),
    /// `PostgreSQL` server
    #[cfg(feature = "postgres")]
    Postgres(PostgresOptions),
    /// In-process fake back-end for tests
    #[cfg(feature = "test-utils")]
    Scripted(ScriptedBackend),
}

impl ConnectionFactory {
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        match self {
            #[cfg(feature = "sqlite")]
            ConnectionFactory::Sqlite(_) => Dialect::Sqlite,
            #[cfg(feature = "postgres")]
            ConnectionFactory::Postgres(_) => Dialect::Postgres,
            #[cfg(feature = "test-utils")]
            ConnectionFactory::Scripted(backend) => backend.dialect(),
        }
    }

    /// Open a new physical connection.
    ///
    /// # Errors
    /// Returns `SqlExecError::Unavailable` when the back-end cannot be reached right now, or any
    /// other error for permanent failures.
    pub fn open(&self) -> Result<Connection, SqlExecError> {
        match self {
            #[cfg(feature = "sqlite")]
            ConnectionFactory::Sqlite(options) => SqliteDatabase::open(options).map(Connection::Sqlite),
            #[cfg(feature = "postgres")]
            ConnectionFactory::Postgres(options) => {
                PostgresDatabase::open(options).map(Connection::Postgres)
            }
            #[cfg(feature = "test-utils")]
            ConnectionFactory::Scripted(backend) => backend.open().map(Connection::Scripted),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<SqliteOptions> for ConnectionFactory {
    fn from(options: SqliteOptions) -> Self {
        ConnectionFactory::Sqlite(options)
    }
}

#[cfg(feature = "postgres")]
impl From<PostgresOptions> for ConnectionFactory {
    fn from(options: PostgresOptions) -> Self {
        ConnectionFactory::Postgres(options)
    }
}

#[cfg(feature = "test-utils")]
impl From<ScriptedBackend> for ConnectionFactory {
    fn from(backend: ScriptedBackend) -> Self {
        ConnectionFactory::Scripted(backend)
    }
}

/// One open physical connection.
pub enum Connection {
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteDatabase),
    #[cfg(feature = "postgres")]
    Postgres(PostgresDatabase),
    #[cfg(feature = "test-utils")]
    Scripted(ScriptedDatabase),
}

// Manual Debug implementation because native connections do not all expose `Debug`
impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => f.debug_tuple("Sqlite").field(&"<Connection>").finish(),
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => f.debug_tuple("Postgres").field(&"<Client>").finish(),
            #[cfg(feature = "test-utils")]
            Self::Scripted(_) => f.debug_tuple("Scripted").finish(),
        }
    }
}

fn mismatched_backend() -> SqlExecError {
    SqlExecError::Internal("statement was compiled by another back-end".into())
}

impl Connection {
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        match self {
            #[cfg(feature = "sqlite")]
            Connection::Sqlite(_) => Dialect::Sqlite,
            #[cfg(feature = "postgres")]
            Connection::Postgres(_) => Dialect::Postgres,
            #[cfg(feature = "test-utils")]
            Connection::Scripted(db) => db.dialect(),
        }
    }

    /// Format `query` for this dialect and prepare it natively.
    ///
    /// # Errors
    /// Returns `SqlExecError` if formatting or native preparation fails.
    pub fn compile(&mut self, query: &Query) -> Result<PrecompiledStatement, SqlExecError> {
        match self {
            #[cfg(feature = "sqlite")]
            Connection::Sqlite(db) => db.compile(query).map(PrecompiledStatement::Sqlite),
            #[cfg(feature = "postgres")]
            Connection::Postgres(db) => db.compile(query).map(PrecompiledStatement::Postgres),
            #[cfg(feature = "test-utils")]
            Connection::Scripted(db) => db.compile(query).map(PrecompiledStatement::Scripted),
        }
    }

    /// Bind `parameters` and run the statement, returning its rows.
    ///
    /// # Errors
    /// Returns `SqlExecError` if binding or execution fails.
    pub fn execute(
        &mut self,
        statement: &PrecompiledStatement,
        parameters: &Dictionary,
    ) -> Result<Box<dyn RowSource>, SqlExecError> {
        match (self, statement) {
            #[cfg(feature = "sqlite")]
            (Connection::Sqlite(db), PrecompiledStatement::Sqlite(stmt)) => {
                db.execute(stmt, parameters)
            }
            #[cfg(feature = "postgres")]
            (Connection::Postgres(db), PrecompiledStatement::Postgres(stmt)) => {
                db.execute(stmt, parameters)
            }
            #[cfg(feature = "test-utils")]
            (Connection::Scripted(db), PrecompiledStatement::Scripted(stmt)) => {
                db.execute(stmt, parameters)
            }
            #[allow(unreachable_patterns)]
            _ => Err(mismatched_backend()),
        }
    }

    /// Bind `parameters` and run the statement, discarding any rows.
    ///
    /// # Errors
    /// Returns `SqlExecError` if binding or execution fails.
    pub fn execute_without_result(
        &mut self,
        statement: &PrecompiledStatement,
        parameters: &Dictionary,
    ) -> Result<(), SqlExecError> {
        match (self, statement) {
            #[cfg(feature = "sqlite")]
            (Connection::Sqlite(db), PrecompiledStatement::Sqlite(stmt)) => {
                db.execute_without_result(stmt, parameters)
            }
            #[cfg(feature = "postgres")]
            (Connection::Postgres(db), PrecompiledStatement::Postgres(stmt)) => {
                db.execute_without_result(stmt, parameters)
            }
            #[cfg(feature = "test-utils")]
            (Connection::Scripted(db), PrecompiledStatement::Scripted(stmt)) => {
                db.execute_without_result(stmt, parameters)
            }
            #[allow(unreachable_patterns)]
            _ => Err(mismatched_backend()),
        }
    }

    /// Run raw SQL (possibly several statements) without parameters.
    ///
    /// # Errors
    /// Returns `SqlExecError` if the back-end rejects the batch.
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), SqlExecError> {
        match self {
            #[cfg(feature = "sqlite")]
            Connection::Sqlite(db) => db.execute_batch(sql),
            #[cfg(feature = "postgres")]
            Connection::Postgres(db) => db.execute_batch(sql),
            #[cfg(feature = "test-utils")]
            Connection::Scripted(db) => db.execute_batch(sql),
        }
    }

    /// # Errors
    /// Returns `SqlExecError` if the catalog cannot be queried.
    pub fn does_table_exist(&mut self, name: &str) -> Result<bool, SqlExecError> {
        match self {
            #[cfg(feature = "sqlite")]
            Connection::Sqlite(db) => db.does_table_exist(name),
            #[cfg(feature = "postgres")]
            Connection::Postgres(db) => db.does_table_exist(name),
            #[cfg(feature = "test-utils")]
            Connection::Scripted(db) => db.does_table_exist(name),
        }
    }

    /// Open an explicit transaction on the connection.
    ///
    /// # Errors
    /// Returns `SqlExecError` if the back-end refuses to begin.
    pub fn begin(&mut self) -> Result<(), SqlExecError> {
        match self {
            #[cfg(feature = "sqlite")]
            Connection::Sqlite(db) => db.begin(),
            #[cfg(feature = "postgres")]
            Connection::Postgres(db) => db.begin(),
            #[cfg(feature = "test-utils")]
            Connection::Scripted(db) => db.begin(),
        }
    }

    /// # Errors
    /// Returns `SqlExecError` if the back-end fails to commit.
    pub fn commit(&mut self) -> Result<(), SqlExecError> {
        match self {
            #[cfg(feature = "sqlite")]
            Connection::Sqlite(db) => db.commit(),
            #[cfg(feature = "postgres")]
            Connection::Postgres(db) => db.commit(),
            #[cfg(feature = "test-utils")]
            Connection::Scripted(db) => db.commit(),
        }
    }

    /// # Errors
    /// Returns `SqlExecError` if the back-end fails to roll back.
    pub fn rollback(&mut self) -> Result<(), SqlExecError> {
        match self {
            #[cfg(feature = "sqlite")]
            Connection::Sqlite(db) => db.rollback(),
            #[cfg(feature = "postgres")]
            Connection::Postgres(db) => db.rollback(),
            #[cfg(feature = "test-utils")]
            Connection::Scripted(db) => db.rollback(),
        }
    }
}

/// A statement prepared by a [`Connection`], owned by the manager's cache.
#[derive(Debug)]
pub enum PrecompiledStatement {
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteStatement),
    #[cfg(feature = "postgres")]
    Postgres(PostgresStatement),
    #[cfg(feature = "test-utils")]
    Scripted(ScriptedStatement),
}

impl PrecompiledStatement {
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        match self {
            #[cfg(feature = "sqlite")]
            PrecompiledStatement::Sqlite(stmt) => stmt.is_read_only(),
            #[cfg(feature = "postgres")]
            PrecompiledStatement::Postgres(stmt) => stmt.is_read_only(),
            #[cfg(feature = "test-utils")]
            PrecompiledStatement::Scripted(stmt) => stmt.is_read_only(),
        }
    }

    /// Dialect-specific SQL text the statement was prepared from.
    #[must_use]
    pub fn sql(&self) -> &str {
        match self {
            #[cfg(feature = "sqlite")]
            PrecompiledStatement::Sqlite(stmt) => stmt.sql(),
            #[cfg(feature = "postgres")]
            PrecompiledStatement::Postgres(stmt) => stmt.sql(),
            #[cfg(feature = "test-utils")]
            PrecompiledStatement::Scripted(stmt) => stmt.sql(),
        }
    }
}
