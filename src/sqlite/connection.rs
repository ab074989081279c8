use rusqlite::types::Value as SqliteValue;
use rusqlite::{Connection, ErrorCode};
use tracing::debug;

use crate::dictionary::Dictionary;
use crate::error::SqlExecError;
use crate::query::Query;
use crate::results::RowSource;
use crate::translation::DialectFormatter;
use crate::types::Dialect;

use super::config::SqliteOptions;
use super::params::Params;
use super::result::SqliteRows;
use super::statement::SqliteStatement;

/// An open `SQLite` connection.
pub struct SqliteDatabase {
    conn: Connection,
}

/// A database another process holds locked is transient; everything else is permanent.
fn classify_open_error(err: rusqlite::Error) -> SqlExecError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
            SqlExecError::Unavailable(format!("SQLite database is locked: {err}"))
        }
        _ => SqlExecError::SqliteError(err),
    }
}

impl SqliteDatabase {
    /// Open the database file named by `options`.
    ///
    /// # Errors
    /// Returns `SqlExecError::Unavailable` if the file is locked by another writer, or
    /// `SqlExecError::SqliteError` if it cannot be opened.
    pub fn open(options: &SqliteOptions) -> Result<Self, SqlExecError> {
        let conn = Connection::open(&options.db_path).map_err(classify_open_error)?;
        conn.set_prepared_statement_cache_capacity(options.statement_cache_capacity);

        if options.enable_wal {
            conn.execute_batch(
                "
                    PRAGMA journal_mode = WAL;
                ",
            )
            .map_err(classify_open_error)?;
        }

        debug!(path = %options.db_path, "opened SQLite database");
        Ok(Self { conn })
    }

    /// # Errors
    /// Returns `SqlExecError::SqliteError` if `SQLite` rejects the formatted SQL.
    pub fn compile(&mut self, query: &Query) -> Result<SqliteStatement, SqlExecError> {
        let mut formatter = DialectFormatter::new(Dialect::Sqlite);
        let sql = query.format(&mut formatter)?;

        // Validate now and keep the native handle warm in the statement cache.
        self.conn.prepare_cached(&sql)?;

        Ok(SqliteStatement::new(
            sql,
            formatter.into_binding_plan(),
            query.is_read_only(),
        ))
    }

    /// Run a statement and buffer every row it produces.
    ///
    /// # Errors
    /// Returns binding errors from the statement's plan, or `SqlExecError::SqliteError`.
    pub fn execute(
        &mut self,
        statement: &SqliteStatement,
        parameters: &Dictionary,
    ) -> Result<Box<dyn RowSource>, SqlExecError> {
        let params = Params::convert(&statement.plan().collect(parameters)?);
        let mut stmt = self.conn.prepare_cached(statement.sql())?;
        let fields_count = stmt.column_count();

        let mut rows_iter = stmt.query(&params.as_refs()[..])?;
        let mut rows = Vec::new();
        while let Some(row) = rows_iter.next()? {
            let mut fields = Vec::with_capacity(fields_count);
            for i in 0..fields_count {
                fields.push(row.get::<_, SqliteValue>(i)?);
            }
            rows.push(fields);
        }

        Ok(Box::new(SqliteRows::new(fields_count, rows)))
    }

    /// Run a statement to completion, discarding any rows.
    ///
    /// # Errors
    /// Returns binding errors from the statement's plan, or `SqlExecError::SqliteError`.
    pub fn execute_without_result(
        &mut self,
        statement: &SqliteStatement,
        parameters: &Dictionary,
    ) -> Result<(), SqlExecError> {
        let params = Params::convert(&statement.plan().collect(parameters)?);
        let mut stmt = self.conn.prepare_cached(statement.sql())?;
        let mut rows_iter = stmt.query(&params.as_refs()[..])?;
        while rows_iter.next()?.is_some() {}
        Ok(())
    }

    /// # Errors
    /// Returns `SqlExecError::SqliteError` if any statement of the batch fails.
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), SqlExecError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// # Errors
    /// Returns `SqlExecError::SqliteError` if the catalog cannot be read.
    pub fn does_table_exist(&mut self, name: &str) -> Result<bool, SqlExecError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count != 0)
    }

    /// # Errors
    /// Returns `SqlExecError::SqliteError` if a transaction is already open.
    pub fn begin(&mut self) -> Result<(), SqlExecError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    /// # Errors
    /// Returns `SqlExecError::SqliteError` if no transaction is open or the commit fails.
    pub fn commit(&mut self) -> Result<(), SqlExecError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    /// # Errors
    /// Returns `SqlExecError::SqliteError` if no transaction is open.
    pub fn rollback(&mut self) -> Result<(), SqlExecError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}
