use tokio::runtime::{Builder, Runtime};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info};

use crate::dictionary::Dictionary;
use crate::error::SqlExecError;
use crate::query::Query;
use crate::results::RowSource;
use crate::translation::DialectFormatter;
use crate::types::{Dialect, Value};

use super::config::PostgresOptions;
use super::params::{PgParam, as_refs, declared_type};
use super::result::{PgField, PostgresRows, extract_field};
use super::statement::PostgresStatement;

/// An open `PostgreSQL` connection driven by a private current-thread runtime.
///
/// The connection task only makes progress while a client call is being awaited through
/// `block_on`, which is exactly when it is needed.
pub struct PostgresDatabase {
    client: Client,
    runtime: Runtime,
}

impl PostgresDatabase {
    /// Connect, then take the advisory lock if one is configured.
    ///
    /// # Errors
    /// Returns `SqlExecError::Unavailable` if the server cannot be reached, or
    /// `SqlExecError::Database` if the advisory lock is held by another session.
    pub fn open(options: &PostgresOptions) -> Result<Self, SqlExecError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SqlExecError::Internal(format!("cannot start runtime: {e}")))?;

        let (client, connection) = runtime
            .block_on(options.to_config().connect(NoTls))
            .map_err(|e| {
                error!("PostgreSQL error: {e}");
                SqlExecError::Unavailable(format!("cannot connect to PostgreSQL: {e}"))
            })?;
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {e}");
            }
        });

        let mut db = Self { client, runtime };
        if let Some(lock) = options.advisory_lock {
            db.advisory_lock(lock)?;
        }

        debug!(host = %options.host, dbname = %options.dbname, "connected to PostgreSQL");
        Ok(db)
    }

    fn advisory_lock(&mut self, lock: i32) -> Result<(), SqlExecError> {
        let row = self.runtime.block_on(
            self.client
                .query_one("SELECT pg_try_advisory_lock($1)", &[&i64::from(lock)]),
        )?;
        if row.try_get::<_, bool>(0)? {
            Ok(())
        } else {
            error!("The PostgreSQL database is locked by another instance");
            Err(SqlExecError::Database(format!(
                "advisory lock {lock} is held by another session"
            )))
        }
    }

    /// # Errors
    /// Returns `SqlExecError::BadSequenceOfCalls` if a parameter has no declared type, or the
    /// server's error if preparation fails.
    pub fn compile(&mut self, query: &Query) -> Result<PostgresStatement, SqlExecError> {
        let mut formatter = DialectFormatter::new(Dialect::Postgres);
        let sql = query.format(&mut formatter)?;
        let plan = formatter.into_binding_plan();

        let types = plan
            .slots()
            .map(|(name, ty)| declared_type(name, ty))
            .collect::<Result<Vec<_>, _>>()?;

        let statement = self
            .runtime
            .block_on(self.client.prepare_typed(&sql, &types))?;
        Ok(PostgresStatement::new(
            sql,
            plan,
            query.is_read_only(),
            statement,
        ))
    }

    /// Resolve the statement's arguments, writing large objects to the store first.
    fn bind(
        &mut self,
        statement: &PostgresStatement,
        parameters: &Dictionary,
    ) -> Result<Vec<PgParam>, SqlExecError> {
        let values = statement.plan().collect(parameters)?;
        let mut params = Vec::with_capacity(values.len());
        for value in &values {
            let param = match value {
                Value::LargeObject(content) => PgParam::Oid(self.write_large_object(content)?),
                other => PgParam::inline(other)?,
            };
            params.push(param);
        }
        Ok(params)
    }

    fn write_large_object(&mut self, content: &[u8]) -> Result<u32, SqlExecError> {
        let row = self
            .runtime
            .block_on(self.client.query_one("SELECT lo_from_bytea(0, $1)", &[&content]))?;
        Ok(row.try_get::<_, u32>(0)?)
    }

    fn read_large_object(&mut self, oid: u32) -> Result<Vec<u8>, SqlExecError> {
        let row = self
            .runtime
            .block_on(self.client.query_one("SELECT lo_get($1)", &[&oid]))?;
        Ok(row.try_get::<_, Vec<u8>>(0)?)
    }

    /// # Errors
    /// Returns binding errors from the statement's plan, or the server's error.
    pub fn execute(
        &mut self,
        statement: &PostgresStatement,
        parameters: &Dictionary,
    ) -> Result<Box<dyn RowSource>, SqlExecError> {
        let params = self.bind(statement, parameters)?;
        let rows = self
            .runtime
            .block_on(self.client.query(statement.native(), &as_refs(&params)))?;

        let fields_count = statement.native().columns().len();
        let mut converted = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut fields = Vec::with_capacity(fields_count);
            for idx in 0..fields_count {
                let field = match extract_field(row, idx)? {
                    PgField::LargeObject(oid) => {
                        PgField::Value(Value::LargeObject(self.read_large_object(oid)?))
                    }
                    field => field,
                };
                fields.push(field);
            }
            converted.push(fields);
        }

        Ok(Box::new(PostgresRows::new(fields_count, converted)))
    }

    /// # Errors
    /// Returns binding errors from the statement's plan, or the server's error.
    pub fn execute_without_result(
        &mut self,
        statement: &PostgresStatement,
        parameters: &Dictionary,
    ) -> Result<(), SqlExecError> {
        let params = self.bind(statement, parameters)?;
        self.runtime
            .block_on(self.client.execute(statement.native(), &as_refs(&params)))?;
        Ok(())
    }

    /// # Errors
    /// Returns the server's error if any statement of the batch fails.
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), SqlExecError> {
        self.runtime.block_on(self.client.batch_execute(sql))?;
        Ok(())
    }

    /// Look `name` up among the ordinary tables of the `public` schema.
    ///
    /// # Errors
    /// Returns the server's error if the catalog cannot be queried.
    pub fn does_table_exist(&mut self, name: &str) -> Result<bool, SqlExecError> {
        let lower = name.to_lowercase();
        let rows = self.runtime.block_on(self.client.query(
            "SELECT 1 FROM pg_catalog.pg_class c \
             JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
             WHERE n.nspname = 'public' AND c.relkind = 'r' AND c.relname = $1",
            &[&lower],
        ))?;
        Ok(!rows.is_empty())
    }

    /// # Errors
    /// Returns the server's error if the transaction cannot be started.
    pub fn begin(&mut self) -> Result<(), SqlExecError> {
        self.execute_batch("BEGIN; SET TRANSACTION ISOLATION LEVEL SERIALIZABLE;")
    }

    /// # Errors
    /// Returns the server's error, e.g. a serialization failure.
    pub fn commit(&mut self) -> Result<(), SqlExecError> {
        self.execute_batch("COMMIT")
    }

    /// # Errors
    /// Returns the server's error if the rollback cannot be sent.
    pub fn rollback(&mut self) -> Result<(), SqlExecError> {
        self.execute_batch("ROLLBACK")
    }
}

impl Drop for PostgresDatabase {
    fn drop(&mut self) {
        info!("Closing connection to PostgreSQL");
    }
}
