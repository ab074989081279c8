use serde::{Deserialize, Serialize};
use tokio_postgres::config::Host;

use crate::config::ManagerOptions;
use crate::error::SqlExecError;
use crate::manager::DatabaseManager;

/// Options for connecting to a `PostgreSQL` server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresOptions {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    /// Take this session-level advisory lock right after connecting, so that only one
    /// process works on the database at a time.
    pub advisory_lock: Option<i32>,
}

impl Default for PostgresOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            dbname: "postgres".to_string(),
            advisory_lock: None,
        }
    }
}

impl PostgresOptions {
    /// Parse a libpq-style URL or key/value connection string.
    ///
    /// # Errors
    /// Returns `SqlExecError::ConfigError` if the string is malformed or names a Unix socket.
    pub fn from_url(url: &str) -> Result<Self, SqlExecError> {
        let config: tokio_postgres::Config = url
            .parse()
            .map_err(|e| SqlExecError::ConfigError(format!("invalid connection string: {e}")))?;

        let mut opts = Self::default();
        match config.get_hosts().first() {
            Some(Host::Tcp(host)) => opts.host.clone_from(host),
            Some(_) => {
                return Err(SqlExecError::ConfigError(
                    "only TCP hosts are supported".to_string(),
                ));
            }
            None => {}
        }
        if let Some(port) = config.get_ports().first() {
            opts.port = *port;
        }
        if let Some(user) = config.get_user() {
            opts.user = user.to_string();
        }
        if let Some(password) = config.get_password() {
            opts.password = String::from_utf8_lossy(password).into_owned();
        }
        if let Some(dbname) = config.get_dbname() {
            opts.dbname = dbname.to_string();
        }
        Ok(opts)
    }

    pub(crate) fn to_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .password(&self.password)
            .dbname(&self.dbname);
        config
    }
}

/// Fluent builder for `PostgreSQL` options.
#[derive(Debug, Clone, Default)]
pub struct PostgresOptionsBuilder {
    opts: PostgresOptions,
    manager: ManagerOptions,
}

impl PostgresOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.opts.host = host.into();
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.opts.port = port;
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.opts.user = user.into();
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.opts.password = password.into();
        self
    }

    #[must_use]
    pub fn dbname(mut self, dbname: impl Into<String>) -> Self {
        self.opts.dbname = dbname.into();
        self
    }

    #[must_use]
    pub fn advisory_lock(mut self, lock: i32) -> Self {
        self.opts.advisory_lock = Some(lock);
        self
    }

    #[must_use]
    pub fn manager_options(mut self, manager: ManagerOptions) -> Self {
        self.manager = manager;
        self
    }

    #[must_use]
    pub fn finish(self) -> PostgresOptions {
        self.opts
    }

    /// Build a `DatabaseManager` for `PostgreSQL`. No connection is opened until first use.
    ///
    /// # Errors
    /// Returns `SqlExecError::ConfigError` if host, user or dbname is empty.
    pub fn build(self) -> Result<DatabaseManager, SqlExecError> {
        if self.opts.host.is_empty() {
            return Err(SqlExecError::ConfigError("host is required".to_string()));
        }
        if self.opts.user.is_empty() {
            return Err(SqlExecError::ConfigError("user is required".to_string()));
        }
        if self.opts.dbname.is_empty() {
            return Err(SqlExecError::ConfigError("dbname is required".to_string()));
        }
        Ok(DatabaseManager::new(self.opts, self.manager))
    }
}

impl DatabaseManager {
    #[must_use]
    pub fn postgres_builder() -> PostgresOptionsBuilder {
        PostgresOptionsBuilder::new()
    }
}
