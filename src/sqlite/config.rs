use serde::{Deserialize, Serialize};

use crate::config::ManagerOptions;
use crate::manager::DatabaseManager;

/// Options for opening a `SQLite` database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteOptions {
    /// Path of the database file, or `:memory:`.
    pub db_path: String,
    /// Switch the journal to WAL after opening.
    #[serde(default)]
    pub enable_wal: bool,
    /// Capacity of rusqlite's per-connection prepared statement cache.
    #[serde(default = "default_statement_cache_capacity")]
    pub statement_cache_capacity: usize,
}

fn default_statement_cache_capacity() -> usize {
    64
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            enable_wal: false,
            statement_cache_capacity: default_statement_cache_capacity(),
        }
    }

    /// A private in-memory database, lost when the connection closes.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    #[must_use]
    pub fn with_wal(mut self, enable_wal: bool) -> Self {
        self.enable_wal = enable_wal;
        self
    }

    #[must_use]
    pub fn with_statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
    manager: ManagerOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
            manager: ManagerOptions::default(),
        }
    }

    #[must_use]
    pub fn wal(mut self, enable_wal: bool) -> Self {
        self.opts.enable_wal = enable_wal;
        self
    }

    #[must_use]
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.opts.statement_cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn manager_options(mut self, manager: ManagerOptions) -> Self {
        self.manager = manager;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a `DatabaseManager` for `SQLite`. No connection is opened until first use.
    #[must_use]
    pub fn build(self) -> DatabaseManager {
        DatabaseManager::new(self.opts, self.manager)
    }
}

impl DatabaseManager {
    #[must_use]
    pub fn sqlite_builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }
}
