//! Dialect-agnostic SQL execution core.
//!
//! Typed values, `${name}` statement templates compiled per dialect, a per-call-site cache of
//! prepared statements, and explicit or implicit transactions, all serialised through one
//! [`DatabaseManager`] per database.
//!
//! ```rust
//! use sql_exec_core::prelude::*;
//!
//! let manager = DatabaseManager::sqlite_builder(":memory:").build();
//! manager.execute_batch("CREATE TABLE kv(k TEXT, v INTEGER)")?;
//!
//! let mut insert = manager.cached_statement(statement_here!(), "INSERT INTO kv VALUES(${k}, ${v})")?;
//! insert.set_parameter_type("k", ValueType::Utf8Text)?;
//! insert.set_parameter_type("v", ValueType::Integer64)?;
//! let mut params = Dictionary::new();
//! params.set_utf8("k", "answer");
//! params.set_integer("v", 42);
//! insert.execute_without_result(&params)?;
//! drop(insert);
//!
//! assert!(manager.does_table_exist("kv")?);
//! # Ok::<(), SqlExecError>(())
//! ```

#[cfg(not(any(feature = "sqlite", feature = "postgres", feature = "test-utils")))]
compile_error!("enable at least one back-end feature: `sqlite`, `postgres` or `test-utils`");

pub mod config;
mod conversion;
pub mod dictionary;
pub mod driver;
pub mod error;
pub mod location;
pub mod manager;
pub mod prelude;
pub mod query;
pub mod results;
pub mod transaction;
pub mod translation;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use config::{ImplicitExecutionPolicy, ManagerOptions};
pub use dictionary::Dictionary;
pub use error::{ErrorKind, SqlExecError};
pub use location::StatementLocation;
pub use manager::{CachedStatement, DatabaseManager};
pub use query::Query;
pub use types::{Dialect, Value, ValueType};
