//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::{ImplicitExecutionPolicy, ManagerOptions};
pub use crate::dictionary::Dictionary;
pub use crate::driver::ConnectionFactory;
pub use crate::error::{ErrorKind, SqlExecError};
pub use crate::location::StatementLocation;
pub use crate::manager::{CachedStatement, DatabaseManager};
pub use crate::query::Query;
pub use crate::results::ResultCursor;
pub use crate::statement_here;
pub use crate::translation::{BindingPlan, DialectFormatter, ParameterFormatter, PlaceholderStyle};
pub use crate::types::{Dialect, Value, ValueType};

#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresOptions, PostgresOptionsBuilder};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteOptions, SqliteOptionsBuilder};
