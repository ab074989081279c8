use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "postgres")]
use tokio_postgres;

#[derive(Debug, Error)]
pub enum SqlExecError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Bad sequence of calls: {0}")]
    BadSequenceOfCalls(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Parameter out of range: {0}")]
    OutOfRange(String),

    #[error("Inexistent item: {0}")]
    InexistentItem(String),

    #[error("Unimplemented feature: {0}")]
    NotImplemented(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`SqlExecError`], independent of the driver that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transient, connection-level failure.
    Unavailable,
    /// Non-transient back-end failure (constraint violation, malformed SQL, ...).
    Database,
    /// The caller violated the calling protocol.
    BadSequenceOfCalls,
    /// A value could not be converted, or a parameter was bound with the wrong tag.
    TypeMismatch,
    /// Unknown field index or parameter position.
    OutOfRange,
    /// Unknown parameter name or dictionary key.
    InexistentItem,
    NotImplemented,
    Config,
    Internal,
}

impl SqlExecError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            #[cfg(feature = "sqlite")]
            SqlExecError::SqliteError(_) => ErrorKind::Database,
            #[cfg(feature = "postgres")]
            SqlExecError::PostgresError(err) => {
                if err.is_closed() {
                    ErrorKind::Unavailable
                } else {
                    ErrorKind::Database
                }
            }
            SqlExecError::Unavailable(_) => ErrorKind::Unavailable,
            SqlExecError::Database(_) => ErrorKind::Database,
            SqlExecError::BadSequenceOfCalls(_) => ErrorKind::BadSequenceOfCalls,
            SqlExecError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            SqlExecError::OutOfRange(_) => ErrorKind::OutOfRange,
            SqlExecError::InexistentItem(_) => ErrorKind::InexistentItem,
            SqlExecError::NotImplemented(_) => ErrorKind::NotImplemented,
            SqlExecError::ConfigError(_) => ErrorKind::Config,
            SqlExecError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this failure means the connection to the back-end is gone.
    ///
    /// This is the only class that triggers reconnect-with-retry on open and
    /// the manager's close-on-loss behaviour mid-operation.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_connection_loss() {
        assert!(SqlExecError::Unavailable("gone".into()).is_unavailable());
        assert!(!SqlExecError::Database("constraint".into()).is_unavailable());
        assert!(!SqlExecError::BadSequenceOfCalls("twice".into()).is_unavailable());
        assert_eq!(
            SqlExecError::InexistentItem("x".into()).kind(),
            ErrorKind::InexistentItem
        );
    }
}
