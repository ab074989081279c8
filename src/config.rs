use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What an implicit transaction does when asked to run a second statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImplicitExecutionPolicy {
    /// Fail with `BadSequenceOfCalls`; surfaces missing explicit transactions at the call site.
    Strict,
    /// Log the violation, then run the statement inside the same implicit transaction. The
    /// statement still reaches the back-end.
    Lenient,
}

impl Default for ImplicitExecutionPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            ImplicitExecutionPolicy::Strict
        } else {
            ImplicitExecutionPolicy::Lenient
        }
    }
}

/// Options governing one [`DatabaseManager`](crate::manager::DatabaseManager).
///
/// ```rust
/// use sql_exec_core::prelude::*;
///
/// let options = ManagerOptions::default()
///     .with_connection_retries(3)
///     .with_retry_delay_ms(0)
///     .with_implicit_policy(ImplicitExecutionPolicy::Lenient);
/// assert_eq!(options.connection_retries, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerOptions {
    /// Extra attempts after the first one when the back-end reports itself unavailable.
    pub connection_retries: u32,
    /// Pause between connection attempts.
    pub retry_delay_ms: u64,
    pub implicit_policy: ImplicitExecutionPolicy,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            connection_retries: 10,
            retry_delay_ms: 1000,
            implicit_policy: ImplicitExecutionPolicy::default(),
        }
    }
}

impl ManagerOptions {
    #[must_use]
    pub fn with_connection_retries(mut self, connection_retries: u32) -> Self {
        self.connection_retries = connection_retries;
        self
    }

    #[must_use]
    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    #[must_use]
    pub fn with_implicit_policy(mut self, implicit_policy: ImplicitExecutionPolicy) -> Self {
        self.implicit_policy = implicit_policy;
        self
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
