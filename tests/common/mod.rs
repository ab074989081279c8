#![allow(dead_code)]

use sql_exec_core::prelude::*;
use sql_exec_core::test_utils::ScriptedBackend;

/// Install a subscriber once per test binary so failures come with the library's logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// Manager over a scripted back-end that never sleeps between connection attempts.
pub fn scripted_manager(
    dialect: Dialect,
    policy: ImplicitExecutionPolicy,
) -> (ScriptedBackend, DatabaseManager) {
    init_tracing();
    let backend = ScriptedBackend::new(dialect);
    let manager = DatabaseManager::new(
        backend.clone(),
        ManagerOptions::default()
            .with_retry_delay_ms(0)
            .with_implicit_policy(policy),
    );
    (backend, manager)
}
