#![cfg(feature = "test-utils")]

mod common;

use sql_exec_core::prelude::*;

use common::scripted_manager;

#[test]
fn gives_up_after_configured_retries() -> Result<(), Box<dyn std::error::Error>> {
    let (backend, manager) = scripted_manager(Dialect::Postgres, ImplicitExecutionPolicy::Strict);
    backend.stay_unavailable();

    let err = manager.open().unwrap_err();
    assert!(err.is_unavailable());
    assert_eq!(manager.options().connection_retries, 10);
    assert_eq!(backend.open_attempts(), 11);
    Ok(())
}

#[test]
fn retry_bound_follows_options() -> Result<(), Box<dyn std::error::Error>> {
    let backend = sql_exec_core::test_utils::ScriptedBackend::new(Dialect::Sqlite);
    backend.stay_unavailable();
    let manager = DatabaseManager::new(
        backend.clone(),
        ManagerOptions::default()
            .with_connection_retries(2)
            .with_retry_delay_ms(0),
    );

    let err = manager
        .cached_statement(statement_here!(), "SELECT 1")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert_eq!(backend.open_attempts(), 3);
    assert!(!manager.has_active_transaction());
    Ok(())
}

#[test]
fn recovers_once_the_database_comes_back() -> Result<(), Box<dyn std::error::Error>> {
    let (backend, manager) = scripted_manager(Dialect::Sqlite, ImplicitExecutionPolicy::Strict);
    backend.fail_opens(10);

    manager.open()?;
    assert_eq!(backend.open_attempts(), 11);
    Ok(())
}

#[test]
fn lost_connection_drops_transaction_and_cache() -> Result<(), Box<dyn std::error::Error>> {
    let (backend, manager) = scripted_manager(Dialect::Sqlite, ImplicitExecutionPolicy::Strict);
    let here = statement_here!();

    manager.start_transaction()?;
    let mut statement = manager.cached_statement(here, "UPDATE t SET v=1")?;
    backend.fail_next(ErrorKind::Unavailable);
    assert!(statement.execute().unwrap_err().is_unavailable());
    drop(statement);

    assert!(!manager.has_active_transaction());
    assert_eq!(manager.cached_statements_count(), 0);
    assert_eq!(backend.closed_connections(), 1);
    // The connection is gone, so there was nothing to roll back on.
    assert_eq!(backend.rollbacks(), 0);

    let mut statement = manager.cached_statement(here, "UPDATE t SET v=1")?;
    statement.execute()?;
    drop(statement);
    assert_eq!(backend.open_attempts(), 2);
    assert_eq!(backend.compiled(), 2);
    Ok(())
}

#[test]
fn database_errors_keep_connection_and_cache() -> Result<(), Box<dyn std::error::Error>> {
    let (backend, manager) = scripted_manager(Dialect::Sqlite, ImplicitExecutionPolicy::Strict);
    let here = statement_here!();

    {
        let mut statement = manager.cached_statement(here, "INSERT INTO t VALUES(1)")?;
        statement.execute()?;
    }
    {
        let mut statement = manager.cached_statement(here, "INSERT INTO t VALUES(1)")?;
        backend.fail_next(ErrorKind::Database);
        assert_eq!(statement.execute().unwrap_err().kind(), ErrorKind::Database);
    }

    assert_eq!(manager.cached_statements_count(), 1);
    assert_eq!(backend.closed_connections(), 0);
    assert_eq!(backend.open_attempts(), 1);
    Ok(())
}
