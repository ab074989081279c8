use sql_exec_core::prelude::*;

#[test]
fn manager_options_fill_in_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let options: ManagerOptions = serde_json::from_str(r#"{ "connection_retries": 2 }"#)?;
    assert_eq!(options.connection_retries, 2);
    assert_eq!(options.retry_delay_ms, 1000);
    assert_eq!(options.implicit_policy, ImplicitExecutionPolicy::default());

    let options: ManagerOptions = serde_json::from_str(
        r#"{ "retry_delay_ms": 0, "implicit_policy": "Lenient" }"#,
    )?;
    assert_eq!(options.connection_retries, 10);
    assert_eq!(options.retry_delay(), std::time::Duration::ZERO);
    assert_eq!(options.implicit_policy, ImplicitExecutionPolicy::Lenient);
    Ok(())
}

#[test]
fn manager_options_round_trip_through_json() -> Result<(), Box<dyn std::error::Error>> {
    let options = ManagerOptions::default()
        .with_connection_retries(4)
        .with_implicit_policy(ImplicitExecutionPolicy::Strict);
    let json = serde_json::to_string(&options)?;
    assert_eq!(serde_json::from_str::<ManagerOptions>(&json)?, options);
    Ok(())
}

#[test]
fn unknown_policy_is_rejected() {
    assert!(serde_json::from_str::<ManagerOptions>(r#"{ "implicit_policy": "Sloppy" }"#).is_err());
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_options_from_json() -> Result<(), Box<dyn std::error::Error>> {
    let options: SqliteOptions = serde_json::from_str(r#"{ "db_path": "app.db" }"#)?;
    assert_eq!(options, SqliteOptions::new("app.db"));
    assert!(!options.enable_wal);
    assert_eq!(options.statement_cache_capacity, 64);

    let built = DatabaseManager::sqlite_builder("app.db")
        .wal(true)
        .statement_cache_capacity(16)
        .finish();
    assert_eq!(
        built,
        SqliteOptions::new("app.db")
            .with_wal(true)
            .with_statement_cache_capacity(16)
    );
    Ok(())
}

#[cfg(feature = "postgres")]
#[test]
fn postgres_options_from_json() -> Result<(), Box<dyn std::error::Error>> {
    let options: PostgresOptions =
        serde_json::from_str(r#"{ "host": "db.internal", "advisory_lock": 42 }"#)?;
    assert_eq!(options.host, "db.internal");
    assert_eq!(options.port, 5432);
    assert_eq!(options.user, "postgres");
    assert_eq!(options.advisory_lock, Some(42));

    let manager = DatabaseManager::postgres_builder()
        .host("db.internal")
        .manager_options(ManagerOptions::default().with_connection_retries(0))
        .build()?;
    assert_eq!(manager.dialect(), Dialect::Postgres);
    assert_eq!(manager.options().connection_retries, 0);
    Ok(())
}
