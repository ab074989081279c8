#![cfg(feature = "test-utils")]

mod common;

use sql_exec_core::prelude::*;

use common::scripted_manager;

#[test]
fn done_latch_through_the_handle() -> Result<(), Box<dyn std::error::Error>> {
    let (backend, manager) = scripted_manager(Dialect::Sqlite, ImplicitExecutionPolicy::Strict);
    backend.set_rows(
        "SELECT id, name FROM t",
        2,
        vec![
            vec![Value::Integer64(1), Value::Utf8Text("a".into())],
            vec![Value::Integer64(2), Value::Null],
        ],
    );

    let mut statement = manager.cached_statement(statement_here!(), "SELECT id, name FROM t")?;
    assert_eq!(
        statement.get_result_field(0).unwrap_err().kind(),
        ErrorKind::BadSequenceOfCalls
    );
    statement.execute()?;
    assert_eq!(statement.get_result_fields_count()?, 2);

    let mut names = Vec::new();
    while !statement.is_done()? {
        names.push(statement.get_result_field(1)?);
        statement.next()?;
    }
    assert_eq!(names, vec![Value::Utf8Text("a".into()), Value::Null]);

    for _ in 0..2 {
        assert_eq!(statement.next().unwrap_err().kind(), ErrorKind::BadSequenceOfCalls);
        assert!(statement.is_done()?);
    }
    // Ignored once done.
    statement.set_result_field_type(0, ValueType::Utf8Text)?;
    assert_eq!(statement.execute().unwrap_err().kind(), ErrorKind::BadSequenceOfCalls);
    Ok(())
}

#[test]
fn result_field_types_coerce_the_current_row() -> Result<(), Box<dyn std::error::Error>> {
    let (backend, manager) = scripted_manager(Dialect::Sqlite, ImplicitExecutionPolicy::Strict);
    backend.set_rows(
        "SELECT n FROM t",
        1,
        vec![vec![Value::Utf8Text("12".into())], vec![Value::Utf8Text("x".into())]],
    );

    let mut statement = manager.cached_statement(statement_here!(), "SELECT n FROM t")?;
    statement.execute()?;
    assert_eq!(statement.get_result_field(0)?, Value::Utf8Text("12".into()));
    statement.set_result_field_type(0, ValueType::Integer64)?;
    assert_eq!(statement.get_result_field(0)?, Value::Integer64(12));

    statement.next()?;
    assert_eq!(
        statement.get_result_field(0).unwrap_err().kind(),
        ErrorKind::TypeMismatch
    );
    assert_eq!(
        statement.set_result_field_type(3, ValueType::Integer64).unwrap_err().kind(),
        ErrorKind::OutOfRange
    );
    Ok(())
}

#[test]
fn statement_without_rows_is_done_immediately() -> Result<(), Box<dyn std::error::Error>> {
    let (_backend, manager) = scripted_manager(Dialect::MySql, ImplicitExecutionPolicy::Strict);

    let mut statement = manager.cached_statement(statement_here!(), "DELETE FROM t")?;
    statement.execute()?;
    assert!(statement.is_done()?);
    assert_eq!(statement.get_result_fields_count()?, 0);
    Ok(())
}

#[test]
fn missing_parameter_is_reported_before_execution() -> Result<(), Box<dyn std::error::Error>> {
    let (backend, manager) = scripted_manager(Dialect::Sqlite, ImplicitExecutionPolicy::Strict);

    let mut statement = manager.cached_statement(statement_here!(), "SELECT ${id}")?;
    statement.set_parameter_type("id", ValueType::Integer64)?;
    assert_eq!(
        statement.execute_with(&Dictionary::new()).unwrap_err().kind(),
        ErrorKind::InexistentItem
    );

    let mut params = Dictionary::new();
    params.set_utf8("id", "7");
    assert_eq!(
        statement.execute_with(&params).unwrap_err().kind(),
        ErrorKind::TypeMismatch
    );
    assert!(backend.executed().is_empty());
    Ok(())
}
