use std::error::Error;

use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::error::SqlExecError;
use crate::types::{Value, ValueType};

/// Native type a parameter slot is prepared with.
///
/// # Errors
/// Returns `SqlExecError::BadSequenceOfCalls` for a slot whose type was never declared.
pub fn declared_type(name: &str, ty: ValueType) -> Result<Type, SqlExecError> {
    match ty {
        ValueType::Integer64 => Ok(Type::INT8),
        ValueType::Utf8Text => Ok(Type::TEXT),
        ValueType::BinaryBlob => Ok(Type::BYTEA),
        ValueType::LargeObject => Ok(Type::OID),
        ValueType::Null => Err(SqlExecError::BadSequenceOfCalls(format!(
            "the type of parameter {name:?} was not set"
        ))),
    }
}

/// One bound argument, with large objects already replaced by their OID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PgParam {
    Null,
    Int8(i64),
    Text(String),
    Bytea(Vec<u8>),
    Oid(u32),
}

impl PgParam {
    /// Convert a value that does not live in the large-object store.
    ///
    /// # Errors
    /// Returns `SqlExecError::Internal` for a `LargeObject`, which must be written first.
    pub fn inline(value: &Value) -> Result<Self, SqlExecError> {
        match value {
            Value::Null => Ok(PgParam::Null),
            Value::Integer64(i) => Ok(PgParam::Int8(*i)),
            Value::Utf8Text(s) => Ok(PgParam::Text(s.clone())),
            Value::BinaryBlob(bytes) => Ok(PgParam::Bytea(bytes.clone())),
            Value::LargeObject(_) => Err(SqlExecError::Internal(
                "large objects are bound by OID".to_string(),
            )),
        }
    }
}

impl ToSql for PgParam {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            PgParam::Null => Ok(IsNull::Yes),
            PgParam::Int8(i) => i.to_sql(ty, out),
            PgParam::Text(s) => s.to_sql(ty, out),
            PgParam::Bytea(bytes) => bytes.to_sql(ty, out),
            PgParam::Oid(oid) => oid.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT8 | Type::TEXT | Type::VARCHAR | Type::BYTEA | Type::OID
        )
    }

    to_sql_checked!();
}

/// Borrow a list of parameters as the slice tokio-postgres expects.
#[must_use]
pub fn as_refs(params: &[PgParam]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn undeclared_slots_cannot_be_prepared() {
        assert_eq!(declared_type("a", ValueType::LargeObject).unwrap(), Type::OID);
        assert_eq!(
            declared_type("a", ValueType::Null).unwrap_err().kind(),
            ErrorKind::BadSequenceOfCalls
        );
    }

    #[test]
    fn null_binds_for_any_declared_type() {
        let mut out = bytes::BytesMut::new();
        assert!(matches!(
            PgParam::Null.to_sql_checked(&Type::BYTEA, &mut out).unwrap(),
            IsNull::Yes
        ));
        assert!(!<PgParam as ToSql>::accepts(&Type::FLOAT8));
    }
}
