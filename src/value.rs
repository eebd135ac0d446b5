use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde::Serialize;
use std::{fmt, str::FromStr};

use crate::error::{Error, Result};

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

/// Logical column types and the storage token each one maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Real,
    Text,
    Blob,
    /// Stored as INTEGER 0/1.
    Boolean,
}

impl DataType {
    /// Storage token used in generated DDL.
    pub fn sql_type(&self) -> &'static str {
        match self {
            DataType::Integer | DataType::Boolean => "INTEGER",
            DataType::Real => "REAL",
            DataType::Text => "TEXT",
            DataType::Blob => "BLOB",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Integer => "integer",
            DataType::Real => "real",
            DataType::Text => "text",
            DataType::Blob => "blob",
            DataType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "i64" => Ok(DataType::Integer),
            "float" | "real" | "f64" => Ok(DataType::Real),
            "str" | "text" | "string" => Ok(DataType::Text),
            "bytes" | "blob" => Ok(DataType::Blob),
            "bool" | "boolean" => Ok(DataType::Boolean),
            _ => Err(Error::UnsupportedType(s.to_string())),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the value's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::Boolean(_) => "boolean",
        }
    }

    /// Whether this value can be bound to a column of type `ty`. Null fits anywhere.
    pub fn fits(&self, ty: DataType) -> bool {
        matches!(
            (self, ty),
            (Value::Null, _)
                | (Value::Integer(_), DataType::Integer)
                | (Value::Integer(_), DataType::Real)
                | (Value::Real(_), DataType::Real)
                | (Value::Text(_), DataType::Text)
                | (Value::Blob(_), DataType::Blob)
                | (Value::Boolean(_), DataType::Boolean)
        )
    }

    /// The value as it reads back from a column of type `ty`: integers bound
    /// to a REAL column come back as reals.
    pub fn widen(self, ty: DataType) -> Self {
        match (self, ty) {
            (Value::Integer(v), DataType::Real) => Value::Real(v as f64),
            (value, _) => value,
        }
    }

    /// Converts a raw SQLite value into a typed value for a column of type `ty`.
    pub fn from_sql(value: SqlValue, ty: DataType) -> Self {
        match (value, ty) {
            (SqlValue::Null, _) => Value::Null,
            (SqlValue::Integer(v), DataType::Boolean) => Value::Boolean(v != 0),
            (SqlValue::Integer(v), DataType::Real) => Value::Real(v as f64),
            (SqlValue::Integer(v), _) => Value::Integer(v),
            (SqlValue::Real(v), _) => Value::Real(v),
            (SqlValue::Text(v), _) => Value::Text(v),
            (SqlValue::Blob(v), _) => Value::Blob(v),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Real(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(&v[..])),
            Value::Boolean(v) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*v))),
        })
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// Extraction hands the original value back on mismatch.
impl TryFrom<Value> for i64 {
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Integer(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Real(v) => Ok(v),
            Value::Integer(v) => Ok(v as f64),
            other => Err(other),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Blob(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Boolean(v) => Ok(v),
            Value::Integer(v) => Ok(v != 0),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_tokens() {
        assert_eq!(DataType::Integer.sql_type(), "INTEGER");
        assert_eq!(DataType::Real.sql_type(), "REAL");
        assert_eq!(DataType::Text.sql_type(), "TEXT");
        assert_eq!(DataType::Blob.sql_type(), "BLOB");
        assert_eq!(DataType::Boolean.sql_type(), "INTEGER");
    }

    #[test]
    fn test_parse_type_names() {
        assert_eq!("str".parse::<DataType>().unwrap(), DataType::Text);
        assert_eq!("INT".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!("float".parse::<DataType>().unwrap(), DataType::Real);
        assert_eq!("bytes".parse::<DataType>().unwrap(), DataType::Blob);
        assert_eq!("bool".parse::<DataType>().unwrap(), DataType::Boolean);

        let err = "varchar".parse::<DataType>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(ref name) if name == "varchar"));
    }

    #[test]
    fn test_booleans_come_back_from_integers() {
        assert_eq!(
            Value::from_sql(SqlValue::Integer(1), DataType::Boolean),
            Value::Boolean(true)
        );
        assert_eq!(
            Value::from_sql(SqlValue::Integer(0), DataType::Boolean),
            Value::Boolean(false)
        );
        assert_eq!(
            Value::from_sql(SqlValue::Integer(3), DataType::Real),
            Value::Real(3.0)
        );
        assert_eq!(Value::from_sql(SqlValue::Null, DataType::Text), Value::Null);
    }

    #[test]
    fn test_widen_integers_for_real_columns() {
        assert_eq!(Value::Integer(3).widen(DataType::Real), Value::Real(3.0));
        assert_eq!(Value::Integer(3).widen(DataType::Integer), Value::Integer(3));
        assert_eq!(Value::Null.widen(DataType::Real), Value::Null);
    }

    #[test]
    fn test_fits() {
        assert!(Value::Null.fits(DataType::Blob));
        assert!(Value::Integer(1).fits(DataType::Real));
        assert!(!Value::Real(1.5).fits(DataType::Integer));
        assert!(!Value::Text("1".into()).fits(DataType::Integer));
        assert!(!Value::Integer(1).fits(DataType::Boolean));
    }
}
