use chrono::{DateTime, Utc};

/// Logical column/parameter type, independent of the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbType {
    /// Variable-length unicode text
    #[default]
    String,
    /// Variable-length non-unicode text
    AnsiString,
    StringFixed,
    AnsiStringFixed,
    Boolean,
    Int16,
    Int32,
    Int64,
    Decimal,
    Double,
    DateTime,
    Binary,
}

impl DbType {
    /// Variable-length text types get an explicit size bound.
    pub fn is_variable_text(self) -> bool {
        matches!(self, DbType::String | DbType::AnsiString)
    }
}

/// Parameter value as handed to the provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DbValue {
    /// Database NULL
    Null,
    /// Host-side "no value supplied" marker; never reaches a provider
    #[default]
    Missing,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl DbValue {
    pub fn is_null_like(&self) -> bool {
        matches!(self, DbValue::Null | DbValue::Missing)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DbValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

/// Explicit "no value" sentinel for call sites that want to say so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoValue;

impl From<NoValue> for DbValue {
    fn from(_: NoValue) -> Self {
        DbValue::Missing
    }
}

impl From<bool> for DbValue {
    fn from(value: bool) -> Self {
        DbValue::Bool(value)
    }
}

impl From<i16> for DbValue {
    fn from(value: i16) -> Self {
        DbValue::Int(i64::from(value))
    }
}

impl From<i32> for DbValue {
    fn from(value: i32) -> Self {
        DbValue::Int(i64::from(value))
    }
}

impl From<i64> for DbValue {
    fn from(value: i64) -> Self {
        DbValue::Int(value)
    }
}

impl From<f64> for DbValue {
    fn from(value: f64) -> Self {
        DbValue::Real(value)
    }
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        DbValue::Text(value.to_string())
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        DbValue::Text(value)
    }
}

impl From<Vec<u8>> for DbValue {
    fn from(value: Vec<u8>) -> Self {
        DbValue::Bytes(value)
    }
}

impl From<DateTime<Utc>> for DbValue {
    fn from(value: DateTime<Utc>) -> Self {
        DbValue::Timestamp(value)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(DbValue::Null, Into::into)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// A provider-native parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DbParameter {
    pub name: String,
    pub db_type: DbType,
    pub value: DbValue,
    pub size: Option<usize>,
    pub direction: ParameterDirection,
}
