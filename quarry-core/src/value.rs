//! Value types for SQL parameters

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A SQL value that can be bound as a parameter or read from a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Integer value, all integer widths widen to `i64`
    Int(i64),
    /// Double precision float
    Double(f64),
    /// Boolean value
    Bool(bool),
    /// String value
    String(String),
    /// Timestamp in UTC
    Date(DateTime<Utc>),
    /// JSON document or opaque binary payload
    Json(Vec<u8>),
    /// UUID value
    Uuid(Uuid),
    /// Null value
    Null,
}

impl Value {
    /// Build a JSON value from any serializable type
    pub fn json<T: Serialize>(value: &T) -> crate::Result<Self> {
        Ok(Value::Json(serde_json::to_vec(value)?))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Json(_) => "json",
            Value::Uuid(_) => "uuid",
            Value::Null => "null",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(value) => Some(*value),
            Value::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_json_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Json(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Render this value as inline SQL text.
    ///
    /// Only for non-parameterized contexts such as column defaults in DDL;
    /// query predicates always go through bindings.
    ///
    /// # Examples
    /// ```
    /// use quarry_core::Value;
    ///
    /// assert_eq!(Value::from("O'Brien").literal(), "'O''Brien'");
    /// assert_eq!(Value::Null.literal(), "NULL");
    /// ```
    pub fn literal(&self) -> String {
        match self {
            Value::Int(value) => value.to_string(),
            Value::Double(value) => format!("{value:?}"),
            Value::Bool(value) => value.to_string(),
            Value::String(value) => quote(value),
            Value::Date(value) => quote(&value.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            Value::Json(bytes) => quote(&String::from_utf8_lossy(bytes)),
            Value::Uuid(value) => quote(&value.hyphenated().to_string()),
            Value::Null => "NULL".to_string(),
        }
    }

    /// Convert to a `serde_json::Value` for row deserialization.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(value) => serde_json::Value::from(*value),
            Value::Double(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(value) => serde_json::Value::Bool(*value),
            Value::String(value) => serde_json::Value::String(value.clone()),
            Value::Date(value) => serde_json::Value::String(value.to_rfc3339()),
            Value::Json(bytes) => serde_json::from_slice(bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
            }),
            Value::Uuid(value) => serde_json::Value::String(value.hyphenated().to_string()),
            Value::Null => serde_json::Value::Null,
        }
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(val: $ty) -> Self {
                    Value::Int(i64::from(val))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(val: f32) -> Self {
        Value::Double(f64::from(val))
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::Double(val)
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Value::Bool(val)
    }
}

impl From<String> for Value {
    fn from(val: String) -> Self {
        Value::String(val)
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Value::String(val.to_string())
    }
}

impl From<&String> for Value {
    fn from(val: &String) -> Self {
        Value::String(val.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(val: DateTime<Utc>) -> Self {
        Value::Date(val)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(val: NaiveDateTime) -> Self {
        Value::Date(val.and_utc())
    }
}

impl From<Uuid> for Value {
    fn from(val: Uuid) -> Self {
        Value::Uuid(val)
    }
}

impl From<serde_json::Value> for Value {
    fn from(val: serde_json::Value) -> Self {
        Value::Json(val.to_string().into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(val: Vec<u8>) -> Self {
        Value::Json(val)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
