//! SQL value representation.

use bytes::Bytes;
use pq_protocol::{Interval, Oid};

use crate::array::SqlArray;
use crate::registry::CustomValue;

/// A decoded column value or a parameter value ready for encoding.
///
/// Temporal values are seconds since the Unix epoch; the server's
/// `infinity` and `-infinity` map onto the float infinities.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SqlValue {
    /// NULL value.
    #[default]
    Null,
    /// Boolean value (`boolean`).
    Bool(bool),
    /// Single byte character (`"char"`).
    Char(u8),
    /// 16-bit signed integer (`smallint`).
    SmallInt(i16),
    /// 32-bit signed integer (`integer`).
    Int(i32),
    /// 64-bit signed integer (`bigint`).
    BigInt(i64),
    /// Object identifier (`oid`, `regclass`).
    Oid(Oid),
    /// 32-bit floating point (`real`).
    Float(f32),
    /// 64-bit floating point (`double precision`).
    Double(f64),
    /// Text value (`text`, `varchar`, `name`, `character(n)`).
    String(String),
    /// JSON document text (`json`).
    Json(String),
    /// Binary value (`bytea`).
    Binary(Bytes),
    /// Timestamp without time zone, seconds since the Unix epoch.
    Timestamp(f64),
    /// Timestamp with time zone, seconds since the Unix epoch.
    TimestampTz(f64),
    /// Time interval.
    Interval(Interval),
    /// Array of any built-in scalar.
    Array(SqlArray),
    /// Value produced by a registered codec.
    Custom(CustomValue),
    /// Value of a type with no codec, kept as raw bytes.
    Unknown {
        /// Type id reported by the server.
        type_id: Oid,
        /// Raw payload.
        bytes: Bytes,
    },
}

impl SqlValue {
    /// Check if the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as a bool, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an i32, if it is a 16- or 32-bit integer.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::SmallInt(v) => Some(i32::from(*v)),
            _ => None,
        }
    }

    /// Get the value as an i64, if it is an integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::BigInt(v) => Some(*v),
            Self::Int(v) => Some(i64::from(*v)),
            Self::SmallInt(v) => Some(i64::from(*v)),
            Self::Oid(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Get the value as an f64, if it is a float or a timestamp.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) | Self::Timestamp(v) | Self::TimestampTz(v) => Some(*v),
            Self::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Get the value as a string slice, if it is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) | Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as bytes, if it is binary or an unknown type.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(v) => Some(v),
            Self::Unknown { bytes, .. } => Some(bytes),
            _ => None,
        }
    }

    /// Get the value as an array, if it is one.
    #[must_use]
    pub fn as_array(&self) -> Option<&SqlArray> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as an interval, if it is one.
    #[must_use]
    pub fn as_interval(&self) -> Option<Interval> {
        match self {
            Self::Interval(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a registered-codec value, if it is one.
    #[must_use]
    pub fn as_custom(&self) -> Option<&CustomValue> {
        match self {
            Self::Custom(v) => Some(v),
            _ => None,
        }
    }

    /// Get the type name as a string.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "boolean",
            Self::Char(_) => "\"char\"",
            Self::SmallInt(_) => "smallint",
            Self::Int(_) => "integer",
            Self::BigInt(_) => "bigint",
            Self::Oid(_) => "oid",
            Self::Float(_) => "real",
            Self::Double(_) => "double precision",
            Self::String(_) => "text",
            Self::Json(_) => "json",
            Self::Binary(_) => "bytea",
            Self::Timestamp(_) => "timestamp without time zone",
            Self::TimestampTz(_) => "timestamp with time zone",
            Self::Interval(_) => "interval",
            Self::Array(_) => "array",
            Self::Custom(_) => "registered type",
            Self::Unknown { .. } => "unknown",
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        Self::SmallInt(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Bytes> for SqlValue {
    fn from(v: Bytes) -> Self {
        Self::Binary(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(v))
    }
}

impl From<Interval> for SqlValue {
    fn from(v: Interval) -> Self {
        Self::Interval(v)
    }
}

impl From<SqlArray> for SqlValue {
    fn from(v: SqlArray) -> Self {
        Self::Array(v)
    }
}

impl From<CustomValue> for SqlValue {
    fn from(v: CustomValue) -> Self {
        Self::Custom(v)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}
