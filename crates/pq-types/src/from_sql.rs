//! Trait for converting from SQL values to Rust types.

use bytes::Bytes;
use pq_protocol::{Interval, Oid};

use crate::array::SqlArray;
use crate::error::TypeError;
use crate::registry::CustomValue;
use crate::value::SqlValue;

/// Trait for types that can be converted from SQL values.
///
/// This trait is implemented for common Rust types to enable
/// type-safe extraction of values from query results.
pub trait FromSql: Sized {
    /// Convert from a SQL value to this type.
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError>;

    /// Convert from an optional SQL value.
    ///
    /// Returns `None` if the value is NULL.
    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_sql(value).map(Some)
        }
    }
}

fn mismatch(expected: &'static str, value: &SqlValue) -> TypeError {
    match value {
        SqlValue::Null => TypeError::UnexpectedNull,
        _ => TypeError::TypeMismatch {
            expected,
            actual: value.type_name().to_string(),
        },
    }
}

impl FromSql for bool {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Bool(v) => Ok(*v),
            _ => Err(mismatch("bool", value)),
        }
    }
}

impl FromSql for i16 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::SmallInt(v) => Ok(*v),
            _ => Err(mismatch("i16", value)),
        }
    }
}

impl FromSql for i32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Int(v) => Ok(*v),
            SqlValue::SmallInt(v) => Ok(i32::from(*v)),
            _ => Err(mismatch("i32", value)),
        }
    }
}

impl FromSql for i64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::BigInt(v) => Ok(*v),
            SqlValue::Int(v) => Ok(i64::from(*v)),
            SqlValue::SmallInt(v) => Ok(i64::from(*v)),
            SqlValue::Oid(v) => Ok(i64::from(*v)),
            _ => Err(mismatch("i64", value)),
        }
    }
}

impl FromSql for Oid {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Oid(v) => Ok(*v),
            _ => Err(mismatch("u32", value)),
        }
    }
}

impl FromSql for f32 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Float(v) => Ok(*v),
            _ => Err(mismatch("f32", value)),
        }
    }
}

impl FromSql for f64 {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Double(v) | SqlValue::Timestamp(v) | SqlValue::TimestampTz(v) => Ok(*v),
            SqlValue::Float(v) => Ok(f64::from(*v)),
            _ => Err(mismatch("f64", value)),
        }
    }
}

impl FromSql for String {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::String(v) | SqlValue::Json(v) => Ok(v.clone()),
            SqlValue::Char(c) => Ok(char::from(*c).to_string()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromSql for Bytes {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Binary(v) | SqlValue::Unknown { bytes: v, .. } => Ok(v.clone()),
            _ => Err(mismatch("Bytes", value)),
        }
    }
}

impl FromSql for Interval {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Interval(v) => Ok(*v),
            _ => Err(mismatch("Interval", value)),
        }
    }
}

impl FromSql for SqlArray {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Array(v) => Ok(v.clone()),
            _ => Err(mismatch("SqlArray", value)),
        }
    }
}

impl FromSql for CustomValue {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Custom(v) => Ok(v.clone()),
            _ => Err(mismatch("CustomValue", value)),
        }
    }
}

impl FromSql for SqlValue {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        Ok(value.clone())
    }

    fn from_sql_nullable(value: &SqlValue) -> Result<Option<Self>, TypeError> {
        Ok(Some(value.clone()))
    }
}

/// Arrays convert element-wise in row-major order; use `Vec<Option<T>>`
/// when elements may be NULL.
impl<T: FromSql> FromSql for Vec<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Array(array) => array.iter().map(T::from_sql).collect(),
            _ => Err(mismatch("Vec", value)),
        }
    }
}

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        T::from_sql_nullable(value)
    }
}

#[cfg(feature = "chrono")]
fn datetime_from_secs(secs: f64) -> Result<chrono::DateTime<chrono::Utc>, TypeError> {
    if !secs.is_finite() {
        return Err(TypeError::InvalidDateTime(format!(
            "{secs} has no calendar representation"
        )));
    }
    let mut whole = secs.floor();
    let mut micros = ((secs - whole) * 1_000_000.0).round();
    if micros >= 1_000_000.0 {
        whole += 1.0;
        micros = 0.0;
    }
    chrono::DateTime::from_timestamp(whole as i64, micros as u32 * 1_000)
        .ok_or_else(|| TypeError::InvalidDateTime(format!("{secs} is out of range")))
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::DateTime<chrono::Utc> {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::TimestampTz(v) | SqlValue::Timestamp(v) => datetime_from_secs(*v),
            _ => Err(mismatch("DateTime<Utc>", value)),
        }
    }
}

#[cfg(feature = "chrono")]
impl FromSql for chrono::NaiveDateTime {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Timestamp(v) | SqlValue::TimestampTz(v) => {
                datetime_from_secs(*v).map(|dt| dt.naive_utc())
            }
            _ => Err(mismatch("NaiveDateTime", value)),
        }
    }
}

#[cfg(feature = "json")]
impl FromSql for serde_json::Value {
    fn from_sql(value: &SqlValue) -> Result<Self, TypeError> {
        match value {
            SqlValue::Json(s) | SqlValue::String(s) => {
                serde_json::from_str(s).map_err(|e| TypeError::InvalidEncoding(e.to_string()))
            }
            _ => Err(mismatch("serde_json::Value", value)),
        }
    }
}
