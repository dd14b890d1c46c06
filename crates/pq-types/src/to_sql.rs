//! Trait for converting Rust types to SQL values.

use bytes::Bytes;
use pq_protocol::types::oid;
use pq_protocol::{BuiltinType, Interval, Oid};

use crate::array::SqlArray;
use crate::error::TypeError;
use crate::value::SqlValue;

/// Type id that lets the server infer a parameter's type.
pub const UNSPECIFIED: Oid = 0;

/// Trait for types that can be converted to SQL values.
///
/// This trait is implemented for common Rust types to enable
/// type-safe parameter binding in queries.
pub trait ToSql {
    /// Convert this value to a SQL value.
    fn to_sql(&self) -> Result<SqlValue, TypeError>;

    /// The type id this value naturally encodes as.
    ///
    /// Used when a statement does not declare the parameter's type.
    fn type_id(&self) -> Oid;

    /// Get the SQL type name for this value.
    fn sql_type(&self) -> &'static str {
        BuiltinType::from_oid(self.type_id()).map_or("unknown", BuiltinType::name)
    }
}

macro_rules! scalar_to_sql {
    ($($ty:ty => $variant:ident, $oid:expr;)*) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> Result<SqlValue, TypeError> {
                    Ok(SqlValue::$variant(*self))
                }

                fn type_id(&self) -> Oid {
                    $oid
                }
            }
        )*
    };
}

scalar_to_sql! {
    bool => Bool, oid::BOOL;
    i16 => SmallInt, oid::INT2;
    i32 => Int, oid::INT4;
    i64 => BigInt, oid::INT8;
    u32 => Oid, oid::OID;
    f32 => Float, oid::FLOAT4;
    f64 => Double, oid::FLOAT8;
    Interval => Interval, oid::INTERVAL;
}

impl ToSql for str {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::String(self.to_owned()))
    }

    fn type_id(&self) -> Oid {
        oid::TEXT
    }
}

impl ToSql for String {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::String(self.clone()))
    }

    fn type_id(&self) -> Oid {
        oid::TEXT
    }
}

impl ToSql for [u8] {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Binary(Bytes::copy_from_slice(self)))
    }

    fn type_id(&self) -> Oid {
        oid::BYTEA
    }
}

impl ToSql for Bytes {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Binary(self.clone()))
    }

    fn type_id(&self) -> Oid {
        oid::BYTEA
    }
}

impl ToSql for SqlArray {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Array(self.clone()))
    }

    fn type_id(&self) -> Oid {
        BuiltinType::from_oid(self.element_type())
            .and_then(BuiltinType::array_of)
            .map_or(UNSPECIFIED, BuiltinType::oid)
    }
}

/// A value that is already in codec form. Its type id is only known for
/// the built-in variants.
impl ToSql for SqlValue {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(self.clone())
    }

    fn type_id(&self) -> Oid {
        match self {
            SqlValue::Bool(_) => oid::BOOL,
            SqlValue::Char(_) => oid::CHAR,
            SqlValue::SmallInt(_) => oid::INT2,
            SqlValue::Int(_) => oid::INT4,
            SqlValue::BigInt(_) => oid::INT8,
            SqlValue::Oid(_) => oid::OID,
            SqlValue::Float(_) => oid::FLOAT4,
            SqlValue::Double(_) => oid::FLOAT8,
            SqlValue::String(_) => oid::TEXT,
            SqlValue::Json(_) => oid::JSON,
            SqlValue::Binary(_) => oid::BYTEA,
            SqlValue::Timestamp(_) => oid::TIMESTAMP,
            SqlValue::TimestampTz(_) => oid::TIMESTAMPTZ,
            SqlValue::Interval(_) => oid::INTERVAL,
            SqlValue::Array(a) => a.type_id(),
            SqlValue::Unknown { type_id, .. } => *type_id,
            SqlValue::Custom(c) => c.type_id(),
            SqlValue::Null => UNSPECIFIED,
        }
    }
}

macro_rules! slice_to_sql {
    ($($ty:ty => $elem:expr, $array:expr;)*) => {
        $(
            impl ToSql for [$ty] {
                fn to_sql(&self) -> Result<SqlValue, TypeError> {
                    let elements = self.iter().map(ToSql::to_sql).collect::<Result<_, _>>()?;
                    Ok(SqlValue::Array(SqlArray::from_elements($elem, elements)))
                }

                fn type_id(&self) -> Oid {
                    $array
                }
            }
        )*
    };
}

slice_to_sql! {
    bool => oid::BOOL, oid::BOOL_ARRAY;
    i16 => oid::INT2, oid::INT2_ARRAY;
    i32 => oid::INT4, oid::INT4_ARRAY;
    i64 => oid::INT8, oid::INT8_ARRAY;
    f32 => oid::FLOAT4, oid::FLOAT4_ARRAY;
    f64 => oid::FLOAT8, oid::FLOAT8_ARRAY;
    String => oid::TEXT, oid::TEXT_ARRAY;
    &str => oid::TEXT, oid::TEXT_ARRAY;
    Option<i32> => oid::INT4, oid::INT4_ARRAY;
    Option<i64> => oid::INT8, oid::INT8_ARRAY;
    Option<String> => oid::TEXT, oid::TEXT_ARRAY;
}

impl<T> ToSql for Vec<T>
where
    [T]: ToSql,
{
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        self.as_slice().to_sql()
    }

    fn type_id(&self) -> Oid {
        self.as_slice().type_id()
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        match self {
            Some(v) => v.to_sql(),
            None => Ok(SqlValue::Null),
        }
    }

    fn type_id(&self) -> Oid {
        match self {
            Some(v) => v.type_id(),
            None => UNSPECIFIED,
        }
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        (*self).to_sql()
    }

    fn type_id(&self) -> Oid {
        (*self).type_id()
    }
}

#[cfg(feature = "chrono")]
impl ToSql for chrono::DateTime<chrono::Utc> {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        let secs = self.timestamp() as f64 + f64::from(self.timestamp_subsec_micros()) / 1e6;
        Ok(SqlValue::TimestampTz(secs))
    }

    fn type_id(&self) -> Oid {
        oid::TIMESTAMPTZ
    }
}

#[cfg(feature = "chrono")]
impl ToSql for chrono::NaiveDateTime {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        let utc = self.and_utc();
        let secs = utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_micros()) / 1e6;
        Ok(SqlValue::Timestamp(secs))
    }

    fn type_id(&self) -> Oid {
        oid::TIMESTAMP
    }
}

#[cfg(feature = "json")]
impl ToSql for serde_json::Value {
    fn to_sql(&self) -> Result<SqlValue, TypeError> {
        Ok(SqlValue::Json(self.to_string()))
    }

    fn type_id(&self) -> Oid {
        oid::JSON
    }
}
