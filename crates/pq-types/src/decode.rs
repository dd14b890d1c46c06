//! Binary decoding of column values.
//!
//! Dispatch order:
//!
//! 1. fixed-width built-ins (booleans, integers, floats, `"char"`, `oid`)
//! 2. variable-length built-ins (`bytea`, `text`, `varchar`, `name`, `json`)
//! 3. blank-padded `character(n)`
//! 4. timestamps and intervals
//! 5. arrays of the scalars above
//! 6. the type registry, then an opaque [`SqlValue::Unknown`] blob
//!
//! Unknown types never fail: they degrade to the raw bytes.

use bytes::Bytes;
use pq_protocol::array::ArrayReader;
use pq_protocol::temporal;
use pq_protocol::{BuiltinType, Interval, Oid, VARHDRSZ, wire};

use crate::array::SqlArray;
use crate::error::TypeError;
use crate::registry::TypeRegistry;
use crate::value::SqlValue;

/// Decode a column value using the process-wide registry.
///
/// `modifier` is the column's type modifier as reported by the server
/// (`-1` when unset).
pub fn decode_value(type_id: Oid, modifier: i32, raw: &[u8]) -> Result<SqlValue, TypeError> {
    decode_value_with(TypeRegistry::global(), type_id, modifier, raw)
}

/// Decode a column value, resolving non-built-in types through `registry`.
pub fn decode_value_with(
    registry: &TypeRegistry,
    type_id: Oid,
    modifier: i32,
    raw: &[u8],
) -> Result<SqlValue, TypeError> {
    match BuiltinType::from_oid(type_id) {
        Some(ty) => decode_builtin(ty, modifier, raw),
        None => decode_registered(registry, type_id, modifier, raw),
    }
}

/// Decode a value of a built-in type.
pub fn decode_builtin(ty: BuiltinType, modifier: i32, raw: &[u8]) -> Result<SqlValue, TypeError> {
    match ty {
        BuiltinType::Bool => decode_bool(raw),
        BuiltinType::Char => decode_char(raw),
        BuiltinType::Int2 => decode_smallint(raw),
        BuiltinType::Int4 => decode_int(raw),
        BuiltinType::Int8 => decode_bigint(raw),
        BuiltinType::Oid | BuiltinType::RegClass => decode_oid(raw),
        BuiltinType::Float4 => decode_float(raw),
        BuiltinType::Float8 => decode_double(raw),

        BuiltinType::Bytea => Ok(SqlValue::Binary(Bytes::copy_from_slice(raw))),
        BuiltinType::Text | BuiltinType::Varchar | BuiltinType::Name => {
            Ok(text_or_binary(raw, SqlValue::String))
        }
        BuiltinType::Json => Ok(text_or_binary(raw, SqlValue::Json)),
        BuiltinType::Bpchar => Ok(decode_bpchar(raw, modifier)),

        BuiltinType::Timestamp => decode_timestamp(raw).map(SqlValue::Timestamp),
        BuiltinType::TimestampTz => decode_timestamp(raw).map(SqlValue::TimestampTz),
        BuiltinType::Interval => decode_interval(raw),

        BuiltinType::BoolArray
        | BuiltinType::Int2Array
        | BuiltinType::Int4Array
        | BuiltinType::Int8Array
        | BuiltinType::Float4Array
        | BuiltinType::Float8Array
        | BuiltinType::TextArray
        | BuiltinType::VarcharArray
        | BuiltinType::TimestampArray
        | BuiltinType::TimestampTzArray => decode_array(ty, modifier, raw),
    }
}

fn decode_registered(
    registry: &TypeRegistry,
    type_id: Oid,
    modifier: i32,
    raw: &[u8],
) -> Result<SqlValue, TypeError> {
    let Some(entry) = registry.lookup(type_id) else {
        tracing::trace!(type_id, len = raw.len(), "no codec for type, passing raw bytes");
        return Ok(unknown(type_id, raw));
    };

    match entry.decode(raw, modifier) {
        Ok(value) => Ok(SqlValue::Custom(value)),
        Err(err @ TypeError::InconsistentCodecValue { .. }) => {
            tracing::warn!(type_id, error = %err, "discarding decoded value, passing raw bytes");
            Ok(unknown(type_id, raw))
        }
        Err(err) => Err(err),
    }
}

fn unknown(type_id: Oid, raw: &[u8]) -> SqlValue {
    SqlValue::Unknown {
        type_id,
        bytes: Bytes::copy_from_slice(raw),
    }
}

fn ensure(raw: &[u8], needed: usize) -> Result<(), TypeError> {
    if raw.len() < needed {
        return Err(TypeError::BufferTooSmall {
            needed,
            available: raw.len(),
        });
    }
    Ok(())
}

fn decode_bool(raw: &[u8]) -> Result<SqlValue, TypeError> {
    ensure(raw, 1)?;
    Ok(SqlValue::Bool(raw[0] != 0))
}

fn decode_char(raw: &[u8]) -> Result<SqlValue, TypeError> {
    ensure(raw, 1)?;
    Ok(SqlValue::Char(raw[0]))
}

fn decode_smallint(mut raw: &[u8]) -> Result<SqlValue, TypeError> {
    ensure(raw, 2)?;
    Ok(SqlValue::SmallInt(wire::read_i16(&mut raw)?))
}

fn decode_int(mut raw: &[u8]) -> Result<SqlValue, TypeError> {
    ensure(raw, 4)?;
    Ok(SqlValue::Int(wire::read_i32(&mut raw)?))
}

fn decode_bigint(mut raw: &[u8]) -> Result<SqlValue, TypeError> {
    ensure(raw, 8)?;
    Ok(SqlValue::BigInt(wire::read_i64(&mut raw)?))
}

fn decode_oid(mut raw: &[u8]) -> Result<SqlValue, TypeError> {
    ensure(raw, 4)?;
    Ok(SqlValue::Oid(wire::read_u32(&mut raw)?))
}

fn decode_float(mut raw: &[u8]) -> Result<SqlValue, TypeError> {
    ensure(raw, 4)?;
    Ok(SqlValue::Float(wire::read_f32(&mut raw)?))
}

fn decode_double(mut raw: &[u8]) -> Result<SqlValue, TypeError> {
    ensure(raw, 8)?;
    Ok(SqlValue::Double(wire::read_f64(&mut raw)?))
}

/// Text that is not valid UTF-8 (a non-UTF-8 `client_encoding`) is passed
/// through as [`SqlValue::Binary`] so the row stays readable.
fn text_or_binary(raw: &[u8], wrap: fn(String) -> SqlValue) -> SqlValue {
    match std::str::from_utf8(raw) {
        Ok(text) => wrap(text.to_owned()),
        Err(err) => {
            tracing::trace!(
                len = raw.len(),
                error = %err,
                "text payload is not UTF-8, passing raw bytes"
            );
            SqlValue::Binary(Bytes::copy_from_slice(raw))
        }
    }
}

/// `character(n)`: the modifier is `n + VARHDRSZ`. A payload shorter than
/// `n` characters is right-padded with spaces; a longer one is kept whole.
/// Without a modifier the payload is returned as is.
fn decode_bpchar(raw: &[u8], modifier: i32) -> SqlValue {
    let Ok(text) = std::str::from_utf8(raw) else {
        return text_or_binary(raw, SqlValue::String);
    };
    let mut text = text.to_owned();
    let declared = modifier.saturating_sub(VARHDRSZ);
    if let Ok(width) = usize::try_from(declared) {
        let chars = text.chars().count();
        if chars < width {
            text.extend(std::iter::repeat_n(' ', width - chars));
        }
    }
    SqlValue::String(text)
}

fn decode_timestamp(mut raw: &[u8]) -> Result<f64, TypeError> {
    ensure(raw, 8)?;
    Ok(temporal::read_timestamp(&mut raw)?)
}

fn decode_interval(mut raw: &[u8]) -> Result<SqlValue, TypeError> {
    ensure(raw, Interval::ENCODED_LEN)?;
    Ok(SqlValue::Interval(Interval::decode(&mut raw)?))
}

fn decode_array(ty: BuiltinType, modifier: i32, raw: &[u8]) -> Result<SqlValue, TypeError> {
    let Some(element) = ty.element() else {
        return Err(TypeError::UnsupportedConversion {
            from: ty.name().to_string(),
            to: "array",
        });
    };

    let reader = ArrayReader::new(raw)?.expect_element_type(element.oid())?;
    let dimensions = reader.header().dimensions.clone();
    // Every element costs at least its 4-byte length prefix, which bounds
    // what a corrupt header can make us allocate.
    let capacity = reader.remaining().min(raw.len() / 4);

    let mut elements = Vec::with_capacity(capacity);
    for item in reader {
        match item? {
            Some(bytes) => elements.push(decode_builtin(element, modifier, bytes)?),
            None => elements.push(SqlValue::Null),
        }
    }

    SqlArray::new(element.oid(), dimensions, elements).map(SqlValue::Array)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pq_protocol::types::oid;

    #[test]
    fn test_decode_fixed_scalars() {
        assert_eq!(
            decode_value(oid::BOOL, -1, &[1]).unwrap(),
            SqlValue::Bool(true)
        );
        assert_eq!(
            decode_value(oid::BOOL, -1, &[0]).unwrap(),
            SqlValue::Bool(false)
        );
        assert_eq!(
            decode_value(oid::INT2, -1, &[0xff, 0xfe]).unwrap(),
            SqlValue::SmallInt(-2)
        );
        assert_eq!(
            decode_value(oid::INT4, -1, &[0, 0, 1, 0]).unwrap(),
            SqlValue::Int(256)
        );
        assert_eq!(
            decode_value(oid::INT8, -1, &i64::MIN.to_be_bytes()).unwrap(),
            SqlValue::BigInt(i64::MIN)
        );
        assert_eq!(
            decode_value(oid::FLOAT8, -1, &1.5f64.to_be_bytes()).unwrap(),
            SqlValue::Double(1.5)
        );
        assert_eq!(
            decode_value(oid::CHAR, -1, b"x").unwrap(),
            SqlValue::Char(b'x')
        );
        assert_eq!(
            decode_value(oid::REGCLASS, -1, &[0, 0, 4, 0xeb]).unwrap(),
            SqlValue::Oid(1259)
        );
    }

    #[test]
    fn test_short_fixed_payload() {
        let err = decode_value(oid::INT4, -1, &[0, 1]).unwrap_err();
        assert!(matches!(
            err,
            TypeError::BufferTooSmall {
                needed: 4,
                available: 2
            }
        ));
    }

    #[test]
    fn test_decode_text_family() {
        for type_id in [oid::TEXT, oid::VARCHAR, oid::NAME] {
            assert_eq!(
                decode_value(type_id, -1, "héllo".as_bytes()).unwrap(),
                SqlValue::String("héllo".into())
            );
        }
        assert_eq!(
            decode_value(oid::JSON, -1, br#"{"a":1}"#).unwrap(),
            SqlValue::Json(r#"{"a":1}"#.into())
        );
    }

    #[test]
    fn test_non_utf8_text_passes_through() {
        for type_id in [oid::TEXT, oid::VARCHAR, oid::NAME, oid::JSON, oid::BPCHAR] {
            let value = decode_value(type_id, 3 + VARHDRSZ, &[0xff, 0xfe]).unwrap();
            assert_eq!(value, SqlValue::Binary(Bytes::from_static(&[0xff, 0xfe])));
        }
    }

    #[test]
    fn test_bytea_passthrough() {
        let value = decode_value(oid::BYTEA, -1, &[0, 1, 2]).unwrap();
        assert_eq!(value.as_bytes(), Some(&[0u8, 1, 2][..]));
    }

    #[test]
    fn test_bpchar_padding() {
        // character(5)
        assert_eq!(
            decode_value(oid::BPCHAR, 5 + VARHDRSZ, b"ab").unwrap(),
            SqlValue::String("ab   ".into())
        );
        // payload longer than the declared width is kept whole
        assert_eq!(
            decode_value(oid::BPCHAR, 1 + VARHDRSZ, b"ab").unwrap(),
            SqlValue::String("ab".into())
        );
        // modifier unset
        assert_eq!(
            decode_value(oid::BPCHAR, -1, b"ab").unwrap(),
            SqlValue::String("ab".into())
        );
    }

    #[test]
    fn test_bpchar_extreme_modifiers() {
        for modifier in [i32::MIN, i32::MIN + 1, 0, VARHDRSZ] {
            assert_eq!(
                decode_value(oid::BPCHAR, modifier, b"ab").unwrap(),
                SqlValue::String("ab".into())
            );
        }
    }

    #[test]
    fn test_decode_timestamp() {
        let micros: i64 = 86_400 * 1_000_000;
        let value = decode_value(oid::TIMESTAMPTZ, -1, &micros.to_be_bytes()).unwrap();
        assert_eq!(value, SqlValue::TimestampTz(946_684_800.0 + 86_400.0));

        let value = decode_value(oid::TIMESTAMP, -1, &i64::MAX.to_be_bytes()).unwrap();
        assert_eq!(value, SqlValue::Timestamp(f64::INFINITY));
    }

    #[test]
    fn test_decode_interval() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&1_000_000f64.to_be_bytes());
        raw.extend_from_slice(&3i32.to_be_bytes());
        raw.extend_from_slice(&(-1i32).to_be_bytes());
        assert_eq!(
            decode_value(oid::INTERVAL, -1, &raw).unwrap(),
            SqlValue::Interval(Interval::new(1_000_000.0, 3, -1))
        );
    }

    #[test]
    fn test_decode_array_with_null() {
        let raw: &[u8] = &[
            0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 23, // ndim 1, has nulls, int4
            0, 0, 0, 2, 0, 0, 0, 1, // len 2, lower bound 1
            0, 0, 0, 4, 0, 0, 0, 9, //
            0xff, 0xff, 0xff, 0xff,
        ];
        let value = decode_value(oid::INT4_ARRAY, -1, raw).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.get(1), Some(&SqlValue::Int(9)));
        assert_eq!(array.get(2), Some(&SqlValue::Null));
    }

    #[test]
    fn test_array_with_wrong_element_type() {
        let raw: &[u8] = &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 20];
        let err = decode_value(oid::INT4_ARRAY, -1, raw).unwrap_err();
        assert!(matches!(err, TypeError::Protocol(_)));
    }

    #[test]
    fn test_unknown_type_passthrough() {
        let registry = TypeRegistry::new();
        let value = decode_value_with(&registry, 600, -1, &[1, 2, 3]).unwrap();
        assert_eq!(
            value,
            SqlValue::Unknown {
                type_id: 600,
                bytes: Bytes::from_static(&[1, 2, 3]),
            }
        );
    }
}
