//! Binary encoding of parameter values.
//!
//! The mirror image of [`decode`](crate::decode): the declared type id picks
//! the layout, and the value is coerced into it when that is lossless or
//! range checked. NULL never reaches the encoder; it travels out of band in
//! the parameter length table.

use bytes::{BufMut, BytesMut};
use pq_protocol::array::ArrayWriter;
use pq_protocol::{BuiltinType, Oid, temporal, wire};

use crate::error::TypeError;
use crate::registry::TypeRegistry;
use crate::value::SqlValue;

/// Encode `value` as `type_id` using the process-wide registry.
///
/// Returns the number of bytes appended to `buf`. On error nothing is
/// appended.
pub fn encode_value(type_id: Oid, value: &SqlValue, buf: &mut BytesMut) -> Result<usize, TypeError> {
    encode_value_with(TypeRegistry::global(), type_id, value, buf)
}

/// Encode `value` as `type_id`, resolving non-built-in types through
/// `registry`.
pub fn encode_value_with(
    registry: &TypeRegistry,
    type_id: Oid,
    value: &SqlValue,
    buf: &mut BytesMut,
) -> Result<usize, TypeError> {
    let start = buf.len();
    let result = match BuiltinType::from_oid(type_id) {
        Some(ty) => encode_builtin(ty, value, buf),
        None => encode_registered(registry, type_id, value, buf),
    };
    match result {
        Ok(()) => Ok(buf.len() - start),
        Err(e) => {
            buf.truncate(start);
            Err(e)
        }
    }
}

/// Encode a value as a built-in type.
pub fn encode_builtin(ty: BuiltinType, value: &SqlValue, buf: &mut BytesMut) -> Result<(), TypeError> {
    if value.is_null() {
        return Err(TypeError::UnexpectedNull);
    }

    match ty {
        BuiltinType::Bool => match value {
            SqlValue::Bool(v) => buf.put_u8(u8::from(*v)),
            _ => return Err(mismatch(ty, value)),
        },
        BuiltinType::Char => match value {
            SqlValue::Char(c) => buf.put_u8(*c),
            SqlValue::String(s) if s.len() == 1 => buf.put_slice(s.as_bytes()),
            _ => return Err(mismatch(ty, value)),
        },
        BuiltinType::Int2 => buf.put_i16(narrow(ty, value)?),
        BuiltinType::Int4 => buf.put_i32(narrow(ty, value)?),
        BuiltinType::Int8 => buf.put_i64(narrow(ty, value)?),
        BuiltinType::Oid | BuiltinType::RegClass => buf.put_u32(narrow(ty, value)?),
        BuiltinType::Float4 => match value {
            SqlValue::Float(v) => wire::write_f32(buf, *v),
            SqlValue::Double(v) => wire::write_f32(buf, *v as f32),
            _ => wire::write_f32(buf, integer(ty, value)? as f32),
        },
        BuiltinType::Float8 => match value {
            SqlValue::Double(v) => wire::write_f64(buf, *v),
            SqlValue::Float(v) => wire::write_f64(buf, f64::from(*v)),
            _ => wire::write_f64(buf, integer(ty, value)? as f64),
        },

        BuiltinType::Bytea => match value {
            SqlValue::Binary(b) | SqlValue::Unknown { bytes: b, .. } => buf.put_slice(b),
            SqlValue::String(s) => buf.put_slice(s.as_bytes()),
            _ => return Err(mismatch(ty, value)),
        },
        BuiltinType::Text
        | BuiltinType::Varchar
        | BuiltinType::Name
        | BuiltinType::Bpchar
        | BuiltinType::Json => match value {
            SqlValue::String(s) | SqlValue::Json(s) => buf.put_slice(s.as_bytes()),
            SqlValue::Char(c) => buf.put_u8(*c),
            _ => return Err(mismatch(ty, value)),
        },

        BuiltinType::Timestamp | BuiltinType::TimestampTz => {
            let secs = match value {
                SqlValue::Timestamp(v) | SqlValue::TimestampTz(v) | SqlValue::Double(v) => *v,
                _ => integer(ty, value)? as f64,
            };
            temporal::write_timestamp(buf, secs)?;
        }
        BuiltinType::Interval => match value {
            SqlValue::Interval(v) => v.encode(buf),
            _ => return Err(mismatch(ty, value)),
        },

        BuiltinType::BoolArray
        | BuiltinType::Int2Array
        | BuiltinType::Int4Array
        | BuiltinType::Int8Array
        | BuiltinType::Float4Array
        | BuiltinType::Float8Array
        | BuiltinType::TextArray
        | BuiltinType::VarcharArray
        | BuiltinType::TimestampArray
        | BuiltinType::TimestampTzArray => encode_array(ty, value, buf)?,
    }
    Ok(())
}

fn encode_registered(
    registry: &TypeRegistry,
    type_id: Oid,
    value: &SqlValue,
    buf: &mut BytesMut,
) -> Result<(), TypeError> {
    match value {
        SqlValue::Null => Err(TypeError::UnexpectedNull),
        SqlValue::Custom(custom) => match registry.lookup(type_id) {
            Some(entry) => entry.encode(custom, buf),
            None => Err(TypeError::UnsupportedConversion {
                from: format!("custom value for type {}", custom.type_id()),
                to: "a type without a registered codec",
            }),
        },
        // Raw payloads are copied verbatim, registered or not.
        SqlValue::Binary(bytes) | SqlValue::Unknown { bytes, .. } => {
            buf.put_slice(bytes);
            Ok(())
        }
        _ => Err(TypeError::UnsupportedConversion {
            from: value.type_name().to_string(),
            to: "registered type",
        }),
    }
}

fn encode_array(ty: BuiltinType, value: &SqlValue, buf: &mut BytesMut) -> Result<(), TypeError> {
    let (Some(element), SqlValue::Array(array)) = (ty.element(), value) else {
        return Err(mismatch(ty, value));
    };

    let mut writer = ArrayWriter::new(buf, element.oid(), array.dimensions())?;
    for item in array {
        if item.is_null() {
            writer.push_null();
        } else {
            writer.push_with(|b| encode_builtin(element, item, b))?;
        }
    }
    writer.finish()?;
    Ok(())
}

fn mismatch(ty: BuiltinType, value: &SqlValue) -> TypeError {
    TypeError::TypeMismatch {
        expected: ty.name(),
        actual: value.type_name().to_string(),
    }
}

fn integer(ty: BuiltinType, value: &SqlValue) -> Result<i64, TypeError> {
    value.as_i64().ok_or_else(|| mismatch(ty, value))
}

fn narrow<T: TryFrom<i64>>(ty: BuiltinType, value: &SqlValue) -> Result<T, TypeError> {
    T::try_from(integer(ty, value)?).map_err(|_| TypeError::OutOfRange {
        target_type: ty.name(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::array::SqlArray;
    use crate::decode::decode_value_with;
    use crate::registry::{CodecEntry, CustomValue, Marker};
    use bytes::Bytes;
    use pq_protocol::Interval;
    use pq_protocol::types::oid;

    fn encode(type_id: Oid, value: SqlValue) -> Result<BytesMut, TypeError> {
        let mut buf = BytesMut::new();
        let written = encode_value_with(&TypeRegistry::new(), type_id, &value, &mut buf)?;
        assert_eq!(written, buf.len());
        Ok(buf)
    }

    #[test]
    fn test_encode_fixed_scalars() {
        assert_eq!(&encode(oid::BOOL, SqlValue::Bool(true)).unwrap()[..], &[1]);
        assert_eq!(
            &encode(oid::INT2, SqlValue::SmallInt(-2)).unwrap()[..],
            &[0xff, 0xfe]
        );
        assert_eq!(
            &encode(oid::INT4, SqlValue::Int(256)).unwrap()[..],
            &[0, 0, 1, 0]
        );
        assert_eq!(
            &encode(oid::FLOAT8, SqlValue::Double(1.5)).unwrap()[..],
            &1.5f64.to_be_bytes()
        );
    }

    #[test]
    fn test_integer_coercion_is_range_checked() {
        assert_eq!(
            &encode(oid::INT8, SqlValue::SmallInt(3)).unwrap()[..],
            &3i64.to_be_bytes()
        );
        assert_eq!(
            &encode(oid::INT2, SqlValue::BigInt(12)).unwrap()[..],
            &12i16.to_be_bytes()
        );
        let err = encode(oid::INT2, SqlValue::Int(40_000)).unwrap_err();
        assert!(matches!(
            err,
            TypeError::OutOfRange {
                target_type: "smallint"
            }
        ));
        assert!(encode(oid::OID, SqlValue::Int(-1)).is_err());
    }

    #[test]
    fn test_null_is_never_encoded() {
        assert!(matches!(
            encode(oid::INT4, SqlValue::Null),
            Err(TypeError::UnexpectedNull)
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let err = encode(oid::INT4, SqlValue::String("1".into())).unwrap_err();
        assert!(matches!(err, TypeError::TypeMismatch { expected: "integer", .. }));
    }

    #[test]
    fn test_interval_layout() {
        let buf = encode(oid::INTERVAL, SqlValue::Interval(Interval::new(2.0, 1, 3))).unwrap();
        assert_eq!(buf.len(), 16);
        assert_eq!(&buf[..8], &2.0f64.to_be_bytes());
        assert_eq!(&buf[8..], &[0, 0, 0, 1, 0, 0, 0, 3]);
    }

    #[test]
    fn test_timestamp_accepts_epoch_seconds() {
        let buf = encode(oid::TIMESTAMPTZ, SqlValue::BigInt(946_684_800)).unwrap();
        assert_eq!(&buf[..], &0i64.to_be_bytes());
    }

    #[test]
    fn test_array_with_nulls() {
        let array = SqlArray::from_elements(
            oid::INT4,
            vec![SqlValue::Int(1), SqlValue::Null, SqlValue::SmallInt(3)],
        );
        let buf = encode(oid::INT4_ARRAY, SqlValue::Array(array)).unwrap();
        let registry = TypeRegistry::new();
        let decoded = decode_value_with(&registry, oid::INT4_ARRAY, -1, &buf).unwrap();
        let decoded = decoded.as_array().unwrap();
        assert_eq!(
            decoded.elements(),
            &[SqlValue::Int(1), SqlValue::Null, SqlValue::Int(3)]
        );
    }

    #[test]
    fn test_array_element_failure_appends_nothing() {
        let array = SqlArray::from_elements(oid::INT2, vec![SqlValue::Int(1), SqlValue::Int(1 << 20)]);
        let mut buf = BytesMut::from(&b"keep"[..]);
        let result = encode_value_with(
            &TypeRegistry::new(),
            oid::INT2_ARRAY,
            &SqlValue::Array(array),
            &mut buf,
        );
        assert!(result.is_err());
        assert_eq!(&buf[..], b"keep");
    }

    #[test]
    fn test_unregistered_type_copies_raw_bytes() {
        let raw = SqlValue::Unknown {
            type_id: 600,
            bytes: Bytes::from_static(&[9, 8, 7]),
        };
        assert_eq!(&encode(600, raw).unwrap()[..], &[9, 8, 7]);
        assert!(matches!(
            encode(600, SqlValue::Int(1)),
            Err(TypeError::UnsupportedConversion { .. })
        ));
    }

    #[test]
    fn test_custom_value_without_codec() {
        let registry = TypeRegistry::new();
        let value = SqlValue::Custom(CustomValue::new(Marker::new(), 1u8));
        let mut buf = BytesMut::new();
        for type_id in [0, 80_001] {
            let err = encode_value_with(&registry, type_id, &value, &mut buf).unwrap_err();
            assert!(matches!(err, TypeError::UnsupportedConversion { .. }));
            assert!(!err.is_inconsistent_codec_value());
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn test_foreign_custom_value_is_rejected() {
        let registry = TypeRegistry::new();
        registry.register(CodecEntry::typed(
            80_000,
            |raw, _| Ok(raw.to_vec()),
            |v: &Vec<u8>, buf| {
                buf.put_slice(v);
                Ok(())
            },
        ));

        let foreign = SqlValue::Custom(CustomValue::new(Marker::new(), vec![1u8]));
        let mut buf = BytesMut::new();
        let err = encode_value_with(&registry, 80_000, &foreign, &mut buf).unwrap_err();
        assert!(err.is_inconsistent_codec_value());
        assert!(buf.is_empty());
    }
}
