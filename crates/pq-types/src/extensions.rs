//! Ready-made codecs for catalog types without a built-in rule.
//!
//! These are ordinary registry entries, so they double as a reference for
//! writing codecs: install them with [`register_geometric`] and read decoded
//! values back with [`CustomValue::downcast_ref`](crate::registry::CustomValue::downcast_ref).

use bytes::BytesMut;
use pq_protocol::{Oid, wire};

use crate::error::TypeError;
use crate::registry::{CodecEntry, TypeRegistry};

/// Type id of `point`.
pub const POINT_OID: Oid = 600;

/// Type id of `lseg`.
pub const LSEG_OID: Oid = 601;

/// A `point`: two float8 coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// A line segment (`lseg`): two end points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    /// First end point.
    pub start: Point,
    /// Second end point.
    pub end: Point,
}

fn read_point(src: &mut &[u8]) -> Result<Point, TypeError> {
    Ok(Point {
        x: wire::read_f64(src)?,
        y: wire::read_f64(src)?,
    })
}

fn write_point(point: &Point, buf: &mut BytesMut) {
    wire::write_f64(buf, point.x);
    wire::write_f64(buf, point.y);
}

fn exact(raw: &[u8], len: usize, what: &str) -> Result<(), TypeError> {
    if raw.len() != len {
        return Err(TypeError::InvalidBinary(format!(
            "{what} payload must be {len} bytes, got {}",
            raw.len()
        )));
    }
    Ok(())
}

/// Codec for `point`.
#[must_use]
pub fn point_codec() -> CodecEntry {
    CodecEntry::typed(
        POINT_OID,
        |mut raw, _| {
            exact(raw, 16, "point")?;
            read_point(&mut raw)
        },
        |point: &Point, buf| {
            write_point(point, buf);
            Ok(())
        },
    )
}

/// Codec for `lseg`.
#[must_use]
pub fn lseg_codec() -> CodecEntry {
    CodecEntry::typed(
        LSEG_OID,
        |mut raw, _| {
            exact(raw, 32, "lseg")?;
            Ok(LineSegment {
                start: read_point(&mut raw)?,
                end: read_point(&mut raw)?,
            })
        },
        |segment: &LineSegment, buf| {
            buf.reserve(32);
            write_point(&segment.start, buf);
            write_point(&segment.end, buf);
            Ok(())
        },
    )
}

/// Install the geometric codecs in `registry`.
pub fn register_geometric(registry: &TypeRegistry) {
    registry.register(point_codec());
    registry.register(lseg_codec());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::BufMut;
    use crate::decode::decode_value_with;
    use crate::encode::encode_value_with;
    use crate::value::SqlValue;

    #[test]
    fn test_point_round_trip() {
        let registry = TypeRegistry::new();
        register_geometric(&registry);

        let mut raw = BytesMut::new();
        raw.put_f64(1.5);
        raw.put_f64(-2.0);

        let value = decode_value_with(&registry, POINT_OID, -1, &raw).unwrap();
        let point = value.as_custom().unwrap().downcast_ref::<Point>().unwrap();
        assert_eq!(*point, Point { x: 1.5, y: -2.0 });

        let mut out = BytesMut::new();
        encode_value_with(&registry, POINT_OID, &value, &mut out).unwrap();
        assert_eq!(out, raw);
    }

    #[test]
    fn test_point_value_rejected_by_lseg() {
        let registry = TypeRegistry::new();
        register_geometric(&registry);

        let raw = [0u8; 16];
        let point = decode_value_with(&registry, POINT_OID, -1, &raw).unwrap();
        let mut out = BytesMut::new();
        let err = encode_value_with(&registry, LSEG_OID, &point, &mut out).unwrap_err();
        assert!(err.is_inconsistent_codec_value());
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let registry = TypeRegistry::new();
        register_geometric(&registry);
        let result = decode_value_with(&registry, LSEG_OID, -1, &[0u8; 20]);
        assert!(matches!(result, Err(TypeError::InvalidBinary(_))));
        assert!(matches!(
            decode_value_with(&registry, POINT_OID, -1, &[0u8; 16]),
            Ok(SqlValue::Custom(_))
        ));
    }
}
