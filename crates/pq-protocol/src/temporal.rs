//! Timestamp and interval layouts.
//!
//! Timestamps travel as `i64` microseconds since 2000-01-01 00:00:00 UTC, with
//! `i64::MAX` and `i64::MIN` reserved for `infinity` and `-infinity`. The host
//! representation is `f64` seconds since the Unix epoch, which maps the two
//! sentinels onto the float infinities.

use bytes::{Buf, BufMut};

use crate::error::ProtocolError;
use crate::wire;

/// Seconds between the Unix epoch and the server epoch (2000-01-01).
pub const PG_EPOCH_UNIX_SECS: i64 = 946_684_800;

/// Microseconds per second.
pub const USECS_PER_SEC: i64 = 1_000_000;

/// Convert server microseconds to seconds since the Unix epoch.
#[must_use]
pub fn micros_to_unix_seconds(micros: i64) -> f64 {
    match micros {
        i64::MAX => f64::INFINITY,
        i64::MIN => f64::NEG_INFINITY,
        _ => {
            let secs = micros.div_euclid(USECS_PER_SEC) + PG_EPOCH_UNIX_SECS;
            let frac = micros.rem_euclid(USECS_PER_SEC);
            secs as f64 + frac as f64 / USECS_PER_SEC as f64
        }
    }
}

/// Convert seconds since the Unix epoch to server microseconds.
///
/// The value is rounded to the nearest microsecond.
pub fn unix_seconds_to_micros(secs: f64) -> Result<i64, ProtocolError> {
    if secs == f64::INFINITY {
        return Ok(i64::MAX);
    }
    if secs == f64::NEG_INFINITY {
        return Ok(i64::MIN);
    }
    if secs.is_nan() {
        return Err(ProtocolError::TimestampOutOfRange("NaN".into()));
    }

    let whole = secs.floor();
    let frac = ((secs - whole) * USECS_PER_SEC as f64).round();
    let micros = (whole - PG_EPOCH_UNIX_SECS as f64) * USECS_PER_SEC as f64 + frac;
    // Both sentinels are excluded: they would decode as infinities.
    if micros <= i64::MIN as f64 || micros >= i64::MAX as f64 {
        return Err(ProtocolError::TimestampOutOfRange(secs.to_string()));
    }
    Ok(micros as i64)
}

/// Read a timestamp as seconds since the Unix epoch.
pub fn read_timestamp(src: &mut impl Buf) -> Result<f64, ProtocolError> {
    wire::read_i64(src).map(micros_to_unix_seconds)
}

/// Write seconds since the Unix epoch as a timestamp.
pub fn write_timestamp(dst: &mut impl BufMut, secs: f64) -> Result<(), ProtocolError> {
    dst.put_i64(unix_seconds_to_micros(secs)?);
    Ok(())
}

/// A time interval.
///
/// Months and days are kept apart from the time part because their length in
/// seconds depends on the calendar position the interval is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Interval {
    /// Time part in microseconds.
    pub time: f64,
    /// Whole days.
    pub day: i32,
    /// Whole months.
    pub month: i32,
}

impl Interval {
    /// Encoded size: float8 time, int32 day, int32 month.
    pub const ENCODED_LEN: usize = 16;

    /// Create an interval.
    #[must_use]
    pub const fn new(time: f64, day: i32, month: i32) -> Self {
        Self { time, day, month }
    }

    /// Read the 16-byte interval layout.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < Self::ENCODED_LEN {
            return Err(ProtocolError::UnexpectedEof {
                needed: Self::ENCODED_LEN,
                available: src.remaining(),
            });
        }
        let time = wire::read_f64(src)?;
        let day = wire::read_i32(src)?;
        let month = wire::read_i32(src)?;
        Ok(Self { time, day, month })
    }

    /// Write the 16-byte interval layout.
    pub fn encode(&self, dst: &mut impl BufMut) {
        wire::write_f64(dst, self.time);
        dst.put_i32(self.day);
        dst.put_i32(self.month);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_server_epoch_is_zero_micros() {
        assert_eq!(micros_to_unix_seconds(0), PG_EPOCH_UNIX_SECS as f64);
        assert_eq!(unix_seconds_to_micros(946_684_800.0).unwrap(), 0);
    }

    #[test]
    fn test_unix_epoch() {
        let micros = unix_seconds_to_micros(0.0).unwrap();
        assert_eq!(micros, -PG_EPOCH_UNIX_SECS * USECS_PER_SEC);
        assert_eq!(micros_to_unix_seconds(micros), 0.0);
    }

    #[test]
    fn test_fractional_seconds() {
        let micros = unix_seconds_to_micros(946_684_800.25).unwrap();
        assert_eq!(micros, 250_000);
        assert_eq!(micros_to_unix_seconds(-250_000), 946_684_799.75);
    }

    #[test]
    fn test_infinities() {
        assert_eq!(micros_to_unix_seconds(i64::MAX), f64::INFINITY);
        assert_eq!(micros_to_unix_seconds(i64::MIN), f64::NEG_INFINITY);
        assert_eq!(unix_seconds_to_micros(f64::INFINITY).unwrap(), i64::MAX);
        assert_eq!(unix_seconds_to_micros(f64::NEG_INFINITY).unwrap(), i64::MIN);
    }

    #[test]
    fn test_out_of_range() {
        assert!(unix_seconds_to_micros(f64::NAN).is_err());
        assert!(unix_seconds_to_micros(1e300).is_err());
    }

    #[test]
    fn test_interval_layout() {
        let interval = Interval::new(3_600_000_000.0, 2, 14);
        let mut buf = BytesMut::new();
        interval.encode(&mut buf);
        assert_eq!(buf.len(), Interval::ENCODED_LEN);
        assert_eq!(&buf[8..12], &[0, 0, 0, 2]);
        assert_eq!(&buf[12..16], &[0, 0, 0, 14]);

        let decoded = Interval::decode(&mut &buf[..]).unwrap();
        assert_eq!(decoded, interval);
    }

    #[test]
    fn test_interval_short_input() {
        let err = Interval::decode(&mut &[0u8; 12][..]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::UnexpectedEof {
                needed: 16,
                available: 12
            }
        );
    }
}
