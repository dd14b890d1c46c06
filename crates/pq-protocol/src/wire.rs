//! Big-endian read/write helpers.
//!
//! Every multi-byte field on the wire is in network byte order. Floats are
//! carried as their IEEE-754 bit pattern, so a read after a write yields the
//! same bits, NaN payloads included.
//!
//! Readers check the remaining length first and never panic on short input.

use bytes::{Buf, BufMut};

use crate::error::ProtocolError;

/// Length prefix value that marks a NULL element.
pub const NULL_LENGTH: i32 = -1;

#[inline]
fn ensure(src: &impl Buf, needed: usize) -> Result<(), ProtocolError> {
    if src.remaining() < needed {
        return Err(ProtocolError::UnexpectedEof {
            needed,
            available: src.remaining(),
        });
    }
    Ok(())
}

/// Read a single byte.
pub fn read_u8(src: &mut impl Buf) -> Result<u8, ProtocolError> {
    ensure(src, 1)?;
    Ok(src.get_u8())
}

/// Read a big-endian `i16`.
pub fn read_i16(src: &mut impl Buf) -> Result<i16, ProtocolError> {
    ensure(src, 2)?;
    Ok(src.get_i16())
}

/// Read a big-endian `i32`.
pub fn read_i32(src: &mut impl Buf) -> Result<i32, ProtocolError> {
    ensure(src, 4)?;
    Ok(src.get_i32())
}

/// Read a big-endian `u32`.
pub fn read_u32(src: &mut impl Buf) -> Result<u32, ProtocolError> {
    ensure(src, 4)?;
    Ok(src.get_u32())
}

/// Read a big-endian `i64`.
pub fn read_i64(src: &mut impl Buf) -> Result<i64, ProtocolError> {
    ensure(src, 8)?;
    Ok(src.get_i64())
}

/// Read a big-endian `f32` bit pattern.
pub fn read_f32(src: &mut impl Buf) -> Result<f32, ProtocolError> {
    ensure(src, 4)?;
    Ok(f32::from_bits(src.get_u32()))
}

/// Read a big-endian `f64` bit pattern.
pub fn read_f64(src: &mut impl Buf) -> Result<f64, ProtocolError> {
    ensure(src, 8)?;
    Ok(f64::from_bits(src.get_u64()))
}

/// Read an `i32` length prefix.
///
/// Returns `None` for the NULL marker (`-1`). Any other negative value is
/// rejected.
pub fn read_length(src: &mut impl Buf) -> Result<Option<usize>, ProtocolError> {
    match read_i32(src)? {
        NULL_LENGTH => Ok(None),
        len if len < 0 => Err(ProtocolError::InvalidLength(len)),
        len => Ok(Some(len as usize)),
    }
}

/// Split `len` bytes off the front of a slice without copying.
pub fn read_slice<'a>(src: &mut &'a [u8], len: usize) -> Result<&'a [u8], ProtocolError> {
    if src.len() < len {
        return Err(ProtocolError::UnexpectedEof {
            needed: len,
            available: src.len(),
        });
    }
    let (head, tail) = src.split_at(len);
    *src = tail;
    Ok(head)
}

/// Convert a byte count into an `i32` length prefix.
pub fn wire_length(len: usize) -> Result<i32, ProtocolError> {
    i32::try_from(len).map_err(|_| ProtocolError::ValueTooLarge(len))
}

/// Write an `i32` length prefix.
pub fn write_length(dst: &mut impl BufMut, len: usize) -> Result<(), ProtocolError> {
    dst.put_i32(wire_length(len)?);
    Ok(())
}

/// Write a big-endian `f32` bit pattern.
pub fn write_f32(dst: &mut impl BufMut, value: f32) {
    dst.put_u32(value.to_bits());
}

/// Write a big-endian `f64` bit pattern.
pub fn write_f64(dst: &mut impl BufMut, value: f64) {
    dst.put_u64(value.to_bits());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_read_integers_big_endian() {
        let mut src: &[u8] = &[0x01, 0x02, 0x00, 0x00, 0x01, 0x00];
        assert_eq!(read_i16(&mut src).unwrap(), 0x0102);
        assert_eq!(read_i32(&mut src).unwrap(), 256);
        assert!(src.is_empty());
    }

    #[test]
    fn test_short_input_reports_needed_bytes() {
        let mut src: &[u8] = &[0x00, 0x01, 0x02];
        let err = read_i64(&mut src).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::UnexpectedEof {
                needed: 8,
                available: 3
            }
        );
    }

    #[test]
    fn test_float_bit_pattern_preserved() {
        let nan = f64::from_bits(0x7ff8_0000_dead_beef);
        let mut buf = BytesMut::new();
        write_f64(&mut buf, nan);
        write_f32(&mut buf, -0.0);

        let mut src = &buf[..];
        assert_eq!(read_f64(&mut src).unwrap().to_bits(), nan.to_bits());
        assert_eq!(read_f32(&mut src).unwrap().to_bits(), (-0.0f32).to_bits());
    }

    #[test]
    fn test_read_length_null_and_invalid() {
        let mut src: &[u8] = &[0xff, 0xff, 0xff, 0xff];
        assert_eq!(read_length(&mut src).unwrap(), None);

        let mut src: &[u8] = &[0xff, 0xff, 0xff, 0xfe];
        assert_eq!(
            read_length(&mut src).unwrap_err(),
            ProtocolError::InvalidLength(-2)
        );
    }

    #[test]
    fn test_read_slice_advances() {
        let data = [1u8, 2, 3, 4];
        let mut src = &data[..];
        assert_eq!(read_slice(&mut src, 3).unwrap(), &[1, 2, 3]);
        assert_eq!(src, &[4]);
        assert!(read_slice(&mut src, 2).is_err());
    }
}
