//! Binary array layout.
//!
//! ```text
//! i32 ndim
//! i32 has_nulls (0 or 1)
//! u32 element type id
//! ndim x { i32 length, i32 lower_bound }
//! n x { i32 length (-1 = NULL), length bytes }
//! ```
//!
//! Elements are stored flattened in row-major order. An empty array has
//! `ndim = 0` and no dimension entries.

use bytes::{BufMut, BytesMut};

use crate::error::ProtocolError;
use crate::types::Oid;
use crate::wire::{self, NULL_LENGTH};

/// Maximum number of dimensions the server accepts.
pub const MAX_DIMENSIONS: usize = 6;

/// One array dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    /// Number of elements along this axis.
    pub len: usize,
    /// Subscript of the first element (1 unless declared otherwise).
    pub lower_bound: i32,
}

impl Dimension {
    /// A dimension with the default lower bound of 1.
    #[must_use]
    pub const fn new(len: usize) -> Self {
        Self {
            len,
            lower_bound: 1,
        }
    }
}

/// Parsed array header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayHeader {
    /// Whether the payload contains at least one NULL element.
    pub has_nulls: bool,
    /// Type id of every element.
    pub element_type: Oid,
    /// Dimensions, outermost first.
    pub dimensions: Vec<Dimension>,
}

impl ArrayHeader {
    /// Total number of elements across all dimensions.
    #[must_use]
    pub fn element_count(&self) -> usize {
        if self.dimensions.is_empty() {
            return 0;
        }
        self.dimensions.iter().map(|d| d.len).product()
    }
}

fn checked_count(dimensions: &[Dimension]) -> Result<usize, ProtocolError> {
    if dimensions.is_empty() {
        return Ok(0);
    }
    dimensions.iter().try_fold(1usize, |acc, d| {
        acc.checked_mul(d.len)
            .ok_or_else(|| ProtocolError::InvalidArrayHeader("element count overflows".into()))
    })
}

/// Zero-copy reader over a binary array payload.
///
/// Iterating yields each element's payload, `None` for NULL elements. Bytes
/// left after the last element are reported as a final error item.
#[derive(Debug, Clone)]
pub struct ArrayReader<'a> {
    header: ArrayHeader,
    rest: &'a [u8],
    left: usize,
    done: bool,
}

impl<'a> ArrayReader<'a> {
    /// Parse the header and position the reader at the first element.
    pub fn new(raw: &'a [u8]) -> Result<Self, ProtocolError> {
        let mut rest = raw;

        let ndim = wire::read_i32(&mut rest)?;
        if ndim < 0 {
            return Err(ProtocolError::InvalidArrayHeader(format!(
                "negative dimension count {ndim}"
            )));
        }
        let ndim = ndim as usize;
        if ndim > MAX_DIMENSIONS {
            return Err(ProtocolError::InvalidArrayHeader(format!(
                "{ndim} dimensions exceeds the maximum of {MAX_DIMENSIONS}"
            )));
        }

        let flags = wire::read_i32(&mut rest)?;
        if flags != 0 && flags != 1 {
            return Err(ProtocolError::InvalidArrayHeader(format!(
                "invalid flags {flags}"
            )));
        }
        let element_type = wire::read_u32(&mut rest)?;

        let mut dimensions = Vec::with_capacity(ndim);
        for _ in 0..ndim {
            let len = wire::read_i32(&mut rest)?;
            if len < 0 {
                return Err(ProtocolError::InvalidArrayHeader(format!(
                    "negative dimension length {len}"
                )));
            }
            let lower_bound = wire::read_i32(&mut rest)?;
            dimensions.push(Dimension {
                len: len as usize,
                lower_bound,
            });
        }
        let left = checked_count(&dimensions)?;

        Ok(Self {
            header: ArrayHeader {
                has_nulls: flags == 1,
                element_type,
                dimensions,
            },
            rest,
            left,
            done: false,
        })
    }

    /// Fail unless the payload's element type is `expected`.
    pub fn expect_element_type(self, expected: Oid) -> Result<Self, ProtocolError> {
        if self.header.element_type != expected {
            return Err(ProtocolError::ElementTypeMismatch {
                expected,
                actual: self.header.element_type,
            });
        }
        Ok(self)
    }

    /// The parsed header.
    #[must_use]
    pub fn header(&self) -> &ArrayHeader {
        &self.header
    }

    /// Elements not yet read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.left
    }

    fn read_element(&mut self) -> Result<Option<&'a [u8]>, ProtocolError> {
        match wire::read_length(&mut self.rest)? {
            None => Ok(None),
            Some(len) => wire::read_slice(&mut self.rest, len).map(Some),
        }
    }
}

impl<'a> Iterator for ArrayReader<'a> {
    type Item = Result<Option<&'a [u8]>, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.left == 0 {
            self.done = true;
            if !self.rest.is_empty() {
                return Some(Err(ProtocolError::TrailingBytes(self.rest.len())));
            }
            return None;
        }

        self.left -= 1;
        let item = self.read_element();
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.left + 1))
    }
}

/// Writer for the binary array layout.
///
/// Each element's length prefix is reserved before the element is written
/// and patched afterwards, so element encoders append straight into the
/// output buffer.
#[derive(Debug)]
pub struct ArrayWriter<'a> {
    buf: &'a mut BytesMut,
    flags_at: usize,
    declared: usize,
    written: usize,
    has_nulls: bool,
}

impl<'a> ArrayWriter<'a> {
    /// Write the array header for the given dimensions.
    pub fn new(
        buf: &'a mut BytesMut,
        element_type: Oid,
        dimensions: &[Dimension],
    ) -> Result<Self, ProtocolError> {
        if dimensions.len() > MAX_DIMENSIONS {
            return Err(ProtocolError::InvalidArrayHeader(format!(
                "{} dimensions exceeds the maximum of {MAX_DIMENSIONS}",
                dimensions.len()
            )));
        }
        let declared = checked_count(dimensions)?;

        buf.put_i32(dimensions.len() as i32);
        let flags_at = buf.len();
        buf.put_i32(0);
        buf.put_u32(element_type);
        for dim in dimensions {
            wire::write_length(buf, dim.len)?;
            buf.put_i32(dim.lower_bound);
        }

        Ok(Self {
            buf,
            flags_at,
            declared,
            written: 0,
            has_nulls: false,
        })
    }

    /// Write the header of a one-dimensional array starting at subscript 1.
    ///
    /// An empty array is written with zero dimensions, as the server does.
    pub fn one_dimensional(
        buf: &'a mut BytesMut,
        element_type: Oid,
        len: usize,
    ) -> Result<Self, ProtocolError> {
        if len == 0 {
            Self::new(buf, element_type, &[])
        } else {
            Self::new(buf, element_type, &[Dimension::new(len)])
        }
    }

    /// Append a NULL element.
    pub fn push_null(&mut self) {
        self.buf.put_i32(NULL_LENGTH);
        self.has_nulls = true;
        self.written += 1;
    }

    /// Append one element produced by `write`.
    ///
    /// If `write` fails, everything it appended is discarded.
    pub fn push_with<E, F>(&mut self, write: F) -> Result<(), E>
    where
        F: FnOnce(&mut BytesMut) -> Result<(), E>,
        E: From<ProtocolError>,
    {
        let at = self.buf.len();
        self.buf.put_i32(0);
        if let Err(e) = write(&mut *self.buf) {
            self.buf.truncate(at);
            return Err(e);
        }
        let len = wire::wire_length(self.buf.len() - at - 4)?;
        self.buf[at..at + 4].copy_from_slice(&len.to_be_bytes());
        self.written += 1;
        Ok(())
    }

    /// Append raw element bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        wire::write_length(self.buf, bytes.len())?;
        self.buf.put_slice(bytes);
        self.written += 1;
        Ok(())
    }

    /// Verify the element count and finalize the header flags.
    pub fn finish(self) -> Result<(), ProtocolError> {
        if self.written != self.declared {
            return Err(ProtocolError::ElementCountMismatch {
                declared: self.declared,
                written: self.written,
            });
        }
        if self.has_nulls {
            self.buf[self.flags_at..self.flags_at + 4].copy_from_slice(&1i32.to_be_bytes());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::oid;

    fn int4_array(values: &[Option<i32>]) -> BytesMut {
        let mut buf = BytesMut::new();
        let mut writer = ArrayWriter::one_dimensional(&mut buf, oid::INT4, values.len()).unwrap();
        for v in values {
            match v {
                Some(v) => writer
                    .push_with(|b| {
                        b.put_i32(*v);
                        Ok::<_, ProtocolError>(())
                    })
                    .unwrap(),
                None => writer.push_null(),
            }
        }
        writer.finish().unwrap();
        buf
    }

    #[test]
    fn test_write_matches_server_layout() {
        let buf = int4_array(&[Some(1), Some(2)]);
        let expected: &[u8] = &[
            0, 0, 0, 1, // ndim
            0, 0, 0, 0, // has_nulls
            0, 0, 0, 23, // int4
            0, 0, 0, 2, 0, 0, 0, 1, // len 2, lower bound 1
            0, 0, 0, 4, 0, 0, 0, 1, //
            0, 0, 0, 4, 0, 0, 0, 2,
        ];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn test_read_back_with_nulls() {
        let buf = int4_array(&[Some(7), None, Some(9)]);
        let reader = ArrayReader::new(&buf).unwrap();
        assert!(reader.header().has_nulls);
        assert_eq!(reader.header().element_count(), 3);

        let elements: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0], Some(&[0u8, 0, 0, 7][..]));
        assert_eq!(elements[1], None);
    }

    #[test]
    fn test_empty_array_has_no_dimensions() {
        let buf = int4_array(&[]);
        assert_eq!(buf.len(), 12);
        let reader = ArrayReader::new(&buf).unwrap();
        assert!(reader.header().dimensions.is_empty());
        assert_eq!(reader.count(), 0);
    }

    #[test]
    fn test_element_type_mismatch() {
        let buf = int4_array(&[Some(1)]);
        let err = ArrayReader::new(&buf)
            .unwrap()
            .expect_element_type(oid::INT8)
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::ElementTypeMismatch {
                expected: oid::INT8,
                actual: oid::INT4
            }
        );
    }

    #[test]
    fn test_trailing_bytes_reported() {
        let mut buf = int4_array(&[Some(1)]);
        buf.put_u8(0xaa);
        let items: Vec<_> = ArrayReader::new(&buf).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], Err(ProtocolError::TrailingBytes(1)));
    }

    #[test]
    fn test_truncated_element() {
        let buf = int4_array(&[Some(1)]);
        let items: Vec<_> = ArrayReader::new(&buf[..buf.len() - 2]).unwrap().collect();
        assert!(matches!(items[0], Err(ProtocolError::UnexpectedEof { .. })));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_negative_dimensions_rejected() {
        let raw: &[u8] = &[0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0, 0, 0, 0, 23];
        assert!(matches!(
            ArrayReader::new(raw),
            Err(ProtocolError::InvalidArrayHeader(_))
        ));
    }

    #[test]
    fn test_count_mismatch_on_finish() {
        let mut buf = BytesMut::new();
        let mut writer = ArrayWriter::one_dimensional(&mut buf, oid::INT4, 2).unwrap();
        writer.push_bytes(&[0, 0, 0, 1]).unwrap();
        assert_eq!(
            writer.finish().unwrap_err(),
            ProtocolError::ElementCountMismatch {
                declared: 2,
                written: 1
            }
        );
    }

    #[test]
    fn test_failed_element_is_discarded() {
        let mut buf = BytesMut::new();
        let mut writer = ArrayWriter::one_dimensional(&mut buf, oid::INT4, 1).unwrap();
        let header_len = 20;
        let result = writer.push_with(|b| {
            b.put_u8(1);
            Err(ProtocolError::InvalidLength(-5))
        });
        assert!(result.is_err());
        writer.push_bytes(&[0, 0, 0, 3]).unwrap();
        writer.finish().unwrap();
        assert_eq!(buf.len(), header_len + 8);
    }

    #[test]
    fn test_multi_dimensional_lower_bound() {
        let mut buf = BytesMut::new();
        let dims = [
            Dimension::new(2),
            Dimension {
                len: 2,
                lower_bound: 0,
            },
        ];
        let mut writer = ArrayWriter::new(&mut buf, oid::INT4, &dims).unwrap();
        for i in 0..4 {
            writer.push_bytes(&i32::to_be_bytes(i)).unwrap();
        }
        writer.finish().unwrap();

        let reader = ArrayReader::new(&buf).unwrap();
        assert_eq!(reader.header().dimensions, dims.to_vec());
        assert_eq!(reader.remaining(), 4);
    }
}
