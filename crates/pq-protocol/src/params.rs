//! Bind parameter buffer.
//!
//! All parameters of one execution are serialized into a single contiguous
//! buffer. The builder records each parameter's length while appending; the
//! offset table is derived from those lengths only once every parameter has
//! been written, so no slot is fixed before the layout is complete.

use bytes::{Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::types::Oid;
use crate::wire;

/// Parameter or result format code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum Format {
    /// Text representation.
    Text = 0,
    /// Binary representation.
    Binary = 1,
}

/// Serialized bind parameters ready for transmission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamBuffer {
    types: Vec<Oid>,
    data: Bytes,
    /// `(offset, length)` per parameter; `None` is SQL NULL.
    slots: Vec<Option<(usize, usize)>>,
}

impl ParamBuffer {
    /// Start building a parameter buffer.
    #[must_use]
    pub fn builder() -> ParamBufferBuilder {
        ParamBufferBuilder::default()
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Parameter type ids, in bind order.
    #[must_use]
    pub fn types(&self) -> &[Oid] {
        &self.types
    }

    /// The concatenated payload of every non-NULL parameter.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload of parameter `index`, `None` for NULL or out of range.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&[u8]> {
        let (offset, len) = (*self.slots.get(index)?)?;
        Some(&self.data[offset..offset + len])
    }

    /// Check if parameter `index` is NULL.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(None))
    }

    /// Byte offset of each parameter in [`data`](Self::data); NULLs report 0.
    #[must_use]
    pub fn offsets(&self) -> Vec<usize> {
        self.slots
            .iter()
            .map(|slot| slot.map_or(0, |(offset, _)| offset))
            .collect()
    }

    /// Wire length of each parameter, `-1` for NULL.
    #[must_use]
    pub fn lengths(&self) -> Vec<i32> {
        self.slots
            .iter()
            .map(|slot| match slot {
                // Lengths were range checked when the parameter was pushed.
                Some((_, len)) => *len as i32,
                None => wire::NULL_LENGTH,
            })
            .collect()
    }

    /// Format code of each parameter. Parameters are always sent in binary.
    #[must_use]
    pub fn formats(&self) -> Vec<Format> {
        vec![Format::Binary; self.slots.len()]
    }

    /// Iterate over `(type id, payload)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Oid, Option<&[u8]>)> + '_ {
        self.types
            .iter()
            .enumerate()
            .map(|(i, &ty)| (ty, self.value(i)))
    }
}

/// Builder for [`ParamBuffer`].
#[derive(Debug, Default)]
pub struct ParamBufferBuilder {
    types: Vec<Oid>,
    data: BytesMut,
    lengths: Vec<Option<usize>>,
}

impl ParamBufferBuilder {
    /// Builder with room for `params` parameters.
    #[must_use]
    pub fn with_capacity(params: usize) -> Self {
        Self {
            types: Vec::with_capacity(params),
            data: BytesMut::new(),
            lengths: Vec::with_capacity(params),
        }
    }

    /// Append a NULL parameter.
    pub fn push_null(&mut self, type_id: Oid) {
        self.types.push(type_id);
        self.lengths.push(None);
    }

    /// Append a parameter whose payload is produced by `write`.
    ///
    /// If `write` fails, the partial payload is discarded and the parameter
    /// is not recorded.
    pub fn push_with<E, F>(&mut self, type_id: Oid, write: F) -> Result<(), E>
    where
        F: FnOnce(&mut BytesMut) -> Result<(), E>,
        E: From<ProtocolError>,
    {
        let start = self.data.len();
        if let Err(e) = write(&mut self.data) {
            self.data.truncate(start);
            return Err(e);
        }
        let len = self.data.len() - start;
        if let Err(e) = wire::wire_length(len) {
            self.data.truncate(start);
            return Err(e.into());
        }
        self.types.push(type_id);
        self.lengths.push(Some(len));
        Ok(())
    }

    /// Append a parameter from raw bytes.
    pub fn push_bytes(&mut self, type_id: Oid, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.push_with(type_id, |buf| {
            buf.extend_from_slice(bytes);
            Ok(())
        })
    }

    /// Number of parameters pushed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    /// Check if no parameter has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Fix the offset table and freeze the payload.
    #[must_use]
    pub fn finish(self) -> ParamBuffer {
        let mut offset = 0;
        let slots = self
            .lengths
            .into_iter()
            .map(|len| {
                len.map(|len| {
                    let slot = (offset, len);
                    offset += len;
                    slot
                })
            })
            .collect();

        ParamBuffer {
            types: self.types,
            data: self.data.freeze(),
            slots,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::oid;
    use bytes::BufMut;

    #[test]
    fn test_offsets_follow_lengths() {
        let mut builder = ParamBuffer::builder();
        builder.push_bytes(oid::INT4, &[0, 0, 0, 1]).unwrap();
        builder.push_null(oid::TEXT);
        builder.push_bytes(oid::TEXT, b"hello").unwrap();
        builder
            .push_with(oid::INT8, |buf| {
                buf.put_i64(2);
                Ok::<_, ProtocolError>(())
            })
            .unwrap();
        let params = builder.finish();

        assert_eq!(params.len(), 4);
        assert_eq!(params.types(), &[oid::INT4, oid::TEXT, oid::TEXT, oid::INT8]);
        assert_eq!(params.lengths(), vec![4, -1, 5, 8]);
        assert_eq!(params.offsets(), vec![0, 0, 4, 9]);
        assert_eq!(params.data().len(), 17);
        assert_eq!(params.value(2), Some(&b"hello"[..]));
        assert!(params.is_null(1));
        assert!(!params.is_null(0));
        assert_eq!(params.value(9), None);
        assert!(params.formats().iter().all(|f| *f == Format::Binary));
    }

    #[test]
    fn test_failed_parameter_leaves_no_trace() {
        let mut builder = ParamBuffer::builder();
        builder.push_bytes(oid::INT2, &[0, 1]).unwrap();
        let result = builder.push_with(oid::INT4, |buf| {
            buf.put_u8(9);
            Err(ProtocolError::InvalidLength(-3))
        });
        assert!(result.is_err());
        assert_eq!(builder.len(), 1);

        let params = builder.finish();
        assert_eq!(params.data(), &[0, 1]);
    }

    #[test]
    fn test_empty_buffer() {
        let params = ParamBuffer::builder().finish();
        assert!(params.is_empty());
        assert!(params.lengths().is_empty());
        assert_eq!(params.iter().count(), 0);
    }
}
