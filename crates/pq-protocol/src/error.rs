//! Protocol-level error types.

use thiserror::Error;

use crate::types::Oid;

/// Errors raised while reading or writing wire-format payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The payload ended before a fixed-width field could be read.
    #[error("unexpected end of data: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        /// Bytes required by the field.
        needed: usize,
        /// Bytes left in the payload.
        available: usize,
    },

    /// A length prefix was negative and not the NULL marker.
    #[error("invalid length prefix: {0}")]
    InvalidLength(i32),

    /// A value does not fit in a 32-bit length prefix.
    #[error("value of {0} bytes exceeds the maximum wire length")]
    ValueTooLarge(usize),

    /// The array header is malformed.
    #[error("invalid array header: {0}")]
    InvalidArrayHeader(String),

    /// The array carries elements of a different type than expected.
    #[error("array element type mismatch: expected oid {expected}, found {actual}")]
    ElementTypeMismatch {
        /// Element type the caller asked for.
        expected: Oid,
        /// Element type recorded in the payload.
        actual: Oid,
    },

    /// An array writer received a different number of elements than declared.
    #[error("array element count mismatch: declared {declared}, written {written}")]
    ElementCountMismatch {
        /// Element count implied by the dimensions.
        declared: usize,
        /// Elements actually written.
        written: usize,
    },

    /// Bytes were left over after a complete value was read.
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    /// A timestamp cannot be represented on the wire.
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(String),
}
