//! # pq-protocol
//!
//! Pure implementation of the pieces of the PostgreSQL binary wire format
//! that a client needs to exchange typed values with a server.
//!
//! This crate is IO-agnostic. It contains no networking logic; it only knows
//! how bytes are laid out once a column value or a bind parameter has been
//! isolated by the transport.
//!
//! ## Contents
//!
//! - [`wire`]: big-endian integer/float readers with bounds checks
//! - [`types`]: the catalog of built-in type ids the codec understands
//! - [`array`]: reader and writer for the binary array layout
//! - [`temporal`]: timestamp and interval layouts
//! - [`params`]: the concatenated parameter buffer sent with a bind
//!
//! ## Example
//!
//! ```rust
//! use pq_protocol::array::ArrayReader;
//! use pq_protocol::types::oid;
//!
//! // int4[] holding {7}
//! let raw = [
//!     0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 23, // ndim, has_nulls, element oid
//!     0, 0, 0, 1, 0, 0, 0, 1, // dimension: len 1, lower bound 1
//!     0, 0, 0, 4, 0, 0, 0, 7, // element
//! ];
//! let reader = ArrayReader::new(&raw).unwrap();
//! assert_eq!(reader.header().element_type, oid::INT4);
//! let elements: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
//! assert_eq!(elements, vec![Some(&[0u8, 0, 0, 7][..])]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod array;
pub mod error;
pub mod params;
pub mod temporal;
pub mod types;
pub mod wire;

pub use array::{ArrayHeader, ArrayReader, ArrayWriter, Dimension};
pub use error::ProtocolError;
pub use params::{Format, ParamBuffer, ParamBufferBuilder};
pub use temporal::Interval;
pub use types::{BuiltinType, Oid, VARHDRSZ};
