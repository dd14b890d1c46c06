//! # pq-types
//!
//! PostgreSQL binary values to Rust type mappings and conversions.
//!
//! This crate maps column payloads in the server's binary format to
//! [`SqlValue`]s and back. Built-in types are handled directly; any other
//! type id is resolved through the [`TypeRegistry`], and types nobody knows
//! about degrade to their raw bytes instead of failing.
//!
//! ## Features
//!
//! - `chrono` (default): `chrono::DateTime<Utc>` and `NaiveDateTime` conversions
//! - `json`: `serde_json::Value` conversions
//!
//! ## Type Mappings
//!
//! | PostgreSQL Type | [`SqlValue`] | Rust Type |
//! |-----------------|--------------|-----------|
//! | `boolean` | `Bool` | `bool` |
//! | `"char"` | `Char` | `String` |
//! | `smallint` | `SmallInt` | `i16` |
//! | `integer` | `Int` | `i32` |
//! | `bigint` | `BigInt` | `i64` |
//! | `oid`, `regclass` | `Oid` | `u32` |
//! | `real` | `Float` | `f32` |
//! | `double precision` | `Double` | `f64` |
//! | `text`, `varchar`, `name`, `character(n)` | `String` | `String` |
//! | `json` | `Json` | `String`, `serde_json::Value` |
//! | `bytea` | `Binary` | `bytes::Bytes` |
//! | `timestamp` | `Timestamp` | `f64`, `chrono::NaiveDateTime` |
//! | `timestamptz` | `TimestampTz` | `f64`, `chrono::DateTime<Utc>` |
//! | `interval` | `Interval` | [`Interval`] |
//! | arrays of the above | `Array` | [`SqlArray`], `Vec<T>` |
//! | registered types | `Custom` | [`CustomValue`] |
//! | anything else | `Unknown` | `bytes::Bytes` |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod array;
pub mod decode;
pub mod encode;
pub mod error;
pub mod extensions;
pub mod from_sql;
pub mod registry;
pub mod to_sql;
pub mod value;

pub use array::SqlArray;
pub use decode::{decode_value, decode_value_with};
pub use encode::{encode_value, encode_value_with};
pub use error::TypeError;
pub use from_sql::FromSql;
pub use pq_protocol::{Interval, Oid};
pub use registry::{CodecEntry, CustomValue, Marker, TypeRegistry};
pub use to_sql::ToSql;
pub use value::SqlValue;
