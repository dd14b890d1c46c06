//! # pq-client
//!
//! Synchronous PostgreSQL client layer over a pluggable transport.
//!
//! This crate turns a [`Transport`] (anything that can send queries and hand
//! back result buffers) into a checked resource graph of connections,
//! prepared statements, result sets and rows. All parameters are sent and
//! all results are requested in the binary format; values are encoded and
//! decoded through `pq-types`.
//!
//! ## Resource Graph
//!
//! ```text
//! Connection ──owns──> Statement (weak back-reference)
//! ResultSet  ──owns──> Row       (weak back-reference)
//! ```
//!
//! Finishing a connection invalidates its statements; releasing a result
//! set invalidates its rows. Any operation on an invalidated handle fails
//! with [`Error::InvalidHandle`] instead of touching freed state. Teardown
//! is idempotent and happens on drop if not done explicitly, and each
//! result buffer is released exactly once.
//!
//! Handles use `Rc` and are neither `Send` nor `Sync`; a connection and
//! everything derived from it live on one thread.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pq_client::{Config, Connection};
//!
//! let config: Config = "host=localhost dbname=test user=app".parse()?;
//! let conn = Connection::<MyTransport>::connect(config)?;
//!
//! let stmt = conn.prepare("SELECT id, name FROM users WHERE id = $1", "by_id")?;
//! let result = stmt.execute(&[&42i32])?;
//!
//! for row in result.rows()? {
//!     let id: i32 = row.get(0)?;
//!     let name: Option<String> = row.get_by_name("name")?;
//!     println!("{id}: {name:?}");
//! }
//!
//! conn.finish();
//! assert!(stmt.execute(&[&1i32]).unwrap_err().is_invalid_handle());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod error;
pub mod result;
pub mod row;
pub mod statement;
pub mod transport;

pub use config::Config;
pub use connection::Connection;
pub use error::{Error, Result};
pub use result::{Column, Fetch, ResultSet, Rows};
pub use row::Row;
pub use statement::Statement;
pub use transport::{ConnStatus, ExecStatus, Notification, PollStatus, RawResult, Socket, Transport};

// Re-export the layers below for convenience
pub use pq_protocol::{Oid, ParamBuffer};
pub use pq_types::{FromSql, SqlArray, SqlValue, ToSql, TypeError, TypeRegistry};
