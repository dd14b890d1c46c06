//! # pq-testing
//!
//! Test infrastructure for the PostgreSQL client layer.
//!
//! This crate provides a scripted, in-process [`Transport`](pq_client::Transport)
//! so the resource graph, parameter binding and result decoding can be tested
//! without a server.
//!
//! ## Features
//!
//! - Canned responses keyed by SQL text, built from `SqlValue`s and encoded
//!   in the binary format
//! - Prepared statements with declared or placeholder-derived parameter types
//! - Echo responses that return the bound parameters as a row
//! - Counters for result buffers created and released and for session teardown
//! - Injectable transport failures, poll scripts and notifications
//!
//! ## Example
//!
//! ```rust,ignore
//! use pq_testing::mock_server::{MockColumn, MockResponse, MockServer};
//! use pq_protocol::types::oid;
//!
//! let server = MockServer::builder()
//!     .with_response("SELECT 1", MockResponse::scalar(MockColumn::new("?column?", oid::INT4), 1))
//!     .build();
//! let conn = pq_testing::fixtures::connect(&server)?;
//!
//! let result = conn.execute("SELECT 1")?;
//! assert_eq!(result.value(0, 0)?.as_i32(), Some(1));
//!
//! drop(result);
//! assert_eq!(server.live_results(), 0);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod fixtures;
pub mod mock_server;

pub use mock_server::{
    Executed, MOCK_SOCKET, MockColumn, MockResponse, MockResult, MockServer, MockServerBuilder,
    MockTransport,
};
