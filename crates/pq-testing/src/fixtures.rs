//! Test fixture utilities.

use pq_client::{Config, Connection};
use pq_protocol::types::oid;
use pq_types::{SqlArray, SqlValue};

use crate::mock_server::{MockColumn, MockResponse, MockServer, MockTransport};

/// Query answered by [`users_server`].
pub const USERS_QUERY: &str = "SELECT id, name, email FROM users ORDER BY id";

/// Configuration used by [`connect`].
pub fn test_config() -> Config {
    Config::new().dbname("test").user("tester").application_name("pq-testing")
}

/// Install `server` on this thread and connect to it.
pub fn connect(server: &MockServer) -> pq_client::Result<Connection<MockTransport>> {
    server.install();
    Connection::connect(test_config())
}

/// A server answering [`USERS_QUERY`] with three users, the last of whom
/// has no email.
pub fn users_server() -> MockServer {
    MockServer::builder()
        .with_response(USERS_QUERY, users_response())
        .build()
}

/// Rows of the sample users table.
pub fn users_response() -> MockResponse {
    MockResponse::rows(
        vec![
            MockColumn::new("id", oid::INT4),
            MockColumn::new("name", oid::TEXT),
            MockColumn::new("email", oid::VARCHAR),
        ],
        vec![
            vec![SqlValue::Int(1), "alice".into(), "alice@example.com".into()],
            vec![SqlValue::Int(2), "bob".into(), "bob@example.com".into()],
            vec![SqlValue::Int(3), "carol".into(), SqlValue::Null],
        ],
    )
}

/// A one-dimensional `int4[]` value.
pub fn int4_array(values: &[i32]) -> SqlValue {
    SqlValue::Array(SqlArray::from_elements(
        oid::INT4,
        values.iter().copied().map(SqlValue::Int).collect(),
    ))
}

/// A one-dimensional `text[]` value; `None` elements are NULL.
pub fn text_array(values: &[Option<&str>]) -> SqlValue {
    SqlValue::Array(SqlArray::from_elements(
        oid::TEXT,
        values
            .iter()
            .map(|v| v.map_or(SqlValue::Null, |s| SqlValue::String(s.to_string())))
            .collect(),
    ))
}
