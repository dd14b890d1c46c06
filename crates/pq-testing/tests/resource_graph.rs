//! Lifetime rules of the connection/statement and result/row graphs.
//!
//! Every test runs against the scripted transport, which counts result
//! buffer releases and session teardowns so double frees and leaks show up
//! as wrong counts.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pq_client::{Error, ExecStatus};
use pq_protocol::types::oid;
use pq_testing::fixtures::{self, USERS_QUERY};
use pq_testing::mock_server::{MockColumn, MockResponse, MockServer};

fn prepared_server() -> MockServer {
    MockServer::builder()
        .with_statement("SELECT $1::int4", vec![oid::INT4])
        .with_response("SELECT $1::int4", MockResponse::Echo)
        .with_response(USERS_QUERY, fixtures::users_response())
        .build()
}

// =============================================================================
// Connection -> Statement
// =============================================================================

#[test]
fn test_finish_invalidates_statements() {
    let server = prepared_server();
    let conn = fixtures::connect(&server).unwrap();
    let stmt = conn.prepare("SELECT $1::int4", "echo").unwrap();
    assert!(stmt.is_valid());
    assert_eq!(conn.live_statements(), 1);

    conn.finish();

    assert!(!stmt.is_valid());
    let err = stmt.execute(&[&1i32]).unwrap_err();
    assert!(err.is_invalid_handle(), "unexpected error: {err}");
    assert!(stmt.len().unwrap_err().is_invalid_handle());
    assert!(stmt.bind(&[&1i32]).unwrap_err().is_invalid_handle());
    // The name stays readable for diagnostics.
    assert_eq!(stmt.name(), "echo");
}

#[test]
fn test_operations_on_finished_connection_fail() {
    let server = prepared_server();
    let conn = fixtures::connect(&server).unwrap();
    conn.finish();

    assert!(conn.is_finished());
    assert!(conn.execute(USERS_QUERY).unwrap_err().is_invalid_handle());
    assert!(conn.prepare("SELECT 1", "").unwrap_err().is_invalid_handle());
    assert!(conn.status().unwrap_err().is_invalid_handle());
    assert!(conn.db().unwrap_err().is_invalid_handle());
    assert!(conn.notifies().unwrap_err().is_invalid_handle());
    assert!(matches!(
        conn.send_query(USERS_QUERY),
        Err(Error::InvalidHandle("connection is finished"))
    ));
}

#[test]
fn test_finish_is_idempotent() {
    let server = prepared_server();
    let conn = fixtures::connect(&server).unwrap();
    let _stmt = conn.prepare("SELECT $1::int4", "echo").unwrap();

    conn.finish();
    conn.finish();
    drop(conn);

    assert_eq!(server.finish_calls(), 1);
}

#[test]
fn test_drop_finishes_and_invalidates() {
    let server = prepared_server();
    let conn = fixtures::connect(&server).unwrap();
    let stmt = conn.prepare("SELECT $1::int4", "echo").unwrap();

    drop(conn);

    assert_eq!(server.finish_calls(), 1);
    assert!(!stmt.is_valid());
    assert!(stmt.execute(&[&1i32]).unwrap_err().is_invalid_handle());
}

#[test]
fn test_dropped_statements_are_not_tracked() {
    let server = prepared_server();
    let conn = fixtures::connect(&server).unwrap();

    let first = conn.prepare("SELECT $1::int4", "first").unwrap();
    let second = conn.prepare("SELECT $1::int4", "second").unwrap();
    let second_clone = second.clone();
    assert_eq!(conn.live_statements(), 2);

    drop(first);
    assert_eq!(conn.live_statements(), 1);
    drop(second);
    assert_eq!(conn.live_statements(), 1, "the clone keeps it alive");
    drop(second_clone);
    assert_eq!(conn.live_statements(), 0);

    conn.finish();
    assert_eq!(server.finish_calls(), 1);
}

// =============================================================================
// ResultSet -> Row
// =============================================================================

#[test]
fn test_release_invalidates_rows() {
    let server = prepared_server();
    let conn = fixtures::connect(&server).unwrap();
    let mut result = conn.execute(USERS_QUERY).unwrap();

    let first = result.row(0).unwrap().unwrap();
    let last = result.row(2).unwrap().unwrap();
    assert_eq!(first.get::<i32>(0).unwrap(), 1);
    assert_eq!(result.live_rows(), 2);

    result.release();

    assert!(result.is_released());
    assert!(!first.is_valid());
    assert!(!last.is_valid());
    assert!(first.get::<i32>(0).unwrap_err().is_invalid_handle());
    assert!(last.values().unwrap_err().is_invalid_handle());
    assert!(result.row(0).unwrap_err().is_invalid_handle());
    assert!(result.value(0, 0).unwrap_err().is_invalid_handle());
    assert!(result.len().unwrap_err().is_invalid_handle());
    // Row positions stay readable.
    assert_eq!(last.index(), 2);
    // Copied metadata stays readable.
    assert_eq!(result.status(), ExecStatus::TuplesOk);
}

#[test]
fn test_release_frees_buffer_exactly_once() {
    let server = prepared_server();
    let conn = fixtures::connect(&server).unwrap();
    let mut result = conn.execute(USERS_QUERY).unwrap();
    let row = result.row(1).unwrap().unwrap();
    assert_eq!(server.live_results(), 1);

    result.release();
    result.release();
    assert_eq!(server.results_released(), 1);

    drop(row);
    drop(result);
    assert_eq!(server.results_released(), 1);
    assert_eq!(server.live_results(), 0);
}

#[test]
fn test_drop_releases_and_rows_outlive_it() {
    let server = prepared_server();
    let conn = fixtures::connect(&server).unwrap();
    let result = conn.execute(USERS_QUERY).unwrap();
    let row = result.row(0).unwrap().unwrap();

    drop(result);

    assert_eq!(server.live_results(), 0);
    assert!(!row.is_valid());
    assert!(matches!(
        row.get::<String>(1),
        Err(Error::InvalidHandle("referenced result set is released"))
    ));
}

#[test]
fn test_row_handles_share_identity() {
    let server = prepared_server();
    let conn = fixtures::connect(&server).unwrap();
    let result = conn.execute(USERS_QUERY).unwrap();

    let a = result.row(1).unwrap().unwrap();
    let b = result.row(1).unwrap().unwrap();
    let other = result.row(2).unwrap().unwrap();
    assert_eq!(a, b);
    assert_ne!(a, other);
    assert_eq!(result.live_rows(), 2);

    drop(a);
    drop(b);
    assert_eq!(result.live_rows(), 1);
    drop(other);
    assert_eq!(result.live_rows(), 0);
}

#[test]
fn test_rows_past_the_end_and_without_data() {
    let server = MockServer::builder()
        .with_response(USERS_QUERY, fixtures::users_response())
        .with_response("DELETE FROM users", MockResponse::command("DELETE 3", Some(3)))
        .build();
    let conn = fixtures::connect(&server).unwrap();

    let result = conn.execute(USERS_QUERY).unwrap();
    assert!(result.row(3).unwrap().is_none());
    assert_eq!(result.rows().unwrap().count(), 3);

    let deleted = conn.execute("DELETE FROM users").unwrap();
    assert_eq!(deleted.status(), ExecStatus::CommandOk);
    assert_eq!(deleted.len().unwrap(), 3);
    assert!(deleted.row(0).unwrap().is_none());
    assert!(deleted.columns().unwrap().is_empty());
    assert_eq!(deleted.fetch().unwrap().count(), 0);
}

#[test]
fn test_cells_past_the_end_are_errors() {
    let server = MockServer::builder()
        .with_response(USERS_QUERY, fixtures::users_response())
        .with_response("DELETE FROM users", MockResponse::command("DELETE 3", Some(3)))
        .build();
    let conn = fixtures::connect(&server).unwrap();

    let result = conn.execute(USERS_QUERY).unwrap();
    assert!(matches!(
        result.value(103, 0),
        Err(Error::RowOutOfRange {
            index: 103,
            count: 3
        })
    ));
    assert!(matches!(
        result.value(3, 0),
        Err(Error::RowOutOfRange { index: 3, .. })
    ));
    assert!(matches!(
        result.value(0, 3),
        Err(Error::ColumnOutOfRange { index: 3, count: 3 })
    ));
    // The last row's NULL email is still a real NULL.
    assert!(result.value(2, 2).unwrap().is_null());

    let deleted = conn.execute("DELETE FROM users").unwrap();
    assert!(matches!(
        deleted.value(0, 0),
        Err(Error::RowOutOfRange { index: 0, count: 0 })
    ));
}

#[test]
fn test_results_outlive_their_connection() {
    let server = prepared_server();
    let conn = fixtures::connect(&server).unwrap();
    let result = conn.execute(USERS_QUERY).unwrap();

    conn.finish();

    let row = result.row(0).unwrap().unwrap();
    assert_eq!(row.get_by_name::<String>("name").unwrap(), "alice");
    drop(row);
    drop(result);
    assert_eq!(server.live_results(), 0);
}

#[test]
fn test_error_results_are_released() {
    let server = MockServer::builder()
        .with_response(
            "SELECT * FROM nope",
            MockResponse::error("ERROR:  relation \"nope\" does not exist"),
        )
        .build();
    let conn = fixtures::connect(&server).unwrap();

    let err = conn.execute("SELECT * FROM nope").unwrap_err();

    assert!(err.is_server_error());
    assert!(err.to_string().contains("relation \"nope\" does not exist"));
    assert_eq!(server.results_created(), 1);
    assert_eq!(server.live_results(), 0);
}

#[test]
fn test_prepare_and_describe_release_their_buffers() {
    let server = prepared_server();
    let conn = fixtures::connect(&server).unwrap();

    let stmt = conn.prepare("SELECT $1::int4", "echo").unwrap();
    let again = conn.describe("echo").unwrap();
    assert_eq!(again.param_types().unwrap(), &[oid::INT4]);

    let result = stmt.execute(&[&5i32]).unwrap();
    assert_eq!(server.live_results(), 1);
    drop(result);
    assert_eq!(server.live_results(), 0);
}

#[test]
fn test_bpchar_column_through_a_row() {
    let server = MockServer::builder()
        .with_response(
            "SELECT code FROM codes",
            MockResponse::raw_rows(
                vec![MockColumn::new("code", oid::BPCHAR).with_modifier(5 + 4)],
                vec![vec![Some(bytes::Bytes::from_static(b"ab"))]],
            ),
        )
        .build();
    let conn = fixtures::connect(&server).unwrap();
    let result = conn.execute("SELECT code FROM codes").unwrap();
    let row = result.row(0).unwrap().unwrap();

    assert_eq!(row.get::<String>(0).unwrap(), "ab   ");
}
