//! The seam between the resource graph and whatever speaks to the server.
//!
//! A [`Transport`] is one server session: connecting, sending queries and
//! prepared-statement executions, handing back result buffers. A
//! [`RawResult`] is one such buffer. Dropping a `RawResult` releases it;
//! the resource graph guarantees that happens exactly once per buffer.
//!
//! Transports report failures the way libpq does: boolean or `Option`
//! returns, with the reason in [`Transport::error_message`]. The graph turns
//! those into [`Error::Transport`](crate::Error::Transport) carrying the
//! message unchanged.

use std::fmt;

use pq_protocol::{Oid, ParamBuffer};

use crate::config::Config;
use crate::error::Result;

/// Socket descriptor as reported by the transport.
pub type Socket = i32;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnStatus {
    /// Ready for queries.
    Ok,
    /// Connection failed or was lost.
    Bad,
    /// Non-blocking connect in progress.
    Started,
    /// Waiting for the server to answer the startup packet.
    Made,
    /// Waiting for authentication.
    AwaitingResponse,
    /// Authenticated, waiting for the backend to start up.
    AuthOk,
    /// Negotiating environment settings.
    Setenv,
    /// Negotiating SSL.
    SslStartup,
}

/// Progress of a non-blocking connect or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Failed; see the connection's error message.
    Failed,
    /// Wait until the socket is readable, then poll again.
    Reading,
    /// Wait until the socket is writable, then poll again.
    Writing,
    /// Connected.
    Ok,
}

/// Status of a result buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExecStatus {
    /// An empty query string was sent.
    EmptyQuery,
    /// A command returning no rows completed.
    CommandOk,
    /// A query returning rows completed.
    TuplesOk,
    /// COPY OUT started.
    CopyOut,
    /// COPY IN started.
    CopyIn,
    /// The server's response was not understood.
    BadResponse,
    /// A notice or warning.
    NonfatalError,
    /// The command failed.
    FatalError,
    /// COPY BOTH started.
    CopyBoth,
    /// One row of a single-row-mode result.
    SingleTuple,
}

impl ExecStatus {
    /// The libpq name of this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyQuery => "PGRES_EMPTY_QUERY",
            Self::CommandOk => "PGRES_COMMAND_OK",
            Self::TuplesOk => "PGRES_TUPLES_OK",
            Self::CopyOut => "PGRES_COPY_OUT",
            Self::CopyIn => "PGRES_COPY_IN",
            Self::BadResponse => "PGRES_BAD_RESPONSE",
            Self::NonfatalError => "PGRES_NONFATAL_ERROR",
            Self::FatalError => "PGRES_FATAL_ERROR",
            Self::CopyBoth => "PGRES_COPY_BOTH",
            Self::SingleTuple => "PGRES_SINGLE_TUPLE",
        }
    }

    /// Check if this status reports a failed command.
    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Self::BadResponse | Self::FatalError)
    }

    /// Check if a result with this status carries row data.
    #[must_use]
    pub fn has_rows(self) -> bool {
        matches!(self, Self::TuplesOk | Self::SingleTuple)
    }
}

impl fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asynchronous notification received via LISTEN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Channel name.
    pub channel: String,
    /// Process id of the notifying backend.
    pub pid: i32,
    /// Payload string, empty when none was sent.
    pub payload: String,
}

/// One server session.
pub trait Transport: Sized {
    /// Result buffer type produced by this transport.
    type Result: RawResult;

    /// Open a session and block until it is ready or has failed.
    ///
    /// A session that reaches [`ConnStatus::Bad`] is still returned; the
    /// caller inspects [`status`](Self::status) and
    /// [`error_message`](Self::error_message).
    fn connect(config: &Config) -> Result<Self>;

    /// Begin a non-blocking connect. Drive it with
    /// [`poll_connect`](Self::poll_connect).
    fn start(config: &Config) -> Result<Self>;

    /// Advance a non-blocking connect.
    fn poll_connect(&mut self) -> PollStatus;

    /// Current session state.
    fn status(&self) -> ConnStatus;

    /// Close and reopen the session, blocking.
    fn reset(&mut self);

    /// Begin a non-blocking reset. Returns false if it could not start.
    fn reset_start(&mut self) -> bool;

    /// Advance a non-blocking reset.
    fn reset_poll(&mut self) -> PollStatus;

    /// The session's socket, if one is open.
    fn socket(&self) -> Option<Socket>;

    /// Most recent error message, empty if none.
    fn error_message(&self) -> String;

    /// Check if a query is in progress and reading a result would block.
    fn is_busy(&self) -> bool;

    /// Read pending input from the server. Returns false on failure.
    fn consume_input(&mut self) -> bool;

    /// Take the next pending notification.
    fn notifies(&mut self) -> Option<Notification>;

    /// Send a query without waiting for its result. Returns false if it
    /// could not be sent.
    fn send_query(&mut self, sql: &str, binary: bool) -> bool;

    /// Send a prepared-statement execution without waiting for its result.
    fn send_query_prepared(&mut self, name: &str, params: &ParamBuffer) -> bool;

    /// Next result of an asynchronous query, or `None` when there are no
    /// more.
    fn get_result(&mut self) -> Option<Self::Result>;

    /// Run a query and wait for its result. `None` means the transport
    /// could not produce a result buffer at all.
    fn exec(&mut self, sql: &str, binary: bool) -> Option<Self::Result>;

    /// Prepare a named statement.
    fn prepare(&mut self, name: &str, sql: &str) -> Option<Self::Result>;

    /// Describe a named prepared statement. The result reports parameter
    /// types through [`RawResult::param_type`].
    fn describe_prepared(&mut self, name: &str) -> Option<Self::Result>;

    /// Execute a prepared statement with binary parameters, requesting
    /// binary results.
    fn exec_prepared(&mut self, name: &str, params: &ParamBuffer) -> Option<Self::Result>;

    /// Close the session. Called exactly once by the owning connection.
    fn finish(&mut self);
}

/// One result buffer. Dropping it releases the buffer.
pub trait RawResult {
    /// Result status.
    fn status(&self) -> ExecStatus;

    /// Error message, empty if none.
    fn error_message(&self) -> String;

    /// Number of rows.
    fn ntuples(&self) -> usize;

    /// Number of columns.
    fn nfields(&self) -> usize;

    /// Column name.
    fn field_name(&self, column: usize) -> Option<&str>;

    /// Column type.
    fn field_type(&self, column: usize) -> Oid;

    /// Column type modifier, -1 when none.
    fn field_modifier(&self, column: usize) -> i32;

    /// Check if a cell is NULL.
    fn is_null(&self, row: usize, column: usize) -> bool;

    /// Binary payload of a cell. `None` for NULL or out-of-range cells.
    fn value(&self, row: usize, column: usize) -> Option<&[u8]>;

    /// Number of parameters of a described statement.
    fn nparams(&self) -> usize;

    /// Type of a parameter of a described statement.
    fn param_type(&self, index: usize) -> Oid;

    /// Command tag, such as `INSERT 0 1`.
    fn cmd_status(&self) -> &str;

    /// Rows affected, for commands that report it.
    fn cmd_tuples(&self) -> Option<u64>;
}
