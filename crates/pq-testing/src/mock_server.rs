//! Scripted in-process server for unit and integration tests.
//!
//! [`MockServer`] holds canned responses keyed by SQL text, the prepared
//! statements created against it, and counters that let tests observe how
//! the client layer drives a [`Transport`]: how many result buffers were
//! created and released, how often the session was finished, which
//! parameters were bound.
//!
//! Responses are built from [`SqlValue`]s and encoded in the binary format
//! before they reach the client, so decoding runs through the real codecs.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use bytes::{Bytes, BytesMut};
use pq_client::{
    Config, ConnStatus, Error, ExecStatus, Notification, PollStatus, RawResult, Socket, Transport,
};
use pq_protocol::{Oid, ParamBuffer};
use pq_types::{SqlValue, encode_value};

/// Socket number reported by open mock sessions.
pub const MOCK_SOCKET: Socket = 7;

/// Handler deciding a response at execution time.
pub type ResponseFn = dyn Fn(&str, Option<&ParamBuffer>) -> MockResponse;

/// Mock response configuration.
#[derive(Clone)]
pub enum MockResponse {
    /// Return rows.
    Rows {
        /// Column definitions.
        columns: Vec<MockColumn>,
        /// Encoded cells; `None` is NULL.
        rows: Vec<Vec<Option<Bytes>>>,
    },

    /// Return a command completion without rows.
    Command {
        /// Command tag, such as `INSERT 0 1`.
        tag: String,
        /// Rows affected, if the command reports it.
        affected: Option<u64>,
    },

    /// Return an error result.
    Error {
        /// Result status.
        status: ExecStatus,
        /// Error message.
        message: String,
    },

    /// Return an empty-query result.
    Empty,

    /// Return one row whose cells are the bound parameters, typed as the
    /// statement's parameters.
    Echo,

    /// Decide the response when the query runs.
    Custom(Rc<ResponseFn>),
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rows { columns, rows } => f
                .debug_struct("Rows")
                .field("columns", columns)
                .field("rows", &rows.len())
                .finish(),
            Self::Command { tag, affected } => f
                .debug_struct("Command")
                .field("tag", tag)
                .field("affected", affected)
                .finish(),
            Self::Error { status, message } => f
                .debug_struct("Error")
                .field("status", status)
                .field("message", message)
                .finish(),
            Self::Empty => f.write_str("Empty"),
            Self::Echo => f.write_str("Echo"),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<fn>").finish(),
        }
    }
}

impl MockResponse {
    /// Create a row response from values, encoded as the column types.
    ///
    /// A value that cannot be encoded as its column's type turns the whole
    /// response into a fatal error naming the cell.
    pub fn rows(columns: Vec<MockColumn>, rows: Vec<Vec<SqlValue>>) -> Self {
        let mut encoded = Vec::with_capacity(rows.len());
        for (r, row) in rows.iter().enumerate() {
            let mut cells = Vec::with_capacity(row.len());
            for (c, value) in row.iter().enumerate() {
                let type_id = columns.get(c).map_or(0, |col| col.type_id);
                match encode_cell(type_id, value) {
                    Ok(cell) => cells.push(cell),
                    Err(e) => {
                        return Self::error(format!("mock cell ({r}, {c}) cannot be encoded: {e}"));
                    }
                }
            }
            encoded.push(cells);
        }
        Self::Rows {
            columns,
            rows: encoded,
        }
    }

    /// Create a row response from already encoded cells.
    pub fn raw_rows(columns: Vec<MockColumn>, rows: Vec<Vec<Option<Bytes>>>) -> Self {
        Self::Rows { columns, rows }
    }

    /// Create a single-cell response.
    pub fn scalar(column: MockColumn, value: impl Into<SqlValue>) -> Self {
        Self::rows(vec![column], vec![vec![value.into()]])
    }

    /// Create a command completion response.
    pub fn command(tag: impl Into<String>, affected: Option<u64>) -> Self {
        Self::Command {
            tag: tag.into(),
            affected,
        }
    }

    /// Create a fatal error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            status: ExecStatus::FatalError,
            message: message.into(),
        }
    }

    /// Create a response computed at execution time.
    pub fn custom(handler: impl Fn(&str, Option<&ParamBuffer>) -> MockResponse + 'static) -> Self {
        Self::Custom(Rc::new(handler))
    }
}

/// Mock column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockColumn {
    /// Column name.
    pub name: String,
    /// Column type.
    pub type_id: Oid,
    /// Type modifier, -1 when none.
    pub modifier: i32,
}

impl MockColumn {
    /// Create a column with no type modifier.
    pub fn new(name: impl Into<String>, type_id: Oid) -> Self {
        Self {
            name: name.into(),
            type_id,
            modifier: -1,
        }
    }

    /// Set the type modifier.
    #[must_use]
    pub fn with_modifier(mut self, modifier: i32) -> Self {
        self.modifier = modifier;
        self
    }
}

fn encode_cell(type_id: Oid, value: &SqlValue) -> Result<Option<Bytes>, pq_types::TypeError> {
    if value.is_null() {
        return Ok(None);
    }
    let mut buf = BytesMut::new();
    encode_value(type_id, value, &mut buf)?;
    Ok(Some(buf.freeze()))
}

/// One call the client made against the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executed {
    /// A simple query.
    Query(String),
    /// A prepare.
    Prepare {
        /// Statement name.
        name: String,
        /// Statement text.
        sql: String,
    },
    /// A prepared-statement execution.
    Execute {
        /// Statement name.
        name: String,
        /// Bound parameters.
        params: ParamBuffer,
    },
}

#[derive(Debug, Clone)]
struct PreparedStatement {
    sql: String,
    param_types: Vec<Oid>,
}

#[derive(Default)]
struct ServerState {
    responses: HashMap<String, Vec<MockResponse>>,
    statement_types: HashMap<String, Vec<Oid>>,
    statements: HashMap<String, PreparedStatement>,
    executed: Vec<Executed>,
    pending: VecDeque<MockResponse>,
    notifications: VecDeque<Notification>,
    poll_script: VecDeque<PollStatus>,
    connect_failure: Option<String>,
    fail_next: Option<String>,
    busy_polls: usize,
    status: Option<ConnStatus>,
    error_message: String,
    finish_calls: usize,
    reset_calls: usize,
    last_config: Option<Config>,
}

#[derive(Debug, Default)]
struct ResultStats {
    created: Cell<usize>,
    released: Cell<usize>,
}

/// Builder for [`MockServer`].
#[derive(Default)]
pub struct MockServerBuilder {
    state: ServerState,
}

impl MockServerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `sql` with `response`.
    #[must_use]
    pub fn with_response(mut self, sql: impl Into<String>, response: MockResponse) -> Self {
        self.state.responses.insert(sql.into(), vec![response]);
        self
    }

    /// Respond to `sql` with several results, as a multi-statement query
    /// would.
    #[must_use]
    pub fn with_responses(mut self, sql: impl Into<String>, responses: Vec<MockResponse>) -> Self {
        self.state.responses.insert(sql.into(), responses);
        self
    }

    /// Report `param_types` when a statement with this text is described.
    ///
    /// Statements without declared types get one unspecified parameter per
    /// `$n` placeholder.
    #[must_use]
    pub fn with_statement(mut self, sql: impl Into<String>, param_types: Vec<Oid>) -> Self {
        self.state.statement_types.insert(sql.into(), param_types);
        self
    }

    /// Queue a notification.
    #[must_use]
    pub fn with_notification(mut self, channel: impl Into<String>, payload: impl Into<String>) -> Self {
        self.state.notifications.push_back(Notification {
            channel: channel.into(),
            pid: 4242,
            payload: payload.into(),
        });
        self
    }

    /// Script the answers of non-blocking connect and reset polls.
    #[must_use]
    pub fn with_poll_script(mut self, script: impl IntoIterator<Item = PollStatus>) -> Self {
        self.state.poll_script = script.into_iter().collect();
        self
    }

    /// Make connecting fail with `message`.
    #[must_use]
    pub fn with_connect_failure(mut self, message: impl Into<String>) -> Self {
        self.state.connect_failure = Some(message.into());
        self
    }

    /// Report busy for the given number of input reads.
    #[must_use]
    pub fn with_busy_polls(mut self, polls: usize) -> Self {
        self.state.busy_polls = polls;
        self
    }

    /// Build the server.
    pub fn build(self) -> MockServer {
        MockServer {
            state: Rc::new(RefCell::new(self.state)),
            stats: Rc::new(ResultStats::default()),
        }
    }
}

thread_local! {
    static INSTALLED: RefCell<Option<MockServer>> = const { RefCell::new(None) };
}

/// Scripted server shared between a test and the transports it hands out.
#[derive(Clone)]
pub struct MockServer {
    state: Rc<RefCell<ServerState>>,
    stats: Rc<ResultStats>,
}

impl MockServer {
    /// Create a builder.
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::new()
    }

    /// Make this server the target of [`MockTransport::connect`] and
    /// [`MockTransport::start`] on the current thread.
    pub fn install(&self) {
        INSTALLED.with(|slot| *slot.borrow_mut() = Some(self.clone()));
    }

    /// Open a ready session directly, bypassing [`install`](Self::install).
    pub fn transport(&self) -> MockTransport {
        self.state.borrow_mut().status = Some(ConnStatus::Ok);
        MockTransport {
            server: self.clone(),
        }
    }

    /// Make the next send or execution fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state.borrow_mut().fail_next = Some(message.into());
    }

    /// Queue a notification.
    pub fn notify(&self, channel: impl Into<String>, payload: impl Into<String>) {
        self.state.borrow_mut().notifications.push_back(Notification {
            channel: channel.into(),
            pid: 4242,
            payload: payload.into(),
        });
    }

    /// Drop the session, as a lost connection would.
    pub fn disconnect(&self, message: impl Into<String>) {
        let mut state = self.state.borrow_mut();
        state.status = Some(ConnStatus::Bad);
        state.error_message = message.into();
    }

    /// Calls made so far, in order.
    pub fn executed(&self) -> Vec<Executed> {
        self.state.borrow().executed.clone()
    }

    /// Names of statements prepared so far.
    pub fn statement_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.borrow().statements.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of result buffers handed out.
    pub fn results_created(&self) -> usize {
        self.stats.created.get()
    }

    /// Number of result buffers released.
    pub fn results_released(&self) -> usize {
        self.stats.released.get()
    }

    /// Number of result buffers handed out and not yet released.
    pub fn live_results(&self) -> usize {
        self.results_created() - self.results_released()
    }

    /// Number of times a session was finished.
    pub fn finish_calls(&self) -> usize {
        self.state.borrow().finish_calls
    }

    /// Number of times a session was reset.
    pub fn reset_calls(&self) -> usize {
        self.state.borrow().reset_calls
    }

    /// Configuration of the most recent connect or start.
    pub fn last_config(&self) -> Option<Config> {
        self.state.borrow().last_config.clone()
    }

    fn installed() -> Result<Self, Error> {
        INSTALLED
            .with(|slot| slot.borrow().clone())
            .ok_or_else(|| Error::Transport("no mock server installed on this thread".into()))
    }

    fn take_failure(&self) -> Option<String> {
        let mut state = self.state.borrow_mut();
        let message = state.fail_next.take()?;
        state.error_message.clone_from(&message);
        Some(message)
    }

    fn responses_for(&self, sql: &str, params: Option<&ParamBuffer>) -> Vec<MockResponse> {
        let responses = self.state.borrow().responses.get(sql).cloned();
        let responses = responses
            .unwrap_or_else(|| vec![MockResponse::error(format!("mock: no response for \"{sql}\""))]);
        // Handlers run without the state borrowed so they may call back in.
        responses
            .into_iter()
            .map(|response| match response {
                MockResponse::Custom(handler) => handler(sql, params),
                other => other,
            })
            .collect()
    }

    fn result(&self, response: MockResponse, params: Option<&ParamBuffer>) -> MockResult {
        self.stats.created.set(self.stats.created.get() + 1);
        let mut result = MockResult {
            status: ExecStatus::CommandOk,
            error_message: String::new(),
            columns: Vec::new(),
            rows: Vec::new(),
            param_types: Vec::new(),
            cmd_status: String::new(),
            cmd_tuples: None,
            stats: Rc::clone(&self.stats),
        };
        match response {
            MockResponse::Rows { columns, rows } => {
                result.status = ExecStatus::TuplesOk;
                result.cmd_status = format!("SELECT {}", rows.len());
                result.cmd_tuples = Some(rows.len() as u64);
                result.columns = columns;
                result.rows = rows;
            }
            MockResponse::Command { tag, affected } => {
                result.cmd_status = tag;
                result.cmd_tuples = affected;
            }
            MockResponse::Error { status, message } => {
                result.status = status;
                result.error_message = message;
            }
            MockResponse::Empty => result.status = ExecStatus::EmptyQuery,
            MockResponse::Echo => {
                let params = params.cloned().unwrap_or_default();
                result.status = ExecStatus::TuplesOk;
                result.cmd_status = "SELECT 1".into();
                result.cmd_tuples = Some(1);
                result.columns = params
                    .types()
                    .iter()
                    .enumerate()
                    .map(|(i, &type_id)| MockColumn::new(format!("${}", i + 1), type_id))
                    .collect();
                result.rows = vec![
                    params
                        .iter()
                        .map(|(_, value)| value.map(Bytes::copy_from_slice))
                        .collect(),
                ];
            }
            MockResponse::Custom(_) => {
                result.status = ExecStatus::FatalError;
                result.error_message = "mock: nested custom response".into();
            }
        }
        result
    }
}

impl fmt::Debug for MockServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MockServer")
            .field("responses", &state.responses.len())
            .field("statements", &state.statements.len())
            .field("results_created", &self.stats.created.get())
            .field("results_released", &self.stats.released.get())
            .finish()
    }
}

/// Count `$n` placeholders by the highest index used.
fn placeholder_count(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut highest = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let digits: String = sql[i + 1..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(n) = digits.parse::<usize>() {
                highest = highest.max(n);
            }
            i += digits.len();
        }
        i += 1;
    }
    highest
}

/// A session against a [`MockServer`].
#[derive(Debug)]
pub struct MockTransport {
    server: MockServer,
}

impl MockTransport {
    fn open(config: &Config, status: ConnStatus) -> Result<Self, Error> {
        let server = MockServer::installed()?;
        {
            let mut state = server.state.borrow_mut();
            state.last_config = Some(config.clone());
            if let Some(message) = state.connect_failure.clone() {
                state.status = Some(ConnStatus::Bad);
                state.error_message = message;
            } else {
                state.status = Some(status);
            }
        }
        tracing::trace!(host = %config.host, "mock session opened");
        Ok(Self { server })
    }

    fn state(&self) -> std::cell::RefMut<'_, ServerState> {
        self.server.state.borrow_mut()
    }

    fn next_poll(&self) -> PollStatus {
        let mut state = self.state();
        let next = state.poll_script.pop_front().unwrap_or(PollStatus::Ok);
        match next {
            PollStatus::Ok => state.status = Some(ConnStatus::Ok),
            PollStatus::Failed => {
                state.status = Some(ConnStatus::Bad);
                state.error_message = "mock: connection attempt failed".into();
            }
            PollStatus::Reading | PollStatus::Writing => {}
        }
        next
    }
}

impl Transport for MockTransport {
    type Result = MockResult;

    fn connect(config: &Config) -> pq_client::Result<Self> {
        Self::open(config, ConnStatus::Ok)
    }

    fn start(config: &Config) -> pq_client::Result<Self> {
        Self::open(config, ConnStatus::Started)
    }

    fn poll_connect(&mut self) -> PollStatus {
        self.next_poll()
    }

    fn status(&self) -> ConnStatus {
        self.server
            .state
            .borrow()
            .status
            .unwrap_or(ConnStatus::Bad)
    }

    fn reset(&mut self) {
        let mut state = self.state();
        state.reset_calls += 1;
        if state.connect_failure.is_none() {
            state.status = Some(ConnStatus::Ok);
            state.error_message.clear();
        }
    }

    fn reset_start(&mut self) -> bool {
        let mut state = self.state();
        state.reset_calls += 1;
        state.status = Some(ConnStatus::Started);
        true
    }

    fn reset_poll(&mut self) -> PollStatus {
        self.next_poll()
    }

    fn socket(&self) -> Option<Socket> {
        match self.status() {
            ConnStatus::Bad => None,
            _ => Some(MOCK_SOCKET),
        }
    }

    fn error_message(&self) -> String {
        self.server.state.borrow().error_message.clone()
    }

    fn is_busy(&self) -> bool {
        self.server.state.borrow().busy_polls > 0
    }

    fn consume_input(&mut self) -> bool {
        if self.server.take_failure().is_some() {
            return false;
        }
        let mut state = self.state();
        state.busy_polls = state.busy_polls.saturating_sub(1);
        true
    }

    fn notifies(&mut self) -> Option<Notification> {
        self.state().notifications.pop_front()
    }

    fn send_query(&mut self, sql: &str, _binary: bool) -> bool {
        if self.server.take_failure().is_some() {
            return false;
        }
        self.state().executed.push(Executed::Query(sql.to_string()));
        let responses = self.server.responses_for(sql, None);
        self.state().pending.extend(responses);
        true
    }

    fn send_query_prepared(&mut self, name: &str, params: &ParamBuffer) -> bool {
        if self.server.take_failure().is_some() {
            return false;
        }
        let sql = self.state().statements.get(name).map(|s| s.sql.clone());
        let Some(sql) = sql else {
            let message = format!("prepared statement \"{name}\" does not exist");
            self.state().pending.push_back(MockResponse::error(message));
            return true;
        };
        self.state().executed.push(Executed::Execute {
            name: name.to_string(),
            params: params.clone(),
        });
        let responses = self.server.responses_for(&sql, Some(params));
        self.state().pending.extend(responses);
        true
    }

    fn get_result(&mut self) -> Option<MockResult> {
        let response = self.state().pending.pop_front()?;
        // Echo responses were queued with their parameters already consumed.
        let params = match self.server.state.borrow().executed.last() {
            Some(Executed::Execute { params, .. }) => Some(params.clone()),
            _ => None,
        };
        Some(self.server.result(response, params.as_ref()))
    }

    fn exec(&mut self, sql: &str, _binary: bool) -> Option<MockResult> {
        if self.server.take_failure().is_some() {
            return None;
        }
        self.state().executed.push(Executed::Query(sql.to_string()));
        let mut last = None;
        for response in self.server.responses_for(sql, None) {
            // Earlier results of a multi-statement query are discarded.
            last = Some(self.server.result(response, None));
        }
        last
    }

    fn prepare(&mut self, name: &str, sql: &str) -> Option<MockResult> {
        if self.server.take_failure().is_some() {
            return None;
        }
        let mut state = self.state();
        state.executed.push(Executed::Prepare {
            name: name.to_string(),
            sql: sql.to_string(),
        });
        if !name.is_empty() && state.statements.contains_key(name) {
            drop(state);
            return Some(self.server.result(
                MockResponse::error(format!("prepared statement \"{name}\" already exists")),
                None,
            ));
        }
        let param_types = state
            .statement_types
            .get(sql)
            .cloned()
            .unwrap_or_else(|| vec![0; placeholder_count(sql)]);
        state.statements.insert(
            name.to_string(),
            PreparedStatement {
                sql: sql.to_string(),
                param_types,
            },
        );
        drop(state);
        Some(self.server.result(MockResponse::command("PREPARE", None), None))
    }

    fn describe_prepared(&mut self, name: &str) -> Option<MockResult> {
        if self.server.take_failure().is_some() {
            return None;
        }
        let statement = self.state().statements.get(name).cloned();
        match statement {
            Some(statement) => {
                let mut result = self.server.result(MockResponse::command("", None), None);
                result.param_types = statement.param_types;
                Some(result)
            }
            None => Some(self.server.result(
                MockResponse::error(format!("prepared statement \"{name}\" does not exist")),
                None,
            )),
        }
    }

    fn exec_prepared(&mut self, name: &str, params: &ParamBuffer) -> Option<MockResult> {
        if self.server.take_failure().is_some() {
            return None;
        }
        let sql = self.state().statements.get(name).map(|s| s.sql.clone());
        let Some(sql) = sql else {
            return Some(self.server.result(
                MockResponse::error(format!("prepared statement \"{name}\" does not exist")),
                None,
            ));
        };
        self.state().executed.push(Executed::Execute {
            name: name.to_string(),
            params: params.clone(),
        });
        let mut last = None;
        for response in self.server.responses_for(&sql, Some(params)) {
            last = Some(self.server.result(response, Some(params)));
        }
        last
    }

    fn finish(&mut self) {
        let mut state = self.state();
        state.finish_calls += 1;
        state.status = Some(ConnStatus::Bad);
        state.pending.clear();
        tracing::trace!("mock session finished");
    }
}

/// A result buffer produced by [`MockTransport`]. Dropping it counts as a
/// release on the server.
pub struct MockResult {
    status: ExecStatus,
    error_message: String,
    columns: Vec<MockColumn>,
    rows: Vec<Vec<Option<Bytes>>>,
    param_types: Vec<Oid>,
    cmd_status: String,
    cmd_tuples: Option<u64>,
    stats: Rc<ResultStats>,
}

impl fmt::Debug for MockResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockResult")
            .field("status", &self.status)
            .field("columns", &self.columns)
            .field("rows", &self.rows.len())
            .finish()
    }
}

impl MockResult {
    fn cell(&self, row: usize, column: usize) -> Option<&Bytes> {
        self.rows.get(row)?.get(column)?.as_ref()
    }
}

impl RawResult for MockResult {
    fn status(&self) -> ExecStatus {
        self.status
    }

    fn error_message(&self) -> String {
        self.error_message.clone()
    }

    fn ntuples(&self) -> usize {
        self.rows.len()
    }

    fn nfields(&self) -> usize {
        self.columns.len()
    }

    fn field_name(&self, column: usize) -> Option<&str> {
        self.columns.get(column).map(|c| c.name.as_str())
    }

    fn field_type(&self, column: usize) -> Oid {
        self.columns.get(column).map_or(0, |c| c.type_id)
    }

    fn field_modifier(&self, column: usize) -> i32 {
        self.columns.get(column).map_or(-1, |c| c.modifier)
    }

    fn is_null(&self, row: usize, column: usize) -> bool {
        self.cell(row, column).is_none()
    }

    fn value(&self, row: usize, column: usize) -> Option<&[u8]> {
        self.cell(row, column).map(|b| &b[..])
    }

    fn nparams(&self) -> usize {
        self.param_types.len()
    }

    fn param_type(&self, index: usize) -> Oid {
        self.param_types.get(index).copied().unwrap_or(0)
    }

    fn cmd_status(&self) -> &str {
        &self.cmd_status
    }

    fn cmd_tuples(&self) -> Option<u64> {
        self.cmd_tuples
    }
}

impl Drop for MockResult {
    fn drop(&mut self) {
        self.stats.released.set(self.stats.released.get() + 1);
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_count() {
        assert_eq!(placeholder_count("SELECT 1"), 0);
        assert_eq!(placeholder_count("SELECT $1, $2"), 2);
        assert_eq!(placeholder_count("SELECT $2 WHERE x = $1 OR y = $2"), 2);
        assert_eq!(placeholder_count("SELECT $10"), 10);
    }

    #[test]
    fn test_rows_encode_cells() {
        let response = MockResponse::rows(
            vec![MockColumn::new("n", pq_protocol::types::oid::INT4)],
            vec![vec![SqlValue::Int(5)], vec![SqlValue::Null]],
        );
        match response {
            MockResponse::Rows { rows, .. } => {
                assert_eq!(rows[0][0].as_deref(), Some(&5i32.to_be_bytes()[..]));
                assert_eq!(rows[1][0], None);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_unencodable_cell_becomes_error() {
        let response = MockResponse::rows(
            vec![MockColumn::new("n", pq_protocol::types::oid::INT2)],
            vec![vec![SqlValue::Int(1 << 20)]],
        );
        assert!(matches!(response, MockResponse::Error { .. }));
    }

    #[test]
    fn test_results_count_releases() {
        let server = MockServer::builder().build();
        let result = server.result(MockResponse::Empty, None);
        assert_eq!(server.live_results(), 1);
        drop(result);
        assert_eq!(server.results_released(), 1);
        assert_eq!(server.live_results(), 0);
    }
}
