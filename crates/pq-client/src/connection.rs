//! Connections.
//!
//! A [`Connection`] owns one [`Transport`] session. Statements prepared on
//! it keep a weak reference back and are tracked by the connection, so
//! finishing the connection (explicitly or by dropping it) invalidates
//! every live statement before the session is closed. Finishing twice is a
//! no-op.

use std::cell::{Cell, RefCell, RefMut};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use pq_types::TypeRegistry;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::result::ResultSet;
use crate::statement::{Statement, StatementState};
use crate::transport::{ConnStatus, Notification, PollStatus, RawResult, Socket, Transport};

const FINISHED: &str = "connection is finished";

pub(crate) struct ConnectionInner<T: Transport> {
    transport: RefCell<T>,
    config: Config,
    finished: Cell<bool>,
    statements: RefCell<Vec<Weak<StatementState>>>,
    registry: RefCell<Option<Arc<TypeRegistry>>>,
}

impl<T: Transport> ConnectionInner<T> {
    pub(crate) fn is_finished(&self) -> bool {
        self.finished.get()
    }

    pub(crate) fn registry_override(&self) -> Option<Arc<TypeRegistry>> {
        self.registry.borrow().clone()
    }

    pub(crate) fn transport_mut(&self) -> RefMut<'_, T> {
        self.transport.borrow_mut()
    }

    pub(crate) fn transport_error(&self) -> Error {
        Error::Transport(self.transport.borrow().error_message())
    }

    /// Wrap a result buffer, turning a missing buffer into a transport
    /// error and an error status into a server error.
    pub(crate) fn wrap_result(&self, raw: Option<T::Result>) -> Result<ResultSet<T::Result>> {
        match raw {
            Some(raw) => ResultSet::new(raw, self.registry_override()).into_checked(),
            None => Err(self.transport_error()),
        }
    }

    fn track(&self, state: &Rc<StatementState>) {
        let mut statements = self.statements.borrow_mut();
        statements.retain(|w| w.strong_count() > 0);
        statements.push(Rc::downgrade(state));
    }

    fn finish(&self) {
        if self.finished.replace(true) {
            return;
        }

        let mut invalidated = 0usize;
        for state in self
            .statements
            .borrow_mut()
            .drain(..)
            .filter_map(|w| w.upgrade())
        {
            state.invalidate();
            invalidated += 1;
        }

        self.transport.borrow_mut().finish();
        tracing::debug!(
            host = %self.config.host,
            statements_invalidated = invalidated,
            "connection finished"
        );
    }
}

/// A connection to a PostgreSQL server.
///
/// Single-threaded: the connection and every handle derived from it stay on
/// the thread that created them.
pub struct Connection<T: Transport> {
    inner: Rc<ConnectionInner<T>>,
}

impl<T: Transport> Connection<T> {
    /// Connect and block until the session is ready.
    ///
    /// A session that ends in [`ConnStatus::Bad`] is closed and reported as
    /// [`Error::Transport`] with the transport's message.
    pub fn connect(config: Config) -> Result<Self> {
        tracing::debug!(host = %config.host, port = config.port, "connecting");
        let mut transport = T::connect(&config)?;
        if transport.status() != ConnStatus::Ok {
            let message = transport.error_message();
            transport.finish();
            tracing::debug!(host = %config.host, error = %message, "connection failed");
            return Err(Error::Transport(message));
        }
        tracing::debug!(host = %config.host, "connected");
        Ok(Self::from_transport(transport, config))
    }

    /// Parse a connection string and connect.
    pub fn connect_str(conn_str: &str) -> Result<Self> {
        Self::connect(Config::from_connection_string(conn_str)?)
    }

    /// Begin a non-blocking connect. Drive it with [`poll`](Self::poll)
    /// until it reports [`PollStatus::Ok`] or [`PollStatus::Failed`].
    pub fn start(config: Config) -> Result<Self> {
        tracing::debug!(host = %config.host, port = config.port, "starting connection");
        let transport = T::start(&config)?;
        Ok(Self::from_transport(transport, config))
    }

    /// Wrap an already established session.
    pub fn from_transport(transport: T, config: Config) -> Self {
        Self {
            inner: Rc::new(ConnectionInner {
                transport: RefCell::new(transport),
                config,
                finished: Cell::new(false),
                statements: RefCell::new(Vec::new()),
                registry: RefCell::new(None),
            }),
        }
    }

    fn inner(&self) -> Result<&ConnectionInner<T>> {
        if self.inner.is_finished() {
            Err(Error::InvalidHandle(FINISHED))
        } else {
            Ok(&self.inner)
        }
    }

    /// Decode and encode through `registry` instead of the process-wide
    /// registry.
    ///
    /// Affects results and statements created afterwards.
    pub fn set_type_registry(&self, registry: Arc<TypeRegistry>) -> Result<()> {
        *self.inner()?.registry.borrow_mut() = Some(registry);
        Ok(())
    }

    /// Advance a non-blocking connect.
    pub fn poll(&self) -> Result<PollStatus> {
        let status = self.inner()?.transport_mut().poll_connect();
        tracing::trace!(?status, "polled connection");
        Ok(status)
    }

    /// Session state.
    pub fn status(&self) -> Result<ConnStatus> {
        Ok(self.inner()?.transport.borrow().status())
    }

    /// Close and reopen the session, blocking.
    pub fn reset(&self) -> Result<()> {
        let inner = self.inner()?;
        inner.transport_mut().reset();
        if inner.transport.borrow().status() == ConnStatus::Ok {
            tracing::debug!(host = %inner.config.host, "connection reset");
            Ok(())
        } else {
            Err(inner.transport_error())
        }
    }

    /// Begin a non-blocking reset. Drive it with
    /// [`reset_poll`](Self::reset_poll).
    pub fn reset_start(&self) -> Result<()> {
        let inner = self.inner()?;
        if inner.transport_mut().reset_start() {
            Ok(())
        } else {
            Err(inner.transport_error())
        }
    }

    /// Advance a non-blocking reset.
    pub fn reset_poll(&self) -> Result<PollStatus> {
        Ok(self.inner()?.transport_mut().reset_poll())
    }

    /// The session's socket, if one is open.
    pub fn socket(&self) -> Result<Option<Socket>> {
        Ok(self.inner()?.transport.borrow().socket())
    }

    /// Most recent error message from the transport, empty if none.
    pub fn error_message(&self) -> Result<String> {
        Ok(self.inner()?.transport.borrow().error_message())
    }

    /// Check if reading a result would block.
    pub fn is_busy(&self) -> Result<bool> {
        Ok(self.inner()?.transport.borrow().is_busy())
    }

    /// Read pending input from the server.
    pub fn consume_input(&self) -> Result<()> {
        let inner = self.inner()?;
        if inner.transport_mut().consume_input() {
            Ok(())
        } else {
            Err(inner.transport_error())
        }
    }

    /// Take the next pending notification.
    pub fn notifies(&self) -> Result<Option<Notification>> {
        Ok(self.inner()?.transport_mut().notifies())
    }

    /// Run a query with binary results and wait for it.
    pub fn execute(&self, sql: &str) -> Result<ResultSet<T::Result>> {
        let inner = self.inner()?;
        tracing::debug!(sql = sql, "executing query");
        let raw = inner.transport_mut().exec(sql, true);
        inner.wrap_result(raw)
    }

    /// Send a query without waiting for its results.
    pub fn send_query(&self, sql: &str) -> Result<()> {
        let inner = self.inner()?;
        tracing::debug!(sql = sql, "sending query");
        if inner.transport_mut().send_query(sql, true) {
            Ok(())
        } else {
            Err(inner.transport_error())
        }
    }

    /// Collect the next result of an asynchronous query.
    ///
    /// Returns `Ok(None)` when all results have been collected. An error
    /// result is returned as [`Error::Server`]; keep calling until `None`
    /// to drain the remaining results.
    pub fn get_result(&self) -> Result<Option<ResultSet<T::Result>>> {
        let inner = self.inner()?;
        let raw = inner.transport_mut().get_result();
        match raw {
            Some(raw) => inner.wrap_result(Some(raw)).map(Some),
            None => Ok(None),
        }
    }

    /// Prepare a named statement and describe its parameters.
    ///
    /// An empty name prepares the unnamed statement, which the server
    /// replaces on the next unnamed prepare.
    pub fn prepare(&self, sql: &str, name: &str) -> Result<Statement<T>> {
        let inner = self.inner()?;
        tracing::debug!(statement = name, sql = sql, "preparing statement");
        let raw = inner.transport_mut().prepare(name, sql);
        drop(inner.wrap_result(raw)?);
        self.describe(name)
    }

    /// Look up an existing prepared statement by name.
    pub fn describe(&self, name: &str) -> Result<Statement<T>> {
        let inner = self.inner()?;
        let raw = inner.transport_mut().describe_prepared(name);
        let raw = match raw {
            Some(raw) => raw,
            None => return Err(inner.transport_error()),
        };

        if raw.status().is_error() {
            return Err(Error::Server {
                status: raw.status(),
                message: raw.error_message(),
            });
        }
        let param_types = (0..raw.nparams()).map(|i| raw.param_type(i)).collect();
        drop(raw);

        let state = Rc::new(StatementState::new(name.to_string(), param_types));
        inner.track(&state);
        tracing::debug!(statement = name, "statement described");
        Ok(Statement::new(state, Rc::downgrade(&self.inner)))
    }

    /// Number of statements from this connection still alive.
    #[must_use]
    pub fn live_statements(&self) -> usize {
        self.inner
            .statements
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Close the session. Every statement becomes invalid. Repeated calls do
    /// nothing; dropping the connection calls this.
    pub fn finish(&self) {
        self.inner.finish();
    }

    /// Check if the connection has been finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// The configuration this connection was opened with.
    pub fn config(&self) -> Result<&Config> {
        Ok(&self.inner()?.config)
    }

    /// Database name.
    pub fn db(&self) -> Result<Option<&str>> {
        Ok(self.config()?.dbname.as_deref())
    }

    /// Login role.
    pub fn user(&self) -> Result<Option<&str>> {
        Ok(self.config()?.user.as_deref())
    }

    /// Password.
    pub fn password(&self) -> Result<Option<&str>> {
        Ok(self.config()?.password.as_deref())
    }

    /// Server host.
    pub fn host(&self) -> Result<&str> {
        Ok(&self.config()?.host)
    }

    /// Server port.
    pub fn port(&self) -> Result<u16> {
        Ok(self.config()?.port)
    }

    /// Startup options.
    pub fn options(&self) -> Result<Option<&str>> {
        Ok(self.config()?.options.as_deref())
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        self.inner.finish();
    }
}

impl<T: Transport> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("finished", &self.inner.is_finished())
            .finish()
    }
}
