//! Prepared statements.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use pq_protocol::{Oid, ParamBuffer, ParamBufferBuilder};
use pq_types::{ToSql, TypeRegistry, encode_value_with, to_sql::UNSPECIFIED};

use crate::connection::ConnectionInner;
use crate::error::{Error, Result};
use crate::result::ResultSet;
use crate::transport::Transport;

const FINISHED: &str = "referenced connection is finished";

/// Shared between all handles to the same statement and the connection's
/// registry of live statements.
#[derive(Debug)]
pub(crate) struct StatementState {
    name: String,
    param_types: Vec<Oid>,
    valid: Cell<bool>,
}

impl StatementState {
    pub(crate) fn new(name: String, param_types: Vec<Oid>) -> Self {
        Self {
            name,
            param_types,
            valid: Cell::new(true),
        }
    }

    pub(crate) fn invalidate(&self) {
        self.valid.set(false);
    }
}

/// A server-side prepared statement.
///
/// Valid until its connection is finished. Parameters are encoded in
/// binary using the types the server reported when the statement was
/// described.
pub struct Statement<T: Transport> {
    state: Rc<StatementState>,
    conn: Weak<ConnectionInner<T>>,
}

impl<T: Transport> Statement<T> {
    pub(crate) fn new(state: Rc<StatementState>, conn: Weak<ConnectionInner<T>>) -> Self {
        Self { state, conn }
    }

    fn connection(&self) -> Result<Rc<ConnectionInner<T>>> {
        if !self.state.valid.get() {
            return Err(Error::InvalidHandle(FINISHED));
        }
        match self.conn.upgrade() {
            Some(conn) if !conn.is_finished() => Ok(conn),
            _ => Err(Error::InvalidHandle(FINISHED)),
        }
    }

    /// Server-side statement name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Check if the owning connection is still open.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.connection().is_ok()
    }

    /// Number of parameters.
    pub fn len(&self) -> Result<usize> {
        self.connection()?;
        Ok(self.state.param_types.len())
    }

    /// Check if the statement takes no parameters.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Parameter types, in order.
    pub fn param_types(&self) -> Result<&[Oid]> {
        self.connection()?;
        Ok(&self.state.param_types)
    }

    /// Encode parameters into a buffer ready for execution.
    ///
    /// The number of parameters must match exactly. NULL parameters are
    /// marked NULL without invoking any codec.
    pub fn bind(&self, params: &[&dyn ToSql]) -> Result<ParamBuffer> {
        let conn = self.connection()?;
        self.encode(&conn, params)
    }

    fn encode(&self, conn: &ConnectionInner<T>, params: &[&dyn ToSql]) -> Result<ParamBuffer> {
        let registry = conn.registry_override();
        let registry = registry.as_deref().unwrap_or_else(|| TypeRegistry::global());
        bind_params(registry, &self.state.param_types, params)
    }

    /// Execute with the given parameters and wait for the result.
    pub fn execute(&self, params: &[&dyn ToSql]) -> Result<ResultSet<T::Result>> {
        let conn = self.connection()?;
        let buffer = self.encode(&conn, params)?;
        tracing::debug!(statement = %self.state.name, params = buffer.len(), "executing prepared statement");
        let raw = conn.transport_mut().exec_prepared(&self.state.name, &buffer);
        conn.wrap_result(raw)
    }

    /// Send an execution without waiting for its result. Collect results
    /// with [`Connection::get_result`](crate::Connection::get_result).
    pub fn send(&self, params: &[&dyn ToSql]) -> Result<()> {
        let conn = self.connection()?;
        let buffer = self.encode(&conn, params)?;
        tracing::debug!(statement = %self.state.name, params = buffer.len(), "sending prepared statement");
        let sent = conn
            .transport_mut()
            .send_query_prepared(&self.state.name, &buffer);
        if sent {
            Ok(())
        } else {
            Err(conn.transport_error())
        }
    }
}

impl<T: Transport> Clone for Statement<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            conn: Weak::clone(&self.conn),
        }
    }
}

impl<T: Transport> std::fmt::Debug for Statement<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("name", &self.state.name)
            .field("param_types", &self.state.param_types)
            .field("valid", &self.state.valid.get())
            .finish()
    }
}

/// Encode `params` against the declared parameter types.
///
/// An unspecified declared type falls back to the value's own type id.
pub(crate) fn bind_params(
    registry: &TypeRegistry,
    types: &[Oid],
    params: &[&dyn ToSql],
) -> Result<ParamBuffer> {
    if types.len() != params.len() {
        return Err(Error::ParameterCount {
            expected: types.len(),
            actual: params.len(),
        });
    }

    let mut builder = ParamBufferBuilder::with_capacity(params.len());
    for (index, (&declared, param)) in types.iter().zip(params).enumerate() {
        let type_id = if declared == UNSPECIFIED {
            param.type_id()
        } else {
            declared
        };
        let value = param.to_sql()?;
        if value.is_null() {
            builder.push_null(type_id);
            continue;
        }
        builder.push_with(type_id, |buf| {
            encode_value_with(registry, type_id, &value, buf)
                .map(|written| {
                    tracing::trace!(param = index, type_id, bytes = written, "bound parameter");
                })
                .map_err(Error::from)
        })?;
    }
    Ok(builder.finish())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pq_protocol::types::oid;

    #[test]
    fn test_bind_count_must_match() {
        let registry = TypeRegistry::new();
        let err = bind_params(&registry, &[oid::INT4, oid::TEXT], &[&1i32]).unwrap_err();
        assert!(matches!(
            err,
            Error::ParameterCount {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_bind_null_and_values() {
        let registry = TypeRegistry::new();
        let none: Option<i32> = None;
        let buffer =
            bind_params(&registry, &[oid::INT4, oid::TEXT], &[&none, &"hello"]).unwrap();

        assert_eq!(buffer.len(), 2);
        assert!(buffer.is_null(0));
        assert_eq!(buffer.value(1), Some(&b"hello"[..]));
        assert_eq!(buffer.lengths(), vec![-1, 5]);
    }

    #[test]
    fn test_bind_uses_declared_type() {
        let registry = TypeRegistry::new();
        // An i32 bound to an int8 parameter widens.
        let buffer = bind_params(&registry, &[oid::INT8], &[&7i32]).unwrap();
        assert_eq!(buffer.value(0), Some(&7i64.to_be_bytes()[..]));
        assert_eq!(buffer.types(), &[oid::INT8]);
    }

    #[test]
    fn test_bind_unspecified_falls_back_to_value_type() {
        let registry = TypeRegistry::new();
        let buffer = bind_params(&registry, &[UNSPECIFIED], &[&true]).unwrap();
        assert_eq!(buffer.types(), &[oid::BOOL]);
        assert_eq!(buffer.value(0), Some(&[1u8][..]));
    }

    #[test]
    fn test_bind_failure_is_reported() {
        let registry = TypeRegistry::new();
        let err = bind_params(&registry, &[oid::INT2], &[&100_000i32]).unwrap_err();
        assert!(matches!(err, Error::Type(_)));
    }
}
