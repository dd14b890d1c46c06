//! Client error types.

use thiserror::Error;

use crate::transport::ExecStatus;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Operation on a finished connection, or on a statement, result set or
    /// row whose owner has been torn down.
    #[error("invalid handle: {0}")]
    InvalidHandle(&'static str),

    /// The transport failed to send, receive or connect. The message is the
    /// transport's own, unmodified.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with an error result.
    #[error("server error ({status}): {message}")]
    Server {
        /// Result status reported with the error.
        status: ExecStatus,
        /// Error message, as reported by the server.
        message: String,
    },

    /// Malformed wire payload.
    #[error("protocol error: {0}")]
    Protocol(#[from] pq_protocol::ProtocolError),

    /// Type conversion error.
    #[error("type error: {0}")]
    Type(#[from] pq_types::TypeError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// No column with the given name.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Column index past the last column.
    #[error("column index {index} out of range ({count} columns)")]
    ColumnOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of columns.
        count: usize,
    },

    /// Row index past the last row.
    #[error("row index {index} out of range ({count} rows)")]
    RowOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of rows.
        count: usize,
    },

    /// Wrong number of bind parameters.
    #[error("statement expects {expected} parameters, got {actual}")]
    ParameterCount {
        /// Parameters declared by the statement.
        expected: usize,
        /// Parameters supplied.
        actual: usize,
    },
}

impl Error {
    /// Check if this error comes from using a torn-down handle.
    #[must_use]
    pub fn is_invalid_handle(&self) -> bool {
        matches!(self, Self::InvalidHandle(_))
    }

    /// Check if this error is an error result from the server.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    /// Check if this error was raised by the transport.
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this error indicates a malformed payload.
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::Type(pq_types::TypeError::Protocol(_))
        )
    }

    /// Check if a registered codec met a value tagged for another codec.
    #[must_use]
    pub fn is_inconsistent_codec_value(&self) -> bool {
        matches!(self, Self::Type(e) if e.is_inconsistent_codec_value())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
