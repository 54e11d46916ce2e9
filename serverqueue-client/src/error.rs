//! Error types for the ServerQueue client library

use serverqueue::ServerQueueError;

/// Main error type for ServerQueue client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Could not reach the broker
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// The broker sent something this client did not expect
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout errors
    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Any other broker-side error surfaced through the codec
    #[error("Broker error: {0}")]
    Broker(ServerQueueError),
}

impl ClientError {
    /// Create a new connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Check if this error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Io(_))
    }

    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<ServerQueueError> for ClientError {
    fn from(err: ServerQueueError) -> Self {
        match err {
            ServerQueueError::ConnectionIo(e) => Self::Io(e),
            ServerQueueError::Protocol(message) => Self::Protocol { message },
            other => Self::Broker(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_codec_errors_are_classified() {
        let io_err = ServerQueueError::ConnectionIo(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert!(ClientError::from(io_err).is_connection_error());

        let protocol_err = ServerQueueError::protocol("bad frame");
        assert!(matches!(
            ClientError::from(protocol_err),
            ClientError::Protocol { message } if message == "bad frame"
        ));

        assert!(matches!(
            ClientError::from(ServerQueueError::Interrupted),
            ClientError::Broker(ServerQueueError::Interrupted)
        ));
    }

    #[test]
    fn test_timeout_display() {
        let err = ClientError::timeout(250);
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Operation timed out after 250ms");
    }
}
