//! Error types for peer dispatch.
//!
//! Every variant describes a recoverable, local-only failure: the dispatcher
//! records it against the destination, logs a warning and moves on to the
//! next peer. None of these errors ever reaches the host pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for peer calls.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Network-level connectivity failure.
    #[error("network connection failed: {message}")]
    NetworkError {
        /// Error message describing the network failure
        message: String,
    },

    /// The peer did not answer within the dispatch timeout.
    #[error("request timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout that was exceeded in milliseconds
        timeout_ms: u64,
    },

    /// HTTP response indicated client error (4xx).
    #[error("client error: HTTP {status_code}: {message}")]
    ClientError {
        /// HTTP status code (4xx)
        status_code: u16,
        /// Peer message or truncated response body
        message: String,
    },

    /// HTTP response indicated server error (5xx).
    #[error("server error: HTTP {status_code}: {message}")]
    ServerError {
        /// HTTP status code (5xx)
        status_code: u16,
        /// Peer message or truncated response body
        message: String,
    },

    /// The peer answered with `"status": "error"`.
    #[error("rejected by peer: {message}")]
    Rejected {
        /// Message returned by the peer
        message: String,
    },

    /// The peer answer could not be interpreted.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Description of the problem
        message: String,
    },

    /// The destination cannot be addressed as configured.
    #[error("invalid destination configuration: {message}")]
    ConfigurationError {
        /// Configuration error message
        message: String,
    },
}

impl DispatchError {
    /// Creates a network error from a message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError { message: message.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    /// Creates a client error from an HTTP response.
    pub fn client_error(status_code: u16, message: impl Into<String>) -> Self {
        Self::ClientError { status_code, message: message.into() }
    }

    /// Creates a server error from an HTTP response.
    pub fn server_error(status_code: u16, message: impl Into<String>) -> Self {
        Self::ServerError { status_code, message: message.into() }
    }

    /// Creates a rejection error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected { message: message.into() }
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError { message: message.into() }
    }

    /// HTTP status returned by the peer, if it answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ClientError { status_code, .. } | Self::ServerError { status_code, .. } => {
                Some(*status_code)
            },
            _ => None,
        }
    }
}

/// Category of dispatch error for log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connectivity issues and timeouts.
    Network,
    /// HTTP client errors (4xx).
    Client,
    /// HTTP server errors (5xx).
    Server,
    /// Peer refused the operation.
    Rejected,
    /// Malformed peer response.
    Protocol,
    /// Destination misconfiguration.
    Configuration,
}

impl From<&DispatchError> for ErrorCategory {
    fn from(error: &DispatchError) -> Self {
        match error {
            DispatchError::NetworkError { .. } | DispatchError::Timeout { .. } => Self::Network,
            DispatchError::ClientError { .. } => Self::Client,
            DispatchError::ServerError { .. } => Self::Server,
            DispatchError::Rejected { .. } => Self::Rejected,
            DispatchError::InvalidResponse { .. } => Self::Protocol,
            DispatchError::ConfigurationError { .. } => Self::Configuration,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
            Self::Rejected => write!(f, "rejected"),
            Self::Protocol => write!(f, "protocol"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
