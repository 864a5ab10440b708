//! Client error types

use http::StatusCode;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Broad classification of a [`ClientError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid credentials/endpoint at construction time
    Configuration,
    /// The HTTP call failed or returned a non-2xx status
    Transport,
    /// The service answered, but not the way the protocol says it should
    Protocol,
    /// A local precondition was violated; nothing was sent
    InvalidState,
}

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the service
    #[error("FDS returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Response does not match the protocol contract
    #[error("Protocol error ({status}): {message}")]
    Protocol { status: StatusCode, message: String },

    /// Multipart operation on a session in the wrong state
    #[error("Cannot {operation} upload {upload_id:?} in state {state}")]
    InvalidState {
        upload_id: Option<String>,
        state: &'static str,
        operation: &'static str,
    },

    /// Invalid argument supplied by the caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Build an error from a non-2xx response
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        Self::Status {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// Build a protocol error for a response that could not be understood
    pub fn protocol(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Protocol {
            status,
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Http(_) | Self::Status { .. } | Self::Io(_) => ErrorKind::Transport,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::InvalidState { .. } | Self::InvalidArgument(_) => ErrorKind::InvalidState,
        }
    }

    /// HTTP status reported by the service, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } | Self::Protocol { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Check if this is an access denied error
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::FORBIDDEN) | Some(StatusCode::UNAUTHORIZED)
        )
    }

    /// Whether the request never reached the service and can be sent again as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_connect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_classification() {
        let error = ClientError::from_status(StatusCode::NOT_FOUND, b"no such object");

        assert_eq!(error.kind(), ErrorKind::Transport);
        assert!(error.is_not_found());
        assert!(!error.is_access_denied());
        assert!(!error.is_retryable());
        assert_eq!(error.to_string(), "FDS returned 404 Not Found: no such object");
    }

    #[test]
    fn test_invalid_state_message() {
        let error = ClientError::InvalidState {
            upload_id: Some("u-1".to_string()),
            state: "Completed",
            operation: "abort",
        };

        assert_eq!(error.kind(), ErrorKind::InvalidState);
        assert_eq!(
            error.to_string(),
            "Cannot abort upload Some(\"u-1\") in state Completed"
        );
    }

    #[test]
    fn test_config_and_protocol_kinds() {
        assert_eq!(
            ClientError::Config("empty secret".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ClientError::protocol(StatusCode::BAD_REQUEST, "missing part 2").kind(),
            ErrorKind::Protocol
        );
    }
}
