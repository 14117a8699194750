use thiserror::Error;

/// Errors produced by the HTTP transport.
///
/// These cover the full lifecycle of one request: building it, sending it,
/// the status the backend answered with, and decoding the body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Non-2xx response. `message` is the backend's `{ "message": ... }` if any.
    #[error("HTTP error: status {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Status { status: u16, message: Option<String> },
    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),
    /// The request could not be assembled (bad endpoint, bad multipart part)
    #[error("Invalid request: {0}")]
    Request(String),
}

impl ApiError {
    /// Returns true if this error is transient and an idempotent request may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout | ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Decode(_) | ApiError::Request(_) => false,
        }
    }

    /// HTTP status, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
