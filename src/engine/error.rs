use crate::api::{ApiError, DraftError};
use crate::model::Feed;
use std::fmt;
use thiserror::Error;

/// Coarse failure category shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected, timed out, 5xx or undecodable.
    Network,
    /// Invalid input, locally or per the backend (400/422).
    Validation,
    /// 401/403.
    Unauthorized,
    /// 404.
    NotFound,
    /// 409, or a mutation against an entity the server has not confirmed yet.
    Conflict,
}

impl ErrorKind {
    /// Category for a backend status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => ErrorKind::Validation,
            401 | 403 => ErrorKind::Unauthorized,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            _ => ErrorKind::Network,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Network => "network",
            ErrorKind::Validation => "validation",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
        };
        f.write_str(label)
    }
}

/// The engine's shared error slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

/// Failure of an engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Invalid(#[from] DraftError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{feed} entry {id} has not been confirmed by the server yet")]
    Unconfirmed { feed: Feed, id: String },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Invalid(_) => ErrorKind::Validation,
            EngineError::Unconfirmed { .. } => ErrorKind::Conflict,
            EngineError::Api(ApiError::Status { status, .. }) => ErrorKind::from_status(*status),
            EngineError::Api(ApiError::Request(_)) => ErrorKind::Validation,
            EngineError::Api(_) => ErrorKind::Network,
        }
    }

    /// User-facing text. Prefers the backend's own message when it sent one.
    pub fn message(&self) -> String {
        match self {
            EngineError::Api(ApiError::Status {
                message: Some(message),
                ..
            }) => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn to_feed_error(&self) -> FeedError {
        FeedError {
            kind: self.kind(),
            message: self.message(),
        }
    }
}
