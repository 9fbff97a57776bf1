use std::io;

use thiserror::Error;

/// Failures surfaced by submission and retrieval.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bad input shape or name, or a 4xx answer to an upload.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Network failure or a server-side (5xx) error.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The service answered but broke its contract.
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// The requested artifact does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Local filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ServiceError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ServiceError::Transport(format!("timeout: {err}"));
        }
        if err.is_decode() {
            return ServiceError::Protocol(err.to_string());
        }
        ServiceError::Transport(err.to_string())
    }
}
