use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::engine::EngineError;
use crate::storage::StorageError;

/// Request-level failures. Every variant maps to exactly one status code.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Server configuration error: {0}")]
    ConfigurationMissing(String),

    #[error("{0}")]
    MalformedRequest(String),

    #[error("Invalid size parameter: {0}")]
    UnsupportedSize(String),

    #[error("Image not found")]
    NotFound,

    #[error("Image too large: {size} bytes exceeds {max} bytes")]
    PayloadTooLarge { size: u64, max: u64 },

    #[error("Image processing timed out after {}ms", .0.as_millis())]
    ProcessingTimeout(Duration),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::ConfigurationMissing(_) | ProxyError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::MalformedRequest(_) | ProxyError::UnsupportedSize(_) => {
                StatusCode::BAD_REQUEST
            }
            ProxyError::NotFound => StatusCode::NOT_FOUND,
            ProxyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::ProcessingTimeout(_) => StatusCode::REQUEST_TIMEOUT,
        }
    }

    /// Only timeouts are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProxyError::ProcessingTimeout(_))
    }
}

impl From<StorageError> for ProxyError {
    fn from(err: StorageError) -> Self {
        match err {
            // A key that cannot name an object is treated as absent
            StorageError::InvalidKey(_) => ProxyError::NotFound,
            other => ProxyError::InternalError(other.to_string()),
        }
    }
}

impl From<EngineError> for ProxyError {
    fn from(err: EngineError) -> Self {
        ProxyError::InternalError(err.to_string())
    }
}
