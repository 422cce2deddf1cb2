//! Error types for document retrieval.

use std::time::Duration;

/// Errors from a retriever call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RetrievalError {
    #[error("retrieval authentication failed: {0}")]
    Authentication(String),
    #[error("retrieval rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("retrieval service error {status}: {body}")]
    Service { status: u16, body: String },
    #[error("retrieval network error: {0}")]
    Network(String),
    #[error("invalid retrieval response: {0}")]
    InvalidResponse(String),
    #[error("retrieval timed out after {0:?}")]
    Timeout(Duration),
}

impl RetrievalError {
    /// Classify a non-success HTTP status from the retrieval service.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Authentication(body),
            429 => Self::RateLimited { retry_after: None },
            _ => Self::Service { status, body },
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication_failed",
            Self::RateLimited { .. } => "rate_limited",
            Self::Service { .. } => "service_error",
            Self::Network(_) => "network_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Timeout(_) => "timeout",
        }
    }
}
