//! Error types for model invocation.

use std::time::Duration;

/// Errors from a language model call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("model authentication failed: {0}")]
    Authentication(String),
    #[error("model rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("model invocation failed: {0}")]
    ModelInvocation(String),
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
}

impl LlmError {
    /// Classify a non-success HTTP status from a model endpoint.
    pub fn from_status(status: u16, body: String, retry_after: Option<Duration>) -> Self {
        match status {
            401 | 403 => Self::Authentication(body),
            429 => Self::RateLimited { retry_after },
            _ => Self::ModelInvocation(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Only throttling is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Server-suggested wait before retrying, if any.
    pub fn suggested_delay(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication_failed",
            Self::RateLimited { .. } => "rate_limited",
            Self::ModelInvocation(_) => "model_invocation",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Parse a `Retry-After` header given in whole seconds.
pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            LlmError::from_status(401, "bad key".into(), None),
            LlmError::Authentication(_)
        ));
        assert!(matches!(
            LlmError::from_status(403, "denied".into(), None),
            LlmError::Authentication(_)
        ));
        let err = LlmError::from_status(429, String::new(), Some(Duration::from_secs(3)));
        assert!(matches!(err, LlmError::RateLimited { .. }));
        assert_eq!(err.suggested_delay(), Some(Duration::from_secs(3)));

        let err = LlmError::from_status(500, "boom".into(), None);
        assert_eq!(err.to_string(), "model invocation failed: HTTP 500: boom");
    }

    #[test]
    fn test_only_rate_limit_is_retryable() {
        assert!(LlmError::RateLimited { retry_after: None }.is_retryable());
        assert!(!LlmError::Authentication("x".into()).is_retryable());
        assert!(!LlmError::ModelInvocation("x".into()).is_retryable());
        assert!(!LlmError::Timeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn test_error_kind_strings() {
        assert_eq!(LlmError::ModelInvocation("x".into()).error_kind(), "model_invocation");
        assert_eq!(LlmError::Timeout(Duration::from_secs(1)).error_kind(), "timeout");
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }
}
