//! API error types and JSON error response formatting.
//!
//! Chat errors map to HTTP status codes with a `{error, message}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use medchat_chat::ChatError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g. "session_not_found").
    pub error: String,
    pub message: String,
}

/// API error carrying its status, code and message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let status = match &err {
            ChatError::EmptyMessage
            | ChatError::MessageTooLong(_)
            | ChatError::InvalidQuestionIndex(_) => StatusCode::BAD_REQUEST,
            ChatError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ChatError::TurnInProgress(_) => StatusCode::CONFLICT,
            ChatError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ChatError::Authentication(_)
            | ChatError::Retrieval(_)
            | ChatError::ModelInvocation(_) => StatusCode::BAD_GATEWAY,
            ChatError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        };
        if status.is_server_error() {
            tracing::warn!(error = %err, kind = err.error_kind(), "Upstream failure");
        }
        Self {
            status,
            code: err.error_kind(),
            message: err.to_string(),
        }
    }
}
