//! Error types for the conversation engine.

use std::time::Duration;

use medchat_llm::LlmError;
use medchat_retrieval::RetrievalError;
use uuid::Uuid;

/// Errors from one conversation turn or session operation.
///
/// A turn that fails with any of these leaves the session history as it was.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),
    #[error("a turn is already in progress for session {0}")]
    TurnInProgress(Uuid),
    #[error("no canned question at index {0}")]
    InvalidQuestionIndex(usize),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("rate limited by upstream service")]
    RateLimited { retry_after: Option<Duration> },
    #[error("retrieval error: {0}")]
    Retrieval(String),
    #[error("model invocation error: {0}")]
    ModelInvocation(String),
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },
}

impl ChatError {
    /// Short classification string for logs and API bodies.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "empty_message",
            Self::MessageTooLong(_) => "message_too_long",
            Self::SessionNotFound(_) => "session_not_found",
            Self::TurnInProgress(_) => "turn_in_progress",
            Self::InvalidQuestionIndex(_) => "invalid_question_index",
            Self::Authentication(_) => "authentication_failed",
            Self::RateLimited { .. } => "rate_limited",
            Self::Retrieval(_) => "retrieval_error",
            Self::ModelInvocation(_) => "model_invocation_error",
            Self::Timeout { .. } => "timeout",
        }
    }
}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Authentication(msg) => ChatError::Authentication(msg),
            LlmError::RateLimited { retry_after } => ChatError::RateLimited { retry_after },
            LlmError::Timeout(after) => ChatError::Timeout {
                stage: "model call",
                after,
            },
            other => ChatError::ModelInvocation(other.to_string()),
        }
    }
}

impl From<RetrievalError> for ChatError {
    fn from(err: RetrievalError) -> Self {
        match err {
            RetrievalError::Authentication(msg) => ChatError::Authentication(msg),
            RetrievalError::RateLimited { retry_after } => ChatError::RateLimited { retry_after },
            RetrievalError::Timeout(after) => ChatError::Timeout {
                stage: "retrieval",
                after,
            },
            other => ChatError::Retrieval(other.to_string()),
        }
    }
}
