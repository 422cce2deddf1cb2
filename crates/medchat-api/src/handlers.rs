//! Route handler functions for all API endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use medchat_chat::{SessionSnapshot, SessionSummary};
use medchat_core::types::{AnswerResult, BackendSelection};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CannedQuestion {
    pub index: usize,
    pub name: String,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub questions: Vec<CannedQuestion>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub id: Uuid,
    pub backend: BackendSelection,
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.chat.backend().to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.chat.active_sessions(),
    })
}

/// GET /questions - canned questions from the document corpus.
pub async fn questions(State(state): State<AppState>) -> Json<QuestionsResponse> {
    let questions = state
        .chat
        .canned_questions()
        .iter()
        .enumerate()
        .map(|(index, doc)| CannedQuestion {
            index,
            name: doc.name.clone(),
            text: doc.text.clone(),
        })
        .collect();
    Json(QuestionsResponse { questions })
}

/// POST /sessions
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session = state.chat.create_session();
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            id: session.id,
            backend: session.backend,
        }),
    )
}

/// GET /sessions
pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        sessions: state.chat.list_sessions(),
    })
}

/// GET /sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.chat.get_session(id).await?))
}

/// DELETE /sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.chat.delete_session(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /sessions/{id}/ask
pub async fn ask(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AskRequest>,
) -> Result<Json<AnswerResult>, ApiError> {
    Ok(Json(state.chat.ask(id, &body.question).await?))
}

/// POST /sessions/{id}/questions/{index}
pub async fn ask_canned(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<AnswerResult>, ApiError> {
    Ok(Json(state.chat.ask_canned(id, index).await?))
}

/// POST /sessions/{id}/clear
pub async fn clear_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.chat.clear_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
