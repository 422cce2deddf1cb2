//! Chat sessions: per-session history, exchange log, locking and expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use medchat_core::config::ChatConfig;
use medchat_core::types::{AnswerResult, BackendSelection, Turn};
use medchat_core::{Corpus, CorpusDocument};

use crate::backend::BackendAdapter;
use crate::error::ChatError;
use crate::history::HistoryBuffer;
use crate::orchestrator::ConversationOrchestrator;

const NEW_SEARCH_PREFIX: &str = "new search:";

/// A user utterance with the `new search:` command split off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utterance<'a> {
    /// History should be dropped before answering.
    pub fresh: bool,
    pub question: &'a str,
}

impl<'a> Utterance<'a> {
    /// Split a case-insensitive `new search:` prefix from `raw`.
    pub fn parse(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        let prefix_len = NEW_SEARCH_PREFIX.len();
        let is_new_search = trimmed
            .get(..prefix_len)
            .map(|head| head.eq_ignore_ascii_case(NEW_SEARCH_PREFIX))
            .unwrap_or(false);

        if is_new_search {
            Self {
                fresh: true,
                question: trimmed[prefix_len..].trim(),
            }
        } else {
            Self {
                fresh: false,
                question: trimmed,
            }
        }
    }
}

/// One answered question recorded in a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exchange {
    pub question: String,
    pub result: AnswerResult,
    pub asked_at: DateTime<Utc>,
}

/// Mutable state of one conversation.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub id: Uuid,
    pub backend: BackendSelection,
    pub history: HistoryBuffer,
    pub exchanges: Vec<Exchange>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(backend: BackendSelection, max_history: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            backend,
            history: HistoryBuffer::new(max_history),
            exchanges: Vec::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    fn is_expired(&self, timeout_minutes: u32, now: DateTime<Utc>) -> bool {
        now - self.last_active_at > ChronoDuration::minutes(i64::from(timeout_minutes))
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            backend: self.backend,
            created_at: self.created_at,
            last_active_at: self.last_active_at,
            history: self.history.as_sequence(),
            exchanges: self.exchanges.clone(),
        }
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            backend: self.backend,
            created_at: self.created_at,
            last_active_at: self.last_active_at,
            turn_count: self.history.len(),
            exchange_count: self.exchanges.len(),
        }
    }
}

/// Read-only copy of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub backend: BackendSelection,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub history: Vec<Turn>,
    pub exchanges: Vec<Exchange>,
}

/// Listing entry for a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub backend: BackendSelection,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub turn_count: usize,
    pub exchange_count: usize,
}

type SessionHandle = Arc<tokio::sync::Mutex<SessionContext>>;

/// Session store plus the conversation engine for one backend.
///
/// The map lock is held only to look up or insert handles. Each session has
/// its own async lock, held for the whole turn; a second concurrent turn
/// on the same session is rejected rather than queued.
pub struct ChatService {
    orchestrator: ConversationOrchestrator,
    backend: Arc<dyn BackendAdapter>,
    corpus: Arc<Corpus>,
    config: ChatConfig,
    sessions: Mutex<HashMap<Uuid, SessionHandle>>,
}

impl ChatService {
    pub fn new(backend: Arc<dyn BackendAdapter>, corpus: Arc<Corpus>, config: ChatConfig) -> Self {
        Self {
            orchestrator: ConversationOrchestrator::new(),
            backend,
            corpus,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> BackendSelection {
        self.backend.selection()
    }

    /// The canned questions, in corpus order.
    pub fn canned_questions(&self) -> &[CorpusDocument] {
        self.corpus.documents()
    }

    /// Start an empty session. Expired sessions are dropped first, so
    /// abandoned sessions do not accumulate.
    pub fn create_session(&self) -> SessionSnapshot {
        self.purge_expired();
        let session = SessionContext::new(self.backend.selection(), self.config.max_history);
        let snapshot = session.snapshot();
        self.sessions()
            .insert(session.id, Arc::new(tokio::sync::Mutex::new(session)));
        info!(session_id = %snapshot.id, backend = %snapshot.backend, "Session created");
        snapshot
    }

    pub async fn get_session(&self, id: Uuid) -> Result<SessionSnapshot, ChatError> {
        let handle = self.handle(id)?;
        let session = handle.lock().await;
        Ok(session.snapshot())
    }

    /// Summaries of live sessions, oldest first. Sessions mid-turn are
    /// skipped rather than waited on.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        self.purge_expired();
        let handles: Vec<SessionHandle> = self.sessions().values().cloned().collect();
        let mut summaries: Vec<SessionSummary> = handles
            .iter()
            .filter_map(|h| h.try_lock().ok().map(|s| s.summary()))
            .collect();
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    pub fn active_sessions(&self) -> usize {
        self.purge_expired();
        self.sessions().len()
    }

    /// Drop history and exchanges, keeping the session id.
    pub async fn clear_session(&self, id: Uuid) -> Result<(), ChatError> {
        let handle = self.handle(id)?;
        let mut session = handle.try_lock().map_err(|_| ChatError::TurnInProgress(id))?;
        session.history.clear();
        session.exchanges.clear();
        session.last_active_at = Utc::now();
        info!(session_id = %id, "Session cleared");
        Ok(())
    }

    pub fn delete_session(&self, id: Uuid) -> Result<(), ChatError> {
        if self.sessions().remove(&id).is_some() {
            info!(session_id = %id, "Session deleted");
            Ok(())
        } else {
            Err(ChatError::SessionNotFound(id))
        }
    }

    /// Answer one utterance in session `id`.
    ///
    /// A `new search:` prefix starts from an empty history. The session is
    /// only updated when the turn succeeds.
    #[instrument(skip(self, utterance), fields(session_id = %id))]
    pub async fn ask(&self, id: Uuid, utterance: &str) -> Result<AnswerResult, ChatError> {
        let utterance = Utterance::parse(utterance);
        self.validate(utterance.question)?;

        let handle = self.handle(id)?;
        let mut session = handle.try_lock().map_err(|_| ChatError::TurnInProgress(id))?;

        let mut history = if utterance.fresh {
            debug!("New search, starting from empty history");
            HistoryBuffer::new(self.config.max_history)
        } else {
            session.history.clone()
        };

        let result = self
            .orchestrator
            .answer(self.backend.as_ref(), utterance.question, &mut history)
            .await?;

        let now = Utc::now();
        session.history = history;
        session.exchanges.push(Exchange {
            question: utterance.question.to_string(),
            result: result.clone(),
            asked_at: now,
        });
        session.last_active_at = now;
        Ok(result)
    }

    /// Ask the canned question at `index` in session `id`.
    pub async fn ask_canned(&self, id: Uuid, index: usize) -> Result<AnswerResult, ChatError> {
        let question = self
            .corpus
            .get(index)
            .map(|d| d.text.clone())
            .ok_or(ChatError::InvalidQuestionIndex(index))?;
        self.ask(id, &question).await
    }

    fn validate(&self, question: &str) -> Result<(), ChatError> {
        if question.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if question.chars().count() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }
        Ok(())
    }

    /// Look up a live session; an expired one is removed and reported absent.
    fn handle(&self, id: Uuid) -> Result<SessionHandle, ChatError> {
        let mut sessions = self.sessions();
        let handle = sessions.get(&id).cloned().ok_or(ChatError::SessionNotFound(id))?;

        // A session mid-turn is live by definition.
        let expired = handle
            .try_lock()
            .map(|s| s.is_expired(self.config.session_timeout_minutes, Utc::now()))
            .unwrap_or(false);
        if expired {
            sessions.remove(&id);
            info!(session_id = %id, "Session expired");
            return Err(ChatError::SessionNotFound(id));
        }
        Ok(handle)
    }

    fn purge_expired(&self) {
        let now = Utc::now();
        let timeout = self.config.session_timeout_minutes;
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, h| {
            h.try_lock()
                .map(|s| !s.is_expired(timeout, now))
                .unwrap_or(true)
        });
        let purged = before - sessions.len();
        if purged > 0 {
            debug!(purged, remaining = sessions.len(), "Expired sessions purged");
        }
    }

    /// The session map. The map holds no invariant a panicking holder could
    /// break, so a poisoned lock is recovered rather than propagated.
    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, SessionHandle>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
