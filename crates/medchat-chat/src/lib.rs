//! Conversation engine for medchat.
//!
//! Rewrites follow-ups into standalone questions, retrieves supporting
//! documents, composes a grounded prompt, calls the model and folds the
//! exchange into a bounded history. Sessions wrap that cycle with
//! per-session locking and expiry.

pub mod backend;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod prompt;
pub mod rewriter;
pub mod session;

pub use backend::{BackendAdapter, ConfiguredBackend};
pub use error::ChatError;
pub use history::{HistoryBuffer, MAX_HISTORY_LENGTH};
pub use orchestrator::{dedup_by_source, ConversationOrchestrator};
pub use prompt::{PromptComposer, PromptTemplates, CONDENSE_TEMPLATE};
pub use rewriter::QuestionRewriter;
pub use session::{
    ChatService, Exchange, SessionContext, SessionSnapshot, SessionSummary, Utterance,
};
