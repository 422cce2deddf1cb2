//! Follow-up question condensing.

use tracing::debug;

use medchat_core::types::Turn;

use crate::backend::BackendAdapter;
use crate::error::ChatError;
use crate::prompt::fill_template;

/// Serialize turns oldest first as `\nHuman: {q}\nAssistant: {a}` blocks.
pub fn format_chat_history<'a>(turns: impl IntoIterator<Item = &'a Turn>) -> String {
    turns
        .into_iter()
        .map(|t| format!("\nHuman: {}\nAssistant: {}", t.question, t.answer))
        .collect()
}

/// Turns a follow-up into a question that stands on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionRewriter;

impl QuestionRewriter {
    /// With no history the follow-up is returned as-is and the model is not
    /// called. Otherwise the backend's condense template is filled and sent
    /// to the model; an empty reply falls back to the follow-up.
    pub async fn rewrite(
        &self,
        backend: &dyn BackendAdapter,
        history: &[Turn],
        follow_up: &str,
    ) -> Result<String, ChatError> {
        if history.is_empty() {
            return Ok(follow_up.to_string());
        }

        let chat_history = format_chat_history(history);
        let prompt = fill_template(
            &backend.prompt_templates().condense,
            &[("chat_history", chat_history.as_str()), ("question", follow_up)],
        );

        let standalone = backend.generate(&prompt).await?;
        let standalone = standalone.trim();
        if standalone.is_empty() {
            debug!("Empty condense reply, using follow-up verbatim");
            return Ok(follow_up.to_string());
        }
        Ok(standalone.to_string())
    }
}
