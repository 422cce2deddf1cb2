//! Prompt templates and grounded prompt composition.

use medchat_core::types::{BackendSelection, RetrievedDocument};

/// Turns a follow-up plus chat history into a standalone question.
pub const CONDENSE_TEMPLATE: &str = "Given the following conversation and a follow up question, rephrase the follow up question
to be a standalone question.

Chat History:
{chat_history}
Follow Up Input: {question}
Standalone question:";

const PERSONA: &str = "You are an AI assistant helping patients understand medical terminologies.
You are talkative and provide specific details from the context but limit it to 2000 tokens.
If you do not know the answer to a question, you truthfully say you do not know. Also, please
bear in mind that you are not performing a diagnosis and not giving medical advice. You are simply
providing information based on the context provided.";

const QUESTION_BLOCK: &str = "Here are a few resources in <documents> tags:
<documents>
{context}
</documents>
Based on the above context, provide a detailed answer for, {question} Answer \"don't know\"
if not present in the resources provided. Start your answer with, \"Based on the information provided from some trusted sources..\".";

/// Question-answering and condense templates owned by one backend.
///
/// The QA template takes `{context}` and `{question}`; the condense
/// template takes `{chat_history}` and `{question}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    pub qa: String,
    pub condense: String,
}

impl PromptTemplates {
    pub fn new(qa: impl Into<String>, condense: impl Into<String>) -> Self {
        Self {
            qa: qa.into(),
            condense: condense.into(),
        }
    }

    pub fn for_backend(backend: BackendSelection) -> Self {
        match backend {
            BackendSelection::Llama2 => Self::new(llama_chat_qa(), CONDENSE_TEMPLATE),
            BackendSelection::BedrockTitan
            | BackendSelection::BedrockClaude
            | BackendSelection::BedrockClaudev2 => Self::new(human_assistant_qa(), CONDENSE_TEMPLATE),
        }
    }
}

/// Human/Assistant dialogue form used by the Bedrock text models.
fn human_assistant_qa() -> String {
    format!(
        "\n\nHuman: {}\n\nAssistant: OK, got it, I'll be a talkative truthful AI assistant.\n\nHuman: {}\n\nAssistant:",
        PERSONA, QUESTION_BLOCK
    )
}

/// `[INST]` / `<<SYS>>` form expected by Llama 2 chat models.
fn llama_chat_qa() -> String {
    format!(
        "<s>[INST] <<SYS>>\n{}\n<</SYS>>\n\n{} [/INST]",
        PERSONA, QUESTION_BLOCK
    )
}

/// Substitute `{name}` placeholders in one pass.
///
/// Values are never rescanned, so braces inside documents or questions
/// survive verbatim. Unknown placeholders are left in place.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Builds the grounded prompt for one turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptComposer;

impl PromptComposer {
    /// Place document contents (blank-line separated, retrieval order) and
    /// the question into the backend's QA template.
    pub fn compose(
        &self,
        templates: &PromptTemplates,
        question: &str,
        documents: &[RetrievedDocument],
    ) -> String {
        let context = documents
            .iter()
            .map(|d| d.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        fill_template(&templates.qa, &[("context", context.as_str()), ("question", question)])
    }
}
