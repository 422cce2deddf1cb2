//! Data types shared across the retrieval, model and chat crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MedchatError;

/// One question/answer exchange. Immutable once recorded in a history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A document returned by a retriever for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Text passage handed to the model as context.
    pub content: String,
    /// Identifier of the originating document (URI, id or file name).
    pub source_id: String,
}

impl RetrievedDocument {
    pub fn new(content: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source_id: source_id.into(),
        }
    }
}

/// Output of one completed conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer_text: String,
    /// Supporting documents, deduplicated by `source_id` in first-seen order.
    pub source_documents: Vec<RetrievedDocument>,
}

impl AnswerResult {
    /// Source ids in display order.
    pub fn source_ids(&self) -> Vec<&str> {
        self.source_documents
            .iter()
            .map(|d| d.source_id.as_str())
            .collect()
    }
}

/// The retriever / model / prompt-template triple active for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendSelection {
    Llama2,
    BedrockTitan,
    BedrockClaude,
    BedrockClaudev2,
}

impl BackendSelection {
    /// Every supported backend, in the order shown in usage messages.
    pub const ALL: [BackendSelection; 4] = [
        BackendSelection::Llama2,
        BackendSelection::BedrockTitan,
        BackendSelection::BedrockClaude,
        BackendSelection::BedrockClaudev2,
    ];

    /// The token used on the command line and in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendSelection::Llama2 => "llama2",
            BackendSelection::BedrockTitan => "bedrock_titan",
            BackendSelection::BedrockClaude => "bedrock_claude",
            BackendSelection::BedrockClaudev2 => "bedrock_claudev2",
        }
    }

    /// Short provider label used in logs and the health endpoint.
    pub fn provider_label(&self) -> &'static str {
        match self {
            BackendSelection::Llama2 => "llama2",
            BackendSelection::BedrockTitan => "titan",
            BackendSelection::BedrockClaude => "claude",
            BackendSelection::BedrockClaudev2 => "claude2",
        }
    }

    /// `a|b|c` list of accepted tokens.
    pub fn usage() -> String {
        Self::ALL
            .iter()
            .map(|b| b.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl fmt::Display for BackendSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendSelection {
    type Err = MedchatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == s.trim())
            .ok_or_else(|| {
                MedchatError::Config(format!(
                    "Unsupported backend '{}'. Expected one of: {}",
                    s,
                    Self::usage()
                ))
            })
    }
}
