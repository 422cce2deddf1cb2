//! Bedrock runtime client for the Titan and Claude text models.

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use medchat_core::types::BackendSelection;

use crate::client::{
    http_client, post_json, GenerationOptions, LanguageModelClient, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};
use crate::error::LlmError;

const HUMAN_PREFIX: &str = "\n\nHuman:";
const ASSISTANT_SUFFIX: &str = "\n\nAssistant:";

/// Models reachable through the Bedrock invoke API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedrockModel {
    Titan,
    ClaudeV1,
    ClaudeV2,
}

impl BedrockModel {
    pub fn model_id(&self) -> &'static str {
        match self {
            BedrockModel::Titan => "amazon.titan-tg1-large",
            BedrockModel::ClaudeV1 => "anthropic.claude-v1",
            BedrockModel::ClaudeV2 => "anthropic.claude-v2",
        }
    }

    /// The Bedrock model behind a backend, if it is a Bedrock backend.
    pub fn for_backend(backend: BackendSelection) -> Option<Self> {
        match backend {
            BackendSelection::BedrockTitan => Some(BedrockModel::Titan),
            BackendSelection::BedrockClaude => Some(BedrockModel::ClaudeV1),
            BackendSelection::BedrockClaudev2 => Some(BedrockModel::ClaudeV2),
            BackendSelection::Llama2 => None,
        }
    }

    fn is_claude(&self) -> bool {
        matches!(self, BedrockModel::ClaudeV1 | BedrockModel::ClaudeV2)
    }

    fn request_body(&self, prompt: &str, options: &GenerationOptions) -> Value {
        let max_tokens = options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        let temperature = options.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        match self {
            BedrockModel::Titan => json!({
                "inputText": prompt,
                "textGenerationConfig": {
                    "maxTokenCount": max_tokens,
                    "temperature": temperature,
                }
            }),
            BedrockModel::ClaudeV1 | BedrockModel::ClaudeV2 => json!({
                "prompt": human_assistant(prompt),
                "max_tokens_to_sample": max_tokens,
                "temperature": temperature,
            }),
        }
    }

    fn completion(&self, reply: &Value) -> Result<String, LlmError> {
        let text = if self.is_claude() {
            reply.get("completion").and_then(Value::as_str)
        } else {
            reply
                .get("results")
                .and_then(|r| r.get(0))
                .and_then(|r| r.get("outputText"))
                .and_then(Value::as_str)
        };
        text.map(|t| t.trim().to_string()).ok_or_else(|| {
            LlmError::InvalidResponse(format!("{} reply has no completion text", self.model_id()))
        })
    }
}

/// Wrap `prompt` in the Human/Assistant turn markers Claude requires.
///
/// A prompt that already opens with a Human turn keeps its own markers and
/// only gains a trailing Assistant marker when it lacks one.
pub fn human_assistant(prompt: &str) -> String {
    let body = prompt.trim();
    let mut out = if body.starts_with("Human:") {
        format!("\n\n{}", body)
    } else {
        format!("{} {}", HUMAN_PREFIX, body)
    };
    if !out.ends_with("Assistant:") {
        out.push_str(ASSISTANT_SUFFIX);
    }
    out
}

/// Invokes one Bedrock model over HTTP.
pub struct BedrockClient {
    client: reqwest::Client,
    endpoint: String,
    model: BedrockModel,
    api_key: Option<SecretString>,
}

impl BedrockClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: BedrockModel,
        api_key: Option<SecretString>,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client()?,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }

    pub fn model(&self) -> BedrockModel {
        self.model
    }

    pub fn invoke_url(&self) -> String {
        format!("{}/model/{}/invoke", self.endpoint, self.model.model_id())
    }
}

#[async_trait]
impl LanguageModelClient for BedrockClient {
    fn name(&self) -> &str {
        self.model.model_id()
    }

    #[instrument(skip(self, prompt, options), fields(model = self.model.model_id()))]
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let body = self.model.request_body(prompt, options);
        let reply = post_json(&self.client, &self.invoke_url(), self.api_key.as_ref(), &body).await?;
        let text = self.model.completion(&reply)?;
        debug!(chars = text.len(), "Bedrock completion received");
        Ok(text)
    }
}
