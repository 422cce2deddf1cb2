//! Client for a hosted Llama 2 chat inference endpoint.

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::client::{
    http_client, post_json, GenerationOptions, LanguageModelClient, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};
use crate::error::LlmError;

/// Posts `{"inputs", "parameters"}` to `{endpoint}/invocations`.
pub struct LlamaEndpointClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl LlamaEndpointClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<SecretString>) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client()?,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn invocations_url(&self) -> String {
        format!("{}/invocations", self.endpoint)
    }
}

fn generated_text(reply: &Value) -> Option<&str> {
    // Some containers return a bare object instead of a one-element list.
    let first = match reply {
        Value::Array(items) => items.first()?,
        other => other,
    };
    first.get("generated_text").and_then(Value::as_str)
}

#[async_trait]
impl LanguageModelClient for LlamaEndpointClient {
    fn name(&self) -> &str {
        "llama2"
    }

    #[instrument(skip(self, prompt, options))]
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let body = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                "temperature": options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            }
        });

        let reply = post_json(&self.client, &self.invocations_url(), self.api_key.as_ref(), &body).await?;
        let text = generated_text(&reply)
            .map(|t| t.trim().to_string())
            .ok_or_else(|| LlmError::InvalidResponse("reply has no generated_text".into()))?;

        debug!(chars = text.len(), "Llama completion received");
        Ok(text)
    }
}
