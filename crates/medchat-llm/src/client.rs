use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Sampling knobs passed with every prompt. Providers may ignore either.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationOptions {
    pub fn new(temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// A hosted text-generation model: prompt in, completion text out.
#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, options: &GenerationOptions)
        -> Result<String, LlmError>;
}

#[async_trait]
impl<T: LanguageModelClient + ?Sized> LanguageModelClient for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions)
        -> Result<String, LlmError> {
        (**self).generate(prompt, options).await
    }
}

/// Upper bound on generated tokens when the caller sets none.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

/// POST `body` as JSON and return the parsed JSON reply.
///
/// Non-success statuses are classified with [`LlmError::from_status`].
pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&secrecy::SecretString>,
    body: &serde_json::Value,
) -> Result<serde_json::Value, LlmError> {
    use secrecy::ExposeSecret;

    let mut req = client
        .post(url)
        .header("accept", "application/json")
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        req = req.bearer_auth(key.expose_secret());
    }

    let resp = req
        .json(body)
        .send()
        .await
        .map_err(|e| LlmError::ModelInvocation(format!("network error: {}", e)))?;

    let status = resp.status();
    if !status.is_success() {
        let retry_after = crate::error::retry_after(resp.headers());
        let body = resp.text().await.unwrap_or_default();
        return Err(LlmError::from_status(status.as_u16(), body, retry_after));
    }

    resp.json()
        .await
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))
}

pub(crate) fn http_client() -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(|e| LlmError::ModelInvocation(format!("failed to build HTTP client: {}", e)))
}
