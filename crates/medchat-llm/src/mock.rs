//! Scripted model client for deterministic tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{GenerationOptions, LanguageModelClient};
use crate::error::LlmError;

/// One pre-programmed reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Error(LlmError),
    /// Wait, then resolve the inner reply.
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Returns scripted replies in call order and records every prompt.
///
/// Once the script runs out, the fallback reply (if any) is repeated;
/// without one, extra calls fail with `ModelInvocation`.
pub struct MockClient {
    replies: Vec<MockReply>,
    fallback: Option<MockReply>,
    call_count: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            fallback: None,
            call_count: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A client that answers every call with `text`.
    pub fn always(text: &str) -> Self {
        Self::new(Vec::new()).with_fallback(MockReply::text(text))
    }

    pub fn with_fallback(mut self, reply: MockReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModelClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let reply = match self.replies.get(idx).or(self.fallback.as_ref()) {
            Some(reply) => reply.clone(),
            None => {
                return Err(LlmError::ModelInvocation(format!(
                    "MockClient: no reply configured for call {}",
                    idx
                )))
            }
        };

        let mut current = reply;
        loop {
            match current {
                MockReply::Text(text) => return Ok(text),
                MockReply::Error(e) => return Err(e),
                MockReply::Delay(duration, inner) => {
                    tokio::time::sleep(duration).await;
                    current = *inner;
                }
            }
        }
    }
}
