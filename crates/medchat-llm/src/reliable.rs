use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::client::{GenerationOptions, LanguageModelClient};
use crate::error::LlmError;

/// Retry and timeout settings for [`ReliableClient`].
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Extra attempts after the first, rate-limit errors only.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Bound on each individual attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff (`base * 2^attempt`, capped), unless the server
    /// suggested a delay.
    ///
    /// `None` when the suggested delay exceeds `max_delay`: the call is not
    /// worth retrying within the turn.
    fn delay(&self, attempt: u32, suggested: Option<Duration>) -> Option<Duration> {
        if let Some(delay) = suggested {
            return (delay <= self.max_delay).then_some(delay);
        }
        let factor = 2u32.saturating_pow(attempt);
        Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }
}

/// Wraps a client with per-call timeouts and rate-limit retries.
///
/// Authentication, invocation and timeout errors are returned immediately.
pub struct ReliableClient<C: LanguageModelClient> {
    inner: C,
    policy: RetryPolicy,
    total_retries: AtomicU64,
}

impl<C: LanguageModelClient> ReliableClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            total_retries: AtomicU64::new(0),
        }
    }

    pub fn with_defaults(inner: C) -> Self {
        Self::new(inner, RetryPolicy::default())
    }

    pub fn total_retries(&self) -> u64 {
        self.total_retries.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn attempt(&self, prompt: &str, options: &GenerationOptions) -> Result<String, LlmError> {
        tokio::time::timeout(self.policy.timeout, self.inner.generate(prompt, options))
            .await
            .map_err(|_| LlmError::Timeout(self.policy.timeout))?
    }
}

#[async_trait]
impl<C: LanguageModelClient> LanguageModelClient for ReliableClient<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let mut attempt = 0;
        loop {
            match self.attempt(prompt, options).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    let Some(delay) = self.policy.delay(attempt, e.suggested_delay()) else {
                        warn!(
                            model = self.inner.name(),
                            max_delay_ms = self.policy.max_delay.as_millis() as u64,
                            error = %e,
                            "Suggested retry delay too long, giving up"
                        );
                        return Err(e);
                    };
                    self.total_retries.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        model = self.inner.name(),
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying model call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
