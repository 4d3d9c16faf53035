use std::time::Duration;
use tracing::warn;

use regdoc_core::config::EmbeddingSettings;
use regdoc_core::traits::Embedder;

const BACKOFF_FACTOR: f64 = 1.5;
const MAX_DELAY: Duration = Duration::from_secs(5);

/// Exponential backoff: `base * 1.5^attempt`, capped at five seconds.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    pub fn from_settings(s: &EmbeddingSettings) -> Self {
        Self::new(s.max_retries, Duration::from_millis(s.retry_base_delay_ms))
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = self.base_delay.as_millis() as f64 * BACKOFF_FACTOR.powi(attempt as i32);
        Duration::from_millis(ms as u64).min(MAX_DELAY)
    }
}

/// Retries a failing `embed_batch` call. Embedding is read-only, so repeating it is safe.
/// Sleeps block the calling thread; callers run embedding on blocking workers.
pub struct RetryingEmbedder<E> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: Embedder> RetryingEmbedder<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: Embedder> Embedder for RetryingEmbedder<E> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut attempt = 0;
        loop {
            match self.inner.embed_batch(texts) {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.policy.max_retries => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(attempt = attempt + 1, ?delay, error = %e, "embedding failed, retrying");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e.context(format!("embedding failed after {} attempt(s)", attempt + 1)));
                }
            }
        }
    }
}
