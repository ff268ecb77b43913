use std::future::Future;
use std::time::Duration;

use super::{BackendError, LanguageModel};
use crate::config::RetryConfig;

/// Longest single wait between attempts
pub const MAX_DELAY: Duration = Duration::from_secs(60);

/// Bounded exponential backoff that only retries rate limits
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (3 means up to 4 calls)
    pub max_retries: u32,
    /// Delay before retry `n` is `base^n` seconds plus jitter
    pub base: f64,
    /// Upper bound (exclusive) of the uniform jitter in seconds
    pub max_jitter_secs: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Bases below 1 or non-finite values fall back to sane bounds
    pub fn from_config(config: &RetryConfig) -> Self {
        let base = if config.base.is_finite() {
            config.base.max(1.0)
        } else {
            RetryConfig::default().base
        };
        let max_jitter_secs = if config.max_jitter_secs.is_finite() {
            config.max_jitter_secs.max(0.0)
        } else {
            0.0
        };
        Self {
            max_retries: config.max_retries,
            base,
            max_jitter_secs,
        }
    }

    /// Wait before retry number `attempt` (0-based) given a jitter in `[0, 1)`,
    /// never longer than [`MAX_DELAY`]
    pub fn delay(&self, attempt: u32, jitter_fraction: f64) -> Duration {
        let jitter = jitter_fraction.clamp(0.0, 1.0) * self.max_jitter_secs;
        let secs = self.base.powi(attempt.min(i32::MAX as u32) as i32) + jitter;
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_DELAY)
            .min(MAX_DELAY)
    }

    /// Call the backend, sleeping with tokio between rate-limited attempts
    pub async fn generate(
        &self,
        backend: &dyn LanguageModel,
        prompt: &str,
        fast: bool,
    ) -> Result<String, BackendError> {
        self.run(fast, || backend.generate(prompt), tokio::time::sleep)
            .await
    }

    /// Retry loop with an injectable sleep
    pub async fn run<T, Op, Fut, Sleep, SleepFut>(
        &self,
        fast: bool,
        mut op: Op,
        mut sleep: Sleep,
    ) -> Result<T, BackendError>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
        Sleep: FnMut(Duration) -> SleepFut,
        SleepFut: Future<Output = ()>,
    {
        let retries = if fast { 0 } else { self.max_retries };
        let mut attempt = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_rate_limit() && attempt < retries => {
                    let wait = self.delay(attempt, rand::random::<f64>());
                    tracing::warn!(
                        attempt = attempt + 1,
                        wait_secs = wait.as_secs_f64(),
                        "backend quota exceeded, retrying"
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_rate_limit() && fast {
                        tracing::info!("quota exceeded in fast mode, skipping retry");
                    }
                    return Err(e);
                }
            }
        }
    }
}
