//! Retry configuration and the shared transient-retry helper.
//!
//! Retries happen inside a registered provider's handle, below the
//! fallback walk: a logical call either succeeds or surfaces one final
//! error after its retry budget, and counts as a single invocation in the
//! usage stats either way.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::ProviderError;
use crate::telemetry;

/// Retry behaviour for transient transport errors.
///
/// Uses exponential backoff:
///
/// ```rust
/// # use modelmux::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 30s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// Exponential backoff: `initial_delay * 2^attempt`, capped at
    /// `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

/// Execute an async operation with retry on transient errors.
///
/// Retries up to `config.max_attempts` on errors classified transient by
/// [`ProviderError::is_transient`], with exponential backoff. Permanent
/// errors are returned immediately.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider: &str,
    operation: &'static str,
    f: F,
) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut last_err = None;
    for attempt in 0..max_attempts {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                if attempt + 1 < max_attempts {
                    telemetry::record_retry(operation, provider);
                    let delay = config.delay_for_attempt(attempt);
                    warn!(
                        provider,
                        operation,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e), // permanent error, no retry
        }
    }
    Err(last_err.unwrap_or_else(|| ProviderError::RequestFailed("no attempts made".into())))
}
