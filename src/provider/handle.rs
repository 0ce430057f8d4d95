//! Registered provider instances.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::debug;

use super::Provider;
use super::retry::{RetryConfig, with_retry};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::stats::{ProviderUsage, UsageStats};
use crate::telemetry;
use crate::types::{Message, ModelCapability, ModelInfo, RequestOptions};

/// A provider as stored in the registry: the adapter plus the bookkeeping
/// the router needs around it.
///
/// The handle owns the usage counters and the availability flag. Every
/// `query`/`chat` through it counts one invocation — retries included —
/// and accumulates wall-clock latency, whether or not the manager moves on
/// to another candidate afterwards. Removing the provider from the
/// registry does not invalidate handles callers already hold.
pub struct ProviderHandle {
    config: ProviderConfig,
    inner: Arc<dyn Provider>,
    retry: RetryConfig,
    usage: ProviderUsage,
    available: AtomicBool,
}

impl ProviderHandle {
    pub(crate) fn new(config: ProviderConfig, inner: Arc<dyn Provider>) -> Self {
        let retry = if config.max_retries > 1 {
            RetryConfig::new().max_attempts(config.max_retries)
        } else {
            RetryConfig::disabled()
        };
        Self {
            config,
            inner,
            retry,
            usage: ProviderUsage::default(),
            available: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configuration this provider was registered with.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &[ModelCapability] {
        self.inner.capabilities()
    }

    pub fn supports(&self, capability: ModelCapability) -> bool {
        self.inner.supports(capability)
    }

    pub fn default_model(&self) -> Option<&str> {
        self.inner.default_model()
    }

    /// Result of the most recent availability probe.
    pub fn last_known_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Usage counter snapshot.
    pub fn usage(&self) -> UsageStats {
        self.usage.snapshot()
    }

    pub(crate) fn reset_usage(&self) {
        self.usage.reset();
    }

    /// Single-prompt completion, with retry, counting, and metrics.
    pub async fn query(
        &self,
        prompt: &str,
        options: &RequestOptions,
    ) -> Result<String, ProviderError> {
        self.usage.record_attempt();
        let start = Instant::now();
        let result = with_retry(&self.retry, self.name(), "query", || {
            self.inner.query(prompt, options)
        })
        .await;
        let elapsed = start.elapsed();
        self.usage.record_outcome(result.is_ok(), elapsed);
        telemetry::record_request("query", self.name(), elapsed, result.is_ok());
        result
    }

    /// Chat completion, with retry, counting, and metrics.
    pub async fn chat(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<String, ProviderError> {
        self.usage.record_attempt();
        let start = Instant::now();
        let result = with_retry(&self.retry, self.name(), "chat", || {
            self.inner.chat(messages, options)
        })
        .await;
        let elapsed = start.elapsed();
        self.usage.record_outcome(result.is_ok(), elapsed);
        telemetry::record_request("chat", self.name(), elapsed, result.is_ok());
        result
    }

    /// Models this provider can serve.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        self.inner.list_models().await
    }

    /// Probe the backend, bounded by the configured timeout.
    ///
    /// Never fails: a hung or erroring transport counts as unavailable.
    /// The result becomes the provider's current availability flag.
    pub async fn check_availability(&self) -> bool {
        let ok = tokio::time::timeout(self.config.timeout, self.inner.check_availability())
            .await
            .unwrap_or(false);
        if !ok {
            debug!(provider = self.name(), "availability probe failed");
        }
        self.available.store(ok, Ordering::Release);
        ok
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("name", &self.name())
            .field("capabilities", &self.capabilities())
            .field("available", &self.last_known_available())
            .finish()
    }
}
