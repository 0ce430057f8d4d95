//! Integration tests for per-provider retry behaviour.
//!
//! Retries live inside the registered handle, below the fallback walk:
//! a logical call is one usage-stat invocation however many transport
//! attempts it takes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use modelmux::{
    ModelCapability, ModelInfo, Provider, ProviderConfig, ProviderError, ProviderRegistry,
    RequestOptions,
};

/// Fails transiently until `succeed_after` calls have been made.
struct FlakyProvider {
    calls: Arc<AtomicU32>,
    succeed_after: u32,
    error: fn() -> ProviderError,
}

#[async_trait]
impl Provider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    fn capabilities(&self) -> &[ModelCapability] {
        &[ModelCapability::TextGeneration]
    }

    async fn query(
        &self,
        _prompt: &str,
        _options: &RequestOptions,
    ) -> Result<String, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n + 1 < self.succeed_after {
            return Err((self.error)());
        }
        Ok("recovered".into())
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        Ok(Vec::new())
    }

    async fn check_availability(&self) -> bool {
        true
    }
}

fn register_flaky(
    registry: &ProviderRegistry,
    max_retries: u32,
    succeed_after: u32,
    error: fn() -> ProviderError,
) -> Arc<AtomicU32> {
    let calls = Arc::new(AtomicU32::new(0));
    let provider = FlakyProvider {
        calls: Arc::clone(&calls),
        succeed_after,
        error,
    };
    let config = ProviderConfig::new("flaky")
        .capability(ModelCapability::TextGeneration)
        .max_retries(max_retries);
    registry.register(config, Arc::new(provider)).unwrap();
    calls
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_to_success() {
    let registry = ProviderRegistry::new();
    let calls = register_flaky(&registry, 3, 3, || {
        ProviderError::RequestFailed("flaky".into())
    });

    let handle = registry.get("flaky").unwrap();
    let answer = handle.query("hi", &RequestOptions::new()).await.unwrap();
    assert_eq!(answer, "recovered");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // One logical invocation, not three.
    let stats = handle.usage();
    assert_eq!(stats.request_count, 1);
    assert_eq!(stats.success_count, 1);
    assert_eq!(stats.failure_count, 0);
}

#[tokio::test(start_paused = true)]
async fn budget_exhaustion_surfaces_last_error() {
    let registry = ProviderRegistry::new();
    let calls = register_flaky(&registry, 2, 10, || {
        ProviderError::Timeout(std::time::Duration::from_secs(1))
    });

    let handle = registry.get("flaky").unwrap();
    let err = handle
        .query("hi", &RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Timeout(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let stats = handle.usage();
    assert_eq!(stats.request_count, 1);
    assert_eq!(stats.failure_count, 1);
}

#[tokio::test(start_paused = true)]
async fn permanent_errors_skip_the_retry_budget() {
    let registry = ProviderRegistry::new();
    let calls = register_flaky(&registry, 5, 10, || {
        ProviderError::InvalidResponse("garbage".into())
    });

    let handle = registry.get("flaky").unwrap();
    let err = handle
        .query("hi", &RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn max_retries_one_means_single_attempt() {
    let registry = ProviderRegistry::new();
    let calls = register_flaky(&registry, 1, 10, || {
        ProviderError::RequestFailed("flaky".into())
    });

    let handle = registry.get("flaky").unwrap();
    handle
        .query("hi", &RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
