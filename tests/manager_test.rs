//! Integration tests for comparison, batching, load balancing, and stats.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use modelmux::{
    ModelCapability, ModelInfo, ModelMuxError, Provider, ProviderConfig, ProviderError,
    ProviderManager, ProviderRegistry, RequestOptions, Route,
};

// ============================================================================
// Mock providers
// ============================================================================

/// Echoes its own name plus the prompt; fails on prompts containing "bad".
struct EchoProvider {
    name: &'static str,
}

#[async_trait]
impl Provider for EchoProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn capabilities(&self) -> &[ModelCapability] {
        &[ModelCapability::TextGeneration, ModelCapability::Chat]
    }

    async fn query(
        &self,
        prompt: &str,
        _options: &RequestOptions,
    ) -> Result<String, ProviderError> {
        if prompt.contains("bad") {
            return Err(ProviderError::RequestFailed("bad prompt".into()));
        }
        Ok(format!("{}:{}", self.name, prompt))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        Ok(Vec::new())
    }

    async fn check_availability(&self) -> bool {
        true
    }
}

/// Counts availability probes; optionally reports unavailable.
struct ProbeCounting {
    name: &'static str,
    available: bool,
    probes: Arc<AtomicUsize>,
}

#[async_trait]
impl Provider for ProbeCounting {
    fn name(&self) -> &str {
        self.name
    }

    fn capabilities(&self) -> &[ModelCapability] {
        &[ModelCapability::TextGeneration]
    }

    async fn query(
        &self,
        _prompt: &str,
        _options: &RequestOptions,
    ) -> Result<String, ProviderError> {
        Ok("probed answer".into())
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        Ok(Vec::new())
    }

    async fn check_availability(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.available
    }
}

fn echo_registry(names: &[&'static str]) -> Arc<ProviderRegistry> {
    let registry = Arc::new(ProviderRegistry::new());
    for name in names {
        let config = ProviderConfig::new(*name)
            .capabilities([ModelCapability::TextGeneration, ModelCapability::Chat])
            .max_retries(1);
        registry
            .register(config, Arc::new(EchoProvider { name }))
            .unwrap();
    }
    registry
}

// ============================================================================
// compare_responses
// ============================================================================

#[tokio::test]
async fn compare_queries_all_registered_providers() {
    let registry = echo_registry(&["a", "b", "c"]);
    let manager = ProviderManager::new(Arc::clone(&registry));

    let responses = manager
        .compare_responses("hello", None, &RequestOptions::new())
        .await;

    assert_eq!(responses.len(), 3);
    assert_eq!(responses["a"].as_deref().unwrap(), "a:hello");
    assert_eq!(responses["b"].as_deref().unwrap(), "b:hello");
    assert_eq!(responses["c"].as_deref().unwrap(), "c:hello");
}

/// One provider's failure becomes its own error marker and never aborts
/// the other attempts.
#[tokio::test]
async fn compare_records_failures_as_markers() {
    let registry = echo_registry(&["a", "b"]);
    let manager = ProviderManager::new(Arc::clone(&registry));

    let responses = manager
        .compare_responses("bad prompt", None, &RequestOptions::new())
        .await;

    assert_eq!(responses.len(), 2);
    for name in ["a", "b"] {
        assert!(matches!(
            responses[name],
            Err(ModelMuxError::ProviderFailed { ref provider, .. }) if provider == name
        ));
    }
}

#[tokio::test]
async fn compare_named_subset_includes_unknown_as_marker() {
    let registry = echo_registry(&["a", "b"]);
    let manager = ProviderManager::new(Arc::clone(&registry));

    let responses = manager
        .compare_responses("hello", Some(&["a", "ghost"]), &RequestOptions::new())
        .await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses["a"].as_deref().unwrap(), "a:hello");
    assert!(matches!(
        responses["ghost"],
        Err(ModelMuxError::ProviderNotFound(_))
    ));
    // Unrequested providers are not touched.
    assert!(!responses.contains_key("b"));
}

// ============================================================================
// batch_query
// ============================================================================

#[tokio::test]
async fn batch_preserves_prompt_order_with_named_provider() {
    let registry = echo_registry(&["a"]);
    let manager = ProviderManager::new(Arc::clone(&registry));

    let results = manager
        .batch_query(&["one", "bad two", "three"], Some("a"), &RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_deref().unwrap(), "a:one");
    assert!(matches!(
        results[1],
        Err(ModelMuxError::ProviderFailed { ref provider, .. }) if provider == "a"
    ));
    assert_eq!(results[2].as_deref().unwrap(), "a:three");
}

#[tokio::test]
async fn batch_with_unknown_provider_fails_up_front() {
    let registry = echo_registry(&["a"]);
    let manager = ProviderManager::new(Arc::clone(&registry));

    let err = manager
        .batch_query(&["one"], Some("ghost"), &RequestOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelMuxError::ProviderNotFound(name) if name == "ghost"));
}

/// Without a named provider each prompt runs through the fallback walk;
/// a prompt no provider can serve fills its slot with the aggregate
/// failure instead of aborting the batch.
#[tokio::test]
async fn batch_without_provider_uses_fallback_per_prompt() {
    let registry = echo_registry(&["a"]);
    let manager = ProviderManager::new(Arc::clone(&registry));

    let results = manager
        .batch_query(&["one", "bad two"], None, &RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_deref().unwrap(), "a:one");
    assert!(matches!(
        results[1],
        Err(ModelMuxError::AllProvidersFailed { ref attempts }) if attempts.len() == 1
    ));
}

// ============================================================================
// Load balancing
// ============================================================================

/// Across N calls with M available providers, round robin selects each
/// provider at least floor(N/M) times.
#[tokio::test]
async fn round_robin_spreads_calls_across_providers() {
    let registry = echo_registry(&["a", "b", "c"]);
    let manager = ProviderManager::builder(Arc::clone(&registry))
        .load_balancing(true)
        .build();

    for _ in 0..6 {
        manager
            .query_with_fallback("hello", &Route::new(), &RequestOptions::new())
            .await
            .unwrap();
    }

    let stats = manager.usage_stats();
    for name in ["a", "b", "c"] {
        assert_eq!(stats[name].request_count, 2, "uneven share for {name}");
    }
}

#[tokio::test]
async fn without_load_balancing_first_provider_takes_all() {
    let registry = echo_registry(&["a", "b"]);
    let manager = ProviderManager::new(Arc::clone(&registry));

    for _ in 0..4 {
        manager
            .query_with_fallback("hello", &Route::new(), &RequestOptions::new())
            .await
            .unwrap();
    }

    let stats = manager.usage_stats();
    assert_eq!(stats["a"].request_count, 4);
    assert_eq!(stats["b"].request_count, 0);
}

#[tokio::test]
async fn runtime_toggles_change_policy() {
    let registry = echo_registry(&["a", "b"]);
    let manager = ProviderManager::new(Arc::clone(&registry));
    assert!(manager.fallback_enabled());
    assert!(!manager.load_balancing());

    manager.set_load_balancing(true);
    for _ in 0..4 {
        manager
            .query_with_fallback("hello", &Route::new(), &RequestOptions::new())
            .await
            .unwrap();
    }
    let stats = manager.usage_stats();
    assert_eq!(stats["a"].request_count, 2);
    assert_eq!(stats["b"].request_count, 2);
}

// ============================================================================
// find_best_provider
// ============================================================================

#[tokio::test]
async fn find_best_skips_unavailable_providers() {
    let registry = Arc::new(ProviderRegistry::new());
    let probes = Arc::new(AtomicUsize::new(0));
    registry
        .register(
            ProviderConfig::new("down").capability(ModelCapability::TextGeneration),
            Arc::new(ProbeCounting {
                name: "down",
                available: false,
                probes: Arc::clone(&probes),
            }),
        )
        .unwrap();
    registry
        .register(
            ProviderConfig::new("up").capability(ModelCapability::TextGeneration),
            Arc::new(ProbeCounting {
                name: "up",
                available: true,
                probes: Arc::clone(&probes),
            }),
        )
        .unwrap();

    let manager = ProviderManager::new(Arc::clone(&registry));
    let best = manager
        .find_best_provider(ModelCapability::TextGeneration)
        .await
        .unwrap();
    assert_eq!(best.name(), "up");
}

#[tokio::test]
async fn find_best_distinguishes_none_registered_from_none_available() {
    let registry = Arc::new(ProviderRegistry::new());
    let manager = ProviderManager::new(Arc::clone(&registry));
    assert!(matches!(
        manager.find_best_provider(ModelCapability::Chat).await,
        Err(ModelMuxError::NoProvider(ModelCapability::Chat))
    ));

    let probes = Arc::new(AtomicUsize::new(0));
    registry
        .register(
            ProviderConfig::new("down").capability(ModelCapability::Chat),
            Arc::new(ProbeCounting {
                name: "down",
                available: false,
                probes,
            }),
        )
        .unwrap();
    assert!(matches!(
        manager.find_best_provider(ModelCapability::Chat).await,
        Err(ModelMuxError::NoAvailableProvider(ModelCapability::Chat))
    ));
}

// ============================================================================
// Probe caching
// ============================================================================

/// With an explicit TTL, repeated walks reuse one probe result instead of
/// hammering the backend.
#[tokio::test]
async fn probe_ttl_caches_availability() {
    let registry = Arc::new(ProviderRegistry::new());
    let probes = Arc::new(AtomicUsize::new(0));
    registry
        .register(
            ProviderConfig::new("cached").capability(ModelCapability::TextGeneration),
            Arc::new(ProbeCounting {
                name: "cached",
                available: true,
                probes: Arc::clone(&probes),
            }),
        )
        .unwrap();

    let manager = ProviderManager::builder(Arc::clone(&registry))
        .probe_ttl(Duration::from_secs(60))
        .build();
    for _ in 0..3 {
        manager
            .query_with_fallback("hello", &Route::new(), &RequestOptions::new())
            .await
            .unwrap();
    }
    assert_eq!(probes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn without_ttl_every_walk_probes() {
    let registry = Arc::new(ProviderRegistry::new());
    let probes = Arc::new(AtomicUsize::new(0));
    registry
        .register(
            ProviderConfig::new("fresh").capability(ModelCapability::TextGeneration),
            Arc::new(ProbeCounting {
                name: "fresh",
                available: true,
                probes: Arc::clone(&probes),
            }),
        )
        .unwrap();

    let manager = ProviderManager::new(Arc::clone(&registry));
    for _ in 0..3 {
        manager
            .query_with_fallback("hello", &Route::new(), &RequestOptions::new())
            .await
            .unwrap();
    }
    assert_eq!(probes.load(Ordering::SeqCst), 3);
}

// ============================================================================
// Usage stats
// ============================================================================

#[tokio::test]
async fn usage_stats_track_latency_and_reset() {
    let registry = echo_registry(&["a"]);
    let manager = ProviderManager::new(Arc::clone(&registry));

    manager
        .query_with_fallback("hello", &Route::new(), &RequestOptions::new())
        .await
        .unwrap();

    let stats = manager.usage_stats();
    assert_eq!(stats["a"].request_count, 1);
    assert_eq!(stats["a"].success_count, 1);
    assert!(stats["a"].average_latency().is_some());

    manager.reset_usage_stats();
    let stats = manager.usage_stats();
    assert_eq!(stats["a"].request_count, 0);
    assert_eq!(stats["a"].average_latency(), None);
}
