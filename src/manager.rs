//! Fallback, load-balancing, comparison, and batch orchestration.
//!
//! One manager wraps one registry and is built once, up front, then
//! shared by every caller for the process lifetime — no hidden global
//! state. Each fallback call selects an ordered candidate list, attempts
//! providers in order, and either short-circuits on the first success or
//! fails with an aggregate carrying every attempt.
//!
//! # Candidate ordering
//!
//! The preferred provider (when given and registered) takes the first
//! slot; the remaining capability matches follow in registration order.
//! With load balancing on, the remaining subset's starting point rotates
//! through a per-capability cursor shared across calls, so repeated calls
//! spread across providers. The cursor is the only cross-call mutable
//! state and is a plain atomic; no lock is held across a walk.
//!
//! # Failure surface
//!
//! Callers of the fallback methods only ever see `AllProvidersFailed`
//! (with the ordered attempt list), `Cancelled`, or input-validation
//! errors. Raw provider errors never leak unwrapped.

use std::collections::HashMap;
use std::future::pending;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use moka::future::Cache;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::cancel::CancelSignal;
use crate::error::{Attempt, ModelMuxError, Result};
use crate::provider::ProviderHandle;
use crate::registry::ProviderRegistry;
use crate::stats::UsageStats;
use crate::types::{Message, ModelCapability, RequestOptions};

/// Routing inputs for one fallback call.
#[derive(Debug, Clone, Default)]
pub struct Route {
    preferred: Option<String>,
    capability: Option<ModelCapability>,
    cancel: Option<CancelSignal>,
    deadline: Option<Instant>,
}

impl Route {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider to try first. Skipped silently if not registered.
    pub fn preferred(mut self, name: impl Into<String>) -> Self {
        self.preferred = Some(name.into());
        self
    }

    /// Capability candidates must support. Defaults to `TextGeneration`
    /// for queries and `Chat` for chat calls.
    pub fn capability(mut self, capability: ModelCapability) -> Self {
        self.capability = Some(capability);
        self
    }

    /// Cancellation signal, checked at each candidate boundary and raced
    /// against the in-flight call.
    pub fn cancel(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    /// Absolute deadline. Once passed, the walk stops with `Cancelled`.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|s| s.is_cancelled())
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves when the caller cancels or the deadline passes; pends
    /// forever when neither is set.
    async fn interrupted(&self) {
        match (&self.cancel, self.deadline) {
            (Some(signal), Some(deadline)) => tokio::select! {
                _ = signal.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {}
            },
            (Some(signal), None) => signal.cancelled().await,
            (None, Some(deadline)) => tokio::time::sleep_until(deadline).await,
            (None, None) => pending::<()>().await,
        }
    }
}

/// Orchestrates calls across the providers of one registry.
pub struct ProviderManager {
    registry: Arc<ProviderRegistry>,
    fallback_enabled: AtomicBool,
    load_balancing: AtomicBool,
    probe_cache: Option<Cache<String, bool>>,
    cursors: [AtomicUsize; ModelCapability::COUNT],
}

impl ProviderManager {
    /// Manager with default policy: fallback on, load balancing off, no
    /// probe caching.
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self::builder(registry).build()
    }

    /// Create a builder for configuring a manager.
    pub fn builder(registry: Arc<ProviderRegistry>) -> ManagerBuilder {
        ManagerBuilder::new(registry)
    }

    /// The registry this manager routes over.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled.load(Ordering::Relaxed)
    }

    /// Enable or disable continuing past a failed attempt.
    pub fn set_fallback_enabled(&self, enabled: bool) {
        self.fallback_enabled.store(enabled, Ordering::Relaxed);
        debug!(enabled, "fallback toggled");
    }

    pub fn load_balancing(&self) -> bool {
        self.load_balancing.load(Ordering::Relaxed)
    }

    /// Enable or disable round-robin rotation of the candidate order.
    pub fn set_load_balancing(&self, enabled: bool) {
        self.load_balancing.store(enabled, Ordering::Relaxed);
        debug!(enabled, "load balancing toggled");
    }

    /// Query providers with automatic fallback.
    ///
    /// Candidates are attempted in route order; the first success is
    /// returned immediately. A candidate whose availability probe fails
    /// is skipped without counting as an attempt. With fallback disabled,
    /// the first failed attempt surfaces at once as an aggregate with a
    /// single entry.
    #[instrument(skip(self, prompt, route, options), fields(operation = "query_with_fallback"))]
    pub async fn query_with_fallback(
        &self,
        prompt: &str,
        route: &Route,
        options: &RequestOptions,
    ) -> Result<String> {
        let capability = route.capability.unwrap_or(ModelCapability::TextGeneration);
        let candidates = self.candidates(route, capability)?;
        let mut attempts = Vec::new();
        for handle in candidates {
            if route.is_cancelled() {
                return Err(ModelMuxError::Cancelled);
            }
            if !self.is_available(&handle).await {
                debug!(provider = handle.name(), "skipping unavailable provider");
                continue;
            }
            debug!(provider = handle.name(), "attempting provider");
            let result = tokio::select! {
                result = handle.query(prompt, options) => result,
                _ = route.interrupted() => return Err(ModelMuxError::Cancelled),
            };
            match result {
                Ok(text) => return Ok(text),
                Err(error) => {
                    warn!(provider = handle.name(), error = %error, "provider attempt failed");
                    attempts.push(Attempt {
                        provider: handle.name().to_string(),
                        error,
                    });
                    if !self.fallback_enabled() {
                        return Err(ModelMuxError::AllProvidersFailed { attempts });
                    }
                }
            }
        }
        Err(ModelMuxError::AllProvidersFailed { attempts })
    }

    /// Chat completion with automatic fallback. Same walk as
    /// [`query_with_fallback`](Self::query_with_fallback), implied
    /// capability `Chat`.
    #[instrument(skip(self, messages, route, options), fields(operation = "chat_with_fallback"))]
    pub async fn chat_with_fallback(
        &self,
        messages: &[Message],
        route: &Route,
        options: &RequestOptions,
    ) -> Result<String> {
        let capability = route.capability.unwrap_or(ModelCapability::Chat);
        let candidates = self.candidates(route, capability)?;
        let mut attempts = Vec::new();
        for handle in candidates {
            if route.is_cancelled() {
                return Err(ModelMuxError::Cancelled);
            }
            if !self.is_available(&handle).await {
                debug!(provider = handle.name(), "skipping unavailable provider");
                continue;
            }
            debug!(provider = handle.name(), "attempting provider");
            let result = tokio::select! {
                result = handle.chat(messages, options) => result,
                _ = route.interrupted() => return Err(ModelMuxError::Cancelled),
            };
            match result {
                Ok(text) => return Ok(text),
                Err(error) => {
                    warn!(provider = handle.name(), error = %error, "provider attempt failed");
                    attempts.push(Attempt {
                        provider: handle.name().to_string(),
                        error,
                    });
                    if !self.fallback_enabled() {
                        return Err(ModelMuxError::AllProvidersFailed { attempts });
                    }
                }
            }
        }
        Err(ModelMuxError::AllProvidersFailed { attempts })
    }

    /// First available provider for `capability` under the current
    /// ordering policy.
    pub async fn find_best_provider(
        &self,
        capability: ModelCapability,
    ) -> Result<Arc<ProviderHandle>> {
        let candidates = self.candidates(&Route::new(), capability)?;
        for handle in candidates {
            if self.is_available(&handle).await {
                return Ok(handle);
            }
        }
        Err(ModelMuxError::NoAvailableProvider(capability))
    }

    /// Query every requested provider independently, exactly once each.
    ///
    /// Returns one entry per requested provider (all registered providers
    /// when `providers` is `None`). Failures become error markers in the
    /// map and never block another provider's attempt. No fallback
    /// semantics apply.
    pub async fn compare_responses(
        &self,
        prompt: &str,
        providers: Option<&[&str]>,
        options: &RequestOptions,
    ) -> HashMap<String, Result<String>> {
        let targets: Vec<(String, Option<Arc<ProviderHandle>>)> = match providers {
            Some(names) => names
                .iter()
                .map(|name| (name.to_string(), self.registry.get(name)))
                .collect(),
            None => self
                .registry
                .providers()
                .into_iter()
                .map(|handle| (handle.name().to_string(), Some(handle)))
                .collect(),
        };

        let calls = targets.into_iter().map(|(name, handle)| async move {
            let outcome = match handle {
                Some(handle) => {
                    handle
                        .query(prompt, options)
                        .await
                        .map_err(|error| ModelMuxError::ProviderFailed {
                            provider: name.clone(),
                            source: error,
                        })
                }
                None => Err(ModelMuxError::ProviderNotFound(name.clone())),
            };
            (name, outcome)
        });

        join_all(calls).await.into_iter().collect()
    }

    /// Run each prompt independently; slot `i` answers prompt `i`.
    ///
    /// With a named provider every prompt goes straight to it; otherwise
    /// each prompt runs through the fallback walk. A failing prompt fills
    /// its slot with an error marker instead of aborting the rest. The
    /// whole call fails only on input validation: a named provider that
    /// is not registered.
    pub async fn batch_query(
        &self,
        prompts: &[&str],
        provider: Option<&str>,
        options: &RequestOptions,
    ) -> Result<Vec<Result<String>>> {
        match provider {
            Some(name) => {
                let handle = self
                    .registry
                    .get(name)
                    .ok_or_else(|| ModelMuxError::ProviderNotFound(name.to_string()))?;
                let calls = prompts.iter().map(|prompt| {
                    let handle = Arc::clone(&handle);
                    async move {
                        handle.query(prompt, options).await.map_err(|error| {
                            ModelMuxError::ProviderFailed {
                                provider: handle.name().to_string(),
                                source: error,
                            }
                        })
                    }
                });
                Ok(join_all(calls).await)
            }
            None => {
                let route = Route::new();
                let calls = prompts
                    .iter()
                    .map(|prompt| self.query_with_fallback(prompt, &route, options));
                Ok(join_all(calls).await)
            }
        }
    }

    /// Per-provider usage snapshot. Pure read, no side effects.
    pub fn usage_stats(&self) -> HashMap<String, UsageStats> {
        self.registry
            .providers()
            .into_iter()
            .map(|handle| (handle.name().to_string(), handle.usage()))
            .collect()
    }

    /// Zero every provider's usage counters.
    pub fn reset_usage_stats(&self) {
        for handle in self.registry.providers() {
            handle.reset_usage();
        }
    }

    /// Ordered candidate list: preferred first (when registered), then
    /// capability matches in registration order, rotated by the shared
    /// cursor when load balancing is on.
    fn candidates(
        &self,
        route: &Route,
        capability: ModelCapability,
    ) -> Result<Vec<Arc<ProviderHandle>>> {
        let mut out: Vec<Arc<ProviderHandle>> = Vec::new();
        if let Some(name) = route.preferred.as_deref() {
            match self.registry.get(name) {
                Some(handle) => out.push(handle),
                None => debug!(provider = name, "preferred provider not registered"),
            }
        }

        let mut rest: Vec<_> = self
            .registry
            .find_by_capability(capability)
            .into_iter()
            .filter(|h| out.iter().all(|p| p.name() != h.name()))
            .collect();
        if self.load_balancing() && rest.len() > 1 {
            let start =
                self.cursors[capability.index()].fetch_add(1, Ordering::Relaxed) % rest.len();
            rest.rotate_left(start);
        }
        out.extend(rest);

        if out.is_empty() {
            return Err(ModelMuxError::NoProvider(capability));
        }
        Ok(out)
    }

    /// Availability probe, through the TTL cache when one is configured.
    async fn is_available(&self, handle: &Arc<ProviderHandle>) -> bool {
        match &self.probe_cache {
            Some(cache) => {
                let probe = Arc::clone(handle);
                cache
                    .get_with(handle.name().to_string(), async move {
                        probe.check_availability().await
                    })
                    .await
            }
            None => handle.check_availability().await,
        }
    }
}

impl std::fmt::Debug for ProviderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderManager")
            .field("providers", &self.registry.provider_names())
            .field("fallback_enabled", &self.fallback_enabled())
            .field("load_balancing", &self.load_balancing())
            .finish()
    }
}

/// Builder for [`ProviderManager`].
pub struct ManagerBuilder {
    registry: Arc<ProviderRegistry>,
    fallback_enabled: bool,
    load_balancing: bool,
    probe_ttl: Option<Duration>,
}

impl ManagerBuilder {
    fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            fallback_enabled: true,
            load_balancing: false,
            probe_ttl: None,
        }
    }

    /// Continue past failed attempts (default: true).
    pub fn fallback_enabled(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    /// Rotate candidate order across calls (default: false).
    pub fn load_balancing(mut self, enabled: bool) -> Self {
        self.load_balancing = enabled;
        self
    }

    /// Cache availability probes for `ttl`. Off by default: every walk
    /// probes fresh, so availability always reflects the latest probe.
    pub fn probe_ttl(mut self, ttl: Duration) -> Self {
        self.probe_ttl = Some(ttl);
        self
    }

    pub fn build(self) -> ProviderManager {
        ProviderManager {
            registry: self.registry,
            fallback_enabled: AtomicBool::new(self.fallback_enabled),
            load_balancing: AtomicBool::new(self.load_balancing),
            probe_cache: self
                .probe_ttl
                .map(|ttl| Cache::builder().time_to_live(ttl).build()),
            cursors: std::array::from_fn(|_| AtomicUsize::new(0)),
        }
    }
}
