//! Provider catalog with capability and cost indexing.
//!
//! The registry maps unique names to registered providers. Iteration
//! order is registration order and is part of the observable contract:
//! capability lookups and cost tie-breaks resolve in favour of earlier
//! registrations.
//!
//! The catalog hands out `Arc<ProviderHandle>` references and does not
//! own provider lifetime destructively — removing a name only drops
//! catalog membership, and handles callers already hold stay valid.

use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{ModelMuxError, Result};
use crate::provider::{Provider, ProviderHandle};
use crate::types::{ModelCapability, ModelInfo};

/// What `register` does when a name is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail fast with `DuplicateProvider`.
    #[default]
    Reject,
    /// Swap the provider in place, keeping its registration position.
    /// For hot-reload setups.
    Replace,
}

/// Catalog of registered providers.
pub struct ProviderRegistry {
    providers: RwLock<Vec<Arc<ProviderHandle>>>,
    duplicate_policy: DuplicatePolicy,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Create an empty registry with the default (reject) duplicate policy.
    pub fn new() -> Self {
        Self::with_duplicate_policy(DuplicatePolicy::default())
    }

    /// Create an empty registry with an explicit duplicate policy.
    pub fn with_duplicate_policy(duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            duplicate_policy,
        }
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// Registration-order snapshot of the catalog.
    ///
    /// Cheap (`Arc` clones); the lock is never held across awaits.
    pub fn providers(&self) -> Vec<Arc<ProviderHandle>> {
        self.providers
            .read()
            .expect("provider registry lock poisoned")
            .clone()
    }

    /// Register a provider instance under `config.name`.
    ///
    /// `config` should be the configuration the adapter was built from;
    /// the handle uses it for the probe timeout bound and retry budget.
    pub fn register(&self, config: ProviderConfig, provider: Arc<dyn Provider>) -> Result<()> {
        config.validate()?;
        let handle = Arc::new(ProviderHandle::new(config, provider));
        let mut providers = self
            .providers
            .write()
            .expect("provider registry lock poisoned");
        if let Some(idx) = providers.iter().position(|h| h.name() == handle.name()) {
            match self.duplicate_policy {
                DuplicatePolicy::Reject => {
                    return Err(ModelMuxError::DuplicateProvider(handle.name().to_string()));
                }
                DuplicatePolicy::Replace => {
                    debug!(provider = handle.name(), "replacing registered provider");
                    providers[idx] = handle;
                }
            }
        } else {
            debug!(provider = handle.name(), "registered provider");
            providers.push(handle);
        }
        Ok(())
    }

    /// Instantiate a provider from its configuration and register it.
    ///
    /// The factory shape keeps config and adapter in lockstep:
    ///
    /// ```rust,ignore
    /// registry.register_with(config, |cfg| {
    ///     Ok(Arc::new(RemoteProvider::new(cfg.clone())?))
    /// })?;
    /// ```
    pub fn register_with<F>(&self, config: ProviderConfig, build: F) -> Result<()>
    where
        F: FnOnce(&ProviderConfig) -> Result<Arc<dyn Provider>>,
    {
        let provider = build(&config)?;
        self.register(config, provider)
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<ProviderHandle>> {
        self.providers
            .read()
            .expect("provider registry lock poisoned")
            .iter()
            .find(|h| h.name() == name)
            .cloned()
    }

    /// Providers supporting `capability`, in registration order.
    pub fn find_by_capability(&self, capability: ModelCapability) -> Vec<Arc<ProviderHandle>> {
        self.providers()
            .into_iter()
            .filter(|h| h.supports(capability))
            .collect()
    }

    /// All models across all providers, optionally filtered by capability.
    ///
    /// A provider whose listing fails is logged and skipped; one broken
    /// backend never empties the aggregate catalog.
    pub async fn list_all_models(&self, capability: Option<ModelCapability>) -> Vec<ModelInfo> {
        let mut all = Vec::new();
        for handle in self.providers() {
            match handle.list_models().await {
                Ok(models) => all.extend(models),
                Err(error) => {
                    warn!(provider = handle.name(), error = %error, "listing models failed");
                }
            }
        }
        match capability {
            Some(capability) => all
                .into_iter()
                .filter(|model| model.supports(capability))
                .collect(),
            None => all,
        }
    }

    /// Cheapest model for `capability`.
    ///
    /// With `free_only`, only free models are considered. Ties keep the
    /// earlier provider by registration order, then the earlier entry in
    /// that provider's own listing order.
    pub async fn cheapest_model(
        &self,
        capability: ModelCapability,
        free_only: bool,
    ) -> Result<ModelInfo> {
        let mut best: Option<ModelInfo> = None;
        for model in self.list_all_models(Some(capability)).await {
            if free_only && !model.cost.is_free() {
                continue;
            }
            // Strict wins only, so the earliest candidate keeps ties.
            let replace = match &best {
                None => true,
                Some(current) => model.cost.cheaper_than(&current.cost),
            };
            if replace {
                best = Some(model);
            }
        }
        best.ok_or(ModelMuxError::NoMatchingModel {
            capability,
            free_only,
        })
    }

    /// Drop `name` from the catalog. Handles callers already hold remain
    /// valid. Returns whether anything was removed.
    pub fn remove_provider(&self, name: &str) -> bool {
        let mut providers = self
            .providers
            .write()
            .expect("provider registry lock poisoned");
        let before = providers.len();
        providers.retain(|h| h.name() != name);
        let removed = providers.len() != before;
        if removed {
            debug!(provider = name, "removed provider");
        }
        removed
    }

    /// Registered provider names, in registration order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers()
            .iter()
            .map(|h| h.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers
            .read()
            .expect("provider registry lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.provider_names())
            .field("duplicate_policy", &self.duplicate_policy)
            .finish()
    }
}
