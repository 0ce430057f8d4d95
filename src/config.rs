//! Provider configuration.
//!
//! `ProviderConfig` values are built by an external config loader (from
//! environment variables or a declarative file) and handed to the registry
//! together with the adapter instantiated from them. The routing core
//! itself never reads the environment or the filesystem.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ModelMuxError;
use crate::types::ModelCapability;

/// Which adapter family a configuration targets.
///
/// Carried for the config loader's benefit; once registered, the routing
/// core treats every provider uniformly through the trait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Hosted API behind an HTTP endpoint.
    #[default]
    Remote,
    /// Model runtime on the local machine.
    Local,
    /// Anything else implementing the provider trait.
    Custom,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_retries() -> u32 {
    3
}

/// Configuration for one provider instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name within a registry.
    pub name: String,
    /// Adapter family tag.
    #[serde(default)]
    pub kind: ProviderKind,
    /// Credential reference (API key or token), if the backend needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base endpoint override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model used when a call names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    /// Declared capability set.
    #[serde(default)]
    pub capabilities: Vec<ModelCapability>,
    /// Transport timeout for one request. Also bounds availability probes.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
    /// Attempts per logical call on transient errors. 1 = no retry.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Extra HTTP headers forwarded by the HTTP adapters.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_headers: HashMap<String, String>,
    /// Opaque adapter-specific settings.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProviderConfig {
    /// Create a configuration with defaults for everything but the name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ProviderKind::default(),
            api_key: None,
            base_url: None,
            default_model: None,
            capabilities: Vec::new(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            extra_headers: HashMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Set the adapter family tag.
    pub fn kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the credential.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base endpoint.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the model used when a call names none.
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Add one declared capability.
    pub fn capability(mut self, capability: ModelCapability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    /// Replace the declared capability set.
    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = ModelCapability>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    /// Set the transport timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the per-call retry budget.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Add an extra HTTP header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    /// Attach an opaque adapter-specific setting.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ModelMuxError> {
        if self.name.trim().is_empty() {
            return Err(ModelMuxError::Configuration(
                "provider name must not be empty".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ModelMuxError::Configuration(format!(
                "provider '{}' has a zero timeout",
                self.name
            )));
        }
        Ok(())
    }
}
