//! Per-call request options.

use serde::{Deserialize, Serialize};

/// Options attached to a single `query`/`chat` call.
///
/// `model` names a specific model; adapters fall back to their configured
/// default when it is unset. `params` is an opaque key/value map handed to
/// the provider's transport untouched — the routing core never interprets
/// its keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the model to use for this call.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Attach a provider-specific parameter, passed through opaquely.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}
