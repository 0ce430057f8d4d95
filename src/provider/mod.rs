//! Provider contract and adapter variants.
//!
//! Every backend sits behind the [`Provider`] trait: text in, text out,
//! plus a model catalog and a health probe. Transport details — which API
//! is spoken, how credentials travel — stay inside each adapter.
//!
//! # Variants
//!
//! - [`RemoteProvider`] — hosted OpenAI-compatible HTTP API
//! - [`LocalProvider`] — local model runtime speaking the Ollama HTTP API
//! - [`CustomProvider`] — synchronous handler function; any other backend
//!   implements the trait directly
//!
//! # Failure contract
//!
//! `query`/`chat` fail with a [`ProviderError`]; the manager records and
//! wraps these, so callers of the fallback surface never see them raw.
//! `check_availability` never fails: any transport problem is `false`.

mod custom;
mod handle;
mod local;
mod remote;
mod retry;

pub use custom::CustomProvider;
pub use handle::ProviderHandle;
pub use local::LocalProvider;
pub use remote::RemoteProvider;
pub use retry::RetryConfig;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{Message, ModelCapability, ModelInfo, RequestOptions};

/// Contract every backend adapter implements.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name for logging and registry lookups.
    fn name(&self) -> &str;

    /// Declared capability set.
    fn capabilities(&self) -> &[ModelCapability];

    /// Model used when a call names none.
    fn default_model(&self) -> Option<&str> {
        None
    }

    /// Single-prompt completion.
    async fn query(&self, prompt: &str, options: &RequestOptions)
    -> Result<String, ProviderError>;

    /// Multi-turn chat completion. Message order is meaningful (most
    /// recent last) and must reach the backend unchanged.
    ///
    /// The default implementation flattens the transcript into a single
    /// prompt, for adapters without a native chat endpoint.
    async fn chat(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<String, ProviderError> {
        let prompt = messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        self.query(&prompt, options).await
    }

    /// Models this provider can serve.
    ///
    /// May be a static compiled-in list. Adapters whose discovery needs
    /// the network signal `Unavailable` when it fails.
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError>;

    /// Lightweight health probe. Never fails: transport errors become
    /// `false`.
    async fn check_availability(&self) -> bool;

    /// Whether the declared capability set contains `capability`.
    fn supports(&self, capability: ModelCapability) -> bool {
        self.capabilities().contains(&capability)
    }
}

/// Map a reqwest transport failure onto the provider error contract.
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else if err.is_connect() {
        ProviderError::Unavailable(err.to_string())
    } else {
        ProviderError::RequestFailed(err.to_string())
    }
}

/// Map a non-success HTTP status onto the provider error contract.
pub(crate) fn status_error(status: reqwest::StatusCode, detail: &str) -> ProviderError {
    let detail: String = detail.trim().chars().take(200).collect();
    if detail.is_empty() {
        ProviderError::RequestFailed(format!("HTTP {status}"))
    } else {
        ProviderError::RequestFailed(format!("HTTP {status}: {detail}"))
    }
}

/// Merge opaque per-call params into a JSON request body without
/// overwriting keys the adapter already set.
pub(crate) fn merge_params(
    body: &mut serde_json::Value,
    params: &serde_json::Map<String, serde_json::Value>,
) {
    if let serde_json::Value::Object(map) = body {
        for (key, value) in params {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}
