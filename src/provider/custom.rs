//! Handler-function provider variant.

use async_trait::async_trait;

use super::Provider;
use crate::config::ProviderConfig;
use crate::error::{ModelMuxError, ProviderError};
use crate::types::{ModelCapability, ModelInfo, RequestOptions};

type Handler = dyn Fn(&str, &RequestOptions) -> Result<String, ProviderError> + Send + Sync;

/// Provider backed by a synchronous handler function.
///
/// The "custom" slot: deterministic templating, canned development
/// responses, or any locally computed text source. Always reports
/// available; its model catalog is whatever is set via
/// [`with_models`](Self::with_models). Backends that need async I/O
/// implement [`Provider`] directly instead.
pub struct CustomProvider {
    config: ProviderConfig,
    models: Vec<ModelInfo>,
    handler: Box<Handler>,
}

impl CustomProvider {
    /// Build a provider around `handler`.
    pub fn new(
        config: ProviderConfig,
        handler: impl Fn(&str, &RequestOptions) -> Result<String, ProviderError>
        + Send
        + Sync
        + 'static,
    ) -> Result<Self, ModelMuxError> {
        config.validate()?;
        Ok(Self {
            config,
            models: Vec::new(),
            handler: Box::new(handler),
        })
    }

    /// Provider that answers every prompt with the same text.
    pub fn fixed(
        config: ProviderConfig,
        response: impl Into<String>,
    ) -> Result<Self, ModelMuxError> {
        let response = response.into();
        Self::new(config, move |_, _| Ok(response.clone()))
    }

    /// Set the model catalog this provider reports.
    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        self
    }
}

#[async_trait]
impl Provider for CustomProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> &[ModelCapability] {
        &self.config.capabilities
    }

    fn default_model(&self) -> Option<&str> {
        self.config.default_model.as_deref()
    }

    async fn query(
        &self,
        prompt: &str,
        options: &RequestOptions,
    ) -> Result<String, ProviderError> {
        (self.handler)(prompt, options)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        Ok(self.models.clone())
    }

    async fn check_availability(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for CustomProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomProvider")
            .field("name", &self.config.name)
            .field("models", &self.models.len())
            .finish()
    }
}
