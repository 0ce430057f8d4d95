//! Hosted OpenAI-compatible API adapter.
//!
//! Speaks the `/chat/completions` + `/models` dialect shared by OpenAI,
//! OpenRouter, and most hosted gateways; point `base_url` at whichever
//! endpoint the deployment uses.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Provider, merge_params, status_error, transport_error};
use crate::config::ProviderConfig;
use crate::error::{ModelMuxError, ProviderError};
use crate::types::{Message, ModelCapability, ModelCost, ModelInfo, RequestOptions};

/// Default base URL; any OpenAI-compatible gateway works via `base_url`.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Nominal per-token price for models found via `/models` — the discovery
/// endpoint carries no pricing. Deployments that care about cost-aware
/// selection supply a static catalog with [`RemoteProvider::with_models`].
const DISCOVERED_MODEL_COST: f64 = 0.0002;

/// Adapter for a hosted, OpenAI-compatible text API.
#[derive(Debug)]
pub struct RemoteProvider {
    config: ProviderConfig,
    http: Client,
    base_url: String,
    models: Vec<ModelInfo>,
}

impl RemoteProvider {
    /// Build an adapter from its configuration.
    ///
    /// Fails when no credential is configured or the HTTP client cannot
    /// be built.
    pub fn new(config: ProviderConfig) -> Result<Self, ModelMuxError> {
        config.validate()?;
        if config.api_key.is_none() {
            return Err(ModelMuxError::Configuration(format!(
                "provider '{}' has no API key",
                config.name
            )));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelMuxError::Configuration(format!("HTTP client: {e}")))?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            config,
            http,
            base_url,
            models: Vec::new(),
        })
    }

    /// Set a static compiled-in model catalog. `list_models` then skips
    /// network discovery entirely.
    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        self
    }

    fn authed(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        for (name, value) in &self.config.extra_headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }

    fn model_for<'a>(&'a self, options: &'a RequestOptions) -> Result<&'a str, ProviderError> {
        options
            .model
            .as_deref()
            .or(self.config.default_model.as_deref())
            .ok_or_else(|| {
                ProviderError::RequestFailed(format!(
                    "no model named and provider '{}' has no default model",
                    self.config.name
                ))
            })
    }

    async fn send_chat(
        &self,
        messages: &[WireMessage<'_>],
        options: &RequestOptions,
    ) -> Result<String, ProviderError> {
        let model = self.model_for(options)?;
        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
        });
        merge_params(&mut body, &options.params);

        let response = self
            .authed(self.http.post(format!("{}/chat/completions", self.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(status_error(status, &detail));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::InvalidResponse("no content in completion".into()))?;

        debug!(provider = %self.config.name, model, "completion received");
        Ok(content)
    }
}

#[async_trait]
impl Provider for RemoteProvider {
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
        let messages = [WireMessage {
            role: "user",
            content: prompt,
        }];
        self.send_chat(&messages, options).await
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<String, ProviderError> {
        let wire: Vec<WireMessage<'_>> = messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect();
        self.send_chat(&wire, options).await
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        if !self.models.is_empty() {
            return Ok(self.models.clone());
        }

        let response = self
            .authed(self.http.get(format!("{}/models", self.base_url)))
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "HTTP {status} from model discovery"
            )));
        }

        let parsed: ModelList = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .data
            .into_iter()
            .map(|entry| {
                let mut info = ModelInfo::new(entry.id, self.config.name.as_str())
                    .with_cost(ModelCost::PerToken(DISCOVERED_MODEL_COST));
                for capability in &self.config.capabilities {
                    info = info.with_capability(*capability);
                }
                info
            })
            .collect())
    }

    async fn check_availability(&self) -> bool {
        self.authed(self.http.get(format!("{}/models", self.base_url)))
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}
