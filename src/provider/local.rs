//! Local model runtime adapter.
//!
//! Speaks the Ollama HTTP API (`/api/generate`, `/api/chat`, `/api/tags`)
//! against a runtime on the local machine. Everything it serves is
//! free-tier.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{Provider, merge_params, status_error, transport_error};
use crate::config::ProviderConfig;
use crate::error::{ModelMuxError, ProviderError};
use crate::types::{Message, ModelCapability, ModelCost, ModelInfo, RequestOptions};

/// Default local runtime endpoint.
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Capabilities assumed for a local runtime that declares none.
const DEFAULT_CAPABILITIES: [ModelCapability; 5] = [
    ModelCapability::TextGeneration,
    ModelCapability::Chat,
    ModelCapability::CodeGeneration,
    ModelCapability::Translation,
    ModelCapability::Summarization,
];

/// Adapter for a local model runtime.
#[derive(Debug)]
pub struct LocalProvider {
    config: ProviderConfig,
    http: Client,
    base_url: String,
}

impl LocalProvider {
    /// Build an adapter from its configuration. No credential is needed.
    pub fn new(mut config: ProviderConfig) -> Result<Self, ModelMuxError> {
        config.validate()?;
        if config.capabilities.is_empty() {
            config.capabilities = DEFAULT_CAPABILITIES.to_vec();
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
        })
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

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ProviderError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(status_error(status, &detail));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    /// Context window heuristic by model family name.
    fn context_length_for(name: &str) -> u32 {
        let name = name.to_lowercase();
        if name.contains("mixtral") {
            32_768
        } else if name.contains("mistral") {
            8_192
        } else {
            4_096
        }
    }
}

#[async_trait]
impl Provider for LocalProvider {
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
        let model = self.model_for(options)?;
        let mut body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });
        merge_params(&mut body, &options.params);

        let reply: GenerateReply = self.post_json("/api/generate", &body).await?;
        if reply.response.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "no content in generate response".into(),
            ));
        }
        debug!(provider = %self.config.name, model, "completion received");
        Ok(reply.response)
    }

    async fn chat(
        &self,
        messages: &[Message],
        options: &RequestOptions,
    ) -> Result<String, ProviderError> {
        let model = self.model_for(options)?;
        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": false,
        });
        merge_params(&mut body, &options.params);

        let reply: ChatReply = self.post_json("/api/chat", &body).await?;
        if reply.message.content.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "no content in chat response".into(),
            ));
        }
        Ok(reply.message.content)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "HTTP {status} from model discovery"
            )));
        }

        let parsed: TagsReply = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .models
            .into_iter()
            .map(|entry| {
                let mut info = ModelInfo::new(entry.name.as_str(), self.config.name.as_str())
                    .with_cost(ModelCost::Free)
                    .with_capability(ModelCapability::TextGeneration)
                    .with_capability(ModelCapability::Chat)
                    .with_context_length(Self::context_length_for(&entry.name));
                if entry.name.to_lowercase().contains("code") {
                    info = info.with_capability(ModelCapability::CodeGeneration);
                }
                info
            })
            .collect())
    }

    async fn check_availability(&self) -> bool {
        self.http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }
}

#[derive(Deserialize)]
struct GenerateReply {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    message: ReplyMessage,
}

#[derive(Deserialize, Default)]
struct ReplyMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct TagsReply {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}
