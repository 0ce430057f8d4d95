//! Model metadata and pricing types.

use serde::{Deserialize, Serialize};

use super::capability::ModelCapability;

/// Price attached to a model: explicitly free, or a non-negative
/// per-token amount. Never both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelCost {
    /// Free tier or locally hosted.
    Free,
    /// Price per token, in the provider's billing currency.
    PerToken(f64),
}

impl ModelCost {
    pub fn is_free(&self) -> bool {
        matches!(self, ModelCost::Free)
    }

    /// Strict "cheaper than" ordering for the cheapest-model scan.
    ///
    /// Free beats any price. Equal prices are not cheaper, so a scan that
    /// only replaces its best on strict wins keeps the earliest candidate.
    pub(crate) fn cheaper_than(&self, other: &ModelCost) -> bool {
        match (self, other) {
            (ModelCost::Free, ModelCost::Free) => false,
            (ModelCost::Free, ModelCost::PerToken(_)) => true,
            (ModelCost::PerToken(_), ModelCost::Free) => false,
            (ModelCost::PerToken(a), ModelCost::PerToken(b)) => a < b,
        }
    }
}

/// Information about an available model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier (e.g., "gpt-4o-mini", "llama3:8b").
    pub id: String,
    /// Human-readable display name. Defaults to the id.
    pub name: String,
    /// Name of the provider serving this model.
    pub provider: String,
    /// Capabilities this model supports.
    pub capabilities: Vec<ModelCapability>,
    /// Price for using this model.
    pub cost: ModelCost,
    /// Maximum context window in tokens (if known).
    pub context_length: Option<u32>,
}

impl ModelInfo {
    /// Create new model info with required fields.
    pub fn new(id: impl Into<String>, provider: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            provider: provider.into(),
            capabilities: Vec::new(),
            cost: ModelCost::Free,
            context_length: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a capability to this model.
    pub fn with_capability(mut self, cap: ModelCapability) -> Self {
        if !self.capabilities.contains(&cap) {
            self.capabilities.push(cap);
        }
        self
    }

    /// Set the price.
    pub fn with_cost(mut self, cost: ModelCost) -> Self {
        self.cost = cost;
        self
    }

    /// Set the context window size.
    pub fn with_context_length(mut self, tokens: u32) -> Self {
        self.context_length = Some(tokens);
        self
    }

    /// Whether this model supports `capability`.
    pub fn supports(&self, capability: ModelCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}
