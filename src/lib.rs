//! modelmux - Multi-provider request router for generative text APIs
//!
//! This crate abstracts heterogeneous text-generation backends behind one
//! [`Provider`] trait and routes calls across them: fallback chains,
//! round-robin load balancing, capability-based candidate selection, and
//! cost-aware model lookup. Build one [`ProviderRegistry`], register the
//! providers your config loader instantiated, wrap it in one
//! [`ProviderManager`], and pass the manager down to callers.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use modelmux::{
//!     ModelCapability, ProviderConfig, ProviderManager, ProviderRegistry, RemoteProvider,
//!     RequestOptions, Route,
//! };
//!
//! #[tokio::main]
//! async fn main() -> modelmux::Result<()> {
//!     let registry = Arc::new(ProviderRegistry::new());
//!     let config = ProviderConfig::new("openrouter")
//!         .api_key("sk-or-your-key")
//!         .base_url("https://openrouter.ai/api/v1")
//!         .default_model("meta-llama/llama-3-8b-instruct")
//!         .capability(ModelCapability::TextGeneration)
//!         .capability(ModelCapability::Chat);
//!     registry.register_with(config, |cfg| Ok(Arc::new(RemoteProvider::new(cfg.clone())?)))?;
//!
//!     let manager = ProviderManager::new(Arc::clone(&registry));
//!     let answer = manager
//!         .query_with_fallback(
//!             "What is the capital of France?",
//!             &Route::new(),
//!             &RequestOptions::new(),
//!         )
//!         .await?;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod manager;
pub mod provider;
pub mod registry;
pub mod stats;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cancel::CancelSignal;
pub use config::{ProviderConfig, ProviderKind};
pub use error::{Attempt, ModelMuxError, ProviderError, ProviderErrorKind, Result};
pub use manager::{ManagerBuilder, ProviderManager, Route};
pub use provider::{
    CustomProvider, LocalProvider, Provider, ProviderHandle, RemoteProvider, RetryConfig,
};
pub use registry::{DuplicatePolicy, ProviderRegistry};
pub use stats::UsageStats;
pub use types::{Message, ModelCapability, ModelCost, ModelInfo, RequestOptions, Role};
