//! modelmux error types

use std::time::Duration;

use crate::types::ModelCapability;

/// Transport-level failure raised inside a provider adapter.
///
/// These never cross the manager boundary raw: the fallback surface wraps
/// every one of them into [`ModelMuxError::AllProvidersFailed`] or
/// [`ModelMuxError::ProviderFailed`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// Backend unreachable or not serving.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Request reached the backend but failed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Request exceeded the configured transport timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Backend answered with something the adapter could not use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Discriminant for attempt logs and metric labels.
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::Unavailable(_) => ProviderErrorKind::Unavailable,
            ProviderError::RequestFailed(_) => ProviderErrorKind::RequestFailed,
            ProviderError::Timeout(_) => ProviderErrorKind::Timeout,
            ProviderError::InvalidResponse(_) => ProviderErrorKind::InvalidResponse,
        }
    }

    /// Whether retrying the same provider may help.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RequestFailed(_) | ProviderError::Timeout(_)
        )
    }
}

/// Discriminant of a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    Unavailable,
    RequestFailed,
    Timeout,
    InvalidResponse,
}

impl ProviderErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderErrorKind::Unavailable => "unavailable",
            ProviderErrorKind::RequestFailed => "request_failed",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::InvalidResponse => "invalid_response",
        }
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed provider attempt inside a fallback walk, in attempt order.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    /// Provider that was attempted.
    pub provider: String,
    /// Why the attempt failed.
    pub error: ProviderError,
}

/// modelmux error types
#[derive(Debug, thiserror::Error)]
pub enum ModelMuxError {
    /// Malformed provider configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `register` hit an existing name under the reject policy.
    #[error("provider already registered: {0}")]
    DuplicateProvider(String),

    /// An explicitly named provider is not in the registry.
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    /// No registered provider declares the required capability.
    #[error("no provider registered for capability {0}")]
    NoProvider(ModelCapability),

    /// Providers declare the capability but none passed its probe.
    #[error("no available provider for capability {0}")]
    NoAvailableProvider(ModelCapability),

    /// Cost lookup found nothing to rank.
    #[error("no model matches capability {capability} (free_only: {free_only})")]
    NoMatchingModel {
        capability: ModelCapability,
        free_only: bool,
    },

    /// A single provider's failure, wrapped for comparison/batch markers.
    #[error("provider '{provider}' failed: {source}")]
    ProviderFailed {
        provider: String,
        source: ProviderError,
    },

    /// Every candidate was exhausted. `attempts` lists each failed
    /// attempt in walk order; it is empty when all candidates were
    /// skipped as unavailable without being attempted.
    #[error("all providers failed after {} attempt(s)", .attempts.len())]
    AllProvidersFailed { attempts: Vec<Attempt> },

    /// The caller's cancellation signal fired or its deadline passed.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type alias for modelmux operations
pub type Result<T> = std::result::Result<T, ModelMuxError>;
