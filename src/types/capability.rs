//! Capability tags for providers and models.

use serde::{Deserialize, Serialize};

/// A category of generation work a provider or model supports.
///
/// Providers declare a capability set in their configuration; the manager
/// routes each call to providers whose set contains the required tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelCapability {
    /// Single-prompt text completion.
    TextGeneration,
    /// Multi-turn chat conversations.
    Chat,
    /// Source code generation.
    CodeGeneration,
    /// Language translation.
    Translation,
    /// Content summarization.
    Summarization,
    /// Text embeddings.
    Embedding,
    /// Image generation.
    ImageGeneration,
    /// Audio generation.
    AudioGeneration,
    /// Video generation.
    VideoGeneration,
    /// Content safety moderation.
    Moderation,
}

impl ModelCapability {
    /// Number of capability tags. Sizes per-capability lookup tables.
    pub const COUNT: usize = 10;

    /// All capability tags, in declaration order.
    pub const ALL: [ModelCapability; Self::COUNT] = [
        ModelCapability::TextGeneration,
        ModelCapability::Chat,
        ModelCapability::CodeGeneration,
        ModelCapability::Translation,
        ModelCapability::Summarization,
        ModelCapability::Embedding,
        ModelCapability::ImageGeneration,
        ModelCapability::AudioGeneration,
        ModelCapability::VideoGeneration,
        ModelCapability::Moderation,
    ];

    /// Stable index into per-capability tables.
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Label name, matching the serialized representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelCapability::TextGeneration => "text_generation",
            ModelCapability::Chat => "chat",
            ModelCapability::CodeGeneration => "code_generation",
            ModelCapability::Translation => "translation",
            ModelCapability::Summarization => "summarization",
            ModelCapability::Embedding => "embedding",
            ModelCapability::ImageGeneration => "image_generation",
            ModelCapability::AudioGeneration => "audio_generation",
            ModelCapability::VideoGeneration => "video_generation",
            ModelCapability::Moderation => "moderation",
        }
    }
}

impl std::fmt::Display for ModelCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
