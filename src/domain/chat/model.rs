//! Model descriptor entity and provider tags.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ModelId;

/// Upstream vendor a model descriptor dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    DeepSeek,
    Qwen,
    OpenRouter,
}

impl Provider {
    /// Stable string form used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::DeepSeek => "deepseek",
            Provider::Qwen => "qwen",
            Provider::OpenRouter => "openrouter",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "openai" => Some(Provider::OpenAi),
            "deepseek" => Some(Provider::DeepSeek),
            "qwen" => Some(Provider::Qwen),
            "openrouter" => Some(Provider::OpenRouter),
            _ => None,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable model.
///
/// `model_string` is the provider-side name (e.g. "deepseek-reasoner") and
/// the key adapter dispatch resolves on; `id` is the key messages and
/// conversations reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Internal identifier (foreign-key target).
    pub id: ModelId,
    /// Human-readable name shown in the model selector.
    pub name: String,
    /// Which vendor serves this model.
    pub provider: Provider,
    /// Provider-specific model string (dispatch key).
    pub model_string: String,
    /// Optional marketing/description text.
    pub description: Option<String>,
    /// Inactive models are hidden from the selector but remain valid FKs.
    pub active: bool,
}

impl ModelDescriptor {
    /// Creates an active descriptor.
    pub fn new(
        name: impl Into<String>,
        provider: Provider,
        model_string: impl Into<String>,
    ) -> Self {
        Self {
            id: ModelId::new(),
            name: name.into(),
            provider,
            model_string: model_string.into(),
            description: None,
            active: true,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
