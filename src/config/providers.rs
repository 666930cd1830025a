//! Model provider configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Model provider configuration.
///
/// Every key is optional: a vendor without a key serves clearly-marked
/// simulated replies instead of failing turns, so a bare development
/// environment still works end to end.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// DeepSeek API key
    pub deepseek_api_key: Option<String>,

    /// Qwen (DashScope) API key
    pub qwen_api_key: Option<String>,

    /// OpenRouter API key
    pub openrouter_api_key: Option<String>,

    /// Referer URL sent in OpenRouter attribution headers
    #[serde(default = "default_openrouter_referer")]
    pub openrouter_referer: String,

    /// Model string used when a request names no model
    #[serde(default = "default_model")]
    pub default_model: String,
}

impl ProvidersConfig {
    /// Validate provider configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_model.trim().is_empty() {
            return Err(ValidationError::EmptyDefaultModel);
        }
        Ok(())
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            deepseek_api_key: None,
            qwen_api_key: None,
            openrouter_api_key: None,
            openrouter_referer: default_openrouter_referer(),
            default_model: default_model(),
        }
    }
}

fn default_openrouter_referer() -> String {
    "https://github.com/stanza-chat/stanza".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
