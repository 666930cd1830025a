//! Model provider adapters and the dispatch registry.

pub mod mock;
pub mod openai_compat;
pub mod vendors;

pub use mock::{MockBehavior, MockProvider};
pub use openai_compat::{CompatConfig, OpenAiCompatProvider};

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ProvidersConfig;
use crate::ports::ModelProvider;

/// Maps provider model strings to adapters by exact lookup.
///
/// Replaces dispatch-by-substring with a registered mapping: each known
/// model string is registered against its vendor adapter, and unknown
/// strings resolve to a documented fallback (OpenRouter, which proxies
/// arbitrary `vendor/model` strings).
pub struct ProviderRegistry {
    by_model: HashMap<String, Arc<dyn ModelProvider>>,
    fallback: Arc<dyn ModelProvider>,
}

impl ProviderRegistry {
    /// Creates a registry with the given fallback adapter.
    pub fn new(fallback: Arc<dyn ModelProvider>) -> Self {
        Self {
            by_model: HashMap::new(),
            fallback,
        }
    }

    /// Registers an adapter for a model string.
    pub fn register(mut self, model_string: impl Into<String>, provider: Arc<dyn ModelProvider>) -> Self {
        self.by_model.insert(model_string.into(), provider);
        self
    }

    /// Resolves the adapter for a model string.
    ///
    /// Exact lookup; unknown strings fall back rather than fail so a stale
    /// descriptor row can never break a turn.
    pub fn resolve(&self, model_string: &str) -> Arc<dyn ModelProvider> {
        match self.by_model.get(model_string) {
            Some(provider) => Arc::clone(provider),
            None => {
                tracing::debug!(
                    model = model_string,
                    fallback = self.fallback.name(),
                    "model string not registered, using fallback provider"
                );
                Arc::clone(&self.fallback)
            }
        }
    }

    /// Builds the standard four-vendor registry from configuration.
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let openai: Arc<dyn ModelProvider> = Arc::new(vendors::openai(config.openai_api_key.clone()));
        let deepseek: Arc<dyn ModelProvider> =
            Arc::new(vendors::deepseek(config.deepseek_api_key.clone()));
        let qwen: Arc<dyn ModelProvider> = Arc::new(vendors::qwen(config.qwen_api_key.clone()));
        let openrouter: Arc<dyn ModelProvider> = Arc::new(vendors::openrouter(
            config.openrouter_api_key.clone(),
            config.openrouter_referer.clone(),
        ));

        let mut registry = Self::new(openrouter);
        for model in ["gpt-4o", "gpt-4o-mini", "gpt-4.1", "gpt-4.1-mini"] {
            registry = registry.register(model, Arc::clone(&openai));
        }
        for model in ["deepseek-chat", "deepseek-reasoner"] {
            registry = registry.register(model, Arc::clone(&deepseek));
        }
        for model in ["qwen-plus", "qwen-max", "qwen-turbo"] {
            registry = registry.register(model, Arc::clone(&qwen));
        }
        registry
    }
}

impl crate::application::ProviderResolver for ProviderRegistry {
    fn resolve(&self, model_string: &str) -> Arc<dyn ModelProvider> {
        ProviderRegistry::resolve(self, model_string)
    }
}
