//! Vendor profiles for the OpenAI-compatible engine.
//!
//! Each constructor captures one vendor's base URL, credential, and quirks;
//! everything else lives in [`super::openai_compat`].

use super::openai_compat::{CompatConfig, OpenAiCompatProvider};

/// OpenAI (api.openai.com).
pub fn openai(api_key: Option<String>) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new(CompatConfig::new(
        "openai",
        "https://api.openai.com/v1",
        api_key,
    ))
}

/// DeepSeek (api.deepseek.com). `deepseek-reasoner` streams
/// `reasoning_content` deltas ahead of the answer.
pub fn deepseek(api_key: Option<String>) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new(CompatConfig::new(
        "deepseek",
        "https://api.deepseek.com/v1",
        api_key,
    ))
}

/// Qwen via DashScope's OpenAI-compatible mode.
pub fn qwen(api_key: Option<String>) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new(CompatConfig::new(
        "qwen",
        "https://dashscope.aliyuncs.com/compatible-mode/v1",
        api_key,
    ))
}

/// OpenRouter, which proxies arbitrary `vendor/model` strings. Used as the
/// registry fallback for model strings no other vendor claims.
pub fn openrouter(api_key: Option<String>, referer: impl Into<String>) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new(
        CompatConfig::new("openrouter", "https://openrouter.ai/api/v1", api_key)
            .with_header("HTTP-Referer", referer)
            .with_header("X-Title", "stanza"),
    )
}
