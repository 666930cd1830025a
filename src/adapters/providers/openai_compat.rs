//! OpenAI-compatible provider engine.
//!
//! OpenAI, DeepSeek, Qwen (DashScope compatible mode) and OpenRouter all
//! speak the same chat-completions dialect; this engine implements it once
//! and the vendor profiles in [`super::vendors`] supply base URL, key, and
//! quirks. DeepSeek and Qwen additionally stream `reasoning_content`
//! deltas, which map to [`ReplyChunk::Reasoning`].
//!
//! # Credentials
//!
//! A missing or placeholder API key does not fail the turn: the engine
//! returns a clearly-marked simulated reply instead, so development and
//! demo setups work without secrets.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::chat::Role;
use crate::ports::{
    CompletionRequest, ModelProvider, ModelReply, ProviderError, ReplyChunk, ReplyStream,
};

/// Configuration for one OpenAI-compatible vendor endpoint.
#[derive(Debug, Clone)]
pub struct CompatConfig {
    /// Short vendor name for logging and simulated replies.
    pub vendor: &'static str,
    /// API key; None or a placeholder enables simulated replies.
    api_key: Option<Secret<String>>,
    /// Base URL up to (not including) `/chat/completions`.
    pub base_url: String,
    /// Extra request headers (OpenRouter attribution headers).
    pub extra_headers: Vec<(&'static str, String)>,
    /// TCP connect timeout. There is deliberately no total-request
    /// timeout: a streaming turn may legitimately run for minutes, and a
    /// hung upstream hangs the turn (documented limitation).
    pub connect_timeout: Duration,
}

impl CompatConfig {
    /// Creates a config for a vendor endpoint.
    pub fn new(vendor: &'static str, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            vendor,
            api_key: api_key.map(Secret::new),
            base_url: base_url.into(),
            extra_headers: Vec::new(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Adds an extra header sent with every request.
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.extra_headers.push((name, value.into()));
        self
    }

    /// Returns the usable API key, treating placeholders as absent.
    fn usable_key(&self) -> Option<&str> {
        let key = self.api_key.as_ref()?.expose_secret().trim();
        if key.is_empty() || key.eq_ignore_ascii_case("changeme") || key.starts_with("your-") {
            return None;
        }
        Some(key)
    }
}

/// Provider adapter for any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiCompatProvider {
    config: CompatConfig,
    client: Client,
}

impl OpenAiCompatProvider {
    /// Creates a provider with the given configuration.
    pub fn new(config: CompatConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn to_wire_request(&self, request: &CompletionRequest, stream: bool) -> WireRequest {
        let messages = request
            .messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();

        WireRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: if stream { Some(true) } else { None },
        }
    }

    async fn send_request(
        &self,
        request: &CompletionRequest,
        api_key: &str,
        stream: bool,
    ) -> Result<Response, ProviderError> {
        let wire = self.to_wire_request(request, stream);

        let mut builder = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json");
        for (name, value) in &self.config.extra_headers {
            builder = builder.header(*name, value);
        }

        builder.json(&wire).send().await.map_err(|e| {
            if e.is_connect() {
                ProviderError::network(format!("Connection failed: {}", e))
            } else {
                ProviderError::network(e.to_string())
            }
        })
    }

    async fn handle_response_status(&self, response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::api(status.as_u16(), body))
    }

    /// Builds the simulated reply used when no usable API key exists.
    fn simulated_reply(&self, request: &CompletionRequest) -> ModelReply {
        let last = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no user message)");

        ModelReply::answer_only(format!(
            "[simulated {} reply] No API key is configured for this provider. \
             You said: {}",
            self.config.vendor, last
        ))
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<ModelReply, ProviderError> {
        request.warn_if_trailing_not_user(self.config.vendor);

        let Some(api_key) = self.config.usable_key().map(str::to_string) else {
            tracing::info!(vendor = self.config.vendor, "no API key, returning simulated reply");
            return Ok(self.simulated_reply(&request));
        };

        let response = self.send_request(&request, &api_key, false).await?;
        let response = self.handle_response_status(response).await?;

        let body: WireResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::parse(format!("Failed to parse response: {}", e)))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::parse("No choices in response"))?;

        let answer = choice.message.content.unwrap_or_default();
        Ok(match choice.message.reasoning_content {
            Some(reasoning) if !reasoning.is_empty() => {
                ModelReply::with_reasoning(reasoning, answer)
            }
            _ => ModelReply::answer_only(answer),
        })
    }

    async fn stream_complete(
        &self,
        request: CompletionRequest,
    ) -> Result<ReplyStream, ProviderError> {
        request.warn_if_trailing_not_user(self.config.vendor);

        let Some(api_key) = self.config.usable_key().map(str::to_string) else {
            tracing::info!(vendor = self.config.vendor, "no API key, streaming simulated reply");
            let reply = self.simulated_reply(&request);
            return Ok(simulated_stream(reply));
        };

        let response = self.send_request(&request, &api_key, true).await?;
        let response = self.handle_response_status(response).await?;

        // SSE lines (and multi-byte characters) can split across network
        // reads; carry the partial trailing bytes between chunks and
        // decode only complete lines.
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ProviderError::network(format!("Stream error: {}", e))))
            .scan(Vec::new(), |carry, chunk| {
                let out = match chunk {
                    Ok(bytes) => drain_lines(carry, &bytes)
                        .iter()
                        .flat_map(|line| parse_sse_line(line))
                        .collect(),
                    Err(e) => vec![Err(e)],
                };
                futures::future::ready(Some(out))
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        self.config.vendor
    }
}

/// Chops a simulated reply into a handful of chunks so the relay and
/// client exercise the same incremental path as a real stream.
fn simulated_stream(reply: ModelReply) -> ReplyStream {
    let words: Vec<String> = reply
        .answer
        .split_inclusive(' ')
        .map(str::to_string)
        .collect();
    Box::pin(stream::iter(
        words.into_iter().map(|w| Ok(ReplyChunk::Answer(w))),
    ))
}

/// Appends raw bytes to the carry and drains every complete line.
///
/// Decoding happens per line, after the newline boundary, so a UTF-8
/// sequence split across two reads is reassembled before decoding.
fn drain_lines(carry: &mut Vec<u8>, bytes: &[u8]) -> Vec<String> {
    carry.extend_from_slice(bytes);
    let mut lines = Vec::new();
    while let Some(pos) = carry.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = carry.drain(..=pos).collect();
        lines.push(String::from_utf8_lossy(&line).trim_end().to_string());
    }
    lines
}

/// Parses one SSE line into zero or more reply chunks.
fn parse_sse_line(line: &str) -> Vec<Result<ReplyChunk, ProviderError>> {
    let Some(data) = line.strip_prefix("data: ") else {
        return Vec::new();
    };

    if data == "[DONE]" {
        // End of stream; the byte stream closing is the real terminator.
        return Vec::new();
    }

    match serde_json::from_str::<WireStreamChunk>(data) {
        Ok(chunk) => {
            let mut out = Vec::new();
            if let Some(choice) = chunk.choices.first() {
                if let Some(ref reasoning) = choice.delta.reasoning_content {
                    if !reasoning.is_empty() {
                        out.push(Ok(ReplyChunk::Reasoning(reasoning.clone())));
                    }
                }
                if let Some(ref content) = choice.delta.content {
                    if !content.is_empty() {
                        out.push(Ok(ReplyChunk::Answer(content.clone())));
                    }
                }
            }
            out
        }
        Err(e) => {
            if data.trim().is_empty() {
                Vec::new()
            } else {
                vec![Err(ProviderError::parse(format!(
                    "Failed to parse SSE chunk: {}",
                    e
                )))]
            }
        }
    }
}

// ----- Wire types -----

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireReplyMessage,
}

#[derive(Debug, Deserialize)]
struct WireReplyMessage {
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireStreamChunk {
    choices: Vec<WireStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct WireStreamChoice {
    delta: WireDelta,
}

#[derive(Debug, Deserialize, Default)]
struct WireDelta {
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}
