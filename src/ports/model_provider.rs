//! Model Provider Port - interface for upstream LLM vendor integrations.
//!
//! This port abstracts all interactions with model vendors (OpenAI,
//! DeepSeek, Qwen, OpenRouter), so the stream relay can run a turn without
//! coupling to a specific HTTP dialect.
//!
//! # Design
//!
//! - Supports both one-shot and streaming completions
//! - Vendor-agnostic message format
//! - Replies carry `reasoning` and `answer` as separate structured fields;
//!   stream chunks are tagged accordingly. There is no in-band text marker
//!   between the two regions.
//! - Errors are tagged results. Adapters never convert a failure into
//!   response text themselves; the relay owns the never-fail-the-turn
//!   policy and decides what the user sees.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::chat::Role;

/// Boxed stream of reply chunks from a provider.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<ReplyChunk, ProviderError>> + Send>>;

/// Port for upstream model vendor interactions.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Generate a single complete reply (non-streaming).
    async fn complete(&self, request: CompletionRequest) -> Result<ModelReply, ProviderError>;

    /// Generate a streaming reply.
    ///
    /// The stream ends after the final chunk; there is no explicit
    /// terminator chunk.
    async fn stream_complete(&self, request: CompletionRequest)
        -> Result<ReplyStream, ProviderError>;

    /// Short vendor name for logging (e.g. "openai", "deepseek").
    fn name(&self) -> &str;
}

/// A message in the prompt sent upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    /// Who sent this message.
    pub role: Role,
    /// Message content.
    pub content: String,
}

impl PromptMessage {
    /// Creates a new prompt message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Request for a model completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Ordered prompt messages; must be non-empty.
    pub messages: Vec<PromptMessage>,
    /// Provider-specific model string.
    pub model: String,
    /// Temperature for response randomness.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Creates a request for the given model string.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Adds a message to the prompt.
    pub fn with_message(mut self, role: Role, content: impl Into<String>) -> Self {
        self.messages.push(PromptMessage::new(role, content));
        self
    }

    /// Replaces the full message list.
    pub fn with_messages(mut self, messages: Vec<PromptMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Sets the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Logs a warning if the trailing message is not from the user.
    ///
    /// Some vendors tolerate assistant-trailing prompts, so this is
    /// permissive: a warning, not an error. Adapters call it once per
    /// request.
    pub fn warn_if_trailing_not_user(&self, provider: &str) {
        match self.messages.last() {
            Some(last) if last.role != Role::User => {
                tracing::warn!(
                    provider,
                    trailing_role = last.role.as_str(),
                    "trailing prompt message is not user-role"
                );
            }
            None => {
                tracing::warn!(provider, "prompt message list is empty");
            }
            _ => {}
        }
    }
}

/// A complete reply from a model.
///
/// `reasoning` and `answer` are distinct fields; consumers render them
/// independently without scanning the text for markers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelReply {
    /// The answer text.
    pub answer: String,
    /// Auxiliary reasoning text, when the vendor surfaces one.
    pub reasoning: Option<String>,
}

impl ModelReply {
    /// Creates a reply with answer text only.
    pub fn answer_only(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            reasoning: None,
        }
    }

    /// Creates a reply with both reasoning and answer segments.
    pub fn with_reasoning(reasoning: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            reasoning: Some(reasoning.into()),
        }
    }
}

/// One incremental fragment of a streaming reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyChunk {
    /// A fragment of the answer text.
    Answer(String),
    /// A fragment of the auxiliary reasoning text.
    Reasoning(String),
}

impl ReplyChunk {
    /// Returns the fragment text regardless of segment.
    pub fn text(&self) -> &str {
        match self {
            ReplyChunk::Answer(s) | ReplyChunk::Reasoning(s) => s,
        }
    }
}

/// Accumulates stream chunks into a [`ModelReply`].
///
/// Chunks must be pushed in arrival order; the buffer concatenates each
/// segment without reordering.
#[derive(Debug, Default)]
pub struct ReplyBuffer {
    answer: String,
    reasoning: String,
}

impl ReplyBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one chunk.
    pub fn push(&mut self, chunk: &ReplyChunk) {
        match chunk {
            ReplyChunk::Answer(s) => self.answer.push_str(s),
            ReplyChunk::Reasoning(s) => self.reasoning.push_str(s),
        }
    }

    /// Appends stand-in answer text directly (used by the relay when a
    /// provider fails mid-turn).
    pub fn push_answer_text(&mut self, text: &str) {
        self.answer.push_str(text);
    }

    /// Current answer text so far.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Consumes the buffer into a reply.
    pub fn into_reply(self) -> ModelReply {
        ModelReply {
            answer: self.answer,
            reasoning: if self.reasoning.is_empty() {
                None
            } else {
                Some(self.reasoning)
            },
        }
    }
}

/// Model provider errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Network failure reaching the vendor.
    #[error("network error: {0}")]
    Network(String),

    /// Vendor returned a non-success status.
    #[error("upstream status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error body or reason text.
        message: String,
    },

    /// Vendor response body was missing expected fields.
    #[error("parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates an API status error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_request_builder_works() {
        let request = CompletionRequest::new("gpt-4o")
            .with_message(Role::System, "Be helpful")
            .with_message(Role::User, "Hello")
            .with_temperature(0.7)
            .with_max_tokens(256);

        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(256));
    }

    #[test]
    fn prompt_message_constructors_work() {
        assert_eq!(PromptMessage::system("s").role, Role::System);
        assert_eq!(PromptMessage::user("u").role, Role::User);
        assert_eq!(PromptMessage::assistant("a").role, Role::Assistant);
    }

    #[test]
    fn reply_buffer_separates_segments() {
        let mut buf = ReplyBuffer::new();
        buf.push(&ReplyChunk::Reasoning("think ".into()));
        buf.push(&ReplyChunk::Answer("Hello".into()));
        buf.push(&ReplyChunk::Reasoning("more".into()));
        buf.push(&ReplyChunk::Answer(", world".into()));

        let reply = buf.into_reply();
        assert_eq!(reply.answer, "Hello, world");
        assert_eq!(reply.reasoning.as_deref(), Some("think more"));
    }

    #[test]
    fn reply_buffer_without_reasoning_yields_none() {
        let mut buf = ReplyBuffer::new();
        buf.push(&ReplyChunk::Answer("hi".into()));
        let reply = buf.into_reply();
        assert_eq!(reply.answer, "hi");
        assert!(reply.reasoning.is_none());
    }

    #[test]
    fn reply_constructors_work() {
        let plain = ModelReply::answer_only("42");
        assert!(plain.reasoning.is_none());

        let dual = ModelReply::with_reasoning("chain", "42");
        assert_eq!(dual.reasoning.as_deref(), Some("chain"));
        assert_eq!(dual.answer, "42");
    }

    #[test]
    fn provider_errors_display() {
        assert_eq!(
            ProviderError::network("refused").to_string(),
            "network error: refused"
        );
        assert_eq!(
            ProviderError::api(503, "overloaded").to_string(),
            "upstream status 503: overloaded"
        );
        assert!(ProviderError::parse("no choices")
            .to_string()
            .contains("no choices"));
    }
}
