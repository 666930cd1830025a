//! Wire framing for the chat stream.
//!
//! The relay speaks a minimal newline-delimited framing over SSE, not the
//! vendors' native streaming protocols:
//!
//! - ordinary events carry one text fragment as `0:"<json-escaped>"`
//!   (answer) or `1:"<json-escaped>"` (reasoning);
//! - the terminal event is named `message_complete` and carries a JSON
//!   object with the server-assigned message id and the echoed client
//!   temp id.
//!
//! Both the server relay and the client consumer use this module, so the
//! two sides cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::domain::chat::Role;
use crate::domain::foundation::{MessageId, ModelId, Timestamp};
use crate::ports::ReplyChunk;

/// Event name of the terminal frame.
pub const COMPLETE_EVENT: &str = "message_complete";

/// Prefix for answer fragments.
const ANSWER_PREFIX: &str = "0:";
/// Prefix for reasoning fragments.
const REASONING_PREFIX: &str = "1:";

/// Payload of the terminal `message_complete` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    /// Server-assigned message id (the permanent database id).
    pub id: MessageId,
    /// Final persisted content.
    pub content: String,
    /// Reasoning text, when the model produced one. Not persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Always `assistant` in practice.
    pub role: Role,
    /// Model descriptor id, when the lookup resolved one.
    pub model_id: Option<ModelId>,
    /// Message creation timestamp.
    pub created_at: Timestamp,
    /// Echo of the client-supplied temporary id, for reconciliation.
    /// Absent when the request carried none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<String>,
}

/// A parsed frame, as seen by the client consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// One answer fragment, in arrival order.
    Answer(String),
    /// One reasoning fragment, in arrival order.
    Reasoning(String),
    /// Terminal event; the stream closes after it.
    Complete(Completion),
}

/// Encodes one reply chunk as an SSE data payload.
pub fn encode_fragment(chunk: &ReplyChunk) -> String {
    let (prefix, text) = match chunk {
        ReplyChunk::Answer(s) => (ANSWER_PREFIX, s),
        ReplyChunk::Reasoning(s) => (REASONING_PREFIX, s),
    };
    // serde_json string rendering gives exactly the escaping the frame
    // grammar requires.
    format!(
        "{}{}",
        prefix,
        serde_json::to_string(text).expect("string serialization cannot fail")
    )
}

/// Encodes the terminal completion payload.
pub fn encode_completion(completion: &Completion) -> Result<String, serde_json::Error> {
    serde_json::to_string(completion)
}

/// Decodes one SSE data payload given the surrounding event name.
///
/// Returns `None` for payloads that are neither a fragment nor a
/// completion (unknown frames are skipped, not fatal).
pub fn decode_data(event: Option<&str>, data: &str) -> Option<Frame> {
    if event == Some(COMPLETE_EVENT) {
        return serde_json::from_str(data).ok().map(Frame::Complete);
    }
    if let Some(quoted) = data.strip_prefix(ANSWER_PREFIX) {
        return serde_json::from_str::<String>(quoted).ok().map(Frame::Answer);
    }
    if let Some(quoted) = data.strip_prefix(REASONING_PREFIX) {
        return serde_json::from_str::<String>(quoted)
            .ok()
            .map(Frame::Reasoning);
    }
    None
}

/// Incremental parser over raw SSE text lines.
///
/// Feed lines one at a time (without trailing newlines); completed frames
/// come back as events close on their blank-line separator.
#[derive(Debug, Default)]
pub struct FrameParser {
    event_name: Option<String>,
    data: Option<String>,
}

impl FrameParser {
    /// Creates an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one SSE line; returns a frame when an event completes.
    pub fn feed_line(&mut self, line: &str) -> Option<Frame> {
        if line.is_empty() {
            // Event boundary.
            let event_name = self.event_name.take();
            let data = self.data.take()?;
            return decode_data(event_name.as_deref(), &data);
        }
        if let Some(name) = line.strip_prefix("event: ") {
            self.event_name = Some(name.to_string());
        } else if let Some(payload) = line.strip_prefix("data: ") {
            // Multi-line data fields concatenate per the SSE spec.
            match &mut self.data {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(payload);
                }
                None => self.data = Some(payload.to_string()),
            }
        }
        // Comment and unknown fields are ignored.
        None
    }
}
