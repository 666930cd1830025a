//! Transcript-holding consumer for the chat stream.
//!
//! At turn start the consumer inserts a placeholder assistant message
//! with a caller-supplied temporary id and empty content. Fragments are
//! applied strictly in arrival order; reordering or batching them would
//! garble the text. On the terminal event the placeholder matched by the
//! echoed temp id is swapped for the authoritative server record; if the
//! echo is absent or matches nothing, the placeholder is kept as-is.

use futures::stream::{AbortRegistration, Abortable, Stream, StreamExt};

use crate::domain::chat::Role;
use crate::domain::foundation::MessageId;
use crate::protocol::{Frame, FrameParser};

/// Identity of a transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessageId {
    /// Client-assigned placeholder id; not yet persisted server-side.
    Temp(String),
    /// Server-assigned permanent id.
    Persisted(MessageId),
}

/// One entry in the client transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientMessage {
    /// Temp or persisted identity.
    pub id: ClientMessageId,
    /// Who authored the entry.
    pub role: Role,
    /// Accumulated answer text.
    pub content: String,
    /// Accumulated reasoning text, if any arrived.
    pub reasoning: Option<String>,
}

/// How a consumed turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Terminal event arrived; the placeholder was reconciled.
    Completed,
    /// The caller aborted the read loop. The server keeps running and
    /// persists regardless; the placeholder stays temporary.
    Aborted,
    /// The stream closed without a terminal event (degraded finalize
    /// server-side); the placeholder stays temporary.
    Ended,
}

/// Ordered transcript plus in-flight turn state.
#[derive(Debug, Default)]
pub struct TurnConsumer {
    transcript: Vec<ClientMessage>,
    active: Option<usize>,
}

impl TurnConsumer {
    /// Creates a consumer with an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current transcript, in order.
    pub fn transcript(&self) -> &[ClientMessage] {
        &self.transcript
    }

    /// Appends the user's own message to the transcript.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.transcript.push(ClientMessage {
            id: ClientMessageId::Temp(format!("user-{}", self.transcript.len())),
            role: Role::User,
            content: content.into(),
            reasoning: None,
        });
    }

    /// Starts a turn: inserts the empty assistant placeholder carrying
    /// the temp id that will be sent with the request.
    pub fn begin_turn(&mut self, temp_id: impl Into<String>) {
        self.transcript.push(ClientMessage {
            id: ClientMessageId::Temp(temp_id.into()),
            role: Role::Assistant,
            content: String::new(),
            reasoning: None,
        });
        self.active = Some(self.transcript.len() - 1);
    }

    /// Applies one parsed frame. Returns true on the terminal frame.
    pub fn apply(&mut self, frame: Frame) -> bool {
        match frame {
            Frame::Answer(text) => {
                if let Some(entry) = self.active_entry() {
                    entry.content.push_str(&text);
                }
                false
            }
            Frame::Reasoning(text) => {
                if let Some(entry) = self.active_entry() {
                    entry.reasoning.get_or_insert_with(String::new).push_str(&text);
                }
                false
            }
            Frame::Complete(completion) => {
                let matched = completion.temp_id.as_ref().and_then(|temp_id| {
                    self.transcript
                        .iter()
                        .position(|m| m.id == ClientMessageId::Temp(temp_id.clone()))
                });
                match matched {
                    Some(index) => {
                        self.transcript[index] = ClientMessage {
                            id: ClientMessageId::Persisted(completion.id),
                            role: completion.role,
                            content: completion.content,
                            reasoning: completion.reasoning,
                        };
                    }
                    None => {
                        // No echo or unknown temp id: keep the placeholder
                        // with its streamed content.
                        tracing::debug!("completion temp id matched no placeholder");
                    }
                }
                self.active = None;
                true
            }
        }
    }

    /// Reads raw SSE lines (without trailing newlines) until the turn
    /// completes, the stream ends, or the abort registration fires.
    pub async fn consume<S>(
        &mut self,
        lines: S,
        abort: AbortRegistration,
    ) -> TurnOutcome
    where
        S: Stream<Item = String>,
    {
        let mut lines = Box::pin(Abortable::new(lines, abort));
        let mut parser = FrameParser::new();

        while let Some(line) = lines.next().await {
            if let Some(frame) = parser.feed_line(&line) {
                if self.apply(frame) {
                    return TurnOutcome::Completed;
                }
            }
        }

        if lines.is_aborted() {
            TurnOutcome::Aborted
        } else {
            TurnOutcome::Ended
        }
    }

    fn active_entry(&mut self) -> Option<&mut ClientMessage> {
        self.active.map(|i| &mut self.transcript[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_completion, encode_fragment, Completion, COMPLETE_EVENT};
    use crate::domain::foundation::Timestamp;
    use crate::ports::ReplyChunk;
    use futures::stream::{self, AbortHandle};

    fn completion(temp_id: Option<&str>, content: &str) -> Completion {
        Completion {
            id: MessageId::new(),
            content: content.to_string(),
            reasoning: None,
            role: Role::Assistant,
            model_id: None,
            created_at: Timestamp::now(),
            temp_id: temp_id.map(str::to_string),
        }
    }

    fn sse_lines(frames: &[(Option<&str>, String)]) -> Vec<String> {
        let mut lines = Vec::new();
        for (event, data) in frames {
            if let Some(event) = event {
                lines.push(format!("event: {}", event));
            }
            lines.push(format!("data: {}", data));
            lines.push(String::new());
        }
        lines
    }

    #[test]
    fn fragments_append_in_order() {
        let mut consumer = TurnConsumer::new();
        consumer.push_user("hi");
        consumer.begin_turn("tmp-1");

        consumer.apply(Frame::Answer("Hel".into()));
        consumer.apply(Frame::Answer("lo".into()));
        consumer.apply(Frame::Reasoning("think".into()));

        let entry = consumer.transcript().last().unwrap();
        assert_eq!(entry.content, "Hello");
        assert_eq!(entry.reasoning.as_deref(), Some("think"));
        assert_eq!(entry.id, ClientMessageId::Temp("tmp-1".into()));
    }

    #[test]
    fn completion_swaps_placeholder_for_server_record() {
        let mut consumer = TurnConsumer::new();
        consumer.begin_turn("tmp-1");
        consumer.apply(Frame::Answer("partial".into()));

        let completion = completion(Some("tmp-1"), "final text");
        let done = consumer.apply(Frame::Complete(completion.clone()));
        assert!(done);

        let entry = consumer.transcript().last().unwrap();
        assert_eq!(entry.id, ClientMessageId::Persisted(completion.id));
        assert_eq!(entry.content, "final text");
    }

    #[test]
    fn mismatched_temp_id_keeps_placeholder_silently() {
        let mut consumer = TurnConsumer::new();
        consumer.begin_turn("tmp-1");
        consumer.apply(Frame::Answer("streamed".into()));

        consumer.apply(Frame::Complete(completion(Some("other"), "ignored")));

        let entry = consumer.transcript().last().unwrap();
        assert_eq!(entry.id, ClientMessageId::Temp("tmp-1".into()));
        assert_eq!(entry.content, "streamed");
    }

    #[test]
    fn absent_temp_id_keeps_placeholder() {
        let mut consumer = TurnConsumer::new();
        consumer.begin_turn("tmp-1");
        consumer.apply(Frame::Complete(completion(None, "ignored")));

        let entry = consumer.transcript().last().unwrap();
        assert_eq!(entry.id, ClientMessageId::Temp("tmp-1".into()));
    }

    #[tokio::test]
    async fn consume_parses_sse_lines_to_completion() {
        let completion = completion(Some("tmp-1"), "Hello, world");
        let lines = sse_lines(&[
            (None, encode_fragment(&ReplyChunk::Answer("Hello".into()))),
            (None, encode_fragment(&ReplyChunk::Answer(", world".into()))),
            (
                Some(COMPLETE_EVENT),
                encode_completion(&completion).unwrap(),
            ),
        ]);

        let mut consumer = TurnConsumer::new();
        consumer.begin_turn("tmp-1");
        let (_handle, registration) = AbortHandle::new_pair();
        let outcome = consumer
            .consume(stream::iter(lines), registration)
            .await;

        assert_eq!(outcome, TurnOutcome::Completed);
        let entry = consumer.transcript().last().unwrap();
        assert_eq!(entry.id, ClientMessageId::Persisted(completion.id));
        assert_eq!(entry.content, "Hello, world");
    }

    #[tokio::test]
    async fn stream_end_without_terminal_is_degraded_not_fatal() {
        let lines = sse_lines(&[(None, encode_fragment(&ReplyChunk::Answer("part".into())))]);

        let mut consumer = TurnConsumer::new();
        consumer.begin_turn("tmp-1");
        let (_handle, registration) = AbortHandle::new_pair();
        let outcome = consumer
            .consume(stream::iter(lines), registration)
            .await;

        assert_eq!(outcome, TurnOutcome::Ended);
        let entry = consumer.transcript().last().unwrap();
        assert_eq!(entry.id, ClientMessageId::Temp("tmp-1".into()));
        assert_eq!(entry.content, "part");
    }

    #[tokio::test]
    async fn abort_stops_the_read_loop() {
        let (handle, registration) = AbortHandle::new_pair();
        handle.abort();

        let mut consumer = TurnConsumer::new();
        consumer.begin_turn("tmp-1");
        let outcome = consumer
            .consume(stream::pending::<String>(), registration)
            .await;

        assert_eq!(outcome, TurnOutcome::Aborted);
    }
}
