//! Streaming turn handler.
//!
//! Orchestrates one chat turn: persist the user's message, call the
//! resolved model provider, forward its token stream as turn events, and
//! persist the assistant's reply before the terminal event goes out.
//!
//! A turn moves through RECEIVED, USER_PERSISTED, MODEL_INVOKED,
//! STREAMING, FINALIZING, then COMPLETE (or FAILED before streaming
//! starts). Once streaming has begun the turn never fails outright:
//! provider errors become visible stand-in text, and a persistence
//! failure during finalization closes the stream without the terminal
//! event rather than erroring it.
//!
//! The STREAMING and FINALIZING stages run on a detached task. Dropping
//! the event stream (a client disconnect) stops delivery only; the task
//! keeps draining the provider and persists the reply regardless.

use futures::stream::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::chat::{Conversation, Message, ModelDescriptor, Role};
use crate::domain::foundation::{ConversationId, ModelId, UserId};
use crate::ports::{
    ChatStore, CompletionRequest, ModelProvider, PromptMessage, ProviderError, ReplyBuffer,
    ReplyChunk, StoreError,
};
use crate::protocol::Completion;

/// Resolves a provider model string to its vendor adapter.
///
/// Implemented by the provider registry; the handler depends on this
/// seam so tests can script dispatch directly.
pub trait ProviderResolver: Send + Sync {
    /// Returns the adapter serving the given model string.
    fn resolve(&self, model_string: &str) -> Arc<dyn ModelProvider>;
}

/// Command to run one streaming chat turn.
#[derive(Debug, Clone)]
pub struct StreamTurnCommand {
    /// The user running the turn.
    pub user_id: UserId,
    /// Full prompt as the client sees it; the trailing user message is
    /// the one persisted.
    pub messages: Vec<PromptMessage>,
    /// Existing conversation, or None to create one.
    pub chat_id: Option<ConversationId>,
    /// Provider model string override; None uses the configured default.
    pub model: Option<String>,
    /// Client-side temporary id, echoed on the terminal event.
    pub temp_id: Option<String>,
}

/// Errors raised before streaming begins. Later failures degrade the
/// stream instead (see module docs).
#[derive(Debug, Clone, Error)]
pub enum StreamTurnError {
    #[error("message list is empty or has no user message")]
    NoUserMessage,

    #[error("conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for StreamTurnError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConversationNotFound(id) => Self::ConversationNotFound(id),
            StoreError::Database(msg) => Self::Store(msg),
        }
    }
}

/// One event produced by a running turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// An incremental reply fragment, in arrival order.
    Fragment(ReplyChunk),
    /// The terminal event; carries the persisted message record.
    Complete(Completion),
}

/// Boxed event stream of a running turn.
pub type TurnEventStream = Pin<Box<dyn futures::Stream<Item = TurnEvent> + Send>>;

/// A turn that passed validation and user-message persistence.
pub struct StartedTurn {
    /// The conversation the turn runs in.
    pub conversation_id: ConversationId,
    /// True when the handler created the conversation for this turn.
    pub created_conversation: bool,
    /// Event stream; poll to drive the turn.
    pub events: TurnEventStream,
}

impl std::fmt::Debug for StartedTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartedTurn")
            .field("conversation_id", &self.conversation_id)
            .field("created_conversation", &self.created_conversation)
            .field("events", &"<stream>")
            .finish()
    }
}

/// Configuration for the turn handler.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Model string used when the command names none.
    pub default_model: String,
    /// Temperature passed upstream.
    pub temperature: f32,
    /// Max tokens passed upstream.
    pub max_tokens: u32,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

/// Handler for streaming chat turns.
pub struct StreamTurnHandler {
    store: Arc<dyn ChatStore>,
    providers: Arc<dyn ProviderResolver>,
    config: TurnConfig,
}

impl StreamTurnHandler {
    /// Creates a new handler with default turn configuration.
    pub fn new(store: Arc<dyn ChatStore>, providers: Arc<dyn ProviderResolver>) -> Self {
        Self::with_config(store, providers, TurnConfig::default())
    }

    /// Creates a handler with custom turn configuration.
    pub fn with_config(
        store: Arc<dyn ChatStore>,
        providers: Arc<dyn ProviderResolver>,
        config: TurnConfig,
    ) -> Self {
        Self {
            store,
            providers,
            config,
        }
    }

    /// Validates and starts a turn.
    ///
    /// The user message is persisted before this returns. The rest of
    /// the turn runs on a spawned task; the returned stream observes it
    /// and may be dropped without cancelling it.
    pub async fn handle(&self, cmd: StreamTurnCommand) -> Result<StartedTurn, StreamTurnError> {
        // RECEIVED: the turn needs at least one user message to persist.
        let user_content = cmd
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .ok_or(StreamTurnError::NoUserMessage)?;

        let (conversation, created) = self.resolve_conversation(&cmd, &user_content).await?;
        let conversation_id = conversation.id;

        // USER_PERSISTED: a store failure here aborts the turn; nothing
        // has been sent to the model yet.
        let user_message = Message::user(conversation_id, user_content);
        self.store.append_message(&user_message).await?;

        // MODEL_INVOKED: resolve the model string and its adapter, then
        // a descriptor row best-effort; a lookup miss or store error must
        // not block the turn.
        let model_string = cmd
            .model
            .clone()
            .unwrap_or_else(|| self.config.default_model.clone());
        let provider = self.providers.resolve(&model_string);
        let descriptor = match self.store.find_model_by_string(&model_string).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(model = %model_string, error = %e, "model descriptor lookup failed");
                None
            }
        };

        let request = CompletionRequest::new(&model_string)
            .with_messages(cmd.messages.clone())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let events = run_stream(
            Arc::clone(&self.store),
            provider,
            request,
            conversation_id,
            descriptor,
            cmd.temp_id.clone(),
        );

        Ok(StartedTurn {
            conversation_id,
            created_conversation: created,
            events,
        })
    }

    async fn resolve_conversation(
        &self,
        cmd: &StreamTurnCommand,
        user_content: &str,
    ) -> Result<(Conversation, bool), StreamTurnError> {
        match cmd.chat_id {
            Some(id) => {
                let conversation = self
                    .store
                    .get_conversation(id)
                    .await?
                    .ok_or(StreamTurnError::ConversationNotFound(id))?;
                Ok((conversation, false))
            }
            None => {
                // Title comes from the first user message in the prompt.
                let first_user = cmd
                    .messages
                    .iter()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or(user_content);
                let conversation =
                    Conversation::from_first_message(cmd.user_id.clone(), first_user, None);
                self.store.create_conversation(&conversation).await?;
                Ok((conversation, true))
            }
        }
    }
}

/// STREAMING and FINALIZING, on a task that outlives the event stream.
///
/// The channel gives the subscriber backpressure while it listens and
/// detaches cleanly when it stops: once the receiver is dropped, sends
/// fail immediately and the task runs the rest of the turn on its own.
fn run_stream(
    store: Arc<dyn ChatStore>,
    provider: Arc<dyn ModelProvider>,
    request: CompletionRequest,
    conversation_id: ConversationId,
    descriptor: Option<ModelDescriptor>,
    temp_id: Option<String>,
) -> TurnEventStream {
    let (tx, mut rx) = tokio::sync::mpsc::channel(32);
    tokio::spawn(drive_turn(
        store,
        provider,
        request,
        conversation_id,
        descriptor,
        temp_id,
        tx,
    ));

    Box::pin(async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield event;
        }
    })
}

async fn drive_turn(
    store: Arc<dyn ChatStore>,
    provider: Arc<dyn ModelProvider>,
    request: CompletionRequest,
    conversation_id: ConversationId,
    descriptor: Option<ModelDescriptor>,
    temp_id: Option<String>,
    tx: tokio::sync::mpsc::Sender<TurnEvent>,
) {
    let mut buffer = ReplyBuffer::new();

    match provider.stream_complete(request).await {
        Ok(mut chunks) => {
            while let Some(item) = chunks.next().await {
                match item {
                    Ok(chunk) => {
                        buffer.push(&chunk);
                        // A closed receiver means the subscriber went
                        // away; keep draining so the turn still
                        // finalizes.
                        let _ = tx.send(TurnEvent::Fragment(chunk)).await;
                    }
                    Err(e) => {
                        // Never fail the turn: surface a stand-in and
                        // finalize with whatever arrived so far.
                        tracing::warn!(
                            provider = provider.name(),
                            error = %e,
                            "provider error mid-stream, substituting stand-in text"
                        );
                        let stand_in = stand_in_text(&e);
                        buffer.push_answer_text(&stand_in);
                        let _ = tx
                            .send(TurnEvent::Fragment(ReplyChunk::Answer(stand_in)))
                            .await;
                        break;
                    }
                }
            }
        }
        Err(e) => {
            tracing::warn!(
                provider = provider.name(),
                error = %e,
                "provider invocation failed, substituting stand-in text"
            );
            let stand_in = stand_in_text(&e);
            buffer.push_answer_text(&stand_in);
            let _ = tx
                .send(TurnEvent::Fragment(ReplyChunk::Answer(stand_in)))
                .await;
        }
    }

    // FINALIZING: the write happens here whether or not anyone is still
    // listening, and the terminal event goes out only after it commits.
    // The client must never see a message id that is not yet in the
    // store.
    let reply = buffer.into_reply();
    let model_id: Option<ModelId> = descriptor.map(|d| d.id);
    let assistant = Message::assistant(conversation_id, reply.answer.clone(), model_id);

    match store.append_message(&assistant).await {
        Ok(()) => {
            let _ = tx
                .send(TurnEvent::Complete(Completion {
                    id: assistant.id,
                    content: assistant.content,
                    reasoning: reply.reasoning,
                    role: Role::Assistant,
                    model_id,
                    created_at: assistant.created_at,
                    temp_id,
                }))
                .await;
        }
        Err(e) => {
            // Degraded close: the model output was already streamed, so
            // the stream ends without the terminal event and the client
            // keeps its placeholder un-reconciled.
            tracing::error!(
                conversation_id = %conversation_id,
                error = %e,
                "failed to persist assistant message, closing without terminal event"
            );
        }
    }
}

/// Text shown in place of a reply when the provider fails.
fn stand_in_text(error: &ProviderError) -> String {
    match error {
        ProviderError::Api { status, .. } => format!(
            "\n[The model could not complete this response (upstream status {}). Please try again.]",
            status
        ),
        ProviderError::Network(_) | ProviderError::Parse(_) => {
            "\n[The model could not complete this response. Please try again.]".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryChatStore;
    use crate::adapters::providers::MockProvider;
    use crate::domain::chat::Provider;

    struct SingleProvider(Arc<dyn ModelProvider>);

    impl ProviderResolver for SingleProvider {
        fn resolve(&self, _model_string: &str) -> Arc<dyn ModelProvider> {
            Arc::clone(&self.0)
        }
    }

    fn handler_with(
        store: Arc<InMemoryChatStore>,
        provider: MockProvider,
    ) -> StreamTurnHandler {
        let resolver = SingleProvider(Arc::new(provider));
        StreamTurnHandler::new(store, Arc::new(resolver))
    }

    fn command(content: &str) -> StreamTurnCommand {
        StreamTurnCommand {
            user_id: UserId::new("user-1").unwrap(),
            messages: vec![PromptMessage::user(content)],
            chat_id: None,
            model: None,
            temp_id: Some("tmp-1".to_string()),
        }
    }

    async fn collect(turn: StartedTurn) -> Vec<TurnEvent> {
        turn.events.collect().await
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_before_side_effects() {
        let store = Arc::new(InMemoryChatStore::new());
        let handler = handler_with(Arc::clone(&store), MockProvider::new());

        let mut cmd = command("hi");
        cmd.messages.clear();
        let err = handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, StreamTurnError::NoUserMessage));
    }

    #[tokio::test]
    async fn unknown_chat_id_is_rejected() {
        let store = Arc::new(InMemoryChatStore::new());
        let handler = handler_with(Arc::clone(&store), MockProvider::new());

        let mut cmd = command("hi");
        cmd.chat_id = Some(ConversationId::new());
        let err = handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, StreamTurnError::ConversationNotFound(_)));
    }

    #[tokio::test]
    async fn first_turn_creates_conversation_with_derived_title() {
        let store = Arc::new(InMemoryChatStore::new());
        let provider = MockProvider::new().with_chunks(vec![
            ReplyChunk::Answer("Hello".into()),
            ReplyChunk::Answer(" there".into()),
        ]);
        let handler = handler_with(Arc::clone(&store), provider);

        let turn = handler.handle(command("hi")).await.unwrap();
        assert!(turn.created_conversation);
        let conversation_id = turn.conversation_id;

        let conversation = store
            .get_conversation(conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.title, "hi");

        let events = collect(turn).await;
        // Two fragments plus the terminal event.
        assert_eq!(events.len(), 3);

        let messages = store.list_messages(conversation_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message.role, Role::User);
        assert_eq!(messages[0].message.content, "hi");
        assert_eq!(messages[1].message.role, Role::Assistant);
        assert_eq!(messages[1].message.content, "Hello there");
    }

    #[tokio::test]
    async fn terminal_event_carries_persisted_id_and_temp_id() {
        let store = Arc::new(InMemoryChatStore::new());
        let provider = MockProvider::new().with_reply("42");
        let handler = handler_with(Arc::clone(&store), provider);

        let turn = handler.handle(command("answer?")).await.unwrap();
        let conversation_id = turn.conversation_id;
        let events = collect(turn).await;

        let completion = match events.last() {
            Some(TurnEvent::Complete(c)) => c.clone(),
            other => panic!("expected terminal event, got {:?}", other),
        };
        assert_eq!(completion.temp_id.as_deref(), Some("tmp-1"));
        assert_eq!(completion.role, Role::Assistant);

        let messages = store.list_messages(conversation_id).await.unwrap();
        let persisted = &messages.last().unwrap().message;
        assert_eq!(persisted.id, completion.id);
        assert_eq!(persisted.content, completion.content);
    }

    #[tokio::test]
    async fn fragments_concatenate_to_persisted_content() {
        let store = Arc::new(InMemoryChatStore::new());
        let provider = MockProvider::new().with_chunks(vec![
            ReplyChunk::Answer("a".into()),
            ReplyChunk::Answer("b".into()),
            ReplyChunk::Answer("c".into()),
        ]);
        let handler = handler_with(Arc::clone(&store), provider);

        let turn = handler.handle(command("spell")).await.unwrap();
        let events = collect(turn).await;

        let mut streamed = String::new();
        let mut completion = None;
        for event in events {
            match event {
                TurnEvent::Fragment(ReplyChunk::Answer(s)) => streamed.push_str(&s),
                TurnEvent::Fragment(ReplyChunk::Reasoning(_)) => {}
                TurnEvent::Complete(c) => completion = Some(c),
            }
        }
        let completion = completion.expect("terminal event");
        assert_eq!(streamed, "abc");
        assert_eq!(completion.content, "abc");
    }

    #[tokio::test]
    async fn reasoning_chunks_ride_separately_and_are_not_persisted() {
        let store = Arc::new(InMemoryChatStore::new());
        let provider = MockProvider::new().with_chunks(vec![
            ReplyChunk::Reasoning("thinking".into()),
            ReplyChunk::Answer("done".into()),
        ]);
        let handler = handler_with(Arc::clone(&store), provider);

        let turn = handler.handle(command("q")).await.unwrap();
        let conversation_id = turn.conversation_id;
        let events = collect(turn).await;

        let completion = match events.last() {
            Some(TurnEvent::Complete(c)) => c.clone(),
            other => panic!("expected terminal event, got {:?}", other),
        };
        assert_eq!(completion.content, "done");
        assert_eq!(completion.reasoning.as_deref(), Some("thinking"));

        let messages = store.list_messages(conversation_id).await.unwrap();
        assert_eq!(messages.last().unwrap().message.content, "done");
    }

    #[tokio::test]
    async fn provider_failure_becomes_stand_in_reply_not_error() {
        let store = Arc::new(InMemoryChatStore::new());
        let provider = MockProvider::new().with_error(ProviderError::api(503, "overloaded"));
        let handler = handler_with(Arc::clone(&store), provider);

        let turn = handler.handle(command("hi")).await.unwrap();
        let conversation_id = turn.conversation_id;
        let events = collect(turn).await;

        let completion = match events.last() {
            Some(TurnEvent::Complete(c)) => c.clone(),
            other => panic!("expected terminal event, got {:?}", other),
        };
        assert!(completion.content.contains("could not complete"));

        // The stand-in is persisted like any reply.
        let messages = store.list_messages(conversation_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].message.content.contains("could not complete"));
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_partial_output() {
        let store = Arc::new(InMemoryChatStore::new());
        let provider = MockProvider::new().with_chunks_then_error(
            vec![ReplyChunk::Answer("partial".into())],
            ProviderError::network("reset"),
        );
        let handler = handler_with(Arc::clone(&store), provider);

        let turn = handler.handle(command("hi")).await.unwrap();
        let events = collect(turn).await;

        let completion = match events.last() {
            Some(TurnEvent::Complete(c)) => c.clone(),
            other => panic!("expected terminal event, got {:?}", other),
        };
        assert!(completion.content.starts_with("partial"));
        assert!(completion.content.contains("could not complete"));
    }

    #[tokio::test]
    async fn second_turn_reuses_conversation() {
        let store = Arc::new(InMemoryChatStore::new());
        let provider = MockProvider::new().with_reply("one").with_reply("two");
        let handler = handler_with(Arc::clone(&store), provider);

        let first = handler.handle(command("first")).await.unwrap();
        let conversation_id = first.conversation_id;
        collect(first).await;

        let mut cmd = command("second");
        cmd.chat_id = Some(conversation_id);
        let second = handler.handle(cmd).await.unwrap();
        assert!(!second.created_conversation);
        assert_eq!(second.conversation_id, conversation_id);
        collect(second).await;

        let messages = store.list_messages(conversation_id).await.unwrap();
        assert_eq!(messages.len(), 4);
    }

    #[tokio::test]
    async fn dropped_event_stream_does_not_cancel_the_turn() {
        let store = Arc::new(InMemoryChatStore::new());
        let chunks: Vec<ReplyChunk> = (0..8)
            .map(|i| ReplyChunk::Answer(format!("w{} ", i)))
            .collect();
        let provider = MockProvider::new().with_chunks(chunks);
        let handler = handler_with(Arc::clone(&store), provider);

        let mut turn = handler.handle(command("hi")).await.unwrap();
        let conversation_id = turn.conversation_id;

        // Read one fragment, then drop the stream mid-turn.
        let first = turn.events.next().await;
        assert!(matches!(first, Some(TurnEvent::Fragment(_))));
        drop(turn);

        // The detached task still persists the assistant reply.
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);
        loop {
            let messages = store.list_messages(conversation_id).await.unwrap();
            if messages.len() == 2 {
                assert_eq!(messages[1].message.content, "w0 w1 w2 w3 w4 w5 w6 w7 ");
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "assistant reply was not persisted after disconnect"
            );
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn resolved_descriptor_id_is_attributed_to_the_reply() {
        let store = Arc::new(InMemoryChatStore::new());
        let descriptor = ModelDescriptor::new("GPT-4o mini", Provider::OpenAi, "gpt-4o-mini");
        store.add_model(&descriptor).await.unwrap();
        let provider = MockProvider::new().with_reply("ok");
        let handler = handler_with(Arc::clone(&store), provider);

        let turn = handler.handle(command("hi")).await.unwrap();
        let events = collect(turn).await;

        let completion = match events.last() {
            Some(TurnEvent::Complete(c)) => c.clone(),
            other => panic!("expected terminal event, got {:?}", other),
        };
        assert_eq!(completion.model_id, Some(descriptor.id));
    }
}
