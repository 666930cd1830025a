//! Mock model provider for testing.
//!
//! Scripts replies, chunk sequences, and errors so tests can drive the
//! relay without calling real vendor APIs.
//!
//! # Example
//!
//! ```ignore
//! let provider = MockProvider::new()
//!     .with_chunks(vec![
//!         ReplyChunk::Answer("Hel".into()),
//!         ReplyChunk::Answer("lo".into()),
//!     ]);
//!
//! let mut stream = provider.stream_complete(request).await?;
//! ```

use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::ports::{
    CompletionRequest, ModelProvider, ModelReply, ProviderError, ReplyBuffer, ReplyChunk,
    ReplyStream,
};

/// One scripted behavior, consumed in FIFO order per call.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Succeed with the given chunk sequence (streaming) or its
    /// concatenation (non-streaming).
    Chunks(Vec<ReplyChunk>),
    /// Fail the call outright.
    Error(ProviderError),
    /// Stream the chunks, then yield an error mid-stream.
    ChunksThenError(Vec<ReplyChunk>, ProviderError),
}

/// Scripted mock implementation of [`ModelProvider`].
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    behaviors: Arc<Mutex<VecDeque<MockBehavior>>>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    /// Creates a mock with no scripted behaviors.
    ///
    /// An unscripted call succeeds with a fixed canned reply.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a plain text reply.
    pub fn with_reply(self, answer: impl Into<String>) -> Self {
        self.with_behavior(MockBehavior::Chunks(vec![ReplyChunk::Answer(answer.into())]))
    }

    /// Scripts a chunk sequence.
    pub fn with_chunks(self, chunks: Vec<ReplyChunk>) -> Self {
        self.with_behavior(MockBehavior::Chunks(chunks))
    }

    /// Scripts an immediate error.
    pub fn with_error(self, error: ProviderError) -> Self {
        self.with_behavior(MockBehavior::Error(error))
    }

    /// Scripts chunks followed by a mid-stream error.
    pub fn with_chunks_then_error(self, chunks: Vec<ReplyChunk>, error: ProviderError) -> Self {
        self.with_behavior(MockBehavior::ChunksThenError(chunks, error))
    }

    /// Appends a behavior to the script.
    pub fn with_behavior(self, behavior: MockBehavior) -> Self {
        self.behaviors.lock().unwrap().push_back(behavior);
        self
    }

    /// Requests received so far, for verification.
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_behavior(&self) -> MockBehavior {
        self.behaviors
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                MockBehavior::Chunks(vec![ReplyChunk::Answer("mock reply".to_string())])
            })
    }

    fn record(&self, request: &CompletionRequest) {
        self.calls.lock().unwrap().push(request.clone());
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<ModelReply, ProviderError> {
        self.record(&request);
        match self.next_behavior() {
            MockBehavior::Chunks(chunks) => {
                let mut buf = ReplyBuffer::new();
                for chunk in &chunks {
                    buf.push(chunk);
                }
                Ok(buf.into_reply())
            }
            MockBehavior::Error(err) | MockBehavior::ChunksThenError(_, err) => Err(err),
        }
    }

    async fn stream_complete(
        &self,
        request: CompletionRequest,
    ) -> Result<ReplyStream, ProviderError> {
        self.record(&request);
        match self.next_behavior() {
            MockBehavior::Chunks(chunks) => {
                Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
            }
            MockBehavior::Error(err) => Err(err),
            MockBehavior::ChunksThenError(chunks, err) => {
                let items: Vec<Result<ReplyChunk, ProviderError>> =
                    chunks.into_iter().map(Ok).chain([Err(err)]).collect();
                Ok(Box::pin(stream::iter(items)))
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
