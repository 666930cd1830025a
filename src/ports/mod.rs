//! Ports: trait seams between the application core and the outside world.

mod chat_store;
mod model_provider;
mod usage_store;

pub use chat_store::{ChatStore, ConversationSummary, MessageWithModel, StoreError};
pub use model_provider::{
    CompletionRequest, ModelProvider, ModelReply, PromptMessage, ProviderError, ReplyBuffer,
    ReplyChunk, ReplyStream,
};
pub use usage_store::{UsageError, UsageStore};
