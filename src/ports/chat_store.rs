//! Chat Store Port - persistence interface for conversations, messages,
//! and model descriptors.
//!
//! The relay depends on this port only for create/read/update of rows; any
//! store with transactional writes and foreign-key cascade delete can
//! implement it.

use async_trait::async_trait;

use crate::domain::chat::{Conversation, Message, ModelDescriptor};
use crate::domain::foundation::{ConversationId, UserId};

/// A conversation paired with its most recent message for list previews.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSummary {
    /// The conversation row.
    pub conversation: Conversation,
    /// Most recent message, if any messages exist.
    pub preview: Option<Message>,
}

/// A message paired with the descriptor of the model that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageWithModel {
    /// The message row.
    pub message: Message,
    /// Descriptor resolved from `message.model_id`; None for user/system
    /// messages or when the descriptor row is gone.
    pub model: Option<ModelDescriptor>,
}

/// Persistence port for the chat domain.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Inserts a new conversation row.
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StoreError>;

    /// Fetches a conversation by id, including soft-deleted ones.
    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, StoreError>;

    /// Lists a user's conversations ordered by `updated_at` descending,
    /// each with its latest message as a preview.
    ///
    /// Soft-deleted conversations are excluded unless `include_deleted`.
    async fn list_conversations(
        &self,
        user_id: &UserId,
        include_deleted: bool,
    ) -> Result<Vec<ConversationSummary>, StoreError>;

    /// Marks a conversation soft-deleted.
    async fn soft_delete_conversation(&self, id: ConversationId) -> Result<(), StoreError>;

    /// Permanently removes a conversation and, by cascade, its messages.
    async fn hard_delete_conversation(&self, id: ConversationId) -> Result<(), StoreError>;

    /// Clears a soft delete.
    async fn restore_conversation(&self, id: ConversationId) -> Result<(), StoreError>;

    /// Appends an immutable message and bumps the conversation's
    /// `updated_at` in the same transaction.
    async fn append_message(&self, message: &Message) -> Result<(), StoreError>;

    /// Full ordered message list (by `created_at` ascending) with model
    /// descriptors joined in.
    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<MessageWithModel>, StoreError>;

    /// Best-effort descriptor lookup by provider model string.
    ///
    /// A miss returns `Ok(None)`; it must never block a turn.
    async fn find_model_by_string(
        &self,
        model_string: &str,
    ) -> Result<Option<ModelDescriptor>, StoreError>;

    /// Active model descriptors for the selector.
    async fn list_active_models(&self) -> Result<Vec<ModelDescriptor>, StoreError>;

    /// Inserts a model descriptor (seeding and tests).
    async fn add_model(&self, model: &ModelDescriptor) -> Result<(), StoreError>;
}

/// Chat store errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Referenced conversation does not exist.
    #[error("conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Creates a database error from any displayable cause.
    pub fn database(cause: impl std::fmt::Display) -> Self {
        Self::Database(cause.to_string())
    }
}
