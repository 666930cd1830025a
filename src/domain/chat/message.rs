//! Message entity and role enum.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, MessageId, ModelId, Timestamp};

/// Role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (guides model behavior).
    System,
    /// User input.
    User,
    /// Assistant (model) response.
    Assistant,
}

impl Role {
    /// Stable string form used in the database and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// A persisted chat message.
///
/// Messages are immutable once created; there is no edit path. Ordering
/// within a conversation is by `created_at` ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique ID of this message.
    pub id: MessageId,
    /// Conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// Role of the sender.
    pub role: Role,
    /// Text content.
    pub content: String,
    /// Model that produced this message; None for user/system messages.
    pub model_id: Option<ModelId>,
    /// When the message was created.
    pub created_at: Timestamp,
}

impl Message {
    /// Creates a new user message in the given conversation.
    pub fn user(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role: Role::User,
            content: content.into(),
            model_id: None,
            created_at: Timestamp::now(),
        }
    }

    /// Creates a new assistant message attributed to an optional model.
    pub fn assistant(
        conversation_id: ConversationId,
        content: impl Into<String>,
        model_id: Option<ModelId>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role: Role::Assistant,
            content: content.into(),
            model_id,
            created_at: Timestamp::now(),
        }
    }

    /// Creates a new system message in the given conversation.
    pub fn system(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role: Role::System,
            content: content.into(),
            model_id: None,
            created_at: Timestamp::now(),
        }
    }
}
