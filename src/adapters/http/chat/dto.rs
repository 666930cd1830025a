//! Request and response shapes for the chat endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::chat::{Conversation, Message, ModelDescriptor, Role};
use crate::ports::{ConversationSummary, MessageWithModel, PromptMessage};

/// Body of `POST /api/chat/stream`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChatRequest {
    /// Full prompt; the trailing user message is the one persisted.
    pub messages: Vec<ChatMessageInput>,
    /// Existing conversation id; absent creates one.
    #[serde(default)]
    pub chat_id: Option<String>,
    /// Provider model string override.
    #[serde(default)]
    pub model_id: Option<String>,
    /// Client-side temporary id echoed on the terminal event.
    #[serde(default)]
    pub temp_id: Option<String>,
}

/// One prompt message as sent by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageInput {
    pub role: Role,
    pub content: String,
}

impl ChatMessageInput {
    /// Converts to the application-level prompt message.
    pub fn into_prompt(self) -> PromptMessage {
        PromptMessage::new(self.role, self.content)
    }
}

/// Body of `PATCH /api/chat/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchChatRequest {
    pub action: String,
}

/// Query string of `GET /api/chats`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChatsQuery {
    pub user_id: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
}

/// Query string of `DELETE /api/chat/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteChatQuery {
    #[serde(default)]
    pub hard: bool,
}

/// A conversation in API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub model_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted: bool,
}

impl From<&Conversation> for ChatResponse {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.to_string(),
            user_id: conversation.user_id.to_string(),
            title: conversation.title.clone(),
            model_id: conversation.model_id.map(|m| m.to_string()),
            created_at: conversation.created_at.to_rfc3339(),
            updated_at: conversation.updated_at.to_rfc3339(),
            deleted: conversation.is_deleted(),
        }
    }
}

/// A list entry of `GET /api/chats`: conversation plus latest message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummaryResponse {
    #[serde(flatten)]
    pub chat: ChatResponse,
    pub preview: Option<MessageResponse>,
}

impl From<&ConversationSummary> for ChatSummaryResponse {
    fn from(summary: &ConversationSummary) -> Self {
        Self {
            chat: ChatResponse::from(&summary.conversation),
            preview: summary.preview.as_ref().map(MessageResponse::from),
        }
    }
}

/// A message in API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub model_id: Option<String>,
    pub created_at: String,
}

impl From<&Message> for MessageResponse {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.to_string(),
            role: message.role,
            content: message.content.clone(),
            model_id: message.model_id.map(|m| m.to_string()),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

/// An entry of `GET /api/chat/{id}/messages`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageWithModelResponse {
    #[serde(flatten)]
    pub message: MessageResponse,
    pub model: Option<ModelResponse>,
}

impl From<&MessageWithModel> for MessageWithModelResponse {
    fn from(entry: &MessageWithModel) -> Self {
        Self {
            message: MessageResponse::from(&entry.message),
            model: entry.model.as_ref().map(ModelResponse::from),
        }
    }
}

/// A model descriptor in API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResponse {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub model_id: String,
    pub description: Option<String>,
}

impl From<&ModelDescriptor> for ModelResponse {
    fn from(model: &ModelDescriptor) -> Self {
        Self {
            id: model.id.to_string(),
            name: model.name.clone(),
            provider: model.provider.to_string(),
            model_id: model.model_string.clone(),
            description: model.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    #[test]
    fn stream_request_parses_minimal_body() {
        let json = r#"{"messages":[{"role":"user","content":"hi"}]}"#;
        let request: StreamChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.messages.len(), 1);
        assert!(request.chat_id.is_none());
        assert!(request.temp_id.is_none());
    }

    #[test]
    fn stream_request_parses_full_body() {
        let json = r#"{
            "messages": [{"role":"user","content":"hi"}],
            "chatId": "0b304b3d-4bd4-4b2d-9a09-5ad8c2b4b3f3",
            "modelId": "deepseek-reasoner",
            "tempId": "tmp-7"
        }"#;
        let request: StreamChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.model_id.as_deref(), Some("deepseek-reasoner"));
        assert_eq!(request.temp_id.as_deref(), Some("tmp-7"));
    }

    #[test]
    fn chat_response_uses_camel_case() {
        let conversation = Conversation::new(UserId::new("u-1").unwrap(), "title", None);
        let json = serde_json::to_string(&ChatResponse::from(&conversation)).unwrap();
        assert!(json.contains("\"userId\""));
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"deleted\":false"));
    }
}
