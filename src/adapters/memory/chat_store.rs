//! In-memory implementation of ChatStore for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::chat::{Conversation, Message, ModelDescriptor};
use crate::domain::foundation::{ConversationId, UserId};
use crate::ports::{ChatStore, ConversationSummary, MessageWithModel, StoreError};

/// In-memory chat store.
///
/// Mirrors the PostgreSQL adapter's observable behavior: soft deletes hide
/// conversations from default listings, `append_message` bumps the owning
/// conversation's `updated_at`, and hard deletes cascade to messages.
///
/// # Panics
///
/// Methods panic if an internal lock is poisoned. Acceptable for test
/// code; this adapter should not back a production deployment.
pub struct InMemoryChatStore {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
    messages: RwLock<Vec<Message>>,
    models: RwLock<Vec<ModelDescriptor>>,
}

impl InMemoryChatStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            messages: RwLock::new(Vec::new()),
            models: RwLock::new(Vec::new()),
        }
    }

    /// Number of messages stored in the given conversation (test helper).
    pub fn message_count(&self, conversation_id: ConversationId) -> usize {
        self.messages
            .read()
            .expect("messages lock poisoned")
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .count()
    }
}

impl Default for InMemoryChatStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        self.conversations
            .write()
            .expect("conversations lock poisoned")
            .insert(conversation.id, conversation.clone());
        Ok(())
    }

    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        Ok(self
            .conversations
            .read()
            .expect("conversations lock poisoned")
            .get(&id)
            .cloned())
    }

    async fn list_conversations(
        &self,
        user_id: &UserId,
        include_deleted: bool,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        let conversations = self
            .conversations
            .read()
            .expect("conversations lock poisoned");
        let messages = self.messages.read().expect("messages lock poisoned");

        let mut summaries: Vec<ConversationSummary> = conversations
            .values()
            .filter(|c| &c.user_id == user_id)
            .filter(|c| include_deleted || !c.is_deleted())
            .map(|c| {
                let preview = messages
                    .iter()
                    .filter(|m| m.conversation_id == c.id)
                    .max_by_key(|m| m.created_at)
                    .cloned();
                ConversationSummary {
                    conversation: c.clone(),
                    preview,
                }
            })
            .collect();

        summaries.sort_by(|a, b| b.conversation.updated_at.cmp(&a.conversation.updated_at));
        Ok(summaries)
    }

    async fn soft_delete_conversation(&self, id: ConversationId) -> Result<(), StoreError> {
        let mut conversations = self
            .conversations
            .write()
            .expect("conversations lock poisoned");
        match conversations.get_mut(&id) {
            Some(conversation) => {
                conversation.soft_delete();
                Ok(())
            }
            None => Err(StoreError::ConversationNotFound(id)),
        }
    }

    async fn hard_delete_conversation(&self, id: ConversationId) -> Result<(), StoreError> {
        let removed = self
            .conversations
            .write()
            .expect("conversations lock poisoned")
            .remove(&id);
        if removed.is_none() {
            return Err(StoreError::ConversationNotFound(id));
        }
        self.messages
            .write()
            .expect("messages lock poisoned")
            .retain(|m| m.conversation_id != id);
        Ok(())
    }

    async fn restore_conversation(&self, id: ConversationId) -> Result<(), StoreError> {
        let mut conversations = self
            .conversations
            .write()
            .expect("conversations lock poisoned");
        match conversations.get_mut(&id) {
            Some(conversation) => {
                conversation.restore();
                Ok(())
            }
            None => Err(StoreError::ConversationNotFound(id)),
        }
    }

    async fn append_message(&self, message: &Message) -> Result<(), StoreError> {
        let mut conversations = self
            .conversations
            .write()
            .expect("conversations lock poisoned");
        let conversation = conversations
            .get_mut(&message.conversation_id)
            .ok_or(StoreError::ConversationNotFound(message.conversation_id))?;
        conversation.touch();
        self.messages
            .write()
            .expect("messages lock poisoned")
            .push(message.clone());
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<MessageWithModel>, StoreError> {
        let messages = self.messages.read().expect("messages lock poisoned");
        let models = self.models.read().expect("models lock poisoned");

        let mut rows: Vec<Message> = messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);

        Ok(rows
            .into_iter()
            .map(|message| {
                let model = message
                    .model_id
                    .and_then(|id| models.iter().find(|m| m.id == id).cloned());
                MessageWithModel { message, model }
            })
            .collect())
    }

    async fn find_model_by_string(
        &self,
        model_string: &str,
    ) -> Result<Option<ModelDescriptor>, StoreError> {
        Ok(self
            .models
            .read()
            .expect("models lock poisoned")
            .iter()
            .find(|m| m.model_string == model_string)
            .cloned())
    }

    async fn list_active_models(&self) -> Result<Vec<ModelDescriptor>, StoreError> {
        Ok(self
            .models
            .read()
            .expect("models lock poisoned")
            .iter()
            .filter(|m| m.active)
            .cloned()
            .collect())
    }

    async fn add_model(&self, model: &ModelDescriptor) -> Result<(), StoreError> {
        self.models
            .write()
            .expect("models lock poisoned")
            .push(model.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::Provider;

    fn owner() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[tokio::test]
    async fn created_conversation_is_fetchable() {
        let store = InMemoryChatStore::new();
        let conv = Conversation::new(owner(), "hello", None);
        store.create_conversation(&conv).await.unwrap();

        let fetched = store.get_conversation(conv.id).await.unwrap();
        assert_eq!(fetched, Some(conv));
    }

    #[tokio::test]
    async fn soft_deleted_conversation_hidden_from_default_listing() {
        let store = InMemoryChatStore::new();
        let conv = Conversation::new(owner(), "t", None);
        store.create_conversation(&conv).await.unwrap();
        store.soft_delete_conversation(conv.id).await.unwrap();

        let visible = store.list_conversations(&owner(), false).await.unwrap();
        assert!(visible.is_empty());

        let all = store.list_conversations(&owner(), true).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].conversation.is_deleted());

        // Still fetchable by id.
        assert!(store.get_conversation(conv.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn restore_returns_conversation_to_listing() {
        let store = InMemoryChatStore::new();
        let conv = Conversation::new(owner(), "t", None);
        store.create_conversation(&conv).await.unwrap();
        store.soft_delete_conversation(conv.id).await.unwrap();
        store.restore_conversation(conv.id).await.unwrap();

        let visible = store.list_conversations(&owner(), false).await.unwrap();
        assert_eq!(visible.len(), 1);
    }

    #[tokio::test]
    async fn hard_delete_removes_messages_too() {
        let store = InMemoryChatStore::new();
        let conv = Conversation::new(owner(), "t", None);
        store.create_conversation(&conv).await.unwrap();
        store
            .append_message(&Message::user(conv.id, "hi"))
            .await
            .unwrap();

        store.hard_delete_conversation(conv.id).await.unwrap();
        assert!(store.get_conversation(conv.id).await.unwrap().is_none());
        assert_eq!(store.message_count(conv.id), 0);
    }

    #[tokio::test]
    async fn append_to_missing_conversation_fails() {
        let store = InMemoryChatStore::new();
        let msg = Message::user(ConversationId::new(), "orphan");
        let err = store.append_message(&msg).await.unwrap_err();
        assert!(matches!(err, StoreError::ConversationNotFound(_)));
    }

    #[tokio::test]
    async fn append_bumps_updated_at() {
        let store = InMemoryChatStore::new();
        let conv = Conversation::new(owner(), "t", None);
        let before = conv.updated_at;
        store.create_conversation(&conv).await.unwrap();
        store
            .append_message(&Message::user(conv.id, "hi"))
            .await
            .unwrap();

        let after = store.get_conversation(conv.id).await.unwrap().unwrap();
        assert!(!after.updated_at.is_before(&before));
    }

    #[tokio::test]
    async fn listing_orders_by_recency_and_carries_previews() {
        let store = InMemoryChatStore::new();
        let older = Conversation::new(owner(), "older", None);
        let newer = Conversation::new(owner(), "newer", None);
        store.create_conversation(&older).await.unwrap();
        store.create_conversation(&newer).await.unwrap();

        store
            .append_message(&Message::user(older.id, "first"))
            .await
            .unwrap();
        store
            .append_message(&Message::user(older.id, "latest"))
            .await
            .unwrap();

        let summaries = store.list_conversations(&owner(), false).await.unwrap();
        assert_eq!(summaries.len(), 2);
        // older was touched last, so it sorts first.
        assert_eq!(summaries[0].conversation.id, older.id);
        assert_eq!(
            summaries[0].preview.as_ref().map(|m| m.content.as_str()),
            Some("latest")
        );
        assert!(summaries[1].preview.is_none());
    }

    #[tokio::test]
    async fn model_lookup_by_string_misses_gracefully() {
        let store = InMemoryChatStore::new();
        let model = ModelDescriptor::new("DeepSeek R1", Provider::DeepSeek, "deepseek-reasoner");
        store.add_model(&model).await.unwrap();

        let hit = store
            .find_model_by_string("deepseek-reasoner")
            .await
            .unwrap();
        assert_eq!(hit, Some(model));

        let miss = store.find_model_by_string("no-such-model").await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn inactive_models_excluded_from_selector() {
        let store = InMemoryChatStore::new();
        let mut retired = ModelDescriptor::new("Old", Provider::OpenAi, "gpt-3.5-turbo");
        retired.active = false;
        store.add_model(&retired).await.unwrap();
        store
            .add_model(&ModelDescriptor::new("GPT-4o", Provider::OpenAi, "gpt-4o"))
            .await
            .unwrap();

        let active = store.list_active_models().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].model_string, "gpt-4o");
    }
}
