//! PostgreSQL implementation of ChatStore.
//!
//! Persists conversations, messages, and model descriptors. Message
//! appends and the owning conversation's `updated_at` bump happen in one
//! transaction; hard deletes rely on the `ON DELETE CASCADE` foreign key
//! from messages to conversations.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::chat::{Conversation, Message, ModelDescriptor, Provider, Role};
use crate::domain::foundation::{ConversationId, MessageId, ModelId, Timestamp, UserId};
use crate::ports::{ChatStore, ConversationSummary, MessageWithModel, StoreError};

/// PostgreSQL implementation of ChatStore.
#[derive(Clone)]
pub struct PostgresChatStore {
    pool: PgPool,
}

impl PostgresChatStore {
    /// Creates a new PostgresChatStore over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for PostgresChatStore {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, user_id, title, model_id, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(conversation.id.as_uuid())
        .bind(conversation.user_id.as_str())
        .bind(&conversation.title)
        .bind(conversation.model_id.as_ref().map(|m| *m.as_uuid()))
        .bind(conversation.created_at.as_datetime())
        .bind(conversation.updated_at.as_datetime())
        .bind(conversation.deleted_at.as_ref().map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to insert conversation: {}", e)))?;

        Ok(())
    }

    async fn get_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, title, model_id, created_at, updated_at, deleted_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to fetch conversation: {}", e)))?;

        row.map(|r| conversation_from_row(&r)).transpose()
    }

    async fn list_conversations(
        &self,
        user_id: &UserId,
        include_deleted: bool,
    ) -> Result<Vec<ConversationSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.user_id, c.title, c.model_id, c.created_at, c.updated_at, c.deleted_at,
                   m.id AS msg_id, m.role AS msg_role, m.content AS msg_content,
                   m.model_id AS msg_model_id, m.created_at AS msg_created_at
            FROM conversations c
            LEFT JOIN LATERAL (
                SELECT id, role, content, model_id, created_at
                FROM messages
                WHERE conversation_id = c.id
                ORDER BY created_at DESC
                LIMIT 1
            ) m ON TRUE
            WHERE c.user_id = $1
              AND ($2 OR c.deleted_at IS NULL)
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to list conversations: {}", e)))?;

        rows.iter()
            .map(|row| {
                let conversation = conversation_from_row(row)?;
                let msg_id: Option<uuid::Uuid> = row.get("msg_id");
                let preview = match msg_id {
                    Some(msg_id) => {
                        let role_str: &str = row.get("msg_role");
                        Some(Message {
                            id: MessageId::from_uuid(msg_id),
                            conversation_id: conversation.id,
                            role: role_from_str(role_str)?,
                            content: row.get("msg_content"),
                            model_id: row
                                .get::<Option<uuid::Uuid>, _>("msg_model_id")
                                .map(ModelId::from_uuid),
                            created_at: Timestamp::from_datetime(row.get("msg_created_at")),
                        })
                    }
                    None => None,
                };
                Ok(ConversationSummary {
                    conversation,
                    preview,
                })
            })
            .collect()
    }

    async fn soft_delete_conversation(&self, id: ConversationId) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE conversations SET deleted_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to soft-delete conversation: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ConversationNotFound(id));
        }
        Ok(())
    }

    async fn hard_delete_conversation(&self, id: ConversationId) -> Result<(), StoreError> {
        // Messages go with the conversation via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to delete conversation: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ConversationNotFound(id));
        }
        Ok(())
    }

    async fn restore_conversation(&self, id: ConversationId) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE conversations SET deleted_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to restore conversation: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ConversationNotFound(id));
        }
        Ok(())
    }

    async fn append_message(&self, message: &Message) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::database(format!("Failed to start transaction: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, role, content, model_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.conversation_id.as_uuid())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.model_id.as_ref().map(|m| *m.as_uuid()))
        .bind(message.created_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::database(format!("Failed to insert message: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE conversations SET updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(message.conversation_id.as_uuid())
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            StoreError::database(format!("Failed to update conversation timestamp: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ConversationNotFound(message.conversation_id));
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::database(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<MessageWithModel>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.conversation_id, m.role, m.content, m.model_id, m.created_at,
                   d.id AS model_pk, d.name AS model_name, d.provider AS model_provider,
                   d.model_string, d.description AS model_description, d.active AS model_active
            FROM messages m
            LEFT JOIN model_descriptors d ON d.id = m.model_id
            WHERE m.conversation_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(conversation_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to fetch messages: {}", e)))?;

        rows.iter()
            .map(|row| {
                let id: uuid::Uuid = row.get("id");
                let role_str: &str = row.get("role");
                let message = Message {
                    id: MessageId::from_uuid(id),
                    conversation_id,
                    role: role_from_str(role_str)?,
                    content: row.get("content"),
                    model_id: row
                        .get::<Option<uuid::Uuid>, _>("model_id")
                        .map(ModelId::from_uuid),
                    created_at: Timestamp::from_datetime(row.get("created_at")),
                };
                let model_pk: Option<uuid::Uuid> = row.get("model_pk");
                let model = match model_pk {
                    Some(pk) => {
                        let provider_str: &str = row.get("model_provider");
                        Some(ModelDescriptor {
                            id: ModelId::from_uuid(pk),
                            name: row.get("model_name"),
                            provider: provider_from_str(provider_str)?,
                            model_string: row.get("model_string"),
                            description: row.get("model_description"),
                            active: row.get("model_active"),
                        })
                    }
                    None => None,
                };
                Ok(MessageWithModel { message, model })
            })
            .collect()
    }

    async fn find_model_by_string(
        &self,
        model_string: &str,
    ) -> Result<Option<ModelDescriptor>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, provider, model_string, description, active
            FROM model_descriptors
            WHERE model_string = $1
            "#,
        )
        .bind(model_string)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to fetch model: {}", e)))?;

        row.map(|r| model_from_row(&r)).transpose()
    }

    async fn list_active_models(&self) -> Result<Vec<ModelDescriptor>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, provider, model_string, description, active
            FROM model_descriptors
            WHERE active
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to list models: {}", e)))?;

        rows.iter().map(model_from_row).collect()
    }

    async fn add_model(&self, model: &ModelDescriptor) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO model_descriptors (id, name, provider, model_string, description, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(model.id.as_uuid())
        .bind(&model.name)
        .bind(model.provider.as_str())
        .bind(&model.model_string)
        .bind(&model.description)
        .bind(model.active)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to insert model: {}", e)))?;

        Ok(())
    }
}

// === Row Mapping ===

fn conversation_from_row(row: &sqlx::postgres::PgRow) -> Result<Conversation, StoreError> {
    let id: uuid::Uuid = row.get("id");
    let user_id: String = row.get("user_id");
    let model_id: Option<uuid::Uuid> = row.get("model_id");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");
    let updated_at: chrono::DateTime<chrono::Utc> = row.get("updated_at");
    let deleted_at: Option<chrono::DateTime<chrono::Utc>> = row.get("deleted_at");

    Ok(Conversation {
        id: ConversationId::from_uuid(id),
        user_id: UserId::new(user_id)
            .map_err(|e| StoreError::database(format!("Invalid stored user_id: {}", e)))?,
        title: row.get("title"),
        model_id: model_id.map(ModelId::from_uuid),
        created_at: Timestamp::from_datetime(created_at),
        updated_at: Timestamp::from_datetime(updated_at),
        deleted_at: deleted_at.map(Timestamp::from_datetime),
    })
}

fn model_from_row(row: &sqlx::postgres::PgRow) -> Result<ModelDescriptor, StoreError> {
    let id: uuid::Uuid = row.get("id");
    let provider_str: &str = row.get("provider");
    Ok(ModelDescriptor {
        id: ModelId::from_uuid(id),
        name: row.get("name"),
        provider: provider_from_str(provider_str)?,
        model_string: row.get("model_string"),
        description: row.get("description"),
        active: row.get("active"),
    })
}

fn role_from_str(s: &str) -> Result<Role, StoreError> {
    Role::parse(s).ok_or_else(|| StoreError::database(format!("Invalid stored role: {}", s)))
}

fn provider_from_str(s: &str) -> Result<Provider, StoreError> {
    Provider::parse(s)
        .ok_or_else(|| StoreError::database(format!("Invalid stored provider: {}", s)))
}
