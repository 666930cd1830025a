//! Conversation entity with soft-delete lifecycle.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, ModelId, Timestamp, UserId};

/// Maximum length of an auto-derived conversation title.
pub const MAX_TITLE_LEN: usize = 30;

/// A conversation owned by exactly one user.
///
/// Soft-deleted conversations carry a `deleted_at` timestamp; they are
/// excluded from default listings but remain fetchable by id and
/// restorable until permanently purged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique ID of this conversation.
    pub id: ConversationId,
    /// Owning user.
    pub user_id: UserId,
    /// Display title.
    pub title: String,
    /// Default model for new turns, if one is pinned.
    pub model_id: Option<ModelId>,
    /// When the conversation was created.
    pub created_at: Timestamp,
    /// Bumped on every appended message.
    pub updated_at: Timestamp,
    /// Set when soft-deleted; None for live conversations.
    pub deleted_at: Option<Timestamp>,
}

impl Conversation {
    /// Creates a new conversation with an explicit title.
    pub fn new(user_id: UserId, title: impl Into<String>, model_id: Option<ModelId>) -> Self {
        let now = Timestamp::now();
        Self {
            id: ConversationId::new(),
            user_id,
            title: title.into(),
            model_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Creates a conversation titled from the first user message.
    ///
    /// The title is the message's first [`MAX_TITLE_LEN`] characters
    /// (character boundary, not byte boundary).
    pub fn from_first_message(
        user_id: UserId,
        first_message: &str,
        model_id: Option<ModelId>,
    ) -> Self {
        Self::new(user_id, derive_title(first_message), model_id)
    }

    /// Returns true if the conversation has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Marks the conversation as soft-deleted.
    pub fn soft_delete(&mut self) {
        self.deleted_at = Some(Timestamp::now());
    }

    /// Clears a soft delete, returning the conversation to listings.
    pub fn restore(&mut self) {
        self.deleted_at = None;
    }

    /// Records that a message was appended.
    pub fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

/// Derives a conversation title from the first user message.
pub fn derive_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    if trimmed.is_empty() {
        return "New chat".to_string();
    }
    trimmed.chars().take(MAX_TITLE_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[test]
    fn title_derived_from_short_message_is_the_message() {
        let conv = Conversation::from_first_message(owner(), "hi", None);
        assert_eq!(conv.title, "hi");
    }

    #[test]
    fn title_is_capped_at_thirty_characters() {
        let long = "a".repeat(100);
        let conv = Conversation::from_first_message(owner(), &long, None);
        assert_eq!(conv.title.chars().count(), MAX_TITLE_LEN);
    }

    #[test]
    fn title_cap_respects_char_boundaries() {
        let text = "ü".repeat(40);
        let title = derive_title(&text);
        assert_eq!(title.chars().count(), MAX_TITLE_LEN);
    }

    #[test]
    fn empty_first_message_falls_back_to_default_title() {
        assert_eq!(derive_title("   "), "New chat");
    }

    #[test]
    fn soft_delete_and_restore_round_trip() {
        let mut conv = Conversation::new(owner(), "t", None);
        assert!(!conv.is_deleted());

        conv.soft_delete();
        assert!(conv.is_deleted());

        conv.restore();
        assert!(!conv.is_deleted());
        assert!(conv.deleted_at.is_none());
    }

    #[test]
    fn touch_advances_updated_at() {
        let mut conv = Conversation::new(owner(), "t", None);
        let before = conv.updated_at;
        conv.touch();
        assert!(!conv.updated_at.is_before(&before));
    }
}
