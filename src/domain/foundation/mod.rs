//! Foundation value objects shared by every other module.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{ConversationId, MessageId, ModelId, UserId};
pub use timestamp::Timestamp;
