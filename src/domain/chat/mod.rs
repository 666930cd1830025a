//! Chat domain: conversations, messages, model descriptors, usage quotas.

mod conversation;
mod message;
mod model;
mod usage;

pub use conversation::{derive_title, Conversation, MAX_TITLE_LEN};
pub use message::{Message, Role};
pub use model::{ModelDescriptor, Provider};
pub use usage::{Identity, ANONYMOUS_DAILY_QUOTA, USER_DAILY_QUOTA};
