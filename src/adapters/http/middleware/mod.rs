//! HTTP middleware and extractors.

mod identity;

pub use identity::{RequestIdentity, USER_ID_HEADER};
