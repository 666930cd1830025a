//! Chat HTTP endpoints: conversation CRUD, message listing, the model
//! selector, and the streaming turn endpoint.

pub mod dto;
pub mod handlers;
pub mod routes;
pub mod stream;

pub use routes::chat_routes;
