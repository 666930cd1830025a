//! Domain layer: entities and value objects with no I/O.

pub mod chat;
pub mod foundation;
