//! Client-side stream consumption.
//!
//! Library counterpart of the server relay: parses the SSE frames the
//! relay emits, maintains an ordered transcript, and reconciles the
//! client's temporary assistant message with the server-assigned record.

mod consumer;

pub use consumer::{ClientMessage, ClientMessageId, TurnConsumer, TurnOutcome};
