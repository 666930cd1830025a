//! Stanza - streaming LLM chat backend.
//!
//! Conversations with pluggable model providers (OpenAI, DeepSeek, Qwen,
//! OpenRouter), persisted in PostgreSQL, with a relay that forwards
//! provider token streams to clients over SSE and reconciles client
//! temporary ids with server-assigned message ids.

pub mod adapters;
pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod ports;
pub mod protocol;
