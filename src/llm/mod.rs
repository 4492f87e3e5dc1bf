//! Adapter for local LLM runtimes speaking the Ollama or OpenAI-compatible protocol.

pub mod client;
pub mod error;
pub mod protocol;
pub mod types;

pub use client::{ChatCall, LlmClient};
pub use error::{LlmError, LlmResult};
pub use protocol::ProtocolVariant;
pub use types::{ChatMessage, MessageRole};
