//! Conversation transcript persistence.

pub mod error;
pub mod transcript_store;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use transcript_store::TranscriptStore;
pub use types::{SavedTranscript, Transcript, TranscriptSummary};
