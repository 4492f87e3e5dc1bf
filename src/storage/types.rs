//! Persisted transcript shapes.

use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;

/// A saved conversation, exactly as written to disk.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Local save time, ISO-8601 with microseconds.
    pub timestamp: String,
    /// Messages in chronological order.
    pub messages: Vec<ChatMessage>,
}

/// Listing entry for a saved conversation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSummary {
    /// File name inside the storage directory.
    pub filename: String,
    /// Timestamp stored in the file.
    pub timestamp: String,
    /// Number of messages in the file.
    pub message_count: usize,
}

/// Where a transcript was written.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SavedTranscript {
    /// File name inside the storage directory.
    pub filename: String,
    /// Full path on disk.
    pub path: String,
}
