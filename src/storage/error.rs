//! Error types for transcript storage.

use thiserror::Error;

/// Transcript storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Nothing to save.
    #[error("No messages to save")]
    EmptyTranscript,
    /// Filename outside the `conversation_*.json` namespace.
    #[error("Invalid conversation filename: {0}")]
    InvalidFilename(String),
    /// No transcript with that filename.
    #[error("Conversation not found: {0}")]
    NotFound(String),
    /// The home directory could not be determined.
    #[error("Could not determine home directory")]
    NoHomeDir,
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether the error stems from caller input.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyTranscript | Self::InvalidFilename(_))
    }
}

/// Convenience result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
