//! Flat-file transcript store: one pretty-printed JSON file per saved conversation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use crate::llm::ChatMessage;

use super::error::{StorageError, StorageResult};
use super::types::{SavedTranscript, Transcript, TranscriptSummary};

const FILE_PREFIX: &str = "conversation_";
const FILE_SUFFIX: &str = ".json";
const FILENAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Directory of `conversation_YYYYMMDD_HHMMSS.json` files.
///
/// Files are never edited in place. Two saves within the same second map to the
/// same filename and the later one wins.
#[derive(Clone, Debug)]
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!("Transcript store at {}", dir.display());
        Ok(Self { dir })
    }

    /// Default per-user storage directory (`~/.local_llm_chat/conversations`).
    ///
    /// # Errors
    /// Returns an error if the home directory is unknown.
    pub fn default_dir() -> StorageResult<PathBuf> {
        let home = dirs::home_dir().ok_or(StorageError::NoHomeDir)?;
        Ok(home.join(".local_llm_chat").join("conversations"))
    }

    /// Storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a conversation under a filename derived from the current local time.
    ///
    /// # Errors
    /// Returns an error if `messages` is empty or the file cannot be written.
    pub async fn save(&self, messages: &[ChatMessage]) -> StorageResult<SavedTranscript> {
        self.save_at(messages, Local::now().naive_local()).await
    }

    async fn save_at(&self, messages: &[ChatMessage], now: NaiveDateTime) -> StorageResult<SavedTranscript> {
        if messages.is_empty() {
            return Err(StorageError::EmptyTranscript);
        }

        // Filename and stored timestamp share one clock reading.
        let filename = format!("{FILE_PREFIX}{}{FILE_SUFFIX}", now.format(FILENAME_TIME_FORMAT));
        let transcript = Transcript {
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            messages: messages.to_vec(),
        };

        let path = self.dir.join(&filename);
        let json = serde_json::to_string_pretty(&transcript)?;
        tokio::fs::write(&path, json).await?;
        tracing::info!("Saved conversation to {}", path.display());

        Ok(SavedTranscript {
            filename,
            path: path.display().to_string(),
        })
    }

    /// List saved conversations, newest first.
    ///
    /// Unreadable or corrupt files are logged and skipped.
    ///
    /// # Errors
    /// Returns an error if the storage directory cannot be read.
    pub async fn list(&self) -> StorageResult<Vec<TranscriptSummary>> {
        let mut filenames = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_transcript_filename(&name) {
                filenames.push(name);
            }
        }
        filenames.sort_unstable_by(|a, b| b.cmp(a));

        let mut summaries = Vec::with_capacity(filenames.len());
        for filename in filenames {
            match self.read(&filename).await {
                Ok(transcript) => summaries.push(TranscriptSummary {
                    filename,
                    timestamp: transcript.timestamp,
                    message_count: transcript.messages.len(),
                }),
                Err(e) => tracing::error!("Error reading {}: {e}", self.dir.join(&filename).display()),
            }
        }

        Ok(summaries)
    }

    /// Load one saved conversation.
    ///
    /// # Errors
    /// Returns an error if the filename is not a transcript name, the file does not
    /// exist, or it cannot be parsed.
    pub async fn load(&self, filename: &str) -> StorageResult<Transcript> {
        if !is_transcript_filename(filename) {
            return Err(StorageError::InvalidFilename(filename.to_string()));
        }
        self.read(filename).await
    }

    async fn read(&self, filename: &str) -> StorageResult<Transcript> {
        let json = tokio::fs::read_to_string(self.dir.join(filename))
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    StorageError::NotFound(filename.to_string())
                } else {
                    StorageError::Io(e)
                }
            })?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn is_transcript_filename(name: &str) -> bool {
    name.starts_with(FILE_PREFIX)
        && name.ends_with(FILE_SUFFIX)
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}
