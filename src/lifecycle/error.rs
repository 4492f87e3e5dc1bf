//! Error types for the lifecycle probe.

use thiserror::Error;

/// Failures while running host commands.
///
/// These never reach HTTP clients as errors; the probe folds them into
/// status fields or a failed [`StartOutcome`](super::StartOutcome).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The program could not be spawned or waited on.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        /// Command line that failed.
        command: String,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The program did not exit within its time limit.
    #[error("`{command}` timed out after {secs}s")]
    Timeout {
        /// Command line that timed out.
        command: String,
        /// Limit that was exceeded, in seconds.
        secs: u64,
    },
}
