//! Error types for the LLM adapter.

use thiserror::Error;

/// Errors produced while talking to a local LLM runtime.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No model name was supplied.
    #[error("Model name is required")]
    MissingModel,

    /// The endpoint is not a usable absolute URL.
    #[error("Invalid LLM endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        /// Endpoint as supplied by the caller.
        endpoint: String,
        /// Parse failure.
        source: url::ParseError,
    },

    /// The runtime answered with a non-200 status.
    #[error("LLM API returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The runtime could not be reached or the request timed out.
    #[error("Error connecting to LLM endpoint: {0}")]
    Connection(#[from] reqwest::Error),

    /// The runtime answered 200 with a body we cannot interpret.
    #[error("Unexpected response from LLM endpoint: {0}")]
    MalformedResponse(String),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl LlmError {
    /// Whether the error stems from caller input rather than the runtime.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingModel)
    }
}

/// Convenience result alias for LLM operations.
pub type LlmResult<T> = Result<T, LlmError>;
