//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::lifecycle::ServiceProbe;
use crate::llm::{LlmClient, ProtocolVariant};
use crate::storage::TranscriptStore;

use super::shutdown::ShutdownScheduler;

/// Shared application state.
pub struct AppState {
    /// Startup configuration.
    pub config: AppConfig,
    /// Client for the local LLM runtime.
    pub llm: LlmClient,
    /// Runtime install/run probe.
    pub probe: ServiceProbe,
    /// Saved conversations.
    pub store: TranscriptStore,
    /// Pending server shutdown.
    pub shutdown: ShutdownScheduler,
}

impl AppState {
    /// Create the application state from a configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, the HTTP client cannot be
    /// created, or the storage directory cannot be prepared.
    pub fn new(config: AppConfig) -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        config.validate()?;

        let llm = LlmClient::new().map_err(|e| format!("Failed to create LLM client: {e}"))?;
        let probe = ServiceProbe::new(llm.clone()).with_binary(config.runtime_binary.clone());

        let storage_dir = match &config.storage_dir {
            Some(dir) => dir.clone(),
            None => TranscriptStore::default_dir()?,
        };
        let store = TranscriptStore::open(storage_dir)
            .map_err(|e| format!("Failed to prepare conversation storage: {e}"))?;

        Ok(Self::from_parts(config, llm, probe, store))
    }

    /// Assemble state from already-built parts.
    #[must_use]
    pub fn from_parts(
        config: AppConfig,
        llm: LlmClient,
        probe: ServiceProbe,
        store: TranscriptStore,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            llm,
            probe,
            store,
            shutdown: ShutdownScheduler::new(),
        })
    }

    /// Endpoint from a request, falling back to the configured default.
    #[must_use]
    pub fn endpoint_or_default(&self, endpoint: Option<String>) -> String {
        endpoint
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| self.config.default_endpoint.clone())
    }

    /// Protocol from a request, falling back to the configured override.
    #[must_use]
    pub fn protocol_or_default(&self, protocol: Option<ProtocolVariant>) -> Option<ProtocolVariant> {
        protocol.or(self.config.protocol)
    }
}
