//! Application configuration handed to the HTTP surface at startup.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::lifecycle::probe::DEFAULT_RUNTIME_BINARY;
use crate::llm::ProtocolVariant;

/// Default LLM runtime endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.8;
/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5000;
/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Maximum accepted request body size.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
/// How long in-flight requests may run once shutdown starts.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Host name or IP address the server binds to.
    pub host: String,
    /// Port the server binds to.
    pub port: u16,
    /// Directory for saved transcripts; `None` means the per-user default.
    pub storage_dir: Option<PathBuf>,
    /// Endpoint used when a request does not name one.
    pub default_endpoint: String,
    /// Temperature used when a request does not set one.
    pub default_temperature: f64,
    /// Protocol forced for every endpoint; `None` infers it per endpoint.
    pub protocol: Option<ProtocolVariant>,
    /// Runtime executable probed and launched by the lifecycle endpoints.
    pub runtime_binary: String,
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
    /// Delay between a shutdown request and the server stopping.
    pub shutdown_delay: Duration,
    /// Upper bound on the graceful drain once shutdown starts.
    pub drain_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            storage_dir: None,
            default_endpoint: DEFAULT_ENDPOINT.to_string(),
            default_temperature: DEFAULT_TEMPERATURE,
            protocol: None,
            runtime_binary: DEFAULT_RUNTIME_BINARY.to_string(),
            max_body_bytes: MAX_BODY_BYTES,
            shutdown_delay: Duration::from_secs(1),
            drain_timeout: DRAIN_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    #[must_use]
    pub fn with_bind(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Set the transcript directory.
    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// Set the default endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.default_endpoint = endpoint.into();
        self
    }

    /// Force a protocol variant for all endpoints.
    #[must_use]
    pub const fn with_protocol(mut self, protocol: Option<ProtocolVariant>) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the default temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.default_temperature = temperature;
        self
    }

    /// Set the runtime executable.
    #[must_use]
    pub fn with_runtime_binary(mut self, binary: impl Into<String>) -> Self {
        self.runtime_binary = binary.into();
        self
    }

    /// Set the shutdown delay.
    #[must_use]
    pub const fn with_shutdown_delay(mut self, delay: Duration) -> Self {
        self.shutdown_delay = delay;
        self
    }

    /// Set the graceful drain bound.
    #[must_use]
    pub const fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Resolve the bind host and port to a socket address.
    ///
    /// # Errors
    /// Returns an error if the host does not resolve.
    pub async fn bind_addr(&self) -> io::Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("host {} has no addresses", self.host),
                )
            })
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }

        if self.default_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default endpoint must not be empty".to_string(),
            ));
        }

        if !self.default_temperature.is_finite() || self.default_temperature < 0.0 {
            return Err(ConfigError::Invalid(
                "default temperature must be a finite, non-negative number".to_string(),
            ));
        }

        if self.runtime_binary.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "runtime binary must not be empty".to_string(),
            ));
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max body size must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.default_endpoint, "http://localhost:11434");
        assert!((config.default_temperature - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.port, 5000);
        assert_eq!(config.max_body_bytes, 16 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = AppConfig::new()
            .with_bind("127.0.0.1", 8080)
            .with_endpoint("http://localhost:1234")
            .with_protocol(Some(ProtocolVariant::OpenAi))
            .with_temperature(0.2);

        assert_eq!(config.bind_addr().await.unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config.protocol, Some(ProtocolVariant::OpenAi));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(AppConfig::new().with_temperature(f64::NAN).validate().is_err());
        assert!(AppConfig::new().with_temperature(-1.0).validate().is_err());
        assert!(AppConfig::new().with_endpoint("  ").validate().is_err());
        assert!(AppConfig::new().with_runtime_binary("").validate().is_err());
        assert!(AppConfig::new().with_bind(" ", 5000).validate().is_err());
    }

    #[tokio::test]
    async fn test_bind_addr_resolves_host_names() {
        let addr = AppConfig::new().with_bind("localhost", 5001).bind_addr().await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 5001);
    }

    #[tokio::test]
    async fn test_bind_addr_reports_unresolvable_host() {
        let config = AppConfig::new().with_bind("no-such-host.invalid", 5000);
        assert!(config.bind_addr().await.is_err());
    }
}
