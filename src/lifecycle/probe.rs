//! Detects whether the local model runtime is installed and serving, and starts it.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::llm::{LlmClient, ProtocolVariant};

use super::command::{CommandRunner, CommandSpec, SystemCommandRunner};
use super::error::LifecycleError;
use super::platform::Platform;

/// Default runtime executable.
pub const DEFAULT_RUNTIME_BINARY: &str = "ollama";
/// Where users are sent when the runtime is missing.
pub const DEFAULT_INSTALL_URL: &str = "https://ollama.com/download";

/// Time limit for the `which`/`where` lookup.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
/// Time limit for a service manager start command.
const START_TIMEOUT: Duration = Duration::from_secs(10);

const INSTALL_HINT: &str =
    "Please install Ollama using the installation scripts with the local model option.";
const MANUAL_START_HINT: &str = "Try running 'ollama serve' manually in a terminal";

/// Snapshot of the runtime state, computed fresh on every query.
#[derive(Clone, Debug, Serialize)]
pub struct ServiceStatus {
    /// Whether the runtime answered a model listing with at least one model.
    pub running: bool,
    /// Whether the runtime executable was found on `PATH`.
    pub installed: bool,
    /// Endpoint that was probed.
    pub endpoint: String,
    /// Models advertised by the runtime.
    pub models: Vec<String>,
    /// First advertised model.
    ///
    /// This is only the first entry of the listing; the runtime may not have it
    /// loaded, so treat it as a hint.
    pub active_model: Option<String>,
    /// Host platform name.
    pub platform: Platform,
}

/// Result of a start attempt.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StartOutcome {
    /// Whether a start mechanism was invoked successfully.
    pub success: bool,
    /// Human readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Installation page, when the runtime is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_url: Option<String>,
}

impl StartOutcome {
    fn started(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn with_install_url(mut self, url: impl Into<String>) -> Self {
        self.install_url = Some(url.into());
        self
    }
}

/// Probes and starts the local model runtime.
#[derive(Clone)]
pub struct ServiceProbe {
    llm: LlmClient,
    runner: Arc<dyn CommandRunner>,
    platform: Platform,
    binary: String,
    install_url: String,
}

impl ServiceProbe {
    /// Create a probe that runs real host commands on the current platform.
    #[must_use]
    pub fn new(llm: LlmClient) -> Self {
        Self::with_runner(llm, Arc::new(SystemCommandRunner), Platform::current())
    }

    /// Create a probe with a custom command runner and platform.
    #[must_use]
    pub fn with_runner(llm: LlmClient, runner: Arc<dyn CommandRunner>, platform: Platform) -> Self {
        Self {
            llm,
            runner,
            platform,
            binary: DEFAULT_RUNTIME_BINARY.to_string(),
            install_url: DEFAULT_INSTALL_URL.to_string(),
        }
    }

    /// Use a different runtime executable name or path.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Platform this probe targets.
    #[must_use]
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Look the runtime executable up on `PATH`.
    ///
    /// # Errors
    /// Returns an error if the lookup program itself cannot run or times out.
    pub async fn is_installed(&self) -> Result<bool, LifecycleError> {
        let lookup = CommandSpec::new(self.platform.lookup_program(), &[self.binary.as_str()]);
        self.runner.run(lookup, LOOKUP_TIMEOUT).await
    }

    /// Report whether the runtime is installed and serving. Never fails.
    pub async fn check_status(&self, endpoint: &str, protocol: Option<ProtocolVariant>) -> ServiceStatus {
        let installed = match self.is_installed().await {
            Ok(installed) => installed,
            Err(e) => {
                tracing::error!("Error checking if {} is installed: {e}", self.binary);
                false
            }
        };

        let models = self.llm.list_models(endpoint, protocol).await;
        let running = !models.is_empty();
        let active_model = models.first().cloned();
        tracing::debug!(installed, running, "LLM status for {endpoint}");

        ServiceStatus {
            running,
            installed,
            endpoint: endpoint.to_string(),
            models,
            active_model,
            platform: self.platform.clone(),
        }
    }

    /// Start the runtime: service manager first, then a detached `serve` process.
    ///
    /// Success only means a start mechanism ran; readiness is not polled.
    pub async fn start_service(&self) -> StartOutcome {
        match self.is_installed().await {
            Ok(true) => {}
            Ok(false) => {
                return StartOutcome::failed("Ollama is not installed")
                    .with_message(INSTALL_HINT)
                    .with_install_url(self.install_url.clone());
            }
            Err(e) => {
                return StartOutcome::failed(format!("Error checking Ollama installation: {e}"));
            }
        }

        if let Some((command, message)) = self.service_manager_command() {
            match self.runner.run(command.clone(), START_TIMEOUT).await {
                Ok(true) => {
                    tracing::info!("{message}");
                    return StartOutcome::started(message);
                }
                Ok(false) => tracing::warn!("`{command}` failed, falling back to `serve`"),
                Err(e) => tracing::warn!("{e}, falling back to `serve`"),
            }
        }

        let serve = CommandSpec::new(self.binary.as_str(), &["serve"]);
        match self.runner.spawn_detached(&serve) {
            Ok(()) => StartOutcome::started("Ollama started in background"),
            Err(e) => {
                tracing::error!("Error starting LLM service: {e}");
                StartOutcome::failed(e.to_string()).with_message(MANUAL_START_HINT)
            }
        }
    }

    fn service_manager_command(&self) -> Option<(CommandSpec, &'static str)> {
        match self.platform {
            Platform::Linux => Some((
                CommandSpec::new("systemctl", &["start", "ollama"]),
                "Ollama service started via systemctl",
            )),
            Platform::MacOs => Some((
                CommandSpec::new("brew", &["services", "start", "ollama"]),
                "Ollama service started via brew services",
            )),
            Platform::Windows => Some((
                CommandSpec::new("net", &["start", "Ollama"]),
                "Ollama service started",
            )),
            Platform::Other(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::super::command::CommandFuture;
    use super::*;

    const UNREACHABLE: &str = "http://127.0.0.1:9";

    #[derive(Clone, Copy)]
    enum Scripted {
        Succeeds,
        Fails,
        Missing,
    }

    struct FakeRunner {
        scripted: HashMap<&'static str, Scripted>,
        spawn_ok: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        fn new(scripted: &[(&'static str, Scripted)], spawn_ok: bool) -> Arc<Self> {
            Arc::new(Self {
                scripted: scripted.iter().copied().collect(),
                spawn_ok,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    fn not_found(command: String) -> LifecycleError {
        LifecycleError::Spawn {
            command,
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, spec: CommandSpec, _timeout: Duration) -> CommandFuture<'_, Result<bool, LifecycleError>> {
            self.record(spec.to_string());
            let outcome = self
                .scripted
                .get(spec.program.as_str())
                .copied()
                .unwrap_or(Scripted::Missing);
            Box::pin(async move {
                match outcome {
                    Scripted::Succeeds => Ok(true),
                    Scripted::Fails => Ok(false),
                    Scripted::Missing => Err(not_found(spec.to_string())),
                }
            })
        }

        fn spawn_detached(&self, spec: &CommandSpec) -> Result<(), LifecycleError> {
            self.record(format!("spawn {spec}"));
            if self.spawn_ok {
                Ok(())
            } else {
                Err(not_found(spec.to_string()))
            }
        }
    }

    fn probe(runner: Arc<FakeRunner>, platform: Platform) -> ServiceProbe {
        let llm = LlmClient::with_timeouts(Duration::from_secs(2), Duration::from_secs(2))
            .unwrap();
        ServiceProbe::with_runner(llm, runner, platform)
    }

    #[tokio::test]
    async fn test_status_when_runtime_absent() {
        let runner = FakeRunner::new(&[("which", Scripted::Fails)], true);
        let status = probe(runner.clone(), Platform::Linux)
            .check_status(UNREACHABLE, None)
            .await;

        assert!(!status.installed);
        assert!(!status.running);
        assert!(status.models.is_empty());
        assert!(status.active_model.is_none());
        assert_eq!(runner.calls(), vec!["which ollama".to_string()]);
    }

    #[tokio::test]
    async fn test_status_lookup_error_degrades_to_not_installed() {
        let runner = FakeRunner::new(&[], true);
        let status = probe(runner, Platform::Linux)
            .check_status(UNREACHABLE, None)
            .await;
        assert!(!status.installed);
    }

    #[tokio::test]
    async fn test_status_running_uses_first_model() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"mistral:7b"},{"name":"llama3:8b"}]}"#)
            .create_async()
            .await;

        let runner = FakeRunner::new(&[("where", Scripted::Succeeds)], true);
        let status = probe(runner.clone(), Platform::Windows)
            .check_status(&server.url(), Some(ProtocolVariant::Ollama))
            .await;

        assert!(status.installed);
        assert!(status.running);
        assert_eq!(status.active_model.as_deref(), Some("mistral:7b"));
        assert_eq!(status.models.len(), 2);
        assert_eq!(runner.calls(), vec!["where ollama".to_string()]);
    }

    #[tokio::test]
    async fn test_start_refuses_when_not_installed() {
        let runner = FakeRunner::new(&[("which", Scripted::Fails)], true);
        let outcome = probe(runner.clone(), Platform::Linux).start_service().await;

        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Ollama is not installed"));
        assert_eq!(outcome.install_url.as_deref(), Some(DEFAULT_INSTALL_URL));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_start_via_systemctl() {
        let runner = FakeRunner::new(
            &[("which", Scripted::Succeeds), ("systemctl", Scripted::Succeeds)],
            true,
        );
        let outcome = probe(runner.clone(), Platform::Linux).start_service().await;

        assert_eq!(
            outcome,
            StartOutcome::started("Ollama service started via systemctl")
        );
        assert_eq!(
            runner.calls(),
            vec!["which ollama".to_string(), "systemctl start ollama".to_string()]
        );
    }

    #[tokio::test]
    async fn test_start_falls_back_to_serve() {
        let runner = FakeRunner::new(
            &[("which", Scripted::Succeeds), ("brew", Scripted::Fails)],
            true,
        );
        let outcome = probe(runner.clone(), Platform::MacOs).start_service().await;

        assert_eq!(outcome, StartOutcome::started("Ollama started in background"));
        assert_eq!(
            runner.calls().last().map(String::as_str),
            Some("spawn ollama serve")
        );
    }

    #[tokio::test]
    async fn test_start_falls_back_when_service_manager_missing() {
        let runner = FakeRunner::new(&[("where", Scripted::Succeeds)], true);
        let outcome = probe(runner.clone(), Platform::Windows).start_service().await;

        assert!(outcome.success);
        assert_eq!(
            runner.calls(),
            vec![
                "where ollama".to_string(),
                "net start Ollama".to_string(),
                "spawn ollama serve".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_start_reports_failure_when_all_paths_fail() {
        let runner = FakeRunner::new(
            &[("which", Scripted::Succeeds), ("systemctl", Scripted::Fails)],
            false,
        );
        let outcome = probe(runner, Platform::Linux).start_service().await;

        assert!(!outcome.success);
        assert!(outcome.error.is_some());
        assert_eq!(outcome.message.as_deref(), Some(MANUAL_START_HINT));
    }

    #[tokio::test]
    async fn test_other_platform_serves_directly() {
        let runner = FakeRunner::new(&[("which", Scripted::Succeeds)], true);
        let outcome = probe(runner.clone(), Platform::Other("freebsd".to_string()))
            .with_binary("/opt/ollama/bin/ollama")
            .start_service()
            .await;

        assert!(outcome.success);
        assert_eq!(
            runner.calls(),
            vec![
                "which /opt/ollama/bin/ollama".to_string(),
                "spawn /opt/ollama/bin/ollama serve".to_string()
            ]
        );
    }

    #[test]
    fn test_outcome_omits_absent_fields() {
        let json = serde_json::to_value(StartOutcome::started("ok")).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "message": "ok"}));
    }
}
