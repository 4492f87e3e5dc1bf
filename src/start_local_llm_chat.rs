//! Startup helpers for the Local LLM Chat server.
//!
//! Foreground mode runs the server in this process. Background mode re-executes
//! the binary detached with `--foreground` and output sent to a log file.

use std::fs::File;
use std::net::UdpSocket;
use std::path::PathBuf;
use std::process::{Command, ExitCode, Stdio};

use clap::Parser;

use crate::config::{AppConfig, DEFAULT_ENDPOINT, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TEMPERATURE};
use crate::lifecycle::probe::DEFAULT_RUNTIME_BINARY;
use crate::llm::ProtocolVariant;
use crate::server::{self, AppState};
use crate::storage::TranscriptStore;

/// Log file written by the detached background server.
pub const BACKGROUND_LOG_FILE: &str = "local_llm_chat.log";

/// Command line options.
#[derive(Clone, Debug, Parser)]
#[command(name = "local-llm-chat", version, about = "Local LLM Chat Interface")]
pub struct Cli {
    /// Host name or IP address to bind to.
    #[arg(long, env = "LOCAL_LLM_CHAT_HOST", default_value = DEFAULT_HOST)]
    pub host: String,
    /// Port to bind to.
    #[arg(long, env = "LOCAL_LLM_CHAT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Run in debug mode (verbose logs, stays in the foreground).
    #[arg(long)]
    pub debug: bool,
    /// Run in the foreground instead of detaching.
    #[arg(long)]
    pub foreground: bool,
    /// Directory for saved conversations.
    #[arg(long, env = "LOCAL_LLM_CHAT_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,
    /// Default LLM endpoint used when the browser does not send one.
    #[arg(long, env = "LOCAL_LLM_CHAT_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
    /// Force the wire protocol (`ollama` or `openai`) instead of inferring it from the endpoint.
    #[arg(long, env = "LOCAL_LLM_CHAT_PROTOCOL")]
    pub protocol: Option<ProtocolVariant>,
    /// Default sampling temperature.
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f64,
    /// Runtime executable probed and launched by the status endpoints.
    #[arg(long, env = "LOCAL_LLM_CHAT_RUNTIME_BINARY", default_value = DEFAULT_RUNTIME_BINARY)]
    pub runtime_binary: String,
}

impl Cli {
    /// Build the application configuration from the parsed options.
    #[must_use]
    pub fn to_config(&self) -> AppConfig {
        let config = AppConfig::new()
            .with_bind(self.host.clone(), self.port)
            .with_endpoint(self.endpoint.clone())
            .with_protocol(self.protocol)
            .with_temperature(self.temperature)
            .with_runtime_binary(self.runtime_binary.clone());

        match &self.storage_dir {
            Some(dir) => config.with_storage_dir(dir.clone()),
            None => config,
        }
    }

    /// Whether the launcher should detach into the background.
    #[must_use]
    pub const fn wants_background(&self) -> bool {
        !self.debug && !self.foreground
    }

    /// Directory conversations end up in, if it can be determined.
    #[must_use]
    pub fn resolved_storage_dir(&self) -> Option<PathBuf> {
        self.storage_dir
            .clone()
            .or_else(|| TranscriptStore::default_dir().ok())
    }
}

/// Run the server in this process until it is shut down.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run(cli: &Cli) -> ExitCode {
    init_tracing(cli.debug);

    tracing::info!("Starting Local LLM Chat v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Default LLM endpoint: {}", cli.endpoint);

    let state = match AppState::new(cli.to_config()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to create state: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::run_server(state)) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

/// Whether background mode is available on this platform.
#[must_use]
pub const fn background_supported() -> bool {
    cfg!(unix)
}

/// Re-launch this binary detached with `--foreground`, logging to [`BACKGROUND_LOG_FILE`].
///
/// # Errors
/// Returns an error if the executable path, log file or child process cannot be set up.
pub fn spawn_background() -> std::io::Result<u32> {
    let exe = std::env::current_exe()?;
    let log = File::create(BACKGROUND_LOG_FILE)?;
    let log_err = log.try_clone()?;

    let mut command = Command::new(exe);
    command
        .args(std::env::args_os().skip(1))
        .arg("--foreground")
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err));

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let child = command.spawn()?;
    Ok(child.id())
}

/// Best-effort LAN address of this machine, or `localhost`.
#[must_use]
pub fn local_ip() -> String {
    // No packet is sent; connecting a UDP socket only selects the outbound interface.
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map_or_else(|_| "localhost".to_string(), |addr| addr.ip().to_string())
}
