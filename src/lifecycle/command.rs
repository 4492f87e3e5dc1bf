//! Host command execution behind a trait seam.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use super::error::LifecycleError;

/// Boxed future type for command runner operations.
pub type CommandFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A program and its arguments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Build a command spec.
    #[must_use]
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs host commands on behalf of the lifecycle probe.
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion with output discarded.
    ///
    /// Resolves to `Ok(true)` when the command exits successfully, `Ok(false)` on a
    /// non-zero exit.
    ///
    /// # Errors
    /// Returns an error if the command cannot be spawned or exceeds `timeout`.
    fn run(&self, spec: CommandSpec, timeout: Duration) -> CommandFuture<'_, Result<bool, LifecycleError>>;

    /// Launch a long-running command detached from this process, without waiting.
    ///
    /// # Errors
    /// Returns an error if the command cannot be spawned.
    fn spawn_detached(&self, spec: &CommandSpec) -> Result<(), LifecycleError>;
}

/// [`CommandRunner`] backed by real OS processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, spec: CommandSpec, timeout: Duration) -> CommandFuture<'_, Result<bool, LifecycleError>> {
        Box::pin(async move {
            let spawn_error = |source| LifecycleError::Spawn {
                command: spec.to_string(),
                source,
            };

            // Killed on drop, so a timed-out command does not linger.
            let mut child = tokio::process::Command::new(&spec.program)
                .args(&spec.args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .map_err(spawn_error)?;

            match tokio::time::timeout(timeout, child.wait()).await {
                Ok(status) => Ok(status.map_err(spawn_error)?.success()),
                Err(_) => Err(LifecycleError::Timeout {
                    command: spec.to_string(),
                    secs: timeout.as_secs(),
                }),
            }
        })
    }

    fn spawn_detached(&self, spec: &CommandSpec) -> Result<(), LifecycleError> {
        let mut command = std::process::Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|source| LifecycleError::Spawn {
            command: spec.to_string(),
            source,
        })?;
        let pid = child.id();
        tracing::info!("Launched `{spec}` in background (pid {pid})");

        // Reap the child when it exits so it does not linger as a zombie.
        let label = spec.to_string();
        std::thread::spawn(move || match child.wait() {
            Ok(status) => tracing::info!("Background `{label}` (pid {pid}) exited: {status}"),
            Err(e) => tracing::warn!("Failed to wait for `{label}` (pid {pid}): {e}"),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_args() {
        let spec = CommandSpec::new("brew", &["services", "start", "ollama"]);
        assert_eq!(spec.to_string(), "brew services start ollama");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let spec = CommandSpec::new("definitely-not-a-real-program-4f2a", &[]);
        let result = SystemCommandRunner.run(spec, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(LifecycleError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_is_reported() {
        let ok = SystemCommandRunner
            .run(CommandSpec::new("true", &[]), Duration::from_secs(5))
            .await;
        let failed = SystemCommandRunner
            .run(CommandSpec::new("false", &[]), Duration::from_secs(5))
            .await;
        assert!(matches!(ok, Ok(true)));
        assert!(matches!(failed, Ok(false)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_detached_child_is_reaped() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = format!("echo $$ > {}.tmp && mv {0}.tmp {0}", pid_file.display());
        SystemCommandRunner
            .spawn_detached(&CommandSpec::new("sh", &["-c", &script]))
            .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            // An exited but unreaped child keeps its /proc entry as a zombie.
            let gone = std::fs::read_to_string(&pid_file)
                .is_ok_and(|pid| !std::path::Path::new(&format!("/proc/{}", pid.trim())).exists());
            if gone {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "background child was not reaped");
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_enforced() {
        let result = SystemCommandRunner
            .run(CommandSpec::new("sleep", &["5"]), Duration::from_millis(100))
            .await;
        assert!(matches!(result, Err(LifecycleError::Timeout { .. })));
    }
}
