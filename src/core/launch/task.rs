// ─── Launch Task ───
// Spawns the runtime as a child process and waits for it to exit.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

/// Exit of a launched process. Exit codes are data, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LaunchOutcome {
    pub exit_code: i32,
    /// The process was terminated by a signal; `exit_code` is the signal number.
    pub is_signal: bool,
}

impl LaunchOutcome {
    pub const SPAWN_FAILED: LaunchOutcome = LaunchOutcome {
        exit_code: -1,
        is_signal: false,
    };

    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.is_signal
    }
}

/// Fully resolved command line and environment of one launch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Set on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    pub cwd: PathBuf,
}

impl CommandSpec {
    /// argv with the program first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

#[async_trait]
pub trait RunningProcess: Send {
    async fn wait(&mut self) -> LauncherResult<LaunchOutcome>;

    async fn kill(&mut self) -> LauncherResult<()>;
}

#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn spawn(&self, spec: &CommandSpec) -> LauncherResult<Box<dyn RunningProcess>>;
}

/// Spawns through `tokio::process`, output inherited from this process.
pub struct SystemProcessLauncher;

#[async_trait]
impl ProcessLauncher for SystemProcessLauncher {
    async fn spawn(&self, spec: &CommandSpec) -> LauncherResult<Box<dyn RunningProcess>> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        info!("Launching with Java: {:?}", spec.program);
        debug!("Command (copy/paste): {}", format_command_for_logs(spec));

        let child = cmd
            .spawn()
            .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;
        Ok(Box::new(ChildProcess(child)))
    }
}

struct ChildProcess(Child);

#[async_trait]
impl RunningProcess for ChildProcess {
    async fn wait(&mut self) -> LauncherResult<LaunchOutcome> {
        let status = self
            .0
            .wait()
            .await
            .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;
        Ok(outcome_from_status(status))
    }

    async fn kill(&mut self) -> LauncherResult<()> {
        self.0
            .kill()
            .await
            .map_err(|e| LauncherError::JavaExecution(e.to_string()))
    }
}

fn outcome_from_status(status: std::process::ExitStatus) -> LaunchOutcome {
    if let Some(code) = status.code() {
        return LaunchOutcome {
            exit_code: code,
            is_signal: false,
        };
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return LaunchOutcome {
                exit_code: signal,
                is_signal: true,
            };
        }
    }

    LaunchOutcome::SPAWN_FAILED
}

/// `value` prepended to the inherited `var_name`, or `fallback` when unset.
pub fn prepend_env_path(var_name: &str, value: &str, fallback: &str) -> String {
    match std::env::var(var_name) {
        Ok(existing) if !existing.trim().is_empty() => format!("{}:{}", value, existing),
        _ if fallback.is_empty() => value.to_string(),
        _ => format!("{}:{}", value, fallback),
    }
}

pub fn format_command_for_logs(spec: &CommandSpec) -> String {
    spec.argv()
        .iter()
        .map(|arg| shell_escape(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '=' | '+' | ',')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}

/// Launcher log name: `<kind>_<detail>_<millis>` (detail omitted when empty).
pub fn log_name(kind: &str, detail: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    if detail.is_empty() {
        format!("{}_{}", kind, millis)
    } else {
        format!("{}_{}_{}", kind, detail, millis)
    }
}
