use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the launch core.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("All mirrors failed for {target:?}")]
    MirrorsExhausted { target: PathBuf },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Processor output missing: {0:?}")]
    OutputMissing(PathBuf),

    // ── Configuration ───────────────────────────────────
    #[error("Illegal pattern ({reason}): {pattern}")]
    Literal { pattern: String, reason: String },

    #[error("Missing variable `{key}` in {pattern}")]
    MissingVariable { key: String, pattern: String },

    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    #[error("Missing processor dependency: {0:?}")]
    MissingProcessorDependency(PathBuf),

    #[error("Invalid installer: {0}")]
    InvalidInstaller(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Launch validation ───────────────────────────────
    #[error("Version not found or invalid: {0}")]
    InvalidVersion(String),

    #[error("No account selected")]
    AccountMissing,

    #[error("Client jar not found: {0:?}")]
    ClientJarMissing(PathBuf),

    #[error("No compatible renderer available")]
    NoCompatibleRenderer,

    // ── Native / Java ───────────────────────────────────
    #[error("Native library {path:?} failed to load: {reason}")]
    NativeLoad { path: PathBuf, reason: String },

    #[error("Java execution failed: {0}")]
    JavaExecution(String),

    #[error("Processor {jar} exited with code {code:?}")]
    ProcessorFailed { jar: String, code: Option<i32> },

    // ── Scheduling ──────────────────────────────────────
    #[error("An install for {0} is already running")]
    InstallInProgress(String),

    #[error("Operation cancelled")]
    Cancelled,

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

/// Coarse grouping used by the orchestrator to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed grammar, missing variables or dependency files. Never retried.
    Configuration,
    /// Checksum mismatches. The offending file has already been removed.
    Integrity,
    /// Native libraries or renderers unavailable.
    Environment,
    /// The spawned runtime or a processor misbehaved.
    Process,
    Io,
    Network,
    Cancelled,
}

impl LauncherError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LauncherError::Literal { .. }
            | LauncherError::MissingVariable { .. }
            | LauncherError::InvalidMavenCoordinate(_)
            | LauncherError::MissingProcessorDependency(_)
            | LauncherError::InvalidInstaller(_)
            | LauncherError::Json(_)
            | LauncherError::InvalidVersion(_)
            | LauncherError::AccountMissing
            | LauncherError::ClientJarMissing(_)
            | LauncherError::InstallInProgress(_)
            | LauncherError::Other(_) => ErrorCategory::Configuration,
            LauncherError::Sha1Mismatch { .. } | LauncherError::OutputMissing(_) => {
                ErrorCategory::Integrity
            }
            LauncherError::NativeLoad { .. } | LauncherError::NoCompatibleRenderer => {
                ErrorCategory::Environment
            }
            LauncherError::JavaExecution(_) | LauncherError::ProcessorFailed { .. } => {
                ErrorCategory::Process
            }
            LauncherError::Io { .. } | LauncherError::Zip(_) => ErrorCategory::Io,
            LauncherError::Http(_)
            | LauncherError::DownloadFailed { .. }
            | LauncherError::MirrorsExhausted { .. } => ErrorCategory::Network,
            LauncherError::Cancelled => ErrorCategory::Cancelled,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// Hosts forward errors over IPC as plain strings.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
