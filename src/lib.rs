pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::error::{ErrorCategory, LauncherError, LauncherResult};
pub use crate::core::launch::{LaunchContext, LaunchOutcome};
pub use crate::core::loaders::{InstallRequest, InstallResult};
pub use crate::core::state::GameCore;

/// Initialize structured logging for hosts embedding the launch core.
///
/// Safe to call more than once; only the first call installs the subscriber.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gamecore=debug")),
        )
        .try_init();

    tracing::info!("gamecore {} ready", env!("CARGO_PKG_VERSION"));
}
