pub mod app_state;

pub use app_state::{ExitCallback, GameCore, InstallJob, LaunchJob, LaunchRequest, LaunchState};
