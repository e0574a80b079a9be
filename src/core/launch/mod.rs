pub mod arguments;
pub mod bootstrap;
pub mod classpath;
pub mod context;
pub mod native;
pub mod renderer;
pub mod task;
pub mod user_args;

pub use arguments::{build_game_args, build_jvm_args, LaunchVariables, TemplatedArgs};
pub use bootstrap::{BootstrapSequencer, GameLaunch, JvmLaunch, LaunchKind, LaunchReport, LaunchStage};
pub use classpath::{join_classpath, resolve_classpath};
pub use context::{LaunchContext, WindowSize};
pub use native::{LoadOutcome, LoadReport, NativeLinker, SystemLinker};
pub use renderer::{Renderer, RendererPlugin, RendererRegistry};
pub use task::{CommandSpec, LaunchOutcome, ProcessLauncher, SystemProcessLauncher};
