// ─── Launch Context ───
// Everything one game launch needs, resolved before the bootstrap starts.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::core::auth::LaunchAccountProfile;
use crate::core::java::JavaRuntime;
use crate::core::paths::GamePaths;
use crate::core::version::{RuleEnv, VersionJson};

pub const CUSTOM_RESOLUTION_FEATURE: &str = "has_custom_resolution";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct LaunchContext {
    pub version_name: String,
    /// Manifest with its `inheritsFrom` chain already merged.
    pub manifest: VersionJson,
    pub runtime: JavaRuntime,
    pub account: Option<LaunchAccountProfile>,
    /// Whitespace-separated user JVM arguments.
    pub custom_jvm_args: String,
    pub ram_mb: u32,
    pub window: Option<WindowSize>,
    /// Requested renderer id; the first compatible one is used otherwise.
    pub renderer: Option<String>,
    pub driver: Option<String>,
    /// Overrides `paths.root()` as the game directory.
    pub game_dir: Option<PathBuf>,
    pub version_type: Option<String>,
    /// `host[:port]` to join on start.
    pub server: Option<String>,
    pub quick_play_singleplayer: Option<String>,
    /// Added to, and overriding, the computed `${…}` variables.
    pub extra_variables: BTreeMap<String, String>,
}

impl LaunchContext {
    pub fn new(version_name: &str, manifest: VersionJson, runtime: JavaRuntime) -> Self {
        Self {
            version_name: version_name.to_string(),
            manifest,
            runtime,
            account: None,
            custom_jvm_args: String::new(),
            ram_mb: 2048,
            window: None,
            renderer: None,
            driver: None,
            game_dir: None,
            version_type: None,
            server: None,
            quick_play_singleplayer: None,
            extra_variables: BTreeMap::new(),
        }
    }

    pub fn with_account(mut self, account: LaunchAccountProfile) -> Self {
        self.account = Some(account);
        self
    }

    pub fn with_window(mut self, width: u32, height: u32) -> Self {
        self.window = Some(WindowSize { width, height });
        self
    }

    pub fn game_dir(&self, paths: &GamePaths) -> PathBuf {
        self.game_dir
            .clone()
            .unwrap_or_else(|| paths.root().to_path_buf())
    }

    /// Rule environment for this launch: the running platform, plus the
    /// custom resolution feature when a window size is set.
    pub fn rule_env(&self) -> RuleEnv {
        let env = RuleEnv::host();
        if self.window.is_some() {
            env.with_feature(CUSTOM_RESOLUTION_FEATURE)
        } else {
            env
        }
    }
}
