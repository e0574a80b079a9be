// ─── Launcher Settings ───
// Launch defaults persisted as `launcher_settings.json`.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{LauncherError, LauncherResult};

const SETTINGS_FILE: &str = "launcher_settings.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LauncherSettings {
    /// Runtime used when neither the version nor auto-pick decides.
    pub java_runtime: Option<String>,
    /// Whitespace-separated JVM arguments applied to every launch.
    pub jvm_args: String,
    pub ram_allocation_mb: u32,
    pub renderer: Option<String>,
    pub driver: Option<String>,
    /// Pick the smallest runtime satisfying the manifest's `javaVersion`.
    pub auto_pick_runtime: bool,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            java_runtime: None,
            jvm_args: String::new(),
            ram_allocation_mb: default_ram_allocation_mb(),
            renderer: None,
            driver: None,
            auto_pick_runtime: true,
        }
    }
}

/// A quarter of physical memory, kept within 1–8 GiB.
pub fn default_ram_allocation_mb() -> u32 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    let total_mb = system.total_memory() / (1024 * 1024);
    (total_mb / 4).clamp(1024, 8192) as u32
}

pub trait SettingsProvider: Send + Sync {
    fn settings(&self) -> LauncherSettings;
}

/// Settings backed by a JSON file in the launcher home.
pub struct FileSettings {
    path: PathBuf,
    current: RwLock<LauncherSettings>,
}

impl FileSettings {
    /// Load settings from `<dir>/launcher_settings.json`, falling back to
    /// defaults when the file is missing or unreadable.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(SETTINGS_FILE);
        let current = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring malformed {:?}: {}", path, e);
                LauncherSettings::default()
            }),
            Err(_) => LauncherSettings::default(),
        };
        Self {
            path,
            current: RwLock::new(current),
        }
    }

    pub fn update(&self, settings: LauncherSettings) -> LauncherResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&self.path, json).map_err(|e| LauncherError::io(&self.path, e))?;
        if let Ok(mut current) = self.current.write() {
            *current = settings;
        }
        Ok(())
    }
}

impl SettingsProvider for FileSettings {
    fn settings(&self) -> LauncherSettings {
        self.current
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl SettingsProvider for LauncherSettings {
    fn settings(&self) -> LauncherSettings {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("gamecore-settings-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let store = FileSettings::load(&dir);
        assert!(store.settings().auto_pick_runtime);

        let mut changed = store.settings();
        changed.ram_allocation_mb = 3072;
        changed.renderer = Some("opengles3_ltw".into());
        store.update(changed.clone()).unwrap();

        let reloaded = FileSettings::load(&dir);
        assert_eq!(reloaded.settings(), changed);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let parsed: LauncherSettings = serde_json::from_str(r#"{"jvm_args":"-XX:+UseG1GC"}"#).unwrap();
        assert_eq!(parsed.jvm_args, "-XX:+UseG1GC");
        assert!(parsed.ram_allocation_mb >= 1024);
    }
}
