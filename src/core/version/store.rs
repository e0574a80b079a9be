// ─── Manifest Store ───
// Reads and writes version JSON documents under `versions/<name>/<name>.json`.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::version_file::VersionJson;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::paths::GamePaths;

/// Maximum `inheritsFrom` chain length followed before giving up.
const MAX_INHERITANCE_DEPTH: usize = 8;

#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// The stored document as-is, unknown keys included.
    async fn load_raw(&self, name: &str) -> LauncherResult<serde_json::Value>;

    async fn save_raw(&self, name: &str, document: &serde_json::Value) -> LauncherResult<()>;

    fn exists(&self, name: &str) -> bool;

    /// Typed manifest with its `inheritsFrom` chain merged in. The result's
    /// `inherits_from` names the direct parent.
    async fn load_manifest(&self, name: &str) -> LauncherResult<VersionJson> {
        let mut current = self.load_raw(name).await?;
        let direct_parent = current
            .get("inheritsFrom")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        for _ in 0..MAX_INHERITANCE_DEPTH {
            let Some(parent_id) = current
                .get("inheritsFrom")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
            else {
                break;
            };

            debug!("{} inherits from {}", name, parent_id);
            let parent = self.load_raw(&parent_id).await?;
            current = VersionJson::merge_with_parent_json(&current, &parent);
        }

        let mut manifest: VersionJson = serde_json::from_value(current)?;
        if manifest.id.is_empty() {
            manifest.id = name.to_string();
        }
        // Keep the direct parent so callers can fall back to its client jar.
        manifest.inherits_from = direct_parent;
        if manifest.main_class.trim().is_empty() {
            return Err(LauncherError::InvalidVersion(format!(
                "{name}: mainClass missing"
            )));
        }
        Ok(manifest)
    }

    async fn save_manifest(&self, name: &str, manifest: &VersionJson) -> LauncherResult<()> {
        let document = serde_json::to_value(manifest)?;
        self.save_raw(name, &document).await
    }
}

/// File-system store rooted at a game directory.
pub struct FsVersionStore {
    paths: GamePaths,
}

impl FsVersionStore {
    pub fn new(paths: GamePaths) -> Self {
        Self { paths }
    }

    fn json_path(&self, name: &str) -> PathBuf {
        self.paths.version_json(name)
    }
}

#[async_trait]
impl ManifestStore for FsVersionStore {
    async fn load_raw(&self, name: &str) -> LauncherResult<serde_json::Value> {
        let path = self.json_path(name);
        if !path.is_file() {
            return Err(LauncherError::InvalidVersion(name.to_string()));
        }
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LauncherError::io(&path, e))?;
        serde_json::from_str(&raw).map_err(LauncherError::from)
    }

    async fn save_raw(&self, name: &str, document: &serde_json::Value) -> LauncherResult<()> {
        let path = self.json_path(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(document)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| LauncherError::io(&path, e))
    }

    fn exists(&self, name: &str) -> bool {
        self.json_path(name).is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "gamecore-store-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn resolves_inheritance_chain() {
        let root = temp_root("inherit");
        let store = FsVersionStore::new(GamePaths::new(&root));

        store
            .save_raw(
                "1.20.1",
                &serde_json::json!({
                    "id": "1.20.1",
                    "mainClass": "net.minecraft.client.main.Main",
                    "libraries": [{"name": "a:vanilla:1.0"}],
                    "javaVersion": {"majorVersion": 17}
                }),
            )
            .await
            .unwrap();
        store
            .save_raw(
                "1.20.1-forge",
                &serde_json::json!({
                    "id": "1.20.1-forge",
                    "inheritsFrom": "1.20.1",
                    "mainClass": "cpw.mods.bootstraplauncher.BootstrapLauncher",
                    "libraries": [{"name": "b:forge:1.0"}],
                    "customKey": true
                }),
            )
            .await
            .unwrap();

        let merged = store.load_manifest("1.20.1-forge").await.unwrap();
        assert_eq!(merged.id, "1.20.1-forge");
        assert_eq!(merged.main_class, "cpw.mods.bootstraplauncher.BootstrapLauncher");
        assert_eq!(merged.required_java_major(), 17);
        assert_eq!(merged.inherits_from.as_deref(), Some("1.20.1"));
        let names: Vec<_> = merged.libraries.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["b:forge:1.0", "a:vanilla:1.0"]);

        let raw = store.load_raw("1.20.1-forge").await.unwrap();
        assert_eq!(raw["customKey"], true);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn missing_version_is_invalid() {
        let root = temp_root("missing");
        let store = FsVersionStore::new(GamePaths::new(&root));
        let err = store.load_manifest("nope").await.unwrap_err();
        assert!(matches!(err, LauncherError::InvalidVersion(_)));
        assert!(!store.exists("nope"));
        let _ = std::fs::remove_dir_all(&root);
    }
}
