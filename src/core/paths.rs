// ─── Game Paths ───
// Directory layout of a game root and the runtime support directories.

use std::path::{Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

const APP_DIR_NAME: &str = "gamecore";

#[derive(Debug, Clone)]
pub struct GamePaths {
    root: PathBuf,
    home_dir: PathBuf,
    cache_dir: PathBuf,
    native_lib_dir: PathBuf,
    runtimes_dir: PathBuf,
}

impl GamePaths {
    /// Layout rooted at an explicit game directory. Support directories
    /// live next to it under `<root>/.launcher`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let support = root.join(".launcher");
        Self {
            home_dir: support.clone(),
            cache_dir: support.join("cache"),
            native_lib_dir: support.join("natives"),
            runtimes_dir: support.join("runtimes"),
            root,
        }
    }

    /// Layout under the platform data directory (`dirs::data_dir()/gamecore`).
    pub fn from_data_dir() -> LauncherResult<Self> {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);
        let base = canonical_or_create_dir(&base)?;

        Ok(Self {
            root: base.join("game"),
            cache_dir: base.join("cache"),
            native_lib_dir: base.join("natives"),
            runtimes_dir: base.join("runtimes"),
            home_dir: base,
        })
    }

    pub fn with_native_lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.native_lib_dir = dir.into();
        self
    }

    pub fn with_runtimes_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtimes_dir = dir.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Directory holding the launcher's bundled native libraries.
    pub fn native_lib_dir(&self) -> &Path {
        &self.native_lib_dir
    }

    pub fn runtimes_dir(&self) -> &Path {
        &self.runtimes_dir
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn version_dir(&self, name: &str) -> PathBuf {
        self.versions_dir().join(name)
    }

    pub fn version_json(&self, name: &str) -> PathBuf {
        self.version_dir(name).join(format!("{name}.json"))
    }

    pub fn version_jar(&self, name: &str) -> PathBuf {
        self.version_dir(name).join(format!("{name}.jar"))
    }

    pub fn natives_dir(&self, name: &str) -> PathBuf {
        self.version_dir(name).join("natives")
    }

    /// Marker written once a loader install finished every stage.
    pub fn installed_marker(&self, name: &str) -> PathBuf {
        self.version_dir(name).join(".installed")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(".temp")
    }

    pub fn installer_cache_dir(&self) -> PathBuf {
        self.temp_dir().join("forge_installer_cache")
    }
}

pub(crate) fn canonical_or_create_dir(path: &Path) -> LauncherResult<PathBuf> {
    std::fs::create_dir_all(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::canonicalize(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_layout() {
        let paths = GamePaths::new("/games/main");
        assert_eq!(
            paths.version_json("1.20.1-forge-47.2.0"),
            PathBuf::from("/games/main/versions/1.20.1-forge-47.2.0/1.20.1-forge-47.2.0.json")
        );
        assert_eq!(
            paths.version_jar("1.20.1"),
            PathBuf::from("/games/main/versions/1.20.1/1.20.1.jar")
        );
        assert_eq!(
            paths.installer_cache_dir(),
            PathBuf::from("/games/main/.temp/forge_installer_cache")
        );
    }

    #[test]
    fn native_dir_override() {
        let paths = GamePaths::new("/g").with_native_lib_dir("/app/lib");
        assert_eq!(paths.native_lib_dir(), Path::new("/app/lib"));
        assert_eq!(paths.libraries_dir(), PathBuf::from("/g/libraries"));
    }
}
