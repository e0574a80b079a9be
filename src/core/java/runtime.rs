// ─── Java Runtimes ───
// Runtimes unpacked under the runtimes directory, one sub-directory each,
// described by the JDK `release` file.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

const JAVA_VERSION_KEY: &str = "JAVA_VERSION=\"";
const OS_ARCH_KEY: &str = "OS_ARCH=\"";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JavaRuntime {
    pub name: String,
    /// Runtime root (the directory holding `bin/` and `release`).
    pub home: PathBuf,
    pub version: Option<String>,
    pub arch: Option<String>,
    /// Feature release: 8, 17, 21… `0` when unknown.
    pub major: u32,
    /// JDK 8 layouts keep the actual runtime under `jre/`.
    pub is_jdk8: bool,
}

impl JavaRuntime {
    /// Describe the runtime rooted at `home`. A missing or unreadable
    /// `release` file yields a runtime of unknown version.
    pub fn load(name: &str, home: &Path) -> Self {
        let mut runtime = Self {
            name: name.to_string(),
            home: home.to_path_buf(),
            version: None,
            arch: None,
            major: 0,
            is_jdk8: home.join("jre").join("bin").is_dir(),
        };

        let release = home.join("release");
        match std::fs::read_to_string(&release) {
            Ok(content) => {
                runtime.version = extract_quoted(&content, JAVA_VERSION_KEY);
                runtime.arch = extract_quoted(&content, OS_ARCH_KEY);
                runtime.major = runtime
                    .version
                    .as_deref()
                    .map(parse_major_version)
                    .unwrap_or(0);
            }
            Err(e) if release.exists() => {
                warn!("Failed to read {:?}: {}", release, e);
            }
            Err(_) => debug!("Runtime {} has no release file", name),
        }

        runtime
    }

    /// `JAVA_HOME` for the runtime: `<home>/jre` on JDK 8 layouts.
    pub fn java_home(&self) -> PathBuf {
        if self.is_jdk8 {
            self.home.join("jre")
        } else {
            self.home.clone()
        }
    }

    pub fn java_binary(&self) -> PathBuf {
        self.home.join("bin").join(java_exe())
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.home.join("lib")
    }

    /// Search path for the runtime's shared libraries, most specific first.
    pub fn library_search_path(&self, abi: &str, native_lib_dir: &Path) -> Vec<PathBuf> {
        let base = self.lib_dir();
        vec![
            base.join(abi).join("jli"),
            base.join(abi).join("server"),
            base.join(abi),
            base,
            native_lib_dir.to_path_buf(),
        ]
    }
}

/// Runtimes installed under one directory.
#[derive(Debug, Clone)]
pub struct RuntimeRegistry {
    root: PathBuf,
}

impl RuntimeRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// All runtimes, newest version first.
    pub fn list(&self) -> Vec<JavaRuntime> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            warn!("Runtime directory not found: {:?}", self.root);
            return Vec::new();
        };

        let mut runtimes: Vec<JavaRuntime> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| JavaRuntime::load(&e.file_name().to_string_lossy(), &e.path()))
            .collect();

        runtimes.sort_by(|a, b| {
            let left = a.version.as_deref().unwrap_or(&a.name);
            let right = b.version.as_deref().unwrap_or(&b.name);
            compare_java_versions(right, left)
        });
        runtimes
    }

    pub fn get(&self, name: &str) -> LauncherResult<JavaRuntime> {
        let home = self.root.join(name);
        if !home.is_dir() {
            return Err(LauncherError::InvalidVersion(format!(
                "Java runtime `{name}` is not installed"
            )));
        }
        Ok(JavaRuntime::load(name, &home))
    }

    /// Smallest runtime whose major version satisfies `required_major`.
    pub fn pick_for(&self, required_major: u32) -> Option<JavaRuntime> {
        self.list()
            .into_iter()
            .filter(|r| r.major >= required_major)
            .min_by_key(|r| r.major)
    }
}

/// `1.8.0_392` → 8, `17.0.9` → 17.
pub fn parse_major_version(version: &str) -> u32 {
    let first_part = version.split('.').next().unwrap_or("0");
    let major: u32 = first_part.parse().unwrap_or(0);

    if major == 1 {
        version
            .split('.')
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(major)
    } else {
        major
    }
}

fn compare_java_versions(left: &str, right: &str) -> Ordering {
    let parse = |raw: &str| -> Vec<u32> {
        raw.split(|c: char| c == '.' || c == '_' || c == '+' || c == '-')
            .map(|p| p.parse::<u32>().unwrap_or(0))
            .collect()
    };
    parse(left).cmp(&parse(right))
}

fn extract_quoted(content: &str, key: &str) -> Option<String> {
    let start = content.find(key)? + key.len();
    let rest = &content[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

fn java_exe() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}
