// ─── Native Libraries ───
// Dynamic loading of runtime and engine shared libraries before the JVM
// process starts.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

/// Runtime libraries in load order. Later entries depend on earlier ones.
pub const RUNTIME_LIBRARIES: [&str; 8] = [
    "libjli.so",
    "libjvm.so",
    "libverify.so",
    "libjava.so",
    "libnet.so",
    "libnio.so",
    "libawt.so",
    "libawt_headless.so",
];

/// Loaded after [`RUNTIME_LIBRARIES`] when present; some builds link them statically.
pub const OPTIONAL_RUNTIME_LIBRARIES: [&str; 4] = [
    "libzip.so",
    "libjsig.so",
    "libinstrument.so",
    "libmanagement.so",
];

pub const AUDIO_LIBRARIES: [&str; 4] = ["libopenal.so", "libvorbis.so", "libvorbisfile.so", "libogg.so"];

pub const UTILITY_LIBRARIES: [&str; 4] = ["libpng.so", "libjpeg.so", "libfreetype.so", "libz.so"];

/// Why a load attempt failed, as reported by the dynamic linker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkError(pub String);

/// Capability to make a shared library resident in this process.
pub trait NativeLinker: Send + Sync {
    fn load(&self, path: &Path) -> Result<(), LinkError>;
}

/// `dlopen(RTLD_NOW | RTLD_GLOBAL)` through libc.
pub struct SystemLinker;

impl NativeLinker for SystemLinker {
    #[cfg(unix)]
    fn load(&self, path: &Path) -> Result<(), LinkError> {
        use std::ffi::{CStr, CString};
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| LinkError(format!("path contains NUL: {:?}", path)))?;

        // SAFETY: `c_path` is a valid NUL-terminated string for the duration
        // of the call; the returned handle is intentionally leaked so the
        // library stays resident.
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL) };
        if handle.is_null() {
            // SAFETY: dlerror returns a thread-local string or null.
            let reason = unsafe {
                let err = libc::dlerror();
                if err.is_null() {
                    "unknown dlopen failure".to_string()
                } else {
                    CStr::from_ptr(err).to_string_lossy().into_owned()
                }
            };
            return Err(LinkError(reason));
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn load(&self, path: &Path) -> Result<(), LinkError> {
        Err(LinkError(format!(
            "dynamic loading is not supported on this platform: {:?}",
            path
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// Logged and skipped; the launch continues.
    Recoverable(String),
    /// Aborts the launch before the process is spawned.
    Fatal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub library: String,
    pub path: Option<PathBuf>,
    pub outcome: LoadOutcome,
}

impl LoadReport {
    pub fn is_fatal(&self) -> bool {
        matches!(self.outcome, LoadOutcome::Fatal(_))
    }
}

/// How a failed load is treated, decided by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Recoverable,
    Fatal,
}

/// Records every load attempt of one launch, in order.
pub struct NativeLoader<'a> {
    linker: &'a dyn NativeLinker,
    search_path: Vec<PathBuf>,
    reports: Vec<LoadReport>,
}

impl<'a> NativeLoader<'a> {
    pub fn new(linker: &'a dyn NativeLinker, search_path: Vec<PathBuf>) -> Self {
        Self {
            linker,
            search_path,
            reports: Vec::new(),
        }
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// First directory of the search path containing `name`.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        find_in_path(name, &self.search_path)
    }

    /// Load an explicit path.
    pub fn load(&mut self, path: &Path, severity: Severity) -> &LoadReport {
        let library = file_label(path);
        let outcome = match self.linker.load(path) {
            Ok(()) => {
                info!("Loaded native library: {:?}", path);
                LoadOutcome::Loaded
            }
            Err(LinkError(reason)) => classify(&library, reason, severity),
        };
        self.push(library, Some(path.to_path_buf()), outcome)
    }

    /// Load `name` from the search path; not finding it counts as a failure.
    pub fn load_from_search_path(&mut self, name: &str, severity: Severity) -> &LoadReport {
        match self.find(name) {
            Some(path) => self.load(&path, severity),
            None => {
                let outcome = classify(name, "not found in library path".to_string(), severity);
                self.push(name.to_string(), None, outcome)
            }
        }
    }

    /// Load `dir/name` when the file exists; absent files are skipped quietly.
    pub fn load_if_present(&mut self, dir: &Path, name: &str) {
        let path = dir.join(name);
        if path.is_file() {
            self.load(&path, Severity::Recoverable);
        } else {
            debug!("Optional library absent: {:?}", path);
        }
    }

    /// Try `primary` directly, then the search-path entry with the same file name.
    pub fn load_with_fallback(&mut self, primary: &Path, severity: Severity) -> &LoadReport {
        if self.linker.load(primary).is_ok() {
            info!("Loaded native library: {:?}", primary);
            return self.push(file_label(primary), Some(primary.to_path_buf()), LoadOutcome::Loaded);
        }

        let name = file_label(primary);
        match self.find(&name).filter(|p| p != primary) {
            Some(path) => self.load(&path, severity),
            None => {
                let outcome = classify(&name, format!("failed to load {:?}", primary), severity);
                self.push(name, Some(primary.to_path_buf()), outcome)
            }
        }
    }

    pub fn reports(&self) -> &[LoadReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<LoadReport> {
        self.reports
    }

    fn push(&mut self, library: String, path: Option<PathBuf>, outcome: LoadOutcome) -> &LoadReport {
        self.reports.push(LoadReport {
            library,
            path,
            outcome,
        });
        let last = self.reports.len() - 1;
        &self.reports[last]
    }
}

fn classify(library: &str, reason: String, severity: Severity) -> LoadOutcome {
    match severity {
        Severity::Recoverable => {
            warn!("Failed to load {}: {}", library, reason);
            LoadOutcome::Recoverable(reason)
        }
        Severity::Fatal => {
            tracing::error!("Failed to load required library {}: {}", library, reason);
            LoadOutcome::Fatal(reason)
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

pub fn find_in_path(name: &str, search_path: &[PathBuf]) -> Option<PathBuf> {
    search_path
        .iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// ABI directory name used inside runtime `lib/` trees.
pub fn device_abi() -> &'static str {
    match std::env::consts::ARCH {
        "aarch64" => "arm64-v8a",
        "arm" => "armeabi-v7a",
        "x86_64" => "x86_64",
        _ => "x86",
    }
}

pub fn join_search_path(search_path: &[PathBuf]) -> String {
    search_path
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Linker that records every request and fails for configured names.
    #[derive(Default)]
    pub struct RecordingLinker {
        pub loaded: Mutex<Vec<PathBuf>>,
        pub failing: Vec<String>,
    }

    impl RecordingLinker {
        pub fn failing(names: &[&str]) -> Self {
            Self {
                loaded: Mutex::new(Vec::new()),
                failing: names.iter().map(|s| s.to_string()).collect(),
            }
        }

        pub fn names(&self) -> Vec<String> {
            self.loaded
                .lock()
                .unwrap()
                .iter()
                .map(|p| file_label(p))
                .collect()
        }
    }

    impl NativeLinker for RecordingLinker {
        fn load(&self, path: &Path) -> Result<(), LinkError> {
            let name = file_label(path);
            if self.failing.contains(&name) {
                return Err(LinkError("simulated failure".into()));
            }
            self.loaded.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingLinker;
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gamecore-native-{}-{}", tag, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_library_is_recoverable() {
        let linker = RecordingLinker::default();
        let mut loader = NativeLoader::new(&linker, vec![PathBuf::from("/nonexistent")]);
        let report = loader.load_from_search_path("libjli.so", Severity::Recoverable);
        assert!(matches!(report.outcome, LoadOutcome::Recoverable(_)));
        assert!(report.path.is_none());
    }

    #[test]
    fn fallback_uses_search_path_copy() {
        let dir = temp_dir("fallback");
        std::fs::write(dir.join("libgl4es_114.so"), b"elf").unwrap();

        let linker = RecordingLinker::default();
        let mut loader = NativeLoader::new(&linker, vec![dir.clone()]);
        let report = loader.load_with_fallback(Path::new("libgl4es_114.so"), Severity::Fatal);
        assert_eq!(report.outcome, LoadOutcome::Loaded);

        let failing = RecordingLinker::failing(&["libgl4es_114.so"]);
        let mut loader = NativeLoader::new(&failing, vec![dir.clone()]);
        let report = loader.load_with_fallback(Path::new("libgl4es_114.so"), Severity::Fatal);
        assert!(report.is_fatal());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn present_files_only() {
        let dir = temp_dir("present");
        std::fs::write(dir.join("libopenal.so"), b"elf").unwrap();

        let linker = RecordingLinker::default();
        let mut loader = NativeLoader::new(&linker, Vec::new());
        for lib in AUDIO_LIBRARIES {
            loader.load_if_present(&dir, lib);
        }
        assert_eq!(linker.names(), vec!["libopenal.so"]);
        assert_eq!(loader.reports().len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
