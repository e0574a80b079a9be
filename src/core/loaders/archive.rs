// ─── Installer Archive ───
// Read access to a downloaded installer jar. Zip reads and file writes run
// on the blocking pool; `ArchiveReader` is the synchronous core used there.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::classpath::safe_path_str;

/// Synchronous view of an installer jar. Only touched from blocking tasks.
pub struct ArchiveReader {
    path: PathBuf,
    zip: zip::ZipArchive<File>,
}

impl ArchiveReader {
    pub fn open(path: &Path) -> LauncherResult<Self> {
        let file = File::open(path).map_err(|e| LauncherError::io(path, e))?;
        let zip = zip::ZipArchive::new(file)?;
        Ok(Self {
            path: path.to_path_buf(),
            zip,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.zip.file_names().any(|n| n == name)
    }

    pub fn read_text(&mut self, name: &str) -> LauncherResult<String> {
        let mut entry = self.zip.by_name(name).map_err(|e| {
            LauncherError::InvalidInstaller(format!("{} missing from {:?}: {}", name, self.path, e))
        })?;
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|e| LauncherError::io(&self.path, e))?;
        Ok(text)
    }

    /// Copy one entry to `dest`, replacing whatever is there.
    pub fn extract_entry_to_file(&mut self, name: &str, dest: &Path) -> LauncherResult<()> {
        let mut entry = self.zip.by_name(name).map_err(|e| {
            LauncherError::InvalidInstaller(format!("{} missing from {:?}: {}", name, self.path, e))
        })?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out = File::create(dest).map_err(|e| LauncherError::io(dest, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(dest, e))?;
        debug!("Extracted {} -> {:?}", name, dest);
        Ok(())
    }

    /// Extract every file below `prefix/` into `dest`, keeping the relative
    /// layout. Returns the number of files written.
    pub fn extract_directory(&mut self, prefix: &str, dest: &Path) -> LauncherResult<usize> {
        let prefix = format!("{}/", prefix.trim_matches('/'));
        let mut written = 0;

        for i in 0..self.zip.len() {
            let mut entry = self.zip.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            // Entry names with `..` or absolute roots are dropped here.
            let Some(enclosed) = entry.enclosed_name() else {
                continue;
            };
            let Ok(relative) = enclosed.strip_prefix(&prefix) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }

            let target = dest.join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
            }
            let mut out = File::create(&target).map_err(|e| LauncherError::io(&target, e))?;
            std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&target, e))?;
            written += 1;
        }

        debug!("Extracted {} files from {} into {:?}", written, prefix, dest);
        Ok(written)
    }

    /// Extract a plain data entry (`/data/client.lzma`, `\data\x`) to a fresh
    /// file under `cache_dir` and return its absolute path.
    pub fn extract_to_cache(&mut self, raw_name: &str, cache_dir: &Path) -> LauncherResult<String> {
        let name = raw_name
            .trim_start_matches(['/', '\\'])
            .replace('\\', "/");
        let file_name = name.rsplit('/').next().unwrap_or(name.as_str()).to_string();
        let dest = cache_dir.join(format!("{}-{}", uuid::Uuid::new_v4().simple(), file_name));
        self.extract_entry_to_file(&name, &dest)?;
        Ok(safe_path_str(&dest))
    }
}

/// Shared handle to an installer jar for async callers.
#[derive(Clone)]
pub struct InstallerArchive {
    path: PathBuf,
    reader: Arc<Mutex<ArchiveReader>>,
}

impl InstallerArchive {
    pub async fn open(path: &Path) -> LauncherResult<Self> {
        let owned = path.to_path_buf();
        let reader = tokio::task::spawn_blocking(move || ArchiveReader::open(&owned))
            .await
            .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))??;
        Ok(Self {
            path: path.to_path_buf(),
            reader: Arc::new(Mutex::new(reader)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the reader on the blocking pool.
    pub async fn with_reader<T, F>(&self, f: F) -> LauncherResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ArchiveReader) -> LauncherResult<T> + Send + 'static,
    {
        let reader = self.reader.clone();
        tokio::task::spawn_blocking(move || -> LauncherResult<T> {
            let mut reader = reader
                .lock()
                .map_err(|_| LauncherError::Other("installer archive lock poisoned".into()))?;
            f(&mut reader)
        })
        .await
        .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))?
    }

    pub async fn read_text(&self, name: &str) -> LauncherResult<String> {
        let name = name.to_string();
        self.with_reader(move |reader| reader.read_text(&name)).await
    }

    pub async fn read_json(&self, name: &str) -> LauncherResult<serde_json::Value> {
        let text = self.read_text(name).await?;
        serde_json::from_str(&text).map_err(LauncherError::from)
    }

    pub async fn extract_entry_to_file(&self, name: &str, dest: &Path) -> LauncherResult<()> {
        let name = name.to_string();
        let dest = dest.to_path_buf();
        self.with_reader(move |reader| reader.extract_entry_to_file(&name, &dest))
            .await
    }

    pub async fn extract_directory(&self, prefix: &str, dest: &Path) -> LauncherResult<usize> {
        let prefix = prefix.to_string();
        let dest = dest.to_path_buf();
        self.with_reader(move |reader| reader.extract_directory(&prefix, &dest))
            .await
    }
}
