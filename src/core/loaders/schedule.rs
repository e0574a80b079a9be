// ─── Library Schedule ───
// Files an install still has to fetch, downloaded together at the end of
// the analyse stage.

use std::path::Path;

use tracing::{info, warn};

use crate::core::downloader::{fetch_all, DownloadEntry, DownloadService};
use crate::core::error::LauncherResult;
use crate::core::version::Library;

#[derive(Debug, Clone, Default)]
pub struct LibrarySchedule {
    entries: Vec<DownloadEntry>,
}

impl LibrarySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; a second entry for the same destination is ignored.
    pub fn add(&mut self, entry: DownloadEntry) {
        if self.entries.iter().any(|e| e.dest == entry.dest) {
            return;
        }
        self.entries.push(entry);
    }

    /// Schedule every library that has a resolvable path under `libraries_dir`.
    pub fn add_libraries(&mut self, libraries: &[Library], libraries_dir: &Path) {
        for library in libraries {
            let Some(path) = library.artifact_path() else {
                warn!("Cannot resolve a path for library {}, skipping", library.name);
                continue;
            };
            self.add(DownloadEntry {
                urls: library.download_urls(),
                dest: libraries_dir.join(path),
                sha1: library.sha1().map(str::to_string),
                size: library.size(),
            });
        }
    }

    /// Drop entries matching `predicate`. Returns the removed entries.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<DownloadEntry>
    where
        F: FnMut(&DownloadEntry) -> bool,
    {
        let (removed, kept) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| predicate(entry));
        self.entries = kept;
        removed
    }

    pub fn entries(&self) -> &[DownloadEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetch everything. The first failure is returned after all transfers
    /// settled.
    pub async fn download(self, service: &dyn DownloadService, concurrency: usize) -> LauncherResult<()> {
        let total = self.entries.len();
        let failures = fetch_all(service, self.entries, concurrency).await;
        for (entry, err) in &failures {
            warn!("Failed to download {:?}: {}", entry.dest, err);
        }
        if let Some((_, err)) = failures.into_iter().next() {
            return Err(err);
        }
        info!("Downloaded {} scheduled files", total);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::core::downloader::DownloadService;
    use crate::core::error::{LauncherError, LauncherResult};

    /// Writes the URL into the target instead of fetching it. Present files
    /// are kept; URLs listed in `unreachable` fail.
    #[derive(Default)]
    pub struct FakeDownloads {
        pub fetched: Mutex<Vec<PathBuf>>,
        pub unreachable: Vec<String>,
    }

    impl FakeDownloads {
        pub fn fetched(&self) -> Vec<PathBuf> {
            let mut fetched = self.fetched.lock().unwrap().clone();
            fetched.sort();
            fetched
        }
    }

    #[async_trait]
    impl DownloadService for FakeDownloads {
        async fn fetch(
            &self,
            urls: &[String],
            target: &Path,
            _sha1: Option<&str>,
            _size: u64,
        ) -> LauncherResult<()> {
            if target.is_file() {
                return Ok(());
            }
            let Some(url) = urls.iter().find(|u| !self.unreachable.contains(u)) else {
                return Err(LauncherError::MirrorsExhausted {
                    target: target.to_path_buf(),
                });
            };
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(target, url.as_bytes()).unwrap();
            self.fetched.lock().unwrap().push(target.to_path_buf());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeDownloads;
    use super::*;
    use crate::core::error::LauncherError;
    use std::path::PathBuf;

    fn library(name: &str) -> Library {
        Library::named(name)
    }

    #[test]
    fn duplicate_destinations_collapse() {
        let mut schedule = LibrarySchedule::new();
        schedule.add_libraries(
            &[
                library("org.ow2.asm:asm:9.5"),
                library("org.ow2.asm:asm:9.5"),
                library("not-a-coordinate"),
            ],
            Path::new("/game/libraries"),
        );
        assert_eq!(schedule.len(), 1);
        assert_eq!(
            schedule.entries()[0].dest,
            PathBuf::from("/game/libraries/org/ow2/asm/asm/9.5/asm-9.5.jar")
        );
    }

    #[test]
    fn remove_where_returns_removed() {
        let mut schedule = LibrarySchedule::new();
        schedule.add_libraries(
            &[
                library("net.minecraftforge:forge:1.20.1-47.2.0:client"),
                library("org.ow2.asm:asm:9.5"),
            ],
            Path::new("/game/libraries"),
        );
        let removed = schedule.remove_where(|e| {
            e.dest
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with("forge-"))
        });
        assert_eq!(removed.len(), 1);
        assert_eq!(schedule.len(), 1);
    }

    #[tokio::test]
    async fn failures_surface_after_batch() {
        let root = std::env::temp_dir().join(format!("gamecore-schedule-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);

        let mut schedule = LibrarySchedule::new();
        schedule.add(DownloadEntry {
            urls: vec!["https://a/ok.jar".into()],
            dest: root.join("ok.jar"),
            sha1: None,
            size: 0,
        });
        schedule.add(DownloadEntry {
            urls: vec!["https://a/gone.jar".into()],
            dest: root.join("gone.jar"),
            sha1: None,
            size: 0,
        });

        let service = FakeDownloads {
            unreachable: vec!["https://a/gone.jar".into()],
            ..FakeDownloads::default()
        };
        let err = schedule.download(&service, 4).await.unwrap_err();
        assert!(matches!(err, LauncherError::MirrorsExhausted { .. }));
        assert_eq!(service.fetched(), vec![root.join("ok.jar")]);

        let _ = std::fs::remove_dir_all(&root);
    }
}
