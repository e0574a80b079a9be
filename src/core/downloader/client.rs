use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;

/// A single file to download, with its mirror list and optional SHA-1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub urls: Vec<String>,
    pub dest: PathBuf,
    pub sha1: Option<String>,
    pub size: u64,
}

/// "Fetch to file, verify checksum" capability.
#[async_trait]
pub trait DownloadService: Send + Sync {
    /// Fetch `target` from the first mirror that answers with matching
    /// content. A present file with the expected SHA-1 is kept as-is.
    async fn fetch(
        &self,
        urls: &[String],
        target: &Path,
        sha1: Option<&str>,
        size: u64,
    ) -> LauncherResult<()>;
}

/// Concurrent, SHA-1 validated downloader.
pub struct Downloader {
    client: Client,
    /// Maximum number of parallel downloads.
    concurrency: usize,
}

impl Downloader {
    pub fn new() -> LauncherResult<Self> {
        Ok(Self::with_client(build_http_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            concurrency: 8,
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    // ── Single file download ────────────────────────────

    /// Download a single file to `dest`, optionally validating SHA-1.
    ///
    /// The body is written to a sibling `.part` file and renamed into place
    /// only after the checksum matched.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;

        if let Some(expected) = sha1_expected {
            let actual = sha1_hex(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(LauncherError::Sha1Mismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        let part = dest.with_extension(format!("{}.part", uuid::Uuid::new_v4().simple()));
        {
            let mut file = tokio::fs::File::create(&part)
                .await
                .map_err(|e| LauncherError::io(&part, e))?;
            file.write_all(&bytes)
                .await
                .map_err(|e| LauncherError::io(&part, e))?;
            file.flush().await.map_err(|e| LauncherError::io(&part, e))?;
        }
        tokio::fs::rename(&part, dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;

        debug!("Downloaded: {} -> {:?}", url, dest);
        Ok(())
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Download many files concurrently using `buffer_unordered`.
    ///
    /// Returns the list of files that failed (if any).
    pub async fn download_batch(
        &self,
        entries: Vec<DownloadEntry>,
    ) -> Vec<(DownloadEntry, LauncherError)> {
        fetch_all(self, entries, self.concurrency).await
    }
}

#[async_trait]
impl DownloadService for Downloader {
    async fn fetch(
        &self,
        urls: &[String],
        target: &Path,
        sha1: Option<&str>,
        size: u64,
    ) -> LauncherResult<()> {
        if is_satisfied(target, sha1, size).await? {
            debug!("Already present: {:?}", target);
            return Ok(());
        }

        for url in urls {
            match self.download_file(url, target, sha1).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!("Mirror {} failed for {:?}: {}", url, target, e),
            }
        }

        Err(LauncherError::MirrorsExhausted {
            target: target.to_path_buf(),
        })
    }
}

/// Run every entry through `service` with at most `concurrency` in flight.
pub async fn fetch_all<S>(
    service: &S,
    entries: Vec<DownloadEntry>,
    concurrency: usize,
) -> Vec<(DownloadEntry, LauncherError)>
where
    S: DownloadService + ?Sized,
{
    info!(
        "Starting batch download: {} files, concurrency={}",
        entries.len(),
        concurrency
    );

    let results: Vec<_> = stream::iter(entries)
        .map(|entry| async move {
            let result = service
                .fetch(&entry.urls, &entry.dest, entry.sha1.as_deref(), entry.size)
                .await;
            (entry, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    results
        .into_iter()
        .filter_map(|(entry, result)| match result {
            Ok(()) => None,
            Err(e) => Some((entry, e)),
        })
        .collect()
}

async fn is_satisfied(target: &Path, sha1: Option<&str>, size: u64) -> LauncherResult<bool> {
    if !target.is_file() {
        return Ok(false);
    }
    match sha1 {
        Some(expected) => validate_sha1(target, expected).await,
        None if size > 0 => Ok(tokio::fs::metadata(target)
            .await
            .map(|m| m.len() == size)
            .unwrap_or(false)),
        None => Ok(true),
    }
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA-1 of a file on disk, lowercase hex.
pub async fn file_sha1(path: &Path) -> LauncherResult<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?;
    Ok(sha1_hex(&bytes))
}

/// Validate an existing file's SHA-1.
pub async fn validate_sha1(path: &Path, expected: &str) -> LauncherResult<bool> {
    Ok(file_sha1(path).await?.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_of_known_input() {
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[tokio::test]
    async fn present_file_with_matching_sha1_is_kept() {
        let dir = std::env::temp_dir().join(format!("gamecore-dl-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let target = dir.join("lib.jar");
        std::fs::write(&target, b"abc").unwrap();

        let downloader = Downloader::with_client(Client::new());
        // No mirrors: only succeeds because the file already matches.
        downloader
            .fetch(&[], &target, Some("a9993e364706816aba3e25717850c26c9cd0d89d"), 3)
            .await
            .unwrap();

        let err = downloader
            .fetch(&[], &target, Some("0000"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::MirrorsExhausted { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
