use crate::core::downloader::DownloadService;
use crate::core::paths::GamePaths;
use crate::core::version::ManifestStore;

use super::processor::ProcessorRunner;

/// Collaborators one install runs against.
#[derive(Clone, Copy)]
pub struct InstallContext<'a> {
    pub paths: &'a GamePaths,
    pub downloads: &'a dyn DownloadService,
    pub http_client: &'a reqwest::Client,
    pub store: &'a dyn ManifestStore,
    pub runner: &'a dyn ProcessorRunner,
    /// Vanilla version list, consulted for Mojang mappings.
    pub version_manifest_url: &'a str,
    pub concurrency: usize,
}
