// ─── Vanilla Version List ───
// Fetches the vanilla version list and individual version descriptors.
// The install pipeline only needs it to locate `client_mappings`.

use serde::Deserialize;
use tracing::{debug, info};

use super::version_file::VersionJson;
use crate::core::error::{LauncherError, LauncherResult};

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    #[serde(rename = "releaseTime", default)]
    pub release_time: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionManifest {
    pub async fn fetch(client: &reqwest::Client, url: &str) -> LauncherResult<Self> {
        info!("Fetching version list from {}", url);

        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let manifest: VersionManifest = response.json().await?;

        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}

impl VersionEntry {
    /// Download and parse the version descriptor this entry points at.
    pub async fn fetch_descriptor(&self, client: &reqwest::Client) -> LauncherResult<VersionJson> {
        debug!("Fetching descriptor for {} from {}", self.id, self.url);
        let response = client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(LauncherError::DownloadFailed {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}
