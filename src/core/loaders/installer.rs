// ─── Mod-Loader Install Pipeline ───
// Download → Analyse → Install (legacy | modern) → Processors → Finalize.
// A version only counts as installed once its `.installed` marker exists,
// which is written after Finalize.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::archive::InstallerArchive;
use super::context::InstallContext;
use super::forge::{ForgeLikeInstall, INSTALL_PROFILE};
use super::profile::ProfileLayout;
use crate::core::error::{ErrorCategory, LauncherError, LauncherResult};
use crate::core::maven::{FORGE_MAVEN, NEOFORGE_MAVEN};
use crate::core::progress::{MonotonicProgress, ProgressSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModLoader {
    Forge,
    NeoForge,
}

impl ModLoader {
    pub fn artifact_id(&self) -> &'static str {
        match self {
            ModLoader::Forge => "forge",
            ModLoader::NeoForge => "neoforge",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModLoader::Forge => "Forge",
            ModLoader::NeoForge => "NeoForge",
        }
    }

    fn repository(&self) -> (&'static str, &'static str) {
        match self {
            ModLoader::Forge => (FORGE_MAVEN, "net/minecraftforge/forge"),
            ModLoader::NeoForge => (NEOFORGE_MAVEN, "net/neoforged/neoforge"),
        }
    }
}

/// Identity of an install for single-flight purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstallKey {
    pub loader: ModLoader,
    pub minecraft_version: String,
    pub loader_version: String,
}

impl std::fmt::Display for InstallKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.loader.display_name(),
            self.loader_version,
            self.minecraft_version
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRequest {
    pub loader: ModLoader,
    pub minecraft_version: String,
    pub loader_version: String,
    /// Name of the resulting version directory. Defaults to
    /// `<mc>-<loader>-<loader version>`.
    #[serde(default)]
    pub version_name: Option<String>,
}

impl InstallRequest {
    pub fn new(loader: ModLoader, minecraft_version: &str, loader_version: &str) -> Self {
        Self {
            loader,
            minecraft_version: minecraft_version.to_string(),
            loader_version: loader_version.to_string(),
            version_name: None,
        }
    }

    pub fn with_version_name(mut self, name: impl Into<String>) -> Self {
        self.version_name = Some(name.into());
        self
    }

    pub fn key(&self) -> InstallKey {
        InstallKey {
            loader: self.loader,
            minecraft_version: self.minecraft_version.clone(),
            loader_version: self.loader_version.clone(),
        }
    }

    pub fn version_name(&self) -> String {
        match self.version_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!(
                "{}-{}-{}",
                self.minecraft_version,
                self.loader.artifact_id(),
                self.loader_version
            ),
        }
    }

    /// Version part of the loader's maven coordinate. Forge prefixes the
    /// game version, NeoForge encodes it in its own numbering.
    pub fn artifact_version(&self) -> String {
        match self.loader {
            ModLoader::Forge => format!("{}-{}", self.minecraft_version, self.loader_version),
            ModLoader::NeoForge => self.loader_version.clone(),
        }
    }

    pub fn installer_file_name(&self) -> String {
        format!(
            "{}-{}-installer.jar",
            self.loader.artifact_id(),
            self.artifact_version()
        )
    }

    pub fn installer_urls(&self) -> Vec<String> {
        let (repo, group_path) = self.loader.repository();
        vec![format!(
            "{}/{}/{}/{}",
            repo,
            group_path,
            self.artifact_version(),
            self.installer_file_name()
        )]
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallResult {
    pub success: bool,
    pub version_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LauncherError>,
}

impl InstallResult {
    pub fn installed(version_name: String) -> Self {
        Self {
            success: true,
            version_name,
            error: None,
        }
    }

    pub fn failed(version_name: String, error: LauncherError) -> Self {
        Self {
            success: false,
            version_name,
            error: Some(error),
        }
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        self.error.as_ref().map(LauncherError::category)
    }
}

/// Per-install scratch files. `remove` cleans up on the async path; the
/// drop fallback only runs when the install future is aborted mid-way.
struct ScratchFiles {
    installer: PathBuf,
    cache_dir: PathBuf,
    removed: bool,
}

impl ScratchFiles {
    async fn remove(mut self) {
        if let Err(e) = tokio::fs::remove_file(&self.installer).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove {:?}: {}", self.installer, e);
            }
        }
        if let Err(e) = tokio::fs::remove_dir_all(&self.cache_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove {:?}: {}", self.cache_dir, e);
            }
        }
        self.removed = true;
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if self.installer.exists() {
            if let Err(e) = std::fs::remove_file(&self.installer) {
                warn!("Could not remove {:?}: {}", self.installer, e);
            }
        }
        if self.cache_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.cache_dir) {
                warn!("Could not remove {:?}: {}", self.cache_dir, e);
            }
        }
    }
}

pub struct ModLoaderInstaller<'a> {
    ctx: InstallContext<'a>,
}

impl<'a> ModLoaderInstaller<'a> {
    pub fn new(ctx: InstallContext<'a>) -> Self {
        Self { ctx }
    }

    /// Run the whole pipeline. Failures are reported in the result, never
    /// as a half-installed version.
    pub async fn install(&self, request: &InstallRequest, progress: &dyn ProgressSink) -> InstallResult {
        let version_name = request.version_name();
        let progress = MonotonicProgress::new(progress);

        match self.run(request, &progress).await {
            Ok(()) => {
                progress.report(100.0, "Installed");
                info!("{} installed as {}", request.key(), version_name);
                InstallResult::installed(version_name)
            }
            Err(e) => {
                error!("Installing {} failed: {}", request.key(), e);
                InstallResult::failed(version_name, e)
            }
        }
    }

    async fn run(&self, request: &InstallRequest, progress: &MonotonicProgress<'_>) -> LauncherResult<()> {
        let paths = self.ctx.paths;
        let install = ForgeLikeInstall::new(self.ctx, request);
        let version_name = install.version_name().to_string();

        let marker = paths.installed_marker(&version_name);
        if marker.exists() {
            tokio::fs::remove_file(&marker)
                .await
                .map_err(|e| LauncherError::io(&marker, e))?;
        }
        install.require_base_version()?;

        let scratch = ScratchFiles {
            installer: paths.temp_dir().join(request.installer_file_name()),
            cache_dir: paths.installer_cache_dir(),
            removed: false,
        };
        let staged = self.stages(&install, request, &scratch.installer, progress).await;
        scratch.remove().await;
        staged?;

        tokio::fs::write(&marker, chrono::Utc::now().to_rfc3339())
            .await
            .map_err(|e| LauncherError::io(&marker, e))?;
        Ok(())
    }

    /// Download through Finalize.
    async fn stages(
        &self,
        install: &ForgeLikeInstall<'_>,
        request: &InstallRequest,
        installer: &Path,
        progress: &MonotonicProgress<'_>,
    ) -> LauncherResult<()> {
        let loader = request.loader.display_name();

        // ── Download ──
        progress.report(0.0, &format!("Downloading {} installer", loader));
        self.ctx
            .downloads
            .fetch(&request.installer_urls(), installer, None, 0)
            .await?;

        // ── Analyse ──
        progress.report(15.0, &format!("Reading {} installer", loader));
        let archive = InstallerArchive::open(installer).await?;
        let install_profile = archive.read_json(INSTALL_PROFILE).await?;
        let layout = ProfileLayout::detect(&install_profile);
        info!("{} installer layout: {:?}", request.key(), layout);

        if layout.is_legacy() {
            // ── Install (legacy) ──
            progress.report(30.0, &format!("Installing {}", loader));
            install
                .install_legacy(&archive, &install_profile, layout)
                .await?;
        } else {
            progress.report(20.0, "Downloading libraries");
            let plan = install.analyse(&archive, &install_profile).await?;

            // ── Install (modern) + processors ──
            progress.report(50.0, &format!("Running {} processors", loader));
            let on_step = |done: usize, total: usize| {
                let share = if total == 0 { 1.0 } else { done as f32 / total as f32 };
                progress.report(
                    50.0 + 45.0 * share,
                    &format!("Processor {}/{}", done, total),
                );
            };
            install.install_modern(&archive, &plan, &on_step).await?;
        }

        // ── Finalize ──
        progress.report(95.0, "Finalizing");
        install.finalize().await
    }
}

/// Whether a previous install of `version_name` ran to completion.
pub fn is_installed(paths: &crate::core::paths::GamePaths, version_name: &str) -> bool {
    paths.installed_marker(version_name).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::DownloadService;
    use crate::core::loaders::archive::testing::write_zip;
    use crate::core::loaders::processor::testing::{write_tool_jar, FakeRunner};
    use crate::core::loaders::schedule::testing::FakeDownloads;
    use crate::core::paths::GamePaths;
    use crate::core::progress::NoProgress;
    use crate::core::version::FsVersionStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::Path;

    fn temp_root(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gamecore-install-{}-{}", tag, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Serves a prepared installer for installer URLs, stub bytes otherwise.
    struct InstallerDownloads {
        installer: PathBuf,
        libraries: FakeDownloads,
    }

    #[async_trait]
    impl DownloadService for InstallerDownloads {
        async fn fetch(&self, urls: &[String], target: &Path, sha1: Option<&str>, size: u64) -> LauncherResult<()> {
            if urls.iter().any(|u| u.ends_with("-installer.jar")) {
                std::fs::create_dir_all(target.parent().unwrap()).unwrap();
                std::fs::copy(&self.installer, target).unwrap();
                return Ok(());
            }
            self.libraries.fetch(urls, target, sha1, size).await
        }
    }

    fn install_base_version(paths: &GamePaths, mc: &str) {
        let dir = paths.version_dir(mc);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(paths.version_jar(mc), b"vanilla").unwrap();
        std::fs::write(
            paths.version_json(mc),
            json!({"id": mc, "mainClass": "net.minecraft.client.main.Main", "libraries": []}).to_string(),
        )
        .unwrap();
    }

    fn write_profile_installer(path: &Path, profile: serde_json::Value, extra: &[(&str, &[u8])]) {
        let profile = profile.to_string();
        let mut entries: Vec<(&str, &[u8])> = vec![("install_profile.json", profile.as_bytes())];
        entries.extend_from_slice(extra);
        write_zip(path, &entries);
    }

    struct Fixture {
        root: PathBuf,
        paths: GamePaths,
        store: FsVersionStore,
        client: reqwest::Client,
    }

    impl Fixture {
        fn new(tag: &str) -> Self {
            let root = temp_root(tag);
            let paths = GamePaths::new(&root);
            install_base_version(&paths, "1.20.1");
            Self {
                store: FsVersionStore::new(paths.clone()),
                client: reqwest::Client::new(),
                paths,
                root,
            }
        }

        fn context<'a>(&'a self, downloads: &'a InstallerDownloads, runner: &'a FakeRunner) -> InstallContext<'a> {
            InstallContext {
                paths: &self.paths,
                downloads,
                http_client: &self.client,
                store: &self.store,
                runner,
                version_manifest_url: "http://127.0.0.1:9/unused",
                concurrency: 4,
            }
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    #[tokio::test]
    async fn legacy_embedded_installer() {
        let fx = Fixture::new("legacy-a");
        let installer = fx.root.join("fixture-installer.jar");
        let version = json!({"id": "1.12.2-forge1.12.2-14.23.5.2860", "mainClass": "net.minecraft.launchwrapper.Launch", "inheritsFrom": "1.12.2"}).to_string();
        write_profile_installer(
            &installer,
            json!({"json": "/version.json", "processors": []}),
            &[
                ("version.json", version.as_bytes()),
                ("maven/net/minecraftforge/forge/1.12.2-14.23.5.2860/forge-1.12.2-14.23.5.2860.jar", b"forge"),
            ],
        );
        let downloads = InstallerDownloads {
            installer,
            libraries: FakeDownloads::default(),
        };
        let runner = FakeRunner::default();
        let request = InstallRequest::new(ModLoader::Forge, "1.20.1", "14.23.5.2860").with_version_name("forge-legacy");

        let result = ModLoaderInstaller::new(fx.context(&downloads, &runner))
            .install(&request, &NoProgress)
            .await;
        assert!(result.success, "{:?}", result.error);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(fx.paths.version_json("forge-legacy")).unwrap()).unwrap();
        assert_eq!(written["id"], "forge-legacy");
        assert!(fx
            .paths
            .libraries_dir()
            .join("net/minecraftforge/forge/1.12.2-14.23.5.2860/forge-1.12.2-14.23.5.2860.jar")
            .is_file());
        assert!(is_installed(&fx.paths, "forge-legacy"));
        assert!(!fx.paths.temp_dir().join(request.installer_file_name()).exists());
        assert_eq!(runner.count(), 0);
    }

    #[tokio::test]
    async fn legacy_install_block() {
        let fx = Fixture::new("legacy-b");
        let installer = fx.root.join("fixture-installer.jar");
        let artifact = "net.minecraftforge:forge:1.7.10-10.13.4.1614-1.7.10";
        write_profile_installer(
            &installer,
            json!({
                "install": {"path": artifact, "filePath": "forge-universal.jar"},
                "versionInfo": {
                    "id": "1.7.10-Forge",
                    "mainClass": "net.minecraft.launchwrapper.Launch",
                    "libraries": [{"name": artifact}, {"name": "net.minecraft:launchwrapper:1.12"}]
                }
            }),
            &[("forge-universal.jar", b"universal")],
        );

        let jar = fx
            .paths
            .libraries_dir()
            .join("net/minecraftforge/forge/1.7.10-10.13.4.1614-1.7.10/forge-1.7.10-10.13.4.1614-1.7.10.jar");
        std::fs::create_dir_all(jar.parent().unwrap()).unwrap();
        std::fs::write(&jar, b"stale").unwrap();

        let downloads = InstallerDownloads {
            installer,
            libraries: FakeDownloads::default(),
        };
        let runner = FakeRunner::default();
        let request = InstallRequest::new(ModLoader::Forge, "1.20.1", "10.13.4.1614");
        let name = request.version_name();

        let result = ModLoaderInstaller::new(fx.context(&downloads, &runner))
            .install(&request, &NoProgress)
            .await;
        assert!(result.success, "{:?}", result.error);

        assert_eq!(std::fs::read(&jar).unwrap(), b"universal");
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(fx.paths.version_json(&name)).unwrap()).unwrap();
        assert_eq!(written["inheritsFrom"], "1.20.1");
        assert_eq!(written["libraries"].as_array().unwrap().len(), 2);
        assert_eq!(
            downloads.libraries.fetched(),
            vec![fx
                .paths
                .libraries_dir()
                .join("net/minecraft/launchwrapper/1.12/launchwrapper-1.12.jar")]
        );
    }

    fn modern_installer(fx: &Fixture, outputs_sha: &str) -> PathBuf {
        let installer = fx.root.join("fixture-installer.jar");
        let version = json!({
            "id": "1.20.1-forge-47.2.0",
            "inheritsFrom": "1.20.1",
            "mainClass": "cpw.mods.bootstraplauncher.BootstrapLauncher",
            "libraries": [
                {"name": "cpw.mods:bootstraplauncher:1.1.2"},
                {"name": "net.minecraftforge:forge:1.20.1-47.2.0:client", "downloads": {"artifact": {"path": "net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-client.jar", "url": ""}}}
            ],
            "arguments": {"jvm": ["-DignoreList=bootstraplauncher,securejarhandler", "-Dx=1"]}
        })
        .to_string();
        let profile = json!({
            "path": "net.minecraftforge:forge:1.20.1-47.2.0",
            "data": {
                "PATCHED": {"client": "[net.minecraftforge:forge:1.20.1-47.2.0:client]", "server": "x"},
                "PATCHED_SHA": {"client": format!("'{}'", outputs_sha), "server": "x"},
                "BINPATCH": {"client": "/data/client.lzma", "server": "/data/server.lzma"}
            },
            "libraries": [
                {"name": "net.minecraftforge:binarypatcher:1.1.1"},
                {"name": "net.sf.jopt-simple:jopt-simple:5.0.4"}
            ],
            "processors": [
                {
                    "sides": ["server"],
                    "jar": "net.minecraftforge:installertools:1.3.0",
                    "args": ["--task", "EXTRACT_SERVER"]
                },
                {
                    "jar": "net.minecraftforge:binarypatcher:1.1.1",
                    "classpath": ["net.sf.jopt-simple:jopt-simple:5.0.4"],
                    "args": ["--clean", "{MINECRAFT_JAR}", "--output", "{PATCHED}", "--apply", "{BINPATCH}"],
                    "outputs": {"{PATCHED}": "{PATCHED_SHA}"}
                }
            ]
        })
        .to_string();

        let manifest = "Manifest-Version: 1.0\r\nMain-Class: net.minecraftforge.binarypatcher.ConsoleTool\r\n\r\n";
        let tool = fx.root.join("tool.jar");
        write_zip(&tool, &[("META-INF/MANIFEST.MF", manifest.as_bytes())]);
        let tool_bytes = std::fs::read(&tool).unwrap();

        write_zip(
            &installer,
            &[
                ("install_profile.json", profile.as_bytes()),
                ("version.json", version.as_bytes()),
                ("data/client.lzma", b"binpatch"),
                ("maven/net/minecraftforge/binarypatcher/1.1.1/binarypatcher-1.1.1.jar", &tool_bytes),
                ("maven/net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0.jar", b"forge"),
            ],
        );
        installer
    }

    #[tokio::test]
    async fn modern_installer_runs_client_processors_once() {
        let fx = Fixture::new("modern");
        let patched_bytes = b"patched client".to_vec();
        let sha = crate::core::downloader::client::sha1_hex(&patched_bytes);
        let installer = modern_installer(&fx, &sha);
        let downloads = InstallerDownloads {
            installer,
            libraries: FakeDownloads::default(),
        };
        let patched = fx
            .paths
            .libraries_dir()
            .join("net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-client.jar");
        let runner = FakeRunner::writing(vec![(patched.clone(), patched_bytes)]);
        let request = InstallRequest::new(ModLoader::Forge, "1.20.1", "47.2.0");
        let name = request.version_name();
        assert_eq!(name, "1.20.1-forge-47.2.0");

        let seen = std::sync::Mutex::new(Vec::new());
        let sink = |p: f32, _m: &str| seen.lock().unwrap().push(p);
        let installer = ModLoaderInstaller::new(fx.context(&downloads, &runner));

        let result = installer.install(&request, &sink).await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(runner.count(), 1);

        let call = runner.calls.lock().unwrap()[0].clone();
        assert_eq!(call.main_class, "net.minecraftforge.binarypatcher.ConsoleTool");
        let binpatch = &call.args[5];
        assert!(binpatch.ends_with("-client.lzma"));
        assert_eq!(call.args[1], fx.paths.version_jar("1.20.1").to_string_lossy());

        // Only jopt-simple needed fetching: binarypatcher was embedded and
        // the loader's own jars are produced locally.
        let fetched = downloads.libraries.fetched();
        assert!(fetched.iter().any(|p| p.ends_with("jopt-simple-5.0.4.jar")));
        assert!(fetched.iter().all(|p| !p.to_string_lossy().contains("forge-1.20.1-47.2.0")));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(fx.paths.version_json(&name)).unwrap()).unwrap();
        assert_eq!(
            written["arguments"]["jvm"][0],
            "-DignoreList=bootstraplauncher,securejarhandler,${primary_jar_name}"
        );
        assert!(is_installed(&fx.paths, &name));
        assert!(!fx.paths.installer_cache_dir().exists());

        let progress = seen.lock().unwrap().clone();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last().copied(), Some(100.0));

        // Outputs already match: nothing runs again.
        let again = installer.install(&request, &NoProgress).await;
        assert!(again.success, "{:?}", again.error);
        assert_eq!(runner.count(), 1);
    }

    #[tokio::test]
    async fn failed_processor_leaves_no_marker() {
        let fx = Fixture::new("modern-fail");
        let installer = modern_installer(&fx, "0000000000000000000000000000000000000000");
        let downloads = InstallerDownloads {
            installer,
            libraries: FakeDownloads::default(),
        };
        let patched = fx
            .paths
            .libraries_dir()
            .join("net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-client.jar");
        let runner = FakeRunner::writing(vec![(patched.clone(), b"wrong".to_vec())]);
        let request = InstallRequest::new(ModLoader::Forge, "1.20.1", "47.2.0");

        let result = ModLoaderInstaller::new(fx.context(&downloads, &runner))
            .install(&request, &NoProgress)
            .await;
        assert!(!result.success);
        assert_eq!(result.category(), Some(ErrorCategory::Integrity));
        assert!(!patched.exists());
        assert!(!is_installed(&fx.paths, &request.version_name()));
        assert!(!fx.paths.temp_dir().join(request.installer_file_name()).exists());
    }

    #[tokio::test]
    async fn missing_base_version_is_rejected() {
        let fx = Fixture::new("nobase");
        let downloads = InstallerDownloads {
            installer: fx.root.join("absent.jar"),
            libraries: FakeDownloads::default(),
        };
        let runner = FakeRunner::default();
        let request = InstallRequest::new(ModLoader::NeoForge, "1.21.1", "21.1.77");

        let result = ModLoaderInstaller::new(fx.context(&downloads, &runner))
            .install(&request, &NoProgress)
            .await;
        assert!(matches!(result.error, Some(LauncherError::InvalidInstaller(_))));
    }

    #[test]
    fn installer_coordinates() {
        let forge = InstallRequest::new(ModLoader::Forge, "1.20.1", "47.2.0");
        assert_eq!(
            forge.installer_urls(),
            vec!["https://maven.minecraftforge.net/net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-installer.jar"]
        );

        let neo = InstallRequest::new(ModLoader::NeoForge, "1.21.1", "21.1.77").with_version_name("neo");
        assert_eq!(
            neo.installer_urls(),
            vec!["https://maven.neoforged.net/releases/net/neoforged/neoforge/21.1.77/neoforge-21.1.77-installer.jar"]
        );
        assert_eq!(neo.version_name(), "neo");
        assert_eq!(neo.key().to_string(), "NeoForge 21.1.77 (1.21.1)");
    }
}
