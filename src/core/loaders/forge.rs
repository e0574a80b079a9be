// ─── Forge-like Install Stages ───
// Analyse, legacy/modern install and finalize for Forge and NeoForge
// installers. The pipeline in `installer.rs` drives these in order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::archive::InstallerArchive;
use super::context::InstallContext;
use super::installer::InstallRequest;
use super::literal::{parse_literal, parse_options};
use super::processor::{run_processors, ProcessorSummary, CLIENT_SIDE, DOWNLOAD_MOJMAPS_TASK};
use super::profile::{self, str_field, Processor, ProfileLayout};
use super::schedule::LibrarySchedule;
use crate::core::downloader::DownloadEntry;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::classpath::safe_path_str;
use crate::core::maven::{compare_versions, MavenArtifact};
use crate::core::version::VersionManifest;

pub const INSTALL_PROFILE: &str = "install_profile.json";
pub const VERSION_FRAGMENT: &str = "version.json";

const IGNORE_LIST_FLAG: &str = "-DignoreList=";
const PRIMARY_JAR_TOKEN: &str = "${primary_jar_name}";
const BOOTSTRAP_PATCH_VERSION: &str = "0.1.17";

/// Result of analysing a processor-driven installer.
#[derive(Debug, Clone)]
pub struct ModernPlan {
    /// Install profile with the version fragment merged over it.
    pub merged: Value,
    pub processors: Vec<Processor>,
    pub vars: HashMap<String, String>,
}

/// One `DOWNLOAD_MOJMAPS` step: which vanilla version, and where to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRequest {
    pub version: String,
    pub output: PathBuf,
}

pub struct ForgeLikeInstall<'a> {
    ctx: InstallContext<'a>,
    request: &'a InstallRequest,
    version_name: String,
}

impl<'a> ForgeLikeInstall<'a> {
    pub fn new(ctx: InstallContext<'a>, request: &'a InstallRequest) -> Self {
        Self {
            ctx,
            request,
            version_name: request.version_name(),
        }
    }

    pub fn version_name(&self) -> &str {
        &self.version_name
    }

    fn vanilla_jar(&self) -> PathBuf {
        self.ctx.paths.version_jar(&self.request.minecraft_version)
    }

    /// The loader writes on top of the vanilla client; it has to be there.
    pub fn require_base_version(&self) -> LauncherResult<()> {
        let jar = self.vanilla_jar();
        if jar.is_file() {
            return Ok(());
        }
        Err(LauncherError::InvalidInstaller(format!(
            "Base version {} is not installed ({:?} missing)",
            self.request.minecraft_version, jar
        )))
    }

    // ── Analyse ─────────────────────────────────────────

    /// Extract embedded libraries, merge the version fragment, build the
    /// processor variables and fetch everything still missing.
    pub async fn analyse(
        &self,
        archive: &InstallerArchive,
        install_profile: &Value,
    ) -> LauncherResult<ModernPlan> {
        let libraries_dir = self.ctx.paths.libraries_dir();
        let version_fragment = archive.read_json(VERSION_FRAGMENT).await?;

        let profile_libraries = profile::libraries(install_profile)?;
        let mut candidates: Vec<String> = profile_libraries
            .iter()
            .filter_map(|library| library.artifact_path())
            .collect();
        if let Some(coord) = str_field(install_profile, "path") {
            candidates.push(MavenArtifact::parse(coord)?.relative_path());
        }

        let target_dir = libraries_dir.clone();
        let embedded = archive
            .with_reader(move |reader| {
                let mut embedded = 0;
                for path in candidates {
                    let entry = format!("maven/{path}");
                    if reader.has_entry(&entry) {
                        reader.extract_entry_to_file(&entry, &target_dir.join(&path))?;
                        embedded += 1;
                    }
                }
                Ok(embedded)
            })
            .await?;
        info!("Extracted {} embedded libraries", embedded);

        let merged = profile::merge_documents(install_profile, &version_fragment);

        let mut schedule = LibrarySchedule::new();
        schedule.add_libraries(&profile_libraries, &libraries_dir);
        schedule.add_libraries(&profile::libraries(&version_fragment)?, &libraries_dir);

        let vars = self.processor_vars(archive, install_profile).await?;
        let processors = profile::processors(&merged)?;

        let requests = mapping_requests(&processors, self.ctx.paths.root(), &vars)?;
        if !requests.is_empty() {
            self.schedule_mappings(&requests, &mut schedule).await?;
        }

        let (main_jar, client_jar) = self.own_jar_names();
        let removed = schedule.remove_where(|entry| {
            let name = entry
                .dest
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            name.ends_with(&main_jar) || name.ends_with(&client_jar)
        });
        for entry in &removed {
            debug!("Produced locally, not downloading: {:?}", entry.dest);
        }

        info!("Downloading {} libraries for {}", schedule.len(), self.version_name);
        schedule
            .download(self.ctx.downloads, self.ctx.concurrency)
            .await?;

        Ok(ModernPlan {
            merged,
            processors,
            vars,
        })
    }

    /// `<artifact>-<version>.jar` and `<artifact>-<version>-client.jar` of
    /// the loader itself.
    fn own_jar_names(&self) -> (String, String) {
        let stem = format!(
            "{}-{}",
            self.request.loader.artifact_id(),
            self.request.artifact_version()
        );
        (format!("{stem}.jar"), format!("{stem}-client.jar"))
    }

    /// Variables every processor literal may reference.
    async fn processor_vars(
        &self,
        archive: &InstallerArchive,
        install_profile: &Value,
    ) -> LauncherResult<HashMap<String, String>> {
        let root = self.ctx.paths.root();
        let cache_dir = self.ctx.paths.installer_cache_dir();
        tokio::fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| LauncherError::io(&cache_dir, e))?;

        let data = profile::client_data(install_profile);
        let base_dir = root.to_path_buf();
        let resolved = archive
            .with_reader(move |reader| {
                let no_vars = HashMap::new();
                data.into_iter()
                    .map(|(key, literal)| {
                        debug!("Resolving data entry {} = {}", key, literal);
                        let value = parse_literal(&base_dir, &literal, &no_vars, |entry| {
                            reader.extract_to_cache(&entry, &cache_dir)
                        })?;
                        Ok::<_, LauncherError>((key, literal, value))
                    })
                    .collect::<LauncherResult<Vec<_>>>()
            })
            .await?;

        let mut vars = HashMap::new();
        for (key, literal, value) in resolved {
            match value {
                Some(value) => {
                    vars.insert(key, value);
                }
                None => warn!("Data entry {} ({}) did not resolve", key, literal),
            }
        }

        let vanilla_jar = safe_path_str(&self.vanilla_jar());
        vars.insert("SIDE".into(), CLIENT_SIDE.into());
        vars.insert("MINECRAFT_JAR".into(), vanilla_jar.clone());
        vars.insert("MINECRAFT_VERSION".into(), vanilla_jar);
        vars.insert("ROOT".into(), safe_path_str(root));
        vars.insert("INSTALLER".into(), safe_path_str(archive.path()));
        vars.insert(
            "LIBRARY_DIR".into(),
            safe_path_str(&self.ctx.paths.libraries_dir()),
        );
        Ok(vars)
    }

    async fn schedule_mappings(&self, requests: &[MappingRequest], schedule: &mut LibrarySchedule) -> LauncherResult<()> {
        let manifest = VersionManifest::fetch(self.ctx.http_client, self.ctx.version_manifest_url).await?;

        for request in requests {
            let entry = manifest.find_version(&request.version).ok_or_else(|| {
                LauncherError::InvalidInstaller(format!(
                    "Version {} not found in the version list",
                    request.version
                ))
            })?;
            let descriptor = entry.fetch_descriptor(self.ctx.http_client).await?;
            let mappings = descriptor
                .downloads
                .and_then(|d| d.client_mappings)
                .ok_or_else(|| {
                    LauncherError::InvalidInstaller(format!(
                        "Version {} has no client mappings",
                        request.version
                    ))
                })?;

            info!("Scheduling client mappings for {}", request.version);
            schedule.add(DownloadEntry {
                urls: vec![mappings.url],
                dest: request.output.clone(),
                sha1: Some(mappings.sha1),
                size: mappings.size,
            });
        }
        Ok(())
    }

    // ── Install ─────────────────────────────────────────

    /// Write the version json and run the processors in order.
    pub async fn install_modern(
        &self,
        archive: &InstallerArchive,
        plan: &ModernPlan,
        on_step: &(dyn Fn(usize, usize) + Send + Sync),
    ) -> LauncherResult<ProcessorSummary> {
        let json_path = self.ctx.paths.version_json(&self.version_name);
        archive.extract_entry_to_file(VERSION_FRAGMENT, &json_path).await?;
        info!("Wrote {:?}", json_path);

        run_processors(
            &plan.processors,
            &plan.vars,
            self.ctx.paths.root(),
            self.ctx.runner,
            on_step,
        )
        .await
    }

    pub async fn install_legacy(
        &self,
        archive: &InstallerArchive,
        install_profile: &Value,
        layout: ProfileLayout,
    ) -> LauncherResult<()> {
        match layout {
            ProfileLayout::LegacyInstallBlock => self.install_legacy_block(archive, install_profile).await,
            _ => self.install_legacy_embedded(archive, install_profile).await,
        }
    }

    /// Version json and a `maven/` tree shipped inside the installer.
    async fn install_legacy_embedded(&self, archive: &InstallerArchive, install_profile: &Value) -> LauncherResult<()> {
        info!("Installing {} from an embedded version json", self.version_name);

        let entry = str_field(install_profile, "json")
            .map(|name| name.trim_start_matches('/'))
            .ok_or_else(|| LauncherError::InvalidInstaller("install profile has no `json` entry".into()))?;
        let mut version = archive.read_json(entry).await?;
        let Some(object) = version.as_object_mut() else {
            return Err(LauncherError::InvalidInstaller(format!("{entry} is not an object")));
        };
        object.insert("id".into(), Value::String(self.version_name.clone()));
        self.ctx.store.save_raw(&self.version_name, &version).await?;

        archive
            .extract_directory("maven", &self.ctx.paths.libraries_dir())
            .await?;
        Ok(())
    }

    /// `install` block naming one jar plus a `versionInfo` document.
    async fn install_legacy_block(&self, archive: &InstallerArchive, install_profile: &Value) -> LauncherResult<()> {
        info!("Installing {} from an install block", self.version_name);

        let install = install_profile
            .get("install")
            .ok_or_else(|| LauncherError::InvalidInstaller("missing install block".into()))?;
        let artifact = str_field(install, "path")
            .ok_or_else(|| LauncherError::InvalidInstaller("install block has no path".into()))?;
        let file_path = str_field(install, "filePath")
            .ok_or_else(|| LauncherError::InvalidInstaller("install block has no filePath".into()))?;

        let jar = self
            .ctx
            .paths
            .libraries_dir()
            .join(MavenArtifact::parse(artifact)?.local_path());
        if jar.exists() {
            tokio::fs::remove_file(&jar)
                .await
                .map_err(|e| LauncherError::io(&jar, e))?;
        }
        archive.extract_entry_to_file(file_path, &jar).await?;

        let mut version_info = install_profile
            .get("versionInfo")
            .filter(|v| v.is_object())
            .cloned()
            .ok_or_else(|| LauncherError::InvalidInstaller("missing versionInfo".into()))?;
        if let Some(object) = version_info.as_object_mut() {
            if !object.contains_key("inheritsFrom") {
                object.insert(
                    "inheritsFrom".into(),
                    Value::String(self.request.minecraft_version.clone()),
                );
            }
        }
        self.ctx.store.save_raw(&self.version_name, &version_info).await?;

        // The unpacked jar cannot be downloaded; everything else can.
        let libraries: Vec<_> = profile::libraries(&version_info)?
            .into_iter()
            .filter(|lib| lib.name != artifact)
            .collect();
        let mut schedule = LibrarySchedule::new();
        schedule.add_libraries(&libraries, &self.ctx.paths.libraries_dir());
        schedule
            .download(self.ctx.downloads, self.ctx.concurrency)
            .await
    }

    // ── Finalize ────────────────────────────────────────

    pub async fn finalize(&self) -> LauncherResult<()> {
        let mut manifest = self.ctx.store.load_raw(&self.version_name).await?;
        if patch_ignore_list(&mut manifest) {
            info!("Added the primary jar to the ignore list of {}", self.version_name);
        }
        self.ctx.store.save_raw(&self.version_name, &manifest).await
    }
}

/// Mapping downloads the processors ask for. Only client-side requests
/// count; anything without a version or output is ignored.
pub fn mapping_requests(
    processors: &[Processor],
    root: &std::path::Path,
    vars: &HashMap<String, String>,
) -> LauncherResult<Vec<MappingRequest>> {
    let mut requests = Vec::new();
    for processor in processors.iter().filter(|p| p.is_side(CLIENT_SIDE)) {
        let options = parse_options(root, &processor.args, vars)?;
        if options.get("task") != Some(DOWNLOAD_MOJMAPS_TASK) || options.get("side") != Some(CLIENT_SIDE) {
            continue;
        }
        match (options.get("version"), options.get("output")) {
            (Some(version), Some(output)) if !version.is_empty() && !output.is_empty() => {
                requests.push(MappingRequest {
                    version: version.to_string(),
                    output: root.join(output),
                });
            }
            _ => warn!("Mapping step of {} lacks version or output", processor.jar),
        }
    }
    Ok(requests)
}

/// With `cpw.mods:bootstraplauncher` 0.1.17 or newer on the library list,
/// append the primary jar to the last `-DignoreList=` jvm argument.
/// Returns whether the document changed.
pub fn patch_ignore_list(manifest: &mut Value) -> bool {
    let has_new_bootstrap = manifest
        .get("libraries")
        .and_then(Value::as_array)
        .is_some_and(|libs| {
            libs.iter()
                .filter_map(|lib| lib.get("name").and_then(Value::as_str))
                .filter_map(|name| MavenArtifact::parse(name).ok())
                .any(|a| {
                    a.is("cpw.mods", "bootstraplauncher")
                        && compare_versions(&a.version, BOOTSTRAP_PATCH_VERSION) != Ordering::Less
                })
        });
    if !has_new_bootstrap {
        return false;
    }

    let Some(jvm) = manifest
        .pointer_mut("/arguments/jvm")
        .and_then(Value::as_array_mut)
    else {
        return false;
    };
    let Some(arg) = jvm
        .iter_mut()
        .rev()
        .find(|arg| arg.as_str().is_some_and(|s| s.starts_with(IGNORE_LIST_FLAG)))
    else {
        return false;
    };

    let current = arg.as_str().unwrap_or_default().to_string();
    if current.split(',').any(|entry| entry == PRIMARY_JAR_TOKEN) {
        return false;
    }
    *arg = Value::String(format!("{current},{PRIMARY_JAR_TOKEN}"));
    true
}
