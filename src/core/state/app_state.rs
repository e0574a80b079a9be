// ─── Game Core ───
// Owns the collaborators and the launch/install guards. One instance per
// application; clones share state.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::core::auth::{AccountProvider, StaticAccount};
use crate::core::downloader::{DownloadService, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;
use crate::core::java::{JavaRuntime, RuntimeRegistry};
use crate::core::launch::task::RunningProcess;
use crate::core::launch::{
    BootstrapSequencer, CommandSpec, GameLaunch, LaunchContext, LaunchReport, NativeLinker,
    ProcessLauncher, RendererRegistry, SystemLinker, SystemProcessLauncher,
};
use crate::core::loaders::{
    InstallContext, InstallKey, InstallRequest, InstallResult, JavaProcessorRunner,
    ModLoaderInstaller, ProcessorRunner,
};
use crate::core::paths::GamePaths;
use crate::core::progress::ProgressSink;
use crate::core::settings::{FileSettings, SettingsProvider};
use crate::core::version::manifest::VERSION_MANIFEST_URL;
use crate::core::version::{FsVersionStore, ManifestStore};

/// Observable launch state. Transitions only go
/// `Idle → Launching → Running → Idle` (or `Launching → Idle` on failure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LaunchState {
    Idle,
    Launching { version: String },
    Running { version: String },
}

pub type ExitCallback = Arc<dyn Fn(i32, bool) + Send + Sync>;

/// Answer to a launch request.
pub enum LaunchRequest {
    Started(LaunchJob),
    /// Another launch is in flight; the request was dropped, not queued.
    Ignored,
}

impl LaunchRequest {
    pub fn is_ignored(&self) -> bool {
        matches!(self, LaunchRequest::Ignored)
    }
}

pub struct LaunchJob {
    handle: JoinHandle<LauncherResult<LaunchReport>>,
}

impl LaunchJob {
    /// Tear the launch down. A spawned game is killed with it.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub async fn wait(self) -> LauncherResult<LaunchReport> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(LauncherError::Cancelled),
            Err(e) => Err(LauncherError::Other(format!("launch task failed: {e}"))),
        }
    }
}

pub struct InstallJob {
    version_name: String,
    handle: JoinHandle<InstallResult>,
}

impl InstallJob {
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub async fn wait(self) -> InstallResult {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                warn!("Install of {} cancelled", self.version_name);
                InstallResult::failed(self.version_name, LauncherError::Cancelled)
            }
            Err(e) => InstallResult::failed(
                self.version_name,
                LauncherError::Other(format!("install task failed: {e}")),
            ),
        }
    }
}

#[derive(Clone)]
pub struct GameCore {
    paths: GamePaths,
    http_client: reqwest::Client,
    downloads: Arc<dyn DownloadService>,
    store: Arc<dyn ManifestStore>,
    settings: Arc<dyn SettingsProvider>,
    accounts: Arc<dyn AccountProvider>,
    linker: Arc<dyn NativeLinker>,
    launcher: Arc<dyn ProcessLauncher>,
    processor_runner: Option<Arc<dyn ProcessorRunner>>,
    renderers: RendererRegistry,
    version_manifest_url: String,
    concurrency: usize,
    launch_state: Arc<watch::Sender<LaunchState>>,
    installs: Arc<Mutex<HashSet<InstallKey>>>,
    /// Runtime jobs are spawned on; the caller's runtime when unset.
    runtime: Option<Handle>,
}

impl GameCore {
    /// Core with the shipped collaborators: HTTP downloads, version files
    /// under `paths.root()`, settings in the launcher home, no account.
    /// Jobs run on the runtime current at construction, if any.
    pub fn new(paths: GamePaths) -> LauncherResult<Self> {
        let http_client = build_http_client()?;
        let downloads = Downloader::with_client(http_client.clone());
        let (launch_state, _) = watch::channel(LaunchState::Idle);

        Ok(Self {
            store: Arc::new(FsVersionStore::new(paths.clone())),
            settings: Arc::new(FileSettings::load(paths.home_dir())),
            downloads: Arc::new(downloads),
            accounts: Arc::new(StaticAccount::default()),
            linker: Arc::new(SystemLinker),
            launcher: Arc::new(SystemProcessLauncher),
            processor_runner: None,
            renderers: RendererRegistry::builtin(),
            version_manifest_url: VERSION_MANIFEST_URL.to_string(),
            concurrency: 8,
            launch_state: Arc::new(launch_state),
            installs: Arc::new(Mutex::new(HashSet::new())),
            runtime: Handle::try_current().ok(),
            http_client,
            paths,
        })
    }

    pub fn with_downloads(mut self, downloads: Arc<dyn DownloadService>) -> Self {
        self.downloads = downloads;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ManifestStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_accounts(mut self, accounts: Arc<dyn AccountProvider>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_linker(mut self, linker: Arc<dyn NativeLinker>) -> Self {
        self.linker = linker;
        self
    }

    pub fn with_process_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Use `runner` for every processor instead of a detected Java runtime.
    pub fn with_processor_runner(mut self, runner: Arc<dyn ProcessorRunner>) -> Self {
        self.processor_runner = Some(runner);
        self
    }

    pub fn with_renderers(mut self, renderers: RendererRegistry) -> Self {
        self.renderers = renderers;
        self
    }

    /// Spawn launch and install jobs on `runtime`.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_version_manifest_url(mut self, url: impl Into<String>) -> Self {
        self.version_manifest_url = url.into();
        self
    }

    pub fn paths(&self) -> &GamePaths {
        &self.paths
    }

    fn runtime_handle(&self) -> LauncherResult<Handle> {
        self.runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
            .ok_or_else(|| LauncherError::Other("no tokio runtime to run the job on".into()))
    }

    pub fn launch_state(&self) -> LaunchState {
        self.launch_state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LaunchState> {
        self.launch_state.subscribe()
    }

    // ── Launch ──────────────────────────────────────────

    /// Launch context for an installed version, filled from the settings
    /// and the current account.
    pub async fn prepare_launch(&self, version_name: &str) -> LauncherResult<LaunchContext> {
        let manifest = self.store.load_manifest(version_name).await?;
        let settings = self.settings.settings();
        let runtime = self.pick_runtime(manifest.required_java_major())?;
        let account = self.accounts.require_account()?;

        let mut ctx = LaunchContext::new(version_name, manifest, runtime).with_account(account);
        ctx.custom_jvm_args = settings.jvm_args;
        ctx.ram_mb = settings.ram_allocation_mb;
        ctx.renderer = settings.renderer;
        ctx.driver = settings.driver;
        Ok(ctx)
    }

    fn pick_runtime(&self, required_major: u32) -> LauncherResult<JavaRuntime> {
        let settings = self.settings.settings();
        let registry = RuntimeRegistry::new(self.paths.runtimes_dir());

        if settings.auto_pick_runtime {
            if let Some(runtime) = registry.pick_for(required_major) {
                info!("Auto-picked runtime {} for Java {}", runtime.name, required_major);
                return Ok(runtime);
            }
        }
        match settings.java_runtime.as_deref() {
            Some(name) => registry.get(name),
            None => registry.list().into_iter().next().ok_or_else(|| {
                LauncherError::JavaExecution(format!("no Java runtime for Java {required_major}"))
            }),
        }
    }

    /// Start a launch unless one is already in flight. `on_exit` receives
    /// the exit code and signal flag once the process is gone. Fails when
    /// no runtime is configured or current.
    pub fn launch(&self, ctx: LaunchContext, on_exit: ExitCallback) -> LauncherResult<LaunchRequest> {
        let runtime = self.runtime_handle()?;
        let version = ctx.version_name.clone();
        let acquired = self.launch_state.send_if_modified(|state| {
            if *state != LaunchState::Idle {
                return false;
            }
            *state = LaunchState::Launching {
                version: version.clone(),
            };
            true
        });
        if !acquired {
            warn!("Launch of {} ignored: {:?}", version, self.launch_state());
            return Ok(LaunchRequest::Ignored);
        }

        let core = self.clone();
        let handle = runtime.spawn(async move {
            let _idle = BackToIdle(core.launch_state.clone());
            let launcher = MarkRunning {
                inner: core.launcher.clone(),
                state: core.launch_state.clone(),
                version,
            };
            let sequencer = BootstrapSequencer::new(&core.paths, core.linker.as_ref(), &launcher);
            let mut kind = GameLaunch::new(ctx).with_renderers(core.renderers.clone());

            let result = sequencer.run(&mut kind, on_exit.as_ref()).await;
            if let Err(e) = &result {
                error!("Launch failed: {}", e);
            }
            result
        });
        Ok(LaunchRequest::Started(LaunchJob { handle }))
    }

    // ── Install ─────────────────────────────────────────

    /// Start an install. A second request for the same loader/version while
    /// one is running fails with `InstallInProgress`.
    pub fn start_install(&self, request: InstallRequest, progress: Arc<dyn ProgressSink>) -> LauncherResult<InstallJob> {
        let runtime = self.runtime_handle()?;
        let key = request.key();
        {
            let mut installs = self
                .installs
                .lock()
                .map_err(|_| LauncherError::Other("install registry poisoned".into()))?;
            if !installs.insert(key.clone()) {
                return Err(LauncherError::InstallInProgress(key.to_string()));
            }
        }

        let version_name = request.version_name();
        let core = self.clone();
        let handle = runtime.spawn(async move {
            let _slot = InstallSlot {
                installs: core.installs.clone(),
                key,
            };
            let runner = core.processor_runner_for(&request).await;
            let ctx = InstallContext {
                paths: &core.paths,
                downloads: core.downloads.as_ref(),
                http_client: &core.http_client,
                store: core.store.as_ref(),
                runner: runner.as_ref(),
                version_manifest_url: &core.version_manifest_url,
                concurrency: core.concurrency,
            };
            ModLoaderInstaller::new(ctx)
                .install(&request, progress.as_ref())
                .await
        });

        Ok(InstallJob {
            version_name,
            handle,
        })
    }

    /// Install a mod loader and wait for the result.
    pub async fn install_mod_loader(&self, request: InstallRequest, progress: Arc<dyn ProgressSink>) -> InstallResult {
        let version_name = request.version_name();
        match self.start_install(request, progress) {
            Ok(job) => job.wait().await,
            Err(e) => InstallResult::failed(version_name, e),
        }
    }

    /// Processors run on the runtime the base version asks for.
    async fn processor_runner_for(&self, request: &InstallRequest) -> Arc<dyn ProcessorRunner> {
        if let Some(runner) = &self.processor_runner {
            return runner.clone();
        }

        let required = match self.store.load_manifest(&request.minecraft_version).await {
            Ok(manifest) => manifest.required_java_major(),
            Err(_) => 8,
        };
        match self.pick_runtime(required) {
            Ok(runtime) => Arc::new(JavaProcessorRunner::new(runtime.java_binary())),
            Err(e) => {
                warn!("{}; running processors with `java` from PATH", e);
                Arc::new(JavaProcessorRunner::new("java"))
            }
        }
    }
}

/// Returns the launch state to `Idle` when the launch task ends or is
/// aborted.
struct BackToIdle(Arc<watch::Sender<LaunchState>>);

impl Drop for BackToIdle {
    fn drop(&mut self) {
        self.0.send_replace(LaunchState::Idle);
    }
}

struct InstallSlot {
    installs: Arc<Mutex<HashSet<InstallKey>>>,
    key: InstallKey,
}

impl Drop for InstallSlot {
    fn drop(&mut self) {
        if let Ok(mut installs) = self.installs.lock() {
            installs.remove(&self.key);
        }
    }
}

/// Flips `Launching → Running` once the process is actually up.
struct MarkRunning {
    inner: Arc<dyn ProcessLauncher>,
    state: Arc<watch::Sender<LaunchState>>,
    version: String,
}

#[async_trait]
impl ProcessLauncher for MarkRunning {
    async fn spawn(&self, spec: &CommandSpec) -> LauncherResult<Box<dyn RunningProcess>> {
        let process = self.inner.spawn(spec).await?;
        self.state.send_replace(LaunchState::Running {
            version: self.version.clone(),
        });
        Ok(process)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::LaunchAccountProfile;
    use crate::core::launch::native::testing::RecordingLinker;
    use crate::core::launch::task::testing::ScriptedLauncher;
    use crate::core::launch::LaunchStage;
    use crate::core::loaders::processor::testing::FakeRunner;
    use crate::core::loaders::schedule::testing::FakeDownloads;
    use crate::core::loaders::ModLoader;
    use crate::core::progress::NoProgress;
    use crate::core::settings::LauncherSettings;
    use std::path::{Path, PathBuf};
    use tokio::sync::Notify;

    struct Fixture {
        root: PathBuf,
        paths: GamePaths,
    }

    impl Fixture {
        fn new(tag: &str) -> Self {
            let root = std::env::temp_dir().join(format!("gamecore-core-{}-{}", tag, std::process::id()));
            let _ = std::fs::remove_dir_all(&root);

            let natives = root.join("natives");
            std::fs::create_dir_all(&natives).unwrap();
            std::fs::write(natives.join("libGL.so.1"), b"elf").unwrap();

            let runtime_home = root.join(".launcher/runtimes/jre-17");
            std::fs::create_dir_all(runtime_home.join("bin")).unwrap();
            std::fs::write(runtime_home.join("release"), "JAVA_VERSION=\"17.0.8\"\n").unwrap();

            let paths = GamePaths::new(&root).with_native_lib_dir(&natives);
            let version_dir = paths.version_dir("1.20.1");
            std::fs::create_dir_all(&version_dir).unwrap();
            std::fs::write(paths.version_jar("1.20.1"), b"jar").unwrap();
            std::fs::write(
                paths.version_json("1.20.1"),
                serde_json::json!({
                    "id": "1.20.1",
                    "mainClass": "net.minecraft.client.main.Main",
                    "javaVersion": {"majorVersion": 17},
                    "arguments": {"jvm": ["-cp", "${classpath}"], "game": ["--username", "${auth_player_name}"]}
                })
                .to_string(),
            )
            .unwrap();

            Self { root, paths }
        }

        fn core(&self, launcher: ScriptedLauncher) -> GameCore {
            let settings = LauncherSettings {
                ram_allocation_mb: 3072,
                jvm_args: "-XX:+UseG1GC".into(),
                ..LauncherSettings::default()
            };
            GameCore::new(self.paths.clone())
                .unwrap()
                .with_settings(Arc::new(settings))
                .with_accounts(Arc::new(StaticAccount(Some(LaunchAccountProfile::offline("Alex")))))
                .with_linker(Arc::new(RecordingLinker::default()))
                .with_process_launcher(Arc::new(launcher))
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    fn ignore_exit() -> ExitCallback {
        Arc::new(|_, _| {})
    }

    #[tokio::test]
    async fn prepared_context_uses_settings_and_account() {
        let fx = Fixture::new("prepare");
        let core = fx.core(ScriptedLauncher::exiting_with(0));

        let ctx = core.prepare_launch("1.20.1").await.unwrap();
        assert_eq!(ctx.runtime.major, 17);
        assert_eq!(ctx.ram_mb, 3072);
        assert_eq!(ctx.custom_jvm_args, "-XX:+UseG1GC");
        assert_eq!(ctx.account.unwrap().username, "Alex");
    }

    #[tokio::test]
    async fn launch_runs_and_returns_to_idle() {
        let fx = Fixture::new("launch");
        let launcher = ScriptedLauncher::exiting_with(7);
        let core = fx.core(launcher.clone());
        let ctx = core.prepare_launch("1.20.1").await.unwrap();

        let exits = Arc::new(Mutex::new(Vec::new()));
        let sink = exits.clone();
        let on_exit: ExitCallback = Arc::new(move |code, signal| sink.lock().unwrap().push((code, signal)));

        let mut states = core.subscribe();
        let Ok(LaunchRequest::Started(job)) = core.launch(ctx.clone(), on_exit) else {
            panic!("first launch must start");
        };
        let report = job.wait().await.unwrap();
        assert_eq!(report.outcome.exit_code, 7);
        assert_eq!(report.stages.last(), Some(&LaunchStage::Exited));
        assert_eq!(*exits.lock().unwrap(), vec![(7, false)]);
        assert_eq!(core.launch_state(), LaunchState::Idle);
        assert!(states.has_changed().unwrap());
        assert!(launcher.last().is_some());
    }

    #[tokio::test]
    async fn second_launch_is_ignored_while_busy() {
        let fx = Fixture::new("busy");
        let core = fx.core(ScriptedLauncher::exiting_with(0));
        let ctx = core.prepare_launch("1.20.1").await.unwrap();

        core.launch_state.send_replace(LaunchState::Running {
            version: "1.20.1".into(),
        });
        assert!(core.launch(ctx, ignore_exit()).unwrap().is_ignored());
        assert_eq!(
            core.launch_state(),
            LaunchState::Running {
                version: "1.20.1".into()
            }
        );
    }

    #[tokio::test]
    async fn duplicate_install_is_rejected() {
        let fx = Fixture::new("dup");
        let core = fx
            .core(ScriptedLauncher::exiting_with(0))
            .with_downloads(Arc::new(FakeDownloads::default()))
            .with_processor_runner(Arc::new(FakeRunner::default()));
        let request = InstallRequest::new(ModLoader::Forge, "1.20.1", "47.2.0");

        core.installs.lock().unwrap().insert(request.key());
        let result = core
            .install_mod_loader(request.clone(), Arc::new(NoProgress))
            .await;
        assert!(matches!(result.error, Some(LauncherError::InstallInProgress(_))));

        core.installs.lock().unwrap().clear();
        let result = core.install_mod_loader(request.clone(), Arc::new(NoProgress)).await;
        // The fake download leaves a non-zip installer behind.
        assert!(!result.success);
        assert!(core.installs.lock().unwrap().is_empty());
        assert!(!crate::core::loaders::is_installed(&fx.paths, &request.version_name()));
    }

    /// Parks every fetch until the task is torn down.
    struct StalledDownloads {
        entered: Arc<Notify>,
    }

    #[async_trait]
    impl DownloadService for StalledDownloads {
        async fn fetch(&self, _urls: &[String], _target: &Path, _sha1: Option<&str>, _size: u64) -> LauncherResult<()> {
            self.entered.notify_one();
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn aborted_install_reports_cancelled() {
        let fx = Fixture::new("abort");
        let entered = Arc::new(Notify::new());
        let core = fx
            .core(ScriptedLauncher::exiting_with(0))
            .with_downloads(Arc::new(StalledDownloads {
                entered: entered.clone(),
            }))
            .with_processor_runner(Arc::new(FakeRunner::default()));
        let request = InstallRequest::new(ModLoader::NeoForge, "1.20.1", "20.1.0");

        // A marker from an earlier install must not survive the retry.
        let marker = fx.paths.installed_marker(&request.version_name());
        std::fs::create_dir_all(marker.parent().unwrap()).unwrap();
        std::fs::write(&marker, "stale").unwrap();

        let job = core.start_install(request.clone(), Arc::new(NoProgress)).unwrap();
        entered.notified().await;
        assert!(matches!(
            core.start_install(request.clone(), Arc::new(NoProgress)),
            Err(LauncherError::InstallInProgress(_))
        ));

        job.abort();
        let result = job.wait().await;
        assert!(!result.success);
        assert_eq!(result.version_name, request.version_name());
        assert!(matches!(result.error, Some(LauncherError::Cancelled)));
        assert!(!crate::core::loaders::is_installed(&fx.paths, &request.version_name()));
        assert!(core.installs.lock().unwrap().is_empty());
    }

    #[test]
    fn jobs_run_on_the_configured_runtime() {
        let fx = Fixture::new("runtime");
        let core = fx.core(ScriptedLauncher::exiting_with(3));
        let rt = tokio::runtime::Runtime::new().unwrap();
        let ctx = rt.block_on(core.prepare_launch("1.20.1")).unwrap();

        let Err(err) = core.launch(ctx.clone(), ignore_exit()) else {
            panic!("launch without a runtime must fail");
        };
        assert!(matches!(err, LauncherError::Other(_)));
        assert_eq!(core.launch_state(), LaunchState::Idle);
        let request = InstallRequest::new(ModLoader::Forge, "1.20.1", "47.2.0");
        assert!(core.start_install(request, Arc::new(NoProgress)).is_err());
        assert!(core.installs.lock().unwrap().is_empty());

        let core = core.with_runtime(rt.handle().clone());
        let Ok(LaunchRequest::Started(job)) = core.launch(ctx, ignore_exit()) else {
            panic!("launch with a runtime must start");
        };
        let report = rt.block_on(job.wait()).unwrap();
        assert_eq!(report.outcome.exit_code, 3);
        assert_eq!(core.launch_state(), LaunchState::Idle);
    }
}
