// ─── Native Bootstrap ───
// Ordered launch sequence: plugins, validation, environment, native
// libraries, argv, working directory, spawn, exit.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::JavaRuntime;
use crate::core::paths::GamePaths;
use crate::core::version::VersionJson;

use super::arguments::{build_game_args, build_jvm_args, LaunchVariables};
use super::classpath::{client_jar, join_classpath, resolve_classpath, safe_path_str};
use super::context::LaunchContext;
use super::native::{
    device_abi, join_search_path, LoadOutcome, LoadReport, NativeLinker, NativeLoader, Severity,
    AUDIO_LIBRARIES, OPTIONAL_RUNTIME_LIBRARIES, RUNTIME_LIBRARIES, UTILITY_LIBRARIES,
};
use super::renderer::{Renderer, RendererRegistry};
use super::task::{
    format_command_for_logs, log_name, prepend_env_path, CommandSpec, LaunchOutcome,
    ProcessLauncher,
};
use super::user_args::{
    default_properties, ensure_resolv_conf, finalize_user_args, merge_user_args,
    parse_java_arguments, patcher_path, split_preserving_quotes,
};

/// `PATH` tail used when the host has none.
const FALLBACK_SYSTEM_PATH: &str = "/sbin:/vendor/bin:/system/sbin:/system/bin:/system/xbin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchStage {
    InitPlugins,
    Validate,
    SetEnv,
    DlopenRuntimeLibs,
    DlopenEngineLibs,
    BuildJvmArgs,
    Chdir,
    SpawnProcess,
    AwaitExit,
    Cleanup,
    Exited,
}

impl LaunchStage {
    pub const ORDER: [LaunchStage; 11] = [
        LaunchStage::InitPlugins,
        LaunchStage::Validate,
        LaunchStage::SetEnv,
        LaunchStage::DlopenRuntimeLibs,
        LaunchStage::DlopenEngineLibs,
        LaunchStage::BuildJvmArgs,
        LaunchStage::Chdir,
        LaunchStage::SpawnProcess,
        LaunchStage::AwaitExit,
        LaunchStage::Cleanup,
        LaunchStage::Exited,
    ];
}

/// What a finished (or failed-to-spawn) launch went through.
#[derive(Debug, Clone)]
pub struct LaunchReport {
    pub stages: Vec<LaunchStage>,
    pub loads: Vec<LoadReport>,
    pub command: CommandSpec,
    pub outcome: LaunchOutcome,
    pub log_name: String,
}

/// The part of a launch that differs between a game and a bare JVM run.
#[async_trait]
pub trait LaunchKind: Send + Sync {
    fn runtime(&self) -> &JavaRuntime;

    /// Whitespace-separated user JVM arguments.
    fn user_args(&self) -> &str;

    fn ram_mb(&self) -> u32;

    fn log_name(&self) -> String;

    fn init_plugins(&mut self, _paths: &GamePaths, _search_path: &[PathBuf]) -> LauncherResult<()> {
        Ok(())
    }

    fn validate(&self, paths: &GamePaths) -> LauncherResult<()>;

    fn extend_env(&self, _paths: &GamePaths, _env: &mut BTreeMap<String, String>) {}

    /// Loaded between the audio and utility libraries.
    fn load_graphics_libraries(&self, _paths: &GamePaths, _loader: &mut NativeLoader<'_>) {}

    /// Loaded after every base engine library.
    fn load_engine_extras(&self, _paths: &GamePaths, _loader: &mut NativeLoader<'_>) {}

    /// Additional overridable `-D` defaults.
    fn extra_properties(&self, _paths: &GamePaths) -> Vec<(String, String)> {
        Vec::new()
    }

    fn finalize_args(&self, _args: &mut Vec<String>) {}

    /// Everything after the finalized user arguments.
    fn launch_args(&self, paths: &GamePaths, natives_directory: &str) -> LauncherResult<Vec<String>>;

    fn working_dir(&self, paths: &GamePaths) -> PathBuf;

    /// Side effects on the working directory before the process starts.
    async fn prepare_working_dir(&self, _dir: &Path) -> LauncherResult<()> {
        Ok(())
    }

    fn cleanup(&self, _paths: &GamePaths) {}
}

pub struct BootstrapSequencer<'a> {
    paths: &'a GamePaths,
    linker: &'a dyn NativeLinker,
    launcher: &'a dyn ProcessLauncher,
}

impl<'a> BootstrapSequencer<'a> {
    pub fn new(paths: &'a GamePaths, linker: &'a dyn NativeLinker, launcher: &'a dyn ProcessLauncher) -> Self {
        Self {
            paths,
            linker,
            launcher,
        }
    }

    /// Run every stage in order. Errors before the spawn abort the launch;
    /// from the spawn on, the result is reported through `on_exit`.
    pub async fn run(
        &self,
        kind: &mut dyn LaunchKind,
        on_exit: &(dyn Fn(i32, bool) + Send + Sync),
    ) -> LauncherResult<LaunchReport> {
        let paths = self.paths;
        let mut trail = StageTrail::default();
        let search_path = kind
            .runtime()
            .library_search_path(device_abi(), paths.native_lib_dir());

        trail.enter(LaunchStage::InitPlugins);
        kind.init_plugins(paths, &search_path)?;

        trail.enter(LaunchStage::Validate);
        kind.validate(paths)?;

        trail.enter(LaunchStage::SetEnv);
        let mut env = base_env(kind.runtime(), paths, &search_path);
        kind.extend_env(paths, &mut env);
        for (key, value) in &env {
            debug!("env {}={}", key, value);
        }

        let mut loader = NativeLoader::new(self.linker, search_path.clone());

        trail.enter(LaunchStage::DlopenRuntimeLibs);
        for lib in RUNTIME_LIBRARIES {
            loader.load_from_search_path(lib, Severity::Recoverable);
        }
        for lib in OPTIONAL_RUNTIME_LIBRARIES {
            match loader.find(lib) {
                Some(path) => {
                    loader.load(&path, Severity::Recoverable);
                }
                None => warn!("{} not found in library path", lib),
            }
        }

        trail.enter(LaunchStage::DlopenEngineLibs);
        let native_dir = paths.native_lib_dir().to_path_buf();
        for lib in AUDIO_LIBRARIES {
            loader.load_if_present(&native_dir, lib);
        }
        kind.load_graphics_libraries(paths, &mut loader);
        for lib in UTILITY_LIBRARIES {
            loader.load_if_present(&native_dir, lib);
        }
        kind.load_engine_extras(paths, &mut loader);

        let loads = loader.into_reports();
        if let Some(fatal) = loads.iter().find(|r| r.is_fatal()) {
            return Err(LauncherError::NativeLoad {
                path: fatal
                    .path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(&fatal.library)),
                reason: match &fatal.outcome {
                    LoadOutcome::Fatal(reason) => reason.clone(),
                    _ => String::new(),
                },
            });
        }

        trail.enter(LaunchStage::BuildJvmArgs);
        if let Err(e) = ensure_resolv_conf(paths).await {
            warn!("Could not write DNS resolver file: {}", e);
        }
        let working_dir = kind.working_dir(paths);
        let mut properties = default_properties(kind.runtime(), paths, &working_dir);
        properties.extend(kind.extra_properties(paths));

        let mut args = merge_user_args(parse_java_arguments(kind.user_args()), &properties);
        finalize_user_args(&mut args, kind.ram_mb(), &patcher_path(paths));
        kind.finalize_args(&mut args);
        args.extend(kind.launch_args(paths, &join_search_path(&search_path))?);

        trail.enter(LaunchStage::Chdir);
        tokio::fs::create_dir_all(&working_dir)
            .await
            .map_err(|e| LauncherError::io(&working_dir, e))?;
        kind.prepare_working_dir(&working_dir).await?;

        let command = CommandSpec {
            program: kind.runtime().java_binary(),
            args,
            env,
            cwd: working_dir,
        };
        let log_name = kind.log_name();
        info!("Launch log: {}", log_name);
        debug!("argv: {}", format_command_for_logs(&command));

        trail.enter(LaunchStage::SpawnProcess);
        let spawned = self.launcher.spawn(&command).await;

        trail.enter(LaunchStage::AwaitExit);
        let outcome = match spawned {
            Ok(mut process) => match process.wait().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Waiting for the runtime failed: {}", e);
                    LaunchOutcome::SPAWN_FAILED
                }
            },
            Err(e) => {
                error!("Failed to start the runtime: {}", e);
                LaunchOutcome::SPAWN_FAILED
            }
        };
        info!(
            "Runtime exited with code {} (signal: {})",
            outcome.exit_code, outcome.is_signal
        );

        trail.enter(LaunchStage::Cleanup);
        kind.cleanup(paths);

        trail.enter(LaunchStage::Exited);
        on_exit(outcome.exit_code, outcome.is_signal);

        Ok(LaunchReport {
            stages: trail.stages,
            loads,
            command,
            outcome,
            log_name,
        })
    }
}

#[derive(Default)]
struct StageTrail {
    stages: Vec<LaunchStage>,
}

impl StageTrail {
    fn enter(&mut self, stage: LaunchStage) {
        info!("==================== {:?} ====================", stage);
        self.stages.push(stage);
    }
}

fn base_env(runtime: &JavaRuntime, paths: &GamePaths, search_path: &[PathBuf]) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    let runtime_bin = safe_path_str(&runtime.home.join("bin"));

    env.insert("POJAV_NATIVEDIR".into(), safe_path_str(paths.native_lib_dir()));
    env.insert("JAVA_HOME".into(), safe_path_str(&runtime.java_home()));
    env.insert("HOME".into(), safe_path_str(paths.home_dir()));
    env.insert("TMPDIR".into(), safe_path_str(paths.cache_dir()));
    env.insert(
        "PATH".into(),
        prepend_env_path("PATH", &runtime_bin, FALLBACK_SYSTEM_PATH),
    );
    env.insert("LD_LIBRARY_PATH".into(), join_search_path(search_path));
    env.insert("FORCE_VSYNC".into(), "false".into());
    env.insert("LIBGL_ALWAYS_SOFTWARE".into(), "0".into());
    env.insert("FONTCONFIG_PATH".into(), safe_path_str(paths.home_dir()));
    env
}

// ── Game launch ─────────────────────────────────────────

pub struct GameLaunch {
    ctx: LaunchContext,
    renderers: RendererRegistry,
    renderer: Option<Renderer>,
    gles_version: u32,
}

impl GameLaunch {
    pub fn new(ctx: LaunchContext) -> Self {
        Self {
            ctx,
            renderers: RendererRegistry::builtin(),
            renderer: None,
            gles_version: 3,
        }
    }

    pub fn with_renderers(mut self, renderers: RendererRegistry) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn with_gles_version(mut self, version: u32) -> Self {
        self.gles_version = version;
        self
    }

    pub fn context(&self) -> &LaunchContext {
        &self.ctx
    }

    /// Chosen during `InitPlugins`.
    pub fn renderer(&self) -> Option<&Renderer> {
        self.renderer.as_ref()
    }
}

#[async_trait]
impl LaunchKind for GameLaunch {
    fn runtime(&self) -> &JavaRuntime {
        &self.ctx.runtime
    }

    fn user_args(&self) -> &str {
        &self.ctx.custom_jvm_args
    }

    fn ram_mb(&self) -> u32 {
        self.ctx.ram_mb
    }

    fn log_name(&self) -> String {
        log_name("game", &self.ctx.version_name)
    }

    fn init_plugins(&mut self, _paths: &GamePaths, search_path: &[PathBuf]) -> LauncherResult<()> {
        let renderer = self
            .renderers
            .select(self.ctx.renderer.as_deref(), search_path)?;
        info!("Renderer: {} ({})", renderer.name, renderer.id);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn validate(&self, paths: &GamePaths) -> LauncherResult<()> {
        if self.ctx.manifest.main_class.trim().is_empty() {
            return Err(LauncherError::InvalidVersion(format!(
                "{}: mainClass missing",
                self.ctx.version_name
            )));
        }
        if self.ctx.account.is_none() {
            return Err(LauncherError::AccountMissing);
        }
        if client_jar(&self.ctx.manifest, paths, &self.ctx.version_name).is_none() {
            return Err(LauncherError::ClientJarMissing(
                paths.version_jar(&self.ctx.version_name),
            ));
        }
        Ok(())
    }

    fn extend_env(&self, paths: &GamePaths, env: &mut BTreeMap<String, String>) {
        let driver_path = match self.ctx.driver.as_deref().filter(|d| !d.is_empty()) {
            Some(driver) => paths.home_dir().join("drivers").join(driver),
            None => paths.native_lib_dir().to_path_buf(),
        };
        env.insert("DRIVER_PATH".into(), safe_path_str(&driver_path));

        if let Some(key) = loader_env_key(&self.ctx.manifest) {
            env.insert(key.into(), "1".into());
        }

        if let Some(renderer) = &self.renderer {
            env.extend(renderer.launch_env(paths.cache_dir(), self.ctx.ram_mb, self.gles_version));
        }
    }

    fn load_graphics_libraries(&self, paths: &GamePaths, loader: &mut NativeLoader<'_>) {
        let Some(renderer) = &self.renderer else {
            return;
        };
        for lib in &renderer.required_libraries {
            loader.load_if_present(paths.native_lib_dir(), lib);
        }
    }

    fn load_engine_extras(&self, _paths: &GamePaths, loader: &mut NativeLoader<'_>) {
        let Some(renderer) = &self.renderer else {
            warn!("No renderer selected");
            return;
        };

        if let Some(plugin) = &renderer.plugin {
            for lib in &plugin.dlopen {
                loader.load(&plugin.path.join(lib), Severity::Recoverable);
            }
        }

        loader.load_with_fallback(&renderer.gl_library_path(), Severity::Fatal);
    }

    fn finalize_args(&self, args: &mut Vec<String>) {
        if let Some(renderer) = &self.renderer {
            args.push(format!(
                "-Dorg.lwjgl.opengl.libname={}",
                renderer.gl_library_path().to_string_lossy()
            ));
        }
    }

    fn launch_args(&self, paths: &GamePaths, natives_directory: &str) -> LauncherResult<Vec<String>> {
        let ctx = &self.ctx;
        let env = ctx.rule_env();
        let account = ctx
            .account
            .clone()
            .ok_or(LauncherError::AccountMissing)?
            .sanitized();

        let entries = resolve_classpath(&ctx.manifest, paths, &ctx.version_name, &env);
        let classpath = join_classpath(&entries);
        let vars = LaunchVariables::for_launch(ctx, paths, &account, &classpath, natives_directory);

        let mut args = Vec::new();
        if let Some(jar) = client_jar(&ctx.manifest, paths, &ctx.version_name) {
            args.push(format!("-Dminecraft.client.jar={}", safe_path_str(&jar)));
        }
        args.extend(build_jvm_args(&ctx.manifest, &vars, &env).args);

        let main_class = ctx.manifest.main_class.clone();
        if ctx.runtime.major > 8 {
            if let Some((package, _)) = main_class.rsplit_once('.') {
                args.push("--add-exports".into());
                args.push(format!("{0}/{0}=ALL-UNNAMED", package));
            }
        }

        args.push(main_class);
        args.extend(build_game_args(&ctx.manifest, &vars, &env));

        if let Some(address) = ctx.server.as_deref().filter(|s| !s.trim().is_empty()) {
            match parse_server_address(address) {
                Some((host, port)) => {
                    args.push("--server".into());
                    args.push(host);
                    if let Some(port) = port {
                        args.push("--port".into());
                        args.push(port.to_string());
                    }
                }
                None => warn!("Invalid server address: {}", address),
            }
        }

        if let Some(world) = ctx.quick_play_singleplayer.as_deref() {
            args.push("--quickPlaySingleplayer".into());
            args.push(unicode_escaped(world));
        }

        Ok(args)
    }

    fn working_dir(&self, paths: &GamePaths) -> PathBuf {
        self.ctx.game_dir(paths)
    }

    async fn prepare_working_dir(&self, dir: &Path) -> LauncherResult<()> {
        disable_splash(dir).await
    }
}

/// Environment flag naming the mod loader found in the manifest's libraries.
pub fn loader_env_key(manifest: &VersionJson) -> Option<&'static str> {
    const KEYS: [(&str, &str); 6] = [
        ("net.neoforged", "INST_NEOFORGE"),
        ("net.minecraftforge:forge", "INST_FORGE"),
        ("net.minecraftforge:fmlloader", "INST_FORGE"),
        ("net.fabricmc:fabric-loader", "INST_FABRIC"),
        ("org.quiltmc:quilt-loader", "INST_QUILT"),
        ("optifine:OptiFine", "INST_OPTIFINE"),
    ];

    KEYS.iter()
        .find(|(prefix, _)| manifest.libraries.iter().any(|l| l.name.starts_with(prefix)))
        .map(|(_, key)| *key)
}

/// Turn off the legacy Forge splash screen, which cannot render here.
pub async fn disable_splash(game_dir: &Path) -> LauncherResult<()> {
    let config_dir = game_dir.join("config");
    let file = config_dir.join("splash.properties");

    if file.is_file() {
        let content = tokio::fs::read_to_string(&file)
            .await
            .map_err(|e| LauncherError::io(&file, e))?;
        if content.contains("enabled=true") {
            tokio::fs::write(&file, content.replace("enabled=true", "enabled=false"))
                .await
                .map_err(|e| LauncherError::io(&file, e))?;
        }
        return Ok(());
    }

    tokio::fs::create_dir_all(&config_dir)
        .await
        .map_err(|e| LauncherError::io(&config_dir, e))?;
    tokio::fs::write(&file, "enabled=false")
        .await
        .map_err(|e| LauncherError::io(&file, e))
}

/// `host[:port]`, with IPv6 hosts in brackets.
fn parse_server_address(address: &str) -> Option<(String, Option<u16>)> {
    let address = address.trim();

    if let Some(rest) = address.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = match tail.strip_prefix(':') {
            Some(port) => Some(port.parse().ok()?),
            None if tail.is_empty() => None,
            None => return None,
        };
        return Some((host.to_string(), port));
    }

    match address.split_once(':') {
        Some((host, port)) if !host.is_empty() => Some((host.to_string(), Some(port.parse().ok()?))),
        Some(_) => None,
        None => Some((address.to_string(), None)),
    }
}

/// Non-ASCII characters as `\uXXXX` escapes.
fn unicode_escaped(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

// ── JVM launch ──────────────────────────────────────────

const LAUNCHER_PROFILES: &str = r#"{
    "profiles": {},
    "settings": {
        "enableSnapshots": false,
        "enableAdvanced": false,
        "keepLauncherOpen": false,
        "showGameLog": false,
        "showMenu": false,
        "soundOn": false
    },
    "version": 3
}"#;

/// A bare Java program run on a runtime, such as a mod-loader installer.
pub struct JvmLaunch {
    /// Program arguments; double quotes group words.
    pub jvm_args: String,
    pub user_home: Option<PathBuf>,
    pub runtime: JavaRuntime,
    pub user_args: String,
    pub ram_mb: u32,
}

#[async_trait]
impl LaunchKind for JvmLaunch {
    fn runtime(&self) -> &JavaRuntime {
        &self.runtime
    }

    fn user_args(&self) -> &str {
        &self.user_args
    }

    fn ram_mb(&self) -> u32 {
        self.ram_mb
    }

    fn log_name(&self) -> String {
        log_name("jvm", "")
    }

    fn validate(&self, _paths: &GamePaths) -> LauncherResult<()> {
        if self.jvm_args.trim().is_empty() {
            return Err(LauncherError::JavaExecution("no program arguments".into()));
        }
        Ok(())
    }

    fn launch_args(&self, _paths: &GamePaths, _natives_directory: &str) -> LauncherResult<Vec<String>> {
        Ok(split_preserving_quotes(&self.jvm_args))
    }

    fn working_dir(&self, paths: &GamePaths) -> PathBuf {
        self.user_home
            .clone()
            .unwrap_or_else(|| paths.home_dir().to_path_buf())
    }

    async fn prepare_working_dir(&self, dir: &Path) -> LauncherResult<()> {
        let profiles = dir.join("launcher_profiles.json");
        if !profiles.exists() {
            if let Err(e) = tokio::fs::write(&profiles, LAUNCHER_PROFILES).await {
                warn!("Failed to create {:?}: {}", profiles, e);
            }
        }
        Ok(())
    }
}
