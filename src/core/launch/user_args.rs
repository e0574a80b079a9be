// ─── User JVM Arguments ───
// Default system properties, user overrides, and the final heap/agent flags.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::JavaRuntime;
use crate::core::paths::GamePaths;

use super::classpath::safe_path_str;

/// Agent jar attached to every launch unless the user already passes one.
pub const PATCHER_JAR: &str = "MioLibPatcher.jar";

const RESOLV_CONF: &str = "resolv.conf";
const DEFAULT_NAMESERVERS: &str = "nameserver 1.1.1.1\nnameserver 1.0.0.1\n";

/// Prefixes the launcher owns; user values for them are dropped.
const PURGED_PREFIXES: [&str; 9] = [
    "-Xms",
    "-Xmx",
    "-d32",
    "-d64",
    "-Xint",
    "-XX:+UseTransparentHugePages",
    "-XX:+UseLargePagesInMetaspace",
    "-XX:+UseLargePages",
    "-Dorg.lwjgl.opengl.libname",
];

/// Split a user-supplied argument string on whitespace.
pub fn parse_java_arguments(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Split on whitespace, keeping double-quoted runs together.
pub fn split_preserving_quotes(raw: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut has_token = false;

    for ch in raw.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                has_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

/// `-D` properties every launch starts with. Each can be overridden by the
/// user passing the same key.
pub fn default_properties(runtime: &JavaRuntime, paths: &GamePaths, game_dir: &Path) -> Vec<(String, String)> {
    let props: Vec<(&str, String)> = vec![
        ("java.home", safe_path_str(&runtime.java_home())),
        ("java.io.tmpdir", safe_path_str(paths.cache_dir())),
        ("jna.boot.library.path", safe_path_str(paths.native_lib_dir())),
        ("user.home", safe_path_str(paths.home_dir())),
        ("user.language", "en".into()),
        ("user.country", "US".into()),
        ("user.timezone", "UTC".into()),
        ("os.name", "Linux".into()),
        (
            "os.version",
            sysinfo::System::kernel_version().unwrap_or_else(|| "unknown".into()),
        ),
        ("pojav.path.minecraft", safe_path_str(game_dir)),
        ("org.lwjgl.vulkan.libname", "libvulkan.so".into()),
        ("glfwstub.initEgl", "false".into()),
        ("ext.net.resolvPath", safe_path_str(&resolv_conf_path(paths))),
        ("log4j2.formatMsgNoLookups", "true".into()),
        ("java.rmi.server.useCodebaseOnly", "true".into()),
        ("com.sun.jndi.rmi.object.trustURLCodebase", "false".into()),
        ("com.sun.jndi.cosnaming.object.trustURLCodebase", "false".into()),
        ("net.minecraft.clientmodname", super::arguments::LAUNCHER_NAME.into()),
        ("fml.earlyprogresswindow", "false".into()),
        ("fml.ignoreInvalidMinecraftCertificates", "true".into()),
        ("fml.ignorePatchDiscrepancies", "true".into()),
        ("loader.disable_forked_guis", "true".into()),
        ("jdk.lang.Process.launchMechanism", "FORK".into()),
        ("sodium.checks.issue2561", "false".into()),
    ];

    props
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// User args followed by every default property the user did not set.
pub fn merge_user_args(user: Vec<String>, defaults: &[(String, String)]) -> Vec<String> {
    let mut args = user;
    for (key, value) in defaults {
        let flag = format!("-D{}", key);
        if args.iter().any(|arg| arg.starts_with(&flag)) {
            debug!("User overrides {}", flag);
            continue;
        }
        args.push(format!("{}={}", flag, value));
    }
    args
}

/// Drop launcher-owned flags, then append the heap size and patch agent.
pub fn finalize_user_args(args: &mut Vec<String>, ram_mb: u32, patcher: &Path) {
    args.retain(|arg| !PURGED_PREFIXES.iter().any(|p| arg.starts_with(p)));
    args.push(format!("-Xms{}M", ram_mb));
    args.push(format!("-Xmx{}M", ram_mb));
    if !args.iter().any(|arg| arg.contains(PATCHER_JAR)) {
        args.push(format!("-javaagent:{}", safe_path_str(patcher)));
    }
}

pub fn patcher_path(paths: &GamePaths) -> PathBuf {
    paths.home_dir().join("components").join(PATCHER_JAR)
}

pub fn resolv_conf_path(paths: &GamePaths) -> PathBuf {
    paths.home_dir().join(RESOLV_CONF)
}

/// Write the runtime's DNS resolver file unless one exists.
pub async fn ensure_resolv_conf(paths: &GamePaths) -> LauncherResult<()> {
    let path = resolv_conf_path(paths);
    if path.is_file() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    tokio::fs::write(&path, DEFAULT_NAMESERVERS)
        .await
        .map_err(|e| LauncherError::io(&path, e))
}
