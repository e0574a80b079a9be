// ─── Argument Templates ───
// Expands a manifest's `arguments.jvm` / `arguments.game` into argv entries.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::auth::LaunchAccountProfile;
use crate::core::paths::GamePaths;
use crate::core::version::{check_rules_for, ArgToken, ArgValue, RuleEnv, VersionJson};

use super::classpath::{safe_path_str, CLASSPATH_SEPARATOR};
use super::context::LaunchContext;

pub const LAUNCHER_NAME: &str = "gamecore";
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// System properties whose `${natives_directory}` is pointed at the cache
/// directory instead, since they name extraction targets.
const EXTRACT_PATH_PROPERTIES: [&str; 3] = [
    "-Dio.netty.native.workdir",
    "-Djna.tmpdir",
    "-Dorg.lwjgl.system.SharedLibraryExtractPath",
];

/// Variables available to `${name}` placeholders, computed once per launch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchVariables(BTreeMap<String, String>);

impl LaunchVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every variable a vanilla or loader manifest may reference.
    pub fn for_launch(
        ctx: &LaunchContext,
        paths: &GamePaths,
        account: &LaunchAccountProfile,
        classpath: &str,
        natives_directory: &str,
    ) -> Self {
        let assets = safe_path_str(&paths.assets_dir());
        let version_type = ctx
            .version_type
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| ctx.manifest.version_type.clone())
            .unwrap_or_else(|| "release".to_string());

        let mut vars = Self::new()
            .with("classpath", classpath)
            .with("classpath_separator", CLASSPATH_SEPARATOR)
            .with("library_directory", &safe_path_str(&paths.libraries_dir()))
            .with("natives_directory", natives_directory)
            .with("cache_directory", &safe_path_str(paths.cache_dir()))
            .with("version_name", &ctx.version_name)
            .with("primary_jar_name", &format!("{}.jar", ctx.version_name))
            .with("version_type", &version_type)
            .with("launcher_name", LAUNCHER_NAME)
            .with("launcher_version", LAUNCHER_VERSION)
            .with("auth_player_name", &account.username)
            .with("auth_session", &account.access_token)
            .with("auth_access_token", &account.access_token)
            .with("auth_uuid", &account.undashed_uuid())
            .with("auth_xuid", &account.xuid)
            .with("clientid", "")
            .with("user_type", account.user_type())
            .with("user_properties", "{}")
            .with("assets_root", &assets)
            .with("game_assets", &assets)
            .with("assets_index_name", &ctx.manifest.asset_index_id())
            .with("game_directory", &safe_path_str(&ctx.game_dir(paths)));

        if let Some(window) = ctx.window {
            vars.insert("resolution_width", &window.width.to_string());
            vars.insert("resolution_height", &window.height.to_string());
        }
        for (key, value) in &ctx.extra_variables {
            vars.insert(key, value);
        }
        vars
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Templated JVM arguments plus whether `${classpath}` was consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatedArgs {
    pub args: Vec<String>,
    pub classpath_explicit: bool,
}

/// Expand `arguments.jvm`.
///
/// A bare `${classpath}` token becomes the classpath and flags it explicit;
/// otherwise a trailing `-cp <classpath>` pair is appended.
pub fn build_jvm_args(manifest: &VersionJson, vars: &LaunchVariables, env: &RuleEnv) -> TemplatedArgs {
    let classpath = vars.get("classpath").unwrap_or_default();
    let mut classpath_explicit = false;

    let mut args: Vec<String> = Vec::new();
    for token in manifest.jvm_tokens() {
        for raw in filter_token(token, env) {
            if raw == "${classpath}" {
                classpath_explicit = true;
                args.push(classpath.to_string());
            } else {
                args.push(process_jvm_token(raw, vars));
            }
        }
    }

    let mut args = insert_value_list(&args, vars);
    if !classpath_explicit {
        args.push("-cp".to_string());
        args.push(classpath.to_string());
    }

    TemplatedArgs {
        args,
        classpath_explicit,
    }
}

/// Expand `arguments.game`, or the legacy `minecraftArguments` string.
pub fn build_game_args(manifest: &VersionJson, vars: &LaunchVariables, env: &RuleEnv) -> Vec<String> {
    let raw: Vec<String> = match manifest.minecraft_arguments.as_deref() {
        Some(legacy) => legacy.split_whitespace().map(str::to_string).collect(),
        None => manifest
            .game_tokens()
            .iter()
            .flat_map(|token| filter_token(token, env))
            .map(str::to_string)
            .collect(),
    };

    insert_value_list(&raw, vars)
}

/// Substitute every `${key}` known to `vars`. Unknown placeholders stay.
///
/// Each argument is scanned once; substituted text is never rescanned.
pub fn insert_value_list(args: &[String], vars: &LaunchVariables) -> Vec<String> {
    args.iter().map(|arg| substitute_placeholders(arg, vars)).collect()
}

fn substitute_placeholders(arg: &str, vars: &LaunchVariables) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find('}') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };

        let key = &tail[..end];
        match vars.get(key) {
            Some(value) => out.push_str(value),
            None => {
                debug!("Unresolved placeholder left in argument: {}", arg);
                out.push_str(&rest[start..start + 2 + end + 1]);
            }
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Values a token contributes under `env`: nothing when its rules reject.
fn filter_token<'a>(token: &'a ArgToken, env: &RuleEnv) -> Vec<&'a str> {
    match token {
        ArgToken::Plain(value) => vec![value.as_str()],
        ArgToken::Conditional { rules, value } => {
            if !check_rules_for(Some(rules.as_slice()), env) {
                return Vec::new();
            }
            match value {
                ArgValue::One(v) => vec![v.as_str()],
                ArgValue::Many(values) => values.iter().map(String::as_str).collect(),
            }
        }
    }
}

fn process_jvm_token(token: &str, vars: &LaunchVariables) -> String {
    if let Some(list) = token.strip_prefix("-DignoreList=") {
        let entry = format!("{}.jar", vars.get("version_name").unwrap_or_default());
        if list
            .split(',')
            .any(|item| substitute_placeholders(item, vars) == entry)
        {
            return token.to_string();
        }
        return format!("{},{}", token, entry);
    }

    if EXTRACT_PATH_PROPERTIES.iter().any(|p| token.contains(p)) {
        if let Some(cache) = vars.get("cache_directory") {
            return token.replace("${natives_directory}", cache);
        }
    }

    token.to_string()
}
