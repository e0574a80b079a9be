// ─── Classpath Builder ───
// Maps manifest libraries to jars on disk, in declaration order, with the
// client jar last.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::paths::GamePaths;
use crate::core::version::{RuleEnv, VersionJson};

/// Java classpath separator on the runtimes this core launches.
pub const CLASSPATH_SEPARATOR: &str = ":";

/// Ordered classpath entries for `manifest`.
///
/// Libraries rejected by their rules or carrying natives are skipped, the
/// rest are mapped to `libraries/<path>` and kept only when present on disk.
/// The client jar is appended last when it exists. The first occurrence of
/// a duplicate wins.
pub fn resolve_classpath(
    manifest: &VersionJson,
    paths: &GamePaths,
    version_name: &str,
    env: &RuleEnv,
) -> Vec<PathBuf> {
    let libs_dir = paths.libraries_dir();
    let mut entries: Vec<PathBuf> = Vec::new();

    for library in &manifest.libraries {
        if !library.is_allowed(env) {
            debug!("Rules exclude library {}", library.name);
            continue;
        }
        if library.is_native() {
            continue;
        }

        let Some(relative) = library.artifact_path() else {
            warn!("Skipping library with unusable coordinate: {}", library.name);
            continue;
        };

        let jar = libs_dir.join(relative);
        if !jar.is_file() {
            debug!("Library not on disk, skipped: {:?}", jar);
            continue;
        }
        entries.push(jar);
    }

    if let Some(client) = client_jar(manifest, paths, version_name) {
        entries.push(client);
    }

    dedup_preserving_order(&mut entries);
    entries
}

/// The version's own jar, or its direct parent's when it has none.
pub fn client_jar(manifest: &VersionJson, paths: &GamePaths, version_name: &str) -> Option<PathBuf> {
    let own = paths.version_jar(version_name);
    if own.is_file() {
        return Some(own);
    }

    let parent = manifest.inherits_from.as_deref()?;
    let inherited = paths.version_jar(parent);
    inherited.is_file().then_some(inherited)
}

pub fn join_classpath(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|p| safe_path_str(p))
        .collect::<Vec<_>>()
        .join(CLASSPATH_SEPARATOR)
}

fn dedup_preserving_order(entries: &mut Vec<PathBuf>) {
    let mut seen = HashSet::new();
    entries.retain(|entry| seen.insert(entry.clone()));
}

/// Absolute, lossless-enough string form of a path for argument lists.
pub fn safe_path_str(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::{Library, Platform, Rule};

    fn temp_game(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "gamecore-classpath-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"jar").unwrap();
    }

    fn linux() -> RuleEnv {
        RuleEnv::for_platform(Platform::linux())
    }

    #[test]
    fn keeps_declaration_order_and_puts_client_last() {
        let root = temp_game("order");
        let paths = GamePaths::new(&root);

        let coords = ["org.b:second:1.0", "org.a:first:1.0", "org.c:missing:1.0"];
        for coord in &coords[..2] {
            let lib = Library::named(coord);
            touch(&paths.libraries_dir().join(lib.artifact_path().unwrap()));
        }
        touch(&paths.version_jar("1.20.1"));

        let manifest = VersionJson {
            libraries: coords.iter().map(|c| Library::named(c)).collect(),
            ..VersionJson::default()
        };

        let cp = resolve_classpath(&manifest, &paths, "1.20.1", &linux());
        let names: Vec<_> = cp
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["second-1.0.jar", "first-1.0.jar", "1.20.1.jar"]);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn excludes_rule_rejected_and_native_libraries() {
        let root = temp_game("rules");
        let paths = GamePaths::new(&root);

        let mut mac_only = Library::named("ca.weblite:java-objc-bridge:1.1");
        mac_only.rules = Some(vec![Rule::allow().on_os("osx")]);
        let natives = Library::named("org.lwjgl:lwjgl:3.3.3:natives-linux");
        let plain = Library::named("org.lwjgl:lwjgl:3.3.3");
        for lib in [&mac_only, &natives, &plain] {
            touch(&paths.libraries_dir().join(lib.artifact_path().unwrap()));
        }

        let manifest = VersionJson {
            libraries: vec![mac_only, natives, plain.clone(), plain],
            ..VersionJson::default()
        };
        let cp = resolve_classpath(&manifest, &paths, "none", &linux());
        assert_eq!(cp.len(), 1);
        assert!(cp[0].ends_with("org/lwjgl/lwjgl/3.3.3/lwjgl-3.3.3.jar"));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn inherited_version_uses_parent_jar() {
        let root = temp_game("inherit");
        let paths = GamePaths::new(&root);
        touch(&paths.version_jar("1.20.1"));

        let manifest = VersionJson {
            inherits_from: Some("1.20.1".into()),
            ..VersionJson::default()
        };
        assert_eq!(
            client_jar(&manifest, &paths, "1.20.1-forge"),
            Some(paths.version_jar("1.20.1"))
        );
        assert_eq!(client_jar(&VersionJson::default(), &paths, "1.20.1-forge"), None);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn join_uses_colon() {
        let joined = join_classpath(&[PathBuf::from("/lib/a.jar"), PathBuf::from("/lib/b.jar")]);
        assert_eq!(joined, "/lib/a.jar:/lib/b.jar");
    }
}
