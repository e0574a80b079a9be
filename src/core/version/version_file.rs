// ─── Version File ───
// Typed view of a version JSON plus inheritance merging.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rules::{check_rules_for, Rule, RuleEnv};
use crate::core::maven::{mirror_urls, MavenArtifact};

/// A fully parsed version JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub main_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<VersionDownloads>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_version: Option<JavaVersionInfo>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub version_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<DownloadArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_mappings: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    #[serde(default)]
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetIndexInfo {
    pub id: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<ArgToken>,
    #[serde(default)]
    pub jvm: Vec<ArgToken>,
}

/// One entry of `arguments.jvm` / `arguments.game`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ArgToken {
    Plain(String),
    Conditional {
        #[serde(default)]
        rules: Vec<Rule>,
        value: ArgValue,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ArgValue {
    One(String),
    Many(Vec<String>),
}

// ─── Library Entry ───

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natives: Option<BTreeMap<String, String>>,
    /// Repository base for libraries that only carry a coordinate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifiers: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibDownloadArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Library {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn is_allowed(&self, env: &RuleEnv) -> bool {
        check_rules_for(self.rules.as_deref(), env)
    }

    /// Native-only entries are unpacked by the runtime bootstrap, never put on
    /// the classpath.
    pub fn is_native(&self) -> bool {
        if self.natives.is_some() {
            return true;
        }
        MavenArtifact::parse(&self.name).is_ok_and(|a| a.is_native_classifier())
    }

    pub fn artifact(&self) -> Option<MavenArtifact> {
        MavenArtifact::parse(&self.name).ok()
    }

    /// Slash-separated path under `libraries/`, preferring the declared
    /// download path over the one derived from the coordinate.
    pub fn artifact_path(&self) -> Option<String> {
        let declared = self
            .downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.path.clone())
            .filter(|p| !p.trim().is_empty());
        declared.or_else(|| self.artifact().map(|a| a.relative_path()))
    }

    pub fn sha1(&self) -> Option<&str> {
        self.downloads
            .as_ref()?
            .artifact
            .as_ref()?
            .sha1
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    pub fn size(&self) -> u64 {
        self.downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.size)
            .unwrap_or(0)
    }

    /// Download candidates, declared URL first, then maven mirrors.
    pub fn download_urls(&self) -> Vec<String> {
        let declared = self
            .downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.url.clone())
            .filter(|u| !u.trim().is_empty());

        if let Some(url) = declared {
            return vec![url];
        }

        match self.artifact() {
            Some(artifact) => mirror_urls(&artifact, self.url.as_deref()),
            None => Vec::new(),
        }
    }
}

impl VersionJson {
    /// Required Java major version; pre-1.17 manifests omit it and run on 8.
    pub fn required_java_major(&self) -> u32 {
        self.java_version
            .as_ref()
            .map(|j| j.major_version)
            .unwrap_or(8)
    }

    pub fn asset_index_id(&self) -> String {
        self.asset_index
            .as_ref()
            .map(|a| a.id.clone())
            .or_else(|| self.assets.clone())
            .unwrap_or_else(|| "legacy".to_string())
    }

    pub fn jvm_tokens(&self) -> &[ArgToken] {
        self.arguments.as_ref().map_or(&[], |a| a.jvm.as_slice())
    }

    pub fn game_tokens(&self) -> &[ArgToken] {
        self.arguments.as_ref().map_or(&[], |a| a.game.as_slice())
    }

    /// Build a merged version JSON with `parent_json` as base and this version
    /// overriding matching keys. The result's `inheritsFrom` is the parent's.
    /// Library lists and argument lists are
    /// concatenated (child libraries first, parent arguments first).
    pub fn merge_with_parent_json(
        current_json: &serde_json::Value,
        parent_json: &serde_json::Value,
    ) -> serde_json::Value {
        let mut merged = parent_json.clone();

        let Some(obj) = current_json.as_object() else {
            return merged;
        };

        for (k, v) in obj {
            match k.as_str() {
                "libraries" => {
                    let mut libs = v.as_array().cloned().unwrap_or_default();
                    if let Some(parent_libs) = parent_json.get("libraries").and_then(|l| l.as_array())
                    {
                        libs.extend(parent_libs.iter().cloned());
                    }
                    merged[k] = serde_json::Value::Array(libs);
                }
                "arguments" => {
                    let mut args = parent_json
                        .get("arguments")
                        .cloned()
                        .unwrap_or_else(|| serde_json::json!({}));
                    for side in ["game", "jvm"] {
                        let mut list = args
                            .get(side)
                            .and_then(|s| s.as_array())
                            .cloned()
                            .unwrap_or_default();
                        if let Some(child) = v.get(side).and_then(|s| s.as_array()) {
                            list.extend(child.iter().cloned());
                        }
                        args[side] = serde_json::Value::Array(list);
                    }
                    merged[k] = args;
                }
                // The parent's own `inheritsFrom` (if any) continues the chain.
                "inheritsFrom" => {}
                _ => merged[k] = v.clone(),
            }
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::rules::Platform;

    fn linux() -> RuleEnv {
        RuleEnv::for_platform(Platform::linux())
    }

    #[test]
    fn parses_plain_and_conditional_tokens() {
        let parsed: VersionJson = serde_json::from_value(serde_json::json!({
            "id": "test",
            "mainClass": "net.minecraft.client.main.Main",
            "arguments": {
                "game": [
                    "--username",
                    { "rules": [{"action": "allow", "os": {"name": "linux"}}], "value": ["--demo", "x"] }
                ],
                "jvm": [
                    { "rules": [{"action": "disallow", "os": {"name": "linux"}}], "value": "-XstartOnFirstThread" }
                ]
            }
        }))
        .unwrap();

        assert_eq!(parsed.game_tokens()[0], ArgToken::Plain("--username".into()));
        match &parsed.game_tokens()[1] {
            ArgToken::Conditional { value, .. } => {
                assert_eq!(value, &ArgValue::Many(vec!["--demo".into(), "x".into()]))
            }
            other => panic!("unexpected token {:?}", other),
        }
        assert!(matches!(parsed.jvm_tokens()[0], ArgToken::Conditional { .. }));
        assert_eq!(parsed.required_java_major(), 8);
    }

    #[test]
    fn library_paths_prefer_declared_download_path() {
        let lib: Library = serde_json::from_value(serde_json::json!({
            "name": "net.minecraftforge:forge:1.20.1-47.2.0:universal",
            "downloads": { "artifact": { "path": "custom/forge.jar", "url": "" } }
        }))
        .unwrap();
        assert_eq!(lib.artifact_path().as_deref(), Some("custom/forge.jar"));
        assert!(!lib.download_urls().is_empty());
        assert!(lib.download_urls()[0].starts_with("https://libraries.minecraft.net/"));

        let plain = Library::named("com.google.guava:guava:32.1.2-jre");
        assert_eq!(
            plain.artifact_path().as_deref(),
            Some("com/google/guava/guava/32.1.2-jre/guava-32.1.2-jre.jar")
        );
    }

    #[test]
    fn natives_entries_are_flagged() {
        let mut lib = Library::named("org.lwjgl:lwjgl:3.3.3:natives-linux");
        assert!(lib.is_native());
        lib = Library::named("org.lwjgl.lwjgl:lwjgl-platform:2.9.4");
        lib.natives = Some(BTreeMap::from([("linux".into(), "natives-linux".into())]));
        assert!(lib.is_native());
        assert!(!Library::named("org.lwjgl:lwjgl:3.3.3").is_native());
    }

    #[test]
    fn library_rules_use_shared_evaluator() {
        let mut lib = Library::named("ca.weblite:java-objc-bridge:1.1");
        lib.rules = Some(vec![Rule::allow().on_os("osx")]);
        assert!(!lib.is_allowed(&linux()));
    }

    #[test]
    fn merge_with_parent_json_overrides_and_concatenates() {
        let parent = serde_json::json!({
            "id": "1.20.1",
            "mainClass": "parent.Main",
            "libraries": [{"name": "a:b:1.0"}],
            "arguments": { "game": ["--parent"], "jvm": ["-Dp=1"] }
        });
        let current = serde_json::json!({
            "id": "1.20.1-forge",
            "inheritsFrom": "1.20.1",
            "mainClass": "child.Main",
            "libraries": [{"name": "c:d:2.0"}],
            "arguments": { "game": ["--child"] }
        });

        let merged = VersionJson::merge_with_parent_json(&current, &parent);

        assert_eq!(merged["mainClass"], "child.Main");
        assert_eq!(merged["id"], "1.20.1-forge");
        assert_eq!(merged["libraries"][0]["name"], "c:d:2.0");
        assert_eq!(merged["libraries"][1]["name"], "a:b:1.0");
        assert_eq!(merged["arguments"]["game"], serde_json::json!(["--parent", "--child"]));
        assert_eq!(merged["arguments"]["jvm"], serde_json::json!(["-Dp=1"]));
        assert!(merged.get("inheritsFrom").is_none());
    }
}
