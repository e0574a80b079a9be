// ─── Install Profile ───
// `install_profile.json` as shipped inside forge-style installers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::LauncherResult;
use crate::core::version::Library;

/// Which install strategy an installer's profile calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileLayout {
    /// Old installer carrying the version json and a `maven/` tree.
    LegacyEmbedded,
    /// Old installer with an `install` block and a `versionInfo` object.
    LegacyInstallBlock,
    /// Processor-driven installer.
    Processors,
}

impl ProfileLayout {
    pub fn detect(profile: &Value) -> Self {
        if profile.get("install").is_some_and(|v| !v.is_null()) {
            return ProfileLayout::LegacyInstallBlock;
        }
        let has_processors = profile
            .get("processors")
            .and_then(Value::as_array)
            .is_some_and(|p| !p.is_empty());
        if has_processors {
            ProfileLayout::Processors
        } else {
            ProfileLayout::LegacyEmbedded
        }
    }

    pub fn is_legacy(&self) -> bool {
        !matches!(self, ProfileLayout::Processors)
    }
}

/// One external-tool step of a processor-driven install.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Processor {
    /// Maven coordinate of the tool jar.
    pub jar: String,
    #[serde(default)]
    pub classpath: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    /// Output path literal → expected SHA-1 literal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sides: Option<Vec<String>>,
}

impl Processor {
    /// No declared sides means every side.
    pub fn is_side(&self, side: &str) -> bool {
        match &self.sides {
            Some(sides) if !sides.is_empty() => sides.iter().any(|s| s == side),
            _ => true,
        }
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&String, &String)> {
        self.outputs.iter().flat_map(|o| o.iter())
    }
}

/// Object-level merge: every key of `overlay` replaces the key in `base`.
/// Anything that is not an object on either side yields `overlay`.
pub fn merge_documents(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}

pub fn libraries(document: &Value) -> LauncherResult<Vec<Library>> {
    match document.get("libraries") {
        Some(libs @ Value::Array(_)) => Ok(serde_json::from_value(libs.clone())?),
        _ => Ok(Vec::new()),
    }
}

pub fn processors(document: &Value) -> LauncherResult<Vec<Processor>> {
    match document.get("processors") {
        Some(list @ Value::Array(_)) => Ok(serde_json::from_value(list.clone())?),
        _ => Ok(Vec::new()),
    }
}

/// `(key, literal)` for every `data` entry with a client value.
pub fn client_data(document: &Value) -> Vec<(String, String)> {
    let Some(data) = document.get("data").and_then(Value::as_object) else {
        return Vec::new();
    };
    data.iter()
        .filter_map(|(key, value)| {
            let client = value.get("client")?.as_str()?;
            Some((key.clone(), client.to_string()))
        })
        .collect()
}

pub fn str_field<'a>(document: &'a Value, key: &str) -> Option<&'a str> {
    document
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
