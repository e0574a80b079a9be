// ─── OS Rules ───
// Allow/disallow predicates shared by libraries and conditional arguments.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeMap<String, bool>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OsRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    /// Regex searched in the host OS version (`os.version` as the JVM
    /// reports it).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// The platform rules are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Mojang OS name: `windows`, `osx` or `linux`.
    pub os: &'static str,
    /// Mojang arch name: `x86`, `x86_64`, `arm64`, `arm32`.
    pub arch: &'static str,
}

impl Platform {
    pub fn current() -> Self {
        let os = if cfg!(target_os = "windows") {
            "windows"
        } else if cfg!(target_os = "macos") {
            "osx"
        } else {
            // Android runtimes consume the linux natives.
            "linux"
        };
        let arch = if cfg!(target_arch = "x86_64") {
            "x86_64"
        } else if cfg!(target_arch = "aarch64") {
            "arm64"
        } else if cfg!(target_arch = "arm") {
            "arm32"
        } else {
            "x86"
        };
        Self { os, arch }
    }

    pub const fn linux() -> Self {
        Self {
            os: "linux",
            arch: "arm64",
        }
    }
}

/// What the JVM reports as `os.version`: the kernel release on linux and
/// android, the product version elsewhere.
pub fn host_os_version() -> Option<String> {
    if cfg!(any(target_os = "windows", target_os = "macos")) {
        sysinfo::System::os_version()
    } else {
        sysinfo::System::kernel_version()
    }
}

/// Everything a rule may inspect: the platform, its OS version and the
/// enabled launcher features.
#[derive(Debug, Clone)]
pub struct RuleEnv {
    pub platform: Platform,
    /// `None` when unknown; version-constrained rules then never match.
    pub os_version: Option<String>,
    pub features: BTreeSet<String>,
}

impl Default for RuleEnv {
    fn default() -> Self {
        Self::host()
    }
}

impl RuleEnv {
    /// The running host, OS version included.
    pub fn host() -> Self {
        Self {
            platform: Platform::current(),
            os_version: host_os_version(),
            features: BTreeSet::new(),
        }
    }

    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            os_version: None,
            features: BTreeSet::new(),
        }
    }

    pub fn with_os_version(mut self, version: &str) -> Self {
        self.os_version = Some(version.to_string());
        self
    }

    pub fn with_feature(mut self, feature: &str) -> Self {
        self.features.insert(feature.to_string());
        self
    }
}

impl Rule {
    pub fn allow() -> Self {
        Self {
            action: RuleAction::Allow,
            os: None,
            features: None,
        }
    }

    pub fn disallow() -> Self {
        Self {
            action: RuleAction::Disallow,
            os: None,
            features: None,
        }
    }

    pub fn on_os(mut self, name: &str) -> Self {
        self.os = Some(OsRule {
            name: Some(name.to_string()),
            ..OsRule::default()
        });
        self
    }

    fn matches(&self, env: &RuleEnv) -> bool {
        let os_matches = match &self.os {
            None => true,
            Some(os) => {
                let name_ok = os
                    .name
                    .as_deref()
                    .map_or(true, |name| name.eq_ignore_ascii_case(env.platform.os));
                let arch_ok = os
                    .arch
                    .as_deref()
                    .map_or(true, |arch| arch.eq_ignore_ascii_case(env.platform.arch));
                let version_ok = os
                    .version
                    .as_deref()
                    .map_or(true, |pattern| os_version_matches(pattern, env.os_version.as_deref()));
                name_ok && arch_ok && version_ok
            }
        };

        let features_match = match &self.features {
            None => true,
            Some(features) => features
                .iter()
                .all(|(name, wanted)| env.features.contains(name) == *wanted),
        };

        os_matches && features_match
    }
}

fn os_version_matches(pattern: &str, version: Option<&str>) -> bool {
    let Some(version) = version else {
        return false;
    };
    match Regex::new(pattern) {
        Ok(regex) => regex.is_match(version),
        Err(e) => {
            warn!("Ignoring rule with invalid os.version pattern {:?}: {}", pattern, e);
            false
        }
    }
}

/// Evaluate a rule list left-to-right, last matching rule wins.
///
/// - No rules (absent or empty) → allowed.
/// - Otherwise start from "disallowed"; a matching `allow` sets allowed,
///   a matching `disallow` clears it, non-matching rules change nothing.
pub fn check_rules_for(rules: Option<&[Rule]>, env: &RuleEnv) -> bool {
    let rules = match rules {
        Some(r) if !r.is_empty() => r,
        _ => return true,
    };

    let mut allowed = false;
    for rule in rules {
        if rule.matches(env) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

/// [`check_rules_for`] against the host platform with no features enabled.
pub fn check_rules(rules: Option<&[Rule]>) -> bool {
    check_rules_for(rules, &RuleEnv::default())
}
