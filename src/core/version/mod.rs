pub mod manifest;
pub mod rules;
pub mod store;
pub mod version_file;

pub use manifest::{VersionEntry, VersionManifest};
pub use rules::{check_rules, check_rules_for, Platform, Rule, RuleAction, RuleEnv};
pub use store::{FsVersionStore, ManifestStore};
pub use version_file::{
    ArgToken, ArgValue, Arguments, DownloadArtifact, Library, VersionDownloads, VersionJson,
};
