use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};

const NIL_UUID: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountMode {
    Offline,
    Microsoft,
}

/// Credentials handed to the game through its templated arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchAccountProfile {
    pub mode: AccountMode,
    pub username: String,
    pub uuid: String,
    pub access_token: String,
    pub xuid: String,
}

impl LaunchAccountProfile {
    pub fn offline(username: &str) -> Self {
        Self {
            mode: AccountMode::Offline,
            username: username.trim().to_string(),
            uuid: NIL_UUID.into(),
            access_token: "0".into(),
            xuid: "0".into(),
        }
    }

    pub fn sanitized(mut self) -> Self {
        if self.username.trim().is_empty() {
            self.username = "Player".into();
        }
        if self.uuid.trim().is_empty() {
            self.uuid = NIL_UUID.into();
        }
        if self.access_token.trim().is_empty() {
            self.access_token = "0".into();
        }
        if self.xuid.trim().is_empty() {
            self.xuid = "0".into();
        }
        self
    }

    /// `msa` for online accounts, `legacy` otherwise.
    pub fn user_type(&self) -> &'static str {
        match self.mode {
            AccountMode::Microsoft => "msa",
            AccountMode::Offline => "legacy",
        }
    }

    /// Profile id without dashes, as the game expects it.
    pub fn undashed_uuid(&self) -> String {
        self.uuid.replace('-', "")
    }
}

/// Source of the account used for a launch.
pub trait AccountProvider: Send + Sync {
    fn current_account(&self) -> Option<LaunchAccountProfile>;

    fn require_account(&self) -> LauncherResult<LaunchAccountProfile> {
        self.current_account()
            .map(LaunchAccountProfile::sanitized)
            .ok_or(LauncherError::AccountMissing)
    }
}

/// Provider with a fixed account, or none.
#[derive(Debug, Clone, Default)]
pub struct StaticAccount(pub Option<LaunchAccountProfile>);

impl AccountProvider for StaticAccount {
    fn current_account(&self) -> Option<LaunchAccountProfile> {
        self.0.clone()
    }
}
