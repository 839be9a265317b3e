//! Configuration types for shipyard

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shipyard_core::User;

/// Application settings (.shipyard/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub editor: EditorSettings,

    #[serde(default)]
    pub history: HistorySettings,

    #[serde(default)]
    pub session: SessionSettings,
}

/// Control-plane connection settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiSettings {
    /// JSON fixture seeding the in-memory control plane (empty = built-in demo data)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<PathBuf>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Full resource refresh interval in seconds (0 = never)
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            fixture: None,
            request_timeout_ms: default_request_timeout_ms(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }
}

/// Draft editing behavior
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EditorSettings {
    /// Maximum number of undoable operations kept per draft
    #[serde(default = "default_undo_limit")]
    pub undo_limit: usize,

    /// Refuse to close a dirty draft unless the close is forced
    #[serde(default = "default_true")]
    pub confirm_discard: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            undo_limit: default_undo_limit(),
            confirm_discard: true,
        }
    }
}

/// Update history retention
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistorySettings {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

/// Identity of the operator using this session
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SessionSettings {
    #[serde(default = "default_user_id")]
    pub user_id: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub admin: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            username: String::new(),
            admin: false,
        }
    }
}

impl SessionSettings {
    pub fn user(&self) -> User {
        let username = if self.username.is_empty() {
            self.user_id.clone()
        } else {
            self.username.clone()
        };
        User {
            id: self.user_id.clone(),
            username,
            admin: self.admin,
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_undo_limit() -> usize {
    100
}

fn default_max_entries() -> usize {
    500
}

fn default_user_id() -> String {
    "admin".to_string()
}

fn default_true() -> bool {
    true
}
