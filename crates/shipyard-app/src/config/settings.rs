//! Settings parser for .shipyard/config.toml

use super::types::Settings;
use shipyard_core::prelude::*;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.toml";
const SHIPYARD_DIR: &str = ".shipyard";

/// Environment variable overriding `session.user_id`
pub const USER_ENV_VAR: &str = "SHIPYARD_USER";

// ─────────────────────────────────────────────────────────────────────────────
// Settings Loading
// ─────────────────────────────────────────────────────────────────────────────

/// Load settings from .shipyard/config.toml
///
/// Returns default settings if file doesn't exist or can't be parsed.
/// `SHIPYARD_USER`, when set, overrides the configured session user.
pub fn load_settings(project_path: &Path) -> Settings {
    let mut settings = read_settings_file(project_path);
    apply_env_overrides(&mut settings);
    settings
}

fn read_settings_file(project_path: &Path) -> Settings {
    let config_path = project_path.join(SHIPYARD_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    let loaded = std::fs::read_to_string(&config_path)
        .map_err(Error::from)
        .and_then(|content| {
            toml::from_str::<Settings>(&content).map_err(|e| Error::config(e.to_string()))
        })
        .with_context(|| format!("Using default settings; {:?} is unusable", config_path));

    match loaded {
        Ok(settings) => {
            debug!("Loaded settings from {:?}", config_path);
            settings
        }
        Err(_) => Settings::default(),
    }
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(user_id) = std::env::var(USER_ENV_VAR) {
        let user_id = user_id.trim();
        if !user_id.is_empty() {
            debug!("Session user overridden by {}: {}", USER_ENV_VAR, user_id);
            settings.session.user_id = user_id.to_string();
            settings.session.username.clear();
        }
    }
}

/// Create default config file in .shipyard/ directory
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let shipyard_dir = project_path.join(SHIPYARD_DIR);

    if !shipyard_dir.exists() {
        std::fs::create_dir_all(&shipyard_dir)
            .map_err(|e| Error::config(format!("Failed to create .shipyard dir: {}", e)))?;
    }

    let config_path = shipyard_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, generate_default_config())
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
    }

    Ok(())
}

/// Save settings to .shipyard/config.toml
///
/// Uses atomic write (temp file + rename).
pub fn save_settings(project_path: &Path, settings: &Settings) -> Result<()> {
    let shipyard_dir = project_path.join(SHIPYARD_DIR);

    if !shipyard_dir.exists() {
        std::fs::create_dir_all(&shipyard_dir)
            .map_err(|e| Error::config(format!("Failed to create .shipyard dir: {}", e)))?;
    }

    let config_path = shipyard_dir.join(CONFIG_FILENAME);
    let temp_path = shipyard_dir.join(".config.toml.tmp");

    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("Failed to serialize settings: {}", e)))?;
    let full_content = format!("{}{}", generate_config_header(), content);

    std::fs::write(&temp_path, &full_content)
        .map_err(|e| Error::config(format!("Failed to write temp file: {}", e)))?;

    std::fs::rename(&temp_path, &config_path)
        .map_err(|e| Error::config(format!("Failed to rename temp file: {}", e)))?;

    info!("Saved settings to {:?}", config_path);
    Ok(())
}

fn generate_config_header() -> String {
    r#"# shipyard configuration
# Generated by shipyard

"#
    .to_string()
}

fn generate_default_config() -> String {
    r#"# shipyard configuration

[api]
# fixture = "resources.json"   # Seed data for the in-memory control plane
request_timeout_ms = 10000
refresh_interval_secs = 30     # 0 disables periodic refresh

[editor]
undo_limit = 100
confirm_discard = true         # Refuse to close a dirty draft without force

[history]
max_entries = 500

[session]
user_id = "admin"
username = ""
admin = false
"#
    .to_string()
}
