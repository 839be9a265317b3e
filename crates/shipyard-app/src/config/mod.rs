//! Configuration file parsing for shipyard
//!
//! Supports `.shipyard/config.toml` inside the working directory.

pub mod settings;
pub mod types;

pub use settings::{init_config_dir, load_settings, save_settings, USER_ENV_VAR};
pub use types::*;
