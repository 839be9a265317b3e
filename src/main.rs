//! shipyard - configuration draft editor
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use shipyard_api::{demo_resources, MemoryApi};
use shipyard_app::config::{init_config_dir, load_settings, save_settings};
use shipyard_core::prelude::*;

/// shipyard - edit deployment, server and builder configs as drafts
#[derive(Parser, Debug)]
#[command(name = "shipyard")]
#[command(about = "Draft/snapshot configuration editor (NDJSON over stdin/stdout)", long_about = None)]
struct Args {
    /// Directory holding `.shipyard/config.toml` (defaults to the current directory)
    #[arg(long, value_name = "PATH")]
    config_dir: Option<PathBuf>,

    /// JSON fixture seeding the control plane (overrides `api.fixture`)
    #[arg(long, value_name = "FILE")]
    fixture: Option<PathBuf>,

    /// Sign in as this user id (overrides `session.user_id`)
    #[arg(long)]
    user: Option<String>,

    /// Treat the session user as an administrator
    #[arg(long)]
    admin: bool,

    /// Write a default `.shipyard/config.toml` and exit; `--user`/`--admin`
    /// are stored as the session defaults
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    shipyard_core::logging::init()?;
    if let Ok(log_file) = shipyard_core::logging::get_current_log_file() {
        info!("Logging to {}", log_file.display());
    }

    let args = Args::parse();
    let base_path = args
        .config_dir
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if args.init {
        init_config_dir(&base_path)?;
    }
    let mut settings = load_settings(&base_path);
    let session_overridden = args.user.is_some() || args.admin;
    if let Some(user) = args.user {
        settings.session.user_id = user;
        settings.session.username.clear();
    }
    if args.admin {
        settings.session.admin = true;
    }

    if args.init {
        if session_overridden {
            save_settings(&base_path, &settings)?;
        }
        eprintln!("Created {}", base_path.join(".shipyard").display());
        return Ok(());
    }

    // config-relative fixture paths resolve against the config directory
    let fixture = args.fixture.or_else(|| {
        settings
            .api
            .fixture
            .as_ref()
            .map(|path| base_path.join(path))
    });
    let api = match fixture {
        Some(path) => {
            info!("Loading fixture {}", path.display());
            MemoryApi::from_fixture(&path)
                .with_context(|| format!("Failed to load fixture {}", path.display()))?
        }
        None => MemoryApi::new(demo_resources()),
    };

    shipyard::run_headless(Arc::new(api), settings).await?;
    Ok(())
}
