//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable holding the log filter directive
pub const LOG_ENV_VAR: &str = "SHIPYARD_LOG";

const DEFAULT_FILTER: &str = "shipyard=info,warn";

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/shipyard/logs/` (rotated daily) so
/// stdout stays free for the NDJSON event stream.
///
/// # Examples
/// ```bash
/// SHIPYARD_LOG=debug shipyard --fixture resources.json
/// SHIPYARD_LOG=shipyard_app=trace shipyard
/// ```
pub fn init() -> Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "shipyard.log");

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("shipyard starting, log directory: {}", log_dir.display());

    Ok(())
}

fn get_log_directory() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("shipyard").join("logs"))
}

/// Path of the current day's log file
pub fn get_current_log_file() -> Result<PathBuf> {
    Ok(get_log_directory()?.join("shipyard.log"))
}
