//! Logging configuration using tracing
//!
//! Logs go to a daily rolling file, never to stdout: headless mode owns
//! stdout for its NDJSON events.

use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable overriding the default filter
pub const LOG_ENV_VAR: &str = "CHATTABS_LOG";

const LOG_FILE_PREFIX: &str = "chattabs.log";

/// Crates of this workspace, logged at the requested level
const WORKSPACE_CRATES: [&str; 3] = ["chat_tabs", "chattabs_app", "chattabs_core"];

/// Initialize the logging subsystem
///
/// Logs are written to `<data_dir>/logs/` when a data directory is given,
/// otherwise to `~/.local/share/chat-tabs/logs/`. The filter comes from
/// `CHATTABS_LOG` if set, else [`default_directives`] at `level`.
///
/// # Examples
/// ```bash
/// CHATTABS_LOG=debug chattabs --headless
/// CHATTABS_LOG=chattabs_app::controller=trace chattabs --headless
/// ```
pub fn init(data_dir: Option<&Path>, level: Level) -> Result<()> {
    let log_dir = log_directory(data_dir);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);

    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

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

    tracing::info!("chat-tabs logging at {} to {}", level, log_dir.display());
    Ok(())
}

/// `level` for the workspace crates, `warn` for dependencies
pub fn default_directives(level: Level) -> String {
    let level = level.to_string().to_lowercase();
    let mut directives: Vec<String> = WORKSPACE_CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect();
    directives.push("warn".to_string());
    directives.join(",")
}

/// Where log files are written
pub fn log_directory(data_dir: Option<&Path>) -> PathBuf {
    match data_dir {
        Some(dir) => dir.join("logs"),
        None => dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chat-tabs")
            .join("logs"),
    }
}
