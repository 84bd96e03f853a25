//! Logging infrastructure for datainspect
//!
//! Degraded transformation steps and skipped filter clauses are reported as
//! `tracing` events rather than errors, so callers that care about them need a
//! subscriber. [`init`] installs one writing to the console and to a daily
//! rotating file in the platform data directory.
//!
//! ```no_run
//! use datainspect::logging;
//!
//! logging::init().expect("Failed to initialize logging");
//! tracing::info!("Engine ready");
//! ```

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Gets the log directory path based on platform conventions
///
/// Returns:
/// - Windows: `%APPDATA%/datainspect/logs`
/// - macOS: `~/Library/Application Support/datainspect/logs`
/// - Linux: `~/.local/share/datainspect/logs`
pub fn get_log_dir() -> Result<PathBuf> {
    let log_dir = crate::utils::app_data_dir()?.join("logs");

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }

    Ok(log_dir)
}

/// Initializes console and file logging.
///
/// The default level is INFO; `RUST_LOG` overrides it. Warnings (which include
/// every degraded pipeline step) additionally land in `warnings.<date>.log`.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or a file appender fails
pub fn init() -> Result<()> {
    let log_dir = get_log_dir()?;

    let all_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("datainspect")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create all-logs file appender")?;

    let warn_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("warnings")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create warnings file appender")?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .compact();

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(all_logs_appender);

    let warn_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(warn_logs_appender)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(all_logs_layer)
        .with(warn_logs_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!("Logging initialized, log directory: {:?}", log_dir);

    Ok(())
}

/// Installs a console-only subscriber.
///
/// Used by the CLI when `--quiet-files` is given and as the fallback when
/// file logging cannot be set up. Returns `false` when a global subscriber
/// was already installed, in which case that one keeps receiving events.
pub fn init_console() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).compact())
        .try_init()
    {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Console logging not installed, a subscriber is already active: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_console_only_installs_once() {
        // other tests in this binary may have installed one first
        init_console();
        assert!(!init_console());
    }
}
