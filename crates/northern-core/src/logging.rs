//! Logging infrastructure for the dashboard poller.
//!
//! Structured logging using the `tracing` ecosystem:
//!
//! - JSON lines written to `~/.northern/logs/northern-dash.log` (rolled daily)
//! - Compact human-readable output on stderr
//! - `-v` raises the default level from INFO to DEBUG
//!
//! ## Example
//!
//! ```no_run
//! use northern_core::logging;
//!
//! # fn main() -> northern_core::Result<()> {
//! let _guard = logging::init_logging(None, false)?;
//!
//! tracing::info!("poller started");
//! tracing::debug!(tab = "activity", "loading tab");
//! # Ok(())
//! # }
//! ```

use std::io::IsTerminal;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{NorthernError, Result};

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "northern-dash.log";

/// Crates and targets covered by the default filter.
const LOG_TARGETS: &[&str] = &[
    "northern",
    "northern_dash",
    "northern_core",
    "northern_client",
    "northern_dashboard",
];

/// Flushes the log file when dropped. Hold it until exit.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Filter directive used when `RUST_LOG` is not set.
///
/// Only the poller's own targets are enabled, so HTTP and runtime crates
/// stay quiet unless asked for.
pub fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize logging.
///
/// Writes JSON lines to `LOG_FILE_NAME` in `log_dir` (default
/// `~/.northern/logs/`) and a compact copy to stderr. `RUST_LOG` overrides
/// [`default_filter`] when set.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| NorthernError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let file_layer = fmt::layer()
        .json()
        .flatten_event(true)
        .with_writer(file_writer)
        .with_ansi(false);

    let console_layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(verbose);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Initialize minimal console-only logging for testing.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Base directory for local state: `~/.northern/`.
pub fn northern_home() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".northern"))
        .ok_or(NorthernError::NoHomeDir)
}

/// Get the default log directory path.
///
/// Returns `~/.northern/logs/`
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(northern_home()?.join("logs"))
}

/// Convenience macro for logging per-tab refresh outcomes.
///
/// ```ignore
/// log_tab_event!("activity", "refreshed", successes = 4, failures = 1);
/// ```
#[macro_export]
macro_rules! log_tab_event {
    ($tab:expr, $event:expr) => {
        tracing::info!(
            target: "northern::tab",
            tab = %$tab,
            event = $event,
            "tab event"
        )
    };
    ($tab:expr, $event:expr, $($field:tt)*) => {
        tracing::info!(
            target: "northern::tab",
            tab = %$tab,
            event = $event,
            $($field)*,
            "tab event"
        )
    };
}
