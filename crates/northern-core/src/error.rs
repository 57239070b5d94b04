//! Error types for core dashboard operations.
//!
//! [`NorthernError`] covers the failures that can stop the poller from
//! starting at all: configuration, directory setup, and logging. Failures of
//! individual dashboard sources are never represented here; those are
//! captured as data (see [`crate::types::SourceFailure`]).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`NorthernError`].
pub type Result<T> = std::result::Result<T, NorthernError>;

/// Error type for core operations.
#[derive(Debug, Error)]
pub enum NorthernError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Config file could not be read
    #[error("Cannot read dashboard config at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for [`crate::DashboardConfig`]
    #[error("Invalid dashboard config at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    /// A config value is out of range
    #[error("Dashboard config rejected: {message}")]
    ConfigValidation { message: String },

    // =========================================================================
    // Environment Errors
    // =========================================================================
    /// Log or state directory could not be created
    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No home directory to put `~/.northern` in
    #[error("Home directory could not be determined")]
    NoHomeDir,

    /// Tab name that is not one of the five dashboard tabs
    #[error("Unknown dashboard tab: {name}")]
    UnknownTab { name: String },
}

impl NorthernError {
    pub fn config_not_found(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigNotFound {
            path: path.into(),
            source,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// True for errors the user fixes by editing the config file.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. } | Self::ConfigInvalid { .. } | Self::ConfigValidation { .. }
        )
    }

    /// Actionable hint shown under the error on the command line.
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound { .. } => {
                Some("Create the file, or drop --config to use ~/.northern/dashboard.yaml")
            }
            Self::ConfigInvalid { .. } => Some("Check YAML syntax in the dashboard config file"),
            Self::ConfigValidation { .. } => {
                Some("Fix the reported field in the dashboard config file")
            }
            Self::DirectoryCreation { .. } => Some("Check permissions, or pass --log-dir"),
            Self::NoHomeDir => Some("Set HOME, or pass --log-dir and configure prefs_file"),
            Self::UnknownTab { .. } => Some("Valid tabs: activity, tasks, logs, tools, memory"),
        }
    }
}
