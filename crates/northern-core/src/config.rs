//! Dashboard configuration.
//!
//! Loaded from `~/.northern/dashboard.yaml` when present; every field has a
//! default so an empty or missing file yields a usable (if disabled without
//! an API base) configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NorthernError, Result};
use crate::logging::northern_home;

/// Default poll interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Minimum accepted poll interval; shorter values would hammer the backend.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Dashboard poller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the backend API (e.g. `http://localhost:8080/api`).
    /// Empty disables loading.
    pub api_base: String,

    /// Master switch for all loads and polling.
    pub enabled: bool,

    /// Interval between background refreshes.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Window size for telemetry endpoints.
    pub telemetry_window_hours: u32,

    /// Row limit for list endpoints (runs, outbox, events).
    pub list_limit: u32,

    /// Optional per-request timeout. `None` uses the HTTP client default.
    pub request_timeout_secs: Option<u64>,

    /// Location of the persisted prefs file.
    pub prefs_file: Option<PathBuf>,

    /// Session creation parameters for the memory tab.
    pub session: SessionConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            enabled: true,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            telemetry_window_hours: 24,
            list_limit: 50,
            request_timeout_secs: None,
            prefs_file: None,
            session: SessionConfig::default(),
        }
    }
}

/// Body parameters for session creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session mode sent to the backend.
    pub mode: String,
    /// Whether the backend may discard the session.
    pub temporary: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: "dashboard".to_string(),
            temporary: false,
        }
    }
}

impl DashboardConfig {
    /// Create a config pointing at the given API base.
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Default::default()
        }
    }

    /// Load from the default path, falling back to defaults if the file does not exist.
    pub fn load() -> Result<Self> {
        let path = default_config_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "config file does not exist, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific YAML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NorthernError::config_not_found(path, e))?;

        let config = Self::parse(&content).map_err(|message| NorthernError::ConfigInvalid {
            path: path.to_path_buf(),
            message,
        })?;
        config.validate()?;

        debug!(path = %path.display(), "loaded dashboard config");
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    /// Validate field ranges.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(NorthernError::validation(format!(
                "poll_interval must be >= {}, got {}",
                humantime::format_duration(MIN_POLL_INTERVAL),
                humantime::format_duration(self.poll_interval)
            )));
        }

        if self.telemetry_window_hours == 0 {
            return Err(NorthernError::validation(
                "telemetry_window_hours must be greater than 0",
            ));
        }

        if self.list_limit == 0 {
            return Err(NorthernError::validation("list_limit must be greater than 0"));
        }

        let base = self.api_base.trim();
        if !base.is_empty() && !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(NorthernError::validation(format!(
                "api_base must be an http(s) URL, got '{}'",
                self.api_base
            )));
        }

        Ok(())
    }

    /// Whether loads may run at all.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.api_base.trim().is_empty()
    }

    /// Set the API base.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enable or disable the dashboard.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the prefs file location.
    pub fn with_prefs_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.prefs_file = Some(path.into());
        self
    }

    /// Resolved prefs file path.
    pub fn prefs_path(&self) -> Result<PathBuf> {
        match &self.prefs_file {
            Some(path) => Ok(path.clone()),
            None => Ok(northern_home()?.join("dashboard-prefs.json")),
        }
    }
}

/// Default config path: `~/.northern/dashboard.yaml`.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(northern_home()?.join("dashboard.yaml"))
}

/// Serde support for Duration using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert!(config.enabled);
        assert!(config.api_base.is_empty());
        assert!(!config.is_active());
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.session.mode, "dashboard");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
api_base: "http://localhost:8080/api"
poll_interval: "30s"
session:
  temporary: true
"#;
        let config = DashboardConfig::parse(yaml).unwrap();
        assert_eq!(config.api_base, "http://localhost:8080/api");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert!(config.session.temporary);
        assert_eq!(config.session.mode, "dashboard");
        assert_eq!(config.list_limit, 50);
        assert!(config.is_active());
    }

    #[test]
    fn test_parse_empty_is_default() {
        assert_eq!(DashboardConfig::parse("  \n").unwrap(), DashboardConfig::default());
    }

    #[test]
    fn test_parse_rejects_bad_duration() {
        let err = DashboardConfig::parse("poll_interval: \"soon\"").unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn test_validate_rejects_short_interval() {
        let config = DashboardConfig::default().with_poll_interval(Duration::from_millis(10));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll_interval"));
    }

    #[test]
    fn test_validate_rejects_non_http_base() {
        let config = DashboardConfig::new("ftp://example.com");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_is_inactive() {
        let config = DashboardConfig::new("http://localhost/api").with_enabled(false);
        assert!(!config.is_active());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_base: \"https://northern.example/api\"").unwrap();
        writeln!(file, "list_limit: 10").unwrap();

        let config = DashboardConfig::load_from(file.path()).unwrap();
        assert_eq!(config.api_base, "https://northern.example/api");
        assert_eq!(config.list_limit, 10);
    }

    #[test]
    fn test_load_from_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_base: [unterminated").unwrap();

        let err = DashboardConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, NorthernError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = DashboardConfig::load_from(Path::new("/nonexistent/dashboard.yaml")).unwrap_err();
        assert!(matches!(err, NorthernError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_explicit_prefs_path() {
        let config = DashboardConfig::default().with_prefs_file("/tmp/prefs.json");
        assert_eq!(config.prefs_path().unwrap(), PathBuf::from("/tmp/prefs.json"));
    }
}
