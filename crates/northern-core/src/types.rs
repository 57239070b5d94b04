//! Shared type definitions for the dashboard poller.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::NorthernError;

/// Merged payload of a tab: one key per source name.
pub type DataBag = Map<String, Value>;

/// One logical dashboard view.
///
/// Declaration order matters: the first variant is the default tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabKey {
    Activity,
    Tasks,
    Logs,
    Tools,
    Memory,
}

impl TabKey {
    /// All tabs in display order.
    pub const ALL: [TabKey; 5] = [
        TabKey::Activity,
        TabKey::Tasks,
        TabKey::Logs,
        TabKey::Tools,
        TabKey::Memory,
    ];

    /// Lowercase name used for persistence and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            TabKey::Activity => "activity",
            TabKey::Tasks => "tasks",
            TabKey::Logs => "logs",
            TabKey::Tools => "tools",
            TabKey::Memory => "memory",
        }
    }

    /// Whether this tab's sources are scoped to a backend session.
    pub fn requires_session(&self) -> bool {
        matches!(self, TabKey::Memory)
    }
}

impl Default for TabKey {
    fn default() -> Self {
        TabKey::ALL[0]
    }
}

impl fmt::Display for TabKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TabKey {
    type Err = NorthernError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        TabKey::ALL
            .into_iter()
            .find(|tab| tab.as_str() == needle)
            .ok_or_else(|| NorthernError::UnknownTab { name: s.to_string() })
    }
}

/// Per-tab view state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabState {
    /// True while a foreground load is running.
    pub loading: bool,
    /// Summary of the most recent round's failures.
    pub error: Option<String>,
    /// Last-known-good merged payload.
    pub data: Option<DataBag>,
    /// When a round last had at least one success.
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl TabState {
    /// Empty state, as created at startup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any source has ever contributed data.
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }

    /// Payload for one source, if present.
    pub fn source(&self, name: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(name))
    }

    /// True if the tab never updated or last updated longer than `max_age` ago.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        match self.last_updated_at {
            Some(at) => {
                let age = Utc::now().signed_duration_since(at);
                age.to_std().map(|age| age > max_age).unwrap_or(false)
            }
            None => true,
        }
    }
}

/// A single failed source within one fan-out round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    /// Source name, e.g. `deviceStatus`.
    pub source: String,
    /// Human-readable failure message.
    pub message: String,
}

impl SourceFailure {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

/// Outcome of one fan-out round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceResult {
    /// Merged data; equal to the previous data when nothing succeeded.
    pub data: Option<DataBag>,
    /// Payloads of the sources that succeeded this round, keyed by source.
    pub updates: DataBag,
    /// Number of sources that succeeded.
    pub success_count: usize,
    /// One record per failed source, in declaration order.
    pub failures: Vec<SourceFailure>,
}

impl SourceResult {
    /// A round that ran no sources and left `data` untouched.
    pub fn unchanged(data: Option<DataBag>) -> Self {
        Self {
            data,
            updates: DataBag::new(),
            success_count: 0,
            failures: Vec::new(),
        }
    }

    /// A round that failed before any source ran.
    pub fn failed(data: Option<DataBag>, failure: SourceFailure) -> Self {
        Self {
            data,
            updates: DataBag::new(),
            success_count: 0,
            failures: vec![failure],
        }
    }
}
