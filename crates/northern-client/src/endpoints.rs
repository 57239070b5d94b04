//! Backend endpoints consumed by the dashboard.
//!
//! Paths are relative to the configured API base. Query parameters come from
//! [`QueryParams`], which is derived from the dashboard config.

use std::fmt;

use northern_core::DashboardConfig;
use reqwest::Method;

/// Query values shared by the windowed and list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryParams {
    pub window_hours: u32,
    pub limit: u32,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self::from(&DashboardConfig::default())
    }
}

impl From<&DashboardConfig> for QueryParams {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            window_hours: config.telemetry_window_hours,
            limit: config.list_limit,
        }
    }
}

/// One backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    HealthLive,
    DeviceStatus,
    TelemetryReliability,
    TelemetrySummary,
    TelemetryAlerts,
    TelemetryEvents,
    ActiveTasks,
    WorkflowRuns,
    OutboxMessages,
    SkillsCatalog,
    AgentRegistry,
    CreateSession,
    MemorySettings(String),
    MemoryItems(String),
    MemoryQuarantine(String),
}

impl Endpoint {
    /// Path segments below the API base. Session ids are single segments
    /// and get percent-encoded when joined.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Endpoint::HealthLive => vec!["health", "live"],
            Endpoint::DeviceStatus => vec!["devices", "status"],
            Endpoint::TelemetryReliability => vec!["telemetry", "reliability"],
            Endpoint::TelemetrySummary => vec!["telemetry", "summary"],
            Endpoint::TelemetryAlerts => vec!["telemetry", "alerts"],
            Endpoint::TelemetryEvents => vec!["telemetry", "events"],
            Endpoint::ActiveTasks => vec!["tasks", "active"],
            Endpoint::WorkflowRuns => vec!["workflows", "runs"],
            Endpoint::OutboxMessages => vec!["outbox", "messages"],
            Endpoint::SkillsCatalog => vec!["skills"],
            Endpoint::AgentRegistry => vec!["agents"],
            Endpoint::CreateSession => vec!["sessions"],
            Endpoint::MemorySettings(id) => vec!["sessions", id.as_str(), "memory", "settings"],
            Endpoint::MemoryItems(id) => vec!["sessions", id.as_str(), "memory", "items"],
            Endpoint::MemoryQuarantine(id) => vec!["sessions", id.as_str(), "memory", "quarantine"],
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Endpoint::CreateSession => Method::POST,
            _ => Method::GET,
        }
    }

    /// Query string pairs for this endpoint.
    pub fn query(&self, params: QueryParams) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::TelemetryReliability
            | Endpoint::TelemetrySummary
            | Endpoint::TelemetryAlerts => {
                vec![("window_hours", params.window_hours.to_string())]
            }
            Endpoint::TelemetryEvents => vec![
                ("window_hours", params.window_hours.to_string()),
                ("limit", params.limit.to_string()),
            ],
            Endpoint::WorkflowRuns | Endpoint::OutboxMessages => {
                vec![("limit", params.limit.to_string())]
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} /{}", self.method(), self.segments().join("/"))
    }
}
