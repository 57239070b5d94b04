//! Source registry and the pluggable backend trait.
//!
//! [`DashboardBackend`] abstracts where a tab's data comes from. The
//! production implementation, [`HttpBackend`], maps every [`TabKey`] to an
//! ordered list of named [`Source`]s, each one a single idempotent request
//! against the Northern API.
//!
//! ## Example
//!
//! ```no_run
//! use northern_client::{DashboardBackend, HttpBackend};
//! use northern_core::{DashboardConfig, TabKey};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DashboardConfig::new("http://localhost:8080/api");
//! let backend = HttpBackend::from_config(&config)?;
//!
//! for source in backend.sources(TabKey::Activity, None) {
//!     let name = source.name().to_string();
//!     let value = source.fetch().await?;
//!     println!("{name}: {value}");
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;

use ::async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::{Value, json};
use tracing::info;

use northern_core::{DashboardConfig, SessionConfig, TabKey};

use crate::client::ApiClient;
use crate::endpoints::{Endpoint, QueryParams};
use crate::error::Result;

/// Future produced by one source fetch.
pub type SourceFuture = BoxFuture<'static, Result<Value>>;

/// One named, deferred read against the backend.
///
/// Nothing happens until [`Source::fetch`] is called; the registry can hand
/// out sources freely without issuing requests.
pub struct Source {
    name: String,
    fetch: Box<dyn FnOnce() -> SourceFuture + Send>,
}

impl Source {
    /// Wrap a fetch closure under a source name.
    pub fn new<F, Fut>(name: impl Into<String>, fetch: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            fetch: Box::new(move || fetch().boxed()),
        }
    }

    /// Source name; also the key it contributes to the tab's data.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start the fetch.
    pub fn fetch(self) -> SourceFuture {
        (self.fetch)()
    }

    /// Split into name and future.
    pub fn into_parts(self) -> (String, SourceFuture) {
        let future = (self.fetch)();
        (self.name, future)
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source").field("name", &self.name).finish()
    }
}

/// Where dashboard data comes from.
#[async_trait]
pub trait DashboardBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Ordered sources for a tab. Tabs that need a session return an empty
    /// list when `session_id` is `None`.
    fn sources(&self, tab: TabKey, session_id: Option<&str>) -> Vec<Source>;

    /// Create a backend session and return the raw response.
    async fn create_session(&self) -> Result<Value>;
}

const ACTIVITY_SOURCES: &[&str] = &[
    "healthLive",
    "deviceStatus",
    "telemetryReliability",
    "telemetrySummary",
    "telemetryAlerts",
];
const TASKS_SOURCES: &[&str] = &["activeTasks", "workflowRuns", "outboxMessages"];
const LOGS_SOURCES: &[&str] = &["telemetryEvents"];
const TOOLS_SOURCES: &[&str] = &["skillsCatalog", "agentRegistry"];
const MEMORY_SOURCES: &[&str] = &["memorySettings", "memoryItems", "memoryQuarantine"];

/// Source names registered for a tab, in declaration order.
pub fn source_names(tab: TabKey) -> &'static [&'static str] {
    match tab {
        TabKey::Activity => ACTIVITY_SOURCES,
        TabKey::Tasks => TASKS_SOURCES,
        TabKey::Logs => LOGS_SOURCES,
        TabKey::Tools => TOOLS_SOURCES,
        TabKey::Memory => MEMORY_SOURCES,
    }
}

fn endpoint_for(source: &str, session_id: Option<&str>) -> Option<Endpoint> {
    let scoped = |f: fn(String) -> Endpoint| session_id.map(|id| f(id.to_string()));
    match source {
        "healthLive" => Some(Endpoint::HealthLive),
        "deviceStatus" => Some(Endpoint::DeviceStatus),
        "telemetryReliability" => Some(Endpoint::TelemetryReliability),
        "telemetrySummary" => Some(Endpoint::TelemetrySummary),
        "telemetryAlerts" => Some(Endpoint::TelemetryAlerts),
        "activeTasks" => Some(Endpoint::ActiveTasks),
        "workflowRuns" => Some(Endpoint::WorkflowRuns),
        "outboxMessages" => Some(Endpoint::OutboxMessages),
        "telemetryEvents" => Some(Endpoint::TelemetryEvents),
        "skillsCatalog" => Some(Endpoint::SkillsCatalog),
        "agentRegistry" => Some(Endpoint::AgentRegistry),
        "memorySettings" => scoped(Endpoint::MemorySettings),
        "memoryItems" => scoped(Endpoint::MemoryItems),
        "memoryQuarantine" => scoped(Endpoint::MemoryQuarantine),
        _ => None,
    }
}

/// Backend that reads from the Northern HTTP API.
pub struct HttpBackend {
    client: ApiClient,
    params: QueryParams,
    session: SessionConfig,
}

impl HttpBackend {
    /// Create a backend around an existing client.
    pub fn new(client: ApiClient, config: &DashboardConfig) -> Self {
        Self {
            client,
            params: QueryParams::from(config),
            session: config.session.clone(),
        }
    }

    /// Create a backend from the dashboard config.
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        Ok(Self::new(ApiClient::from_config(config)?, config))
    }

    fn source(&self, name: &'static str, endpoint: Endpoint) -> Source {
        let client = self.client.clone();
        let query = endpoint.query(self.params);
        Source::new(name, move || async move {
            client.get_json(&endpoint, &query).await
        })
    }

    fn session_request(&self) -> Value {
        json!({
            "mode": self.session.mode,
            "temporary": self.session.temporary,
            "metadata": {
                "client": "northern-dash",
                "client_version": env!("CARGO_PKG_VERSION"),
            },
        })
    }
}

#[async_trait]
impl DashboardBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn sources(&self, tab: TabKey, session_id: Option<&str>) -> Vec<Source> {
        if tab.requires_session() && session_id.is_none() {
            return Vec::new();
        }

        source_names(tab)
            .iter()
            .copied()
            .filter_map(|name| {
                endpoint_for(name, session_id).map(|endpoint| self.source(name, endpoint))
            })
            .collect()
    }

    async fn create_session(&self) -> Result<Value> {
        let response = self
            .client
            .post_json(&Endpoint::CreateSession, &self.session_request())
            .await?;
        info!(mode = %self.session.mode, "created backend session");
        Ok(response)
    }
}
