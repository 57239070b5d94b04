//! # northern-dashboard
//!
//! Multi-source polling aggregator behind the Northern operational dashboard.
//!
//! This crate provides:
//! - [`Dashboard`] - Per-tab loading with in-flight coalescing and partial-failure merging
//! - [`PollScheduler`] - Background refresh of visited tabs
//! - [`SessionResolver`] - Lazily created, persisted backend session for the memory tab
//! - [`PrefsStore`] - Best-effort persistence of the active tab and session id
//! - [`resolve_sources`] - Concurrent fan-out over a tab's sources
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use northern_client::HttpBackend;
//! use northern_core::{DashboardConfig, TabKey};
//! use northern_dashboard::{Dashboard, FilePrefsStore, PollScheduler};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DashboardConfig::load()?;
//!     let backend = Arc::new(HttpBackend::from_config(&config)?);
//!     let prefs = Arc::new(FilePrefsStore::new(config.prefs_path()?));
//!     let dashboard = Dashboard::new(config, backend, prefs);
//!
//!     dashboard.set_active_tab(TabKey::Tasks).await;
//!     let _poller = PollScheduler::new(dashboard.clone()).start();
//!
//!     println!("{:?}", dashboard.tab_state(TabKey::Tasks));
//!     Ok(())
//! }
//! ```

pub mod dashboard;
pub mod orchestrator;
pub mod prefs;
pub mod scheduler;
pub mod session;
pub mod store;

pub use dashboard::{Dashboard, DashboardSnapshot, LoadOptions, SESSION_SOURCE};
pub use orchestrator::{humanize_source_name, resolve_sources, summarize_failures};
pub use prefs::{
    ACTIVE_TAB_KEY, FilePrefsStore, MemoryPrefsStore, NoopPrefsStore, PersistedPrefs, PrefsStore,
    SESSION_ID_KEY, clear_prefs, load_prefs,
};
pub use scheduler::{PollHandle, PollScheduler};
pub use session::SessionResolver;
pub use store::{Applied, TabStore};
