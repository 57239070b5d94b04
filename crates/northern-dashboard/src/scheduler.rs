//! Background polling of visited tabs.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use northern_client::HttpBackend;
//! use northern_core::DashboardConfig;
//! use northern_dashboard::{Dashboard, NoopPrefsStore, PollScheduler};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DashboardConfig::new("http://localhost:8080/api");
//! let backend = Arc::new(HttpBackend::from_config(&config)?);
//! let dashboard = Dashboard::new(config, backend, Arc::new(NoopPrefsStore));
//!
//! // Refresh visited tabs every 15 seconds
//! let handle = PollScheduler::new(dashboard.clone()).start();
//!
//! // ... serve the dashboard ...
//!
//! // Stop polling (dropping the handle does the same)
//! handle.stop();
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::dashboard::Dashboard;

/// Periodic background refresher.
///
/// Each tick force-reloads every visited tab (or the active tab if none has
/// been visited) without touching `loading` or `error`. The first tick fires
/// one full interval after start, and a tick never starts while the previous
/// round is still running.
pub struct PollScheduler {
    dashboard: Dashboard,
    interval: Duration,
}

impl PollScheduler {
    /// Create a scheduler using the dashboard's configured interval.
    pub fn new(dashboard: Dashboard) -> Self {
        let interval = dashboard.config().poll_interval;
        Self {
            dashboard,
            interval,
        }
    }

    /// Create a scheduler with a custom interval.
    pub fn with_interval(dashboard: Dashboard, interval: Duration) -> Self {
        Self {
            dashboard,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the background loop.
    ///
    /// Returns an inert handle if the dashboard is disabled, has no API base,
    /// or is shut down. The loop exits on its own when the dashboard becomes
    /// inactive; re-enabling requires a new `start`.
    pub fn start(self) -> PollHandle {
        if !self.dashboard.is_active() {
            debug!("dashboard inactive, poll scheduler not started");
            return PollHandle { task: None };
        }

        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Starting poll scheduler"
        );

        let task = tokio::spawn(async move {
            self.run_loop().await;
        });
        PollHandle { task: Some(task) }
    }

    async fn run_loop(self) {
        let mut ticks = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut lifecycle = self.dashboard.lifecycle();

        loop {
            tokio::select! {
                _ = ticks.tick() => {
                    self.dashboard.poll_once().await;
                }
                changed = lifecycle.changed() => {
                    if changed.is_err() || !self.dashboard.is_active() {
                        break;
                    }
                }
            }
        }

        debug!("poll scheduler stopped");
    }
}

/// Handle to a running [`PollScheduler`]. Dropping it stops polling.
#[derive(Debug)]
pub struct PollHandle {
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Stop polling. Loads already started still finish.
    pub fn stop(mut self) {
        self.abort();
    }

    /// True while the loop is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.abort();
    }
}
