//! Tab loading and the shared dashboard state.
//!
//! [`Dashboard`] is the one coordinating object: it owns the tab store, the
//! in-flight registry, the visited set, the active tab, and the dashboard-wide
//! `last_refresh_at`. It is cheap to clone; clones share state.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use northern_client::HttpBackend;
//! use northern_core::{DashboardConfig, TabKey};
//! use northern_dashboard::{Dashboard, LoadOptions, MemoryPrefsStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DashboardConfig::new("http://localhost:8080/api");
//! let backend = Arc::new(HttpBackend::from_config(&config)?);
//! let dashboard = Dashboard::new(config, backend, Arc::new(MemoryPrefsStore::new()));
//!
//! if let Some(state) = dashboard.load_tab(TabKey::Activity, LoadOptions::default()).await {
//!     println!("error: {:?}", state.error);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared, join_all};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use northern_client::DashboardBackend;
use northern_core::{DashboardConfig, SourceFailure, SourceResult, TabKey, TabState, log_tab_event};

use crate::orchestrator::{resolve_sources, summarize_failures};
use crate::prefs::{ACTIVE_TAB_KEY, PrefsStore, load_prefs};
use crate::session::SessionResolver;
use crate::store::TabStore;

/// Source name used for a failed session lookup.
pub const SESSION_SOURCE: &str = "sessionId";

/// Options for [`Dashboard::load_tab`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Start a new load even if one is in flight.
    pub force: bool,
    /// Leave `loading` and `error` untouched while the load runs.
    pub suppress_loading: bool,
}

impl LoadOptions {
    /// Forced foreground load (tab switch, manual refresh).
    pub fn forced() -> Self {
        Self {
            force: true,
            suppress_loading: false,
        }
    }

    /// Forced load without a loading flag (poll ticks).
    pub fn background() -> Self {
        Self {
            force: true,
            suppress_loading: true,
        }
    }
}

type SharedLoad = Shared<BoxFuture<'static, Option<TabState>>>;

struct InFlight {
    generation: u64,
    task: SharedLoad,
}

/// Most recently started load per tab, plus per-tab generation counters.
#[derive(Default)]
struct InFlightRegistry {
    slots: HashMap<TabKey, InFlight>,
    generations: HashMap<TabKey, u64>,
}

impl InFlightRegistry {
    fn next_generation(&mut self, tab: TabKey) -> u64 {
        let counter = self.generations.entry(tab).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Generation of the most recently started load for `tab`.
    fn latest_started(&self, tab: TabKey) -> u64 {
        self.generations.get(&tab).copied().unwrap_or(0)
    }

    fn clear_if_current(&mut self, tab: TabKey, generation: u64) {
        if self
            .slots
            .get(&tab)
            .is_some_and(|slot| slot.generation == generation)
        {
            self.slots.remove(&tab);
        }
    }
}

/// Read-only copy of the whole dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub tabs: BTreeMap<TabKey, TabState>,
    pub active_tab: TabKey,
    pub visited: Vec<TabKey>,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub is_refreshing: bool,
}

struct Inner {
    config: DashboardConfig,
    backend: Arc<dyn DashboardBackend>,
    prefs: Arc<dyn PrefsStore>,
    sessions: SessionResolver,
    store: TabStore,
    in_flight: Mutex<InFlightRegistry>,
    visited: Mutex<BTreeSet<TabKey>>,
    active_tab: Mutex<TabKey>,
    last_refresh_at: Mutex<Option<DateTime<Utc>>>,
    refresh_batches: AtomicUsize,
    enabled: AtomicBool,
    closed: AtomicBool,
    lifecycle: watch::Sender<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Coordinator for all dashboard tabs.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<Inner>,
}

impl Dashboard {
    /// Create a dashboard. The active tab is restored from `prefs`.
    pub fn new(
        config: DashboardConfig,
        backend: Arc<dyn DashboardBackend>,
        prefs: Arc<dyn PrefsStore>,
    ) -> Self {
        let persisted = load_prefs(prefs.as_ref());
        let active_tab = persisted.active_tab.unwrap_or_default();
        let enabled = config.enabled;
        let (lifecycle, _) = watch::channel(());

        debug!(
            backend = backend.name(),
            %active_tab,
            has_session = persisted.session_id.is_some(),
            "dashboard created"
        );

        Self {
            inner: Arc::new(Inner {
                sessions: SessionResolver::new(Arc::clone(&backend), Arc::clone(&prefs)),
                config,
                backend,
                prefs,
                store: TabStore::new(),
                in_flight: Mutex::new(InFlightRegistry::default()),
                visited: Mutex::new(BTreeSet::new()),
                active_tab: Mutex::new(active_tab),
                last_refresh_at: Mutex::new(None),
                refresh_batches: AtomicUsize::new(0),
                enabled: AtomicBool::new(enabled),
                closed: AtomicBool::new(false),
                lifecycle,
            }),
        }
    }

    /// Configuration this dashboard was created with.
    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    /// The session resolver used by session-scoped tabs.
    pub fn sessions(&self) -> &SessionResolver {
        &self.inner.sessions
    }

    /// True if loads may run: enabled, API base set, not shut down.
    pub fn is_active(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
            && !self.inner.config.api_base.trim().is_empty()
            && !self.inner.closed.load(Ordering::SeqCst)
    }

    /// Enable or disable loading. Disabling stops running schedulers.
    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.inner.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            debug!(enabled, "dashboard enabled flag changed");
            self.inner.lifecycle.send_replace(());
        }
    }

    /// Stop all activity. Loads still in flight finish, but their results
    /// are discarded.
    pub fn shutdown(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            debug!("dashboard shut down");
            self.inner.lifecycle.send_replace(());
        }
    }

    /// Notified whenever the enabled flag changes or the dashboard shuts down.
    pub fn lifecycle(&self) -> watch::Receiver<()> {
        self.inner.lifecycle.subscribe()
    }

    /// Current state of one tab.
    pub fn tab_state(&self, tab: TabKey) -> TabState {
        self.inner.store.get(tab)
    }

    pub fn active_tab(&self) -> TabKey {
        *lock(&self.inner.active_tab)
    }

    /// Tabs that have been loaded at least once, in tab order.
    pub fn visited(&self) -> Vec<TabKey> {
        lock(&self.inner.visited).iter().copied().collect()
    }

    /// When any tab last had a successful source.
    pub fn last_refresh_at(&self) -> Option<DateTime<Utc>> {
        *lock(&self.inner.last_refresh_at)
    }

    fn record_refresh(&self, at: DateTime<Utc>) {
        let mut last = lock(&self.inner.last_refresh_at);
        if last.is_none_or(|prev| prev < at) {
            *last = Some(at);
        }
    }

    /// True while a [`Dashboard::refresh_all`] batch is running.
    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh_batches.load(Ordering::SeqCst) > 0
    }

    /// Copy of the whole dashboard state.
    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            tabs: self.inner.store.all().into_iter().collect(),
            active_tab: self.active_tab(),
            visited: self.visited(),
            last_refresh_at: self.last_refresh_at(),
            is_refreshing: self.is_refreshing(),
        }
    }

    /// Tabs a refresh should cover: every visited tab, or the active tab if
    /// none has been visited yet.
    pub fn refresh_targets(&self) -> Vec<TabKey> {
        let visited = self.visited();
        if visited.is_empty() {
            vec![self.active_tab()]
        } else {
            visited
        }
    }

    /// Load one tab.
    ///
    /// Returns `None` if the dashboard is inactive. A non-forced call while a
    /// load for `tab` is in flight joins that load and returns its result.
    pub async fn load_tab(&self, tab: TabKey, options: LoadOptions) -> Option<TabState> {
        if !self.is_active() {
            debug!(%tab, "dashboard inactive, skipping load");
            return None;
        }

        lock(&self.inner.visited).insert(tab);

        let task = {
            let mut registry = lock(&self.inner.in_flight);
            let joinable = if options.force {
                None
            } else {
                registry
                    .slots
                    .get(&tab)
                    .map(|slot| (slot.generation, slot.task.clone()))
            };

            if let Some((generation, task)) = joinable {
                debug!(%tab, generation, "joining in-flight load");
                task
            } else {
                let generation = registry.next_generation(tab);
                if !options.suppress_loading {
                    self.inner.store.begin_foreground(tab);
                }
                let task = self.spawn_load(tab, generation, options.suppress_loading);
                registry.slots.insert(
                    tab,
                    InFlight {
                        generation,
                        task: task.clone(),
                    },
                );
                task
            }
        };

        task.await
    }

    fn spawn_load(&self, tab: TabKey, generation: u64, background: bool) -> SharedLoad {
        let dashboard = self.clone();
        let handle = tokio::spawn(async move {
            let outcome = dashboard.run_load(tab, generation, background).await;
            lock(&dashboard.inner.in_flight).clear_if_current(tab, generation);
            outcome
        });

        async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(%tab, error = %e, "tab load task failed");
                    None
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn run_load(&self, tab: TabKey, generation: u64, background: bool) -> Option<TabState> {
        let started = Instant::now();
        debug!(%tab, generation, background, "loading tab");

        let previous = self.inner.store.data(tab);
        let result = if tab.requires_session() {
            match self.inner.sessions.resolve().await {
                Ok(session_id) => {
                    let sources = self.inner.backend.sources(tab, Some(&session_id));
                    resolve_sources(sources, previous.as_ref()).await
                }
                Err(e) => {
                    warn!(
                        %tab,
                        error = %e,
                        network = e.is_network_error(),
                        "session resolution failed: {}",
                        e.friendly_message()
                    );
                    SourceResult::failed(previous, SourceFailure::new(SESSION_SOURCE, e.to_string()))
                }
            }
        } else {
            let sources = self.inner.backend.sources(tab, None);
            resolve_sources(sources, previous.as_ref()).await
        };

        self.finish_load(tab, generation, background, result, started)
    }

    fn finish_load(
        &self,
        tab: TabKey,
        generation: u64,
        background: bool,
        result: SourceResult,
        started: Instant,
    ) -> Option<TabState> {
        if self.inner.closed.load(Ordering::SeqCst) {
            debug!(%tab, generation, "discarding result after shutdown");
            return None;
        }

        let finished_at = Utc::now();
        let success_count = result.success_count;
        let failure_count = result.failures.len();
        let summary = summarize_failures(&result.failures);

        if success_count > 0 {
            self.record_refresh(finished_at);
        }

        for failure in &result.failures {
            debug!(%tab, source = %failure.source, message = %failure.message, "source failure");
        }
        if let Some(summary) = &summary {
            if background {
                debug!(%tab, failures = failure_count, successes = success_count, "{}", summary);
            } else {
                warn!(%tab, failures = failure_count, successes = success_count, "{}", summary);
            }
        }

        // in_flight before store, same order as load_tab.
        let applied = {
            let registry = lock(&self.inner.in_flight);
            let latest_started = registry.latest_started(tab);
            self.inner
                .store
                .apply(tab, generation, latest_started, result, summary, finished_at)
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if background {
            debug!(
                target: "northern::tab",
                %tab,
                event = "loaded",
                generation,
                successes = success_count,
                failures = failure_count,
                stale = applied.stale,
                elapsed_ms,
                "tab event"
            );
        } else {
            log_tab_event!(
                tab,
                "loaded",
                generation,
                successes = success_count,
                failures = failure_count,
                stale = applied.stale,
                elapsed_ms
            );
        }

        Some(applied.state)
    }

    /// Switch the active tab, persist it, and load it in the foreground.
    pub async fn set_active_tab(&self, tab: TabKey) -> Option<TabState> {
        *lock(&self.inner.active_tab) = tab;
        self.inner.prefs.set(ACTIVE_TAB_KEY, Some(tab.as_str()));
        self.load_tab(tab, LoadOptions::forced()).await
    }

    /// Force a foreground reload of every refresh target concurrently.
    pub async fn refresh_all(&self) -> Vec<(TabKey, Option<TabState>)> {
        if !self.is_active() {
            return Vec::new();
        }

        let _batch = RefreshBatch::start(&self.inner.refresh_batches);
        let targets = self.refresh_targets();
        let results = join_all(
            targets
                .iter()
                .map(|tab| self.load_tab(*tab, LoadOptions::forced())),
        )
        .await;

        targets.into_iter().zip(results).collect()
    }

    /// One background poll round over the refresh targets.
    pub async fn poll_once(&self) {
        if !self.is_active() {
            return;
        }

        let targets = self.refresh_targets();
        debug!(tabs = ?targets, "poll tick");
        join_all(
            targets
                .iter()
                .map(|tab| self.load_tab(*tab, LoadOptions::background())),
        )
        .await;
    }
}

/// Keeps `is_refreshing` true until dropped.
struct RefreshBatch<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> RefreshBatch<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for RefreshBatch<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
