//! Shared test doubles for dashboard integration tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use northern_client::{ClientError, DashboardBackend, Source, source_names};
use northern_core::{DashboardConfig, TabKey};
use northern_dashboard::{Dashboard, MemoryPrefsStore};
use serde_json::{Value, json};

/// Backend whose sources answer `{"source": name, "round": n}`.
///
/// Rounds are numbered by `sources()` calls and every source handed out
/// counts as one fetch.
#[derive(Default)]
pub struct CountingBackend {
    fetches: AtomicUsize,
    rounds: AtomicUsize,
    sessions: AtomicUsize,
    failing: Mutex<HashSet<String>>,
    delays: Mutex<VecDeque<Duration>>,
    session_response: Mutex<Option<Value>>,
}

impl CountingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn fail(&self, source: &str) {
        self.failing.lock().unwrap().insert(source.to_string());
    }

    pub fn recover(&self, source: &str) {
        self.failing.lock().unwrap().remove(source);
    }

    /// Delay for the next rounds, in order. Rounds beyond the queue run
    /// without delay.
    pub fn queue_delays(&self, delays: &[Duration]) {
        self.delays.lock().unwrap().extend(delays.iter().copied());
    }

    pub fn set_session_response(&self, response: Value) {
        *self.session_response.lock().unwrap() = Some(response);
    }
}

#[async_trait]
impl DashboardBackend for CountingBackend {
    fn name(&self) -> &str {
        "counting"
    }

    fn sources(&self, tab: TabKey, session_id: Option<&str>) -> Vec<Source> {
        if tab.requires_session() && session_id.is_none() {
            return Vec::new();
        }

        let round = self.rounds.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
        let failing = self.failing.lock().unwrap().clone();

        source_names(tab)
            .iter()
            .map(|name| {
                let name = *name;
                let fails = failing.contains(name);
                Source::new(name, move || async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    if fails {
                        Err(ClientError::Config(format!("{name} unavailable")))
                    } else {
                        Ok(json!({"source": name, "round": round}))
                    }
                })
            })
            .inspect(|_| {
                self.fetches.fetch_add(1, Ordering::SeqCst);
            })
            .collect()
    }

    async fn create_session(&self) -> northern_client::Result<Value> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .session_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| json!({"id": "session-1"})))
    }
}

pub fn config() -> DashboardConfig {
    DashboardConfig::new("http://northern.test/api")
}

pub fn dashboard(backend: Arc<CountingBackend>) -> Dashboard {
    northern_core::init_test_logging();
    Dashboard::new(config(), backend, Arc::new(MemoryPrefsStore::new()))
}

/// Round number a source reported in the tab's data.
pub fn round_of(data: &serde_json::Map<String, Value>, source: &str) -> u64 {
    data[source]["round"].as_u64().unwrap()
}
