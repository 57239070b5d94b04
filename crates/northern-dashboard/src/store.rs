//! Per-tab state store.
//!
//! Each tab's state is written only by the load that owns the newest applied
//! generation for that tab. A load that finishes after a newer load has
//! already applied is dropped instead of overwriting fresher data. Applied
//! rounds merge only the sources they fetched, so overlapping loads never
//! roll a source back to a value older than the one shown.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use northern_core::{DataBag, SourceResult, TabKey, TabState};

#[derive(Debug, Default)]
struct TabEntry {
    state: TabState,
    applied_generation: u64,
}

/// Result of applying a finished round.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// Tab state after the call.
    pub state: TabState,
    /// True if the round was older than what the tab already shows.
    pub stale: bool,
}

/// Mutex-guarded map of tab states.
#[derive(Debug)]
pub struct TabStore {
    tabs: Mutex<HashMap<TabKey, TabEntry>>,
}

impl Default for TabStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TabStore {
    /// Create a store with an empty state for every tab.
    pub fn new() -> Self {
        let tabs = TabKey::ALL
            .into_iter()
            .map(|tab| (tab, TabEntry::default()))
            .collect();
        Self {
            tabs: Mutex::new(tabs),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TabKey, TabEntry>> {
        self.tabs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of one tab's state.
    pub fn get(&self, tab: TabKey) -> TabState {
        self.lock()
            .get(&tab)
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    /// Copy of one tab's data.
    pub fn data(&self, tab: TabKey) -> Option<DataBag> {
        self.lock().get(&tab).and_then(|entry| entry.state.data.clone())
    }

    /// Copy of every tab's state, in tab order.
    pub fn all(&self) -> Vec<(TabKey, TabState)> {
        let tabs = self.lock();
        TabKey::ALL
            .into_iter()
            .map(|tab| {
                let state = tabs.get(&tab).map(|e| e.state.clone()).unwrap_or_default();
                (tab, state)
            })
            .collect()
    }

    /// Mark the start of a foreground load.
    pub fn begin_foreground(&self, tab: TabKey) {
        let mut tabs = self.lock();
        let entry = tabs.entry(tab).or_default();
        entry.state.loading = true;
        entry.state.error = None;
    }

    /// Apply a finished round for `generation`.
    ///
    /// Succeeded sources are merged key by key onto the tab's current data,
    /// so a key this round failed to fetch keeps whatever value is newest.
    /// `data` and `last_updated_at` change only when something succeeded;
    /// `error` always reflects this round. `loading` is cleared only by the
    /// most recently started load (`latest_started`).
    pub fn apply(
        &self,
        tab: TabKey,
        generation: u64,
        latest_started: u64,
        result: SourceResult,
        error: Option<String>,
        finished_at: DateTime<Utc>,
    ) -> Applied {
        let mut tabs = self.lock();
        let entry = tabs.entry(tab).or_default();

        if generation < entry.applied_generation {
            debug!(
                %tab,
                generation,
                applied = entry.applied_generation,
                "dropping result older than applied state"
            );
            return Applied {
                state: entry.state.clone(),
                stale: true,
            };
        }

        entry.applied_generation = generation;
        if generation >= latest_started {
            entry.state.loading = false;
        }
        entry.state.error = error;
        if result.success_count > 0 {
            entry
                .state
                .data
                .get_or_insert_with(DataBag::new)
                .extend(result.updates);
            entry.state.last_updated_at = Some(finished_at);
        }

        Applied {
            state: entry.state.clone(),
            stale: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use northern_core::SourceFailure;
    use serde_json::json;

    fn bag(pairs: &[(&str, serde_json::Value)]) -> DataBag {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn success(updates: DataBag) -> SourceResult {
        SourceResult {
            data: Some(updates.clone()),
            success_count: updates.len(),
            updates,
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_starts_empty() {
        let store = TabStore::new();
        for (_, state) in store.all() {
            assert_eq!(state, TabState::default());
        }
    }

    #[test]
    fn test_foreground_sets_loading_and_clears_error() {
        let store = TabStore::new();
        store.apply(
            TabKey::Logs,
            1,
            1,
            SourceResult::failed(None, SourceFailure::new("telemetryEvents", "x")),
            Some("Partial refresh: telemetry events.".into()),
            Utc::now(),
        );
        assert!(store.get(TabKey::Logs).error.is_some());

        store.begin_foreground(TabKey::Logs);
        let state = store.get(TabKey::Logs);
        assert!(state.loading);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_zero_successes_keep_data() {
        let store = TabStore::new();
        let data = bag(&[("skillsCatalog", json!(["search"]))]);
        store.apply(TabKey::Tools, 1, 1, success(data.clone()), None, Utc::now());
        let first_update = store.get(TabKey::Tools).last_updated_at;

        let failed = SourceResult {
            data: Some(DataBag::new()),
            updates: DataBag::new(),
            success_count: 0,
            failures: vec![SourceFailure::new("skillsCatalog", "down")],
        };
        let applied = store.apply(
            TabKey::Tools,
            2,
            2,
            failed,
            Some("Partial refresh: skills catalog.".into()),
            Utc::now(),
        );

        assert!(!applied.stale);
        assert_eq!(applied.state.data, Some(data));
        assert_eq!(applied.state.last_updated_at, first_update);
        assert_eq!(
            applied.state.error.as_deref(),
            Some("Partial refresh: skills catalog.")
        );
    }

    #[test]
    fn test_older_generation_is_dropped() {
        let store = TabStore::new();
        let newer = bag(&[("activeTasks", json!({"count": 2}))]);
        let older = bag(&[("activeTasks", json!({"count": 1}))]);

        store.apply(TabKey::Tasks, 2, 2, success(newer.clone()), None, Utc::now());
        let applied = store.apply(TabKey::Tasks, 1, 2, success(older), None, Utc::now());

        assert!(applied.stale);
        assert_eq!(store.get(TabKey::Tasks).data, Some(newer));
    }

    #[test]
    fn test_tabs_are_independent() {
        let store = TabStore::new();
        store.apply(
            TabKey::Activity,
            5,
            5,
            success(bag(&[("healthLive", json!("ok"))])),
            None,
            Utc::now(),
        );
        // Generations are per tab.
        let applied = store.apply(
            TabKey::Tools,
            1,
            1,
            success(bag(&[("agentRegistry", json!([]))])),
            None,
            Utc::now(),
        );
        assert!(!applied.stale);
        assert!(store.get(TabKey::Memory).data.is_none());
    }

    #[test]
    fn test_merge_keeps_keys_this_round_did_not_fetch() {
        let store = TabStore::new();
        store.apply(
            TabKey::Activity,
            1,
            1,
            success(bag(&[("healthLive", json!(1)), ("deviceStatus", json!(1))])),
            None,
            Utc::now(),
        );
        store.apply(
            TabKey::Activity,
            2,
            3,
            success(bag(&[("deviceStatus", json!(2))])),
            None,
            Utc::now(),
        );

        // Round 3 read its merge base before round 2 applied and failed
        // deviceStatus; its result must not roll deviceStatus back.
        let round_three = SourceResult {
            data: Some(bag(&[("healthLive", json!(3)), ("deviceStatus", json!(1))])),
            updates: bag(&[("healthLive", json!(3))]),
            success_count: 1,
            failures: vec![SourceFailure::new("deviceStatus", "down")],
        };
        let applied = store.apply(
            TabKey::Activity,
            3,
            3,
            round_three,
            Some("Partial refresh: device status.".into()),
            Utc::now(),
        );

        let data = applied.state.data.unwrap();
        assert_eq!(data["healthLive"], json!(3));
        assert_eq!(data["deviceStatus"], json!(2));
    }

    #[test]
    fn test_only_latest_started_load_clears_loading() {
        let store = TabStore::new();
        store.begin_foreground(TabKey::Logs);

        let older = store.apply(
            TabKey::Logs,
            1,
            2,
            success(bag(&[("telemetryEvents", json!([]))])),
            None,
            Utc::now(),
        );
        assert!(!older.stale);
        assert!(older.state.loading);
        assert!(older.state.has_data());

        let newer = store.apply(
            TabKey::Logs,
            2,
            2,
            success(bag(&[("telemetryEvents", json!([1]))])),
            None,
            Utc::now(),
        );
        assert!(!newer.state.loading);
    }
}
