//! Best-effort persistence of the active tab and session id.
//!
//! Persistence is an optimization only. No [`PrefsStore`] method returns an
//! error; unreadable, corrupt, or unwritable storage degrades to "nothing
//! stored" and is logged at debug level.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use northern_core::TabKey;

/// Key for the last active tab.
pub const ACTIVE_TAB_KEY: &str = "northern.dashboard.activeTab";

/// Key for the dashboard's backend session id.
pub const SESSION_ID_KEY: &str = "northern.dashboard.sessionId";

/// Small durable key/value store.
pub trait PrefsStore: Send + Sync {
    /// Read a value. Missing or unreadable values are `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value. `None` or an empty string removes the key.
    fn set(&self, key: &str, value: Option<&str>);
}

/// The two persisted scalars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedPrefs {
    pub active_tab: Option<TabKey>,
    pub session_id: Option<String>,
}

/// Read both prefs. A stored tab name that no longer exists is ignored.
pub fn load_prefs(store: &dyn PrefsStore) -> PersistedPrefs {
    PersistedPrefs {
        active_tab: store
            .get(ACTIVE_TAB_KEY)
            .and_then(|name| name.parse::<TabKey>().ok()),
        session_id: store.get(SESSION_ID_KEY).filter(|id| !id.is_empty()),
    }
}

/// Remove both prefs.
pub fn clear_prefs(store: &dyn PrefsStore) {
    store.set(ACTIVE_TAB_KEY, None);
    store.set(SESSION_ID_KEY, None);
}

fn normalize(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryPrefsStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPrefsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrefsStore for MemoryPrefsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: Option<&str>) {
        let Ok(mut values) = self.values.lock() else {
            return;
        };
        match normalize(value) {
            Some(v) => {
                values.insert(key.to_string(), v.to_string());
            }
            None => {
                values.remove(key);
            }
        }
    }
}

/// Store for environments without durable storage. Every call is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPrefsStore;

impl PrefsStore for NoopPrefsStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: Option<&str>) {}
}

/// JSON object file store.
///
/// The whole file is rewritten on each change. Writes go through a sibling
/// temp file and a rename so a crash never leaves a half-written file.
#[derive(Debug)]
pub struct FilePrefsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FilePrefsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> BTreeMap<String, String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!(path = %self.path.display(), error = %e, "prefs file unreadable");
                }
                return BTreeMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(values) => values,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "prefs file corrupt, ignoring");
                BTreeMap::new()
            }
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)
    }
}

impl PrefsStore for FilePrefsStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().ok()?;
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: Option<&str>) {
        let Ok(_guard) = self.lock.lock() else {
            return;
        };

        let mut values = self.read_all();
        let changed = match normalize(value) {
            Some(v) => values.insert(key.to_string(), v.to_string()).as_deref() != Some(v),
            None => values.remove(key).is_some(),
        };
        if !changed {
            return;
        }

        if let Err(e) = self.write_all(&values) {
            debug!(path = %self.path.display(), key, error = %e, "failed to persist pref");
        }
    }
}
