//! Memoized session id acquisition for session-scoped tabs.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use northern_client::{DashboardBackend, Result, parse_session_id};

use crate::prefs::{PrefsStore, SESSION_ID_KEY};

/// Resolves the dashboard's session id: memory, then prefs, then backend.
///
/// A backend session is created at most once per resolver as long as the
/// prefs store keeps the id. Creation is serialized, so concurrent callers
/// share one creation request.
pub struct SessionResolver {
    backend: Arc<dyn DashboardBackend>,
    prefs: Arc<dyn PrefsStore>,
    cached: Mutex<Option<String>>,
}

impl SessionResolver {
    pub fn new(backend: Arc<dyn DashboardBackend>, prefs: Arc<dyn PrefsStore>) -> Self {
        Self {
            backend,
            prefs,
            cached: Mutex::new(None),
        }
    }

    /// Return the session id, creating one only if none is known.
    pub async fn resolve(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        if let Some(id) = self.prefs.get(SESSION_ID_KEY).filter(|id| !id.is_empty()) {
            debug!("restored dashboard session from prefs");
            *cached = Some(id.clone());
            return Ok(id);
        }

        let response = self.backend.create_session().await?;
        let id = parse_session_id(&response)?;

        self.prefs.set(SESSION_ID_KEY, Some(&id));
        info!(backend = self.backend.name(), "dashboard session ready");
        *cached = Some(id.clone());
        Ok(id)
    }

    /// The id if already known, without creating one.
    pub async fn current(&self) -> Option<String> {
        if let Some(id) = self.cached.lock().await.clone() {
            return Some(id);
        }
        self.prefs.get(SESSION_ID_KEY).filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryPrefsStore;
    use async_trait::async_trait;
    use northern_client::{ClientError, Source};
    use northern_core::TabKey;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CreatingBackend {
        response: Value,
        calls: AtomicUsize,
    }

    impl CreatingBackend {
        fn new(response: Value) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DashboardBackend for CreatingBackend {
        fn name(&self) -> &str {
            "test"
        }

        fn sources(&self, _tab: TabKey, _session_id: Option<&str>) -> Vec<Source> {
            Vec::new()
        }

        async fn create_session(&self) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn test_creates_once_and_persists() {
        let backend = CreatingBackend::new(json!({"data": {"id": "abc123"}}));
        let prefs = Arc::new(MemoryPrefsStore::new());
        let resolver = SessionResolver::new(backend.clone(), prefs.clone());

        assert_eq!(resolver.resolve().await.unwrap(), "abc123");
        assert_eq!(resolver.resolve().await.unwrap(), "abc123");

        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(prefs.get(SESSION_ID_KEY).as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_cached_id_skips_network() {
        let backend = CreatingBackend::new(json!({"id": "new"}));
        let prefs = Arc::new(MemoryPrefsStore::new());
        prefs.set(SESSION_ID_KEY, Some("persisted"));

        let resolver = SessionResolver::new(backend.clone(), prefs);
        let first = resolver.resolve().await.unwrap();
        let second = resolver.resolve().await.unwrap();

        assert_eq!(first, "persisted");
        assert_eq!(first, second);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unparseable_response_fails_and_persists_nothing() {
        let backend = CreatingBackend::new(json!({}));
        let prefs = Arc::new(MemoryPrefsStore::new());
        let resolver = SessionResolver::new(backend.clone(), prefs.clone());

        let err = resolver.resolve().await.unwrap_err();
        assert!(matches!(err, ClientError::MissingSessionId { .. }));
        assert_eq!(prefs.get(SESSION_ID_KEY), None);
        assert_eq!(resolver.current().await, None);

        // Not memoized: the next resolve tries again.
        let _ = resolver.resolve().await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_creation() {
        let backend = CreatingBackend::new(json!({"session_id": "s1"}));
        let prefs = Arc::new(MemoryPrefsStore::new());
        let resolver = Arc::new(SessionResolver::new(backend.clone(), prefs));

        let (a, b) = tokio::join!(resolver.resolve(), resolver.resolve());
        assert_eq!(a.unwrap(), "s1");
        assert_eq!(b.unwrap(), "s1");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }
}
