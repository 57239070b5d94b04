//! Fan-out/fan-in over a tab's sources.
//!
//! [`resolve_sources`] runs every source concurrently, waits for all of them
//! to settle, and merges successes over the previous data. It never fails:
//! each source's error (or panic) becomes a [`SourceFailure`].

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use futures_util::future::join_all;
use tracing::debug;

use northern_client::Source;
use northern_core::{DataBag, SourceFailure, SourceResult};

/// Run all sources and merge their results over `previous`.
///
/// Keys are written in source declaration order, so if two sources ever
/// share a name the later declaration wins regardless of arrival order.
pub async fn resolve_sources(sources: Vec<Source>, previous: Option<&DataBag>) -> SourceResult {
    if sources.is_empty() {
        return SourceResult::unchanged(previous.cloned());
    }

    let (names, futures): (Vec<String>, Vec<_>) = sources
        .into_iter()
        .map(|source| {
            let (name, future) = source.into_parts();
            (name, AssertUnwindSafe(future).catch_unwind())
        })
        .unzip();

    let settled = join_all(futures).await;

    let mut updates = DataBag::new();
    let mut success_count = 0;
    let mut failures = Vec::new();

    for (name, outcome) in names.into_iter().zip(settled) {
        match outcome {
            Ok(Ok(value)) => {
                updates.insert(name, value);
                success_count += 1;
            }
            Ok(Err(e)) => {
                debug!(
                    source = %name,
                    error = %e,
                    network = e.is_network_error(),
                    "source failed"
                );
                failures.push(SourceFailure::new(name, e.to_string()));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                debug!(source = %name, error = %message, "source panicked");
                failures.push(SourceFailure::new(name, message));
            }
        }
    }

    let mut data = previous.cloned().unwrap_or_default();
    data.extend(updates.iter().map(|(k, v)| (k.clone(), v.clone())));

    SourceResult {
        data: Some(data),
        updates,
        success_count,
        failures,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "source panicked".to_string()
    }
}

/// Turn a source name into words: `deviceStatus` becomes `device status`.
pub fn humanize_source_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
        } else if ch.is_uppercase() {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out.trim_end().to_string()
}

/// One-sentence summary of a round's failures, or `None` if there were none.
pub fn summarize_failures(failures: &[SourceFailure]) -> Option<String> {
    if failures.is_empty() {
        return None;
    }

    let names: Vec<String> = failures
        .iter()
        .map(|f| humanize_source_name(&f.source))
        .collect();
    Some(format!("Partial refresh: {}.", names.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use northern_client::ClientError;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn ok(name: &'static str, value: Value) -> Source {
        Source::new(name, move || async move { Ok(value) })
    }

    fn fail(name: &'static str, message: &'static str) -> Source {
        Source::new(name, move || async move {
            Err(ClientError::Config(message.to_string()))
        })
    }

    fn bag(value: Value) -> DataBag {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn test_empty_sources_leave_data_untouched() {
        let previous = bag(json!({"healthLive": {"status": "alive"}}));
        let result = resolve_sources(Vec::new(), Some(&previous)).await;

        assert_eq!(result.data, Some(previous));
        assert_eq!(result.success_count, 0);
        assert!(result.failures.is_empty());

        let result = resolve_sources(Vec::new(), None).await;
        assert_eq!(result.data, None);
    }

    #[tokio::test]
    async fn test_total_failure_keeps_previous_data() {
        let previous = bag(json!({"a": 1, "b": 2}));
        let sources = vec![fail("a", "down"), fail("b", "down")];

        let result = resolve_sources(sources, Some(&previous)).await;

        assert_eq!(result.data, Some(previous));
        assert_eq!(result.success_count, 0);
        assert_eq!(result.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_partial_success_overwrites_only_successes() {
        let previous = bag(json!({"a": "old-a", "b": "old-b", "c": "kept"}));
        let sources = vec![ok("a", json!("new-a")), fail("b", "network down")];

        let result = resolve_sources(sources, Some(&previous)).await;
        assert_eq!(result.updates, bag(json!({"a": "new-a"})));
        let data = result.data.unwrap();

        assert_eq!(data["a"], json!("new-a"));
        assert_eq!(data["b"], json!("old-b"));
        assert_eq!(data["c"], json!("kept"));
        assert_eq!(result.success_count, 1);
        assert_eq!(
            result.failures,
            vec![SourceFailure::new("b", "Configuration error: network down")]
        );
    }

    #[tokio::test]
    async fn test_slow_source_does_not_block_failure_capture() {
        let slow = Source::new("slow", || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(json!("late"))
        });
        let sources = vec![slow, fail("fast", "boom")];

        let result = resolve_sources(sources, None).await;
        let data = result.data.unwrap();

        assert_eq!(data["slow"], json!("late"));
        assert_eq!(result.failures[0].source, "fast");
    }

    #[tokio::test]
    async fn test_merge_order_follows_declaration_not_arrival() {
        let first = Source::new("dup", || async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(json!("first-declared"))
        });
        let second = ok("dup", json!("second-declared"));

        let result = resolve_sources(vec![first, second], None).await;
        assert_eq!(result.data.unwrap()["dup"], json!("second-declared"));
        assert_eq!(result.success_count, 2);
    }

    #[tokio::test]
    async fn test_panicking_source_becomes_failure() {
        let panicking = Source::new("agentRegistry", || async {
            if true {
                panic!("registry exploded");
            }
            Ok(json!(null))
        });
        let sources = vec![panicking, ok("skillsCatalog", json!([]))];

        let result = resolve_sources(sources, None).await;

        assert_eq!(result.success_count, 1);
        assert_eq!(
            result.failures,
            vec![SourceFailure::new("agentRegistry", "registry exploded")]
        );
    }

    #[test]
    fn test_humanize_source_name() {
        assert_eq!(humanize_source_name("healthLive"), "health live");
        assert_eq!(humanize_source_name("deviceStatus"), "device status");
        assert_eq!(humanize_source_name("sessionId"), "session id");
        assert_eq!(humanize_source_name("memory_items"), "memory items");
        assert_eq!(humanize_source_name("skills"), "skills");
    }

    #[test]
    fn test_summary_is_deterministic() {
        let failures = vec![
            SourceFailure::new("healthLive", "x"),
            SourceFailure::new("deviceStatus", "y"),
        ];
        assert_eq!(
            summarize_failures(&failures).as_deref(),
            Some("Partial refresh: health live, device status.")
        );
        assert_eq!(summarize_failures(&[]), None);
    }
}
