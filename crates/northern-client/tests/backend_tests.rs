//! Integration tests for the HTTP backend against a mock API.

use northern_client::{ClientError, DashboardBackend, HttpBackend, parse_session_id};
use northern_core::{DashboardConfig, TabKey};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> HttpBackend {
    let mut config = DashboardConfig::new(format!("{}/api", server.uri()));
    config.list_limit = 20;
    config.telemetry_window_hours = 6;
    HttpBackend::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_tasks_sources_hit_their_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tasks/active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "t1"}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/workflows/runs"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"runs": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/outbox/messages"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "outbox disabled"})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let mut results = Vec::new();
    for source in backend.sources(TabKey::Tasks, None) {
        let (name, fetch) = source.into_parts();
        results.push((name, fetch.await));
    }

    let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["activeTasks", "workflowRuns", "outboxMessages"]);
    assert_eq!(results[0].1.as_ref().unwrap(), &json!([{"id": "t1"}]));
    assert!(results[1].1.is_ok());

    match &results[2].1 {
        Err(ClientError::Status { status, message }) => {
            assert_eq!(*status, 404);
            assert_eq!(message, "outbox disabled");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_telemetry_sources_send_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/telemetry/summary"))
        .and(query_param("window_hours", "6"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let summary = backend
        .sources(TabKey::Activity, None)
        .into_iter()
        .find(|s| s.name() == "telemetrySummary")
        .unwrap();

    assert_eq!(summary.fetch().await.unwrap(), json!({"events": 3}));
}

#[tokio::test]
async fn test_create_session_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sessions"))
        .and(body_partial_json(json!({
            "mode": "dashboard",
            "metadata": {"client": "northern-dash"},
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"session_id": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend(&server);
    let response = backend.create_session().await.unwrap();
    assert_eq!(parse_session_id(&response).unwrap(), "42");
}

#[tokio::test]
async fn test_memory_sources_need_session() {
    let server = MockServer::start().await;
    let backend = backend(&server);

    assert!(backend.sources(TabKey::Memory, None).is_empty());

    let names: Vec<String> = backend
        .sources(TabKey::Memory, Some("abc123"))
        .iter()
        .map(|s| s.name().to_string())
        .collect();
    assert_eq!(names, vec!["memorySettings", "memoryItems", "memoryQuarantine"]);
}
