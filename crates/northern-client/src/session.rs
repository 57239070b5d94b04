//! Session identifier extraction.
//!
//! Session creation responses vary in shape between backend versions. The
//! identifier is found by trying [`SESSION_ID_EXTRACTORS`] in order; the
//! first one that yields a non-empty value wins.

use serde_json::Value;

use crate::error::{ClientError, Result};

/// Pulls a candidate session id out of a creation response.
pub type SessionIdExtractor = fn(&Value) -> Option<String>;

/// Extractors in priority order.
pub const SESSION_ID_EXTRACTORS: &[SessionIdExtractor] = &[
    |v| id_field(v, "id"),
    |v| id_field(v, "session_id"),
    |v| id_field(v, "sessionId"),
    |v| v.get("data").and_then(|d| id_field(d, "id")),
    |v| v.get("data").and_then(|d| id_field(d, "session_id")),
    |v| v.get("data").and_then(|d| id_field(d, "sessionId")),
];

fn id_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract a session id, or `None` if no extractor matches.
pub fn extract_session_id(response: &Value) -> Option<String> {
    SESSION_ID_EXTRACTORS
        .iter()
        .find_map(|extract| extract(response))
}

/// Extract a session id, failing with a description of what the response held.
pub fn parse_session_id(response: &Value) -> Result<String> {
    extract_session_id(response).ok_or_else(|| {
        let keys = match response {
            Value::Object(map) if map.is_empty() => "none".to_string(),
            Value::Object(map) => {
                let mut keys: Vec<_> = map.keys().cloned().collect();
                keys.sort();
                keys.join(", ")
            }
            other => format!("non-object {}", json_kind(other)),
        };
        ClientError::MissingSessionId { keys }
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
