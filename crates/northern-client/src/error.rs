//! Error types for backend requests.
//!
//! The `Display` text of a [`ClientError`] is what ends up in a tab's
//! failure records, so messages are short and readable on their own.

use thiserror::Error;

/// Backend client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Backend answered with a non-2xx status
    #[error("{message} ({status})")]
    Status { status: u16, message: String },

    /// Backend answered 2xx but the body was not usable JSON
    #[error("Invalid response from {path}: {message}")]
    Decode { path: String, message: String },

    /// Request never produced a response
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// API base could not be used to build request URLs
    #[error("Invalid API base URL '{0}'")]
    InvalidBaseUrl(String),

    /// Session creation succeeded but no identifier could be found
    #[error("Session response did not include an id (keys: {keys})")]
    MissingSessionId { keys: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Build a status error from a response body, preferring the backend's
    /// `detail` or `message` field over the generic reason phrase.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                ["detail", "message"].iter().find_map(|key| {
                    value
                        .get(*key)
                        .and_then(|v| v.as_str())
                        .filter(|s| !s.trim().is_empty())
                        .map(str::to_string)
                })
            })
            .unwrap_or_else(|| {
                reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Request failed")
                    .to_string()
            });

        ClientError::Status { status, message }
    }

    /// HTTP status, if the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this error is a network-related error.
    pub fn is_network_error(&self) -> bool {
        match self {
            ClientError::Transport(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ClientError::Status { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Get a user-friendly error message.
    pub fn friendly_message(&self) -> String {
        match self {
            ClientError::Transport(e) if e.is_timeout() => {
                "Request timed out. Check your connection.".to_string()
            }
            ClientError::Transport(e) if e.is_connect() => {
                "Could not connect to the backend. Check that it is running.".to_string()
            }
            ClientError::Status { status: 401 | 403, .. } => {
                "Not authorized to read dashboard data.".to_string()
            }
            ClientError::MissingSessionId { .. } => {
                "The backend did not return a session id.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
