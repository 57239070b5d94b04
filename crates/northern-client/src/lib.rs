//! # northern-client
//!
//! HTTP access to the Northern backend for the dashboard poller.
//!
//! This crate provides:
//! - [`ApiClient`] - JSON GET/POST against the configured API base (reqwest)
//! - [`Endpoint`] - The read-only endpoints the dashboard consumes
//! - [`DashboardBackend`] - Trait for per-tab source registries
//! - [`HttpBackend`] - The production source registry
//! - [`session`] - Session id extraction from creation responses
//! - [`ClientError`] - Request failures, readable as failure messages

pub mod backend;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod session;

pub use backend::{DashboardBackend, HttpBackend, Source, SourceFuture, source_names};
pub use client::ApiClient;
pub use endpoints::{Endpoint, QueryParams};
pub use error::{ClientError, Result};
pub use session::{extract_session_id, parse_session_id};
