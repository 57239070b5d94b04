//! # northern-core
//!
//! Core types, configuration, errors, and logging for the Northern dashboard
//! poller.
//!
//! This crate provides:
//! - [`NorthernError`] - Errors that can stop the poller from starting
//! - [`logging`] - Tracing setup and log directory helpers
//! - [`types`] - [`TabKey`], [`TabState`] and fan-out result types
//! - [`config`] - [`DashboardConfig`] loaded from `~/.northern/dashboard.yaml`
//!
//! ## Example
//!
//! ```no_run
//! use northern_core::{DashboardConfig, logging};
//!
//! fn main() -> northern_core::Result<()> {
//!     let _guard = logging::init_logging(None, false)?;
//!     let config = DashboardConfig::load()?;
//!     tracing::info!(api_base = %config.api_base, "config loaded");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{DashboardConfig, SessionConfig};
pub use error::{NorthernError, Result};
pub use logging::{LogGuard, init_logging, init_test_logging};
pub use types::{DataBag, SourceFailure, SourceResult, TabKey, TabState};
