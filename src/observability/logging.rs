//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Emit one access log line per completed request
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Install the global subscriber. Later calls are ignored.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("page_dispatch={0},tower_http={0}", config.log_level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}

/// One completed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessLogEntry {
    pub host: String,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub protocol: String,
}

/// Receives the access log line of every request.
pub trait AccessLogger: Send + Sync {
    fn log(&self, entry: &AccessLogEntry);
}

/// Writes access log lines through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAccessLogger;

impl AccessLogger for TracingAccessLogger {
    fn log(&self, entry: &AccessLogEntry) {
        tracing::info!(
            target: "page_dispatch::access",
            host = %entry.host,
            timestamp = %entry.timestamp.to_rfc3339(),
            method = %entry.method,
            path = %entry.path,
            status = entry.status,
            protocol = %entry.protocol,
            "{} {} {}", entry.method, entry.path, entry.status
        );
    }
}

/// Discards access log lines (`observability.access_log = false`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAccessLogger;

impl AccessLogger for NullAccessLogger {
    fn log(&self, _entry: &AccessLogEntry) {}
}
