//! Request analytics subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline terminal state
//!     → AnalyticsEvent { method, path, status, latency_ms, ip_address }
//!     → emit(): spawned task → AnalyticsSink::record
//!                                 → clickhouse.rs (HTTP INSERT ... FORMAT JSONEachRow)
//!                                 → LogSink (tracing only)
//! ```
//!
//! # Design Decisions
//! - Fire-and-forget: the request never waits on the sink
//! - Sink failures are logged and otherwise ignored
//! - Exactly one event per processed request

pub mod clickhouse;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{AnalyticsBackend, AnalyticsConfig};

pub use clickhouse::ClickHouseSink;

/// One processed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsEvent {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub latency_ms: u64,
    pub ip_address: String,
}

impl AnalyticsEvent {
    pub fn new(method: &str, path: &str, status: u16, latency: Duration, ip_address: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            status,
            latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            ip_address: ip_address.to_string(),
        }
    }
}

/// Error type for analytics delivery.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("analytics request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("analytics store rejected event: {status} {body}")]
    Rejected { status: u16, body: String },

    #[error("analytics store unreachable after {0} attempts")]
    Unreachable(u32),
}

/// Destination for analytics events.
#[async_trait]
pub trait AnalyticsSink: Send + Sync + 'static {
    async fn record(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError>;
}

/// Record an event in the background. Never blocks the caller.
pub fn emit(sink: &Arc<dyn AnalyticsSink>, event: AnalyticsEvent) {
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        if let Err(e) = sink.record(event).await {
            tracing::warn!(error = %e, "Failed to record analytics event");
        }
    });
}

/// Sink that only writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl AnalyticsSink for LogSink {
    async fn record(&self, event: AnalyticsEvent) -> Result<(), AnalyticsError> {
        tracing::info!(
            method = %event.method,
            path = %event.path,
            status = event.status,
            latency_ms = event.latency_ms,
            ip = %event.ip_address,
            "request"
        );
        Ok(())
    }
}

/// Connect the configured analytics sink.
pub async fn connect(config: &AnalyticsConfig) -> Result<Arc<dyn AnalyticsSink>, AnalyticsError> {
    match config.backend {
        AnalyticsBackend::Clickhouse => Ok(Arc::new(ClickHouseSink::connect(config).await?)),
        AnalyticsBackend::Log => Ok(Arc::new(LogSink)),
    }
}
