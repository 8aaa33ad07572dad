//! Worker process subsystem.
//!
//! # Data Flow
//! ```text
//! stdin (JSON lines)
//!     → runtime.rs (sequential reader, one task per request)
//!     → pipeline.rs (cache check → route → upstream.rs → cache write)
//!     → runtime.rs (single writer)
//!     → stdout (JSON lines)
//! ```
//!
//! # Design Decisions
//! - The cache store is required: failing to connect ends the worker
//! - Requests are received in order but processed concurrently
//! - stdout belongs to the protocol; logs go to stderr

pub mod pipeline;
pub mod runtime;
pub mod upstream;

use std::sync::Arc;

use crate::analytics::{self, AnalyticsError};
use crate::cache::{self, CacheError};
use crate::config::ProxyConfig;
use crate::ipc::IpcError;
use crate::routing::Router;

pub use pipeline::RequestPipeline;
pub use upstream::{UpstreamClient, UpstreamError};

/// Set to `true` in a worker process's environment.
pub const IS_WORKER_ENV: &str = "IS_WORKER";
/// Worker index, used to tag responses and logs.
pub const WORKER_ID_ENV: &str = "WORKER_ID";

/// Whether this process was launched as a worker.
pub fn is_worker_process() -> bool {
    std::env::var(IS_WORKER_ENV).is_ok_and(|v| v == "true")
}

/// This worker's identity, or "unknown" outside a worker.
pub fn worker_id() -> String {
    std::env::var(WORKER_ID_ENV).unwrap_or_else(|_| "unknown".to_string())
}

/// Error type for worker startup and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("cache store connection failed: {0}")]
    Cache(#[from] CacheError),

    #[error("analytics sink connection failed: {0}")]
    Analytics(#[from] AnalyticsError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("transport failed: {0}")]
    Transport(#[from] IpcError),
}

/// Connect the worker's dependencies and build its pipeline.
pub async fn build_pipeline(
    worker_id: &str,
    config: &ProxyConfig,
) -> Result<RequestPipeline, WorkerError> {
    let cache = cache::connect(&config.cache).await?;
    let analytics = analytics::connect(&config.analytics).await?;
    let upstream = UpstreamClient::new()?;

    Ok(RequestPipeline::new(
        worker_id,
        Router::from_config(&config.server),
        cache,
        analytics,
        upstream,
    ))
}

/// Run this process as a worker on stdin/stdout until stdin closes.
pub async fn run_worker(worker_id: String, config: ProxyConfig) -> Result<(), WorkerError> {
    let pipeline = build_pipeline(&worker_id, &config).await?;
    tracing::info!(
        rules = config.server.rules.len(),
        upstreams = config.server.upstreams.len(),
        "Worker ready"
    );

    runtime::run(
        Arc::new(pipeline),
        tokio::io::stdin(),
        tokio::io::stdout(),
        config.ipc.max_frame_bytes,
    )
    .await?;

    tracing::info!("Worker stopped");
    Ok(())
}
