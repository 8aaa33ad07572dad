//! Master startup orchestration.
//!
//! # Responsibilities
//! - Launch the worker pool
//! - Start the metrics endpoint
//! - Bind the listener and serve until shutdown
//! - Stop the workers once the listener has drained
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Workers start before the listener (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::pool::{PoolError, WorkerLauncher, WorkerPool};

/// How long each worker gets to exit after its stdin closes.
pub const WORKER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Error type for master startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run the master process until a termination signal arrives.
pub async fn run_master(config: ProxyConfig, worker_count: usize) -> Result<(), StartupError> {
    let launcher = WorkerLauncher::current_exe(&config)?;
    let pool = Arc::new(WorkerPool::spawn(worker_count, launcher, &config.ipc)?);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address: address.clone(), source })?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(&config, Arc::clone(&pool));
    let served = server.run(listener, shutdown.subscribe()).await;

    pool.shutdown(WORKER_SHUTDOWN_GRACE).await;
    served.map_err(StartupError::Serve)
}
