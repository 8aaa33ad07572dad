//! The worker pool and request dispatch.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::Instant;

use crate::config::IpcConfig;
use crate::ipc::{IpcRequest, IpcResponse, Transport};
use crate::observability::metrics;
use crate::pool::handle::WorkerHandle;
use crate::pool::launcher::WorkerLauncher;
use crate::pool::round_robin::RoundRobin;
use crate::pool::{DispatchError, PoolError};

/// A fixed set of workers behind a round-robin selector.
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    round_robin: RoundRobin,
}

impl WorkerPool {
    /// Start `count` worker processes. Any launch failure aborts the whole pool.
    pub fn spawn(count: usize, launcher: WorkerLauncher, ipc: &IpcConfig) -> Result<Self, PoolError> {
        if count == 0 {
            return Err(PoolError::NoWorkers);
        }

        let launcher = Arc::new(launcher);
        let workers = (0..count)
            .map(|index| WorkerHandle::spawn(index, Arc::clone(&launcher), ipc))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(workers = count, "Worker pool started");
        Ok(Self::from_handles(workers))
    }

    /// Build a pool over already-connected transports, one per worker.
    pub fn from_transports(transports: Vec<Transport>) -> Result<Self, PoolError> {
        if transports.is_empty() {
            return Err(PoolError::NoWorkers);
        }
        let workers = transports
            .into_iter()
            .enumerate()
            .map(|(index, transport)| WorkerHandle::attach(index, transport))
            .collect();
        Ok(Self::from_handles(workers))
    }

    fn from_handles(workers: Vec<WorkerHandle>) -> Self {
        Self {
            workers,
            round_robin: RoundRobin::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn worker(&self, index: usize) -> Option<&WorkerHandle> {
        self.workers.get(index)
    }

    /// Pick the next worker and run one exchange against it.
    pub async fn dispatch(&self, request: &IpcRequest) -> Result<IpcResponse, DispatchError> {
        let index = self
            .round_robin
            .next(self.workers.len())
            .ok_or(DispatchError::Unavailable { worker: 0 })?;
        let start = Instant::now();

        tracing::debug!(worker = index, method = %request.method, url = %request.url, "Dispatching");

        let result = self.workers[index].exchange(request).await;
        match &result {
            Ok(response) => metrics::record_dispatch(index, response.status, start),
            Err(e) => metrics::record_dispatch_error(index, e.kind()),
        }
        result
    }

    /// Stop every worker, waiting up to `grace` for each to exit.
    pub async fn shutdown(&self, grace: Duration) {
        tracing::info!(workers = self.workers.len(), "Stopping worker pool");
        join_all(self.workers.iter().map(|w| w.shutdown(grace))).await;
    }
}
