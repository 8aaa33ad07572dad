//! One worker slot, as the master sees it.
//!
//! # Responsibilities
//! - Own the worker's transport and child process
//! - Hold a lock across each write+read exchange so responses pair with requests
//! - Retire a worker whose stream broke and respawn it after a backoff

use std::sync::Arc;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::Mutex;

use crate::config::IpcConfig;
use crate::ipc::{IpcError, IpcRequest, IpcResponse, Transport};
use crate::observability::metrics;
use crate::pool::launcher::{WorkerLauncher, WorkerProcess};
use crate::pool::{DispatchError, PoolError};
use crate::resilience::backoff::RetryGate;

struct Slot {
    transport: Option<Transport>,
    child: Option<Child>,
    pid: Option<u32>,
    gate: RetryGate,
}

/// Exclusive owner of one worker's pipe pair.
pub struct WorkerHandle {
    index: usize,
    slot: Mutex<Slot>,
    launcher: Option<Arc<WorkerLauncher>>,
}

impl WorkerHandle {
    /// Start a worker process for slot `index`.
    pub fn spawn(
        index: usize,
        launcher: Arc<WorkerLauncher>,
        ipc: &IpcConfig,
    ) -> Result<Self, PoolError> {
        let WorkerProcess { child, pid, transport } = launcher.spawn(index)?;
        Ok(Self {
            index,
            slot: Mutex::new(Slot {
                transport: Some(transport),
                child: Some(child),
                pid,
                gate: RetryGate::new(ipc.respawn_base_delay_ms, ipc.respawn_max_delay_ms),
            }),
            launcher: Some(launcher),
        })
    }

    /// Attach an already-connected transport, e.g. a worker running in this process.
    ///
    /// Such a slot cannot be respawned once its stream breaks.
    pub fn attach(index: usize, transport: Transport) -> Self {
        Self {
            index,
            slot: Mutex::new(Slot {
                transport: Some(transport),
                child: None,
                pid: None,
                gate: RetryGate::new(0, 0),
            }),
            launcher: None,
        }
    }

    pub async fn pid(&self) -> Option<u32> {
        self.slot.lock().await.pid
    }

    pub async fn is_alive(&self) -> bool {
        self.slot.lock().await.transport.is_some()
    }

    /// Send one request and read its response while holding the slot.
    pub async fn exchange(&self, request: &IpcRequest) -> Result<IpcResponse, DispatchError> {
        let mut slot = self.slot.lock().await;

        if slot.transport.is_none() {
            self.revive(&mut slot)?;
        }
        let Some(transport) = slot.transport.as_mut() else {
            return Err(DispatchError::Unavailable { worker: self.index });
        };

        if let Err(e) = transport.send(request).await {
            if !e.is_recoverable() {
                self.retire(&mut slot, &e);
            }
            return Err(DispatchError::Send { worker: self.index, source: e });
        }

        match transport.recv::<IpcResponse>().await {
            Ok(response) => {
                slot.gate.record_success();
                Ok(response)
            }
            Err(e) => {
                if !e.is_recoverable() {
                    self.retire(&mut slot, &e);
                }
                Err(DispatchError::Receive { worker: self.index, source: e })
            }
        }
    }

    /// Close the worker's stdin and wait for it to exit, killing it after `grace`.
    pub async fn shutdown(&self, grace: Duration) {
        let mut slot = self.slot.lock().await;
        slot.transport = None;

        let Some(mut child) = slot.child.take() else {
            return;
        };
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => tracing::info!(worker = self.index, %status, "Worker exited"),
            Ok(Err(e)) => tracing::warn!(worker = self.index, error = %e, "Failed to wait for worker"),
            Err(_) => {
                tracing::warn!(worker = self.index, "Worker did not exit in time, killing");
                if let Err(e) = child.kill().await {
                    tracing::warn!(worker = self.index, error = %e, "Failed to kill worker");
                }
            }
        }
    }

    fn retire(&self, slot: &mut Slot, cause: &IpcError) {
        let delay = slot.gate.record_failure();
        tracing::error!(
            worker = self.index,
            pid = ?slot.pid,
            error = %cause,
            respawn_in = ?delay,
            "Worker stream broken, retiring worker"
        );

        slot.transport = None;
        slot.pid = None;
        if let Some(mut child) = slot.child.take() {
            let index = self.index;
            tokio::spawn(async move {
                let _ = child.start_kill();
                match child.wait().await {
                    Ok(status) => tracing::info!(worker = index, %status, "Retired worker reaped"),
                    Err(e) => tracing::warn!(worker = index, error = %e, "Failed to reap worker"),
                }
            });
        }
    }

    fn revive(&self, slot: &mut Slot) -> Result<(), DispatchError> {
        let Some(launcher) = &self.launcher else {
            return Err(DispatchError::Unavailable { worker: self.index });
        };
        if !slot.gate.is_open() {
            return Err(DispatchError::Unavailable { worker: self.index });
        }

        match launcher.spawn(self.index) {
            Ok(WorkerProcess { child, pid, transport }) => {
                tracing::info!(worker = self.index, pid = ?pid, "Worker respawned");
                metrics::record_worker_restart(self.index);
                slot.transport = Some(transport);
                slot.child = Some(child);
                slot.pid = pid;
                Ok(())
            }
            Err(e) => {
                let delay = slot.gate.record_failure();
                tracing::error!(worker = self.index, error = %e, retry_in = ?delay, "Worker respawn failed");
                Err(DispatchError::Respawn(e))
            }
        }
    }
}
