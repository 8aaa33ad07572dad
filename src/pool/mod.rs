//! Worker pool subsystem (master side).
//!
//! # Data Flow
//! ```text
//! HTTP handler builds IpcRequest
//!     → dispatcher.rs (round_robin.rs picks slot i)
//!     → handle.rs (lock slot i → write request line → read response line → unlock)
//!     → IpcResponse back to the HTTP handler
//!
//! Startup:
//!     launcher.rs spawns N copies of this binary with IS_WORKER=true,
//!     WORKER_ID=i and WORKER_CONFIG=<json>, stdin/stdout piped
//! ```
//!
//! # Design Decisions
//! - Selection is lock-free; the exchange is exclusive per worker, so at
//!   most one request is outstanding on any pipe pair
//! - Launch failure at startup is fatal; no partial pool
//! - A slot whose stream breaks is respawned lazily after a backoff

pub mod dispatcher;
pub mod handle;
pub mod launcher;
pub mod round_robin;

use crate::config::ConfigError;
use crate::ipc::IpcError;

pub use dispatcher::WorkerPool;
pub use handle::WorkerHandle;
pub use launcher::WorkerLauncher;
pub use round_robin::RoundRobin;

/// Error type for pool construction and worker launch.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("worker pool needs at least one worker")]
    NoWorkers,

    #[error("cannot locate proxy executable: {0}")]
    CurrentExe(#[source] std::io::Error),

    #[error("failed to start worker {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("worker {0} started without stdio pipes")]
    Pipe(usize),

    #[error("failed to encode worker config: {0}")]
    Config(#[from] ConfigError),
}

/// Error type for one dispatched request.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("worker {worker} is unavailable")]
    Unavailable { worker: usize },

    #[error("worker respawn failed: {0}")]
    Respawn(#[source] PoolError),

    #[error("failed to send to worker {worker}: {source}")]
    Send {
        worker: usize,
        #[source]
        source: IpcError,
    },

    #[error("failed to read from worker {worker}: {source}")]
    Receive {
        worker: usize,
        #[source]
        source: IpcError,
    },
}

impl DispatchError {
    /// Status the master answers with.
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::Send { source: IpcError::FrameTooLarge(_), .. } => 413,
            DispatchError::Receive { source: IpcError::Decode(_), .. } => 500,
            _ => 502,
        }
    }

    /// Diagnostic body the master answers with.
    pub fn public_message(&self) -> &'static str {
        match self {
            DispatchError::Unavailable { .. } | DispatchError::Respawn(_) => "Worker unavailable",
            DispatchError::Send { source: IpcError::FrameTooLarge(_), .. } => "Request too large for worker",
            DispatchError::Send { .. } => "Failed to send to worker",
            DispatchError::Receive { source: IpcError::Decode(_), .. } => "Invalid response from worker",
            DispatchError::Receive { .. } => "Failed to read from worker",
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Unavailable { .. } => "unavailable",
            DispatchError::Respawn(_) => "respawn",
            DispatchError::Send { source: IpcError::FrameTooLarge(_), .. } => "too_large",
            DispatchError::Send { .. } => "send",
            DispatchError::Receive { source: IpcError::Decode(_), .. } => "decode",
            DispatchError::Receive { .. } => "receive",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let invalid = DispatchError::Receive { worker: 0, source: IpcError::Decode(decode) };
        assert_eq!(invalid.status(), 500);
        assert_eq!(invalid.public_message(), "Invalid response from worker");

        let closed = DispatchError::Receive { worker: 0, source: IpcError::Closed };
        assert_eq!(closed.status(), 502);
        assert_eq!(closed.kind(), "receive");

        let send = DispatchError::Send { worker: 1, source: IpcError::Closed };
        assert_eq!(send.status(), 502);
        assert_eq!(send.public_message(), "Failed to send to worker");

        let too_large = DispatchError::Send { worker: 1, source: IpcError::FrameTooLarge(2048) };
        assert_eq!(too_large.status(), 413);
        assert_eq!(too_large.public_message(), "Request too large for worker");
        assert_eq!(too_large.kind(), "too_large");

        let oversized_reply = DispatchError::Receive { worker: 1, source: IpcError::FrameTooLarge(2048) };
        assert_eq!(oversized_reply.status(), 502);

        assert_eq!(DispatchError::Unavailable { worker: 2 }.status(), 502);
    }
}
