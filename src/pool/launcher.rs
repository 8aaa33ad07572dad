//! Worker process launch.
//!
//! # Responsibilities
//! - Re-execute the proxy binary in worker mode
//! - Hand it the validated config and its identity through the environment
//! - Wire its stdin/stdout into a [`Transport`]

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::config::{loader, ProxyConfig, WORKER_CONFIG_ENV};
use crate::ipc::Transport;
use crate::pool::PoolError;
use crate::worker::{IS_WORKER_ENV, WORKER_ID_ENV};

/// A freshly started worker process.
pub struct WorkerProcess {
    pub child: Child,
    pub pid: Option<u32>,
    pub transport: Transport,
}

/// Knows how to start worker processes.
#[derive(Debug, Clone)]
pub struct WorkerLauncher {
    program: PathBuf,
    config_json: String,
    max_frame_bytes: usize,
}

impl WorkerLauncher {
    /// Launch workers from `program`.
    pub fn new(program: impl Into<PathBuf>, config: &ProxyConfig) -> Result<Self, PoolError> {
        Ok(Self {
            program: program.into(),
            config_json: loader::encode_for_worker(config)?,
            max_frame_bytes: config.ipc.max_frame_bytes,
        })
    }

    /// Launch workers from the running executable.
    pub fn current_exe(config: &ProxyConfig) -> Result<Self, PoolError> {
        let program = std::env::current_exe().map_err(PoolError::CurrentExe)?;
        Self::new(program, config)
    }

    /// Start worker `index`.
    pub fn spawn(&self, index: usize) -> Result<WorkerProcess, PoolError> {
        let mut child = Command::new(&self.program)
            .env(IS_WORKER_ENV, "true")
            .env(WORKER_ID_ENV, index.to_string())
            .env(WORKER_CONFIG_ENV, &self.config_json)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PoolError::Spawn { index, source })?;

        let stdin = child.stdin.take().ok_or(PoolError::Pipe(index))?;
        let stdout = child.stdout.take().ok_or(PoolError::Pipe(index))?;
        let pid = child.id();

        tracing::info!(worker = index, pid = ?pid, "Worker started");

        Ok(WorkerProcess {
            child,
            pid,
            transport: Transport::new(stdout, stdin, self.max_frame_bytes),
        })
    }
}
