//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Worker transport fails:
//!     → backoff.rs RetryGate records the failure
//!     → slot refuses dispatches until the backoff elapses
//!     → next dispatch respawns the worker
//!
//! Analytics store not ready at worker start:
//!     → backoff.rs delays between ping attempts
//! ```
//!
//! # Design Decisions
//! - Jittered backoff prevents respawn storms
//! - No request-level retries: requests are not replayed to another worker

pub mod backoff;
