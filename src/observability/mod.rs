//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, stderr)
//!     → metrics.rs (counters, histograms; master only)
//!
//! Consumers:
//!     → Log aggregation (stderr of master and workers)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID from the HTTP layer flows into the worker as a header
//! - Workers log under a `worker` span carrying their id

pub mod logging;
pub mod metrics;
