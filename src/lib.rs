//! Multi-process reverse proxy.
//!
//! A master process accepts HTTP and round-robins each request to one of N
//! worker processes over a newline-delimited JSON pipe; workers apply
//! caching, path routing and upstream forwarding.

// Core subsystems
pub mod config;
pub mod http;
pub mod ipc;
pub mod pool;
pub mod routing;
pub mod worker;

// External collaborators
pub mod analytics;
pub mod cache;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pool::WorkerPool;
pub use worker::RequestPipeline;
