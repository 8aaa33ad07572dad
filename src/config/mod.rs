//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → master: shared via Arc with the HTTP layer and pool
//!     → workers: serialized to JSON in WORKER_CONFIG, re-validated on start
//! ```
//!
//! # Design Decisions
//! - Config is loaded once; there is no reload path
//! - Optional sections have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_worker_config, ConfigError, WORKER_CONFIG_ENV};
pub use schema::{
    AnalyticsBackend, AnalyticsConfig, CacheBackend, CacheConfig, HeaderRule, IpcConfig,
    LogFormat, ObservabilityConfig, ProxyConfig, RoutingRule, ServerConfig, UpstreamNode,
};
