//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits so the same structs deserialize from the
//! config file and round-trip through the `WORKER_CONFIG` environment
//! variable handed to worker processes.

use serde::{Deserialize, Serialize};

/// Root configuration document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Listener, worker pool, upstreams and routing rules.
    pub server: ServerConfig,

    /// Cache store connection.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Analytics sink connection.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Master/worker pipe settings.
    #[serde(default)]
    pub ipc: IpcConfig,

    /// Logging and metrics settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// The routing core: where to listen, how many workers, where to forward.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// TCP port the master listens on.
    pub listen: u16,

    /// Interface the master binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Number of worker processes. Zero means one per available core.
    #[serde(default, rename = "worker", alias = "workers")]
    pub worker_count: usize,

    /// Addressable backends, identified by `id`.
    #[serde(default)]
    pub upstreams: Vec<UpstreamNode>,

    /// Header rules. Parsed and validated, not applied to traffic.
    #[serde(default)]
    pub headers: Vec<HeaderRule>,

    /// Path routing rules, scanned in order.
    #[serde(default)]
    pub rules: Vec<RoutingRule>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl ServerConfig {
    /// Bind address for the master listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.listen)
    }

    /// Look up an upstream by id.
    pub fn upstream(&self, id: &str) -> Option<&UpstreamNode> {
        self.upstreams.iter().find(|u| u.id == id)
    }

    /// Worker count after resolving the "one per core" default.
    pub fn effective_worker_count(&self) -> usize {
        if self.worker_count > 0 {
            return self.worker_count;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

/// A backend HTTP service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpstreamNode {
    /// Unique upstream identifier.
    pub id: String,

    /// Base URL, e.g. "http://backend:9000". The request path is appended verbatim.
    pub url: String,
}

/// A header key/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderRule {
    pub key: String,
    pub value: String,
}

/// Maps a top-level path segment to an ordered list of upstream ids.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoutingRule {
    /// First path segment to match, including the leading slash ("/api").
    pub path: String,

    /// Candidate upstream ids. Only the first one is used.
    #[serde(default)]
    pub upstreams: Vec<String>,
}

/// Which cache store implementation workers connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    /// Per-process map, for development and tests.
    Memory,
}

/// Cache store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Redis connection URL.
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            url: "redis://redis:6379".to_string(),
        }
    }
}

/// Which analytics sink implementation workers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsBackend {
    Clickhouse,
    /// Events go to the log only.
    Log,
}

/// Analytics sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub backend: AnalyticsBackend,

    /// ClickHouse HTTP interface base URL.
    pub url: String,

    /// Destination table.
    pub table: String,

    /// Ping attempts at worker start before giving up.
    pub connect_attempts: u32,

    /// Base delay between ping attempts in milliseconds.
    pub connect_backoff_ms: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            backend: AnalyticsBackend::Clickhouse,
            url: "http://clickhouse:8123".to_string(),
            table: "analytics.api_logs".to_string(),
            connect_attempts: 15,
            connect_backoff_ms: 2000,
        }
    }
}

/// Master/worker transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Largest accepted frame (one JSON line) in bytes. Also caps request bodies.
    pub max_frame_bytes: usize,

    /// Base delay before respawning a dead worker, in milliseconds.
    pub respawn_base_delay_ms: u64,

    /// Upper bound on the respawn delay, in milliseconds.
    pub respawn_max_delay_ms: u64,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 8 * 1024 * 1024,
            respawn_base_delay_ms: 500,
            respawn_max_delay_ms: 30_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint on the master.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
server:
  listen: 8000
  worker: 2
  upstreams:
    - id: svc1
      url: http://backend:9000
  headers:
    - key: x-forwarded-proto
      value: http
  rules:
    - path: /api
      upstreams: [svc1]
"#;

    #[test]
    fn test_yaml_document() {
        let config: ProxyConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.server.listen, 8000);
        assert_eq!(config.server.worker_count, 2);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.rules[0].upstreams, vec!["svc1".to_string()]);
        assert_eq!(config.server.headers.len(), 1);
        assert_eq!(config.cache.backend, CacheBackend::Redis);
        assert_eq!(config.analytics.table, "analytics.api_logs");
    }

    #[test]
    fn test_workers_alias() {
        let doc = "server:\n  listen: 1\n  workers: 3\n";
        let config: ProxyConfig = serde_yaml::from_str(doc).unwrap();
        assert_eq!(config.server.worker_count, 3);
    }

    #[test]
    fn test_effective_worker_count() {
        let mut config: ProxyConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.server.effective_worker_count(), 2);
        config.server.worker_count = 0;
        assert!(config.server.effective_worker_count() >= 1);
    }

    #[test]
    fn test_json_round_trip_for_workers() {
        let config: ProxyConfig = serde_yaml::from_str(SAMPLE).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: ProxyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.server.upstreams, config.server.upstreams);
        assert_eq!(back.server.rules, config.server.rules);
        assert_eq!(back.server.worker_count, 2);
    }
}
