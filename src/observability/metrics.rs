//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): dispatched requests by worker, status
//! - `proxy_dispatch_duration_seconds` (histogram): master-side exchange latency
//! - `proxy_dispatch_errors_total` (counter): failed exchanges by worker, kind
//! - `proxy_worker_restarts_total` (counter): respawns by worker
//!
//! Recorded in the master only. Without an installed recorder the calls are no-ops.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_dispatch(worker: usize, status: u16, start: Instant) {
    let worker = worker.to_string();
    counter!("proxy_requests_total", "worker" => worker.clone(), "status" => status.to_string())
        .increment(1);
    histogram!("proxy_dispatch_duration_seconds", "worker" => worker)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_dispatch_error(worker: usize, kind: &'static str) {
    counter!("proxy_dispatch_errors_total", "worker" => worker.to_string(), "kind" => kind)
        .increment(1);
}

pub fn record_worker_restart(worker: usize) {
    counter!("proxy_worker_restarts_total", "worker" => worker.to_string()).increment(1);
}
