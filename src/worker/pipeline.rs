//! Per-request processing inside a worker.
//!
//! # Request States
//! ```text
//! Received → CacheCheck ─hit──────────────────────────────▶ Respond(200)
//!               │ miss / non-GET
//!               ▼
//!             Route ─no target──────────────────────────────▶ Respond(404)
//!               │ target
//!               ▼
//!             Forward ─build/transport/body failure─────────▶ Respond(400/502/500)
//!               │ success
//!               ▼
//!             CacheWrite (GET only) ───────────────────────▶ Respond(upstream status)
//! ```
//!
//! Every terminal state emits exactly one analytics event and one response.

use std::sync::Arc;

use tokio::time::Instant;

use crate::analytics::{self, AnalyticsEvent, AnalyticsSink};
use crate::cache::{cache_key, CacheStore, CACHE_TTL};
use crate::ipc::{IpcRequest, IpcResponse};
use crate::routing::Router;
use crate::worker::upstream::UpstreamClient;

/// Body of the response for requests that match no rule.
pub const NO_ROUTE_BODY: &str = "No upstream found for path";

/// Turns one [`IpcRequest`] into one [`IpcResponse`].
pub struct RequestPipeline {
    worker_id: String,
    router: Router,
    cache: Arc<dyn CacheStore>,
    analytics: Arc<dyn AnalyticsSink>,
    upstream: UpstreamClient,
}

impl RequestPipeline {
    pub fn new(
        worker_id: impl Into<String>,
        router: Router,
        cache: Arc<dyn CacheStore>,
        analytics: Arc<dyn AnalyticsSink>,
        upstream: UpstreamClient,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            router,
            cache,
            analytics,
            upstream,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Process one request to completion.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        let start = Instant::now();
        let response = self.process(&request).await;

        analytics::emit(
            &self.analytics,
            AnalyticsEvent::new(
                &request.method,
                &request.url,
                response.status,
                start.elapsed(),
                request.client_ip(),
            ),
        );

        response
    }

    async fn process(&self, request: &IpcRequest) -> IpcResponse {
        let key = cache_key(&request.url);

        if request.is_get() {
            match self.cache.get(&key).await {
                Ok(Some(body)) => {
                    tracing::debug!(url = %request.url, "Cache hit");
                    return self.respond(200, body);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(url = %request.url, error = %e, "Cache lookup failed"),
            }
        }

        let Some(target) = self.router.resolve(&request.url) else {
            tracing::debug!(url = %request.url, "No route matched");
            return self.respond(404, NO_ROUTE_BODY);
        };

        tracing::debug!(
            method = %request.method,
            upstream = %target.upstream_id,
            target = %target.url,
            "Forwarding request"
        );

        let upstream = match self.upstream.forward(request, &target.url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %request.url, target = %target.url, error = %e, "Upstream call failed");
                return self.respond(e.status(), e.public_message()).with_error(&e);
            }
        };

        if request.is_get() {
            if let Err(e) = self.cache.set(&key, &upstream.body, CACHE_TTL).await {
                tracing::warn!(url = %request.url, error = %e, "Failed to write cache");
            }
        }

        self.respond(upstream.status, upstream.body)
    }

    fn respond(&self, status: u16, body: impl Into<String>) -> IpcResponse {
        IpcResponse::new(self.worker_id.as_str(), status, body)
    }
}
