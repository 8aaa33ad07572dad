//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with a single catch-all handler
//! - Wire up middleware (request ID, tracing)
//! - Translate each HTTP request into an IPC exchange with a worker
//! - Translate the worker's answer (or the exchange failure) back into HTTP

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::http::request::{to_ipc_request, MakeRequestUuid, X_REQUEST_ID};
use crate::ipc::IpcResponse;
use crate::pool::WorkerPool;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<WorkerPool>,
    pub max_body_bytes: usize,
}

/// The master's HTTP front end.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server that hands every request to `pool`.
    pub fn new(config: &ProxyConfig, pool: Arc<WorkerPool>) -> Self {
        let state = AppState {
            pool,
            // Leave room in the frame for headers and JSON escaping.
            max_body_bytes: config.ipc.max_frame_bytes / 2,
        };
        Self {
            router: Self::build_router(state),
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(X_REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("-");
                        tracing::info_span!(
                            "http",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id,
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: one worker exchange per request.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read request body");
        }
    };

    let message = to_ipc_request(&parts, &body, remote_addr);
    let url = message.url.clone();

    // The exchange runs detached so a client hanging up cannot leave a
    // response unread on the worker's pipe.
    let pool = Arc::clone(&state.pool);
    let exchange = tokio::spawn(async move { pool.dispatch(&message).await }.in_current_span());

    match exchange.await {
        Ok(Ok(response)) => worker_response(response),
        Ok(Err(e)) => {
            tracing::error!(error = %e, url = %url, "Worker exchange failed");
            let status = StatusCode::from_u16(e.status()).unwrap_or(StatusCode::BAD_GATEWAY);
            json_error(status, e.public_message())
        }
        Err(e) => {
            tracing::error!(error = %e, url = %url, "Worker exchange task failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Worker exchange failed")
        }
    }
}

fn worker_response(response: IpcResponse) -> Response {
    let Ok(status) = StatusCode::from_u16(response.status) else {
        tracing::error!(status = response.status, worker = %response.worker_id, "Worker returned invalid status");
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Invalid response from worker");
    };
    if let Some(error) = &response.error {
        tracing::debug!(worker = %response.worker_id, status = response.status, error = %error, "Worker reported error");
    }

    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        response.body,
    )
        .into_response()
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        serde_json::json!({ "error": message }).to_string(),
    )
        .into_response()
}
