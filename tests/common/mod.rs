//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use pooled_proxy::config::{
    AnalyticsBackend, AnalyticsConfig, CacheBackend, CacheConfig, IpcConfig, ObservabilityConfig,
    ProxyConfig, RoutingRule, ServerConfig, UpstreamNode,
};

/// What a mock backend saw.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Requests received by a mock backend, in arrival order.
pub type Recorder = Arc<Mutex<Vec<RecordedRequest>>>;

/// Start a simple mock backend that returns a fixed response.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { (200, response.to_string()) }).await
}

/// Start a backend that answers every request with its request target.
pub async fn start_echo_backend() -> SocketAddr {
    start_programmable_backend(|request| async move { (200, request.target) }).await
}

/// Start a backend that records every request and answers with a fixed response.
pub async fn start_recording_backend(status: u16, body: &'static str) -> (SocketAddr, Recorder) {
    let recorder: Recorder = Arc::default();
    let seen = Arc::clone(&recorder);
    let addr = start_programmable_backend(move |request| {
        let seen = Arc::clone(&seen);
        async move {
            seen.lock().unwrap().push(request);
            (status, body.to_string())
        }
    })
    .await;
    (addr, recorder)
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read one HTTP/1.1 request: head, then a Content-Length body.
async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(RecordedRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Config with one upstream per `(id, addr)` and one rule per `(path, upstream id)`.
/// Workers use the in-memory cache and log-only analytics.
pub fn proxy_config(upstreams: &[(&str, SocketAddr)], rules: &[(&str, &str)]) -> ProxyConfig {
    ProxyConfig {
        server: ServerConfig {
            listen: 8080,
            host: "127.0.0.1".into(),
            worker_count: 2,
            upstreams: upstreams
                .iter()
                .map(|(id, addr)| UpstreamNode {
                    id: id.to_string(),
                    url: format!("http://{addr}"),
                })
                .collect(),
            headers: vec![],
            rules: rules
                .iter()
                .map(|(path, upstream)| RoutingRule {
                    path: path.to_string(),
                    upstreams: vec![upstream.to_string()],
                })
                .collect(),
        },
        cache: CacheConfig {
            backend: CacheBackend::Memory,
            ..CacheConfig::default()
        },
        analytics: AnalyticsConfig {
            backend: AnalyticsBackend::Log,
            ..AnalyticsConfig::default()
        },
        ipc: IpcConfig {
            respawn_base_delay_ms: 10,
            respawn_max_delay_ms: 50,
            ..IpcConfig::default()
        },
        observability: ObservabilityConfig {
            log_level: "warn".into(),
            ..ObservabilityConfig::default()
        },
    }
}
