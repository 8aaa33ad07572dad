//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4)
//! - Translate an HTTP request into an [`IpcRequest`]
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Header names are put in canonical form on the wire
//! - Bodies cross the pipe as (lossy) UTF-8 strings

use std::net::SocketAddr;

use axum::http::{request::Parts, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::ipc::{canonical_header_name, HeaderMultiMap, IpcRequest};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build the message handed to a worker.
pub fn to_ipc_request(parts: &Parts, body: &[u8], remote_addr: SocketAddr) -> IpcRequest {
    let mut headers = HeaderMultiMap::new();
    for (name, value) in &parts.headers {
        headers
            .entry(canonical_header_name(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    IpcRequest {
        method: parts.method.as_str().to_string(),
        headers,
        body: String::from_utf8_lossy(body).into_owned(),
        url,
        remote_addr: remote_addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_ipc_request() {
        let (parts, _) = Request::builder()
            .method("POST")
            .uri("http://proxy.local/api/users?x=1")
            .header("x-real-ip", "9.9.9.9")
            .header("accept", "text/html")
            .header("accept", "application/json")
            .body(())
            .unwrap()
            .into_parts();

        let req = to_ipc_request(&parts, b"{\"a\":1}", "127.0.0.1:4000".parse().unwrap());
        assert_eq!(req.method, "POST");
        assert_eq!(req.url, "/api/users?x=1");
        assert_eq!(req.body, "{\"a\":1}");
        assert_eq!(req.remote_addr, "127.0.0.1:4000");
        assert_eq!(req.headers["X-Real-Ip"], vec!["9.9.9.9"]);
        assert_eq!(req.headers["Accept"], vec!["text/html", "application/json"]);
        assert_eq!(req.client_ip(), "9.9.9.9");
    }

    #[test]
    fn test_request_id_is_uuid() {
        let request = Request::builder().body(()).unwrap();
        let id = MakeRequestUuid.make_request_id(&request).unwrap();
        let value = id.header_value().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(value).is_ok());
    }
}
