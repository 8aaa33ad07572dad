//! Outbound HTTP calls to upstreams.
//!
//! # Responsibilities
//! - Rebuild the original request against the resolved upstream URL
//! - Copy headers verbatim, force `Accept-Encoding: identity`, drop `User-Agent`
//! - Classify failures by the stage they happened in

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use reqwest::{Method, Url};

use crate::ipc::IpcRequest;

/// Headers the HTTP client derives itself.
const NOT_FORWARDED: [&str; 3] = ["host", "content-length", "transfer-encoding"];

/// Error type for upstream calls, one variant per failure stage.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The outbound request could not be constructed.
    #[error("invalid upstream request: {0}")]
    Build(String),

    /// Connecting, sending or receiving the response head failed.
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response body could not be read.
    #[error("failed to read upstream body: {0}")]
    Body(#[source] reqwest::Error),
}

impl UpstreamError {
    /// Status reported to the caller for this failure.
    pub fn status(&self) -> u16 {
        match self {
            UpstreamError::Build(_) => 400,
            UpstreamError::Transport(_) => 502,
            UpstreamError::Body(_) => 500,
        }
    }

    /// Fixed diagnostic body for this failure.
    pub fn public_message(&self) -> &'static str {
        match self {
            UpstreamError::Build(_) => "Failed to create request",
            UpstreamError::Transport(_) => "Upstream request failed",
            UpstreamError::Body(_) => "Failed to read upstream response",
        }
    }
}

/// A fully read upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP client for upstream calls. Cheap to clone.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    /// Build a client that ignores proxy environment variables and never decompresses.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self { client })
    }

    /// Send `request` to `target_url` and read the whole response.
    pub async fn forward(
        &self,
        request: &IpcRequest,
        target_url: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let outbound = self.build(request, target_url)?;

        let response = self
            .client
            .execute(outbound)
            .await
            .map_err(UpstreamError::Transport)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(UpstreamError::Body)?;

        Ok(UpstreamResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    fn build(&self, request: &IpcRequest, target_url: &str) -> Result<reqwest::Request, UpstreamError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| UpstreamError::Build(format!("method '{}': {e}", request.method)))?;
        let url = Url::parse(target_url)
            .map_err(|e| UpstreamError::Build(format!("url '{target_url}': {e}")))?;

        self.client
            .request(method, url)
            .headers(forwarded_headers(request)?)
            .body(request.body.clone())
            .build()
            .map_err(|e| UpstreamError::Build(e.to_string()))
    }
}

/// Original headers with the proxy's overrides applied.
fn forwarded_headers(request: &IpcRequest) -> Result<HeaderMap, UpstreamError> {
    let mut headers = HeaderMap::new();
    for (name, values) in &request.headers {
        if NOT_FORWARDED.iter().any(|h| name.eq_ignore_ascii_case(h)) {
            continue;
        }
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| UpstreamError::Build(format!("header name '{name}': {e}")))?;
        for value in values {
            let value = HeaderValue::from_str(value)
                .map_err(|e| UpstreamError::Build(format!("header '{name}': {e}")))?;
            headers.append(name.clone(), value);
        }
    }

    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    headers.remove(USER_AGENT);
    Ok(headers)
}
