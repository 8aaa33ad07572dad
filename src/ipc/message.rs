//! Messages exchanged between the master and its workers.
//!
//! Field names are fixed by the wire format and must not change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Multi-valued header map, keyed by canonical header name.
pub type HeaderMultiMap = BTreeMap<String, Vec<String>>;

/// One HTTP request, as the master hands it to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcRequest {
    /// HTTP method.
    #[serde(rename = "requestType")]
    pub method: String,

    #[serde(default)]
    pub headers: HeaderMultiMap,

    #[serde(default)]
    pub body: String,

    /// Path and query, e.g. "/api/users?x=1".
    pub url: String,

    /// Peer address reported by the master's listener.
    #[serde(rename = "remoteAddr", default)]
    pub remote_addr: String,
}

impl IpcRequest {
    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// Caller address for analytics.
    ///
    /// `X-Real-Ip` wins over `X-Forwarded-For`, which wins over the peer address.
    pub fn client_ip(&self) -> &str {
        self.header("X-Real-Ip")
            .filter(|v| !v.is_empty())
            .or_else(|| self.header("X-Forwarded-For").filter(|v| !v.is_empty()))
            .unwrap_or(&self.remote_addr)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

/// The worker's answer to one [`IpcRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcResponse {
    #[serde(rename = "workerID")]
    pub worker_id: String,

    pub status: u16,

    #[serde(default)]
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IpcResponse {
    pub fn new(worker_id: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            status,
            body: body.into(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Canonical MIME form of a header name: `x-real-ip` → `X-Real-Ip`.
pub fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}
