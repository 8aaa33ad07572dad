//! HTTP protocol handling subsystem (master side).
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span)
//!     → request.rs (HTTP request → IpcRequest)
//!     → pool (round-robin worker exchange)
//!     → server.rs (IpcResponse → HTTP response, application/json)
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{to_ipc_request, MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
