//! Master/worker message protocol.
//!
//! # Data Flow
//! ```text
//! master                                   worker
//!   IpcRequest  ──JSON line──▶ stdin  ──▶  runtime reader
//!   IpcResponse ◀──JSON line── stdout ◀──  runtime writer
//! ```
//!
//! # Design Decisions
//! - One UTF-8 JSON object per line, `\n` terminated
//! - The inbound stream carries only requests, the outbound only responses
//! - Headers travel as name → ordered values to keep multi-value headers
//! - Bodies travel as strings; binary bodies are not supported

pub mod message;
pub mod transport;

pub use message::{canonical_header_name, HeaderMultiMap, IpcRequest, IpcResponse};
pub use transport::{BoxedReader, BoxedWriter, FrameReader, FrameWriter, IpcError, Transport};
