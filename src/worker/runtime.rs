//! Worker event loop.
//!
//! # Responsibilities
//! - Read requests off the inbound stream, in order
//! - Run each request's pipeline as its own task
//! - Funnel completed responses through a single writer task
//!
//! # Design Decisions
//! - One writer owns the outbound stream, so frames never interleave
//! - Responses leave in completion order, not arrival order
//! - End-of-stream stops the reader; in-flight requests still finish and flush
//! - Every frame read gets exactly one frame back: an unreadable request is
//!   answered with 400, a response too large for the pipe with 502

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::ipc::{FrameReader, FrameWriter, IpcError, IpcRequest, IpcResponse};
use crate::worker::pipeline::RequestPipeline;

/// Body of the response sent when a request frame could not be read.
pub const MALFORMED_REQUEST_BODY: &str = "Malformed request frame";
/// Body of the response sent in place of one too large for the pipe.
pub const RESPONSE_TOO_LARGE_BODY: &str = "Upstream response too large";

/// Serve requests from `reader` until it closes, writing responses to `writer`.
pub async fn run<R, W>(
    pipeline: Arc<RequestPipeline>,
    reader: R,
    writer: W,
    max_frame_bytes: usize,
) -> Result<(), IpcError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = FrameWriter::new(writer, max_frame_bytes);
    let writer_task = tokio::spawn(write_responses(writer, rx).in_current_span());

    let mut frames = FrameReader::new(reader, max_frame_bytes);
    let mut received: u64 = 0;

    loop {
        match frames.next_frame::<IpcRequest>().await {
            Some(Ok(request)) => {
                received += 1;
                let pipeline = Arc::clone(&pipeline);
                let tx = tx.clone();
                tokio::spawn(
                    async move {
                        let response = pipeline.handle(request).await;
                        if tx.send(response).is_err() {
                            tracing::warn!("Response writer gone, dropping response");
                        }
                    }
                    .in_current_span(),
                );
            }
            Some(Err(e)) if e.is_recoverable() => {
                tracing::warn!(error = %e, "Dropping malformed request frame");
                let response = IpcResponse::new(pipeline.worker_id(), 400, MALFORMED_REQUEST_BODY)
                    .with_error(&e);
                if tx.send(response).is_err() {
                    tracing::warn!("Response writer gone, dropping response");
                }
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "Inbound stream failed");
                break;
            }
            None => {
                tracing::info!(received, "Inbound stream closed");
                break;
            }
        }
    }

    // The writer exits once every in-flight task has dropped its sender.
    drop(tx);
    writer_task
        .await
        .unwrap_or_else(|e| Err(IpcError::Io(std::io::Error::other(e))))
}

async fn write_responses<W>(
    mut writer: FrameWriter<W>,
    mut rx: mpsc::UnboundedReceiver<IpcResponse>,
) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let Err(e) = writer.send(&response).await else {
            continue;
        };
        if !e.is_recoverable() {
            tracing::error!(error = %e, "Failed to write response frame");
            return Err(e);
        }

        tracing::warn!(
            error = %e,
            status = response.status,
            "Response frame rejected, sending error instead"
        );
        let (status, body) = match e {
            IpcError::FrameTooLarge(_) => (502, RESPONSE_TOO_LARGE_BODY),
            _ => (500, "Failed to encode response"),
        };
        let fallback = IpcResponse::new(response.worker_id, status, body).with_error(&e);
        if let Err(e) = writer.send(&fallback).await {
            tracing::error!(error = %e, "Failed to write response frame");
            if !e.is_recoverable() {
                return Err(e);
            }
        }
    }
    Ok(())
}
