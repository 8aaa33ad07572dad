//! Newline-delimited JSON framing over a byte stream.
//!
//! # Responsibilities
//! - Encode one message as one JSON line
//! - Decode lines back into messages, bounded by a maximum frame size
//! - Tell callers whether a failure poisoned the stream or only one frame
//!
//! # Design Decisions
//! - No length prefix: `serde_json` never emits a raw newline, so `\n` is
//!   an unambiguous terminator
//! - A frame that fails to parse as JSON, or is over the size limit, is
//!   reported but leaves the stream usable; I/O errors and end-of-stream do not
//! - Writers refuse frames the reader would reject, so nothing oversized
//!   ever reaches the pipe

use std::pin::Pin;

use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, FramedRead, FramedWrite, LinesCodec, LinesCodecError};

/// Type-erased read half, so process pipes and in-memory pipes share one transport.
pub type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;
/// Type-erased write half.
pub type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// The peer closed its end of the stream.
    #[error("stream closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One frame was over the limit. It was dropped whole, so the stream stays aligned.
    #[error("frame exceeds {0} bytes")]
    FrameTooLarge(usize),

    /// One frame was not valid JSON for the expected message.
    #[error("malformed frame: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}

impl IpcError {
    /// Whether the stream can still carry further frames after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IpcError::FrameTooLarge(_) | IpcError::Decode(_) | IpcError::Encode(_)
        )
    }
}

enum Line {
    Frame(String),
    Oversized,
}

/// `LinesCodec` that reports an oversized line as an item instead of an error.
///
/// `FramedRead` ends the stream after any decoder error, while `LinesCodec`
/// itself skips to the next newline and carries on.
struct BoundedLines(LinesCodec);

impl Decoder for BoundedLines {
    type Item = Line;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Line>, LinesCodecError> {
        match self.0.decode(buf) {
            Ok(line) => Ok(line.map(Line::Frame)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Line::Oversized)),
            Err(e) => Err(e),
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Line>, LinesCodecError> {
        match self.0.decode_eof(buf) {
            Ok(line) => Ok(line.map(Line::Frame)),
            Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Line::Oversized)),
            Err(e) => Err(e),
        }
    }
}

/// Reads JSON frames from a byte stream.
pub struct FrameReader<R> {
    inner: FramedRead<R, BoundedLines>,
    max_frame_bytes: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, max_frame_bytes: usize) -> Self {
        let codec = BoundedLines(LinesCodec::new_with_max_length(max_frame_bytes));
        Self {
            inner: FramedRead::new(reader, codec),
            max_frame_bytes,
        }
    }

    /// Read and decode the next frame.
    ///
    /// Returns `None` at end-of-stream.
    pub async fn next_frame<T: DeserializeOwned>(&mut self) -> Option<Result<T, IpcError>> {
        let line = match self.inner.next().await? {
            Ok(Line::Frame(line)) => line,
            Ok(Line::Oversized) => return Some(Err(IpcError::FrameTooLarge(self.max_frame_bytes))),
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                return Some(Err(IpcError::FrameTooLarge(self.max_frame_bytes)))
            }
            Err(LinesCodecError::Io(e)) => return Some(Err(IpcError::Io(e))),
        };
        Some(serde_json::from_str(&line).map_err(IpcError::Decode))
    }
}

/// Writes JSON frames to a byte stream, one line per message.
pub struct FrameWriter<W> {
    inner: FramedWrite<W, LinesCodec>,
    max_frame_bytes: usize,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W, max_frame_bytes: usize) -> Self {
        Self {
            inner: FramedWrite::new(writer, LinesCodec::new()),
            max_frame_bytes,
        }
    }

    /// Encode and flush one frame.
    ///
    /// A frame the peer would reject as too large is not written at all.
    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<(), IpcError> {
        let line = serde_json::to_string(message).map_err(IpcError::Encode)?;
        if line.len() > self.max_frame_bytes {
            return Err(IpcError::FrameTooLarge(self.max_frame_bytes));
        }
        self.inner.send(line).await.map_err(|e| match e {
            LinesCodecError::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe => IpcError::Closed,
            LinesCodecError::Io(e) => IpcError::Io(e),
            LinesCodecError::MaxLineLengthExceeded => IpcError::FrameTooLarge(self.max_frame_bytes),
        })
    }
}

/// The master's end of one worker's pipe pair.
pub struct Transport {
    writer: FrameWriter<BoxedWriter>,
    reader: FrameReader<BoxedReader>,
}

impl Transport {
    /// Wrap a pair of streams: `writer` feeds the worker, `reader` drains it.
    pub fn new<R, W>(reader: R, writer: W, max_frame_bytes: usize) -> Self
    where
        R: AsyncRead + Send + 'static,
        W: AsyncWrite + Send + 'static,
    {
        Self {
            writer: FrameWriter::new(Box::pin(writer), max_frame_bytes),
            reader: FrameReader::new(Box::pin(reader), max_frame_bytes),
        }
    }

    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<(), IpcError> {
        self.writer.send(message).await
    }

    /// Read exactly one frame. End-of-stream is reported as [`IpcError::Closed`].
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<T, IpcError> {
        self.reader.next_frame().await.unwrap_or(Err(IpcError::Closed))
    }
}
