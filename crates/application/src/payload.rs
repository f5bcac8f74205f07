//! Payload carrier shared by the dispatcher and destination plugins.
//!
//! A payload is either a fully materialized buffer or a pull-based stream of
//! chunks. Streams are consumed incrementally, so a destination that writes
//! slowly also slows down how fast the source is drained.

use std::fmt::{Debug, Formatter};
use std::pin::Pin;
use std::task::{Context, Poll};

use actionhub_core::{AppError, AppResult};
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use sync_wrapper::SyncWrapper;

mod pipe;

pub use pipe::PayloadPipe;

/// Default chunk size used when a buffered payload is replayed as a stream.
pub const DEFAULT_CHUNK_BYTES: usize = 64 * 1024;

/// Stream of payload chunks handed to streaming-capable destinations.
///
/// The boxed source is only reachable through `&mut self`, so the stream is
/// `Sync` and requests carrying it can be borrowed across awaits.
pub struct PayloadStream {
    inner: SyncWrapper<BoxStream<'static, AppResult<Bytes>>>,
    forwarder: Option<pipe::ForwarderGuard>,
}

impl PayloadStream {
    /// Wraps an arbitrary chunk stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = AppResult<Bytes>> + Send + 'static,
    {
        Self {
            inner: SyncWrapper::new(stream.boxed()),
            forwarder: None,
        }
    }

    /// Replays a buffer as zero-copy chunks of at most `chunk_size` bytes.
    #[must_use]
    pub fn from_bytes(bytes: Bytes, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let chunks = stream::unfold(bytes, move |mut remaining| async move {
            if remaining.is_empty() {
                return None;
            }

            let chunk = remaining.split_to(chunk_size.min(remaining.len()));
            Some((Ok(chunk), remaining))
        });

        Self::new(chunks)
    }

    fn with_forwarder(
        inner: BoxStream<'static, AppResult<Bytes>>,
        forwarder: pipe::ForwarderGuard,
    ) -> Self {
        Self {
            inner: SyncWrapper::new(inner),
            forwarder: Some(forwarder),
        }
    }

    /// Drains the stream into one buffer, failing once `limit` bytes are exceeded.
    pub async fn collect_bytes(mut self, limit: usize) -> AppResult<Bytes> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.next().await {
            let chunk = chunk?;
            if buffer.len().saturating_add(chunk.len()) > limit {
                return Err(AppError::PayloadTooLarge(format!(
                    "payload exceeds the {limit} byte buffering limit"
                )));
            }
            buffer.extend_from_slice(&chunk);
        }

        Ok(buffer.freeze())
    }
}

impl Stream for PayloadStream {
    type Item = AppResult<Bytes>;

    fn poll_next(self: Pin<&mut Self>, context: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.get_mut().poll_next_unpin(context)
    }
}

impl Debug for PayloadStream {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PayloadStream")
            .field("forwarded", &self.forwarder.is_some())
            .finish()
    }
}

/// Payload contents, either materialized or streamed.
pub enum PayloadBody {
    /// Entire payload held in memory.
    Buffered(Bytes),
    /// Payload read incrementally from the caller.
    Streaming(PayloadStream),
}

impl PayloadBody {
    /// Returns whether the payload is a live stream.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming(_))
    }

    /// Returns the byte length of a buffered payload.
    #[must_use]
    pub fn buffered_len(&self) -> Option<usize> {
        match self {
            Self::Buffered(bytes) => Some(bytes.len()),
            Self::Streaming(_) => None,
        }
    }

    /// Materializes the payload, enforcing `limit`.
    pub async fn into_bytes(self, limit: usize) -> AppResult<Bytes> {
        match self {
            Self::Buffered(bytes) if bytes.len() > limit => Err(AppError::PayloadTooLarge(
                format!("payload exceeds the {limit} byte buffering limit"),
            )),
            Self::Buffered(bytes) => Ok(bytes),
            Self::Streaming(stream) => stream.collect_bytes(limit).await,
        }
    }

    /// Converts the payload into a chunk stream.
    #[must_use]
    pub fn into_stream(self, chunk_size: usize) -> PayloadStream {
        match self {
            Self::Buffered(bytes) => PayloadStream::from_bytes(bytes, chunk_size),
            Self::Streaming(stream) => stream,
        }
    }
}

impl Debug for PayloadBody {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered(bytes) => formatter
                .debug_tuple("Buffered")
                .field(&format_args!("{} bytes", bytes.len()))
                .finish(),
            Self::Streaming(stream) => formatter.debug_tuple("Streaming").field(stream).finish(),
        }
    }
}

/// Data delivered alongside an action request.
#[derive(Debug)]
pub struct Attachment {
    /// Declared mime type of the payload.
    pub mime_type: Option<String>,
    /// Suggested file name for file-like destinations.
    pub filename: Option<String>,
    /// Payload contents.
    pub body: PayloadBody,
}

impl Attachment {
    /// Creates an attachment from an in-memory buffer.
    #[must_use]
    pub fn buffered(bytes: impl Into<Bytes>) -> Self {
        Self {
            mime_type: None,
            filename: None,
            body: PayloadBody::Buffered(bytes.into()),
        }
    }

    /// Creates an attachment from a chunk stream.
    #[must_use]
    pub fn streaming(stream: PayloadStream) -> Self {
        Self {
            mime_type: None,
            filename: None,
            body: PayloadBody::Streaming(stream),
        }
    }

    /// Sets the declared mime type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Sets the suggested file name.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Returns the declared mime type or `application/octet-stream`.
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or("application/octet-stream")
    }
}
