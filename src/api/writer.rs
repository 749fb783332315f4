//! Response transports used by the gateway.
//!
//! A [`ResponseWriter`] is either buffered (nothing has been sent yet, one
//! complete response will be produced) or an open SSE stream whose status line
//! and headers already went out to the client.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use std::io;
use tokio::sync::mpsc;

/// Item type carried by the SSE body channel.
pub type StreamItem = Result<Bytes, io::Error>;

/// Minimal write side of an HTTP response.
pub trait ResponseWriter: Send {
    /// Set status line and content type. No effect once the head is committed.
    fn write_head(&mut self, status: StatusCode, content_type: &'static str);

    /// Write body bytes to the transport.
    fn write_body(&mut self, chunk: Bytes) -> io::Result<()>;

    /// Whether status and headers can no longer change.
    fn is_committed(&self) -> bool;
}

/// Collects a single complete response.
#[derive(Debug)]
pub struct BufferedWriter {
    status: StatusCode,
    content_type: Option<&'static str>,
    body: BytesMut,
    committed: bool,
}

impl BufferedWriter {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            content_type: None,
            body: BytesMut::new(),
            committed: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The collected body, without status or headers.
    pub fn into_body(self) -> Bytes {
        self.body.freeze()
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body.freeze()));
        *response.status_mut() = self.status;
        if let Some(content_type) = self.content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        response
    }
}

impl Default for BufferedWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter for BufferedWriter {
    fn write_head(&mut self, status: StatusCode, content_type: &'static str) {
        if self.committed {
            tracing::debug!(
                status = status.as_u16(),
                "Response head already committed, status ignored"
            );
            return;
        }
        self.status = status;
        self.content_type = Some(content_type);
        self.committed = true;
    }

    fn write_body(&mut self, chunk: Bytes) -> io::Result<()> {
        self.committed = true;
        self.body.extend_from_slice(&chunk);
        Ok(())
    }

    fn is_committed(&self) -> bool {
        self.committed
    }
}

/// Frames an [`SseWriter`] may queue ahead of the client.
pub const SSE_CHANNEL_CAPACITY: usize = 64;

/// `200 text/event-stream` response around `body`.
pub fn sse_response(body: Body) -> Response {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

/// Write side of an open `text/event-stream` response.
///
/// The channel is bounded: once [`SSE_CHANNEL_CAPACITY`] frames are waiting
/// for the client, further writes fail with `WouldBlock` instead of queueing.
/// Dropping the writer (or calling [`SseWriter::close`]) ends the stream.
#[derive(Debug)]
pub struct SseWriter {
    tx: Option<mpsc::Sender<StreamItem>>,
}

impl SseWriter {
    /// Open a stream. The returned response is already committed as `200 text/event-stream`.
    pub fn open() -> (Self, Response) {
        let (tx, mut rx) = mpsc::channel::<StreamItem>(SSE_CHANNEL_CAPACITY);

        let stream = async_stream::stream! {
            while let Some(item) = rx.recv().await {
                yield item;
            }
        };

        (Self { tx: Some(tx) }, sse_response(Body::from_stream(stream)))
    }

    /// Terminate the stream.
    pub fn close(&mut self) {
        self.tx.take();
    }

    /// True when the client side is gone or the stream was closed.
    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().map_or(true, |tx| tx.is_closed())
    }
}

impl ResponseWriter for SseWriter {
    fn write_head(&mut self, status: StatusCode, _content_type: &'static str) {
        tracing::debug!(
            status = status.as_u16(),
            "Streaming response already committed, status ignored"
        );
    }

    fn write_body(&mut self, chunk: Bytes) -> io::Result<()> {
        match &self.tx {
            Some(tx) => tx.try_send(Ok(chunk)).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    io::Error::new(io::ErrorKind::WouldBlock, "client is not reading the stream")
                }
                mpsc::error::TrySendError::Closed(_) => {
                    io::Error::new(io::ErrorKind::BrokenPipe, "client stream closed")
                }
            }),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stream already closed",
            )),
        }
    }

    fn is_committed(&self) -> bool {
        true
    }
}
