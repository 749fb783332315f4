//! Upstream dispatch.
//!
//! Requests that passed the restriction decision are forwarded to the
//! account's upstream. Streaming responses are relayed chunk by chunk, paced
//! by the client; a transport failure after the first byte is reported inside
//! the stream.

use crate::api::error_emitter::emit_error;
use crate::api::writer::{sse_response, BufferedWriter};
use crate::core::account::Account;
use crate::core::config::UpstreamConfig;
use crate::core::error_types::ERROR_TYPE_UPSTREAM;
use crate::core::logging::get_request_id;
use crate::core::{AppError, Result};
use anyhow::Context;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::io;
use std::time::Duration;

/// Message sent to the client when the upstream stream breaks mid-response.
pub const STREAM_INTERRUPTED_MESSAGE: &str = "Upstream stream interrupted";

/// An allowed request on its way upstream.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    /// Path appended to the account base URL, e.g. `/responses`
    pub upstream_path: &'static str,
    /// Raw client body, forwarded untouched
    pub body: Bytes,
    /// Client asked for an SSE response
    pub stream: bool,
}

/// Forwards allowed requests to an upstream account.
#[async_trait]
pub trait UpstreamDispatcher: Send + Sync {
    async fn dispatch(&self, account: &Account, request: ForwardRequest) -> Result<Response>;
}

/// reqwest-backed dispatcher.
///
/// The client carries no overall timeout. Non-streaming requests get one per
/// request; streaming requests are bounded by time-to-headers and by the gap
/// between chunks, so long healthy streams are never cut.
#[derive(Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    request_timeout: Duration,
    stream_idle_timeout: Duration,
}

impl HttpDispatcher {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_ssl)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_max_idle_per_host(100)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            stream_idle_timeout: Duration::from_secs(config.stream_idle_timeout_secs),
        })
    }
}

/// Map a transport error to a client-facing error without leaking upstream URLs.
fn classify_upstream_error(error: &reqwest::Error) -> AppError {
    if error.is_timeout() {
        AppError::Timeout
    } else if error.is_connect() {
        AppError::Upstream("Failed to connect to upstream provider".to_string())
    } else {
        AppError::Upstream("Upstream request failed".to_string())
    }
}

fn relay(status: StatusCode, content_type: Option<HeaderValue>, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        content_type.unwrap_or_else(|| HeaderValue::from_static("application/json")),
    );
    response
}

/// The SSE error event reported when the upstream stream breaks.
fn interrupted_frame() -> Bytes {
    let mut frame = BufferedWriter::new();
    emit_error(
        &mut frame,
        StatusCode::BAD_GATEWAY,
        ERROR_TYPE_UPSTREAM,
        STREAM_INTERRUPTED_MESSAGE,
        true,
    );
    frame.into_body()
}

/// Logs a client disconnect when the relay is dropped before it finished.
struct RelayGuard {
    request_id: String,
    account_id: i64,
    completed: bool,
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        if !self.completed {
            tracing::debug!(
                request_id = %self.request_id,
                account_id = self.account_id,
                "Client disconnect detected - stream cancelled"
            );
        }
    }
}

/// Relay upstream chunks as they are polled by the client body.
///
/// A transport error, or no chunk within `idle_timeout`, ends the stream with
/// one SSE error event. Dropping the stream drops the upstream connection.
pub fn relay_stream<S, E>(
    upstream: S,
    idle_timeout: Duration,
    request_id: String,
    account_id: i64,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        let mut guard = RelayGuard {
            request_id,
            account_id,
            completed: false,
        };
        let mut upstream = Box::pin(upstream);

        loop {
            match tokio::time::timeout(idle_timeout, upstream.next()).await {
                Ok(Some(Ok(bytes))) => yield Ok(bytes),
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    tracing::warn!(
                        request_id = %guard.request_id,
                        account_id = guard.account_id,
                        error = %e,
                        "Upstream stream failed after response started"
                    );
                    yield Ok(interrupted_frame());
                    break;
                }
                Err(_) => {
                    tracing::warn!(
                        request_id = %guard.request_id,
                        account_id = guard.account_id,
                        idle_timeout_secs = idle_timeout.as_secs(),
                        "Upstream stream idle timeout"
                    );
                    yield Ok(interrupted_frame());
                    break;
                }
            }
        }
        guard.completed = true;
    }
}

#[async_trait]
impl UpstreamDispatcher for HttpDispatcher {
    async fn dispatch(&self, account: &Account, request: ForwardRequest) -> Result<Response> {
        let url = format!("{}{}", account.base_url(), request.upstream_path);
        let accept = if request.stream {
            "text/event-stream"
        } else {
            "application/json"
        };

        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&account.credentials.token)
            .header("Content-Type", "application/json")
            .header("Accept", accept)
            .body(request.body);
        if !request.stream {
            builder = builder.timeout(self.request_timeout);
        }

        let sent = tokio::time::timeout(self.request_timeout, builder.send())
            .await
            .map_err(|_| {
                tracing::error!(
                    request_id = %get_request_id(),
                    account_id = account.id,
                    url = %url,
                    timeout_secs = self.request_timeout.as_secs(),
                    "Upstream did not send response headers in time"
                );
                AppError::Timeout
            })?;

        let response = sent.map_err(|e| {
            tracing::error!(
                request_id = %get_request_id(),
                account_id = account.id,
                url = %url,
                error = %e,
                is_timeout = e.is_timeout(),
                is_connect = e.is_connect(),
                "HTTP request failed to upstream"
            );
            classify_upstream_error(&e)
        })?;

        let status =
            StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| HeaderValue::from_str(v).ok());

        tracing::debug!(
            request_id = %get_request_id(),
            account_id = account.id,
            url = %url,
            status = status.as_u16(),
            stream = request.stream,
            "Upstream responded"
        );

        if !status.is_success() || !request.stream {
            let body = response.bytes().await.map_err(|e| {
                tracing::warn!(account_id = account.id, error = %e, "Failed to read upstream body");
                classify_upstream_error(&e)
            })?;
            if !status.is_success() {
                tracing::warn!(
                    request_id = %get_request_id(),
                    account_id = account.id,
                    status = status.as_u16(),
                    "Upstream returned error status"
                );
            }
            return Ok(relay(status, content_type, body));
        }

        let body = relay_stream(
            response.bytes_stream(),
            self.stream_idle_timeout,
            get_request_id(),
            account.id,
        );
        Ok(sse_response(Body::from_stream(body)))
    }
}
