//! Streaming-aware error emission.
//!
//! Before anything was sent, an error is a normal JSON response with its own
//! status code. Once a stream is open the status line is gone, so the error is
//! injected into the stream as an SSE `error` event instead.

use crate::api::writer::ResponseWriter;
use crate::core::metrics::get_metrics;
use axum::http::StatusCode;
use bytes::Bytes;
use serde::Serialize;

/// Fallback when the envelope cannot be serialized.
const FALLBACK_ERROR_JSON: &str =
    r#"{"error":{"type":"server_error","message":"failed to encode error"}}"#;

/// `{"error":{"type":..,"message":..}}`
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope<'a> {
    pub error: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail<'a> {
    #[serde(rename = "type")]
    pub error_type: &'a str,
    pub message: &'a str,
}

/// Compact JSON encoding of the error envelope.
pub fn encode_error_body(error_type: &str, message: &str) -> String {
    let envelope = ErrorEnvelope {
        error: ErrorDetail {
            error_type,
            message,
        },
    };
    serde_json::to_string(&envelope).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode error envelope");
        FALLBACK_ERROR_JSON.to_string()
    })
}

/// SSE frame: `event: error\ndata: <json>\n\n`.
///
/// Compact JSON never contains a raw newline, so the frame is always exactly
/// two lines followed by the blank terminator line.
pub fn format_sse_error_event(error_type: &str, message: &str) -> String {
    format!(
        "event: error\ndata: {}\n\n",
        encode_error_body(error_type, message)
    )
}

/// Emit an error on `writer`, choosing the wire format from `stream_started`.
///
/// Write failures are dropped: the connection is presumed gone.
pub fn emit_error(
    writer: &mut dyn ResponseWriter,
    status: StatusCode,
    error_type: &str,
    message: &str,
    stream_started: bool,
) {
    let result = if stream_started {
        get_metrics()
            .stream_errors
            .with_label_values(&[error_type])
            .inc();
        writer.write_body(Bytes::from(format_sse_error_event(error_type, message)))
    } else {
        writer.write_head(status, "application/json");
        writer.write_body(Bytes::from(encode_error_body(error_type, message)))
    };

    if let Err(e) = result {
        tracing::debug!(
            error = %e,
            status = status.as_u16(),
            error_type = %error_type,
            stream_started,
            "Failed to write error response, client likely disconnected"
        );
    }
}
