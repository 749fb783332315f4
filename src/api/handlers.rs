//! HTTP request handlers for the gateway.
//!
//! The OpenAI-compatible endpoints only look at the request body long enough
//! to learn whether the client wants a stream; the body itself is forwarded
//! untouched.

use crate::core::account::Platform;
use crate::core::config::AppConfig;
use crate::core::logging::get_request_id;
use crate::core::{AppError, Result};
use crate::services::account_store::{AccountStore, StaticAccountStore};
use crate::services::gateway_service::OpenAIGatewayService;
use crate::services::upstream::{ForwardRequest, UpstreamDispatcher};
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use prometheus::{Encoder, TextEncoder};
use serde_json::Value;
use std::sync::Arc;

/// Largest request body accepted from clients.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<OpenAIGatewayService>,
    pub accounts: Arc<dyn AccountStore>,
}

impl AppState {
    /// Wire the gateway and the configured accounts around `dispatcher`.
    pub fn new(config: AppConfig, dispatcher: Arc<dyn UpstreamDispatcher>) -> Self {
        let config = Arc::new(config);
        let accounts = StaticAccountStore::new(config.accounts.clone());
        accounts.log_accounts();

        Self {
            gateway: Arc::new(OpenAIGatewayService::new(config.clone(), dispatcher)),
            accounts: Arc::new(accounts),
            config,
        }
    }

    /// Replace the gateway service, e.g. one carrying an injected detector.
    pub fn with_gateway(mut self, gateway: OpenAIGatewayService) -> Self {
        self.gateway = Arc::new(gateway);
        self
    }
}

/// Read the `stream` flag from a JSON request body.
///
/// Anything other than a JSON object is rejected; a missing or non-boolean
/// `stream` counts as a non-streaming request.
pub fn parse_stream_flag(body: &[u8]) -> Result<bool> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| AppError::BadRequest("Request body must be a JSON object".to_string()))?;

    Ok(object
        .get("stream")
        .and_then(Value::as_bool)
        .unwrap_or(false))
}

async fn proxy_openai(
    state: &AppState,
    request: Request,
    upstream_path: &'static str,
) -> Result<Response> {
    let (parts, body) = request.into_parts();
    let body: Bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {}", e)))?;

    let stream = parse_stream_flag(&body)?;

    let account = state.accounts.select(Platform::OpenAI).ok_or_else(|| {
        tracing::warn!(
            request_id = %get_request_id(),
            path = %parts.uri.path(),
            "No OpenAI account available"
        );
        AppError::NoAvailableAccount
    })?;

    tracing::debug!(
        request_id = %get_request_id(),
        account_id = account.id,
        upstream_path,
        stream,
        "Forwarding request"
    );

    let request = ForwardRequest {
        upstream_path,
        body,
        stream,
    };
    Ok(state.gateway.forward(&parts, &account, request).await)
}

/// `POST /v1/responses`
pub async fn responses(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response> {
    proxy_openai(&state, request, "/responses").await
}

/// `POST /v1/chat/completions`
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response> {
    proxy_openai(&state, request, "/chat/completions").await
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

/// Prometheus metrics endpoint.
pub async fn metrics_handler() -> Result<Response> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(buffer.into())
        .map_err(|e| AppError::Internal(e.to_string()))
}
