//! Client authentication.
//!
//! Accepts both `Authorization: Bearer` and `x-api-key` headers. Keys are
//! compared by SHA-256 digest; the matched key is attached to the request as
//! an [`AuthenticatedKey`] extension for downstream attribution.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::api::handlers::AppState;
use crate::core::account::ApiKey;
use crate::core::config::ApiKeyConfig;
use crate::core::context::AuthenticatedKey;
use crate::core::error::Result;
use crate::core::logging::get_request_id;
use crate::core::AppError;

/// Hash an API key using SHA-256.
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extract the client key. `x-api-key` takes priority over the bearer token.
fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| extract_bearer(headers))
}

/// Extract Bearer token from Authorization header.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}

/// Verify the request key against the configured keys.
///
/// * `Ok(Some(key))` - a configured key matched
/// * `Ok(None)` - no keys are configured, authentication is off
/// * `Err(AppError::Unauthorized)` - keys are configured and none matched
pub fn verify_api_key(headers: &HeaderMap, keys: &[ApiKeyConfig]) -> Result<Option<ApiKey>> {
    if keys.is_empty() {
        return Ok(None);
    }

    let provided_key = extract_api_key(headers).ok_or(AppError::Unauthorized)?;
    let provided_hash = hash_key(provided_key);

    keys.iter()
        .find(|k| k.enabled && k.key_hash.eq_ignore_ascii_case(&provided_hash))
        .map(|k| {
            tracing::debug!(api_key_id = k.id, api_key_name = %k.name, "API key authenticated");
            Some(ApiKey {
                id: k.id,
                name: k.name.clone(),
            })
        })
        .ok_or_else(|| {
            tracing::warn!(request_id = %get_request_id(), "Authentication failed: unknown API key");
            AppError::Unauthorized
        })
}

/// Authenticate the request and attach the matched key to its extensions.
pub async fn api_key_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match verify_api_key(request.headers(), &state.config.api_keys) {
        Ok(Some(key)) => {
            request.extensions_mut().insert(AuthenticatedKey::new(key));
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}
