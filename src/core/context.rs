//! Typed accessors for per-request values.
//!
//! The auth layer attaches the calling key as an [`AuthenticatedKey`] request
//! extension. Readers here never fail: anything missing or unexpected yields
//! the zero value.

use crate::core::account::ApiKey;
use axum::http::{header, request::Parts, Extensions};
use std::sync::Arc;

/// Request extension carrying the authenticated gateway key, if any.
#[derive(Debug, Clone, Default)]
pub struct AuthenticatedKey(pub Option<Arc<ApiKey>>);

impl AuthenticatedKey {
    pub fn new(key: ApiKey) -> Self {
        Self(Some(Arc::new(key)))
    }
}

/// The authenticated key attached to the request, if present.
pub fn get_api_key_from_context(ctx: Option<&Extensions>) -> Option<Arc<ApiKey>> {
    ctx?.get::<AuthenticatedKey>()?.0.clone()
}

/// Id of the authenticated key, `0` when unknown.
pub fn get_api_key_id_from_context(ctx: Option<&Extensions>) -> i64 {
    ctx.and_then(|ext| ext.get::<AuthenticatedKey>())
        .and_then(|key| key.0.as_deref())
        .map(|key| key.id)
        .unwrap_or(0)
}

/// `User-Agent` of the request; empty when absent or not valid UTF-8.
pub fn user_agent(ctx: Option<&Parts>) -> &str {
    ctx.and_then(|parts| parts.headers.get(header::USER_AGENT))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
