//! Error types and handling for the gateway.
//!
//! This module provides a unified error type [`AppError`] whose HTTP rendering
//! goes through the same error envelope as every other error the gateway emits.

use crate::api::error_emitter::emit_error;
use crate::api::writer::BufferedWriter;
use crate::core::error_types::{
    ERROR_TYPE_API, ERROR_TYPE_AUTHENTICATION, ERROR_TYPE_INVALID_REQUEST, ERROR_TYPE_SERVER,
    ERROR_TYPE_TIMEOUT, ERROR_TYPE_UPSTREAM,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (file not found, parse errors, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing or unknown gateway API key
    #[error("Unauthorized")]
    Unauthorized,

    /// Client provided invalid data
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No upstream account can serve the request
    #[error("No available accounts")]
    NoAvailableAccount,

    /// Upstream request could not be completed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Upstream request timed out
    #[error("Gateway timeout")]
    Timeout,

    /// Generic internal server errors with custom message
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status, error type and client-facing message.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Config(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ERROR_TYPE_SERVER,
                e.to_string(),
            ),
            AppError::Serialization(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ERROR_TYPE_SERVER,
                e.to_string(),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ERROR_TYPE_AUTHENTICATION,
                "Invalid API key".to_string(),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ERROR_TYPE_INVALID_REQUEST,
                msg.clone(),
            ),
            AppError::NoAvailableAccount => (
                StatusCode::SERVICE_UNAVAILABLE,
                ERROR_TYPE_API,
                "No available accounts".to_string(),
            ),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, ERROR_TYPE_UPSTREAM, msg.clone()),
            AppError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                ERROR_TYPE_TIMEOUT,
                "Upstream request timed out".to_string(),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ERROR_TYPE_SERVER,
                msg.clone(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let mut writer = BufferedWriter::new();
        emit_error(&mut writer, status, error_type, &message, false);
        writer.into_response()
    }
}

/// Convenience type alias for Results using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
