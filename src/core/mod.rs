//! Core functionality for the gateway.
//!
//! This module contains fundamental components used throughout the application:
//! - Account and API key models
//! - Configuration management
//! - Error handling
//! - Request context and logging
//! - Metrics collection
//! - HTTP middleware

pub mod account;
pub mod config;
pub mod context;
pub mod error;
pub mod error_types;
pub mod logging;
pub mod metrics;
pub mod middleware;

// Re-export commonly used types
pub use account::{Account, ApiKey, Platform};
pub use config::{AppConfig, GatewayConfig};
pub use context::{get_api_key_id_from_context, AuthenticatedKey};
pub use error::{AppError, Result};
pub use metrics::{get_metrics, init_metrics, Metrics};
pub use middleware::{request_id_middleware, MetricsMiddleware};
