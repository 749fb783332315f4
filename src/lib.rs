//! Codex Gateway - an OpenAI-compatible API gateway
//!
//! The gateway forwards OpenAI-style requests to upstream accounts. Accounts
//! flagged `codex_cli_only` accept traffic only from the official Codex
//! clients; everything else is rejected before it reaches the upstream.
//!
//! # Architecture
//!
//! - [`core`]: accounts, config, errors, request context, metrics, middleware
//! - [`api`]: HTTP handlers, authentication, response writers and error emission
//! - [`services`]: restriction detection, gateway orchestration, upstream dispatch
//!
//! # Configuration
//!
//! Optional environment variables:
//! - `CONFIG_PATH`: YAML/TOML/JSON config file
//! - `GATEWAY__*`: any config key, e.g. `GATEWAY__GATEWAY__FORCE_CODEX_CLI=true`
//! - `HOST`: Server bind address (default: 0.0.0.0)
//! - `PORT`: Server port (default: 18000)
//! - `FORCE_CODEX_CLI`: Treat restricted-account traffic as official (default: false)
//! - `REQUEST_TIMEOUT_SECS`: Upstream request timeout in seconds (default: 300)

pub mod api;
pub mod core;
pub mod services;

// Re-export commonly used types for convenience
pub use api::{build_router, AppState};
pub use core::{AppConfig, AppError, Result};
pub use services::{resolve_codex_detector, OpenAIGatewayService};
