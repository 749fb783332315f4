//! Codex Gateway - Main entry point
//!
//! This binary loads configuration, initializes logging and metrics, and runs
//! the HTTP server.

use anyhow::Result;
use chrono::Local;
use codex_gateway::{
    api::{build_router, AppState},
    core::{init_metrics, AppConfig},
    services::HttpDispatcher,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Custom time formatter that uses local timezone (respects TZ environment variable)
struct LocalTime;

impl tracing_subscriber::fmt::time::FormatTime for LocalTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S"))
    }
}

fn init_tracing() {
    // NO_COLOR disables ANSI codes for file logging
    let no_color = std::env::var("NO_COLOR").is_ok();
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Noise filters are always appended so a bare RUST_LOG=trace stays readable
    let base_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,codex_gateway=debug".to_string());
    let filter = tracing_subscriber::EnvFilter::new(format!(
        "{},hyper=warn,hyper::proto=warn,h2=warn,reqwest=warn",
        base_filter
    ));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_timer(LocalTime))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_timer(LocalTime)
                    .with_ansi(!no_color),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before reading any environment variables)
    dotenvy::dotenv().ok();

    init_tracing();
    init_metrics();

    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = AppConfig::load(config_path.as_deref())?;

    tracing::info!(
        accounts = config.accounts.len(),
        api_keys = config.api_keys.len(),
        force_codex_cli = config.gateway.force_codex_cli,
        official_clients = ?config.gateway.official_client_user_agents,
        "Configuration loaded"
    );
    if config.api_keys.is_empty() {
        tracing::warn!("No API keys configured, client authentication is disabled");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let dispatcher = Arc::new(HttpDispatcher::new(&config.upstream)?);
    let state = Arc::new(AppState::new(config, dispatcher));
    let app = build_router(state);

    tracing::info!("Starting Codex Gateway on {}", addr);
    tracing::info!("OpenAI API: /v1/responses, /v1/chat/completions");
    tracing::info!("Metrics endpoint: /metrics");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
