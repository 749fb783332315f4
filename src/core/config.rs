//! Configuration management for the gateway.
//!
//! Configuration is layered: built-in defaults, an optional config file
//! (YAML/TOML/JSON, format taken from the extension), `GATEWAY__*`
//! environment variables, and finally a few flat environment overrides
//! (`HOST`, `PORT`, `FORCE_CODEX_CLI`, `REQUEST_TIMEOUT_SECS`).

use crate::core::account::Account;
use anyhow::{Context, Result};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port)
    #[serde(default)]
    pub server: ServerConfig,

    /// Client restriction policy
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Upstream HTTP client settings
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Gateway API keys accepted from clients. Empty disables authentication.
    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,

    /// Upstream accounts available for dispatch
    #[serde(default)]
    pub accounts: Vec<Account>,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Gateway-wide client restriction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Treat every request on a restricted account as coming from the official CLI
    #[serde(default)]
    pub force_codex_cli: bool,

    /// User-Agent product identifiers of the official clients
    #[serde(default = "default_official_client_user_agents")]
    pub official_client_user_agents: Vec<String>,

    /// Response used when a non-official client is rejected
    #[serde(default)]
    pub restriction: RestrictionPolicyConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            force_codex_cli: false,
            official_client_user_agents: default_official_client_user_agents(),
            restriction: RestrictionPolicyConfig::default(),
        }
    }
}

/// Status, error type and message reported on a restriction rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictionPolicyConfig {
    #[serde(default = "default_restriction_status")]
    pub status_code: u16,

    #[serde(default = "default_restriction_error_type")]
    pub error_type: String,

    #[serde(default = "default_restriction_message")]
    pub message: String,
}

impl Default for RestrictionPolicyConfig {
    fn default() -> Self {
        Self {
            status_code: default_restriction_status(),
            error_type: default_restriction_error_type(),
            message: default_restriction_message(),
        }
    }
}

impl RestrictionPolicyConfig {
    /// Configured status code, falling back to 403 when it is not a valid HTTP status.
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code)
            .ok()
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::FORBIDDEN)
    }
}

/// Upstream HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Whether to verify SSL certificates for upstream requests
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,

    /// Whole-request timeout for non-streaming requests; time to response
    /// headers for streaming ones
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// TCP/TLS connect timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Longest gap between two chunks of a streaming response
    #[serde(default = "default_stream_idle_timeout")]
    pub stream_idle_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            verify_ssl: default_verify_ssl(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            stream_idle_timeout_secs: default_stream_idle_timeout(),
        }
    }
}

/// A gateway API key accepted from clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyConfig {
    /// Numeric id used for log attribution
    pub id: i64,

    /// Human-readable name for the key
    pub name: String,

    /// SHA-256 hex digest of the key
    pub key_hash: String,

    /// Whether this key is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    18000
}

fn default_verify_ssl() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    300
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_stream_idle_timeout() -> u64 {
    300
}

fn default_official_client_user_agents() -> Vec<String> {
    vec!["codex_cli_rs".to_string(), "codex_vscode".to_string()]
}

fn default_restriction_status() -> u16 {
    403
}

fn default_restriction_error_type() -> String {
    crate::core::error_types::ERROR_TYPE_FORBIDDEN.to_string()
}

fn default_restriction_message() -> String {
    "This account only allows Codex official clients".to_string()
}

impl AppConfig {
    /// Load configuration from an optional file plus the environment.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use codex_gateway::core::config::AppConfig;
    ///
    /// let config = AppConfig::load(Some("gateway.yaml")).expect("Failed to load config");
    /// ```
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(Path::new(path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("GATEWAY")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: AppConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .with_context(|| match path {
                Some(path) => format!("Failed to load config file: {}", path),
                None => "Failed to load config from environment".to_string(),
            })?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Flat environment variables take precedence over everything else.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }

        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(force) = std::env::var("FORCE_CODEX_CLI") {
            self.gateway.force_codex_cli = str_to_bool(&force);
        }

        if let Ok(timeout_str) = std::env::var("REQUEST_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                self.upstream.request_timeout_secs = timeout;
            }
        }
    }
}

/// Convert string to boolean.
///
/// Accepts: "true", "1", "yes", "on" (case-insensitive)
fn str_to_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::{AccountType, Platform};
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for var in [
            "HOST",
            "PORT",
            "FORCE_CODEX_CLI",
            "REQUEST_TIMEOUT_SECS",
            "GATEWAY__GATEWAY__FORCE_CODEX_CLI",
            "GATEWAY__SERVER__PORT",
        ] {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut temp_file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_str_to_bool() {
        assert!(str_to_bool("true"));
        assert!(str_to_bool("TRUE"));
        assert!(str_to_bool("1"));
        assert!(str_to_bool("yes"));
        assert!(str_to_bool(" on "));
        assert!(!str_to_bool("false"));
        assert!(!str_to_bool("0"));
        assert!(!str_to_bool(""));
        assert!(!str_to_bool("invalid"));
    }

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 18000);
        assert!(!config.gateway.force_codex_cli);
        assert_eq!(
            config.gateway.official_client_user_agents,
            vec!["codex_cli_rs", "codex_vscode"]
        );
        assert_eq!(config.gateway.restriction.status(), StatusCode::FORBIDDEN);
        assert_eq!(config.gateway.restriction.error_type, "forbidden_error");
        assert!(config.upstream.verify_ssl);
        assert_eq!(config.upstream.request_timeout_secs, 300);
        assert_eq!(config.upstream.connect_timeout_secs, 10);
        assert_eq!(config.upstream.stream_idle_timeout_secs, 300);
        assert!(config.api_keys.is_empty());
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn test_restriction_status_fallback() {
        let mut policy = RestrictionPolicyConfig::default();

        policy.status_code = 502;
        assert_eq!(policy.status(), StatusCode::BAD_GATEWAY);

        policy.status_code = 200;
        assert_eq!(policy.status(), StatusCode::FORBIDDEN);

        policy.status_code = 42;
        assert_eq!(policy.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    #[serial]
    fn test_load_config_from_file() {
        clear_env();

        let temp_file = write_config(
            r#"
server:
  host: 127.0.0.1
  port: 8080
gateway:
  force_codex_cli: true
  restriction:
    status_code: 502
    error_type: upstream_error
api_keys:
  - id: 3
    name: team
    key_hash: abc
accounts:
  - id: 1001
    name: codex-oauth
    platform: openai
    type: oauth
    credentials:
      base_url: http://localhost:9000/v1
      token: tok
    extra:
      codex_cli_only: true
"#,
        );

        let config = AppConfig::load(temp_file.path().to_str()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert!(config.gateway.force_codex_cli);
        assert_eq!(config.gateway.restriction.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(config.gateway.restriction.error_type, "upstream_error");
        assert_eq!(
            config.gateway.restriction.message,
            "This account only allows Codex official clients"
        );
        assert_eq!(config.api_keys.len(), 1);
        assert!(config.api_keys[0].enabled);
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.accounts[0].platform, Platform::OpenAI);
        assert_eq!(config.accounts[0].account_type, AccountType::OAuth);
        assert!(config.accounts[0].is_codex_cli_only_enabled());
    }

    #[test]
    #[serial]
    fn test_load_without_file_uses_defaults() {
        clear_env();

        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.server.port, 18000);
        assert!(!config.gateway.force_codex_cli);
    }

    #[test]
    #[serial]
    fn test_load_config_missing_file() {
        clear_env();

        let result = AppConfig::load(Some("nonexistent_file.yaml"));
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_load_config_invalid_yaml() {
        clear_env();

        let temp_file = write_config("server: [unclosed");
        let result = AppConfig::load(temp_file.path().to_str());
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        clear_env();
        unsafe {
            std::env::set_var("HOST", "192.168.1.1");
            std::env::set_var("PORT", "9999");
            std::env::set_var("FORCE_CODEX_CLI", "yes");
            std::env::set_var("REQUEST_TIMEOUT_SECS", "30");
        }

        let temp_file = write_config(
            r#"
server:
  host: 127.0.0.1
  port: 8080
gateway:
  force_codex_cli: false
"#,
        );

        let config = AppConfig::load(temp_file.path().to_str()).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 9999);
        assert!(config.gateway.force_codex_cli);
        assert_eq!(config.upstream.request_timeout_secs, 30);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_prefixed_env_source() {
        clear_env();
        unsafe {
            std::env::set_var("GATEWAY__GATEWAY__FORCE_CODEX_CLI", "true");
            std::env::set_var("GATEWAY__SERVER__PORT", "7000");
        }

        let config = AppConfig::load(None).unwrap();
        assert!(config.gateway.force_codex_cli);
        assert_eq!(config.server.port, 7000);

        clear_env();
    }
}
