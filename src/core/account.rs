//! Upstream account and API key identity models.
//!
//! Accounts are owned by the account store; request handling only reads them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Extra attribute enabling the "official Codex clients only" restriction.
pub const EXTRA_CODEX_CLI_ONLY: &str = "codex_cli_only";

/// Base URL used when an OpenAI account does not configure one.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Upstream platform an account belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[serde(alias = "OpenAI")]
    OpenAI,
    Anthropic,
    Gemini,
}

impl Platform {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the account authenticates against its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[serde(alias = "api_key")]
    ApiKey,
    #[serde(alias = "OAuth")]
    OAuth,
}

impl AccountType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "apikey",
            Self::OAuth => "oauth",
        }
    }
}

/// Secrets and endpoint used to reach the upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountCredentials {
    /// Upstream API base, e.g. `https://api.openai.com/v1`
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token (API key or OAuth access token)
    #[serde(default)]
    pub token: String,
}

/// One upstream credential/identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,

    #[serde(default)]
    pub name: String,

    pub platform: Platform,

    #[serde(rename = "type")]
    pub account_type: AccountType,

    #[serde(default)]
    pub credentials: AccountCredentials,

    /// Free-form per-account feature flags
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

impl Account {
    /// The client restriction policy is only defined for OpenAI OAuth accounts.
    pub fn restriction_applicable(&self) -> bool {
        self.platform == Platform::OpenAI && self.account_type == AccountType::OAuth
    }

    /// Whether `extra["codex_cli_only"]` is set to `true` on an account the policy applies to.
    pub fn is_codex_cli_only_enabled(&self) -> bool {
        self.restriction_applicable()
            && self
                .extra
                .get(EXTRA_CODEX_CLI_ONLY)
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }

    pub fn base_url(&self) -> &str {
        self.credentials
            .base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_OPENAI_BASE_URL)
    }
}

/// Identity of the calling credential, attached by the auth layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Zero means unknown
    pub id: i64,
    #[serde(default)]
    pub name: String,
}
