//! Client restriction for "official Codex CLI only" accounts.
//!
//! A detector decides, per request and account, whether the restriction
//! applies and whether the calling client satisfies it. The detection logger
//! records every meaningful decision for audit.

use crate::core::account::Account;
use crate::core::config::GatewayConfig;
use crate::core::context::user_agent;
use crate::core::error_types::DecisionOutcome;
use crate::core::logging::get_request_id;
use crate::core::metrics::get_metrics;
use axum::http::request::Parts;
use std::fmt;

pub const LOG_MSG_ALLOWED: &str = "OpenAI codex_cli_only allowed official client request";
pub const LOG_MSG_REJECTED: &str = "OpenAI codex_cli_only rejected non-official client request";

/// Why a detection ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodexClientRestrictionReason {
    /// `gateway.force_codex_cli` is set
    ForceCodexCli,
    /// User-Agent carries an official client signature
    MatchedUserAgent,
    /// User-Agent does not carry an official client signature
    NotMatchedUserAgent,
}

impl CodexClientRestrictionReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ForceCodexCli => "force_codex_cli",
            Self::MatchedUserAgent => "official_client_user_agent_matched",
            Self::NotMatchedUserAgent => "official_client_user_agent_not_matched",
        }
    }
}

impl fmt::Display for CodexClientRestrictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verdict of one detection call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodexClientRestrictionDetectionResult {
    /// Whether the restriction applies to this request/account
    pub enabled: bool,
    /// Whether the client satisfied it
    pub matched: bool,
    /// `None` when the restriction is disabled
    pub reason: Option<CodexClientRestrictionReason>,
}

impl CodexClientRestrictionDetectionResult {
    pub const DISABLED: Self = Self {
        enabled: false,
        matched: false,
        reason: None,
    };

    pub const fn new(matched: bool, reason: CodexClientRestrictionReason) -> Self {
        Self {
            enabled: true,
            matched,
            reason: Some(reason),
        }
    }

    /// Restriction applies and the client failed it.
    pub fn is_rejected(&self) -> bool {
        self.enabled && !self.matched
    }

    pub fn reason_str(&self) -> &'static str {
        self.reason.map(|r| r.as_str()).unwrap_or("")
    }
}

/// Restriction policy source.
pub trait CodexRestrictionDetector: Send + Sync {
    fn detect(
        &self,
        ctx: Option<&Parts>,
        account: Option<&Account>,
    ) -> CodexClientRestrictionDetectionResult;
}

/// Config-driven detector for OpenAI OAuth accounts.
#[derive(Debug, Clone)]
pub struct OpenAICodexRestrictionDetector {
    force_codex_cli: bool,
    official_user_agents: Vec<String>,
}

impl OpenAICodexRestrictionDetector {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            force_codex_cli: config.force_codex_cli,
            official_user_agents: config
                .official_client_user_agents
                .iter()
                .map(|ua| ua.trim().to_string())
                .filter(|ua| !ua.is_empty())
                .collect(),
        }
    }

    /// Case-sensitive: the whole value, or a prefix followed by `/` or a space.
    pub fn is_official_client(&self, user_agent: &str) -> bool {
        self.official_user_agents.iter().any(|signature| {
            user_agent
                .strip_prefix(signature.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with(' '))
        })
    }
}

impl CodexRestrictionDetector for OpenAICodexRestrictionDetector {
    fn detect(
        &self,
        ctx: Option<&Parts>,
        account: Option<&Account>,
    ) -> CodexClientRestrictionDetectionResult {
        if account.is_some_and(|acc| !acc.restriction_applicable()) {
            return CodexClientRestrictionDetectionResult::DISABLED;
        }

        if self.force_codex_cli {
            return CodexClientRestrictionDetectionResult::new(
                true,
                CodexClientRestrictionReason::ForceCodexCli,
            );
        }

        if !account.is_some_and(Account::is_codex_cli_only_enabled) {
            return CodexClientRestrictionDetectionResult::DISABLED;
        }

        if self.is_official_client(user_agent(ctx)) {
            CodexClientRestrictionDetectionResult::new(
                true,
                CodexClientRestrictionReason::MatchedUserAgent,
            )
        } else {
            CodexClientRestrictionDetectionResult::new(
                false,
                CodexClientRestrictionReason::NotMatchedUserAgent,
            )
        }
    }
}

/// Record one detection outcome. Disabled results are not logged.
pub fn log_codex_cli_only_detection(
    ctx: Option<&Parts>,
    account: Option<&Account>,
    api_key_id: i64,
    result: &CodexClientRestrictionDetectionResult,
) {
    if !result.enabled {
        return;
    }

    let account_id = account
        .map(|acc| acc.id.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let account_name = account.map(|acc| acc.name.as_str()).unwrap_or("");
    let method = ctx.map(|parts| parts.method.as_str()).unwrap_or("");
    let path = ctx.map(|parts| parts.uri.path()).unwrap_or("");
    let ua = user_agent(ctx);
    let reason = result.reason_str();
    let request_id = get_request_id();

    let outcome = if result.matched {
        tracing::info!(
            request_id = %request_id,
            account_id = %account_id,
            account_name = %account_name,
            api_key_id,
            reason = %reason,
            method = %method,
            path = %path,
            user_agent = %ua,
            "{}",
            LOG_MSG_ALLOWED
        );
        DecisionOutcome::Allowed
    } else {
        tracing::warn!(
            request_id = %request_id,
            account_id = %account_id,
            account_name = %account_name,
            api_key_id,
            reason = %reason,
            method = %method,
            path = %path,
            user_agent = %ua,
            "{}",
            LOG_MSG_REJECTED
        );
        DecisionOutcome::Rejected
    };

    get_metrics()
        .restriction_decisions
        .with_label_values(&[reason, outcome.as_str()])
        .inc();
}
