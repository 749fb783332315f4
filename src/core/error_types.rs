//! Shared constants for structured API errors.

use std::fmt;

pub const ERROR_TYPE_API: &str = "api_error";
pub const ERROR_TYPE_UPSTREAM: &str = "upstream_error";
pub const ERROR_TYPE_SERVER: &str = "server_error";
pub const ERROR_TYPE_TIMEOUT: &str = "timeout_error";
pub const ERROR_TYPE_INVALID_REQUEST: &str = "invalid_request_error";
pub const ERROR_TYPE_AUTHENTICATION: &str = "authentication_error";
pub const ERROR_TYPE_FORBIDDEN: &str = "forbidden_error";

pub const DECISION_OUTCOME_ALLOWED: &str = "allowed";
pub const DECISION_OUTCOME_REJECTED: &str = "rejected";

/// Terminal state of a request at the dispatch decision layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    Allowed,
    Rejected,
}

impl DecisionOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => DECISION_OUTCOME_ALLOWED,
            Self::Rejected => DECISION_OUTCOME_REJECTED,
        }
    }
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
