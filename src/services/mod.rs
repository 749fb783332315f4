//! Business logic services for the gateway.

pub mod account_store;
pub mod codex_restriction;
pub mod gateway_service;
pub mod upstream;

// Re-export commonly used types
pub use account_store::{AccountStore, StaticAccountStore};
pub use codex_restriction::{
    log_codex_cli_only_detection, CodexClientRestrictionDetectionResult,
    CodexClientRestrictionReason, CodexRestrictionDetector, OpenAICodexRestrictionDetector,
};
pub use gateway_service::{resolve_codex_detector, GatewayDecision, OpenAIGatewayService};
pub use upstream::{ForwardRequest, HttpDispatcher, UpstreamDispatcher};
