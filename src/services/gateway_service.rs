//! OpenAI gateway orchestration.
//!
//! Every request goes through one decision before anything is sent upstream:
//! resolve the restriction detector, detect, log, then either reject with the
//! configured restriction error or hand the request to the dispatcher.

use crate::api::error_emitter::emit_error;
use crate::api::writer::{BufferedWriter, ResponseWriter};
use crate::core::account::Account;
use crate::core::config::{AppConfig, GatewayConfig};
use crate::core::context::get_api_key_id_from_context;
use crate::services::codex_restriction::{
    log_codex_cli_only_detection, CodexClientRestrictionDetectionResult, CodexRestrictionDetector,
    OpenAICodexRestrictionDetector,
};
use crate::services::upstream::{ForwardRequest, UpstreamDispatcher};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// Outcome of the dispatch decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayDecision {
    Dispatch,
    Reject(CodexClientRestrictionDetectionResult),
}

/// Orchestrates restriction detection and upstream dispatch for OpenAI accounts.
pub struct OpenAIGatewayService {
    config: Arc<AppConfig>,
    dispatcher: Arc<dyn UpstreamDispatcher>,
    codex_detector: Option<Arc<dyn CodexRestrictionDetector>>,
    default_detector: Arc<dyn CodexRestrictionDetector>,
}

impl OpenAIGatewayService {
    pub fn new(config: Arc<AppConfig>, dispatcher: Arc<dyn UpstreamDispatcher>) -> Self {
        let default_detector: Arc<dyn CodexRestrictionDetector> =
            Arc::new(OpenAICodexRestrictionDetector::new(&config.gateway));
        Self {
            config,
            dispatcher,
            codex_detector: None,
            default_detector,
        }
    }

    /// Replace the config-driven detector with `detector`.
    pub fn with_codex_detector(mut self, detector: Arc<dyn CodexRestrictionDetector>) -> Self {
        self.codex_detector = Some(detector);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn codex_detector(&self) -> Arc<dyn CodexRestrictionDetector> {
        resolve_codex_detector(Some(self))
    }

    /// Detect and log. Never touches the transport.
    pub fn decide(&self, parts: &Parts, account: &Account) -> GatewayDecision {
        let api_key_id = get_api_key_id_from_context(Some(&parts.extensions));
        let result = self.codex_detector().detect(Some(parts), Some(account));

        log_codex_cli_only_detection(Some(parts), Some(account), api_key_id, &result);

        if result.is_rejected() {
            GatewayDecision::Reject(result)
        } else {
            GatewayDecision::Dispatch
        }
    }

    /// Report a restriction rejection on `writer`.
    pub fn reject(&self, writer: &mut dyn ResponseWriter, stream_started: bool) {
        let policy = &self.config.gateway.restriction;
        emit_error(
            writer,
            policy.status(),
            &policy.error_type,
            &policy.message,
            stream_started,
        );
    }

    /// Decide, then reject or dispatch.
    ///
    /// The decision runs before the upstream request is issued, so a
    /// rejection always goes out as a complete JSON response.
    pub async fn forward(
        &self,
        parts: &Parts,
        account: &Account,
        request: ForwardRequest,
    ) -> Response {
        match self.decide(parts, account) {
            GatewayDecision::Reject(_) => {
                let mut writer = BufferedWriter::new();
                self.reject(&mut writer, false);
                writer.into_response()
            }
            GatewayDecision::Dispatch => self
                .dispatcher
                .dispatch(account, request)
                .await
                .unwrap_or_else(IntoResponse::into_response),
        }
    }
}

/// The injected detector when there is one, otherwise the config-driven default.
///
/// An absent service yields a detector bound to the default configuration.
pub fn resolve_codex_detector(
    service: Option<&OpenAIGatewayService>,
) -> Arc<dyn CodexRestrictionDetector> {
    match service {
        Some(svc) => match &svc.codex_detector {
            Some(detector) => Arc::clone(detector),
            None => Arc::clone(&svc.default_detector),
        },
        None => Arc::new(OpenAICodexRestrictionDetector::new(
            &GatewayConfig::default(),
        )),
    }
}
