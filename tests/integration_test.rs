//! Integration tests for the gateway router.
//!
//! These tests drive the full middleware stack with `oneshot` and a recording
//! dispatcher in place of the upstream:
//! - Client restriction on `codex_cli_only` accounts
//! - Authentication
//! - Request validation
//! - Request id propagation

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use codex_gateway::{
    api::{auth::hash_key, build_router, AppState},
    core::{
        account::{Account, AccountCredentials, AccountType, Platform},
        config::ApiKeyConfig,
        init_metrics, AppConfig, Result,
    },
    services::{
        CodexClientRestrictionDetectionResult, CodexClientRestrictionReason,
        CodexRestrictionDetector, ForwardRequest, OpenAIGatewayService, UpstreamDispatcher,
    },
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

#[derive(Default)]
struct RecordingDispatcher {
    requests: Mutex<Vec<(i64, &'static str, bool)>>,
}

impl RecordingDispatcher {
    fn calls(&self) -> Vec<(i64, &'static str, bool)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamDispatcher for RecordingDispatcher {
    async fn dispatch(&self, account: &Account, request: ForwardRequest) -> Result<Response> {
        self.requests
            .lock()
            .unwrap()
            .push((account.id, request.upstream_path, request.stream));
        Ok(axum::Json(json!({"id": "resp_1", "object": "response"})).into_response())
    }
}

struct FixedDetector(CodexClientRestrictionDetectionResult);

impl CodexRestrictionDetector for FixedDetector {
    fn detect(
        &self,
        _ctx: Option<&axum::http::request::Parts>,
        _account: Option<&Account>,
    ) -> CodexClientRestrictionDetectionResult {
        self.0
    }
}

fn openai_account(id: i64, account_type: AccountType, codex_cli_only: bool) -> Account {
    Account {
        id,
        name: format!("openai-{}", id),
        platform: Platform::OpenAI,
        account_type,
        credentials: AccountCredentials {
            base_url: None,
            token: "upstream-token".to_string(),
        },
        extra: serde_json::from_value(json!({ "codex_cli_only": codex_cli_only })).unwrap(),
    }
}

fn create_test_config(account: Account) -> AppConfig {
    AppConfig {
        accounts: vec![account],
        ..AppConfig::default()
    }
}

fn create_test_app(config: AppConfig, dispatcher: Arc<RecordingDispatcher>) -> Router {
    init_metrics();
    build_router(Arc::new(AppState::new(config, dispatcher)))
}

fn post(uri: &str, user_agent: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("user-agent", user_agent)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_restricted_account_rejects_non_official_client() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let app = create_test_app(
        create_test_config(openai_account(1, AccountType::OAuth, true)),
        dispatcher.clone(),
    );

    let response = app
        .oneshot(post(
            "/v1/responses",
            "curl/8.0",
            json!({"model": "gpt-5-codex", "stream": true}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert_eq!(
        body_json(response).await,
        json!({"error": {
            "type": "forbidden_error",
            "message": "This account only allows Codex official clients"
        }})
    );
    assert!(dispatcher.calls().is_empty());
}

#[tokio::test]
async fn test_restricted_account_allows_official_clients() {
    for user_agent in ["codex_cli_rs/0.38.0 (Mac OS 14.5.0; arm64)", "codex_vscode/0.1.2"] {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let app = create_test_app(
            create_test_config(openai_account(1, AccountType::OAuth, true)),
            dispatcher.clone(),
        );

        let response = app
            .oneshot(post(
                "/v1/responses",
                user_agent,
                json!({"model": "gpt-5-codex", "stream": true}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "user agent {}", user_agent);
        assert_eq!(dispatcher.calls(), vec![(1, "/responses", true)]);
    }
}

#[tokio::test]
async fn test_unrestricted_accounts_allow_any_client() {
    for account in [
        openai_account(2, AccountType::OAuth, false),
        openai_account(3, AccountType::ApiKey, true),
    ] {
        let id = account.id;
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let app = create_test_app(create_test_config(account), dispatcher.clone());

        let response = app
            .oneshot(post(
                "/v1/chat/completions",
                "curl/8.0",
                json!({"model": "gpt-4o"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(dispatcher.calls(), vec![(id, "/chat/completions", false)]);
    }
}

#[tokio::test]
async fn test_force_codex_cli_allows_any_client() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let mut config = create_test_config(openai_account(1, AccountType::OAuth, true));
    config.gateway.force_codex_cli = true;
    let app = create_test_app(config, dispatcher.clone());

    let response = app
        .oneshot(post("/responses", "curl/8.0", json!({"model": "gpt-5-codex"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(dispatcher.calls().len(), 1);
}

#[tokio::test]
async fn test_injected_detector_overrides_config() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let config = create_test_config(openai_account(1, AccountType::OAuth, true));
    let gateway = OpenAIGatewayService::new(Arc::new(config.clone()), dispatcher.clone())
        .with_codex_detector(Arc::new(FixedDetector(
            CodexClientRestrictionDetectionResult::new(
                true,
                CodexClientRestrictionReason::MatchedUserAgent,
            ),
        )));
    init_metrics();
    let app = build_router(Arc::new(
        AppState::new(config, dispatcher.clone()).with_gateway(gateway),
    ));

    let response = app
        .oneshot(post("/v1/responses", "curl/8.0", json!({"model": "gpt-5-codex"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(dispatcher.calls().len(), 1);
}

#[tokio::test]
async fn test_invalid_json_body() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let app = create_test_app(
        create_test_config(openai_account(1, AccountType::OAuth, true)),
        dispatcher.clone(),
    );

    let request = Request::builder()
        .method("POST")
        .uri("/v1/responses")
        .header("user-agent", "codex_cli_rs/0.38.0")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert!(dispatcher.calls().is_empty());
}

#[tokio::test]
async fn test_no_openai_account() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let mut account = openai_account(1, AccountType::OAuth, false);
    account.platform = Platform::Anthropic;
    let app = create_test_app(create_test_config(account), dispatcher.clone());

    let response = app
        .oneshot(post("/v1/responses", "codex_cli_rs/0.38.0", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"]["type"], "api_error");
}

#[tokio::test]
async fn test_authentication() {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let mut config = create_test_config(openai_account(1, AccountType::OAuth, false));
    config.api_keys = vec![ApiKeyConfig {
        id: 42,
        name: "team".to_string(),
        key_hash: hash_key("sk-gateway"),
        enabled: true,
    }];
    let app = create_test_app(config, dispatcher.clone());

    let response = app
        .clone()
        .oneshot(post("/v1/responses", "codex_cli_rs/0.38.0", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({"error": {"type": "authentication_error", "message": "Invalid API key"}})
    );

    let mut request = post("/v1/responses", "codex_cli_rs/0.38.0", json!({}));
    request
        .headers_mut()
        .insert("authorization", "Bearer sk-gateway".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(dispatcher.calls().len(), 1);
}

#[tokio::test]
async fn test_health_and_request_id() {
    let app = create_test_app(AppConfig::default(), Arc::new(RecordingDispatcher::default()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "health-check-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "health-check-1"
    );
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_metrics_endpoint_reports_decisions() {
    let app = create_test_app(
        create_test_config(openai_account(1, AccountType::OAuth, true)),
        Arc::new(RecordingDispatcher::default()),
    );

    app.clone()
        .oneshot(post("/v1/responses", "curl/8.0", json!({})))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("codex_gateway_restriction_decisions_total"));
    assert!(text.contains("official_client_user_agent_not_matched"));
}
