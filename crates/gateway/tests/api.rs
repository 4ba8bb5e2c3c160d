//! End-to-end REST coverage, driven straight against the `Router` through
//! `tower::ServiceExt::oneshot` rather than a bound TCP listener — the same
//! style the teacher never had a `tests/` directory for, borrowed from how
//! axum's own examples drive a router without a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mcp_domain::config::Config;
use mcp_domain::principal::{ApiKey, KeyType};
use mcp_domain::tool_config::WebhookAuthType;
use mcp_executor::CircuitBreakerRegistry;
use mcp_gateway::state::AppState;
use mcp_session::SharedDeps;
use mcp_store::{InMemoryCache, InMemoryObjectStore, InMemoryStore, KeyResolver, RelationalStore};
use mcp_vault::Vault;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tower::ServiceExt;

const TENANT: &str = "tenant-a";

fn test_state() -> (AppState, String) {
    let relational = Arc::new(InMemoryStore::new());
    let objects = Arc::new(InMemoryObjectStore::new());
    let cache = Arc::new(InMemoryCache::new());
    let vault = Arc::new(Vault::new(b"integration-test-master-secret".to_vec(), 1));
    let breakers = Arc::new(CircuitBreakerRegistry::new(3, std::time::Duration::from_secs(30)));

    let raw_key = "test-key-123";
    let hashed = Sha256::digest(raw_key.as_bytes()).to_vec();
    relational
        .insert_api_key(ApiKey {
            id: "key-1".into(),
            tenant_id: TENANT.into(),
            key_type: KeyType::Agent,
            parent_key_id: None,
            allowed_services: vec![],
            is_active: true,
            hashed_secret: hashed,
        })
        .unwrap();

    let keys = Arc::new(KeyResolver::new(relational.clone()));
    let deps = SharedDeps {
        relational,
        objects,
        cache,
        vault,
        breakers,
    };
    let state = AppState {
        config: Arc::new(Config::default()),
        deps,
        keys,
    };
    (state, raw_key.to_owned())
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

#[tokio::test]
async fn health_and_version_are_public() {
    let (state, _) = test_state();
    let app = mcp_gateway::api::router(state.clone()).with_state(state);

    let resp = app
        .clone()
        .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "healthy");

    let resp = app
        .oneshot(Request::get("/api/v1/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_route_rejects_missing_credential() {
    let (state, _) = test_state();
    let app = mcp_gateway::api::router(state.clone()).with_state(state);

    let resp = app
        .oneshot(Request::get("/api/v1/tools").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_route_rejects_unknown_key() {
    let (state, _) = test_state();
    let app = mcp_gateway::api::router(state.clone()).with_state(state);

    let resp = app
        .oneshot(
            Request::get("/api/v1/tools")
                .header("authorization", "Bearer not-a-real-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn context_create_then_get_round_trips() {
    let (state, raw_key) = test_state();
    let app = mcp_gateway::api::router(state.clone()).with_state(state);
    let auth = format!("Bearer {raw_key}");

    let create_body = json!({ "agent_id": "agent-1", "model_id": "gpt-test" });
    let resp = app
        .clone()
        .oneshot(
            Request::post("/api/v1/contexts")
                .header("authorization", &auth)
                .header("content-type", "application/json")
                .body(Body::from(create_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created = body_json(resp).await;
    let id = created["id"].as_str().expect("created context has an id").to_owned();

    let resp = app
        .oneshot(
            Request::get(format!("/api/v1/contexts/{id}"))
                .header("authorization", &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched = body_json(resp).await;
    assert_eq!(fetched["id"], id);
    assert_eq!(fetched["agent_id"], "agent-1");
}

#[tokio::test]
async fn webhook_ingress_rejects_when_tool_missing() {
    let (state, _) = test_state();
    let app = mcp_gateway::api::router(state.clone()).with_state(state);

    let resp = app
        .oneshot(
            Request::post(format!("/webhooks/tools/{TENANT}/no-such-tool"))
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webhook_ingress_none_auth_accepts_and_dedupes() {
    use mcp_domain::tool_config::{AuthType, HealthStatus, ToolConfiguration, ToolStatus, WebhookConfig};

    let (state, _) = test_state();
    let tool = ToolConfiguration {
        id: "tool-1".into(),
        tenant_id: TENANT.into(),
        tool_name: "acme".into(),
        display_name: "Acme".into(),
        base_url: "https://acme.example".into(),
        config: json!({}),
        credentials_encrypted: Vec::new(),
        auth_type: AuthType::Custom,
        retry_policy: Default::default(),
        status: ToolStatus::Active,
        health_status: HealthStatus::Unknown,
        last_health_check: None,
        webhook_config: Some(WebhookConfig {
            enabled: true,
            auth_type: WebhookAuthType::None,
            secret_encrypted: None,
            dedup_window_secs: Some(300),
        }),
        passthrough_config: None,
        provider: None,
        actions: Default::default(),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    state.deps.relational.insert_tool_config(tool).unwrap();

    let app = mcp_gateway::api::router(state.clone()).with_state(state);
    let payload = json!({ "event": "ping" }).to_string();

    let resp = app
        .clone()
        .oneshot(
            Request::post(format!("/webhooks/tools/{TENANT}/tool-1"))
                .header("content-type", "application/json")
                .body(Body::from(payload.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let first = body_json(resp).await;
    assert_eq!(first["status"], "accepted");

    let resp = app
        .oneshot(
            Request::post(format!("/webhooks/tools/{TENANT}/tool-1"))
                .header("content-type", "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let second = body_json(resp).await;
    assert_eq!(second["status"], "ignored");
}
