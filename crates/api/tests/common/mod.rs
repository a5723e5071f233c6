#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use leadflow_api::auth::jwt::{generate_access_token, JwtConfig};
use leadflow_api::config::ServerConfig;
use leadflow_api::router::build_app_router;
use leadflow_api::state::AppState;
use leadflow_core::assignment::BulkFailurePolicy;
use leadflow_core::roles::Role;
use leadflow_core::types::DbId;
use leadflow_db::models::user::User;
use leadflow_db::store::InMemoryStore;
use leadflow_events::LeadEventBus;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a 30-second request timeout and a one-second store timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        store_timeout_secs: 1,
        bulk_policy: BulkFailurePolicy::ContinueOnError,
        database_max_connections: 5,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Application state over a fresh in-memory store.
pub fn test_state(store: &InMemoryStore, config: ServerConfig) -> AppState {
    AppState::new(
        Arc::new(store.clone()),
        Arc::new(config),
        Arc::new(LeadEventBus::default()),
    )
}

/// Build the full application router (same middleware stack as `main.rs`)
/// over an in-memory store. The returned store handle is used to seed data
/// and inspect committed state.
pub fn build_test_app() -> (Router, InMemoryStore) {
    let store = InMemoryStore::new();
    let config = test_config();
    let state = test_state(&store, config.clone());
    (build_app_router(state, &config), store)
}

/// Bearer token for `user`, signed with the test secret.
pub fn token_for(user: &User) -> String {
    let role: Role = user.role().expect("seeded users carry a valid role");
    token_for_id(user.id, role)
}

pub fn token_for_id(user_id: DbId, role: Role) -> String {
    generate_access_token(user_id, role, &test_config().jwt).expect("token generation")
}

/// Read the full response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    json: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(json)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    json: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(json)).await
}

pub async fn patch_json_auth(
    app: Router,
    uri: &str,
    json: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PATCH, uri, Some(token), Some(json)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}
