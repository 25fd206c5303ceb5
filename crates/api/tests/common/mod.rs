//! Shared helpers for HTTP-level integration tests.
//!
//! The app under test is the production router over a fresh `MemoryStore`,
//! so each test starts from an empty service graph.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use subhub_core::clock::SystemClock;
use subhub_db::MemoryStore;
use subhub_events::{EventBus, JobQueue};
use subhub_pipeline::{PipelineConfig, ServiceContext, Services};
use tower::ServiceExt;

use subhub_api::auth::jwt::JwtConfig;
use subhub_api::config::ServerConfig;
use subhub_api::router::build_app_router;
use subhub_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: None,
        sync_credit_text: None,
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the full application router over an empty in-memory store.
///
/// Jobs are enqueued but never run; the receiver is dropped with the test.
pub fn build_test_app() -> Router {
    let config = test_config();
    let event_bus = Arc::new(EventBus::new(256));
    let (job_queue, _jobs) = JobQueue::channel();
    let ctx = ServiceContext::new(
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock),
        Arc::clone(&event_bus),
        job_queue,
        PipelineConfig::default(),
    );

    let state = AppState {
        services: Services::new(ctx, Vec::new()),
        config: Arc::new(config.clone()),
        event_bus,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

/// Send a GET request with a Bearer token.
pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

/// Send a POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, json: Value) -> Response {
    send(app, Method::POST, uri, None, Some(json)).await
}

/// Send a POST request with a JSON body and a Bearer token.
pub async fn post_json_auth(app: Router, uri: &str, json: Value, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), Some(json)).await
}

/// Send a PUT request with a JSON body and a Bearer token.
pub async fn put_json_auth(app: Router, uri: &str, json: Value, token: &str) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(json)).await
}

/// Send a DELETE request with a Bearer token.
pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Register `username` and return its access token and user id.
pub async fn sign_up(app: Router, username: &str) -> (String, i64) {
    let response = post_json(app, "/api/v1/users", serde_json::json!({ "username": username })).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let token = json["data"]["access_token"].as_str().unwrap().to_string();
    let id = json["data"]["user"]["id"].as_i64().unwrap();
    (token, id)
}

/// Create a video at `url` and return its id.
pub async fn create_video(app: Router, token: &str, url: &str) -> String {
    let response = post_json_auth(
        app,
        "/api/v1/videos",
        serde_json::json!({ "url": url, "title": "Lecture" }),
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    json["data"]["id"].as_str().unwrap().to_string()
}
