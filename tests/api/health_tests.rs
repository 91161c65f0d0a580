//! Health Check and Documentation API Tests

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use pretty_assertions::assert_eq;

use crate::common::{json_body, TestApp};

/// Test basic health check endpoint returns 200 OK
#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new().await;

    let response = app.get("/").await;

    assert_eq!(response.status(), StatusCode::OK);
}

/// Memory backend is healthy and Redis reports as not configured
#[tokio::test]
async fn test_health_check_reports_services() {
    let app = TestApp::new().await;

    let body = json_body(app.get("/").await).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["checks"]["database"]["status"], "healthy");
    assert_eq!(body["checks"]["redis"]["status"], "disabled");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::new().await;

    let response = app.get("/docs/openapi.json").await;

    assert_eq!(response.status(), StatusCode::OK);
    let doc = json_body(response).await;
    assert!(doc["paths"]["/api/auth/login"].is_object());
    assert!(doc["paths"]["/api/files/{id}"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer"].is_object());
}

#[tokio::test]
async fn test_api_responses_carry_rate_limit_headers() {
    let app = TestApp::new().await;

    let response = app.post_json("/api/auth/logout", &serde_json::json!({})).await;

    assert_eq!(response.headers()["x-ratelimit-limit"], "1000");
    assert!(response.headers().contains_key("x-ratelimit-remaining"));
}

#[tokio::test]
async fn test_rate_limit_exceeded_returns_429() {
    let app = TestApp::with_settings(|s| s.rate_limit.requests_per_window = 2).await;

    for _ in 0..2 {
        let response = app.get("/api/users").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    let response = app.get("/api/users").await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/users")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
