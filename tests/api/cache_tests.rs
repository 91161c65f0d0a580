//! Response Cache API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common::{json_body, TestApp, TestUser};
use crud_api::config::CacheBackend;

async fn cached_app() -> TestApp {
    TestApp::with_settings(|s| {
        s.cache.enabled = true;
        s.cache.backend = CacheBackend::Memory;
    })
    .await
}

#[tokio::test]
async fn test_user_listing_miss_then_hit() {
    let app = cached_app().await;
    let token = app.token().await;

    let first = app.get_auth("/api/users", &token).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()["x-cache"], "MISS");
    let first = json_body(first).await;

    let second = app.get_auth("/api/users", &token).await;
    assert_eq!(second.headers()["x-cache"], "HIT");
    assert_eq!(json_body(second).await, first);
}

#[tokio::test]
async fn test_creating_user_invalidates_listing() {
    let app = cached_app().await;
    let token = app.token().await;
    app.get_auth("/api/users", &token).await;

    let response = app
        .post_json_auth("/api/users", &TestUser::generate().registration(), &token)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let listing = app.get_auth("/api/users", &token).await;
    assert_eq!(listing.headers()["x-cache"], "MISS");
    assert_eq!(json_body(listing).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_registration_invalidates_listing() {
    let app = cached_app().await;
    let token = app.token().await;
    app.get_auth("/api/users", &token).await;

    app.register(&TestUser::generate()).await;

    let listing = json_body(app.get_auth("/api/users", &token).await).await;
    assert_eq!(listing.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unauthenticated_reads_are_not_cached() {
    let app = cached_app().await;

    let response = app.get("/api/users").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(!response.headers().contains_key("x-cache"));
}

#[tokio::test]
async fn test_in_process_cache_reported_in_health() {
    let app = cached_app().await;

    let body = json_body(app.get("/").await).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["redis"]["status"], "disabled");
}
