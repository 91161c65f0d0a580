//! Authentication API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{json_body, TestApp, TestUser};

/// Test user registration with valid data
#[tokio::test]
async fn test_register_with_valid_data() {
    let app = TestApp::new().await;
    let user = TestUser::generate();

    let response = app.post_json("/api/auth/register", &user.registration()).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], user.email.as_str());
    assert_eq!(body["user"]["username"], user.username.as_str());
}

/// Test registration fails with invalid email
#[tokio::test]
async fn test_register_with_invalid_email_fails() {
    let app = TestApp::new().await;
    let mut user = TestUser::generate();
    user.email = "not-an-email".into();

    let response = app.post_json("/api/auth/register", &user.registration()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["errors"][0]["field"], "email");
}

/// Test registration fails with short password
#[tokio::test]
async fn test_register_with_short_password_fails() {
    let app = TestApp::new().await;
    let mut user = TestUser::generate();
    user.password = "short".into();

    let response = app.post_json("/api/auth/register", &user.registration()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Registering an existing email is rejected and creates no second user
#[tokio::test]
async fn test_register_duplicate_email_fails() {
    let app = TestApp::new().await;
    let user = TestUser::generate();
    let (token, _) = app.register(&user).await;

    let mut again = TestUser::generate();
    again.email = user.email.clone();
    let response = app.post_json("/api/auth/register", &again.registration()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let users = json_body(app.get_auth("/api/users", &token).await).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
}

/// Login returns a token and never the password
#[tokio::test]
async fn test_login_with_valid_credentials() {
    let app = TestApp::new().await;
    let user = TestUser::generate();
    app.register(&user).await;

    let response = app.post_json("/api/auth/login", &user.credentials()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["token"].is_string());
    let returned = body["user"].as_object().unwrap();
    assert!(!returned.contains_key("password"));
    assert!(!returned.contains_key("password_hash"));
    assert!(!returned.contains_key("reset_token"));
}

#[tokio::test]
async fn test_login_with_wrong_password_fails() {
    let app = TestApp::new().await;
    let user = TestUser::generate();
    app.register(&user).await;

    let response = app
        .post_json(
            "/api/auth/login",
            &json!({ "email": user.email, "password": "WrongPassword123!" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_with_unknown_email_fails() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/api/auth/login", &TestUser::generate().credentials())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_succeeds_without_token() {
    let app = TestApp::new().await;

    let response = app.post_json("/api/auth/logout", &json!({})).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await["message"].is_string());
}

#[tokio::test]
async fn test_extend_token_requires_authentication() {
    let app = TestApp::new().await;

    let response = app.post_json("/api/auth/extend-token", &json!({})).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_extend_token_issues_working_token() {
    let app = TestApp::new().await;
    let user = TestUser::generate();
    let (token, _) = app.register(&user).await;

    let response = app
        .post_json_auth("/api/auth/extend-token", &json!({}), &token)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["user"]["email"], user.email.as_str());
    let fresh = body["token"].as_str().unwrap();
    assert_eq!(app.get_auth("/api/users", fresh).await.status(), StatusCode::OK);
}

/// Forgot/reset flow: the token works once and the new password logs in
#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::new().await;
    let user = TestUser::generate();
    app.register(&user).await;

    let response = app
        .post_json("/api/auth/forgot-password", &json!({ "email": user.email }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let reset_token = json_body(response).await["reset_token"]
        .as_str()
        .unwrap()
        .to_string();

    let reset = json!({ "token": reset_token, "password": "BrandNewPassword1!" });
    let response = app.post_json("/api/auth/reset-password", &reset).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_json(
            "/api/auth/login",
            &json!({ "email": user.email, "password": "BrandNewPassword1!" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let old = app.post_json("/api/auth/login", &user.credentials()).await;
    assert_eq!(old.status(), StatusCode::BAD_REQUEST);

    let reused = app.post_json("/api/auth/reset-password", &reset).await;
    assert_eq!(reused.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forgot_password_for_unknown_email_looks_successful() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/api/auth/forgot-password",
            &json!({ "email": "nobody@example.com" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["message"].is_string());
    assert!(body.get("reset_token").is_none());
}

#[tokio::test]
async fn test_forgot_password_hides_token_in_production() {
    let app = TestApp::with_settings(|s| s.environment = "production".into()).await;
    let user = TestUser::generate();
    app.register(&user).await;

    let response = app
        .post_json("/api/auth/forgot-password", &json!({ "email": user.email }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await.get("reset_token").is_none());
}

/// An access token cannot be used to reset a password
#[tokio::test]
async fn test_access_token_is_not_a_reset_token() {
    let app = TestApp::new().await;
    let (token, _) = app.register(&TestUser::generate()).await;

    let response = app
        .post_json(
            "/api/auth/reset-password",
            &json!({ "token": token, "password": "BrandNewPassword1!" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// A reset token cannot authenticate API requests
#[tokio::test]
async fn test_reset_token_is_not_an_access_token() {
    let app = TestApp::new().await;
    let user = TestUser::generate();
    app.register(&user).await;

    let body = json_body(
        app.post_json("/api/auth/forgot-password", &json!({ "email": user.email }))
            .await,
    )
    .await;
    let reset_token = body["reset_token"].as_str().unwrap();

    let response = app.get_auth("/api/users", reset_token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_error_details_hidden_in_production() {
    let app = TestApp::with_settings(|s| s.environment = "production".into()).await;
    let user = TestUser::generate();
    app.register(&user).await;

    let response = app
        .post_json(
            "/api/auth/login",
            &json!({ "email": user.email, "password": "WrongPassword123!" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Invalid credentials");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_error_details_shown_outside_production() {
    let app = TestApp::new().await;

    let response = app
        .post_json("/api/auth/login", &TestUser::generate().credentials())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["details"], "Bad request: Invalid credentials");
}
