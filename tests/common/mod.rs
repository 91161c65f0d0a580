//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::Response,
    Router,
};
use axum_test::{TestResponse, TestServer};
use fake::{faker::name::en::Name, Fake};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crud_api::config::Settings;
use crud_api::startup::{build_router, AppState};

pub use axum_test::multipart::{MultipartForm, Part};

/// Test application backed by the in-memory repositories and a temporary
/// uploads directory. JSON requests go through `oneshot`, multipart forms
/// through an `axum-test` server over the same router.
pub struct TestApp {
    pub router: Router,
    pub server: TestServer,
    pub state: AppState,
    pub uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(|_| {}).await
    }

    /// Build the app after adjusting the default test settings
    pub async fn with_settings(configure: impl FnOnce(&mut Settings)) -> Self {
        let uploads = tempfile::tempdir().expect("create uploads dir");
        let mut settings = Settings::in_memory(uploads.path());
        configure(&mut settings);

        let state = AppState::build(settings).await.expect("build app state");
        let router = build_router(state.clone());
        let server = TestServer::new(router.clone()).expect("build test server");

        Self {
            router,
            server,
            state,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Make a GET request to the application
    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None, None).await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: &Value) -> Response {
        self.request(Method::POST, uri, Some(body), None).await
    }

    /// Make an authenticated GET request
    pub async fn get_auth(&self, uri: &str, token: &str) -> Response {
        self.request(Method::GET, uri, None, Some(token)).await
    }

    /// Make an authenticated DELETE request
    pub async fn delete_auth(&self, uri: &str, token: &str) -> Response {
        self.request(Method::DELETE, uri, None, Some(token)).await
    }

    /// Make an authenticated POST request with JSON body
    pub async fn post_json_auth(&self, uri: &str, body: &Value, token: &str) -> Response {
        self.request(Method::POST, uri, Some(body), Some(token)).await
    }

    /// Make an authenticated PATCH request with JSON body
    pub async fn patch_json_auth(&self, uri: &str, body: &Value, token: &str) -> Response {
        self.request(Method::PATCH, uri, Some(body), Some(token)).await
    }

    /// Send an authenticated multipart form
    pub async fn multipart_auth(
        &self,
        method: Method,
        uri: &str,
        form: MultipartForm,
        token: &str,
    ) -> TestResponse {
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token)).unwrap();
        self.server
            .method(method, uri)
            .add_header(header::AUTHORIZATION, bearer)
            .multipart(form)
            .await
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    /// Register a fresh user and return its access token and the user object
    pub async fn register(&self, user: &TestUser) -> (String, Value) {
        let response = self.post_json("/api/auth/register", &user.registration()).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json_body(response).await;
        let token = body["token"].as_str().unwrap().to_string();
        (token, body["user"].clone())
    }

    /// Register a throwaway user and return its token
    pub async fn token(&self) -> String {
        self.register(&TestUser::generate()).await.0
    }
}

/// Test user credentials for auth tests
#[derive(Debug, Clone)]
pub struct TestUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl TestUser {
    pub fn generate() -> Self {
        Self {
            name: Name().fake(),
            username: unique_username(),
            email: unique_email(),
            password: "TestPassword123!".to_string(),
        }
    }

    pub fn registration(&self) -> Value {
        json!({
            "name": self.name,
            "username": self.username,
            "email": self.email,
            "password": self.password,
        })
    }

    pub fn credentials(&self) -> Value {
        json!({ "email": self.email, "password": self.password })
    }
}

/// Generate a unique test email
pub fn unique_email() -> String {
    format!("test_{}@example.com", uuid::Uuid::new_v4().simple())
}

/// Generate a unique test username
pub fn unique_username() -> String {
    format!("user_{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

/// Read a response body as JSON
pub async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read a response body as text
pub async fn text_body(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A file part as a browser would send it
pub fn file_part(file_name: &str, content: &[u8]) -> Part {
    Part::bytes(content.to_vec())
        .file_name(file_name)
        .mime_type("application/octet-stream")
}
