//! File API Tests

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{file_part, json_body, text_body, MultipartForm, TestApp};

async fn upload(app: &TestApp, token: &str, form: MultipartForm) -> Value {
    let response = app
        .multipart_auth(Method::POST, "/api/files", form, token)
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json()
}

async fn update(app: &TestApp, token: &str, id: &Value, form: MultipartForm) -> Value {
    let response = app
        .multipart_auth(Method::PATCH, &format!("/api/files/{}", id), form, token)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    response.json()
}

fn report(content: &str) -> MultipartForm {
    MultipartForm::new()
        .add_part("file", file_part("report.txt", content.as_bytes()))
        .add_text("tags", "q3, finance")
}

#[tokio::test]
async fn test_files_require_authentication() {
    let app = TestApp::new().await;

    let response = app.get("/api/files").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Upload writes the bytes to disk and records the key in `path`
#[tokio::test]
async fn test_upload_stores_file_on_disk() {
    let app = TestApp::new().await;
    let token = app.token().await;

    let file = upload(&app, &token, report("quarterly numbers")).await;

    let path = file["path"].as_str().unwrap();
    assert!(path.ends_with("-report.txt"));
    assert_eq!(file["name"], "report.txt");
    assert_eq!(file["tags"], json!(["q3", "finance"]));
    assert_eq!(file["views"], 0);
    assert_eq!(file["url"], format!("/uploads/{}", path));
    assert!(file["user_id"].is_i64());

    let stored = std::fs::read_to_string(app.uploads.path().join(path)).unwrap();
    assert_eq!(stored, "quarterly numbers");
}

#[tokio::test]
async fn test_uploaded_file_is_served_statically() {
    let app = TestApp::new().await;
    let token = app.token().await;
    let file = upload(&app, &token, report("public bytes")).await;

    let response = app.get(file["url"].as_str().unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text_body(response).await, "public bytes");
}

#[tokio::test]
async fn test_upload_with_display_name() {
    let app = TestApp::new().await;
    let token = app.token().await;

    let form = MultipartForm::new()
        .add_part("file", file_part("scan 01.png", b"\x89PNG"))
        .add_text("name", "Passport scan");
    let file = upload(&app, &token, form).await;

    assert_eq!(file["name"], "Passport scan");
    assert!(file["path"].as_str().unwrap().ends_with("-scan_01.png"));
    assert_eq!(file["tags"], json!([]));
}

#[tokio::test]
async fn test_upload_without_file_part_fails() {
    let app = TestApp::new().await;
    let token = app.token().await;

    let form = MultipartForm::new().add_text("name", "nothing attached");
    let response = app
        .multipart_auth(Method::POST, "/api/files", form, &token)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let app = TestApp::with_settings(|s| s.uploads.max_bytes = 1024).await;
    let token = app.token().await;

    let form = MultipartForm::new().add_part("file", file_part("big.bin", &[7u8; 4096]));
    let response = app
        .multipart_auth(Method::POST, "/api/files", form, &token)
        .await;

    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_get_file_counts_views() {
    let app = TestApp::new().await;
    let token = app.token().await;
    let file = upload(&app, &token, report("x")).await;
    let uri = format!("/api/files/{}", file["id"]);

    json_body(app.get_auth(&uri, &token).await).await;
    let response = app.get_auth(&uri, &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["views"], 2);
}

#[tokio::test]
async fn test_get_unknown_file_is_not_found() {
    let app = TestApp::new().await;
    let token = app.token().await;

    let response = app.get_auth("/api/files/9999", &token).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// New content replaces the old file on disk
#[tokio::test]
async fn test_update_replaces_content() {
    let app = TestApp::new().await;
    let token = app.token().await;
    let file = upload(&app, &token, report("v1")).await;
    let old_path = file["path"].as_str().unwrap().to_string();

    let form = MultipartForm::new().add_part("file", file_part("report-v2.txt", b"v2"));
    let updated = update(&app, &token, &file["id"], form).await;

    let new_path = updated["path"].as_str().unwrap();
    assert_ne!(new_path, old_path);
    assert_eq!(updated["tags"], json!(["q3", "finance"]));
    assert!(!app.uploads.path().join(&old_path).exists());
    assert_eq!(
        std::fs::read_to_string(app.uploads.path().join(new_path)).unwrap(),
        "v2"
    );
}

/// A new name without content renames the stored file
#[tokio::test]
async fn test_update_name_renames_on_disk() {
    let app = TestApp::new().await;
    let token = app.token().await;
    let file = upload(&app, &token, report("keep me")).await;
    let old_path = file["path"].as_str().unwrap().to_string();

    let form = MultipartForm::new().add_text("name", "summary.txt");
    let updated = update(&app, &token, &file["id"], form).await;

    let new_path = updated["path"].as_str().unwrap();
    assert_eq!(updated["name"], "summary.txt");
    assert!(new_path.ends_with("-summary.txt"));
    assert!(!app.uploads.path().join(&old_path).exists());
    assert_eq!(
        std::fs::read_to_string(app.uploads.path().join(new_path)).unwrap(),
        "keep me"
    );
}

#[tokio::test]
async fn test_update_tags_only_keeps_path() {
    let app = TestApp::new().await;
    let token = app.token().await;
    let file = upload(&app, &token, report("x")).await;

    let form = MultipartForm::new().add_text("tags", "archived");
    let updated = update(&app, &token, &file["id"], form).await;

    assert_eq!(updated["tags"], json!(["archived"]));
    assert_eq!(updated["path"], file["path"]);
}

/// Delete removes the row and the on-disk file
#[tokio::test]
async fn test_delete_removes_row_and_file() {
    let app = TestApp::new().await;
    let token = app.token().await;
    let file = upload(&app, &token, report("bye")).await;
    let uri = format!("/api/files/{}", file["id"]);
    let on_disk = app.uploads.path().join(file["path"].as_str().unwrap());
    assert!(on_disk.exists());

    let response = app.delete_auth(&uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert!(!on_disk.exists());
    assert_eq!(app.get_auth(&uri, &token).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_all_files() {
    let app = TestApp::new().await;
    let token = app.token().await;
    let first = upload(&app, &token, report("1")).await;
    let second = upload(&app, &token, report("2")).await;

    let response = app.delete_auth("/api/files", &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["deleted"], 2);
    for file in [first, second] {
        assert!(!app.uploads.path().join(file["path"].as_str().unwrap()).exists());
    }
    let remaining = json_body(app.get_auth("/api/files", &token).await).await;
    assert!(remaining.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_files_by_tag() {
    let app = TestApp::new().await;
    let token = app.token().await;
    upload(&app, &token, report("a")).await;
    upload(
        &app,
        &token,
        MultipartForm::new()
            .add_part("file", file_part("photo.jpg", b"jpg"))
            .add_text("tags", "personal"),
    )
    .await;

    let query = json!({ "filter": { "tags": "personal" } });
    let response = app.post_json_auth("/api/files/search", &query, &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let page = json_body(response).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["name"], "photo.jpg");
}

#[tokio::test]
async fn test_search_files_by_views_range() {
    let app = TestApp::new().await;
    let token = app.token().await;
    let viewed = upload(&app, &token, report("a")).await;
    upload(&app, &token, report("b")).await;
    app.get_auth(&format!("/api/files/{}", viewed["id"]), &token)
        .await;

    let query = json!({ "filter": { "views": { "$between": [1, 5] } } });
    let page = json_body(app.post_json_auth("/api/files/search", &query, &token).await).await;

    assert_eq!(page["total"], 1);
    assert_eq!(page["data"][0]["id"], viewed["id"]);
}
