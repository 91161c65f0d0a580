//! User API Tests

use axum::http::{header, Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{file_part, json_body, text_body, MultipartForm, TestApp, TestUser};

async fn create_member(app: &TestApp, token: &str, n: usize) {
    let body = json!({
        "name": format!("Member {:02}", n),
        "username": format!("member{:02}", n),
        "email": format!("member{:02}@example.com", n),
        "password": "MemberPassword1!",
    });
    let response = app.post_json_auth("/api/users", &body, token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_users_require_authentication() {
    let app = TestApp::new().await;

    let response = app.get("/api/users").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["status"], 401);
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let app = TestApp::new().await;

    let response = app.get_auth("/api/users", "not.a.jwt").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_get_user() {
    let app = TestApp::new().await;
    let token = app.token().await;
    let user = TestUser::generate();

    let response = app
        .post_json_auth("/api/users", &user.registration(), &token)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    let uuid = created["uuid"].as_str().unwrap();

    let response = app.get_auth(&format!("/api/users/{}", uuid), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = json_body(response).await;
    assert_eq!(fetched["email"], user.email.as_str());
    assert!(fetched.get("password_hash").is_none());
}

#[tokio::test]
async fn test_create_user_with_taken_username_fails() {
    let app = TestApp::new().await;
    let owner = TestUser::generate();
    let (token, _) = app.register(&owner).await;

    let mut clash = TestUser::generate();
    clash.username = owner.username.clone();
    let response = app
        .post_json_auth("/api/users", &clash.registration(), &token)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_user_is_not_found() {
    let app = TestApp::new().await;
    let token = app.token().await;

    let response = app
        .get_auth(&format!("/api/users/{}", uuid::Uuid::new_v4()), &token)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_user_merges_fields() {
    let app = TestApp::new().await;
    let user = TestUser::generate();
    let (token, created) = app.register(&user).await;
    let uuid = created["uuid"].as_str().unwrap();

    let response = app
        .patch_json_auth(
            &format!("/api/users/{}", uuid),
            &json!({ "name": "Renamed" }),
            &token,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let updated = json_body(response).await;
    assert_eq!(updated["name"], "Renamed");
    assert_eq!(updated["email"], user.email.as_str());
    assert_eq!(updated["uuid"], uuid);
}

#[tokio::test]
async fn test_update_user_password_changes_login() {
    let app = TestApp::new().await;
    let user = TestUser::generate();
    let (token, created) = app.register(&user).await;
    let uri = format!("/api/users/{}", created["uuid"].as_str().unwrap());

    let response = app
        .patch_json_auth(&uri, &json!({ "password": "AnotherPassword9!" }), &token)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let login = app
        .post_json(
            "/api/auth/login",
            &json!({ "email": user.email, "password": "AnotherPassword9!" }),
        )
        .await;
    assert_eq!(login.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_delete_user() {
    let app = TestApp::new().await;
    let token = app.token().await;
    let other = TestUser::generate();
    let created = json_body(
        app.post_json_auth("/api/users", &other.registration(), &token)
            .await,
    )
    .await;
    let uri = format!("/api/users/{}", created["uuid"].as_str().unwrap());

    let response = app.delete_auth(&uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get_auth(&uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_all_users() {
    let app = TestApp::new().await;
    let token = app.token().await;
    create_member(&app, &token, 1).await;
    create_member(&app, &token, 2).await;

    let response = app.delete_auth("/api/users", &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["deleted"], 3);
}

/// Page 2 with 5 per page returns exactly items 6-10 in sort order
#[tokio::test]
async fn test_search_second_page() {
    let app = TestApp::new().await;
    let token = app.token().await;
    for n in 1..=12 {
        create_member(&app, &token, n).await;
    }

    let query = json!({
        "filter": { "username": { "$like": "member" } },
        "paginate": { "page": 2, "perPage": 5 },
        "orderBy": [{ "sort": "username", "order": "asc" }],
    });
    let response = app.post_json_auth("/api/users/search", &query, &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let page = json_body(response).await;
    let usernames: Vec<&str> = page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(
        usernames,
        vec!["member06", "member07", "member08", "member09", "member10"]
    );
    assert_eq!(page["total"], 12);
    assert_eq!(page["page"], 2);
    assert_eq!(page["perPage"], 5);
    assert_eq!(page["totalPages"], 3);
}

#[tokio::test]
async fn test_search_descending_defaults_to_first_page() {
    let app = TestApp::new().await;
    let token = app.token().await;
    for n in 1..=3 {
        create_member(&app, &token, n).await;
    }

    let query = json!({
        "filter": { "username": { "$like": "MEMBER" }, "email": { "$ne": "member01@example.com" } },
        "orderBy": [{ "sort": "username", "order": "desc" }],
    });
    let page = json_body(app.post_json_auth("/api/users/search", &query, &token).await).await;

    assert_eq!(page["page"], 1);
    assert_eq!(page["perPage"], 10);
    assert_eq!(page["total"], 2);
    assert_eq!(page["data"][0]["username"], "member03");
    assert_eq!(page["data"][1]["username"], "member02");
}

/// A page far past the end is an empty page, not an error
#[tokio::test]
async fn test_search_huge_page_is_empty() {
    let app = TestApp::new().await;
    let token = app.token().await;

    let query = json!({ "paginate": { "page": i64::MAX, "perPage": 100 } });
    let response = app.post_json_auth("/api/users/search", &query, &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let page = json_body(response).await;
    assert!(page["data"].as_array().unwrap().is_empty());
    assert_eq!(page["total"], 1);
    assert_eq!(page["perPage"], 100);
}

#[tokio::test]
async fn test_search_rejects_unknown_operator() {
    let app = TestApp::new().await;
    let token = app.token().await;

    let query = json!({ "filter": { "name": { "$regex": "^A" } } });
    let response = app.post_json_auth("/api/users/search", &query, &token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_rejects_password_hash_filter() {
    let app = TestApp::new().await;
    let token = app.token().await;

    let query = json!({ "filter": { "password_hash": "x" } });
    let response = app.post_json_auth("/api/users/search", &query, &token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_csv_has_no_password_data() {
    let app = TestApp::new().await;
    let user = TestUser::generate();
    let (token, _) = app.register(&user).await;

    let response = app.get_auth("/api/users/export", &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let csv = text_body(response).await;
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("uuid,name,username,email,created_at,updated_at")
    );
    assert!(csv.contains(&user.email));
    assert!(!csv.contains("password"));
    assert!(!csv.contains("$argon2"));
}

/// Import skips rows whose email already exists
#[tokio::test]
async fn test_import_csv_skips_existing_emails() {
    let app = TestApp::new().await;
    let user = TestUser::generate();
    let (token, _) = app.register(&user).await;

    let csv = format!(
        "name,username,email,password\n\
         Grace Hopper,grace,grace@example.com,CompilerPass1!\n\
         Existing,existing,{},ExistingPass1!\n",
        user.email
    );
    let form = MultipartForm::new().add_part("file", file_part("users.csv", csv.as_bytes()));
    let response = app
        .multipart_auth(Method::POST, "/api/users/import", form, &token)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let summary: serde_json::Value = response.json();
    assert_eq!(summary["inserted"], 1);
    assert_eq!(summary["skipped"], 1);

    let login = app
        .post_json(
            "/api/auth/login",
            &json!({ "email": "grace@example.com", "password": "CompilerPass1!" }),
        )
        .await;
    assert_eq!(login.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_import_csv_reports_bad_row() {
    let app = TestApp::new().await;
    let token = app.token().await;

    let csv = "name,username,email,password\nNo Email,noemail,not-an-email,Password123!\n";
    let form = MultipartForm::new().add_part("file", file_part("users.csv", csv.as_bytes()));
    let response = app
        .multipart_auth(Method::POST, "/api/users/import", form, &token)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("line 2"));
}

#[tokio::test]
async fn test_import_without_file_part_fails() {
    let app = TestApp::new().await;
    let token = app.token().await;

    let form = MultipartForm::new().add_text("name", "users");
    let response = app
        .multipart_auth(Method::POST, "/api/users/import", form, &token)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
