//! User Handlers

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::application::dto::{
    CreateUserRequest, DeleteAllResponse, FileUploadForm, UpdateUserRequest, UserResponse,
};
use crate::application::services::UserService;
use crate::domain::{ImportSummary, Page, QueryOptions};
use crate::presentation::http::extractors::UploadForm;
use crate::shared::error::{AppError, ErrorResponse};
use crate::shared::validation::validate;
use crate::startup::AppState;

/// List all users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    security(("bearer" = [])),
    responses((status = 200, body = Vec<UserResponse>))
)]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, AppError> {
    Ok(Json(state.user_service().list().await?))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    security(("bearer" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, body = UserResponse),
        (status = 400, body = ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    validate(&body)?;

    let user = state.user_service().create(body).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Delete every user
#[utoipa::path(
    delete,
    path = "/api/users",
    tag = "users",
    security(("bearer" = [])),
    responses((status = 200, body = DeleteAllResponse))
)]
pub async fn delete_all_users(
    State(state): State<AppState>,
) -> Result<Json<DeleteAllResponse>, AppError> {
    let deleted = state.user_service().delete_all().await?;
    Ok(Json(DeleteAllResponse { deleted }))
}

/// Filtered, sorted, paginated search
#[utoipa::path(
    post,
    path = "/api/users/search",
    tag = "users",
    security(("bearer" = [])),
    request_body = QueryOptions,
    responses(
        (status = 200, body = Page<UserResponse>),
        (status = 400, description = "Unknown field or operator", body = ErrorResponse)
    )
)]
pub async fn search_users(
    State(state): State<AppState>,
    Json(options): Json<QueryOptions>,
) -> Result<Json<Page<UserResponse>>, AppError> {
    Ok(Json(state.user_service().find(&options).await?))
}

/// Download all users as CSV
#[utoipa::path(
    get,
    path = "/api/users/export",
    tag = "users",
    security(("bearer" = [])),
    responses((status = 200, content_type = "text/csv", body = String))
)]
pub async fn export_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let csv = state.user_service().export_csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"users.csv\""),
        ],
        csv,
    ))
}

/// Import users from a CSV upload (`name,username,email,password`)
#[utoipa::path(
    post,
    path = "/api/users/import",
    tag = "users",
    security(("bearer" = [])),
    request_body(content_type = "multipart/form-data", content = FileUploadForm),
    responses(
        (status = 200, body = ImportSummary),
        (status = 400, description = "Malformed CSV", body = ErrorResponse)
    )
)]
pub async fn import_users(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImportSummary>, AppError> {
    let mut form = UploadForm::from_multipart(multipart).await?;
    let file = form.require_file()?;

    let summary = state.user_service().import_csv(&file.bytes).await?;
    Ok(Json(summary))
}

/// Get a user by uuid
#[utoipa::path(
    get,
    path = "/api/users/{uuid}",
    tag = "users",
    security(("bearer" = [])),
    params(("uuid" = Uuid, Path, description = "User uuid")),
    responses(
        (status = 200, body = UserResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(state.user_service().get(uuid).await?))
}

/// Update a user
#[utoipa::path(
    patch,
    path = "/api/users/{uuid}",
    tag = "users",
    security(("bearer" = [])),
    params(("uuid" = Uuid, Path, description = "User uuid")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, body = UserResponse),
        (status = 400, body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    validate(&body)?;

    Ok(Json(state.user_service().update(uuid, body).await?))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/users/{uuid}",
    tag = "users",
    security(("bearer" = [])),
    params(("uuid" = Uuid, Path, description = "User uuid")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.user_service().delete(uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}
