//! File Handlers
//!
//! Uploads arrive as multipart forms with a `file` part and optional `name`
//! and `tags` (comma-separated) parts. Stored content is served under `/uploads`.

use axum::{
    extract::{Extension, Multipart, Path, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::{DeleteAllResponse, FileResponse, FileUploadForm};
use crate::application::services::{FileService, UpdateFileDto, UploadDto};
use crate::domain::{Page, QueryOptions};
use crate::presentation::http::extractors::UploadForm;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::{AppError, ErrorResponse};
use crate::startup::AppState;

/// List all files
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    security(("bearer" = [])),
    responses((status = 200, body = Vec<FileResponse>))
)]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileResponse>>, AppError> {
    Ok(Json(state.file_service().list().await?))
}

/// Upload a file
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "files",
    security(("bearer" = [])),
    request_body(content_type = "multipart/form-data", content = FileUploadForm),
    responses(
        (status = 201, body = FileResponse),
        (status = 400, description = "Missing file part", body = ErrorResponse),
        (status = 413, description = "Upload too large", body = ErrorResponse)
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FileResponse>), AppError> {
    let mut form = UploadForm::from_multipart(multipart).await?;
    let content = form.require_file()?;

    let file = state
        .file_service()
        .upload(UploadDto {
            content,
            name: form.name,
            tags: form.tags.unwrap_or_default(),
            user_id: Some(auth.user_id),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(file)))
}

/// Delete every file
#[utoipa::path(
    delete,
    path = "/api/files",
    tag = "files",
    security(("bearer" = [])),
    responses((status = 200, body = DeleteAllResponse))
)]
pub async fn delete_all_files(
    State(state): State<AppState>,
) -> Result<Json<DeleteAllResponse>, AppError> {
    let deleted = state.file_service().delete_all().await?;
    Ok(Json(DeleteAllResponse { deleted }))
}

/// Filtered, sorted, paginated search
#[utoipa::path(
    post,
    path = "/api/files/search",
    tag = "files",
    security(("bearer" = [])),
    request_body = QueryOptions,
    responses(
        (status = 200, body = Page<FileResponse>),
        (status = 400, description = "Unknown field or operator", body = ErrorResponse)
    )
)]
pub async fn search_files(
    State(state): State<AppState>,
    Json(options): Json<QueryOptions>,
) -> Result<Json<Page<FileResponse>>, AppError> {
    Ok(Json(state.file_service().find(&options).await?))
}

/// Get a file by id; counts a view
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "File id")),
    responses(
        (status = 200, body = FileResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FileResponse>, AppError> {
    Ok(Json(state.file_service().get(id).await?))
}

/// Replace content, rename, or retag a file
#[utoipa::path(
    patch,
    path = "/api/files/{id}",
    tag = "files",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "File id")),
    request_body(content_type = "multipart/form-data", content = FileUploadForm),
    responses(
        (status = 200, body = FileResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn update_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<FileResponse>, AppError> {
    let form = UploadForm::from_multipart(multipart).await?;

    let file = state
        .file_service()
        .update(
            id,
            UpdateFileDto {
                content: form.file,
                name: form.name,
                tags: form.tags,
            },
        )
        .await?;

    Ok(Json(file))
}

/// Delete a file and its stored content
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "File id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.file_service().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
