//! Authentication Handlers

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::{
    AuthResponse, CreateUserRequest, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest,
    MessageResponse, ResetPasswordRequest,
};
use crate::application::services::AuthService;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::{AppError, ErrorResponse};
use crate::shared::validation::validate;
use crate::startup::AppState;

/// Login with credentials
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, body = AuthResponse),
        (status = 400, description = "Invalid credentials", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    validate(&body)?;

    let response = state
        .auth_service()
        .login(&body.email, &body.password)
        .await?;
    Ok(Json(response))
}

/// Register a new user and log in
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = CreateUserRequest,
    responses(
        (status = 201, body = AuthResponse),
        (status = 400, description = "Validation failed or email taken", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    validate(&body)?;

    let response = state.auth_service().register(body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Logout (tokens are stateless and stay valid until expiry)
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses((status = 200, body = MessageResponse))
)]
pub async fn logout(State(state): State<AppState>) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(state.auth_service().logout().await?))
}

/// Issue a fresh access token
#[utoipa::path(
    post,
    path = "/api/auth/extend-token",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, body = AuthResponse),
        (status = 401, body = ErrorResponse)
    )
)]
pub async fn extend_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = state.auth_service().extend_token(auth.user_id).await?;
    Ok(Json(response))
}

/// Request a password reset token
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses((status = 200, body = ForgotPasswordResponse))
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, AppError> {
    validate(&body)?;

    let response = state.auth_service().forgot_password(&body.email).await?;
    Ok(Json(response))
}

/// Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, body = MessageResponse),
        (status = 400, description = "Invalid or expired reset token", body = ErrorResponse)
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    validate(&body)?;

    let response = state
        .auth_service()
        .reset_password(&body.token, &body.password)
        .await?;
    Ok(Json(response))
}
