//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers;
use super::openapi::ApiDoc;
use crate::presentation::middleware::{
    auth_middleware, persist_server_errors, rate_limit, response_cache,
};
use crate::startup::AppState;

/// Create the main router: health, API, uploaded files and API docs
pub fn create_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.settings.uploads.dir);
    let max_bytes = state.settings.uploads.max_bytes;

    Router::new()
        .route("/", get(handlers::health::health_check))
        .merge(api_routes(state.clone()))
        .nest_service("/uploads", uploads)
        .merge(SwaggerUi::new("/docs").url("/docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(max_bytes))
        .with_state(state)
}

/// API routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes(state.clone()))
        .merge(user_routes(state.clone()))
        .merge(file_routes(state.clone()))
        // Rate limiting wraps error persistence, which wraps the handlers
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            persist_server_errors,
        ))
        .route_layer(middleware::from_fn_with_state(state, rate_limit))
}

/// Authentication routes (public except token extension)
fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/auth/extend-token", post(handlers::auth::extend_token))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/forgot-password", post(handlers::auth::forgot_password))
        .route("/api/auth/reset-password", post(handlers::auth::reset_password))
        // Registration invalidates cached user listings
        .route_layer(middleware::from_fn_with_state(state, response_cache))
        .merge(protected)
}

/// User routes (protected)
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/users",
            get(handlers::user::list_users)
                .post(handlers::user::create_user)
                .delete(handlers::user::delete_all_users),
        )
        .route("/api/users/search", post(handlers::user::search_users))
        .route("/api/users/export", get(handlers::user::export_users))
        .route("/api/users/import", post(handlers::user::import_users))
        .route(
            "/api/users/{uuid}",
            get(handlers::user::get_user)
                .patch(handlers::user::update_user)
                .delete(handlers::user::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), response_cache))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// File routes (protected)
fn file_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/files",
            get(handlers::file::list_files)
                .post(handlers::file::upload_file)
                .delete(handlers::file::delete_all_files),
        )
        .route("/api/files/search", post(handlers::file::search_files))
        .route(
            "/api/files/{id}",
            get(handlers::file::get_file)
                .patch(handlers::file::update_file)
                .delete(handlers::file::delete_file),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), response_cache))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
