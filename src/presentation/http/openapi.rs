//! OpenAPI document served by Swagger UI at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::application::dto::{
    AuthResponse, CreateUserRequest, DeleteAllResponse, FileResponse, FileUploadForm,
    ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, MessageResponse,
    ResetPasswordRequest, UpdateUserRequest, UserResponse,
};
use crate::domain::{ImportSummary, OrderBy, Paginate, QueryOptions, SortOrder};
use crate::presentation::http::handlers;
use crate::shared::error::{ErrorResponse, FieldError};

#[derive(OpenApi)]
#[openapi(
    info(title = "CRUD API", description = "Users, authentication and file uploads"),
    paths(
        handlers::health::health_check,
        handlers::auth::login,
        handlers::auth::register,
        handlers::auth::logout,
        handlers::auth::extend_token,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::user::list_users,
        handlers::user::create_user,
        handlers::user::delete_all_users,
        handlers::user::search_users,
        handlers::user::export_users,
        handlers::user::import_users,
        handlers::user::get_user,
        handlers::user::update_user,
        handlers::user::delete_user,
        handlers::file::list_files,
        handlers::file::upload_file,
        handlers::file::delete_all_files,
        handlers::file::search_files,
        handlers::file::get_file,
        handlers::file::update_file,
        handlers::file::delete_file,
    ),
    components(schemas(
        LoginRequest,
        CreateUserRequest,
        UpdateUserRequest,
        ForgotPasswordRequest,
        ResetPasswordRequest,
        FileUploadForm,
        AuthResponse,
        UserResponse,
        MessageResponse,
        ForgotPasswordResponse,
        FileResponse,
        DeleteAllResponse,
        ImportSummary,
        QueryOptions,
        Paginate,
        OrderBy,
        SortOrder,
        ErrorResponse,
        FieldError,
        handlers::health::HealthResponse,
        handlers::health::HealthChecks,
        handlers::health::ServiceHealth,
        handlers::health::HealthStatus,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Login, registration and password reset"),
        (name = "users", description = "User management"),
        (name = "files", description = "File uploads")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` JWT scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/",
            "/api/auth/login",
            "/api/auth/extend-token",
            "/api/users/{uuid}",
            "/api/users/import",
            "/api/files/{id}",
            "/api/files/search",
        ] {
            assert!(paths.iter().any(|p| *p == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
