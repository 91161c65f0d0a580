//! Authentication Service
//!
//! Handles login, registration, token extension and the password reset flow.
//! Tokens are stateless JWTs; logout does not revoke anything.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::application::dto::{
    AuthResponse, CreateUserRequest, ForgotPasswordResponse, MessageResponse,
};
use crate::application::services::password::{PasswordError, PasswordHasher};
use crate::application::services::user_service::{UserError, UserService};
use crate::domain::{Repository, User, UserPatch};
use crate::shared::error::AppError;
use crate::shared::jwt::{JwtCodec, JwtError, TokenKind};

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, a password reset token has been issued";

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Authenticate user with credentials
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError>;

    /// Create an account and log it in
    async fn register(&self, request: CreateUserRequest) -> Result<AuthResponse, AuthError>;

    /// Stateless logout; tokens stay valid until they expire
    async fn logout(&self) -> Result<MessageResponse, AuthError>;

    /// Issue a fresh access token for an authenticated user
    async fn extend_token(&self, user_id: i64) -> Result<AuthResponse, AuthError>;

    async fn forgot_password(&self, email: &str) -> Result<ForgotPasswordResponse, AuthError>;

    async fn reset_password(&self, token: &str, password: &str)
        -> Result<MessageResponse, AuthError>;
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User with this email already exists")]
    EmailExists,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("User no longer exists")]
    UserNotFound,

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::EmailExists
            | AuthError::InvalidResetToken => AppError::BadRequest(err.to_string()),
            AuthError::UserNotFound => AppError::Unauthorized(err.to_string()),
            AuthError::Token(JwtError::Signing(e)) => AppError::Internal(e),
            AuthError::Token(e) => AppError::Unauthorized(e.to_string()),
            AuthError::Password(e) => AppError::Internal(e.to_string()),
            AuthError::User(e) => e.into(),
            AuthError::Repository(e) => e,
        }
    }
}

/// AuthService implementation
pub struct AuthServiceImpl {
    users: Arc<dyn Repository<User>>,
    user_service: Arc<dyn UserService>,
    hasher: PasswordHasher,
    jwt: Arc<JwtCodec>,
    /// Echo reset tokens in responses (non-production only)
    expose_reset_token: bool,
}

impl AuthServiceImpl {
    pub fn new(
        users: Arc<dyn Repository<User>>,
        user_service: Arc<dyn UserService>,
        hasher: PasswordHasher,
        jwt: Arc<JwtCodec>,
        expose_reset_token: bool,
    ) -> Self {
        Self {
            users,
            user_service,
            hasher,
            jwt,
            expose_reset_token,
        }
    }

    fn issue(&self, user: User) -> Result<AuthResponse, AuthError> {
        let token = self.jwt.issue_access(&user)?;
        Ok(AuthResponse::bearer(token, self.jwt.access_ttl_secs(), user))
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(password, &user.password_hash)? {
            debug!(user_id = user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = user.id, "User logged in");
        self.issue(user)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn register(&self, request: CreateUserRequest) -> Result<AuthResponse, AuthError> {
        if self.users.get_by_email(&request.email).await?.is_some() {
            return Err(AuthError::EmailExists);
        }

        let email = request.email.clone();
        let password = request.password.clone();
        self.user_service.create(request).await?;

        self.login(&email, &password).await
    }

    async fn logout(&self) -> Result<MessageResponse, AuthError> {
        Ok(MessageResponse::new("Logged out successfully"))
    }

    #[instrument(skip(self))]
    async fn extend_token(&self, user_id: i64) -> Result<AuthResponse, AuthError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        self.issue(user)
    }

    #[instrument(skip(self))]
    async fn forgot_password(&self, email: &str) -> Result<ForgotPasswordResponse, AuthError> {
        let Some(user) = self.users.get_by_email(email).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(ForgotPasswordResponse {
                message: FORGOT_PASSWORD_MESSAGE.to_string(),
                reset_token: None,
            });
        };

        let token = self.jwt.issue_reset(&user)?;
        self.users
            .update(
                user.id,
                UserPatch {
                    reset_token: Some(Some(token.clone())),
                    ..Default::default()
                },
            )
            .await?;

        info!(user_id = user.id, "Password reset token issued");
        debug!(user_id = user.id, token = %token, "Reset token");

        Ok(ForgotPasswordResponse {
            message: FORGOT_PASSWORD_MESSAGE.to_string(),
            reset_token: self.expose_reset_token.then_some(token),
        })
    }

    #[instrument(skip(self, token, password))]
    async fn reset_password(
        &self,
        token: &str,
        password: &str,
    ) -> Result<MessageResponse, AuthError> {
        let claims = self.jwt.verify(token, TokenKind::Reset).map_err(|e| {
            debug!(error = %e, "Reset token rejected");
            AuthError::InvalidResetToken
        })?;
        let user_id = claims
            .user_id()
            .map_err(|_| AuthError::InvalidResetToken)?;

        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        if user.reset_token.as_deref() != Some(token) {
            warn!(user_id, "Reset token does not match the stored token");
            return Err(AuthError::InvalidResetToken);
        }

        let password_hash = self.hasher.hash(password)?;
        self.users
            .update(
                user.id,
                UserPatch {
                    password_hash: Some(password_hash),
                    reset_token: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        info!(user_id, "Password reset");
        Ok(MessageResponse::new("Password has been reset"))
    }
}
