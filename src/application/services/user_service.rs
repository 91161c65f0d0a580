//! User Service
//!
//! Handles user management operations, including bulk CSV export and import.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::{CreateUserRequest, UpdateUserRequest, UserCsvRow, UserResponse};
use crate::application::services::password::{PasswordError, PasswordHasher};
use crate::domain::{ImportSummary, NewUser, Page, QueryOptions, Repository, User, UserPatch};
use crate::shared::csv_codec;
use crate::shared::error::AppError;

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// All users
    async fn list(&self) -> Result<Vec<UserResponse>, UserError>;

    /// Filtered, paginated search
    async fn find(&self, options: &QueryOptions) -> Result<Page<UserResponse>, UserError>;

    /// Get user by public uuid
    async fn get(&self, uuid: Uuid) -> Result<UserResponse, UserError>;

    /// Create a user; the password is hashed before storage
    async fn create(&self, request: CreateUserRequest) -> Result<User, UserError>;

    /// Apply a partial update
    async fn update(&self, uuid: Uuid, request: UpdateUserRequest)
        -> Result<UserResponse, UserError>;

    async fn delete(&self, uuid: Uuid) -> Result<(), UserError>;

    /// Delete every user, returning how many were removed
    async fn delete_all(&self) -> Result<u64, UserError>;

    /// CSV of all users, without password data
    async fn export_csv(&self) -> Result<String, UserError>;

    /// Import users from CSV (`name,username,email,password`), skipping known emails
    async fn import_csv(&self, data: &[u8]) -> Result<ImportSummary, UserError>;
}

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("User with this email already exists")]
    EmailTaken,

    #[error("User with this username already exists")]
    UsernameTaken,

    #[error("Invalid CSV at line {line}: {message}")]
    InvalidRow { line: usize, message: String },

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => AppError::NotFound(err.to_string()),
            UserError::EmailTaken | UserError::UsernameTaken | UserError::InvalidRow { .. } => {
                AppError::BadRequest(err.to_string())
            }
            UserError::Password(e) => AppError::Internal(e.to_string()),
            UserError::Repository(e) => e,
        }
    }
}

/// UserService implementation
pub struct UserServiceImpl {
    users: Arc<dyn Repository<User>>,
    hasher: PasswordHasher,
}

impl UserServiceImpl {
    pub fn new(users: Arc<dyn Repository<User>>, hasher: PasswordHasher) -> Self {
        Self { users, hasher }
    }

    async fn require(&self, uuid: Uuid) -> Result<User, UserError> {
        self.users.get_by_uuid(uuid).await?.ok_or(UserError::NotFound)
    }

    async fn ensure_email_free(&self, email: &str) -> Result<(), UserError> {
        if self.users.get_by_email(email).await?.is_some() {
            return Err(UserError::EmailTaken);
        }
        Ok(())
    }

    async fn ensure_username_free(&self, username: &str) -> Result<(), UserError> {
        if self.users.get_by_username(username).await?.is_some() {
            return Err(UserError::UsernameTaken);
        }
        Ok(())
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn list(&self) -> Result<Vec<UserResponse>, UserError> {
        let users = self.users.get_all().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    async fn find(&self, options: &QueryOptions) -> Result<Page<UserResponse>, UserError> {
        let page = self.users.find_by_query(options).await?;
        Ok(page.map(UserResponse::from))
    }

    async fn get(&self, uuid: Uuid) -> Result<UserResponse, UserError> {
        self.require(uuid).await.map(UserResponse::from)
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    async fn create(&self, request: CreateUserRequest) -> Result<User, UserError> {
        self.ensure_email_free(&request.email).await?;
        self.ensure_username_free(&request.username).await?;

        let password_hash = self.hasher.hash(&request.password)?;
        let user = self
            .users
            .create(NewUser {
                uuid: Uuid::new_v4(),
                name: request.name,
                username: request.username,
                email: request.email,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, "User created");
        Ok(user)
    }

    #[instrument(skip(self, request))]
    async fn update(
        &self,
        uuid: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, UserError> {
        let user = self.require(uuid).await?;

        if let Some(email) = request.email.as_deref().filter(|e| *e != user.email) {
            self.ensure_email_free(email).await?;
        }
        if let Some(username) = request.username.as_deref().filter(|u| *u != user.username) {
            self.ensure_username_free(username).await?;
        }

        let password_hash = request
            .password
            .as_deref()
            .map(|p| self.hasher.hash(p))
            .transpose()?;

        let updated = self
            .users
            .update(
                user.id,
                UserPatch {
                    name: request.name,
                    username: request.username,
                    email: request.email,
                    password_hash,
                    reset_token: None,
                },
            )
            .await?;

        Ok(updated.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, uuid: Uuid) -> Result<(), UserError> {
        let user = self.require(uuid).await?;
        self.users.delete(user.id).await?;
        info!(user_id = user.id, "User deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_all(&self) -> Result<u64, UserError> {
        let deleted = self.users.delete_all().await?;
        info!(deleted, "All users deleted");
        Ok(deleted)
    }

    async fn export_csv(&self) -> Result<String, UserError> {
        let users: Vec<UserResponse> = self.list().await?;
        Ok(csv_codec::to_csv(UserResponse::CSV_HEADERS, &users)?)
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn import_csv(&self, data: &[u8]) -> Result<ImportSummary, UserError> {
        let rows: Vec<UserCsvRow> = csv_codec::from_csv(data)?;

        let mut records = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            // Line 1 is the header.
            let line = index + 2;
            row.validate().map_err(|e| UserError::InvalidRow {
                line,
                message: e.to_string(),
            })?;

            records.push(NewUser {
                uuid: Uuid::new_v4(),
                password_hash: self.hasher.hash(&row.password)?,
                name: row.name,
                username: row.username,
                email: row.email,
            });
        }

        let summary = self.users.import(records).await?;
        info!(
            inserted = summary.inserted,
            skipped = summary.skipped,
            "Users imported"
        );
        Ok(summary)
    }
}
