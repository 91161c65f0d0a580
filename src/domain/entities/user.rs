//! User entity.
//!
//! Maps to the `users` table in the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::repository::Entity;
use crate::domain::value_objects::{Column, ColumnKind, ColumnValue};

/// Represents a user account.
///
/// Maps to the `users` table:
/// - id: BIGSERIAL PRIMARY KEY
/// - uuid: UUID NOT NULL UNIQUE
/// - name: TEXT NOT NULL
/// - username: TEXT NOT NULL UNIQUE
/// - email: TEXT NOT NULL UNIQUE
/// - password_hash: TEXT NOT NULL
/// - reset_token: TEXT NULL
/// - created_at / updated_at: TIMESTAMPTZ NOT NULL
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Database primary key
    pub id: i64,

    /// Public identifier, assigned once at creation
    pub uuid: Uuid,

    pub name: String,

    /// Username (unique)
    pub username: String,

    /// Email address (unique)
    pub email: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Outstanding password reset token, if any
    #[serde(skip_serializing, default)]
    pub reset_token: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Values for a new user row. The caller hashes the password and assigns the uuid.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub uuid: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    /// `Some(None)` clears the token
    pub reset_token: Option<Option<String>>,
}

const USER_COLUMNS: &[Column] = &[
    Column::new("id", ColumnKind::Int),
    Column::new("uuid", ColumnKind::Uuid),
    Column::new("name", ColumnKind::Text),
    Column::new("username", ColumnKind::Text),
    Column::new("email", ColumnKind::Text),
    Column::hidden("password_hash", ColumnKind::Text),
    Column::hidden("reset_token", ColumnKind::Text),
    Column::new("created_at", ColumnKind::Timestamp),
    Column::new("updated_at", ColumnKind::Timestamp),
];

impl Entity for User {
    type New = NewUser;
    type Patch = UserPatch;

    const NAME: &'static str = "User";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [Column] = USER_COLUMNS;
    const UNIQUE: &'static [&'static str] = &["uuid", "username", "email"];

    fn id(&self) -> i64 {
        self.id
    }

    fn new_values(new: &NewUser) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("uuid", new.uuid.into()),
            ("name", new.name.as_str().into()),
            ("username", new.username.as_str().into()),
            ("email", new.email.as_str().into()),
            ("password_hash", new.password_hash.as_str().into()),
        ]
    }

    fn patch_values(patch: &UserPatch) -> Vec<(&'static str, ColumnValue)> {
        let mut values = Vec::new();
        if let Some(name) = &patch.name {
            values.push(("name", name.as_str().into()));
        }
        if let Some(username) = &patch.username {
            values.push(("username", username.as_str().into()));
        }
        if let Some(email) = &patch.email {
            values.push(("email", email.as_str().into()));
        }
        if let Some(hash) = &patch.password_hash {
            values.push(("password_hash", hash.as_str().into()));
        }
        if let Some(token) = &patch.reset_token {
            values.push(("reset_token", token.clone().into()));
        }
        values
    }

    fn import_key(new: &NewUser) -> Option<(&'static str, ColumnValue)> {
        Some(("email", new.email.as_str().into()))
    }
}
