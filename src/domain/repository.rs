//! Generic repository contract.
//!
//! Every stored type implements [`Entity`], which describes its table and
//! how its insert/update inputs map onto columns. A single [`Repository`]
//! trait then covers CRUD, search, and bulk import for all entities, with one
//! implementation per storage backend.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::value_objects::{Column, ColumnKind, ColumnValue, Page, QueryOptions};
use crate::shared::error::AppError;

/// Rows per INSERT statement during bulk import.
pub const IMPORT_BATCH_SIZE: usize = 500;

/// A type the generic repository can store.
///
/// `COLUMNS` must list every column of the table, including `id`,
/// `created_at` and `updated_at`, which the repository manages itself.
pub trait Entity:
    DeserializeOwned + for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin + 'static
{
    /// Insert input
    type New: Send + Sync + 'static;
    /// Partial update input
    type Patch: Send + Sync + 'static;

    /// Human readable name used in error messages
    const NAME: &'static str;
    const TABLE: &'static str;
    const COLUMNS: &'static [Column];
    /// Columns with a uniqueness constraint
    const UNIQUE: &'static [&'static str];

    fn id(&self) -> i64;

    /// Column values for an insert. Must return the same columns for every input.
    fn new_values(new: &Self::New) -> Vec<(&'static str, ColumnValue)>;

    /// Column values for a partial update. Only provided fields are returned.
    fn patch_values(patch: &Self::Patch) -> Vec<(&'static str, ColumnValue)>;

    /// Column used to detect existing records during import.
    fn import_key(_new: &Self::New) -> Option<(&'static str, ColumnValue)> {
        None
    }

    fn column(name: &str) -> Option<&'static Column> {
        Self::COLUMNS.iter().find(|c| c.name == name)
    }
}

/// Result of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ImportSummary {
    pub inserted: u64,
    pub skipped: u64,
}

/// Uniform data access over any [`Entity`].
///
/// No method is transactional across calls. `import` commits batch by batch,
/// so a failure part way leaves earlier batches in place.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn get_all(&self) -> Result<Vec<E>, AppError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<E>, AppError>;

    /// First row whose `field` equals `value`. Fails with 400 for unknown or
    /// non-queryable fields.
    async fn get_by_field(&self, field: &str, value: &Value) -> Result<Option<E>, AppError>;

    async fn get_by_uuid(&self, uuid: Uuid) -> Result<Option<E>, AppError> {
        self.get_by_field("uuid", &Value::String(uuid.to_string()))
            .await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<E>, AppError> {
        self.get_by_field("email", &Value::String(email.to_string()))
            .await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<E>, AppError> {
        self.get_by_field("username", &Value::String(username.to_string()))
            .await
    }

    /// Filtered, sorted, offset-paginated search.
    async fn find_by_query(&self, options: &QueryOptions) -> Result<Page<E>, AppError>;

    async fn create(&self, new: E::New) -> Result<E, AppError>;

    /// Merge `patch` into the row and bump `updated_at`. 404 when missing.
    async fn update(&self, id: i64, patch: E::Patch) -> Result<E, AppError>;

    /// Add one to the integer `column` in a single atomic step, bumping
    /// `updated_at`. 404 when missing.
    async fn increment(&self, id: i64, column: &'static str) -> Result<E, AppError>;

    /// 404 when missing.
    async fn delete(&self, id: i64) -> Result<(), AppError>;

    /// Returns the number of deleted rows.
    async fn delete_all(&self) -> Result<u64, AppError>;

    /// Insert records whose import key does not exist yet.
    async fn import(&self, records: Vec<E::New>) -> Result<ImportSummary, AppError>;
}

/// Split import records into those to insert and a count of skipped ones.
///
/// Existence is checked one record at a time against the repository, and
/// duplicates inside the input are skipped after their first occurrence.
pub async fn partition_import<E, R>(
    repo: &R,
    records: Vec<E::New>,
) -> Result<(Vec<E::New>, u64), AppError>
where
    E: Entity,
    R: Repository<E> + ?Sized,
{
    let mut fresh = Vec::with_capacity(records.len());
    let mut seen = HashSet::new();
    let mut skipped = 0;

    for record in records {
        if let Some((field, value)) = E::import_key(&record) {
            let key = value.to_json();
            if !seen.insert(key.to_string()) || repo.get_by_field(field, &key).await?.is_some() {
                skipped += 1;
                continue;
            }
        }
        fresh.push(record);
    }

    Ok((fresh, skipped))
}

/// Error for a write that collides with a unique column.
/// Columns `increment` may touch.
pub fn counter_column<E: Entity>(column: &str) -> Result<&'static Column, AppError> {
    match E::column(column) {
        Some(c) if c.kind == ColumnKind::Int && c.name != "id" => Ok(c),
        _ => Err(AppError::Internal(format!(
            "{} has no counter column '{}'",
            E::TABLE,
            column
        ))),
    }
}

pub fn unique_violation<E: Entity>(column: &str) -> AppError {
    AppError::BadRequest(format!("{} with this {} already exists", E::NAME, column))
}
