//! Uploaded file entity.
//!
//! Maps to the `files` table. The bytes live in file storage under `path`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::repository::Entity;
use crate::domain::value_objects::{Column, ColumnKind, ColumnValue};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct File {
    pub id: i64,

    /// Display name, usually the original file name
    pub name: String,

    /// Storage key relative to the uploads directory
    pub path: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Number of times the file was fetched by id
    pub views: i64,

    /// Uploader; not enforced by a foreign key
    pub user_id: Option<i64>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub path: String,
    pub tags: Vec<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct FilePatch {
    pub name: Option<String>,
    pub path: Option<String>,
    pub tags: Option<Vec<String>>,
}

const FILE_COLUMNS: &[Column] = &[
    Column::new("id", ColumnKind::Int),
    Column::new("name", ColumnKind::Text),
    Column::new("path", ColumnKind::Text),
    Column::new("tags", ColumnKind::TextArray),
    Column::new("views", ColumnKind::Int),
    Column::new("user_id", ColumnKind::Int),
    Column::new("created_at", ColumnKind::Timestamp),
    Column::new("updated_at", ColumnKind::Timestamp),
];

impl Entity for File {
    type New = NewFile;
    type Patch = FilePatch;

    const NAME: &'static str = "File";
    const TABLE: &'static str = "files";
    const COLUMNS: &'static [Column] = FILE_COLUMNS;
    const UNIQUE: &'static [&'static str] = &["path"];

    fn id(&self) -> i64 {
        self.id
    }

    fn new_values(new: &NewFile) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("name", new.name.as_str().into()),
            ("path", new.path.as_str().into()),
            ("tags", new.tags.clone().into()),
            ("views", ColumnValue::Int(0)),
            ("user_id", new.user_id.into()),
        ]
    }

    fn patch_values(patch: &FilePatch) -> Vec<(&'static str, ColumnValue)> {
        let mut values = Vec::new();
        if let Some(name) = &patch.name {
            values.push(("name", name.as_str().into()));
        }
        if let Some(path) = &patch.path {
            values.push(("path", path.as_str().into()));
        }
        if let Some(tags) = &patch.tags {
            values.push(("tags", tags.clone().into()));
        }
        values
    }

    fn import_key(new: &NewFile) -> Option<(&'static str, ColumnValue)> {
        Some(("path", new.path.as_str().into()))
    }
}
