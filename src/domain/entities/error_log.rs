//! Persisted server error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::repository::Entity;
use crate::domain::value_objects::{Column, ColumnKind, ColumnValue};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ErrorLog {
    pub id: i64,
    pub status: i32,
    pub message: String,
    pub stack: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewErrorLog {
    pub status: i32,
    pub message: String,
    pub stack: Option<String>,
}

const ERROR_LOG_COLUMNS: &[Column] = &[
    Column::new("id", ColumnKind::Int),
    Column::new("status", ColumnKind::Int),
    Column::new("message", ColumnKind::Text),
    Column::new("stack", ColumnKind::Text),
    Column::new("created_at", ColumnKind::Timestamp),
    Column::new("updated_at", ColumnKind::Timestamp),
];

impl Entity for ErrorLog {
    type New = NewErrorLog;
    // Error logs are append-only.
    type Patch = ();

    const NAME: &'static str = "ErrorLog";
    const TABLE: &'static str = "error_logs";
    const COLUMNS: &'static [Column] = ERROR_LOG_COLUMNS;
    const UNIQUE: &'static [&'static str] = &[];

    fn id(&self) -> i64 {
        self.id
    }

    fn new_values(new: &NewErrorLog) -> Vec<(&'static str, ColumnValue)> {
        vec![
            ("status", ColumnValue::Int(new.status as i64)),
            ("message", new.message.as_str().into()),
            ("stack", new.stack.clone().into()),
        ]
    }

    fn patch_values(_patch: &()) -> Vec<(&'static str, ColumnValue)> {
        Vec::new()
    }
}
