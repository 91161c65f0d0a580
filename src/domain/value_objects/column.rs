//! Column descriptors and typed column values.
//!
//! Entities describe their storage layout as a static list of [`Column`]s.
//! Filter values arriving as JSON are coerced into [`ColumnValue`]s against
//! the column kind before they reach a repository backend.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::shared::error::AppError;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Text,
    Uuid,
    Timestamp,
    TextArray,
}

/// A single column of an entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Whether the column may be used in filters and sorting.
    /// Secrets such as password hashes are not queryable.
    pub queryable: bool,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            queryable: true,
        }
    }

    pub const fn hidden(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            queryable: false,
        }
    }
}

/// A typed value bound to a column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Int(i64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    TextArray(Vec<String>),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Coerce a JSON value into the representation of `column`.
    ///
    /// A scalar string against a text-array column stays a `Text` value; it is
    /// used for membership tests.
    pub fn from_json(column: &Column, value: &Value) -> Result<Self, AppError> {
        if value.is_null() {
            return Ok(ColumnValue::Null);
        }

        let invalid = || {
            AppError::BadRequest(format!(
                "Invalid value {} for field '{}'",
                value, column.name
            ))
        };

        match column.kind {
            ColumnKind::Int => match value {
                Value::Number(n) => n.as_i64().map(ColumnValue::Int).ok_or_else(invalid),
                Value::String(s) => s.trim().parse().map(ColumnValue::Int).map_err(|_| invalid()),
                _ => Err(invalid()),
            },
            ColumnKind::Text => match value {
                Value::String(s) => Ok(ColumnValue::Text(s.clone())),
                Value::Number(n) => Ok(ColumnValue::Text(n.to_string())),
                Value::Bool(b) => Ok(ColumnValue::Text(b.to_string())),
                _ => Err(invalid()),
            },
            ColumnKind::Uuid => match value {
                Value::String(s) => Uuid::parse_str(s).map(ColumnValue::Uuid).map_err(|_| invalid()),
                _ => Err(invalid()),
            },
            ColumnKind::Timestamp => match value {
                Value::String(s) => parse_timestamp(s).map(ColumnValue::Timestamp).ok_or_else(invalid),
                _ => Err(invalid()),
            },
            ColumnKind::TextArray => match value {
                Value::String(s) => Ok(ColumnValue::Text(s.clone())),
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .map(ColumnValue::TextArray)
                    .ok_or_else(invalid),
                _ => Err(invalid()),
            },
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ColumnValue::Null => Value::Null,
            ColumnValue::Int(v) => Value::from(*v),
            ColumnValue::Text(v) => Value::String(v.clone()),
            ColumnValue::Uuid(v) => Value::String(v.to_string()),
            ColumnValue::Timestamp(v) => {
                Value::String(v.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
            ColumnValue::TextArray(v) => {
                Value::Array(v.iter().cloned().map(Value::String).collect())
            }
        }
    }

    /// Ordering between two values of the same kind. `None` for nulls and
    /// mismatched kinds.
    pub fn compare(&self, other: &ColumnValue) -> Option<Ordering> {
        match (self, other) {
            (ColumnValue::Int(a), ColumnValue::Int(b)) => Some(a.cmp(b)),
            (ColumnValue::Text(a), ColumnValue::Text(b)) => Some(a.cmp(b)),
            (ColumnValue::Uuid(a), ColumnValue::Uuid(b)) => Some(a.cmp(b)),
            (ColumnValue::Timestamp(a), ColumnValue::Timestamp(b)) => Some(a.cmp(b)),
            (ColumnValue::TextArray(a), ColumnValue::TextArray(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(value.to_string())
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Int(value)
    }
}

impl From<Uuid> for ColumnValue {
    fn from(value: Uuid) -> Self {
        ColumnValue::Uuid(value)
    }
}

impl From<Vec<String>> for ColumnValue {
    fn from(value: Vec<String>) -> Self {
        ColumnValue::TextArray(value)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ColumnValue::Null)
    }
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC).
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const AGE: Column = Column::new("age", ColumnKind::Int);
    const CREATED: Column = Column::new("created_at", ColumnKind::Timestamp);
    const TAGS: Column = Column::new("tags", ColumnKind::TextArray);

    #[test]
    fn test_int_accepts_numeric_strings() {
        assert_eq!(
            ColumnValue::from_json(&AGE, &json!("42")).unwrap(),
            ColumnValue::Int(42)
        );
        assert!(ColumnValue::from_json(&AGE, &json!("forty")).is_err());
    }

    #[test]
    fn test_timestamp_accepts_dates() {
        let value = ColumnValue::from_json(&CREATED, &json!("2024-03-01")).unwrap();
        let expected = DateTime::parse_from_rfc3339("2024-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(value, ColumnValue::Timestamp(expected));
    }

    #[test]
    fn test_text_array_scalar_stays_text() {
        assert_eq!(
            ColumnValue::from_json(&TAGS, &json!("report")).unwrap(),
            ColumnValue::Text("report".into())
        );
        assert!(ColumnValue::from_json(&TAGS, &json!([1, 2])).is_err());
    }

    #[test]
    fn test_timestamp_json_is_parseable() {
        use chrono::SubsecRound;

        let now = Utc::now().trunc_subsecs(6);
        let json = ColumnValue::Timestamp(now).to_json();
        let back = ColumnValue::from_json(&CREATED, &json).unwrap();
        assert_eq!(back.compare(&ColumnValue::Timestamp(now)), Some(Ordering::Equal));
    }

    #[test]
    fn test_compare_rejects_mixed_kinds() {
        assert_eq!(ColumnValue::Int(1).compare(&ColumnValue::Text("1".into())), None);
        assert_eq!(ColumnValue::Null.compare(&ColumnValue::Null), None);
    }
}
