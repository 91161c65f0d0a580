//! Query options accepted by `find_by_query`, and the translation of the
//! operator filter language into typed predicates.
//!
//! Filter syntax (a JSON object keyed by field name):
//!
//! ```text
//! { "name": "Ada" }                              equality
//! { "email": { "$like": "@example.com" } }      case-insensitive substring
//! { "views": { "$gte": 10, "$lt": 100 } }       range
//! { "created_at": { "$between": [a, b] } }      expands to $gte a + $lte b
//! { "reset_token": { "$isNull": true } }        existence check
//! { "tags": "report" }                           array membership
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::column::{Column, ColumnKind, ColumnValue};
use crate::shared::error::AppError;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;

/// Highest page whose offset still fits a signed 64-bit `OFFSET`.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PER_PAGE;

/// Body of a search request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// Field filters, see module docs for the operator syntax
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub filter: Option<Value>,

    #[serde(default)]
    pub paginate: Option<Paginate>,

    #[serde(default)]
    pub order_by: Vec<OrderBy>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginate {
    #[serde(default = "default_page")]
    pub page: i64,

    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    DEFAULT_PAGE as i64
}

fn default_per_page() -> i64 {
    DEFAULT_PER_PAGE as i64
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderBy {
    pub sort: String,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

/// Resolved offset window for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub page: u64,
    pub per_page: u64,
    pub offset: u64,
}

impl QueryOptions {
    /// Page 1 with 10 rows when pagination is absent. The page is clamped to
    /// `1..=MAX_PAGE` and the page size to `1..=MAX_PER_PAGE`.
    pub fn window(&self) -> Window {
        let (page, per_page) = match self.paginate {
            Some(p) => (p.page, p.per_page),
            None => (DEFAULT_PAGE as i64, DEFAULT_PER_PAGE as i64),
        };
        let page = page.clamp(1, MAX_PAGE as i64) as u64;
        let per_page = per_page.clamp(1, MAX_PER_PAGE as i64) as u64;

        Window {
            page,
            per_page,
            offset: (page - 1) * per_page,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, window: Window) -> Self {
        Self {
            data,
            total,
            page: window.page,
            per_page: window.per_page,
            total_pages: total.div_ceil(window.per_page),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

/// Filter operators after translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Like,
    IsNull,
    IsNotNull,
}

/// A single untyped condition produced by [`translate_filter`].
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Condition {
    fn new(field: &str, op: Operator, value: Value) -> Self {
        Self {
            field: field.to_string(),
            op,
            value,
        }
    }
}

/// Translate a filter document into a flat list of conditions, all of which
/// must hold.
pub fn translate_filter(filter: &Value) -> Result<Vec<Condition>, AppError> {
    let fields = match filter {
        Value::Null => return Ok(Vec::new()),
        Value::Object(fields) => fields,
        _ => return Err(AppError::BadRequest("Filter must be an object".into())),
    };

    let mut conditions = Vec::new();
    for (field, value) in fields {
        match value {
            Value::Object(ops) if is_operator_object(ops) => {
                for (op, operand) in ops {
                    translate_operator(field, op, operand, &mut conditions)?;
                }
            }
            Value::Object(_) => {
                return Err(AppError::BadRequest(format!(
                    "Nested filter on '{}' is not supported",
                    field
                )))
            }
            _ => conditions.push(Condition::new(field, Operator::Eq, value.clone())),
        }
    }

    Ok(conditions)
}

fn is_operator_object(ops: &Map<String, Value>) -> bool {
    !ops.is_empty() && ops.keys().all(|k| k.starts_with('$'))
}

fn translate_operator(
    field: &str,
    op: &str,
    operand: &Value,
    out: &mut Vec<Condition>,
) -> Result<(), AppError> {
    let simple = match op {
        "$eq" => Some(Operator::Eq),
        "$ne" => Some(Operator::Ne),
        "$gt" => Some(Operator::Gt),
        "$gte" => Some(Operator::Gte),
        "$lt" => Some(Operator::Lt),
        "$lte" => Some(Operator::Lte),
        "$like" => Some(Operator::Like),
        _ => None,
    };
    if let Some(op) = simple {
        out.push(Condition::new(field, op, operand.clone()));
        return Ok(());
    }

    match op {
        "$in" | "$nin" => {
            if !operand.is_array() {
                return Err(AppError::BadRequest(format!(
                    "{} on '{}' expects an array",
                    op, field
                )));
            }
            let op = if op == "$in" { Operator::In } else { Operator::Nin };
            out.push(Condition::new(field, op, operand.clone()));
        }
        "$between" => match operand.as_array().map(Vec::as_slice) {
            Some([low, high]) => {
                out.push(Condition::new(field, Operator::Gte, low.clone()));
                out.push(Condition::new(field, Operator::Lte, high.clone()));
            }
            _ => {
                return Err(AppError::BadRequest(format!(
                    "$between on '{}' expects [low, high]",
                    field
                )))
            }
        },
        "$isNull" | "$isNotNull" => {
            let flag = operand.as_bool().ok_or_else(|| {
                AppError::BadRequest(format!("{} on '{}' expects a boolean", op, field))
            })?;
            let want_null = (op == "$isNull") == flag;
            let op = if want_null {
                Operator::IsNull
            } else {
                Operator::IsNotNull
            };
            out.push(Condition::new(field, op, Value::Null));
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "Unsupported filter operator '{}'",
                other
            )))
        }
    }

    Ok(())
}

/// Comparison operators that map directly onto SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn sql(self) -> &'static str {
        match self {
            Comparison::Eq => " = ",
            Comparison::Ne => " IS DISTINCT FROM ",
            Comparison::Gt => " > ",
            Comparison::Gte => " >= ",
            Comparison::Lt => " < ",
            Comparison::Lte => " <= ",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Ne => ordering != Ordering::Equal,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Gte => ordering != Ordering::Less,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Lte => ordering != Ordering::Greater,
        }
    }
}

/// A condition checked against a concrete column with typed operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    IsNull,
    IsNotNull,
    Compare(Comparison, ColumnValue),
    In(Vec<ColumnValue>),
    NotIn(Vec<ColumnValue>),
    /// Case-insensitive substring match on a text column
    Like(String),
    /// Membership of a single element in a text-array column
    Contains(String),
}

impl Predicate {
    /// Evaluate against a stored value with SQL null semantics.
    pub fn matches(&self, actual: &ColumnValue) -> bool {
        match self {
            Predicate::IsNull => actual.is_null(),
            Predicate::IsNotNull => !actual.is_null(),
            Predicate::Compare(Comparison::Ne, expected) => actual != expected,
            Predicate::Compare(cmp, expected) => actual
                .compare(expected)
                .is_some_and(|ordering| cmp.accepts(ordering)),
            Predicate::In(values) => !actual.is_null() && values.contains(actual),
            Predicate::NotIn(values) => actual.is_null() || !values.contains(actual),
            Predicate::Like(needle) => match actual {
                ColumnValue::Text(text) => text.to_lowercase().contains(&needle.to_lowercase()),
                _ => false,
            },
            Predicate::Contains(element) => match actual {
                ColumnValue::TextArray(items) => items.iter().any(|item| item == element),
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCondition {
    pub column: &'static Column,
    pub predicate: Predicate,
}

/// Look up a queryable column by name.
pub fn queryable_column(
    columns: &'static [Column],
    field: &str,
) -> Result<&'static Column, AppError> {
    columns
        .iter()
        .find(|c| c.name == field && c.queryable)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown field '{}'", field)))
}

/// Bind translated conditions to columns, coercing every operand.
pub fn resolve_conditions(
    columns: &'static [Column],
    conditions: Vec<Condition>,
) -> Result<Vec<ResolvedCondition>, AppError> {
    conditions
        .into_iter()
        .map(|condition| {
            let column = queryable_column(columns, &condition.field)?;
            let predicate = resolve_predicate(column, condition.op, &condition.value)?;
            Ok(ResolvedCondition { column, predicate })
        })
        .collect()
}

fn resolve_predicate(column: &Column, op: Operator, value: &Value) -> Result<Predicate, AppError> {
    let unsupported = || {
        AppError::BadRequest(format!(
            "Operator {:?} is not supported on field '{}'",
            op, column.name
        ))
    };

    let predicate = match op {
        Operator::IsNull => Predicate::IsNull,
        Operator::IsNotNull => Predicate::IsNotNull,
        Operator::Like => match (column.kind, value) {
            (ColumnKind::Text, Value::String(needle)) => Predicate::Like(needle.clone()),
            _ => return Err(unsupported()),
        },
        Operator::In | Operator::Nin => {
            if column.kind == ColumnKind::TextArray {
                return Err(unsupported());
            }
            let values = value
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .map(|item| ColumnValue::from_json(column, item))
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()?
                .unwrap_or_default();
            if op == Operator::In {
                Predicate::In(values)
            } else {
                Predicate::NotIn(values)
            }
        }
        Operator::Eq | Operator::Ne => {
            let operand = ColumnValue::from_json(column, value)?;
            match (op, operand) {
                (Operator::Eq, ColumnValue::Null) => Predicate::IsNull,
                (_, ColumnValue::Null) => Predicate::IsNotNull,
                (Operator::Eq, ColumnValue::Text(element))
                    if column.kind == ColumnKind::TextArray =>
                {
                    Predicate::Contains(element)
                }
                (_, ColumnValue::Text(_)) if column.kind == ColumnKind::TextArray => {
                    return Err(unsupported())
                }
                (Operator::Eq, operand) => Predicate::Compare(Comparison::Eq, operand),
                (_, operand) => Predicate::Compare(Comparison::Ne, operand),
            }
        }
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            if column.kind == ColumnKind::TextArray {
                return Err(unsupported());
            }
            let operand = ColumnValue::from_json(column, value)?;
            if operand.is_null() {
                return Err(unsupported());
            }
            let cmp = match op {
                Operator::Gt => Comparison::Gt,
                Operator::Gte => Comparison::Gte,
                Operator::Lt => Comparison::Lt,
                _ => Comparison::Lte,
            };
            Predicate::Compare(cmp, operand)
        }
    };

    Ok(predicate)
}

/// Resolve the requested sort keys. `id ASC` is always the final key so that
/// pages are stable.
pub fn resolve_order(
    columns: &'static [Column],
    order_by: &[OrderBy],
) -> Result<Vec<(&'static Column, SortOrder)>, AppError> {
    let mut order = order_by
        .iter()
        .map(|o| queryable_column(columns, &o.sort).map(|c| (c, o.order)))
        .collect::<Result<Vec<_>, _>>()?;

    if !order.iter().any(|(c, _)| c.name == "id") {
        order.push((queryable_column(columns, "id")?, SortOrder::Asc));
    }

    Ok(order)
}

/// Total order used by in-process backends: nulls last in both directions.
pub fn compare_for_sort(a: &ColumnValue, b: &ColumnValue, order: SortOrder) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = a.compare(b).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        }
    }
}
