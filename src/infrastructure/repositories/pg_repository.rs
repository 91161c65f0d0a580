//! PostgreSQL Repository Implementation
//!
//! One generic implementation of `Repository<E>` for every entity. SQL is
//! assembled with `sqlx::QueryBuilder`; identifiers only ever come from the
//! entity's static column list and every value is a bind parameter.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::domain::repository::{
    counter_column, partition_import, unique_violation, IMPORT_BATCH_SIZE,
};
use crate::domain::value_objects::{
    resolve_conditions, resolve_order, translate_filter, ColumnKind, ColumnValue, Condition,
    Operator, Page, Predicate, QueryOptions, ResolvedCondition, SortOrder,
};
use crate::domain::{Entity, ImportSummary, Repository};
use crate::shared::error::AppError;

/// PostgreSQL repository for any [`Entity`].
pub struct PgRepository<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for PgRepository<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> PgRepository<E> {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    fn column_kind(name: &str) -> Result<ColumnKind, AppError> {
        E::column(name).map(|c| c.kind).ok_or_else(|| {
            AppError::Internal(format!("{} has no column '{}'", E::TABLE, name))
        })
    }

    async fn insert_batch(&self, records: &[E::New]) -> Result<u64, AppError> {
        let Some(first) = records.first() else {
            return Ok(0);
        };

        let columns: Vec<&'static str> = E::new_values(first).into_iter().map(|(n, _)| n).collect();
        let kinds = columns
            .iter()
            .map(|name| Self::column_kind(name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO {} ({}) VALUES ",
            E::TABLE,
            columns.join(", ")
        ));
        for (row, record) in records.iter().enumerate() {
            if row > 0 {
                qb.push(", ");
            }
            qb.push("(");
            for (i, ((_, value), kind)) in E::new_values(record).into_iter().zip(&kinds).enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(&mut qb, *kind, value);
            }
            qb.push(")");
        }

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_write_error::<E>)?;

        Ok(result.rows_affected())
    }
}

/// Bind a value, keeping SQL nulls typed after the column.
fn push_value(qb: &mut QueryBuilder<'_, Postgres>, kind: ColumnKind, value: ColumnValue) {
    match value {
        ColumnValue::Null => match kind {
            ColumnKind::Int => qb.push_bind(None::<i64>),
            ColumnKind::Text => qb.push_bind(None::<String>),
            ColumnKind::Uuid => qb.push_bind(None::<Uuid>),
            ColumnKind::Timestamp => qb.push_bind(None::<DateTime<Utc>>),
            ColumnKind::TextArray => qb.push_bind(None::<Vec<String>>),
        },
        ColumnValue::Int(v) => qb.push_bind(v),
        ColumnValue::Text(v) => qb.push_bind(v),
        ColumnValue::Uuid(v) => qb.push_bind(v),
        ColumnValue::Timestamp(v) => qb.push_bind(v),
        ColumnValue::TextArray(v) => qb.push_bind(v),
    };
}

/// Escape `%`, `_` and `\` for use inside an ILIKE pattern.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_conditions(qb: &mut QueryBuilder<'_, Postgres>, conditions: &[ResolvedCondition]) {
    for (i, condition) in conditions.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        push_predicate(qb, condition);
    }
}

fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, condition: &ResolvedCondition) {
    let column = condition.column.name;
    let kind = condition.column.kind;

    match &condition.predicate {
        Predicate::IsNull => {
            qb.push(column).push(" IS NULL");
        }
        Predicate::IsNotNull => {
            qb.push(column).push(" IS NOT NULL");
        }
        Predicate::Compare(cmp, value) => {
            qb.push(column).push(cmp.sql());
            push_value(qb, kind, value.clone());
        }
        Predicate::In(values) if values.is_empty() => {
            qb.push("FALSE");
        }
        Predicate::In(values) => {
            qb.push(column).push(" IN (");
            push_list(qb, kind, values);
            qb.push(")");
        }
        Predicate::NotIn(values) if values.is_empty() => {
            qb.push("TRUE");
        }
        Predicate::NotIn(values) => {
            qb.push("(")
                .push(column)
                .push(" IS NULL OR ")
                .push(column)
                .push(" NOT IN (");
            push_list(qb, kind, values);
            qb.push("))");
        }
        Predicate::Like(needle) => {
            qb.push(column).push(" ILIKE ");
            qb.push_bind(format!("%{}%", escape_like(needle)));
            qb.push(" ESCAPE '\\'");
        }
        Predicate::Contains(element) => {
            qb.push_bind(element.clone());
            qb.push(" = ANY(").push(column).push(")");
        }
    }
}

fn push_list(qb: &mut QueryBuilder<'_, Postgres>, kind: ColumnKind, values: &[ColumnValue]) {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(qb, kind, value.clone());
    }
}

/// Map unique violations to 400, everything else stays a database error.
fn map_write_error<E: Entity>(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            let constraint = db_err.constraint().unwrap_or_default();
            let column = E::UNIQUE
                .iter()
                .find(|col| constraint.contains(*col))
                .copied()
                .unwrap_or("value");
            unique_violation::<E>(column)
        }
        _ => AppError::Database(e),
    }
}

fn not_found<E: Entity>(id: i64) -> AppError {
    AppError::NotFound(format!("{} {} not found", E::NAME, id))
}

#[async_trait]
impl<E: Entity> Repository<E> for PgRepository<E> {
    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn get_all(&self) -> Result<Vec<E>, AppError> {
        debug!("Fetching all rows");
        let sql = format!("SELECT * FROM {} ORDER BY id", E::TABLE);
        let rows = sqlx::query_as::<_, E>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn get_by_id(&self, id: i64) -> Result<Option<E>, AppError> {
        debug!("Fetching row by id");
        let sql = format!("SELECT * FROM {} WHERE id = $1", E::TABLE);
        let row = sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn get_by_field(&self, field: &str, value: &Value) -> Result<Option<E>, AppError> {
        debug!("Fetching row by field");
        let conditions = resolve_conditions(
            E::COLUMNS,
            vec![Condition {
                field: field.to_string(),
                op: Operator::Eq,
                value: value.clone(),
            }],
        )?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT * FROM {}", E::TABLE));
        push_conditions(&mut qb, &conditions);
        qb.push(" ORDER BY id LIMIT 1");

        let row = qb.build_query_as::<E>().fetch_optional(&self.pool).await?;
        Ok(row)
    }

    #[instrument(skip(self, options), fields(table = E::TABLE), err)]
    async fn find_by_query(&self, options: &QueryOptions) -> Result<Page<E>, AppError> {
        debug!(?options, "Running query");
        let window = options.window();
        let conditions = match &options.filter {
            Some(filter) => resolve_conditions(E::COLUMNS, translate_filter(filter)?)?,
            None => Vec::new(),
        };
        let order = resolve_order(E::COLUMNS, &options.order_by)?;

        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", E::TABLE));
        push_conditions(&mut count, &conditions);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT * FROM {}", E::TABLE));
        push_conditions(&mut qb, &conditions);
        qb.push(" ORDER BY ");
        for (i, (column, direction)) in order.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(column.name).push(match direction {
                SortOrder::Asc => " ASC NULLS LAST",
                SortOrder::Desc => " DESC NULLS LAST",
            });
        }
        qb.push(" LIMIT ")
            .push_bind(window.per_page as i64)
            .push(" OFFSET ")
            .push_bind(window.offset as i64);

        let rows = qb.build_query_as::<E>().fetch_all(&self.pool).await?;
        Ok(Page::new(rows, total.max(0) as u64, window))
    }

    #[instrument(skip(self, new), fields(table = E::TABLE), err)]
    async fn create(&self, new: E::New) -> Result<E, AppError> {
        debug!("Inserting row");
        let values = E::new_values(&new);

        let mut qb = QueryBuilder::<Postgres>::new(format!("INSERT INTO {} (", E::TABLE));
        for (i, (name, _)) in values.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(*name);
        }
        qb.push(") VALUES (");
        for (i, (name, value)) in values.into_iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, Self::column_kind(name)?, value);
        }
        qb.push(") RETURNING *");

        qb.build_query_as::<E>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error::<E>)
    }

    #[instrument(skip(self, patch), fields(table = E::TABLE), err)]
    async fn update(&self, id: i64, patch: E::Patch) -> Result<E, AppError> {
        debug!("Updating row");
        let mut qb = QueryBuilder::<Postgres>::new(format!("UPDATE {} SET ", E::TABLE));
        for (name, value) in E::patch_values(&patch) {
            qb.push(name).push(" = ");
            push_value(&mut qb, Self::column_kind(name)?, value);
            qb.push(", ");
        }
        qb.push("updated_at = NOW() WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        qb.build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error::<E>)?
            .ok_or_else(|| not_found::<E>(id))
    }

    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn increment(&self, id: i64, column: &'static str) -> Result<E, AppError> {
        let column = counter_column::<E>(column)?;
        let sql = format!(
            "UPDATE {table} SET {col} = {col} + 1, updated_at = NOW() WHERE id = $1 RETURNING *",
            table = E::TABLE,
            col = column.name
        );

        sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found::<E>(id))
    }

    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn delete(&self, id: i64) -> Result<(), AppError> {
        debug!("Deleting row");
        let sql = format!("DELETE FROM {} WHERE id = $1", E::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(not_found::<E>(id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn delete_all(&self) -> Result<u64, AppError> {
        debug!("Deleting all rows");
        let sql = format!("DELETE FROM {}", E::TABLE);
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, records), fields(table = E::TABLE, count = records.len()), err)]
    async fn import(&self, records: Vec<E::New>) -> Result<ImportSummary, AppError> {
        debug!("Importing rows");
        let (fresh, skipped) = partition_import::<E, _>(self, records).await?;

        let mut inserted = 0;
        for batch in fresh.chunks(IMPORT_BATCH_SIZE) {
            match self.insert_batch(batch).await {
                Ok(count) => inserted += count,
                Err(e) => {
                    error!(inserted, error = %e, "Import batch failed, earlier batches remain committed");
                    return Err(e);
                }
            }
        }

        Ok(ImportSummary { inserted, skipped })
    }
}
