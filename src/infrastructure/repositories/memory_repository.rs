//! In-memory document store.
//!
//! Rows are kept as JSON documents keyed by id and decoded into entities on
//! read. Used for local development without Postgres and by the test suite.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::domain::repository::{
    counter_column, partition_import, unique_violation, IMPORT_BATCH_SIZE,
};
use crate::domain::value_objects::{
    compare_for_sort, resolve_conditions, resolve_order, translate_filter, Column, ColumnValue,
    Condition, Operator, Page, QueryOptions, ResolvedCondition,
};
use crate::domain::{Entity, ImportSummary, Repository};
use crate::shared::error::AppError;

type Document = Map<String, Value>;

#[derive(Debug)]
struct Store {
    next_id: i64,
    rows: BTreeMap<i64, Document>,
}

/// Process-local repository for any [`Entity`].
pub struct InMemoryRepository<E> {
    store: RwLock<Store>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
            _entity: PhantomData,
        }
    }

    fn decode(doc: &Document) -> Result<E, AppError> {
        serde_json::from_value(Value::Object(doc.clone())).map_err(|e| {
            AppError::Internal(format!("Failed to decode {} document: {}", E::TABLE, e))
        })
    }

    fn cell(doc: &Document, column: &Column) -> ColumnValue {
        doc.get(column.name)
            .and_then(|v| ColumnValue::from_json(column, v).ok())
            .unwrap_or(ColumnValue::Null)
    }

    fn matches(doc: &Document, conditions: &[ResolvedCondition]) -> bool {
        conditions
            .iter()
            .all(|c| c.predicate.matches(&Self::cell(doc, c.column)))
    }

    /// First unique column on which `doc` collides with one of `others`.
    fn conflict<'a>(
        doc: &Document,
        id: i64,
        others: impl Iterator<Item = (i64, &'a Document)> + Clone,
    ) -> Option<&'static str> {
        E::UNIQUE.iter().copied().find(|column| {
            let Some(value) = doc.get(*column).filter(|v| !v.is_null()) else {
                return false;
            };
            others
                .clone()
                .any(|(other_id, other)| other_id != id && other.get(*column) == Some(value))
        })
    }

    fn new_document(id: i64, new: &E::New) -> Document {
        let now = ColumnValue::Timestamp(Utc::now()).to_json();
        let mut doc: Document = E::COLUMNS
            .iter()
            .map(|c| (c.name.to_string(), Value::Null))
            .collect();
        for (name, value) in E::new_values(new) {
            doc.insert(name.to_string(), value.to_json());
        }
        doc.insert("id".into(), Value::from(id));
        doc.insert("created_at".into(), now.clone());
        doc.insert("updated_at".into(), now);
        doc
    }

    fn insert_batch(&self, records: &[E::New]) -> Result<u64, AppError> {
        let mut store = self.store.write();
        let mut staged: Vec<(i64, Document)> = Vec::with_capacity(records.len());

        for (offset, record) in records.iter().enumerate() {
            let id = store.next_id + offset as i64;
            let doc = Self::new_document(id, record);
            let existing = store.rows.iter().map(|(id, doc)| (*id, doc));
            let pending = staged.iter().map(|(id, doc)| (*id, doc));
            if let Some(column) = Self::conflict(&doc, id, existing.chain(pending)) {
                return Err(unique_violation::<E>(column));
            }
            staged.push((id, doc));
        }

        let count = staged.len() as u64;
        store.next_id += staged.len() as i64;
        store.rows.extend(staged);
        Ok(count)
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn get_all(&self) -> Result<Vec<E>, AppError> {
        debug!("Fetching all documents");
        let store = self.store.read();
        store.rows.values().map(Self::decode).collect()
    }

    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn get_by_id(&self, id: i64) -> Result<Option<E>, AppError> {
        debug!("Fetching document by id");
        let store = self.store.read();
        store.rows.get(&id).map(Self::decode).transpose()
    }

    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn get_by_field(&self, field: &str, value: &Value) -> Result<Option<E>, AppError> {
        debug!("Fetching document by field");
        let conditions = resolve_conditions(
            E::COLUMNS,
            vec![Condition {
                field: field.to_string(),
                op: Operator::Eq,
                value: value.clone(),
            }],
        )?;

        let store = self.store.read();
        store
            .rows
            .values()
            .find(|doc| Self::matches(doc, &conditions))
            .map(Self::decode)
            .transpose()
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

        let store = self.store.read();
        let mut matched: Vec<&Document> = store
            .rows
            .values()
            .filter(|doc| Self::matches(doc, &conditions))
            .collect();

        matched.sort_by(|a, b| {
            order
                .iter()
                .map(|(column, direction)| {
                    compare_for_sort(&Self::cell(a, column), &Self::cell(b, column), *direction)
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total = matched.len() as u64;
        let data = matched
            .into_iter()
            .skip(window.offset as usize)
            .take(window.per_page as usize)
            .map(Self::decode)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(data, total, window))
    }

    #[instrument(skip(self, new), fields(table = E::TABLE), err)]
    async fn create(&self, new: E::New) -> Result<E, AppError> {
        debug!("Inserting document");
        let mut store = self.store.write();
        let id = store.next_id;
        let doc = Self::new_document(id, &new);

        let existing = store.rows.iter().map(|(id, doc)| (*id, doc));
        if let Some(column) = Self::conflict(&doc, id, existing) {
            return Err(unique_violation::<E>(column));
        }

        let entity = Self::decode(&doc)?;
        store.next_id += 1;
        store.rows.insert(id, doc);
        Ok(entity)
    }

    #[instrument(skip(self, patch), fields(table = E::TABLE), err)]
    async fn update(&self, id: i64, patch: E::Patch) -> Result<E, AppError> {
        debug!("Updating document");
        let mut store = self.store.write();
        let mut doc = store
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", E::NAME, id)))?;

        for (name, value) in E::patch_values(&patch) {
            doc.insert(name.to_string(), value.to_json());
        }
        doc.insert(
            "updated_at".into(),
            ColumnValue::Timestamp(Utc::now()).to_json(),
        );

        let existing = store.rows.iter().map(|(id, doc)| (*id, doc));
        if let Some(column) = Self::conflict(&doc, id, existing) {
            return Err(unique_violation::<E>(column));
        }

        let entity = Self::decode(&doc)?;
        store.rows.insert(id, doc);
        Ok(entity)
    }

    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn increment(&self, id: i64, column: &'static str) -> Result<E, AppError> {
        let column = counter_column::<E>(column)?;
        let mut store = self.store.write();
        let doc = store
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", E::NAME, id)))?;

        let current = match Self::cell(doc, column) {
            ColumnValue::Int(v) => v,
            _ => 0,
        };
        doc.insert(column.name.to_string(), Value::from(current + 1));
        doc.insert(
            "updated_at".into(),
            ColumnValue::Timestamp(Utc::now()).to_json(),
        );
        Self::decode(doc)
    }

    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn delete(&self, id: i64) -> Result<(), AppError> {
        debug!("Deleting document");
        self.store
            .write()
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", E::NAME, id)))
    }

    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn delete_all(&self) -> Result<u64, AppError> {
        debug!("Deleting all documents");
        let mut store = self.store.write();
        let count = store.rows.len() as u64;
        store.rows.clear();
        Ok(count)
    }

    #[instrument(skip(self, records), fields(table = E::TABLE, count = records.len()), err)]
    async fn import(&self, records: Vec<E::New>) -> Result<ImportSummary, AppError> {
        debug!("Importing documents");
        let (fresh, skipped) = partition_import::<E, _>(self, records).await?;

        let mut inserted = 0;
        for batch in fresh.chunks(IMPORT_BATCH_SIZE) {
            inserted += self.insert_batch(batch)?;
        }

        Ok(ImportSummary { inserted, skipped })
    }
}
