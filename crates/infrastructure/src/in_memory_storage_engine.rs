use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use fieldgate_application::{
    EntityMetadataProvider, FetchPlan, RecordGraph, StorageEngine, StoragePage, StorageQuery,
};
use fieldgate_core::{AppError, AppResult};
use fieldgate_domain::{EntityDescriptor, PRIMARY_KEY_FIELD};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

mod populate;
mod filtering;
mod write;


type Tables = HashMap<String, Vec<Map<String, Value>>>;

/// In-memory storage engine over the registered entity catalog.
///
/// To-one relations are stored as the related primary key and to-many
/// relations as an array of primary keys.
pub struct InMemoryStorageEngine {
    metadata: Arc<dyn EntityMetadataProvider>,
    tables: RwLock<Tables>,
    round_trips: AtomicUsize,
}

impl InMemoryStorageEngine {
    /// Creates an empty engine for the given catalog.
    #[must_use]
    pub fn new(metadata: Arc<dyn EntityMetadataProvider>) -> Self {
        Self {
            metadata,
            tables: RwLock::new(HashMap::new()),
            round_trips: AtomicUsize::new(0),
        }
    }

    /// Returns how many table passes were made since creation.
    ///
    /// A fetch costs one pass for the primary rows plus one per planned
    /// relation chain, independent of the number of rows.
    #[must_use]
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(AtomicOrdering::Relaxed)
    }

    fn descriptor(&self, entity: &str) -> AppResult<&EntityDescriptor> {
        self.metadata
            .entity(entity)
            .map(|registered| registered.descriptor())
            .ok_or_else(|| AppError::NotFound(format!("entity '{entity}' is not registered")))
    }

    fn count_round_trips(&self, passes: usize) {
        self.round_trips.fetch_add(passes, AtomicOrdering::Relaxed);
    }
}

#[async_trait]
impl StorageEngine for InMemoryStorageEngine {
    async fn fetch_page(&self, query: StorageQuery) -> AppResult<StoragePage> {
        let descriptor = self.descriptor(query.entity.as_str())?;
        let tables = self.tables.read().await;
        let rows = tables
            .get(query.entity.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut matched: Vec<&Map<String, Value>> = rows
            .iter()
            .filter(|row| {
                filtering::matches_filters(self.metadata.as_ref(), &tables, descriptor, row, &query.filters)
                    && query
                        .search
                        .as_ref()
                        .is_none_or(|search| filtering::matches_search(row, search))
            })
            .collect();
        filtering::sort_rows(descriptor, &mut matched, &query.ordering);

        let total = matched.len();
        let mut records: Vec<RecordGraph> = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();

        populate::populate_plan(
            self.metadata.as_ref(),
            &tables,
            descriptor,
            &mut records,
            &query.plan,
        );
        self.count_round_trips(1 + query.plan.chains().len());

        tracing::debug!(
            entity = query.entity.as_str(),
            total,
            returned = records.len(),
            "fetched page"
        );

        Ok(StoragePage { records, total })
    }

    async fn fetch_one(
        &self,
        entity: &str,
        record_id: &str,
        plan: &FetchPlan,
    ) -> AppResult<Option<RecordGraph>> {
        let descriptor = self.descriptor(entity)?;
        let tables = self.tables.read().await;

        let Some(row) = find_row(&tables, entity, record_id) else {
            self.count_round_trips(1);
            return Ok(None);
        };

        let mut records = vec![row.clone()];
        populate::populate_plan(self.metadata.as_ref(), &tables, descriptor, &mut records, plan);
        self.count_round_trips(1 + plan.chains().len());

        Ok(records.pop())
    }

    async fn insert(&self, entity: &str, data: Map<String, Value>) -> AppResult<String> {
        let descriptor = self.descriptor(entity)?;
        let mut tables = self.tables.write().await;

        let record_id = Uuid::new_v4().to_string();
        let row = write::new_row(descriptor, &tables, record_id.as_str(), data)?;
        tables.entry(entity.to_owned()).or_default().push(row);
        self.count_round_trips(1);

        Ok(record_id)
    }

    async fn update(
        &self,
        entity: &str,
        record_id: &str,
        data: Map<String, Value>,
    ) -> AppResult<()> {
        let descriptor = self.descriptor(entity)?;
        let mut tables = self.tables.write().await;

        let data = write::checked_values(descriptor, &tables, data)?;
        let row = tables
            .get_mut(entity)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| row_id(row) == Some(record_id))
            })
            .ok_or_else(|| record_not_found(entity, record_id))?;

        for (key, value) in data {
            row.insert(key, value);
        }
        self.count_round_trips(1);

        Ok(())
    }

    async fn delete(&self, entity: &str, record_id: &str) -> AppResult<()> {
        self.descriptor(entity)?;
        let mut tables = self.tables.write().await;

        let rows = tables
            .get_mut(entity)
            .ok_or_else(|| record_not_found(entity, record_id))?;
        let position = rows
            .iter()
            .position(|row| row_id(row) == Some(record_id))
            .ok_or_else(|| record_not_found(entity, record_id))?;
        rows.remove(position);

        write::detach_references(self.metadata.as_ref(), &mut tables, entity, record_id);
        self.count_round_trips(1);

        Ok(())
    }
}

fn row_id(row: &Map<String, Value>) -> Option<&str> {
    row.get(PRIMARY_KEY_FIELD).and_then(Value::as_str)
}

fn find_row<'a>(tables: &'a Tables, entity: &str, record_id: &str) -> Option<&'a Map<String, Value>> {
    tables
        .get(entity)?
        .iter()
        .find(|row| row_id(row) == Some(record_id))
}

fn record_not_found(entity: &str, record_id: &str) -> AppError {
    AppError::NotFound(format!(
        "record '{record_id}' of entity '{entity}' does not exist"
    ))
}
