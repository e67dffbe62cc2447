use async_trait::async_trait;
use fieldgate_core::AppResult;
use fieldgate_domain::{FilterClause, OrderingKey, SearchClause};
use serde_json::{Map, Value};

use crate::FetchPlan;

/// Fetched record with planned relations populated as nested objects.
///
/// Unplanned to-one relations hold the related primary key and unplanned
/// to-many relations hold an array of primary keys.
pub type RecordGraph = Map<String, Value>;

/// Everything the storage engine needs to answer one list request.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageQuery {
    /// Entity the primary rows belong to.
    pub entity: String,
    /// Relations to populate in the same fetch.
    pub plan: FetchPlan,
    /// Compiled filter predicates, combined with AND.
    pub filters: Vec<FilterClause>,
    /// Optional free-text search.
    pub search: Option<SearchClause>,
    /// Ordering of the primary rows.
    pub ordering: Vec<OrderingKey>,
    /// Number of rows skipped.
    pub offset: usize,
    /// Maximum rows returned.
    pub limit: usize,
}

/// Page of record graphs plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq)]
pub struct StoragePage {
    /// Records in the requested window.
    pub records: Vec<RecordGraph>,
    /// Total rows matching the filters, ignoring the window.
    pub total: usize,
}

/// Persistence port used by the CRUD service.
///
/// Implementations must populate N planned relations for M rows with a
/// bounded number of round trips, never one per row.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Returns one page of primary rows with planned relations populated.
    async fn fetch_page(&self, query: StorageQuery) -> AppResult<StoragePage>;

    /// Returns one record by primary key with planned relations populated.
    async fn fetch_one(
        &self,
        entity: &str,
        record_id: &str,
        plan: &FetchPlan,
    ) -> AppResult<Option<RecordGraph>>;

    /// Inserts a record and returns its generated primary key.
    async fn insert(&self, entity: &str, data: Map<String, Value>) -> AppResult<String>;

    /// Merges `data` into an existing record.
    async fn update(
        &self,
        entity: &str,
        record_id: &str,
        data: Map<String, Value>,
    ) -> AppResult<()>;

    /// Deletes an existing record.
    async fn delete(&self, entity: &str, record_id: &str) -> AppResult<()>;
}
