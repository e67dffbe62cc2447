use std::sync::Arc;

use fieldgate_core::{AppError, AppResult, RoleProvider};
use fieldgate_domain::{
    EntityMember, FieldPath, FilterClause, OrderingKey, PRIMARY_KEY_FIELD, PermissionAction,
    SearchClause, SortDirection, ViewMode, VisibleFieldSet,
};
use serde_json::{Map, Value};

use crate::{
    EntityMetadataProvider, FieldVisibilityResolver, FilterCompiler, MergedParameters,
    PermissionResolver, PermissionSet, RegisteredEntity, RelationPlanner, RequestParameters,
    SerializationSchemaBuilder, StorageEngine, StorageQuery,
};

mod read;
mod write;


/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// List request for one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListRequest {
    /// Raw query-string and body parameters.
    pub parameters: RequestParameters,
}

/// How an update treats writable fields missing from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Missing writable fields are cleared.
    Replace,
    /// Missing fields keep their stored values.
    Merge,
}

/// One rendered page of records.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPage {
    /// Rendered records.
    pub records: Vec<Value>,
    /// One-based page number.
    pub page: usize,
    /// Records per page.
    pub page_size: usize,
    /// Total records matching the filters.
    pub total_items: usize,
    /// Total number of pages, at least one.
    pub total_pages: usize,
}

impl RecordPage {
    /// Returns whether a page follows this one.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Returns whether a page precedes this one.
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Application service orchestrating permission-shaped CRUD requests.
#[derive(Clone)]
pub struct CrudService {
    metadata: Arc<dyn EntityMetadataProvider>,
    permission_resolver: PermissionResolver,
    filter_compiler: FilterCompiler,
    storage: Arc<dyn StorageEngine>,
}

impl CrudService {
    /// Creates a new CRUD service.
    #[must_use]
    pub fn new(
        metadata: Arc<dyn EntityMetadataProvider>,
        permission_resolver: PermissionResolver,
        filter_compiler: FilterCompiler,
        storage: Arc<dyn StorageEngine>,
    ) -> Self {
        Self {
            metadata,
            permission_resolver,
            filter_compiler,
            storage,
        }
    }

    /// Returns registered entity names.
    #[must_use]
    pub fn entity_names(&self) -> Vec<String> {
        self.metadata
            .entity_names()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    fn registered_entity(&self, entity_name: &str) -> AppResult<&RegisteredEntity> {
        self.metadata
            .entity(entity_name)
            .ok_or_else(|| AppError::NotFound(format!("entity '{entity_name}' is not registered")))
    }

    fn visible_fields(
        entity: &RegisteredEntity,
        mode: ViewMode,
        permissions: &PermissionSet,
        action: PermissionAction,
    ) -> AppResult<VisibleFieldSet> {
        let visible = FieldVisibilityResolver.resolve(entity, mode, permissions, action);
        if visible.is_empty() {
            return Err(AppError::Forbidden(format!(
                "no field of '{}' may be {} by this caller",
                entity.name(),
                match action {
                    PermissionAction::Read => "read",
                    PermissionAction::Write | PermissionAction::Delete => "written",
                }
            )));
        }

        Ok(visible)
    }

    fn render_one(
        &self,
        entity: &RegisteredEntity,
        visible: &VisibleFieldSet,
        record: &Map<String, Value>,
    ) -> Value {
        SerializationSchemaBuilder::new(self.metadata.as_ref())
            .build(entity, visible)
            .render(record)
    }
}

fn page_parameter(parameters: &MergedParameters, key: &str) -> Option<usize> {
    parameters
        .first(key)
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
}
