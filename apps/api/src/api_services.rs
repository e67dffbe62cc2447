use std::sync::Arc;

use fieldgate_application::{
    CrudService, EntityMetadataProvider, FilterCompiler, PermissionResolver, StorageEngine,
};
use fieldgate_core::AppError;
use fieldgate_infrastructure::{Catalog, InMemoryStorageEngine, load_catalog};

use crate::api_config::ApiConfig;
use crate::state::AppState;

/// Services assembled at startup.
pub struct ServiceSet {
    pub app_state: AppState,
    pub storage_engine: Arc<InMemoryStorageEngine>,
}

pub fn build_services(config: &ApiConfig) -> Result<ServiceSet, AppError> {
    let catalog = load_catalog(config.catalog_path.as_path())?;
    Ok(services_from_catalog(
        catalog,
        FilterCompiler::default().with_ignored_field_types(config.ignored_field_types.clone()),
    ))
}

pub fn services_from_catalog(catalog: Catalog, filter_compiler: FilterCompiler) -> ServiceSet {
    let metadata: Arc<dyn EntityMetadataProvider> = Arc::new(catalog.registry);
    let storage_engine = Arc::new(InMemoryStorageEngine::new(metadata.clone()));
    let storage: Arc<dyn StorageEngine> = storage_engine.clone();

    let crud_service = CrudService::new(
        metadata,
        PermissionResolver::new(Arc::new(catalog.roles)),
        filter_compiler,
        storage,
    );

    ServiceSet {
        app_state: AppState { crud_service },
        storage_engine,
    }
}
