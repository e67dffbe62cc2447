//! Application services and ports.

#![forbid(unsafe_code)]

mod crud_service;
mod entity_registry;
mod field_visibility;
mod filter_compiler;
mod metadata_ports;
mod permission_resolver;
mod relation_planner;
mod schema_builder;
mod storage_ports;

pub use crud_service::{
    CrudService, DEFAULT_PAGE_SIZE, ListRequest, MAX_PAGE_SIZE, RecordPage, UpdateMode,
};
pub use entity_registry::{EntityRegistry, EntityRegistryBuilder};
pub use field_visibility::FieldVisibilityResolver;
pub use filter_compiler::{
    ARRAY_MARKER, COMBINATOR_SUFFIX, DEFAULT_IGNORED_FIELD_TYPES, FilterCompiler, LookupTable,
    MergedParameters, RESERVED_PARAMETERS, RequestParameters, VALUE_SEPARATOR, merge_parameters,
};
pub use metadata_ports::{
    EntityMetadataProvider, RegisteredEntity, ResolvedSegment, resolve_field_path,
};
pub use permission_resolver::{PermissionResolver, PermissionSet, RoleTable};
pub use relation_planner::{FetchPlan, RelationPlanner};
pub use schema_builder::{SchemaNode, SerializationSchema, SerializationSchemaBuilder};
pub use storage_ports::{RecordGraph, StorageEngine, StoragePage, StorageQuery};
