//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod metadata;
mod query;
mod security;
mod view;

pub use metadata::{
    AttributeDescriptor, Cardinality, EntityDescriptor, EntityMember, FieldType,
    PRIMARY_KEY_FIELD, RelationDescriptor,
};
pub use query::{
    Combinator, FilterClause, LookupOperator, OrderingKey, SearchClause, SortDirection,
};
pub use security::{PermissionAction, PermissionToken, RoleDefinition};
pub use view::{EntityFieldSpec, FieldPath, PATH_DELIMITER, ViewMode, VisibleFieldSet};
