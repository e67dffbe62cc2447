use fieldgate_domain::{FieldPath, PermissionAction, ViewMode, VisibleFieldSet};

use crate::{PermissionSet, RegisteredEntity};

/// Computes the fields a caller may see or write for one entity and view.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldVisibilityResolver;

impl FieldVisibilityResolver {
    /// Returns the ordered, ancestor-closed set of authorized paths.
    ///
    /// A view without a declared list falls back to every attribute and
    /// relation of the entity. An empty permission set always yields an
    /// empty result.
    #[must_use]
    pub fn resolve(
        &self,
        entity: &RegisteredEntity,
        mode: ViewMode,
        permissions: &PermissionSet,
        action: PermissionAction,
    ) -> VisibleFieldSet {
        if permissions.is_empty() {
            return VisibleFieldSet::default();
        }

        let declared = declared_paths(entity, mode);
        let authorized: Vec<FieldPath> = declared
            .into_iter()
            .filter(|path| permissions.grants(entity.name(), action, path))
            .collect();

        VisibleFieldSet::close_over_ancestors(&authorized)
    }
}

fn declared_paths(entity: &RegisteredEntity, mode: ViewMode) -> Vec<FieldPath> {
    if let Some(paths) = entity.field_spec().paths_for(mode) {
        return paths.to_vec();
    }

    entity
        .descriptor()
        .member_names()
        .into_iter()
        .filter_map(|name| FieldPath::parse(name).ok())
        .collect()
}
