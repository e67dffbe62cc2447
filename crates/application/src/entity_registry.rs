use std::collections::BTreeMap;

use fieldgate_core::{AppError, AppResult};
use fieldgate_domain::{EntityDescriptor, EntityFieldSpec, FieldPath};

use crate::metadata_ports::resolve_field_path;
use crate::{EntityMetadataProvider, RegisteredEntity};

/// Immutable catalog of entities registered once during bootstrap.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<String, RegisteredEntity>,
}

/// Collects entity registrations before validation.
#[derive(Debug, Default)]
pub struct EntityRegistryBuilder {
    registrations: Vec<RegisteredEntity>,
}

impl EntityRegistry {
    /// Starts an explicit registration sequence.
    #[must_use]
    pub fn builder() -> EntityRegistryBuilder {
        EntityRegistryBuilder::default()
    }

    /// Returns the number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns whether no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn validate(&self) -> AppResult<()> {
        for entity in self.entities.values() {
            let descriptor = entity.descriptor();

            for relation in descriptor.relations() {
                if !self.entities.contains_key(relation.target_entity()) {
                    return Err(AppError::Configuration(format!(
                        "relation '{}.{}' targets unknown entity '{}'",
                        descriptor.name(),
                        relation.field_name(),
                        relation.target_entity()
                    )));
                }
            }

            for path in entity.field_spec().all_paths() {
                self.validate_path(descriptor, path)?;
            }
        }

        Ok(())
    }

    fn validate_path(&self, descriptor: &EntityDescriptor, path: &FieldPath) -> AppResult<()> {
        if descriptor.member(path.head()).is_none() {
            return Err(AppError::Configuration(format!(
                "field path '{path}' of entity '{}' does not start with a known attribute or relation",
                descriptor.name()
            )));
        }

        if resolve_field_path(self, descriptor, path).is_none() {
            return Err(AppError::Configuration(format!(
                "field path '{path}' of entity '{}' does not resolve segment by segment",
                descriptor.name()
            )));
        }

        Ok(())
    }
}

impl EntityRegistryBuilder {
    /// Adds one entity with its field spec.
    #[must_use]
    pub fn register(mut self, descriptor: EntityDescriptor, field_spec: EntityFieldSpec) -> Self {
        self.registrations
            .push(RegisteredEntity::new(descriptor, field_spec));
        self
    }

    /// Validates every registration and freezes the catalog.
    pub fn build(self) -> AppResult<EntityRegistry> {
        let mut entities = BTreeMap::new();

        for registration in self.registrations {
            let name = registration.name().to_owned();
            if entities.insert(name.clone(), registration).is_some() {
                return Err(AppError::Configuration(format!(
                    "entity '{name}' is registered more than once"
                )));
            }
        }

        let registry = EntityRegistry { entities };
        registry.validate()?;

        tracing::debug!(entity_count = registry.len(), "entity registry built");
        Ok(registry)
    }
}

impl EntityMetadataProvider for EntityRegistry {
    fn entity(&self, name: &str) -> Option<&RegisteredEntity> {
        self.entities.get(name)
    }

    fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(String::as_str).collect()
    }
}
