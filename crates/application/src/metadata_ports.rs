use fieldgate_domain::{EntityDescriptor, EntityFieldSpec, EntityMember, FieldPath};

/// Entity metadata registered at bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredEntity {
    descriptor: EntityDescriptor,
    field_spec: EntityFieldSpec,
}

impl RegisteredEntity {
    /// Pairs structural metadata with the declared field spec.
    #[must_use]
    pub fn new(descriptor: EntityDescriptor, field_spec: EntityFieldSpec) -> Self {
        Self {
            descriptor,
            field_spec,
        }
    }

    /// Returns the entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Returns attributes and relations of the entity.
    #[must_use]
    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    /// Returns the declared summary and detail field paths.
    #[must_use]
    pub fn field_spec(&self) -> &EntityFieldSpec {
        &self.field_spec
    }
}

/// Read-only provider of entity metadata.
///
/// Answers synchronously and is treated as static for the duration of a
/// request.
pub trait EntityMetadataProvider: Send + Sync {
    /// Looks up an entity by name.
    fn entity(&self, name: &str) -> Option<&RegisteredEntity>;

    /// Lists registered entity names in a stable order.
    fn entity_names(&self) -> Vec<&str>;
}

/// One segment of a field path resolved against entity metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSegment<'a> {
    /// Entity that owns the member.
    pub owner: &'a EntityDescriptor,
    /// Attribute or relation named by the segment.
    pub member: EntityMember<'a>,
}

/// Resolves every segment of `path` starting at `root`.
///
/// Returns `None` when a segment is unknown, when an attribute is followed by
/// more segments, or when a relation target is not registered.
#[must_use]
pub fn resolve_field_path<'a>(
    metadata: &'a dyn EntityMetadataProvider,
    root: &'a EntityDescriptor,
    path: &FieldPath,
) -> Option<Vec<ResolvedSegment<'a>>> {
    let mut resolved = Vec::with_capacity(path.depth());
    let mut owner = root;

    for (index, segment) in path.segments().iter().enumerate() {
        let member = owner.member(segment.as_str())?;
        resolved.push(ResolvedSegment { owner, member });

        let is_last = index + 1 == path.depth();
        match member {
            EntityMember::Attribute(_) if !is_last => return None,
            EntityMember::Attribute(_) => {}
            EntityMember::Relation(relation) => {
                if !is_last {
                    owner = metadata.entity(relation.target_entity())?.descriptor();
                }
            }
        }
    }

    Some(resolved)
}
