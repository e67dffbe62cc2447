use std::collections::BTreeSet;

use fieldgate_domain::{EntityMember, PATH_DELIMITER, VisibleFieldSet};

use crate::metadata_ports::resolve_field_path;
use crate::{EntityMetadataProvider, RegisteredEntity};

/// Relations to populate in the same fetch as the primary rows.
///
/// Keys are relation chains joined with `.`, e.g. `author` or `book.author`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchPlan {
    /// Chains made only of to-one links, fetched with a join.
    pub eager_single: BTreeSet<String>,
    /// Chains with at least one to-many link, fetched with a batched prefetch.
    pub eager_many: BTreeSet<String>,
}

impl FetchPlan {
    /// Returns whether nothing has to be populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.eager_single.is_empty() && self.eager_many.is_empty()
    }

    /// Returns whether `chain` is planned under either strategy.
    #[must_use]
    pub fn contains(&self, chain: &str) -> bool {
        self.eager_single.contains(chain) || self.eager_many.contains(chain)
    }

    /// Returns every planned chain, shortest first.
    #[must_use]
    pub fn chains(&self) -> Vec<&str> {
        let mut chains: Vec<&str> = self
            .eager_single
            .iter()
            .chain(self.eager_many.iter())
            .map(String::as_str)
            .collect();
        chains.sort_by(|left, right| {
            left.matches(PATH_DELIMITER)
                .count()
                .cmp(&right.matches(PATH_DELIMITER).count())
                .then_with(|| left.cmp(right))
        });
        chains
    }
}

/// Derives the eager-fetch plan from a visible field set.
#[derive(Clone, Copy)]
pub struct RelationPlanner<'a> {
    metadata: &'a dyn EntityMetadataProvider,
}

impl<'a> RelationPlanner<'a> {
    /// Creates a planner over the entity catalog.
    #[must_use]
    pub fn new(metadata: &'a dyn EntityMetadataProvider) -> Self {
        Self { metadata }
    }

    /// Plans every relation traversed by a multi-segment visible path.
    ///
    /// Each relation chain lands in exactly one set, no matter how many
    /// visible paths traverse it.
    #[must_use]
    pub fn plan(&self, entity: &RegisteredEntity, visible: &VisibleFieldSet) -> FetchPlan {
        let mut plan = FetchPlan::default();

        for path in visible.paths().iter().filter(|path| path.is_nested()) {
            let Some(resolved) = resolve_field_path(self.metadata, entity.descriptor(), path)
            else {
                tracing::debug!(entity = entity.name(), path = %path, "skipping unresolvable path");
                continue;
            };

            let mut chain = String::new();
            let mut crosses_to_many = false;

            // The last segment is only read, never traversed.
            for (segment, step) in path.segments().iter().zip(&resolved).take(path.depth() - 1) {
                let EntityMember::Relation(relation) = step.member else {
                    break;
                };

                if !chain.is_empty() {
                    chain.push(PATH_DELIMITER);
                }
                chain.push_str(segment);
                crosses_to_many |= relation.is_to_many();

                if crosses_to_many {
                    plan.eager_many.insert(chain.clone());
                } else {
                    plan.eager_single.insert(chain.clone());
                }
            }
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use fieldgate_domain::{
        AttributeDescriptor, Cardinality, EntityDescriptor, EntityFieldSpec, FieldPath, FieldType,
        RelationDescriptor, VisibleFieldSet,
    };

    use super::RelationPlanner;
    use crate::{EntityMetadataProvider, EntityRegistry};

    fn path(value: &str) -> FieldPath {
        FieldPath::parse(value).unwrap_or_else(|_| unreachable!())
    }

    fn text(name: &str) -> AttributeDescriptor {
        AttributeDescriptor::new(name, FieldType::Text).unwrap_or_else(|_| unreachable!())
    }

    fn relation(name: &str, cardinality: Cardinality, target: &str) -> RelationDescriptor {
        RelationDescriptor::new(name, cardinality, target).unwrap_or_else(|_| unreachable!())
    }

    fn entity(
        name: &str,
        attributes: Vec<AttributeDescriptor>,
        relations: Vec<RelationDescriptor>,
    ) -> EntityDescriptor {
        EntityDescriptor::new(name, attributes, relations, Vec::new())
            .unwrap_or_else(|_| unreachable!())
    }

    fn registry() -> EntityRegistry {
        EntityRegistry::builder()
            .register(
                entity("author", vec![text("name"), text("email")], Vec::new()),
                EntityFieldSpec::default(),
            )
            .register(entity("tag", vec![text("name")], Vec::new()), EntityFieldSpec::default())
            .register(
                entity(
                    "book",
                    vec![text("title")],
                    vec![
                        relation("author", Cardinality::ToOne, "author"),
                        relation("tags", Cardinality::ToMany, "tag"),
                    ],
                ),
                EntityFieldSpec::default(),
            )
            .register(
                entity(
                    "review",
                    vec![text("body")],
                    vec![relation("book", Cardinality::ToOne, "book")],
                ),
                EntityFieldSpec::default(),
            )
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn plan_splits_relations_by_cardinality() {
        let registry = registry();
        let book = registry.entity("book").unwrap_or_else(|| unreachable!());
        let visible = VisibleFieldSet::close_over_ancestors(&[
            path("id"),
            path("title"),
            path("author.name"),
            path("author.email"),
            path("tags.name"),
        ]);

        let plan = RelationPlanner::new(&registry).plan(book, &visible);

        assert_eq!(plan.eager_single.iter().collect::<Vec<_>>(), vec!["author"]);
        assert_eq!(plan.eager_many.iter().collect::<Vec<_>>(), vec!["tags"]);
    }

    #[test]
    fn relation_without_descendants_is_not_planned() {
        let registry = registry();
        let book = registry.entity("book").unwrap_or_else(|| unreachable!());
        let visible = VisibleFieldSet::close_over_ancestors(&[path("id"), path("author")]);

        assert!(RelationPlanner::new(&registry).plan(book, &visible).is_empty());
    }

    #[test]
    fn nested_chains_inherit_to_many_links() {
        let registry = registry();
        let review = registry.entity("review").unwrap_or_else(|| unreachable!());
        let visible = VisibleFieldSet::close_over_ancestors(&[
            path("book.author.name"),
            path("book.tags.name"),
        ]);

        let plan = RelationPlanner::new(&registry).plan(review, &visible);

        assert_eq!(
            plan.eager_single.iter().collect::<Vec<_>>(),
            vec!["book", "book.author"]
        );
        assert_eq!(plan.eager_many.iter().collect::<Vec<_>>(), vec!["book.tags"]);
        assert_eq!(plan.chains(), vec!["book", "book.author", "book.tags"]);
    }
}
