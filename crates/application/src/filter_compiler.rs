use std::collections::{BTreeMap, BTreeSet};

use fieldgate_domain::{
    Combinator, EntityDescriptor, EntityMember, FieldPath, FieldType, FilterClause,
    LookupOperator, OrderingKey, PATH_DELIMITER, PRIMARY_KEY_FIELD, SearchClause, SortDirection,
};
use serde_json::{Map, Value};

use crate::{EntityMetadataProvider, RegisteredEntity};

mod lookup_table;
mod parameters;

#[cfg(test)]
mod tests;

pub use lookup_table::LookupTable;
pub use parameters::{
    ARRAY_MARKER, MergedParameters, RequestParameters, VALUE_SEPARATOR, merge_parameters,
};

/// Suffix of the companion key selecting ALL or ANY for a to-many filter.
pub const COMBINATOR_SUFFIX: &str = "_cond";

/// Parameters that steer pagination, ordering and search instead of filtering.
pub const RESERVED_PARAMETERS: &[&str] = &["page", "page_size", "ordering", "search", "format"];

/// Field types that never produce a filter clause unless configured otherwise.
pub const DEFAULT_IGNORED_FIELD_TYPES: &[FieldType] =
    &[FieldType::Json, FieldType::Binary, FieldType::FilePath];

/// Compiles merged request parameters into storage predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCompiler {
    lookup_table: LookupTable,
    ignored_field_types: BTreeSet<FieldType>,
}

/// Filter key resolved against the entity catalog.
struct ResolvedKey {
    path: FieldPath,
    field_type: FieldType,
    lookup: LookupOperator,
    is_relation_key: bool,
    head_is_to_many: bool,
}

impl Default for FilterCompiler {
    fn default() -> Self {
        Self::new(
            LookupTable::default(),
            DEFAULT_IGNORED_FIELD_TYPES.iter().copied(),
        )
    }
}

impl FilterCompiler {
    /// Creates a compiler with an explicit lookup table and exclusion list.
    #[must_use]
    pub fn new(
        lookup_table: LookupTable,
        ignored_field_types: impl IntoIterator<Item = FieldType>,
    ) -> Self {
        Self {
            lookup_table,
            ignored_field_types: ignored_field_types.into_iter().collect(),
        }
    }

    /// Adds field types to the exclusion list.
    #[must_use]
    pub fn with_ignored_field_types(mut self, extra: impl IntoIterator<Item = FieldType>) -> Self {
        self.ignored_field_types.extend(extra);
        self
    }

    /// Returns whether a field type is excluded from filtering.
    #[must_use]
    pub fn ignores(&self, field_type: FieldType) -> bool {
        self.ignored_field_types.contains(&field_type)
    }

    /// Compiles every filter key of `parameters` into clauses.
    ///
    /// Unknown keys, disallowed lookups, excluded field types and values that
    /// do not normalize are discarded. Clauses follow key order.
    #[must_use]
    pub fn compile(
        &self,
        metadata: &dyn EntityMetadataProvider,
        entity: &RegisteredEntity,
        parameters: &MergedParameters,
    ) -> Vec<FilterClause> {
        let mut clauses = Vec::new();

        for (key, values) in parameters.iter() {
            if RESERVED_PARAMETERS.contains(&key) {
                continue;
            }

            if key
                .strip_suffix(COMBINATOR_SUFFIX)
                .is_some_and(|base| parameters.contains_key(base))
            {
                continue;
            }

            let Some(resolved) = self.resolve_key(metadata, entity.descriptor(), key) else {
                tracing::debug!(entity = entity.name(), key, "discarding unknown filter key");
                continue;
            };

            if let Some(clause) = self.build_clause(entity, key, resolved, values, parameters) {
                clauses.push(clause);
            }
        }

        clauses
    }

    /// Parses `ordering` into ordering keys over known attributes.
    ///
    /// A leading `-` sorts descending. Without any usable key the primary
    /// key ascending is returned.
    #[must_use]
    pub fn compile_ordering(
        &self,
        entity: &RegisteredEntity,
        parameters: &MergedParameters,
    ) -> Vec<OrderingKey> {
        let mut ordering: Vec<OrderingKey> = Vec::new();

        for raw in parameters.get("ordering").unwrap_or_default() {
            let (name, direction) = match raw.strip_prefix('-') {
                Some(name) => (name.trim(), SortDirection::Desc),
                None => (raw.trim_start_matches('+').trim(), SortDirection::Asc),
            };

            let orderable = entity
                .descriptor()
                .attribute(name)
                .is_some_and(|attribute| !self.ignores(attribute.field_type()));
            if !orderable {
                tracing::debug!(entity = entity.name(), key = name, "discarding ordering key");
                continue;
            }

            let Ok(field) = FieldPath::parse(name) else {
                continue;
            };
            if ordering.iter().all(|existing| existing.field != field) {
                ordering.push(OrderingKey { field, direction });
            }
        }

        if ordering.is_empty() {
            if let Ok(field) = FieldPath::parse(PRIMARY_KEY_FIELD) {
                ordering.push(OrderingKey {
                    field,
                    direction: SortDirection::Asc,
                });
            }
        }

        ordering
    }

    /// Turns `search` into a clause over the entity's searchable fields.
    #[must_use]
    pub fn compile_search(
        &self,
        entity: &RegisteredEntity,
        parameters: &MergedParameters,
    ) -> Option<SearchClause> {
        let fields = entity.descriptor().searchable_fields();
        if fields.is_empty() {
            return None;
        }

        let mut terms: Vec<String> = Vec::new();
        for value in parameters.get("search").unwrap_or_default() {
            for term in value.split_whitespace() {
                let term = term.to_lowercase();
                if !terms.contains(&term) {
                    terms.push(term);
                }
            }
        }

        (!terms.is_empty()).then(|| SearchClause {
            terms,
            fields: fields.to_vec(),
        })
    }

    fn resolve_key(
        &self,
        metadata: &dyn EntityMetadataProvider,
        root: &EntityDescriptor,
        key: &str,
    ) -> Option<ResolvedKey> {
        let segments: Vec<&str> = key.split(PATH_DELIMITER).collect();
        if segments.iter().any(|segment| segment.trim().is_empty()) {
            return None;
        }

        let head_is_to_many = root
            .relation(segments[0])
            .is_some_and(|relation| relation.is_to_many());

        let mut owner = root;
        let mut path: Vec<String> = Vec::with_capacity(segments.len() + 1);

        for (index, segment) in segments.iter().enumerate() {
            let remaining = &segments[index + 1..];

            match owner.member(segment) {
                Some(EntityMember::Attribute(attribute)) => {
                    path.push((*segment).to_owned());
                    let lookup = match remaining {
                        [] => LookupOperator::Exact,
                        [lookup] => LookupOperator::parse_transport(lookup).ok()?,
                        _ => return None,
                    };

                    return Some(ResolvedKey {
                        path: FieldPath::from_segments(path).ok()?,
                        field_type: attribute.field_type(),
                        lookup,
                        is_relation_key: false,
                        head_is_to_many,
                    });
                }
                Some(EntityMember::Relation(relation)) => {
                    path.push((*segment).to_owned());
                    let target = metadata.entity(relation.target_entity())?.descriptor();

                    let lookup = match remaining {
                        [] => Some(LookupOperator::Exact),
                        [next] if target.member(next).is_none() => {
                            Some(LookupOperator::parse_transport(next).ok()?)
                        }
                        _ => None,
                    };

                    if let Some(lookup) = lookup {
                        let key_type = target.attribute(PRIMARY_KEY_FIELD)?.field_type();
                        path.push(PRIMARY_KEY_FIELD.to_owned());

                        return Some(ResolvedKey {
                            path: FieldPath::from_segments(path).ok()?,
                            field_type: key_type,
                            lookup,
                            is_relation_key: true,
                            head_is_to_many,
                        });
                    }

                    owner = target;
                }
                None => return None,
            }
        }

        None
    }

    fn build_clause(
        &self,
        entity: &RegisteredEntity,
        key: &str,
        resolved: ResolvedKey,
        values: &[String],
        parameters: &MergedParameters,
    ) -> Option<FilterClause> {
        if self.ignores(resolved.field_type) {
            tracing::debug!(
                entity = entity.name(),
                key,
                field_type = resolved.field_type.as_str(),
                "discarding filter on excluded field type"
            );
            return None;
        }

        let allowed = if resolved.is_relation_key {
            self.lookup_table.allows_relation_key(resolved.lookup)
        } else {
            self.lookup_table
                .allows(resolved.field_type, resolved.lookup)
        };
        if !allowed {
            tracing::debug!(
                entity = entity.name(),
                key,
                lookup = resolved.lookup.as_str(),
                "discarding unsupported lookup"
            );
            return None;
        }

        let normalized: Vec<String> = values
            .iter()
            .filter_map(|value| {
                resolved
                    .field_type
                    .normalize_filter_value(resolved.lookup, value)
            })
            .collect();

        let requested = parameters
            .first(format!("{key}{COMBINATOR_SUFFIX}").as_str())
            .and_then(Combinator::parse_transport)
            .unwrap_or_default();
        let combinator = if resolved.head_is_to_many {
            requested
        } else {
            if requested == Combinator::All {
                tracing::debug!(entity = entity.name(), key, "ALL on non to-many path, using ANY");
            }
            Combinator::Any
        };

        FilterClause::new(resolved.path, resolved.lookup, normalized, combinator).ok()
    }
}
