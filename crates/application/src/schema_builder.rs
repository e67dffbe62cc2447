use fieldgate_domain::{Cardinality, EntityDescriptor, FieldPath, PRIMARY_KEY_FIELD, VisibleFieldSet};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{EntityMetadataProvider, RecordGraph, RegisteredEntity};

/// One node of the output schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNode {
    /// Scalar attribute copied as is.
    Leaf {
        /// Attribute name.
        name: String,
    },
    /// Relation rendered as a nested object or list of objects.
    Branch {
        /// Relation field name.
        name: String,
        /// Declared cardinality of the relation.
        cardinality: Cardinality,
        /// Schema of the related records; empty renders primary keys.
        children: SerializationSchema,
    },
}

impl SchemaNode {
    /// Returns the output key of the node.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Leaf { name } | Self::Branch { name, .. } => name.as_str(),
        }
    }
}

/// Immutable output schema built per request shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SerializationSchema {
    nodes: Vec<SchemaNode>,
}

impl SerializationSchema {
    /// Returns the nodes in output order.
    #[must_use]
    pub fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    /// Returns whether the schema has no node.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Writes a fetched record graph through the schema.
    ///
    /// Missing values render as `null`. Branches without children render the
    /// related primary key, or the list of keys for to-many relations.
    #[must_use]
    pub fn render(&self, record: &RecordGraph) -> Value {
        let mut output = Map::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let value = record.get(node.name()).unwrap_or(&Value::Null);
            let rendered = match node {
                SchemaNode::Leaf { .. } => value.clone(),
                SchemaNode::Branch { children, .. } => children.render_related(value),
            };
            output.insert(node.name().to_owned(), rendered);
        }

        Value::Object(output)
    }

    fn render_related(&self, value: &Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.render_related(item))
                    .collect(),
            ),
            Value::Object(related) if self.is_empty() => related
                .get(PRIMARY_KEY_FIELD)
                .cloned()
                .unwrap_or(Value::Null),
            Value::Object(related) => self.render(related),
            scalar if self.is_empty() => scalar.clone(),
            _ => Value::Null,
        }
    }
}

/// Builds nested output schemas from visible field sets.
#[derive(Clone, Copy)]
pub struct SerializationSchemaBuilder<'a> {
    metadata: &'a dyn EntityMetadataProvider,
}

impl<'a> SerializationSchemaBuilder<'a> {
    /// Creates a builder over the entity catalog.
    #[must_use]
    pub fn new(metadata: &'a dyn EntityMetadataProvider) -> Self {
        Self { metadata }
    }

    /// Partitions visible paths by first segment and recurses on the tails.
    #[must_use]
    pub fn build(&self, entity: &RegisteredEntity, visible: &VisibleFieldSet) -> SerializationSchema {
        self.build_level(Some(entity.descriptor()), visible.paths())
    }

    fn build_level(
        &self,
        owner: Option<&EntityDescriptor>,
        paths: &[FieldPath],
    ) -> SerializationSchema {
        let mut groups: Vec<(&str, Vec<FieldPath>)> = Vec::new();

        for path in paths {
            let position = match groups.iter().position(|(head, _)| *head == path.head()) {
                Some(position) => position,
                None => {
                    groups.push((path.head(), Vec::new()));
                    groups.len() - 1
                }
            };

            if let Some(tail) = path.tail() {
                groups[position].1.push(tail);
            }
        }

        let nodes = groups
            .into_iter()
            .map(|(name, tails)| {
                match owner.and_then(|descriptor| descriptor.relation(name)) {
                    Some(relation) => {
                        let target = self
                            .metadata
                            .entity(relation.target_entity())
                            .map(RegisteredEntity::descriptor);
                        SchemaNode::Branch {
                            name: name.to_owned(),
                            cardinality: relation.cardinality(),
                            children: self.build_level(target, &tails),
                        }
                    }
                    None => SchemaNode::Leaf {
                        name: name.to_owned(),
                    },
                }
            })
            .collect();

        SerializationSchema { nodes }
    }
}
