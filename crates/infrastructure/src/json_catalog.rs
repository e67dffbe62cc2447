use std::path::Path;
use std::str::FromStr;

use fieldgate_application::{EntityRegistry, RoleTable};
use fieldgate_core::{AppError, AppResult};
use fieldgate_domain::{
    AttributeDescriptor, Cardinality, EntityDescriptor, EntityFieldSpec, FieldPath, FieldType,
    PermissionToken, RelationDescriptor, RoleDefinition,
};
use serde::Deserialize;

/// Roles and entities loaded from a catalog document.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Role to permission table.
    pub roles: RoleTable,
    /// Registered entities with their field specs.
    pub registry: EntityRegistry,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDocument {
    #[serde(default)]
    roles: Vec<RoleDocument>,
    entities: Vec<EntityDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RoleDocument {
    name: String,
    #[serde(default)]
    permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntityDocument {
    name: String,
    #[serde(default)]
    attributes: Vec<AttributeDocument>,
    #[serde(default)]
    relations: Vec<RelationDocument>,
    #[serde(default)]
    searchable_fields: Vec<String>,
    #[serde(default)]
    fields: Option<FieldsDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttributeDocument {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RelationDocument {
    name: String,
    cardinality: Cardinality,
    target: String,
}

/// One list for both views, or separate summary and detail lists.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldsDocument {
    Uniform(Vec<String>),
    PerMode {
        #[serde(default)]
        summary: Option<Vec<String>>,
        #[serde(default)]
        detail: Option<Vec<String>>,
    },
}

/// Reads and validates a catalog file.
pub fn load_catalog(path: &Path) -> AppResult<Catalog> {
    let contents = std::fs::read_to_string(path).map_err(|error| {
        AppError::Configuration(format!(
            "failed to read catalog '{}': {error}",
            path.display()
        ))
    })?;

    let catalog = parse_catalog(contents.as_str())?;
    tracing::info!(
        path = %path.display(),
        entities = catalog.registry.len(),
        roles = catalog.roles.role_names().len(),
        "catalog loaded"
    );

    Ok(catalog)
}

/// Parses and validates a catalog document.
///
/// Unknown attribute types, unresolvable field paths, unknown relation
/// targets and permissions on unknown entities are configuration errors.
pub fn parse_catalog(contents: &str) -> AppResult<Catalog> {
    let document: CatalogDocument = serde_json::from_str(contents)
        .map_err(|error| AppError::Configuration(format!("invalid catalog document: {error}")))?;

    let mut builder = EntityRegistry::builder();
    for entity in document.entities {
        let (descriptor, field_spec) = entity_from_document(entity)?;
        builder = builder.register(descriptor, field_spec);
    }
    let registry = builder.build()?;

    let roles = document
        .roles
        .into_iter()
        .map(role_from_document)
        .collect::<AppResult<Vec<_>>>()?;
    let roles = RoleTable::new(roles)?;
    roles.ensure_entities_exist(&registry)?;

    Ok(Catalog { roles, registry })
}

fn role_from_document(document: RoleDocument) -> AppResult<RoleDefinition> {
    let permissions = document
        .permissions
        .iter()
        .map(|token| PermissionToken::parse(token))
        .collect::<AppResult<Vec<_>>>()
        .map_err(|error| configuration(&document.name, error))?;

    RoleDefinition::new(document.name.as_str(), permissions)
        .map_err(|error| configuration(&document.name, error))
}

fn entity_from_document(document: EntityDocument) -> AppResult<(EntityDescriptor, EntityFieldSpec)> {
    let name = document.name;

    let attributes = document
        .attributes
        .into_iter()
        .map(|attribute| {
            let field_type = FieldType::from_str(attribute.field_type.as_str())?;
            AttributeDescriptor::new(attribute.name, field_type)
        })
        .collect::<AppResult<Vec<_>>>()
        .map_err(|error| configuration(&name, error))?;

    let relations = document
        .relations
        .into_iter()
        .map(|relation| RelationDescriptor::new(relation.name, relation.cardinality, relation.target))
        .collect::<AppResult<Vec<_>>>()
        .map_err(|error| configuration(&name, error))?;

    let field_spec = match document.fields {
        None => EntityFieldSpec::default(),
        Some(FieldsDocument::Uniform(paths)) => {
            EntityFieldSpec::uniform(parse_paths(&name, &paths)?)
        }
        Some(FieldsDocument::PerMode { summary, detail }) => EntityFieldSpec::new(
            summary
                .map(|paths| parse_paths(&name, &paths))
                .transpose()?,
            detail
                .map(|paths| parse_paths(&name, &paths))
                .transpose()?,
        ),
    };

    let descriptor = EntityDescriptor::new(
        name.as_str(),
        attributes,
        relations,
        document.searchable_fields,
    )
    .map_err(|error| configuration(&name, error))?;

    Ok((descriptor, field_spec))
}

fn parse_paths(entity: &str, paths: &[String]) -> AppResult<Vec<FieldPath>> {
    paths
        .iter()
        .map(|path| FieldPath::parse(path))
        .collect::<AppResult<Vec<_>>>()
        .map_err(|error| configuration(entity, error))
}

fn configuration(scope: &str, error: AppError) -> AppError {
    match error {
        AppError::Configuration(message) => AppError::Configuration(message),
        other => AppError::Configuration(format!("'{scope}': {other}")),
    }
}
