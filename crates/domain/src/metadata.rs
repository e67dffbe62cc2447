use std::collections::HashSet;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use fieldgate_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::LookupOperator;

/// Name of the primary key attribute every entity exposes.
pub const PRIMARY_KEY_FIELD: &str = "id";

/// Supported attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// UTF-8 string field.
    Text,
    /// Whole number field.
    Integer,
    /// Fixed-point decimal field, carried as a string or number.
    Decimal,
    /// Floating-point field.
    Float,
    /// Boolean field.
    Boolean,
    /// ISO-8601 date field.
    Date,
    /// RFC 3339 date-time field.
    DateTime,
    /// UUID identifier field.
    Uuid,
    /// IPv4 or IPv6 address field.
    IpAddress,
    /// Stored file reference.
    File,
    /// Server-side file path.
    FilePath,
    /// Arbitrary JSON document.
    Json,
    /// Opaque binary blob.
    Binary,
}

impl FieldType {
    /// Returns a stable storage value for the field type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Uuid => "uuid",
            Self::IpAddress => "ip_address",
            Self::File => "file",
            Self::FilePath => "file_path",
            Self::Json => "json",
            Self::Binary => "binary",
        }
    }

    /// Returns whether values of this type compare numerically.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Decimal | Self::Float)
    }

    /// Returns whether values of this type are calendar values.
    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::DateTime)
    }

    /// Validates a stored value against the field type.
    pub fn validate_value(self, value: &Value) -> AppResult<()> {
        if value.is_null() {
            return Ok(());
        }

        let is_valid = match self {
            Self::Text | Self::File | Self::FilePath | Self::Binary => value.is_string(),
            Self::IpAddress => value.as_str().is_some_and(|text| parse_ip(text).is_some()),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Decimal => {
                value.is_number()
                    || value
                        .as_str()
                        .is_some_and(|text| text.trim().parse::<f64>().is_ok())
            }
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Date => value.as_str().is_some_and(|text| parse_date(text).is_some()),
            Self::DateTime => value
                .as_str()
                .is_some_and(|text| DateTime::parse_from_rfc3339(text.trim()).is_ok()),
            Self::Uuid => value.as_str().is_some_and(|text| parse_uuid(text).is_some()),
            Self::Json => true,
        };

        if !is_valid {
            return Err(AppError::Validation(format!(
                "value does not match field type '{}'",
                self.as_str()
            )));
        }

        Ok(())
    }

    /// Normalizes one raw filter value for a lookup on this type.
    ///
    /// Returns `None` when the value cannot be interpreted, so callers can
    /// drop it instead of building a predicate the storage layer cannot run.
    #[must_use]
    pub fn normalize_filter_value(self, lookup: LookupOperator, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        match lookup {
            LookupOperator::IsNull => return parse_bool(raw).map(|flag| flag.to_string()),
            LookupOperator::Year => {
                return raw.parse::<i32>().ok().map(|year| year.to_string());
            }
            LookupOperator::Month => {
                return raw
                    .parse::<u32>()
                    .ok()
                    .filter(|month| (1..=12).contains(month))
                    .map(|month| month.to_string());
            }
            LookupOperator::Day => {
                return raw
                    .parse::<u32>()
                    .ok()
                    .filter(|day| (1..=31).contains(day))
                    .map(|day| day.to_string());
            }
            LookupOperator::IContains
            | LookupOperator::IStartsWith
            | LookupOperator::IEndsWith => return Some(raw.to_owned()),
            _ => {}
        }

        match self {
            Self::Integer => raw.parse::<i64>().ok().map(|number| number.to_string()),
            Self::Decimal | Self::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .map(|_| raw.to_owned()),
            Self::Boolean => parse_bool(raw).map(|flag| flag.to_string()),
            Self::Date => parse_date(raw).map(|date| date.format("%Y-%m-%d").to_string()),
            Self::DateTime => (DateTime::parse_from_rfc3339(raw).is_ok()
                || parse_date(raw).is_some())
            .then(|| raw.to_owned()),
            Self::Uuid => parse_uuid(raw).map(|uuid| uuid.to_string()),
            Self::IpAddress => parse_ip(raw).map(|address| address.to_string()),
            Self::Text
            | Self::File
            | Self::FilePath
            | Self::Json
            | Self::Binary => Some(raw.to_owned()),
        }
    }
}

impl FromStr for FieldType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "integer" => Ok(Self::Integer),
            "decimal" => Ok(Self::Decimal),
            "float" => Ok(Self::Float),
            "boolean" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            "datetime" => Ok(Self::DateTime),
            "uuid" => Ok(Self::Uuid),
            "ip_address" => Ok(Self::IpAddress),
            "file" => Ok(Self::File),
            "file_path" => Ok(Self::FilePath),
            "json" => Ok(Self::Json),
            "binary" => Ok(Self::Binary),
            _ => Err(AppError::Validation(format!(
                "unknown field type '{value}'"
            ))),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn parse_uuid(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.trim().parse::<IpAddr>().ok()
}

/// Scalar attribute declared on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    name: NonEmptyString,
    field_type: FieldType,
}

impl AttributeDescriptor {
    /// Creates a validated attribute descriptor.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> AppResult<Self> {
        let name = NonEmptyString::new(name)?;
        if name.as_str().contains('.') {
            return Err(AppError::Validation(format!(
                "attribute name '{}' must not contain '.'",
                name.as_str()
            )));
        }

        Ok(Self { name, field_type })
    }

    /// Returns the attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the attribute type.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

/// How many target records a relation points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Exactly one related record (foreign key, one-to-one).
    ToOne,
    /// Potentially many related records (many-to-many, reverse foreign key).
    ToMany,
}

impl Cardinality {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToOne => "to_one",
            Self::ToMany => "to_many",
        }
    }
}

/// Relation from one entity to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    field_name: NonEmptyString,
    cardinality: Cardinality,
    target_entity: NonEmptyString,
}

impl RelationDescriptor {
    /// Creates a validated relation descriptor.
    pub fn new(
        field_name: impl Into<String>,
        cardinality: Cardinality,
        target_entity: impl Into<String>,
    ) -> AppResult<Self> {
        let field_name = NonEmptyString::new(field_name)?;
        if field_name.as_str().contains('.') {
            return Err(AppError::Validation(format!(
                "relation name '{}' must not contain '.'",
                field_name.as_str()
            )));
        }

        Ok(Self {
            field_name,
            cardinality,
            target_entity: NonEmptyString::new(target_entity)?,
        })
    }

    /// Returns the relation field name on the owning entity.
    #[must_use]
    pub fn field_name(&self) -> &str {
        self.field_name.as_str()
    }

    /// Returns the declared cardinality.
    #[must_use]
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Returns the target entity name.
    #[must_use]
    pub fn target_entity(&self) -> &str {
        self.target_entity.as_str()
    }

    /// Returns whether the relation is many-valued.
    #[must_use]
    pub fn is_to_many(&self) -> bool {
        self.cardinality == Cardinality::ToMany
    }
}

/// Member of an entity resolved by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityMember<'a> {
    /// Scalar attribute.
    Attribute(&'a AttributeDescriptor),
    /// Relation to another entity.
    Relation(&'a RelationDescriptor),
}

/// Structural metadata for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    name: NonEmptyString,
    attributes: Vec<AttributeDescriptor>,
    relations: Vec<RelationDescriptor>,
    searchable_fields: Vec<String>,
}

impl EntityDescriptor {
    /// Creates an entity descriptor with invariant checks.
    ///
    /// The primary key attribute `id` is implied when not declared.
    pub fn new(
        name: impl Into<String>,
        attributes: Vec<AttributeDescriptor>,
        relations: Vec<RelationDescriptor>,
        searchable_fields: Vec<String>,
    ) -> AppResult<Self> {
        let name = NonEmptyString::new(name)?;

        let mut attributes = attributes;
        if !attributes
            .iter()
            .any(|attribute| attribute.name() == PRIMARY_KEY_FIELD)
        {
            attributes.insert(0, AttributeDescriptor::new(PRIMARY_KEY_FIELD, FieldType::Text)?);
        }

        let mut seen = HashSet::new();
        let member_names = attributes
            .iter()
            .map(AttributeDescriptor::name)
            .chain(relations.iter().map(RelationDescriptor::field_name));
        for member_name in member_names {
            if !seen.insert(member_name) {
                return Err(AppError::Validation(format!(
                    "duplicate member '{}' on entity '{}'",
                    member_name,
                    name.as_str()
                )));
            }
        }

        for searchable_field in &searchable_fields {
            let is_text = attributes.iter().any(|attribute| {
                attribute.name() == searchable_field && attribute.field_type() == FieldType::Text
            });
            if !is_text {
                return Err(AppError::Validation(format!(
                    "searchable field '{}' on entity '{}' must be a text attribute",
                    searchable_field,
                    name.as_str()
                )));
            }
        }

        Ok(Self {
            name,
            attributes,
            relations,
            searchable_fields,
        })
    }

    /// Returns the entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns attributes in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    /// Returns relations in declaration order.
    #[must_use]
    pub fn relations(&self) -> &[RelationDescriptor] {
        &self.relations
    }

    /// Returns text attributes covered by free-text search.
    #[must_use]
    pub fn searchable_fields(&self) -> &[String] {
        &self.searchable_fields
    }

    /// Finds an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name() == name)
    }

    /// Finds a relation by field name.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations
            .iter()
            .find(|relation| relation.field_name() == name)
    }

    /// Resolves a member name to an attribute or relation.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<EntityMember<'_>> {
        self.attribute(name)
            .map(EntityMember::Attribute)
            .or_else(|| self.relation(name).map(EntityMember::Relation))
    }

    /// Returns every declared member name: attributes first, then relations.
    #[must_use]
    pub fn member_names(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .map(AttributeDescriptor::name)
            .chain(self.relations.iter().map(RelationDescriptor::field_name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        AttributeDescriptor, Cardinality, EntityDescriptor, EntityMember, FieldType,
        RelationDescriptor,
    };
    use crate::LookupOperator;

    fn attribute(name: &str, field_type: FieldType) -> AttributeDescriptor {
        AttributeDescriptor::new(name, field_type).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn entity_implies_primary_key() {
        let entity = EntityDescriptor::new(
            "book",
            vec![attribute("title", FieldType::Text)],
            Vec::new(),
            Vec::new(),
        )
        .unwrap_or_else(|_| unreachable!());

        assert_eq!(entity.member_names(), vec!["id", "title"]);
    }

    #[test]
    fn entity_rejects_duplicate_members() {
        let relation = RelationDescriptor::new("title", Cardinality::ToOne, "author")
            .unwrap_or_else(|_| unreachable!());
        let result = EntityDescriptor::new(
            "book",
            vec![attribute("title", FieldType::Text)],
            vec![relation],
            Vec::new(),
        );

        assert!(result.is_err());
    }

    #[test]
    fn searchable_fields_must_be_text() {
        let result = EntityDescriptor::new(
            "book",
            vec![attribute("price", FieldType::Decimal)],
            Vec::new(),
            vec!["price".to_owned()],
        );

        assert!(result.is_err());
    }

    #[test]
    fn member_resolves_relations_after_attributes() {
        let relation = RelationDescriptor::new("tags", Cardinality::ToMany, "tag")
            .unwrap_or_else(|_| unreachable!());
        let entity = EntityDescriptor::new("book", Vec::new(), vec![relation], Vec::new())
            .unwrap_or_else(|_| unreachable!());

        assert!(matches!(
            entity.member("tags"),
            Some(EntityMember::Relation(relation)) if relation.is_to_many()
        ));
        assert!(entity.member("missing").is_none());
    }

    #[test]
    fn relation_names_cannot_contain_delimiter() {
        assert!(RelationDescriptor::new("author.name", Cardinality::ToOne, "author").is_err());
    }

    #[test]
    fn value_validation_follows_field_type() {
        assert!(FieldType::Integer.validate_value(&json!(3)).is_ok());
        assert!(FieldType::Integer.validate_value(&json!("3")).is_err());
        assert!(FieldType::Decimal.validate_value(&json!("19.99")).is_ok());
        assert!(FieldType::Date.validate_value(&json!("2024-02-30")).is_err());
        assert!(FieldType::Text.validate_value(&json!(null)).is_ok());
    }

    #[test]
    fn filter_values_are_normalized_per_type() {
        assert_eq!(
            FieldType::Integer.normalize_filter_value(LookupOperator::Exact, " 042 "),
            Some("42".to_owned())
        );
        assert_eq!(
            FieldType::Boolean.normalize_filter_value(LookupOperator::Exact, "1"),
            Some("true".to_owned())
        );
        assert_eq!(
            FieldType::Date.normalize_filter_value(LookupOperator::Gte, "not-a-date"),
            None
        );
        assert_eq!(
            FieldType::Date.normalize_filter_value(LookupOperator::Month, "13"),
            None
        );
        assert_eq!(
            FieldType::Uuid.normalize_filter_value(
                LookupOperator::IsNull,
                "False"
            ),
            Some("false".to_owned())
        );
    }

    #[test]
    fn uuid_values_accept_every_textual_form() {
        assert_eq!(
            FieldType::Uuid.normalize_filter_value(
                LookupOperator::Exact,
                "550e8400e29b41d4a716446655440000"
            ),
            Some("550e8400-e29b-41d4-a716-446655440000".to_owned())
        );
        assert_eq!(
            FieldType::Uuid.normalize_filter_value(
                LookupOperator::In,
                "550E8400-E29B-41D4-A716-446655440000"
            ),
            Some("550e8400-e29b-41d4-a716-446655440000".to_owned())
        );
        assert_eq!(
            FieldType::Uuid.normalize_filter_value(LookupOperator::Exact, "550e8400-e29b"),
            None
        );
        assert!(
            FieldType::Uuid
                .validate_value(&json!("550e8400e29b41d4a716446655440000"))
                .is_ok()
        );
        assert!(FieldType::Uuid.validate_value(&json!("not-a-uuid")).is_err());
    }

    #[test]
    fn ip_addresses_are_parsed() {
        assert!(FieldType::IpAddress.validate_value(&json!("192.168.0.1")).is_ok());
        assert!(FieldType::IpAddress.validate_value(&json!("::1")).is_ok());
        assert!(FieldType::IpAddress.validate_value(&json!("localhost")).is_err());
        assert_eq!(
            FieldType::IpAddress.normalize_filter_value(LookupOperator::Exact, " 10.0.0.7 "),
            Some("10.0.0.7".to_owned())
        );
        assert_eq!(
            FieldType::IpAddress.normalize_filter_value(LookupOperator::Exact, "999.1.1.1"),
            None
        );
        assert_eq!(
            FieldType::IpAddress.normalize_filter_value(LookupOperator::IContains, "10.0"),
            Some("10.0".to_owned())
        );
    }
}
