use std::cmp::Ordering;
use std::net::IpAddr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use fieldgate_application::resolve_field_path;
use fieldgate_domain::{
    Combinator, EntityMember, FieldType, FilterClause, LookupOperator, OrderingKey,
    RelationDescriptor, SearchClause, SortDirection,
};
use uuid::Uuid;

use super::*;

pub(super) fn matches_filters(
    metadata: &dyn EntityMetadataProvider,
    tables: &Tables,
    descriptor: &EntityDescriptor,
    row: &Map<String, Value>,
    filters: &[FilterClause],
) -> bool {
    filters
        .iter()
        .all(|clause| matches_clause(metadata, tables, descriptor, row, clause))
}

fn matches_clause(
    metadata: &dyn EntityMetadataProvider,
    tables: &Tables,
    descriptor: &EntityDescriptor,
    row: &Map<String, Value>,
    clause: &FilterClause,
) -> bool {
    let Some(field_type) = leaf_field_type(metadata, descriptor, clause) else {
        return false;
    };
    let segments = clause.path().segments();

    let head_relation = descriptor
        .relation(clause.path().head())
        .filter(|relation| relation.is_to_many());

    match (clause.combinator(), head_relation) {
        // Every distinct value must be satisfied by at least one related row.
        (Combinator::All, Some(relation)) if clause.lookup() != LookupOperator::IsNull => {
            let Some(target) = metadata.entity(relation.target_entity()) else {
                return false;
            };
            let related = related_rows(tables, relation, row.get(relation.field_name()));
            let satisfied = clause
                .values()
                .iter()
                .filter(|expected| {
                    related.iter().any(|related_row| {
                        collect_values(metadata, tables, target.descriptor(), related_row, &segments[1..])
                            .iter()
                            .any(|stored| value_matches(stored, expected, clause.lookup(), field_type))
                    })
                })
                .count();

            satisfied == clause.values().len()
        }
        _ => {
            let stored = collect_values(metadata, tables, descriptor, row, segments);
            if clause.lookup() == LookupOperator::IsNull {
                let is_null = stored.iter().all(Value::is_null);
                return clause
                    .values()
                    .iter()
                    .any(|expected| (expected == "true") == is_null);
            }

            stored.iter().any(|value| {
                clause
                    .values()
                    .iter()
                    .any(|expected| value_matches(value, expected, clause.lookup(), field_type))
            })
        }
    }
}

fn leaf_field_type(
    metadata: &dyn EntityMetadataProvider,
    descriptor: &EntityDescriptor,
    clause: &FilterClause,
) -> Option<FieldType> {
    let resolved = resolve_field_path(metadata, descriptor, clause.path())?;
    match resolved.last()?.member {
        EntityMember::Attribute(attribute) => Some(attribute.field_type()),
        EntityMember::Relation(_) => None,
    }
}

/// Collects the values reached by `segments`, fanning out over to-many links.
fn collect_values(
    metadata: &dyn EntityMetadataProvider,
    tables: &Tables,
    descriptor: &EntityDescriptor,
    row: &Map<String, Value>,
    segments: &[String],
) -> Vec<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Vec::new();
    };

    if rest.is_empty() {
        return vec![row.get(head.as_str()).cloned().unwrap_or(Value::Null)];
    }

    let Some(relation) = descriptor.relation(head.as_str()) else {
        return Vec::new();
    };
    let Some(target) = metadata.entity(relation.target_entity()) else {
        return Vec::new();
    };

    related_rows(tables, relation, row.get(head.as_str()))
        .into_iter()
        .flat_map(|related| collect_values(metadata, tables, target.descriptor(), related, rest))
        .collect()
}

pub(super) fn related_rows<'a>(
    tables: &'a Tables,
    relation: &RelationDescriptor,
    stored: Option<&Value>,
) -> Vec<&'a Map<String, Value>> {
    let ids: Vec<&str> = match stored {
        Some(Value::String(id)) => vec![id.as_str()],
        Some(Value::Array(ids)) => ids.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    ids.into_iter()
        .filter_map(|id| find_row(tables, relation.target_entity(), id))
        .collect()
}

fn value_matches(stored: &Value, expected: &str, lookup: LookupOperator, field_type: FieldType) -> bool {
    if stored.is_null() {
        return false;
    }

    match lookup {
        LookupOperator::Exact | LookupOperator::In => match field_type {
            FieldType::Uuid => stored
                .as_str()
                .and_then(|text| Uuid::parse_str(text.trim()).ok())
                .is_some_and(|uuid| Uuid::parse_str(expected).is_ok_and(|other| uuid == other)),
            FieldType::IpAddress => stored
                .as_str()
                .and_then(|text| text.trim().parse::<IpAddr>().ok())
                .is_some_and(|address| expected.parse::<IpAddr>().is_ok_and(|other| address == other)),
            FieldType::Integer
            | FieldType::Decimal
            | FieldType::Float
            | FieldType::Boolean
            | FieldType::Date
            | FieldType::DateTime => compare_typed(stored, expected, field_type).is_some_and(Ordering::is_eq),
            _ => stored.as_str().is_some_and(|text| text == expected),
        },
        LookupOperator::Gt => compare_typed(stored, expected, field_type).is_some_and(Ordering::is_gt),
        LookupOperator::Gte => compare_typed(stored, expected, field_type).is_some_and(Ordering::is_ge),
        LookupOperator::Lt => compare_typed(stored, expected, field_type).is_some_and(Ordering::is_lt),
        LookupOperator::Lte => compare_typed(stored, expected, field_type).is_some_and(Ordering::is_le),
        LookupOperator::Year => temporal_value(stored)
            .zip(expected.parse::<i32>().ok())
            .is_some_and(|(value, year)| value.year() == year),
        LookupOperator::Month => temporal_value(stored)
            .zip(expected.parse::<u32>().ok())
            .is_some_and(|(value, month)| value.month() == month),
        LookupOperator::Day => temporal_value(stored)
            .zip(expected.parse::<u32>().ok())
            .is_some_and(|(value, day)| value.day() == day),
        LookupOperator::IContains => stored
            .as_str()
            .is_some_and(|text| text.to_lowercase().contains(&expected.to_lowercase())),
        LookupOperator::IStartsWith => stored
            .as_str()
            .is_some_and(|text| text.to_lowercase().starts_with(&expected.to_lowercase())),
        LookupOperator::IEndsWith => stored
            .as_str()
            .is_some_and(|text| text.to_lowercase().ends_with(&expected.to_lowercase())),
        LookupOperator::IsNull => false,
    }
}

fn compare_typed(stored: &Value, expected: &str, field_type: FieldType) -> Option<Ordering> {
    match field_type {
        FieldType::Integer | FieldType::Decimal | FieldType::Float => {
            number_value(stored)?.partial_cmp(&expected.trim().parse::<f64>().ok()?)
        }
        FieldType::Boolean => Some(stored.as_bool()?.cmp(&(expected == "true"))),
        FieldType::Date | FieldType::DateTime => {
            Some(temporal_value(stored)?.cmp(&parse_temporal(expected)?))
        }
        _ => Some(stored.as_str()?.cmp(expected)),
    }
}

fn number_value(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
}

fn temporal_value(value: &Value) -> Option<NaiveDateTime> {
    value.as_str().and_then(parse_temporal)
}

fn parse_temporal(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.naive_utc())
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub(super) fn matches_search(row: &Map<String, Value>, search: &SearchClause) -> bool {
    search.terms.iter().all(|term| {
        search.fields.iter().any(|field| {
            row.get(field.as_str())
                .and_then(Value::as_str)
                .is_some_and(|text| text.to_lowercase().contains(term.as_str()))
        })
    })
}

pub(super) fn sort_rows(
    descriptor: &EntityDescriptor,
    rows: &mut [&Map<String, Value>],
    ordering: &[OrderingKey],
) {
    rows.sort_by(|left, right| {
        for key in ordering {
            let name = key.field.leaf();
            let field_type = descriptor
                .attribute(name)
                .map_or(FieldType::Text, |attribute| attribute.field_type());

            let comparison =
                compare_stored(left.get(name), right.get(name), field_type, key.direction);
            if comparison != Ordering::Equal {
                return comparison;
            }
        }

        Ordering::Equal
    });
}

/// Nulls sort last in both directions.
fn compare_stored(
    left: Option<&Value>,
    right: Option<&Value>,
    field_type: FieldType,
    direction: SortDirection,
) -> Ordering {
    let left = left.filter(|value| !value.is_null());
    let right = right.filter(|value| !value.is_null());

    match (left, right) {
        (Some(left), Some(right)) => {
            let comparison = compare_present(left, right, field_type);
            match direction {
                SortDirection::Asc => comparison,
                SortDirection::Desc => comparison.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_present(left: &Value, right: &Value, field_type: FieldType) -> Ordering {
    match field_type {
        FieldType::Integer | FieldType::Decimal | FieldType::Float => number_value(left)
            .zip(number_value(right))
            .and_then(|(left, right)| left.partial_cmp(&right))
            .unwrap_or(Ordering::Equal),
        FieldType::Boolean => left
            .as_bool()
            .zip(right.as_bool())
            .map(|(left, right)| left.cmp(&right))
            .unwrap_or(Ordering::Equal),
        FieldType::Date | FieldType::DateTime => temporal_value(left)
            .zip(temporal_value(right))
            .map(|(left, right)| left.cmp(&right))
            .unwrap_or(Ordering::Equal),
        _ => left
            .as_str()
            .zip(right.as_str())
            .map(|(left, right)| left.cmp(right))
            .unwrap_or(Ordering::Equal),
    }
}
