use super::*;

/// Builds a complete row with every declared member present.
pub(super) fn new_row(
    descriptor: &EntityDescriptor,
    tables: &Tables,
    record_id: &str,
    data: Map<String, Value>,
) -> AppResult<Map<String, Value>> {
    let mut values = checked_values(descriptor, tables, data)?;
    let mut row = Map::new();
    row.insert(
        PRIMARY_KEY_FIELD.to_owned(),
        Value::String(record_id.to_owned()),
    );

    for attribute in descriptor.attributes() {
        if attribute.name() == PRIMARY_KEY_FIELD {
            continue;
        }
        let value = values.remove(attribute.name()).unwrap_or(Value::Null);
        row.insert(attribute.name().to_owned(), value);
    }

    for relation in descriptor.relations() {
        let empty = if relation.is_to_many() {
            Value::Array(Vec::new())
        } else {
            Value::Null
        };
        let value = values.remove(relation.field_name()).unwrap_or(empty);
        row.insert(relation.field_name().to_owned(), value);
    }

    Ok(row)
}

/// Validates attribute types and relation keys of a write payload.
pub(super) fn checked_values(
    descriptor: &EntityDescriptor,
    tables: &Tables,
    data: Map<String, Value>,
) -> AppResult<Map<String, Value>> {
    let mut checked = Map::with_capacity(data.len());

    for (key, value) in data {
        if key == PRIMARY_KEY_FIELD {
            continue;
        }

        if let Some(attribute) = descriptor.attribute(key.as_str()) {
            attribute.field_type().validate_value(&value)?;
            checked.insert(key, value);
            continue;
        }

        let Some(relation) = descriptor.relation(key.as_str()) else {
            return Err(AppError::Validation(format!(
                "entity '{}' has no member '{key}'",
                descriptor.name()
            )));
        };

        let value = match value {
            Value::Null if relation.is_to_many() => Value::Array(Vec::new()),
            Value::Null => Value::Null,
            Value::String(id) if !relation.is_to_many() => {
                ensure_exists(tables, relation.target_entity(), id.as_str())?;
                Value::String(id)
            }
            Value::Array(ids) if relation.is_to_many() => {
                let mut distinct: Vec<Value> = Vec::with_capacity(ids.len());
                for id in ids {
                    let Some(text) = id.as_str() else {
                        return Err(AppError::Validation(format!(
                            "relation '{key}' expects record ids"
                        )));
                    };
                    ensure_exists(tables, relation.target_entity(), text)?;
                    if !distinct.contains(&id) {
                        distinct.push(id);
                    }
                }
                Value::Array(distinct)
            }
            _ => {
                return Err(AppError::Validation(format!(
                    "relation '{key}' has an invalid value"
                )));
            }
        };
        checked.insert(key, value);
    }

    Ok(checked)
}

fn ensure_exists(tables: &Tables, entity: &str, record_id: &str) -> AppResult<()> {
    if find_row(tables, entity, record_id).is_none() {
        return Err(AppError::Validation(format!(
            "related record '{record_id}' of entity '{entity}' does not exist"
        )));
    }

    Ok(())
}

/// Clears references to a deleted record from every relation targeting it.
pub(super) fn detach_references(
    metadata: &dyn EntityMetadataProvider,
    tables: &mut Tables,
    entity: &str,
    record_id: &str,
) {
    for owner_name in metadata.entity_names() {
        let Some(owner) = metadata.entity(owner_name) else {
            continue;
        };
        let Some(rows) = tables.get_mut(owner_name) else {
            continue;
        };

        for relation in owner
            .descriptor()
            .relations()
            .iter()
            .filter(|relation| relation.target_entity() == entity)
        {
            for row in rows.iter_mut() {
                match row.get_mut(relation.field_name()) {
                    Some(Value::Array(ids)) => {
                        ids.retain(|id| id.as_str() != Some(record_id));
                    }
                    Some(value) if value.as_str() == Some(record_id) => *value = Value::Null,
                    _ => {}
                }
            }
        }
    }
}
