use super::*;

impl CrudService {
    /// Creates a record from the writable part of `payload`.
    pub async fn create(
        &self,
        caller: &dyn RoleProvider,
        entity_name: &str,
        payload: Map<String, Value>,
    ) -> AppResult<Value> {
        let entity = self.registered_entity(entity_name)?;
        let permissions = self.permission_resolver.resolve(caller);
        let writable = writable_fields(entity, &permissions)?;

        let data = sanitize_payload(entity, &writable, payload)?;
        let record_id = self.storage.insert(entity.name(), data).await?;
        tracing::info!(entity = entity.name(), record_id = %record_id, "record created");

        self.written_record(entity, &permissions, record_id.as_str())
            .await
    }

    /// Updates a record from the writable part of `payload`.
    pub async fn update(
        &self,
        caller: &dyn RoleProvider,
        entity_name: &str,
        record_id: &str,
        payload: Map<String, Value>,
        mode: UpdateMode,
    ) -> AppResult<Value> {
        let entity = self.registered_entity(entity_name)?;
        let permissions = self.permission_resolver.resolve(caller);
        let writable = writable_fields(entity, &permissions)?;

        let mut data = sanitize_payload(entity, &writable, payload)?;
        if mode == UpdateMode::Replace {
            for name in &writable {
                if !data.contains_key(name.as_str()) {
                    data.insert(name.clone(), Value::Null);
                }
            }
        }

        self.storage.update(entity.name(), record_id, data).await?;
        tracing::info!(entity = entity.name(), record_id, "record updated");

        self.written_record(entity, &permissions, record_id).await
    }

    /// Deletes a record when the caller holds a delete grant on the entity.
    pub async fn delete(
        &self,
        caller: &dyn RoleProvider,
        entity_name: &str,
        record_id: &str,
    ) -> AppResult<()> {
        let entity = self.registered_entity(entity_name)?;
        let permissions = self.permission_resolver.resolve(caller);
        if !permissions.allows_action(entity.name(), PermissionAction::Delete) {
            return Err(AppError::Forbidden(format!(
                "caller may not delete '{}' records",
                entity.name()
            )));
        }

        self.storage.delete(entity.name(), record_id).await?;
        tracing::info!(entity = entity.name(), record_id, "record deleted");
        Ok(())
    }

    async fn written_record(
        &self,
        entity: &RegisteredEntity,
        permissions: &PermissionSet,
        record_id: &str,
    ) -> AppResult<Value> {
        let visible = FieldVisibilityResolver.resolve(
            entity,
            ViewMode::Detail,
            permissions,
            PermissionAction::Read,
        );
        if visible.is_empty() {
            let mut acknowledgement = Map::new();
            acknowledgement.insert(
                PRIMARY_KEY_FIELD.to_owned(),
                Value::String(record_id.to_owned()),
            );
            return Ok(Value::Object(acknowledgement));
        }

        let plan = RelationPlanner::new(self.metadata.as_ref()).plan(entity, &visible);
        let record = self
            .storage
            .fetch_one(entity.name(), record_id, &plan)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "record '{record_id}' of entity '{}' vanished after write",
                    entity.name()
                ))
            })?;

        Ok(self.render_one(entity, &visible, &record))
    }
}

/// Top-level fields a write token covers directly.
///
/// Ancestors added by visibility closure are not writable: a grant on
/// `author.name` does not allow reassigning `author`.
fn writable_fields(
    entity: &RegisteredEntity,
    permissions: &PermissionSet,
) -> AppResult<Vec<String>> {
    let visible = CrudService::visible_fields(
        entity,
        ViewMode::Detail,
        permissions,
        PermissionAction::Write,
    )?;

    let writable: Vec<String> = visible
        .paths()
        .iter()
        .filter(|path| {
            !path.is_nested()
                && path.head() != PRIMARY_KEY_FIELD
                && permissions.grants(entity.name(), PermissionAction::Write, path)
        })
        .map(|path| path.head().to_owned())
        .collect();

    if writable.is_empty() {
        return Err(AppError::Forbidden(format!(
            "no top-level field of '{}' may be written by this caller",
            entity.name()
        )));
    }

    Ok(writable)
}

/// Keeps writable keys and validates their values.
fn sanitize_payload(
    entity: &RegisteredEntity,
    writable: &[String],
    payload: Map<String, Value>,
) -> AppResult<Map<String, Value>> {
    let mut data = Map::with_capacity(payload.len());

    for (key, value) in payload {
        if !writable.contains(&key) {
            tracing::debug!(entity = entity.name(), key = %key, "dropping non-writable payload key");
            continue;
        }

        match entity.descriptor().member(key.as_str()) {
            Some(EntityMember::Attribute(attribute)) => {
                attribute.field_type().validate_value(&value).map_err(|_| {
                    AppError::Validation(format!(
                        "field '{key}' expects a {} value",
                        attribute.field_type().as_str()
                    ))
                })?;
            }
            Some(EntityMember::Relation(relation)) => {
                let is_valid = if relation.is_to_many() {
                    value.is_null()
                        || value
                            .as_array()
                            .is_some_and(|items| items.iter().all(Value::is_string))
                } else {
                    value.is_null() || value.is_string()
                };
                if !is_valid {
                    return Err(AppError::Validation(format!(
                        "relation '{key}' expects {}",
                        if relation.is_to_many() {
                            "a list of record ids"
                        } else {
                            "a record id"
                        }
                    )));
                }
            }
            None => continue,
        }

        data.insert(key, value);
    }

    Ok(data)
}
