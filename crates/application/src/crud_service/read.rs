use super::*;

impl CrudService {
    /// Lists one page of records shaped by the caller's summary visibility.
    pub async fn list(
        &self,
        caller: &dyn RoleProvider,
        entity_name: &str,
        request: ListRequest,
    ) -> AppResult<RecordPage> {
        let entity = self.registered_entity(entity_name)?;
        let permissions = self.permission_resolver.resolve(caller);
        let visible = Self::visible_fields(
            entity,
            ViewMode::Summary,
            &permissions,
            PermissionAction::Read,
        )?;

        let parameters = request.parameters.merged();
        let filters = readable_filters(
            entity,
            &permissions,
            self.filter_compiler
                .compile(self.metadata.as_ref(), entity, &parameters),
        );
        let ordering = readable_ordering(
            entity,
            &permissions,
            self.filter_compiler.compile_ordering(entity, &parameters),
        );
        let search = self
            .filter_compiler
            .compile_search(entity, &parameters)
            .and_then(|search| readable_search(entity, &permissions, search));

        let page = page_parameter(&parameters, "page").unwrap_or(1);
        let page_size = page_parameter(&parameters, "page_size")
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);

        let plan = RelationPlanner::new(self.metadata.as_ref()).plan(entity, &visible);
        let fetched = self
            .storage
            .fetch_page(StorageQuery {
                entity: entity.name().to_owned(),
                plan,
                filters,
                search,
                ordering,
                offset: (page - 1).saturating_mul(page_size),
                limit: page_size,
            })
            .await?;

        let schema = SerializationSchemaBuilder::new(self.metadata.as_ref()).build(entity, &visible);
        let records = fetched.records.iter().map(|record| schema.render(record)).collect();

        Ok(RecordPage {
            records,
            page,
            page_size,
            total_items: fetched.total,
            total_pages: fetched.total.div_ceil(page_size).max(1),
        })
    }

    /// Returns one record shaped by the caller's detail visibility.
    pub async fn retrieve(
        &self,
        caller: &dyn RoleProvider,
        entity_name: &str,
        record_id: &str,
    ) -> AppResult<Value> {
        let entity = self.registered_entity(entity_name)?;
        let permissions = self.permission_resolver.resolve(caller);
        let visible = Self::visible_fields(
            entity,
            ViewMode::Detail,
            &permissions,
            PermissionAction::Read,
        )?;

        let plan = RelationPlanner::new(self.metadata.as_ref()).plan(entity, &visible);
        let record = self
            .storage
            .fetch_one(entity.name(), record_id, &plan)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "record '{record_id}' of entity '{}' does not exist",
                    entity.name()
                ))
            })?;

        Ok(self.render_one(entity, &visible, &record))
    }
}

fn readable_filters(
    entity: &RegisteredEntity,
    permissions: &PermissionSet,
    filters: Vec<FilterClause>,
) -> Vec<FilterClause> {
    filters
        .into_iter()
        .filter(|clause| {
            let readable = can_read_path(entity, permissions, clause.path());
            if !readable {
                tracing::debug!(
                    entity = entity.name(),
                    path = %clause.path(),
                    "dropping filter on unreadable field"
                );
            }
            readable
        })
        .collect()
}

fn readable_ordering(
    entity: &RegisteredEntity,
    permissions: &PermissionSet,
    ordering: Vec<OrderingKey>,
) -> Vec<OrderingKey> {
    let readable: Vec<OrderingKey> = ordering
        .into_iter()
        .filter(|key| can_read_path(entity, permissions, &key.field))
        .collect();

    if !readable.is_empty() {
        return readable;
    }

    FieldPath::parse(PRIMARY_KEY_FIELD)
        .map(|field| {
            vec![OrderingKey {
                field,
                direction: SortDirection::Asc,
            }]
        })
        .unwrap_or_default()
}

fn readable_search(
    entity: &RegisteredEntity,
    permissions: &PermissionSet,
    search: SearchClause,
) -> Option<SearchClause> {
    let fields: Vec<String> = search
        .fields
        .into_iter()
        .filter(|field| {
            FieldPath::parse(field)
                .is_ok_and(|path| can_read_path(entity, permissions, &path))
        })
        .collect();

    (!fields.is_empty()).then_some(SearchClause {
        terms: search.terms,
        fields,
    })
}

fn can_read_path(entity: &RegisteredEntity, permissions: &PermissionSet, path: &FieldPath) -> bool {
    if permissions.grants(entity.name(), PermissionAction::Read, path) {
        return true;
    }

    // A relation-key clause such as `author.id` is covered by a grant on `author`.
    path.is_nested()
        && entity
            .descriptor()
            .member(path.head())
            .is_some_and(|member| matches!(member, EntityMember::Relation(_)))
        && FieldPath::parse(path.head())
            .is_ok_and(|head| permissions.grants(entity.name(), PermissionAction::Read, &head))
}
