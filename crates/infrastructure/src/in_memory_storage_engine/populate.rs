use fieldgate_domain::PATH_DELIMITER;

use super::*;

type RowIndex<'a> = HashMap<&'a str, &'a Map<String, Value>>;

/// Replaces stored keys with related records for every planned chain.
///
/// Chains are processed shortest first so nested chains find their parent
/// already expanded. Each chain indexes its target table once.
pub(super) fn populate_plan(
    metadata: &dyn EntityMetadataProvider,
    tables: &Tables,
    descriptor: &EntityDescriptor,
    records: &mut [RecordGraph],
    plan: &FetchPlan,
) {
    for chain in plan.chains() {
        let segments: Vec<&str> = chain.split(PATH_DELIMITER).collect();
        let Some(target_entity) = chain_target(metadata, descriptor, &segments) else {
            tracing::debug!(entity = descriptor.name(), chain, "skipping unknown relation chain");
            continue;
        };

        let index: RowIndex<'_> = tables
            .get(target_entity.as_str())
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row_id(row).map(|id| (id, row)))
                    .collect()
            })
            .unwrap_or_default();

        for record in records.iter_mut() {
            expand_chain(metadata, descriptor, record, &segments, &index);
        }
    }
}

fn chain_target(
    metadata: &dyn EntityMetadataProvider,
    descriptor: &EntityDescriptor,
    segments: &[&str],
) -> Option<String> {
    let mut owner = descriptor;
    let mut target = None;

    for segment in segments {
        let relation = owner.relation(segment)?;
        owner = metadata.entity(relation.target_entity())?.descriptor();
        target = Some(relation.target_entity().to_owned());
    }

    target
}

fn expand_chain(
    metadata: &dyn EntityMetadataProvider,
    descriptor: &EntityDescriptor,
    record: &mut Map<String, Value>,
    segments: &[&str],
    index: &RowIndex<'_>,
) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        if let Some(stored) = record.get_mut(*head) {
            *stored = expand_keys(stored, index);
        }
        return;
    }

    let Some(target) = descriptor
        .relation(head)
        .and_then(|relation| metadata.entity(relation.target_entity()))
    else {
        return;
    };

    match record.get_mut(*head) {
        Some(Value::Object(related)) => {
            expand_chain(metadata, target.descriptor(), related, rest, index);
        }
        Some(Value::Array(items)) => {
            for item in items {
                if let Value::Object(related) = item {
                    expand_chain(metadata, target.descriptor(), related, rest, index);
                }
            }
        }
        _ => {}
    }
}

fn expand_keys(stored: &Value, index: &RowIndex<'_>) -> Value {
    match stored {
        Value::String(id) => index
            .get(id.as_str())
            .map_or(Value::Null, |row| Value::Object((*row).clone())),
        Value::Array(ids) => Value::Array(
            ids.iter()
                .filter_map(|id| match id {
                    Value::String(id) => index
                        .get(id.as_str())
                        .map(|row| Value::Object((*row).clone())),
                    Value::Object(_) => Some(id.clone()),
                    _ => None,
                })
                .collect(),
        ),
        other => other.clone(),
    }
}
