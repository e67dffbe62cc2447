use fieldgate_application::StorageEngine;
use fieldgate_core::AppResult;
use serde_json::{Map, Value, json};
use tracing::info;

const SEED_ENTITIES: [&str; 4] = ["author", "tag", "book", "review"];

/// Loads a small bookshop data set when the catalog declares its entities.
pub async fn run(storage: &dyn StorageEngine, entity_names: &[String]) -> AppResult<()> {
    if let Some(missing) = SEED_ENTITIES
        .iter()
        .find(|entity| !entity_names.iter().any(|name| name == *entity))
    {
        info!(entity = missing, "dev seed skipped, catalog lacks a seed entity");
        return Ok(());
    }

    let herbert = insert(
        storage,
        "author",
        json!({ "name": "Frank Herbert", "born": "1920-10-08" }),
    )
    .await?;
    let austen = insert(
        storage,
        "author",
        json!({ "name": "Jane Austen", "born": "1775-12-16" }),
    )
    .await?;

    let fiction = insert(storage, "tag", json!({ "name": "fiction" })).await?;
    let classic = insert(storage, "tag", json!({ "name": "classic" })).await?;
    let thriller = insert(storage, "tag", json!({ "name": "thriller" })).await?;

    let dune = insert(
        storage,
        "book",
        json!({
            "title": "Dune",
            "isbn": "9780441013593",
            "price": "9.99",
            "published": "1965-08-01",
            "in_stock": true,
            "author": herbert,
            "tags": [fiction, classic]
        }),
    )
    .await?;
    let emma = insert(
        storage,
        "book",
        json!({
            "title": "Emma",
            "isbn": "9780141439587",
            "price": "4.50",
            "published": "1815-12-23",
            "in_stock": false,
            "author": austen,
            "tags": [classic]
        }),
    )
    .await?;
    insert(
        storage,
        "book",
        json!({
            "title": "The Heist",
            "price": "12.00",
            "in_stock": true,
            "tags": [fiction, thriller]
        }),
    )
    .await?;

    let dune_review = insert(
        storage,
        "review",
        json!({ "rating": 5, "body": "Spice must flow.", "book": dune }),
    )
    .await?;
    let emma_review = insert(
        storage,
        "review",
        json!({ "rating": 4, "body": "Sharp and witty.", "book": emma }),
    )
    .await?;

    // Relations are stored per side, so the reverse links are written explicitly.
    for (book, review) in [(&dune, dune_review), (&emma, emma_review)] {
        storage
            .update("book", book.as_str(), object(json!({ "reviews": [review] })))
            .await?;
    }

    info!("dev seed loaded");
    Ok(())
}

async fn insert(storage: &dyn StorageEngine, entity: &str, data: Value) -> AppResult<String> {
    storage.insert(entity, object(data)).await
}

fn object(data: Value) -> Map<String, Value> {
    match data {
        Value::Object(data) => data,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fieldgate_application::{FetchPlan, StorageEngine, StorageQuery};
    use fieldgate_infrastructure::{InMemoryStorageEngine, parse_catalog};

    use super::run;

    #[tokio::test]
    async fn seed_fills_every_catalog_entity() {
        let catalog = parse_catalog(include_str!("../../../config/catalog.json"))
            .unwrap_or_else(|_| unreachable!());
        let entity_names: Vec<String> = ["author", "tag", "book", "review"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        let storage = InMemoryStorageEngine::new(Arc::new(catalog.registry));

        assert!(run(&storage, &entity_names).await.is_ok());

        let books = storage
            .fetch_page(StorageQuery {
                entity: "book".to_owned(),
                plan: FetchPlan::default(),
                filters: Vec::new(),
                search: None,
                ordering: Vec::new(),
                offset: 0,
                limit: 10,
            })
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(books.total, 3);
    }

    #[tokio::test]
    async fn seed_is_skipped_for_foreign_catalogs() {
        let catalog = parse_catalog(r#"{ "entities": [{ "name": "tag" }] }"#)
            .unwrap_or_else(|_| unreachable!());
        let storage = InMemoryStorageEngine::new(Arc::new(catalog.registry));

        assert!(run(&storage, &["tag".to_owned()]).await.is_ok());
    }
}
