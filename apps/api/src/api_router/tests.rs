use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use fieldgate_application::FilterCompiler;
use fieldgate_infrastructure::parse_catalog;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::api_services::services_from_catalog;
use crate::dev_seed;
use crate::middleware::{ROLES_HEADER, SUBJECT_HEADER};

use super::build_router;

async fn seeded_router() -> Router {
    let catalog = parse_catalog(include_str!("../../../../config/catalog.json"))
        .unwrap_or_else(|_| unreachable!());
    let services = services_from_catalog(catalog, FilterCompiler::default());
    let entity_names = services.app_state.crud_service.entity_names();
    dev_seed::run(services.storage_engine.as_ref(), &entity_names)
        .await
        .unwrap_or_else(|_| unreachable!());

    build_router(services.app_state, "http://localhost:3000").unwrap_or_else(|_| unreachable!())
}

fn request(method: Method, uri: &str, roles: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(roles) = roles {
        builder = builder
            .header(SUBJECT_HEADER, "tester")
            .header(ROLES_HEADER, roles);
    }

    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    builder.body(body).unwrap_or_else(|_| unreachable!())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|_| unreachable!());
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_else(|_| unreachable!());
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, body)
}

fn titles(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|records| {
            records
                .iter()
                .filter_map(|record| record["title"].as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn health_is_public() {
    let router = seeded_router().await;

    let (status, body) = send(&router, request(Method::GET, "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["registered_entities"], json!(4));
}

#[tokio::test]
async fn entity_routes_require_an_identity() {
    let router = seeded_router().await;

    let (status, _) = send(&router, request(Method::GET, "/api/book", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn viewer_lists_summary_fields_with_nested_relations() {
    let router = seeded_router().await;

    let (status, body) = send(
        &router,
        request(Method::GET, "/api/book?ordering=title", Some("viewer"), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_items"], json!(3));
    assert_eq!(titles(&body), vec!["Dune", "Emma", "The Heist"]);

    let dune = &body["data"][0];
    let keys: Vec<&str> = dune
        .as_object()
        .map(|record| record.keys().map(String::as_str).collect())
        .unwrap_or_default();
    assert_eq!(keys, vec!["id", "title", "price", "author", "tags"]);
    assert_eq!(dune["author"], json!({ "name": "Frank Herbert" }));
    assert_eq!(dune["tags"], json!([{ "name": "fiction" }, { "name": "classic" }]));
}

#[tokio::test]
async fn field_scoped_role_sees_only_granted_fields() {
    let router = seeded_router().await;

    let (status, body) = send(
        &router,
        request(
            Method::GET,
            "/api/book?ordering=title&price.gt=100",
            Some("auditor"),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_items"], json!(3));
    assert_eq!(body["data"][0], json!({ "title": "Dune" }));
}

#[tokio::test]
async fn to_many_filter_honours_the_and_companion() {
    let router = seeded_router().await;

    let (_, all) = send(
        &router,
        request(
            Method::GET,
            "/api/book?tags.name%5B%5D=fiction%2Cthriller&tags.name_cond=AND",
            Some("viewer"),
            None,
        ),
    )
    .await;
    assert_eq!(titles(&all), vec!["The Heist"]);

    let (_, any) = send(
        &router,
        request(
            Method::GET,
            "/api/book?tags.name=fiction&tags.name=thriller&ordering=title",
            Some("viewer"),
            None,
        ),
    )
    .await;
    assert_eq!(titles(&any), vec!["Dune", "The Heist"]);
}

#[tokio::test]
async fn query_route_merges_body_parameters() {
    let router = seeded_router().await;

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/book/query?ordering=-price",
            Some("viewer"),
            Some(json!({ "tags.name": ["classic"], "page_size": 1 })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(titles(&body), vec!["Dune"]);
    assert_eq!(body["pagination"]["next"], json!(2));
    assert_eq!(body["pagination"]["total_pages"], json!(2));
}

#[tokio::test]
async fn writes_follow_write_and_delete_grants() {
    let router = seeded_router().await;
    let payload = json!({ "name": "mystery" });

    let (status, _) = send(
        &router,
        request(Method::POST, "/api/tag", Some("viewer"), Some(payload.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(
        &router,
        request(Method::POST, "/api/tag", Some("editor"), Some(payload)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], json!("mystery"));

    let uri = format!("/api/tag/{}", created["id"].as_str().unwrap_or_default());

    let (status, updated) = send(
        &router,
        request(
            Method::PATCH,
            uri.as_str(),
            Some("editor"),
            Some(json!({ "name": "crime" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], json!("crime"));

    let (status, _) = send(&router, request(Method::DELETE, uri.as_str(), Some("editor"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&router, request(Method::DELETE, uri.as_str(), Some("admin"), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&router, request(Method::GET, uri.as_str(), Some("admin"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn caller_without_known_roles_is_forbidden() {
    let router = seeded_router().await;

    let (status, body) = send(
        &router,
        request(Method::GET, "/api/book", Some("guest"), None),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn unregistered_entities_have_no_routes() {
    let router = seeded_router().await;

    let (status, _) = send(
        &router,
        request(Method::GET, "/api/publisher", Some("admin"), None),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_root_lists_registered_entities() {
    let router = seeded_router().await;

    let (status, body) = send(&router, request(Method::GET, "/api", Some("viewer"), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entities"], json!(["author", "book", "review", "tag"]));
}
