use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use fieldgate_application::{ListRequest, RequestParameters, UpdateMode};
use fieldgate_core::CallerIdentity;
use serde_json::{Map, Value};

use crate::dto::RecordPageResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Entity served by a generated route.
#[derive(Debug, Clone)]
pub struct EntityRoute(pub Arc<str>);

impl EntityRoute {
    /// Wraps a registered entity name.
    pub fn new(entity_name: &str) -> Self {
        Self(Arc::from(entity_name))
    }

    fn name(&self) -> &str {
        &self.0
    }
}

/// Lists records shaped by the query string.
pub async fn list_records_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(route): Extension<EntityRoute>,
    Query(query): Query<Vec<(String, String)>>,
) -> ApiResult<Json<RecordPageResponse>> {
    let page = state
        .crud_service
        .list(
            &caller,
            route.name(),
            ListRequest {
                parameters: RequestParameters::from_query(query),
            },
        )
        .await?;

    Ok(Json(RecordPageResponse::from(page)))
}

/// Lists records from query-string and JSON body parameters.
pub async fn query_records_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(route): Extension<EntityRoute>,
    Query(query): Query<Vec<(String, String)>>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<Json<RecordPageResponse>> {
    let page = state
        .crud_service
        .list(
            &caller,
            route.name(),
            ListRequest {
                parameters: RequestParameters {
                    query,
                    body: Some(body),
                },
            },
        )
        .await?;

    Ok(Json(RecordPageResponse::from(page)))
}

/// Creates a record and answers with 201.
pub async fn create_record_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(route): Extension<EntityRoute>,
    Json(payload): Json<Map<String, Value>>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let record = state
        .crud_service
        .create(&caller, route.name(), payload)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Retrieves one record in detail shape.
pub async fn get_record_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(route): Extension<EntityRoute>,
    Path(record_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let record = state
        .crud_service
        .retrieve(&caller, route.name(), record_id.as_str())
        .await?;

    Ok(Json(record))
}

/// Replaces every writable field of a record.
pub async fn replace_record_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(route): Extension<EntityRoute>,
    Path(record_id): Path<String>,
    Json(payload): Json<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    let record = state
        .crud_service
        .update(
            &caller,
            route.name(),
            record_id.as_str(),
            payload,
            UpdateMode::Replace,
        )
        .await?;

    Ok(Json(record))
}

/// Updates only the writable fields present in the payload.
pub async fn patch_record_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(route): Extension<EntityRoute>,
    Path(record_id): Path<String>,
    Json(payload): Json<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    let record = state
        .crud_service
        .update(
            &caller,
            route.name(),
            record_id.as_str(),
            payload,
            UpdateMode::Merge,
        )
        .await?;

    Ok(Json(record))
}

/// Deletes a record and answers with 204.
pub async fn delete_record_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Extension(route): Extension<EntityRoute>,
    Path(record_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .crud_service
        .delete(&caller, route.name(), record_id.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
