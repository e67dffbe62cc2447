use axum::Json;
use axum::extract::State;

use crate::dto::EntityListResponse;
use crate::state::AppState;

/// Lists registered entity names.
pub async fn list_entities_handler(State(state): State<AppState>) -> Json<EntityListResponse> {
    Json(EntityListResponse {
        entities: state.crud_service.entity_names(),
    })
}
