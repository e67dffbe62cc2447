use axum::Router;
use axum::extract::Extension;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use fieldgate_core::AppError;
use tower_http::trace::TraceLayer;

use crate::handlers::records::EntityRoute;
use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

#[cfg(test)]
mod tests;

/// Builds the API router with one route set per registered entity.
pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let mut entity_routes =
        Router::new().route("/api", get(handlers::entities::list_entities_handler));

    for entity_name in app_state.crud_service.entity_names() {
        let route = EntityRoute::new(entity_name.as_str());
        tracing::debug!(entity = %entity_name, "registering entity routes");

        entity_routes = entity_routes
            .route(
                format!("/api/{entity_name}").as_str(),
                get(handlers::records::list_records_handler)
                    .post(handlers::records::create_record_handler)
                    .layer(Extension(route.clone())),
            )
            .route(
                format!("/api/{entity_name}/query").as_str(),
                post(handlers::records::query_records_handler).layer(Extension(route.clone())),
            )
            .route(
                format!("/api/{entity_name}/{{record_id}}").as_str(),
                get(handlers::records::get_record_handler)
                    .put(handlers::records::replace_record_handler)
                    .patch(handlers::records::patch_record_handler)
                    .delete(handlers::records::delete_record_handler)
                    .layer(Extension(route)),
            );
    }

    let protected_routes = entity_routes.route_layer(from_fn(middleware::require_identity));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors::build_cors_layer(frontend_url)?)
        .with_state(app_state))
}
