use utoipa::OpenApi;
use crate::docs::ApiDoc;
use axum::{Json, Router, routing::get};
use crate::state::AppState;

pub fn configure_routes() -> Router<AppState> {
    Router::new()
        .merge(crate::modules::trigger::router())
        .route("/health", get(|| async { "ok" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}
