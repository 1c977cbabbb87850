use super::events::StorageObject;
use super::service::{TriggerError, TriggerService};
use crate::common::response::ApiError;
use crate::state::AppState;
use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{error, warn};

/// Accept an object-finalized notification and start a transcode
#[utoipa::path(
    post,
    path = "/",
    request_body = StorageObject,
    responses(
        (status = 204, description = "Transcoder execution started"),
        (status = 400, description = "Malformed notification"),
        (status = 500, description = "Transcoder execution could not be started")
    ),
    tag = "Trigger"
)]
pub async fn handle_notification(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    match TriggerService::dispatch(&state, &body).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(TriggerError::Event(e)) => {
            warn!("Rejected notification: {}", e);
            ApiError(e.to_string(), StatusCode::BAD_REQUEST).into_response()
        }
        Err(TriggerError::Invoke(e)) => {
            error!("❌ Failed to start transcoder job: {:?}", e);
            ApiError(
                "internal error".to_string(),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response()
        }
    }
}
