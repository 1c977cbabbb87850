use thiserror::Error;
use tracing::info;

use super::dto::ExecutionParameters;
use super::events::{self, EventError};
use crate::infrastructure::jobs::cloud_run::InvokeError;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

pub struct TriggerService;

impl TriggerService {
    /// Decodes one notification and starts exactly one transcoder execution
    /// for it. Nothing is kept between calls, so a redelivered notification
    /// simply starts another execution for the same video ID.
    pub async fn dispatch(state: &AppState, body: &[u8]) -> Result<ExecutionParameters, TriggerError> {
        let object = events::parse(body)?;
        let params = ExecutionParameters::from_event(&object, &state.config.hls_bucket)?;

        info!(
            "📦 Received upload {}/{} for video {}",
            object.bucket, object.name, params.video_id
        );

        state.executor.execute(&params).await?;
        Ok(params)
    }
}
