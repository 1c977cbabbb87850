use serde::{Deserialize, Serialize};

use super::events::{EventError, StorageObject};

/// What one transcoder execution needs to know about its video. The trigger
/// hands these to the job as environment overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionParameters {
    pub video_id: String,
    pub raw_object_path: String,
    pub hls_bucket: String,
}

impl ExecutionParameters {
    pub fn from_event(object: &StorageObject, hls_bucket: &str) -> Result<Self, EventError> {
        Ok(Self {
            video_id: object.video_id()?,
            raw_object_path: object.name.clone(),
            hls_bucket: hls_bucket.to_string(),
        })
    }
}
