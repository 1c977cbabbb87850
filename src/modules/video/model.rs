use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing state stored on the `videos` row. Rows start as `Pending` when
/// the upload is accepted; the transcoder only ever writes `Ready` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Processing => "processing",
            VideoStatus::Ready => "ready",
            VideoStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output locations written together with `status = ready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoUpdate {
    pub hls_manifest_path: String,
    pub thumbnail_url: String,
}

impl VideoUpdate {
    pub fn status(&self) -> VideoStatus {
        VideoStatus::Ready
    }
}
