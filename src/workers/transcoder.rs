use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::fs;
use tracing::{error, info, warn};

use crate::config::settings::TranscoderConfig;
use crate::infrastructure::media::error::MediaError;
use crate::infrastructure::media::ffmpeg::{DEFAULT_RENDITIONS, MASTER_PLAYLIST, Rendition, Transcoder};
use crate::infrastructure::storage::transfer::{ObjectTransfer, TransferError};
use crate::modules::trigger::dto::ExecutionParameters;
use crate::modules::video::model::VideoUpdate;
use crate::modules::video::repository::{RecordError, VideoRepository};

pub const THUMBNAIL_FILE: &str = "thumbnail.jpg";
pub const DEFAULT_THUMBNAIL_OFFSET_SECS: u32 = 5;

const HLS_DIR: &str = "hls";
const RAW_INPUT_STEM: &str = "raw_input";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("create workspace: {0}")]
    Workspace(#[source] io::Error),

    #[error("download raw video: {0}")]
    Download(#[source] TransferError),

    #[error("transcode to HLS: {0}")]
    Package(#[source] MediaError),

    #[error("extract thumbnail: {0}")]
    Thumbnail(#[source] MediaError),

    #[error("upload HLS output: {0}")]
    UploadPackage(#[source] TransferError),

    #[error("upload thumbnail: {0}")]
    UploadThumbnail(#[source] TransferError),

    #[error("update video record: {0}")]
    Record(#[source] RecordError),
}

impl PipelineError {
    pub fn step(&self) -> &'static str {
        match self {
            PipelineError::Workspace(_) => "workspace",
            PipelineError::Download(_) => "download",
            PipelineError::Package(_) => "package",
            PipelineError::Thumbnail(_) => "thumbnail",
            PipelineError::UploadPackage(_) => "upload_package",
            PipelineError::UploadThumbnail(_) => "upload_thumbnail",
            PipelineError::Record(_) => "record",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub raw_bucket: String,
    /// Public base for thumbnail URLs, without a trailing slash.
    pub cdn_base_url: String,
    pub manifest_uri_scheme: String,
    pub renditions: Vec<Rendition>,
    pub thumbnail_offset_secs: u32,
    /// Parent directory of per-run workspaces.
    pub work_root: PathBuf,
}

impl From<&TranscoderConfig> for PipelineConfig {
    fn from(cfg: &TranscoderConfig) -> Self {
        Self {
            raw_bucket: cfg.raw_bucket.clone(),
            cdn_base_url: cfg.cdn_base_url.as_str().trim_end_matches('/').to_string(),
            manifest_uri_scheme: cfg.manifest_uri_scheme.clone(),
            renditions: DEFAULT_RENDITIONS.to_vec(),
            thumbnail_offset_secs: DEFAULT_THUMBNAIL_OFFSET_SECS,
            work_root: cfg.work_dir.clone(),
        }
    }
}

/// One transcode run: download, package, thumbnail, upload, record.
///
/// Any failing step marks the video `failed` exactly once and the step's own
/// error is what `run` returns, whatever happens to that status write. The
/// workspace is removed before `run` returns on every path.
pub struct TranscodePipeline {
    transfer: Arc<dyn ObjectTransfer>,
    transcoder: Arc<dyn Transcoder>,
    repo: Arc<dyn VideoRepository>,
    config: PipelineConfig,
}

impl TranscodePipeline {
    pub fn new(
        transfer: Arc<dyn ObjectTransfer>,
        transcoder: Arc<dyn Transcoder>,
        repo: Arc<dyn VideoRepository>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            transfer,
            transcoder,
            repo,
            config,
        }
    }

    pub async fn run(&self, params: &ExecutionParameters) -> Result<VideoUpdate, PipelineError> {
        info!(
            "🎥 Transcoding video {} from {}/{}",
            params.video_id, self.config.raw_bucket, params.raw_object_path
        );

        match self.run_steps(params).await {
            Ok(update) => {
                info!(
                    "✅ Video {} ready: manifest={} thumbnail={}",
                    params.video_id, update.hls_manifest_path, update.thumbnail_url
                );
                Ok(update)
            }
            Err(err) => {
                error!(
                    "❌ Transcode of video {} failed at step {}: {}",
                    params.video_id,
                    err.step(),
                    err
                );
                if let Err(mark_err) = self.repo.mark_failed(&params.video_id).await {
                    warn!(
                        "Failed to mark video {} as failed: {}",
                        params.video_id, mark_err
                    );
                }
                Err(err)
            }
        }
    }

    async fn run_steps(&self, params: &ExecutionParameters) -> Result<VideoUpdate, PipelineError> {
        let id = params.video_id.as_str();

        // Removed when dropped, including on early return.
        let workspace = tempfile::Builder::new()
            .prefix(&format!("transcoder-{id}-"))
            .tempdir_in(&self.config.work_root)
            .map_err(PipelineError::Workspace)?;

        let raw_path = workspace
            .path()
            .join(raw_input_name(&params.raw_object_path));
        let hls_dir = workspace.path().join(HLS_DIR);
        let thumb_path = workspace.path().join(THUMBNAIL_FILE);

        self.transfer
            .download(&self.config.raw_bucket, &params.raw_object_path, &raw_path)
            .await
            .map_err(PipelineError::Download)?;

        fs::create_dir_all(&hls_dir)
            .await
            .map_err(PipelineError::Workspace)?;

        self.transcoder
            .transcode_hls(&raw_path, &hls_dir, &self.config.renditions)
            .await
            .map_err(PipelineError::Package)?;

        self.transcoder
            .extract_thumbnail(&raw_path, &thumb_path, self.config.thumbnail_offset_secs)
            .await
            .map_err(PipelineError::Thumbnail)?;

        let prefix = remote_prefix(id);
        self.transfer
            .upload_dir(&params.hls_bucket, &prefix, &hls_dir)
            .await
            .map_err(PipelineError::UploadPackage)?;

        self.transfer
            .upload_file(
                &params.hls_bucket,
                &format!("{prefix}/{THUMBNAIL_FILE}"),
                &thumb_path,
            )
            .await
            .map_err(PipelineError::UploadThumbnail)?;

        let update = VideoUpdate {
            hls_manifest_path: manifest_location(
                &self.config.manifest_uri_scheme,
                &params.hls_bucket,
                id,
            ),
            thumbnail_url: thumbnail_url(&self.config.cdn_base_url, id),
        };

        self.repo
            .update_video(id, &update)
            .await
            .map_err(PipelineError::Record)?;

        Ok(update)
    }
}

/// `videos/<id>`, shared by the package and the thumbnail.
pub fn remote_prefix(video_id: &str) -> String {
    format!("videos/{video_id}")
}

pub fn manifest_location(scheme: &str, bucket: &str, video_id: &str) -> String {
    format!(
        "{scheme}://{bucket}/{}/{MASTER_PLAYLIST}",
        remote_prefix(video_id)
    )
}

pub fn thumbnail_url(cdn_base_url: &str, video_id: &str) -> String {
    format!(
        "{}/{}/{THUMBNAIL_FILE}",
        cdn_base_url.trim_end_matches('/'),
        remote_prefix(video_id)
    )
}

// Keeps the raw object's extension so ffmpeg can probe by name as well.
fn raw_input_name(raw_object_path: &str) -> String {
    match Path::new(raw_object_path).extension() {
        Some(ext) => format!("{RAW_INPUT_STEM}.{}", ext.to_string_lossy()),
        None => RAW_INPUT_STEM.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn output_locations_are_keyed_by_video_id() {
        assert_eq!(
            manifest_location("gs", "hls-output", ID),
            format!("gs://hls-output/videos/{ID}/index.m3u8")
        );
        assert_eq!(
            thumbnail_url("https://cdn.example.com/", ID),
            format!("https://cdn.example.com/videos/{ID}/thumbnail.jpg")
        );
    }

    #[test]
    fn raw_input_keeps_extension() {
        assert_eq!(raw_input_name("raw/abc.mp4"), "raw_input.mp4");
        assert_eq!(raw_input_name("raw/abc.tar.mov"), "raw_input.mov");
        assert_eq!(raw_input_name("raw/abc"), "raw_input");
    }

    #[test]
    fn every_step_has_a_distinct_name() {
        let io_err = || io::Error::other("boom");
        let steps = [
            PipelineError::Workspace(io_err()).step(),
            PipelineError::Package(MediaError::EmptyRenditionList).step(),
            PipelineError::Thumbnail(MediaError::EmptyRenditionList).step(),
            PipelineError::Record(RecordError::NotFound(ID.into())).step(),
        ];
        assert_eq!(steps, ["workspace", "package", "thumbnail", "record"]);
    }

    #[test]
    fn pipeline_config_uses_default_renditions_and_offset() {
        use std::collections::HashMap;

        let vars: HashMap<String, String> = [
            ("VIDEO_ID", ID),
            ("RAW_OBJECT_PATH", "raw/x.mp4"),
            ("HLS_BUCKET", "hls-output"),
            ("RAW_BUCKET", "raw-uploads"),
            ("CDN_BASE_URL", "https://cdn.example.com/"),
            ("DATABASE_URL", "postgres://localhost/videos"),
            ("S3_ENDPOINT", "https://storage.googleapis.com"),
            ("AWS_ACCESS_KEY_ID", "key"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("TRANSCODER_WORK_DIR", "/scratch"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let cfg = TranscoderConfig::from_source(&vars).unwrap();
        let pipeline = PipelineConfig::from(&cfg);

        assert_eq!(pipeline.renditions, DEFAULT_RENDITIONS.to_vec());
        assert_eq!(pipeline.thumbnail_offset_secs, 5);
        assert_eq!(pipeline.cdn_base_url, "https://cdn.example.com");
        assert_eq!(pipeline.work_root, PathBuf::from("/scratch"));
    }
}
