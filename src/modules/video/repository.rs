use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::model::{VideoStatus, VideoUpdate};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("video {0} not found")]
    NotFound(String),

    #[error("write video {id}: {message}")]
    Write { id: String, message: String },
}

/// Terminal writes against the `videos` table. The row itself is created by
/// the upload flow before a transcode is ever triggered.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn update_video(&self, video_id: &str, update: &VideoUpdate) -> Result<(), RecordError>;

    async fn mark_failed(&self, video_id: &str) -> Result<(), RecordError>;
}

#[derive(Clone)]
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    async fn update_video(&self, video_id: &str, update: &VideoUpdate) -> Result<(), RecordError> {
        let id = parse_id(video_id)?;

        let result = sqlx::query(
            "UPDATE videos SET hls_manifest_path = $1, thumbnail_url = $2, status = $3 WHERE id = $4",
        )
        .bind(&update.hls_manifest_path)
        .bind(&update.thumbnail_url)
        .bind(update.status().as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(video_id, e))?;

        ensure_updated(video_id, result.rows_affected())?;

        info!("📝 Video {} marked {}", video_id, update.status());
        Ok(())
    }

    async fn mark_failed(&self, video_id: &str) -> Result<(), RecordError> {
        let id = parse_id(video_id)?;

        let result = sqlx::query("UPDATE videos SET status = $1 WHERE id = $2")
            .bind(VideoStatus::Failed.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(video_id, e))?;

        ensure_updated(video_id, result.rows_affected())
    }
}

// A non-UUID id can never match a row.
fn parse_id(video_id: &str) -> Result<Uuid, RecordError> {
    Uuid::parse_str(video_id).map_err(|_| RecordError::NotFound(video_id.to_string()))
}

fn ensure_updated(video_id: &str, rows_affected: u64) -> Result<(), RecordError> {
    if rows_affected == 0 {
        return Err(RecordError::NotFound(video_id.to_string()));
    }
    Ok(())
}

fn write_error(video_id: &str, e: sqlx::Error) -> RecordError {
    RecordError::Write {
        id: video_id.to_string(),
        message: e.to_string(),
    }
}
