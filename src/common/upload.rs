use crate::infrastructure::storage::s3::StorageService;
use crate::infrastructure::storage::transfer::ObjectWriter;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::types::CompletedPart;
use bytes::Bytes;
use tracing::warn;

// Minimum part size for S3 is 5MB. We use 6MB to be safe.
pub const MIN_PART_SIZE: usize = 6 * 1024 * 1024;

/// Streams an object into storage. Small objects never leave the buffer and
/// are written with one `PutObject` on finish; larger ones switch to a
/// multipart upload as soon as a full part is buffered.
pub struct MultipartUploader {
    storage: StorageService,
    bucket: String,
    key: String,
    content_type: String,
    upload_id: Option<String>,
    parts: Vec<CompletedPart>,
    part_number: i32,
    buffer: Vec<u8>,
}

impl MultipartUploader {
    pub fn new(storage: StorageService, bucket: &str, key: &str, content_type: &str) -> Self {
        Self {
            storage,
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            upload_id: None,
            parts: Vec::new(),
            part_number: 1,
            buffer: Vec::with_capacity(MIN_PART_SIZE),
        }
    }

    async fn flush_part(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let upload_id = match &self.upload_id {
            Some(id) => id.clone(),
            None => {
                let id = self
                    .storage
                    .create_multipart_upload(&self.bucket, &self.key, &self.content_type)
                    .await?;
                self.upload_id = Some(id.clone());
                id
            }
        };

        let body = Bytes::from(std::mem::take(&mut self.buffer));
        self.buffer.reserve(MIN_PART_SIZE);

        let part = self
            .storage
            .upload_part(&self.bucket, &self.key, &upload_id, self.part_number, body)
            .await
            .map_err(|e| anyhow!("Failed to upload part {}: {}", self.part_number, e))?;

        self.parts.push(part);
        self.part_number += 1;

        Ok(())
    }
}

#[async_trait]
impl ObjectWriter for MultipartUploader {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<()> {
        self.buffer.extend_from_slice(&chunk);

        if self.buffer.len() >= MIN_PART_SIZE {
            self.flush_part().await?;
        }

        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<()> {
        let mut this = *self;

        let Some(upload_id) = this.upload_id.clone() else {
            let body = Bytes::from(std::mem::take(&mut this.buffer));
            return this
                .storage
                .put_object(&this.bucket, &this.key, &this.content_type, body)
                .await;
        };

        // Remaining bytes go up as the last part, which may be short.
        let completed = match this.flush_part().await {
            Ok(()) => this
                .storage
                .complete_multipart_upload(
                    &this.bucket,
                    &this.key,
                    &upload_id,
                    std::mem::take(&mut this.parts),
                )
                .await
                .map_err(|e| anyhow!("Failed to complete upload: {}", e)),
            Err(e) => Err(e),
        };

        if let Err(e) = completed {
            if let Err(abort_err) = this
                .storage
                .abort_multipart_upload(&this.bucket, &this.key, &upload_id)
                .await
            {
                warn!(
                    "Failed to abort upload {} of {}/{}: {:#}",
                    upload_id, this.bucket, this.key, abort_err
                );
            }
            return Err(e);
        }

        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        match &self.upload_id {
            Some(upload_id) => self
                .storage
                .abort_multipart_upload(&self.bucket, &self.key, upload_id)
                .await
                .map_err(|e| anyhow!("Failed to abort upload: {}", e)),
            None => Ok(()),
        }
    }
}
