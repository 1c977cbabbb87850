use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use bytes::Bytes;
use tracing::info;

use super::transfer::{ObjectReader, ObjectStore, ObjectWriter};
use crate::common::upload::MultipartUploader;

/// S3-compatible object storage (GCS interoperability endpoint, MinIO, S3).
#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
}

impl StorageService {
    pub fn new(endpoint: &str, region: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");

        let config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            // A failed call fails the run; redelivery is the only retry.
            .retry_config(RetryConfig::disabled())
            .build();

        let client = Client::from_conf(config);

        info!("✅ Configured object storage client for {}", endpoint);

        Self { client }
    }

    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| anyhow!("put object {}/{}: {}", bucket, key, aws_sdk_s3::Error::from(e)))?;

        Ok(())
    }

    pub async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<String> {
        let result = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| anyhow!("initiate upload {}/{}: {}", bucket, key, aws_sdk_s3::Error::from(e)))?;

        result
            .upload_id
            .ok_or_else(|| anyhow!("initiate upload {}/{}: no upload id returned", bucket, key))
    }

    pub async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<CompletedPart> {
        let result = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| anyhow!("upload part {}: {}", part_number, aws_sdk_s3::Error::from(e)))?;

        let e_tag = result
            .e_tag
            .ok_or_else(|| anyhow!("upload part {}: no ETag returned", part_number))?;

        Ok(CompletedPart::builder()
            .e_tag(e_tag)
            .part_number(part_number)
            .build())
    }

    pub async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()> {
        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| anyhow!("complete upload {}/{}: {}", bucket, key, aws_sdk_s3::Error::from(e)))?;

        Ok(())
    }

    pub async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| anyhow!("abort upload {}/{}: {}", bucket, key, aws_sdk_s3::Error::from(e)))?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn open_reader(&self, bucket: &str, key: &str) -> Result<ObjectReader> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("get object {}/{}: {}", bucket, key, aws_sdk_s3::Error::from(e)))?;

        Ok(Box::pin(output.body.into_async_read()))
    }

    async fn open_writer(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<Box<dyn ObjectWriter>> {
        Ok(Box::new(MultipartUploader::new(
            self.clone(),
            bucket,
            key,
            content_type,
        )))
    }
}
