use std::path::PathBuf;

use url::Url;

use crate::config::env::{self, ConfigError, EnvKey, ProcessEnv, Source};
use crate::modules::trigger::dto::ExecutionParameters;

/// Settings for the notification-facing trigger service.
#[derive(Clone, Debug)]
pub struct TriggerConfig {
    pub server_port: u16,
    pub gcp_project: String,
    pub gcp_region: String,
    pub job_name: String,
    pub hls_bucket: String,
}

impl TriggerConfig {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl Source) -> Result<Self, ConfigError> {
        Ok(Self {
            server_port: env::get_parsed(source, EnvKey::ServerPort, 8080)?,
            gcp_project: env::get(source, EnvKey::GcpProject)?,
            gcp_region: env::get(source, EnvKey::GcpRegion)?,
            job_name: env::get(source, EnvKey::JobName)?,
            hls_bucket: env::get(source, EnvKey::HlsBucket)?,
        })
    }
}

/// Settings for one run of the transcoder job. The execution overrides set by
/// the trigger arrive here as `params`.
#[derive(Clone, Debug)]
pub struct TranscoderConfig {
    pub params: ExecutionParameters,
    pub raw_bucket: String,
    pub cdn_base_url: Url,
    pub database_url: String,
    pub storage_endpoint: String,
    pub storage_region: String,
    pub storage_access_key: String,
    pub storage_secret_key: String,
    pub work_dir: PathBuf,
    pub ffmpeg_bin: String,
    pub manifest_uri_scheme: String,
}

impl TranscoderConfig {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source(source: &impl Source) -> Result<Self, ConfigError> {
        let params = ExecutionParameters {
            video_id: env::get(source, EnvKey::VideoId)?,
            raw_object_path: env::get(source, EnvKey::RawObjectPath)?,
            hls_bucket: env::get(source, EnvKey::HlsBucket)?,
        };

        let raw_cdn = env::get(source, EnvKey::CdnBaseUrl)?;
        let cdn_base_url = Url::parse(raw_cdn.trim_end_matches('/')).map_err(|e| {
            ConfigError::Invalid {
                key: EnvKey::CdnBaseUrl.as_str(),
                reason: e.to_string(),
            }
        })?;

        let work_dir = env::get(source, EnvKey::WorkDir)
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir());

        Ok(Self {
            params,
            raw_bucket: env::get(source, EnvKey::RawBucket)?,
            cdn_base_url,
            database_url: env::get(source, EnvKey::DatabaseUrl)?,
            storage_endpoint: env::get(source, EnvKey::StorageEndpoint)?,
            storage_region: env::get_or(source, EnvKey::StorageRegion, "auto"),
            storage_access_key: env::get(source, EnvKey::StorageAccessKey)?,
            storage_secret_key: env::get(source, EnvKey::StorageSecretKey)?,
            work_dir,
            ffmpeg_bin: env::get_or(source, EnvKey::FfmpegBin, "ffmpeg"),
            manifest_uri_scheme: env::get_or(source, EnvKey::ManifestUriScheme, "gs"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn transcoder_env() -> HashMap<String, String> {
        [
            ("VIDEO_ID", "550e8400-e29b-41d4-a716-446655440000"),
            ("RAW_OBJECT_PATH", "raw/550e8400-e29b-41d4-a716-446655440000.mp4"),
            ("HLS_BUCKET", "hls-output"),
            ("RAW_BUCKET", "raw-uploads"),
            ("CDN_BASE_URL", "https://cdn.example.com/"),
            ("DATABASE_URL", "postgres://localhost/videos"),
            ("S3_ENDPOINT", "https://storage.googleapis.com"),
            ("AWS_ACCESS_KEY_ID", "key"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn transcoder_config_reads_overrides_and_defaults() {
        let cfg = TranscoderConfig::from_source(&transcoder_env()).unwrap();

        assert_eq!(cfg.params.video_id, "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(cfg.params.hls_bucket, "hls-output");
        assert_eq!(cfg.raw_bucket, "raw-uploads");
        assert_eq!(cfg.storage_region, "auto");
        assert_eq!(cfg.ffmpeg_bin, "ffmpeg");
        assert_eq!(cfg.manifest_uri_scheme, "gs");
        assert_eq!(cfg.cdn_base_url.as_str().trim_end_matches('/'), "https://cdn.example.com");
    }

    #[test]
    fn transcoder_config_reports_each_missing_required_key() {
        for key in [
            "VIDEO_ID",
            "RAW_OBJECT_PATH",
            "HLS_BUCKET",
            "RAW_BUCKET",
            "CDN_BASE_URL",
            "DATABASE_URL",
        ] {
            let mut vars = transcoder_env();
            vars.remove(key);
            let err = TranscoderConfig::from_source(&vars).unwrap_err();
            assert_eq!(err, ConfigError::Missing(key), "removing {key}");
        }
    }

    #[test]
    fn transcoder_config_rejects_relative_cdn_url() {
        let mut vars = transcoder_env();
        vars.insert("CDN_BASE_URL".into(), "cdn.example.com".into());
        assert!(matches!(
            TranscoderConfig::from_source(&vars),
            Err(ConfigError::Invalid { key: "CDN_BASE_URL", .. })
        ));
    }

    #[test]
    fn trigger_config_defaults_port() {
        let vars: HashMap<String, String> = [
            ("GCP_PROJECT", "proj"),
            ("GCP_REGION", "us-central1"),
            ("JOB_NAME", "transcoder"),
            ("HLS_BUCKET", "hls-output"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let cfg = TriggerConfig::from_source(&vars).unwrap();
        assert_eq!(cfg.server_port, 8080);
        assert_eq!(cfg.job_name, "transcoder");
    }
}
