use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvKey {
    ServerPort,
    GcpProject,
    GcpRegion,
    JobName,
    HlsBucket,
    VideoId,
    RawBucket,
    RawObjectPath,
    CdnBaseUrl,
    DatabaseUrl,
    StorageEndpoint,
    StorageRegion,
    StorageAccessKey,
    StorageSecretKey,
    WorkDir,
    FfmpegBin,
    ManifestUriScheme,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "PORT",
            EnvKey::GcpProject => "GCP_PROJECT",
            EnvKey::GcpRegion => "GCP_REGION",
            EnvKey::JobName => "JOB_NAME",
            EnvKey::HlsBucket => "HLS_BUCKET",
            EnvKey::VideoId => "VIDEO_ID",
            EnvKey::RawBucket => "RAW_BUCKET",
            EnvKey::RawObjectPath => "RAW_OBJECT_PATH",
            EnvKey::CdnBaseUrl => "CDN_BASE_URL",
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::StorageEndpoint => "S3_ENDPOINT",
            EnvKey::StorageRegion => "S3_REGION",
            EnvKey::StorageAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::StorageSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::WorkDir => "TRANSCODER_WORK_DIR",
            EnvKey::FfmpegBin => "FFMPEG_BIN",
            EnvKey::ManifestUriScheme => "MANIFEST_URI_SCHEME",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {key} has an invalid value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Reads configuration values by key name. The process environment is the
/// production source; tests hand in a map.
pub trait Source {
    fn lookup(&self, key: &str) -> Option<String>;
}

pub struct ProcessEnv;

impl Source for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl Source for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Empty values count as unset.
pub fn get(source: &impl Source, key: EnvKey) -> Result<String, ConfigError> {
    match source.lookup(key.as_str()) {
        Some(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(ConfigError::Missing(key.as_str())),
    }
}

pub fn get_or(source: &impl Source, key: EnvKey, default: &str) -> String {
    get(source, key).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T>(source: &impl Source, key: EnvKey, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(source, key) {
        Ok(val) => val.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key: key.as_str(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_value_is_treated_as_missing() {
        let source = HashMap::from([("VIDEO_ID".to_string(), "   ".to_string())]);
        assert_eq!(
            get(&source, EnvKey::VideoId),
            Err(ConfigError::Missing("VIDEO_ID"))
        );
    }

    #[test]
    fn get_parsed_falls_back_only_when_unset() {
        let unset: HashMap<String, String> = HashMap::new();
        assert_eq!(get_parsed(&unset, EnvKey::ServerPort, 8080u16), Ok(8080));

        let garbage = HashMap::from([("PORT".to_string(), "eighty".to_string())]);
        assert!(matches!(
            get_parsed(&garbage, EnvKey::ServerPort, 8080u16),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
    }
}
