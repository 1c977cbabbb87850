use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::config::env::EnvKey;
use crate::modules::trigger::dto::ExecutionParameters;

pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("auth error: {0}")]
    Auth(String),

    #[error("dispatch error: {message}")]
    Dispatch {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },
}

impl InvokeError {
    fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
            status: None,
            body: None,
        }
    }
}

/// Starts an isolated transcoder execution for one video.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, params: &ExecutionParameters) -> Result<(), InvokeError>;
}

/// Starts Cloud Run Job executions over the Jobs REST API, authenticating with
/// a short-lived token from the instance metadata server. No retries: a
/// failure goes straight back to the caller.
pub struct CloudRunJobRunner {
    project: String,
    region: String,
    job_name: String,
    transport: Arc<dyn HttpTransport>,
    token_url: String,
    api_base_url: Option<String>,
}

impl CloudRunJobRunner {
    pub fn new(project: &str, region: &str, job_name: &str) -> Self {
        Self {
            project: project.to_string(),
            region: region.to_string(),
            job_name: job_name.to_string(),
            transport: Arc::new(ReqwestTransport::new()),
            token_url: METADATA_TOKEN_URL.to_string(),
            api_base_url: None,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Replaces `https://<region>-run.googleapis.com`.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn run_job_url(&self) -> String {
        let base = self
            .api_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}-run.googleapis.com", self.region));
        format!(
            "{}/v2/projects/{}/locations/{}/jobs/{}:run",
            base.trim_end_matches('/'),
            self.project,
            self.region,
            self.job_name
        )
    }

    async fn access_token(&self) -> Result<String, InvokeError> {
        let request =
            HttpRequest::new(Method::GET, &self.token_url).header("Metadata-Flavor", "Google");

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| InvokeError::Auth(format!("metadata request: {e}")))?;

        if response.status != StatusCode::OK {
            return Err(InvokeError::Auth(format!(
                "metadata server returned {}",
                response.status.as_u16()
            )));
        }

        let token: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| InvokeError::Auth(format!("decode token response: {e}")))?;

        match token.access_token {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(InvokeError::Auth(
                "empty access token from metadata server".to_string(),
            )),
        }
    }
}

#[async_trait]
impl JobExecutor for CloudRunJobRunner {
    async fn execute(&self, params: &ExecutionParameters) -> Result<(), InvokeError> {
        let token = self.access_token().await?;

        let body = serde_json::to_vec(&build_run_body(params))
            .map_err(|e| InvokeError::dispatch(format!("marshal run body: {e}")))?;

        let url = self.run_job_url();
        debug!("POST {}", url);

        let request = HttpRequest::new(Method::POST, url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {token}"))
            .body(body);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| InvokeError::dispatch(format!("run job request: {e}")))?;

        if !response.status.is_success() {
            let raw = String::from_utf8_lossy(&response.body).into_owned();
            return Err(InvokeError::Dispatch {
                message: format!("run job API returned {}: {}", response.status.as_u16(), raw),
                status: Some(response.status.as_u16()),
                body: Some(raw),
            });
        }

        info!(
            video_id = %params.video_id,
            job = %self.job_name,
            "🚀 Started transcoder execution"
        );
        Ok(())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RunBody {
    pub overrides: RunOverrides,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RunOverrides {
    #[serde(rename = "containerOverrides")]
    pub container_overrides: Vec<ContainerOverride>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ContainerOverride {
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// The override names are the keys the transcoder reads its config from.
pub fn build_run_body(params: &ExecutionParameters) -> RunBody {
    let env = [
        (EnvKey::RawObjectPath, &params.raw_object_path),
        (EnvKey::VideoId, &params.video_id),
        (EnvKey::HlsBucket, &params.hls_bucket),
    ]
    .into_iter()
    .map(|(key, value)| EnvVar {
        name: key.as_str().to_string(),
        value: value.clone(),
    })
    .collect();

    RunBody {
        overrides: RunOverrides {
            container_overrides: vec![ContainerOverride { env }],
        },
    }
}
