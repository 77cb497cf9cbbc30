//! HTTP client for the remote shot-analysis service

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::ShotSegmenter;
use crate::ports::*;

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    video_path: String,
    features: &'a [String],
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    shots: Vec<RemoteShot>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteShot {
    start_time: f64,
    end_time: f64,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

/// Map a transport error onto the domain taxonomy
pub(crate) fn map_transport_error(service: &str, timeout: Duration, err: reqwest::Error) -> DomainError {
    if err.is_timeout() {
        DomainError::Timeout {
            operation: service.to_string(),
            seconds: timeout.as_secs(),
        }
    } else {
        DomainError::ServiceUnavailable(format!("{}: {}", service, err))
    }
}

/// Map a non-success HTTP status; server-side errors are worth retrying
pub(crate) fn map_status(service: &str, status: reqwest::StatusCode) -> DomainError {
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        DomainError::ServiceUnavailable(format!("{} returned {}", service, status))
    } else {
        DomainError::InvalidResponse(format!("{} returned {}", service, status))
    }
}

/// Turn a decoded response body into a domain analysis
fn into_analysis(response: AnalyzeResponse) -> CloudAnalysis {
    let shots = response
        .shots
        .into_iter()
        .enumerate()
        .filter_map(|(i, s)| ShotInterval::new(i, s.start_time, s.end_time, s.confidence, ShotKind::Cloud).ok())
        .collect();

    CloudAnalysis {
        success: response.success,
        shots: ShotSegmenter::sanitize_external(shots),
        error: response.error,
    }
}

/// Parse a raw response body; exposed for tests
pub fn parse_analysis(body: &str) -> Result<CloudAnalysis, DomainError> {
    let response: AnalyzeResponse = serde_json::from_str(body)
        .map_err(|e| DomainError::InvalidResponse(format!("cloud analyzer: {}", e)))?;
    Ok(into_analysis(response))
}

/// Cloud analyzer reached over HTTP
pub struct HttpCloudAnalyzer {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpCloudAnalyzer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::BadArgs(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }
}

#[async_trait]
impl CloudAnalyzerPort for HttpCloudAnalyzer {
    async fn analyze(&self, video_path: &Path, features: &[String]) -> Result<CloudAnalysis, DomainError> {
        let url = format!("{}/analyze", self.endpoint);
        let request = AnalyzeRequest {
            video_path: video_path.to_string_lossy().to_string(),
            features,
        };
        debug!(%url, video = %video_path.display(), "Requesting cloud analysis");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error("cloud analyzer", self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status("cloud analyzer", status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error("cloud analyzer", self.timeout, e))?;
        parse_analysis(&body)
    }
}
