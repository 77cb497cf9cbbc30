//! HTTP client for the vision-language embedding service

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::adapters::cloud_http::{map_status, map_transport_error};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

#[derive(Debug, Serialize)]
struct EmbedRequest {
    frames: Vec<EncodedFrame>,
}

#[derive(Debug, Serialize)]
struct EncodedFrame {
    width: u32,
    height: u32,
    rgb_base64: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

fn encode_frames(frames: &[Frame]) -> EmbedRequest {
    EmbedRequest {
        frames: frames
            .iter()
            .map(|f| EncodedFrame {
                width: f.width,
                height: f.height,
                rgb_base64: STANDARD.encode(&f.rgb),
            })
            .collect(),
    }
}

/// Decode and sanity-check an embedding response for `expected` frames
pub fn parse_embeddings(body: &str, expected: usize) -> Result<Vec<Vec<f32>>, DomainError> {
    let response: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| DomainError::InvalidResponse(format!("embedding service: {}", e)))?;

    if response.embeddings.len() != expected {
        return Err(DomainError::InvalidResponse(format!(
            "embedding service returned {} vectors for {} frames",
            response.embeddings.len(),
            expected
        )));
    }
    let width = response.embeddings.first().map_or(0, Vec::len);
    if width == 0 || response.embeddings.iter().any(|e| e.len() != width) {
        return Err(DomainError::InvalidResponse(
            "embedding service returned ragged or empty vectors".to_string(),
        ));
    }
    Ok(response.embeddings)
}

/// Embedding model served over HTTP
pub struct HttpEmbeddingClient {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpEmbeddingClient {
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
impl EmbeddingPort for HttpEmbeddingClient {
    async fn embed(&self, frames: &[Frame]) -> Result<Vec<Vec<f32>>, DomainError> {
        if frames.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/embed", self.endpoint))
            .json(&encode_frames(frames))
            .send()
            .await
            .map_err(|e| map_transport_error("embedding service", self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status("embedding service", status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error("embedding service", self.timeout, e))?;
        parse_embeddings(&body, frames.len())
    }
}
