//! Client for the external embedding service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Turns question text into a fixed-length embedding via a remote call.
///
/// A trait seam so the orchestrator can be exercised against mocks; the
/// production implementation is [`HttpEmbedder`].
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// HTTP client for the embedding service.
///
/// Single attempt per request; any transport or protocol failure is
/// terminal for the request. The inner `reqwest::Client` pools
/// connections and is safe to share across concurrent requests.
pub struct HttpEmbedder {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpEmbedder {
    /// Build an embedder against the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&EmbedRequest { text })
            .send()
            .await
            .map_err(|e| AppError::EmbedUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::EmbedProtocol(format!("HTTP {status}: {body}")));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::EmbedProtocol(format!("Invalid JSON response: {e}")))?;

        tracing::debug!(dim = parsed.embedding.len(), "Received query embedding");

        Ok(parsed.embedding)
    }
}
