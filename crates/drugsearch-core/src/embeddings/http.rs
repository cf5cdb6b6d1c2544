//! Network-backed embedding client with bounded exponential backoff.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{truncate_input, Embedding, EmbeddingClient, EmbeddingError, EmbeddingMetrics};
use crate::config::EmbeddingConfig;

const MAX_RETRIES: u32 = 2;
const BASE_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Talks to the configured embedding provider over HTTP. Retries
/// transport-level failures with exponential backoff (max 2 retries) before
/// surfacing [`EmbeddingError::UpstreamUnavailable`].
pub struct HttpEmbeddingClient {
    http: reqwest::Client,
    config: EmbeddingConfig,
}

impl HttpEmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut request = self.http.post(&self.config.endpoint).json(&EmbedRequest {
            model: &self.config.model_id,
            input: text,
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbeddingError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::UpstreamUnavailable(format!(
                "embedding provider returned {}",
                response.status()
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::UpstreamUnavailable(e.to_string()))?;

        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<(Embedding, EmbeddingMetrics), EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }
        let text = truncate_input(text);

        let started = Instant::now();
        let mut attempt = 0;
        loop {
            match self.embed_once(text).await {
                Ok(vector) => {
                    let metrics = EmbeddingMetrics {
                        latency_ms: started.elapsed().as_millis() as u64,
                    };
                    return Ok((Embedding { vector }, metrics));
                }
                Err(err) if attempt < MAX_RETRIES => {
                    attempt += 1;
                    tokio::time::sleep(BASE_BACKOFF * 2u32.pow(attempt - 1)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
