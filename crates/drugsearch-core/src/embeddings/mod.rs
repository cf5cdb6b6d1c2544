//! Embedding client (component A)
//!
//! Text -> fixed-dimension dense vector, treated as a black-box network
//! service. No local ONNX inference: the provider and model are
//! configuration, not code.

mod http;
mod mock;

pub use http::HttpEmbeddingClient;
pub use mock::MockEmbeddingClient;

use async_trait::async_trait;

/// Maximum input length accepted before truncation to the model's input cap.
pub const MAX_TEXT_LENGTH: usize = 8192;

#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddingMetrics {
    pub latency_ms: u64,
}

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum EmbeddingError {
    #[error("embedding provider unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("invalid embedding input: {0}")]
    InvalidInput(String),
}

/// Narrow capability surface for embedding providers (runtime
/// polymorphism behind a trait, never a class hierarchy).
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<(Embedding, EmbeddingMetrics), EmbeddingError>;
}

/// Truncate oversized input to the model's cap on a char boundary.
pub fn truncate_input(text: &str) -> &str {
    if text.len() <= MAX_TEXT_LENGTH {
        return text;
    }
    let mut end = MAX_TEXT_LENGTH;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Cosine similarity between two equal-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot = dot_product(a, b);
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Cosine distance: `1 - cosine_similarity`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
