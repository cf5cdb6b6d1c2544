//! Deterministic in-process embedding client for tests and offline demos.

use async_trait::async_trait;

use super::{Embedding, EmbeddingClient, EmbeddingError, EmbeddingMetrics};

/// Hashes text into a deterministic unit vector of the configured dimension.
/// Similar strings (shared tokens) land closer together than unrelated ones,
/// which is enough to exercise grouping/ranking without a live provider.
pub struct MockEmbeddingClient {
    dim: usize,
}

impl MockEmbeddingClient {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl EmbeddingClient for MockEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<(Embedding, EmbeddingMetrics), EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }
        let lowercased = text.to_lowercase();
        let tokens: Vec<&str> = lowercased.split_whitespace().collect();
        let mut vector = vec![0.0f32; self.dim];
        for token in &tokens {
            let seed = fnv1a(token);
            for (i, slot) in vector.iter_mut().enumerate() {
                let bit = (seed.rotate_left(i as u32 % 64) & 1) as f32;
                *slot += if bit == 0.0 { -1.0 } else { 1.0 };
            }
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok((
            Embedding { vector },
            EmbeddingMetrics { latency_ms: 0 },
        ))
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in s.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_produces_same_vector() {
        let client = MockEmbeddingClient::new(16);
        let (a, _) = client.embed("crestor 10 mg").await.unwrap();
        let (b, _) = client.embed("crestor 10 mg").await.unwrap();
        assert_eq!(a.vector, b.vector);
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let client = MockEmbeddingClient::new(16);
        assert!(client.embed("   ").await.is_err());
    }

    #[tokio::test]
    async fn vector_has_configured_dimension() {
        let client = MockEmbeddingClient::new(32);
        let (embedding, _) = client.embed("rosuvastatin").await.unwrap();
        assert_eq!(embedding.vector.len(), 32);
    }
}
