//! Per-request metrics envelope: per-stage latencies, LLM token
//! counts, a `from_cache` flag, and a cost estimate. Attached to every
//! response, including failed ones.

use serde::{Deserialize, Serialize};

/// Price constants for cost estimation, configured rather than hard-coded so
/// pricing changes don't require a code change.
#[derive(Debug, Clone, Copy)]
pub struct PriceConfig {
    pub llm_input_per_1k: f64,
    pub llm_output_per_1k: f64,
    pub embedding_per_1k: f64,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            llm_input_per_1k: 0.003,
            llm_output_per_1k: 0.015,
            embedding_per_1k: 0.0001,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageLatencies {
    pub llm_ms: u64,
    pub embedding_ms: u64,
    pub index_ms: u64,
    pub total_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub latencies: StageLatencies,
    pub tokens: TokenUsage,
    pub embedding_calls: u32,
    pub from_cache: bool,
    pub estimated_cost_usd: f64,
}

impl Metrics {
    pub fn estimate_cost(&mut self, prices: &PriceConfig) {
        let llm_cost = (self.tokens.input_tokens as f64 / 1000.0) * prices.llm_input_per_1k
            + (self.tokens.output_tokens as f64 / 1000.0) * prices.llm_output_per_1k;
        let embedding_cost = (self.embedding_calls as f64 / 1000.0) * prices.embedding_per_1k;
        self.estimated_cost_usd = llm_cost + embedding_cost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_estimate_is_zero_for_empty_metrics() {
        let mut metrics = Metrics::default();
        metrics.estimate_cost(&PriceConfig::default());
        assert_eq!(metrics.estimated_cost_usd, 0.0);
    }

    #[test]
    fn cost_estimate_scales_with_tokens() {
        let mut metrics = Metrics {
            tokens: TokenUsage {
                input_tokens: 1000,
                output_tokens: 1000,
            },
            ..Default::default()
        };
        metrics.estimate_cost(&PriceConfig::default());
        assert!(metrics.estimated_cost_usd > 0.0);
    }
}
