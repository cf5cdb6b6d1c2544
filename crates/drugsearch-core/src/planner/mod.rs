//! Query planner (component D)
//!
//! Cache-then-LLM-then-null-plan: a cache hit short-circuits the LLM call
//! entirely; an LLM failure or unparsable output degrades to a null plan
//! rather than failing the search.

use chrono::Utc;

use crate::config::CacheConfig;
use crate::domain::{PlannerResult, QueryFilters};
use crate::embeddings::EmbeddingClient;
use crate::llm::{ConverseOptions, LlmClient, LlmMetrics, Message, Usage};
use crate::store::IndexStore;

const SYSTEM_PROMPT: &str = "You expand and correct free-text drug search queries. Expand \
abbreviations, normalize brand/generic naming, classify dosage form and route when stated, \
infer therapeutic class from indication phrases, and correct likely misspellings. Respond with \
strict JSON: {\"expandedText\": string, \"filters\": {\"drugClass\"?: string, \
\"therapeuticClass\"?: string, \"indication\"?: string, \"dosageForm\"?: string, \
\"isGeneric\"?: bool, \"deaSchedule\"?: string}, \"corrections\": string[], \"confidence\": number}.";

const ALLOWED_DOSAGE_FORMS: &[&str] = &[
    "TABLET", "CAPSULE", "SOLUTION", "INJECTION", "CREAM", "OINTMENT", "SUSPENSION", "PATCH", "INHALER",
];
const ALLOWED_DEA_SCHEDULES: &[&str] = &["", "1", "2", "3", "4", "5"];

/// Usage/latency accounting for a single [`QueryPlanner::plan`] call, folded
/// into the response's metrics envelope by the facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanMetrics {
    pub usage: Usage,
    pub llm_latency_ms: u64,
    pub embedding_latency_ms: u64,
    pub embedding_calls: u32,
}

/// Drops any filter value outside the closed vocabularies rather than
/// letting the LLM invent a tag the index has no rows for.
fn enforce_vocabulary(mut filters: QueryFilters) -> QueryFilters {
    if let Some(dosage_form) = &filters.dosage_form {
        if !ALLOWED_DOSAGE_FORMS.contains(&dosage_form.to_uppercase().as_str()) {
            filters.dosage_form = None;
        }
    }
    if let Some(dea_schedule) = &filters.dea_schedule {
        if !ALLOWED_DEA_SCHEDULES.contains(&dea_schedule.to_uppercase().as_str()) {
            filters.dea_schedule = None;
        }
    }
    filters
}

pub struct QueryPlanner<'a> {
    llm: &'a dyn LlmClient,
    embeddings: &'a dyn EmbeddingClient,
    store: &'a dyn IndexStore,
    cache: CacheConfig,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(
        llm: &'a dyn LlmClient,
        embeddings: &'a dyn EmbeddingClient,
        store: &'a dyn IndexStore,
        cache: CacheConfig,
    ) -> Self {
        Self {
            llm,
            embeddings,
            store,
            cache,
        }
    }

    pub async fn plan(&self, raw_query: &str) -> (PlannerResult, PlanMetrics) {
        let trimmed = raw_query.trim();

        match self.embeddings.embed(trimmed).await {
            Ok((embedding, embed_metrics)) => {
                let mut metrics = PlanMetrics {
                    embedding_calls: 1,
                    embedding_latency_ms: embed_metrics.latency_ms,
                    ..Default::default()
                };

                if let Ok(Some((entry, similarity))) = self.store.cache_nearest(&embedding.vector) {
                    let distance = 1.0 - similarity;
                    let age = Utc::now().signed_duration_since(entry.stored_at).num_seconds();
                    if distance <= self.cache.similarity_threshold && age <= self.cache.ttl_seconds {
                        if let Ok(mut cached) = serde_json::from_str::<PlannerResult>(&entry.stored_output) {
                            cached.from_cache = true;
                            return (cached, metrics);
                        }
                    }
                }

                let (plan, usage, llm_metrics) = self.plan_via_llm(trimmed).await;
                metrics.usage = usage;
                metrics.llm_latency_ms = llm_metrics.total_latency_ms;
                if let Ok(serialized) = serde_json::to_string(&plan) {
                    let _ = self.store.cache_store(crate::store::NewCacheEntry {
                        query_text: trimmed.to_string(),
                        query_embedding: embedding.vector,
                        stored_output: serialized,
                    });
                }
                (plan, metrics)
            }
            Err(_) => {
                // Cache lookup requires an embedding; if A is down, skip the
                // cache entirely rather than blocking the planner on it.
                let (plan, usage, llm_metrics) = self.plan_via_llm(trimmed).await;
                (
                    plan,
                    PlanMetrics {
                        usage,
                        llm_latency_ms: llm_metrics.total_latency_ms,
                        embedding_latency_ms: 0,
                        embedding_calls: 0,
                    },
                )
            }
        }
    }

    async fn plan_via_llm(&self, trimmed: &str) -> (PlannerResult, Usage, LlmMetrics) {
        let messages = [Message::user(trimmed)];
        let options = ConverseOptions {
            system: Some(SYSTEM_PROMPT),
            max_tokens: None,
            temperature: Some(0.0),
        };

        match self.llm.converse(&messages, options).await {
            Ok((content, usage, metrics)) => match serde_json::from_str::<PlannerResult>(&content) {
                Ok(mut plan) => {
                    plan.filters = enforce_vocabulary(plan.filters);
                    plan.from_cache = false;
                    (plan, usage, metrics)
                }
                Err(_) => (PlannerResult::null_plan(trimmed), usage, metrics),
            },
            Err(_) => (PlannerResult::null_plan(trimmed), Usage::default(), LlmMetrics::default()),
        }
    }
}
