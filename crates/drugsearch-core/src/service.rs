//! Top-level request facade
//!
//! Wires components A-H into the three public operations: `search`, `drug`,
//! `alternatives`. Owns nothing stateful itself - every dependency is a
//! borrowed trait object, so callers choose the concrete providers (HTTP or
//! mock) and the index store backing E.

use std::time::Instant;

use tracing::instrument;

use crate::config::Config;
use crate::domain::{DrugDocument, Family, QueryFilters};
use crate::detail::{Alternatives, DetailService};
use crate::embeddings::EmbeddingClient;
use crate::error::{Error, Result};
use crate::grouping::group_and_rank;
use crate::llm::LlmClient;
use crate::metrics::Metrics;
use crate::planner::QueryPlanner;
use crate::retrieval::RetrievalEngine;
use crate::store::IndexStore;

/// Echo of the query as received, as expanded by the planner, and any
/// spelling corrections applied - returned alongside `results`.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEcho {
    pub original: String,
    pub expanded: String,
    pub corrections: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<Family>,
    pub query: QueryEcho,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugResponse {
    pub document: DrugDocument,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativesResponse {
    pub drug: DrugDocument,
    pub alternatives: Alternatives,
    pub metrics: Metrics,
}

pub struct SearchService<'a> {
    llm: &'a dyn LlmClient,
    embeddings: &'a dyn EmbeddingClient,
    store: &'a dyn IndexStore,
    config: Config,
}

impl<'a> SearchService<'a> {
    pub fn new(
        llm: &'a dyn LlmClient,
        embeddings: &'a dyn EmbeddingClient,
        store: &'a dyn IndexStore,
        config: Config,
    ) -> Self {
        Self {
            llm,
            embeddings,
            store,
            config,
        }
    }

    #[instrument(skip(self, filters))]
    pub async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
        filters: Option<QueryFilters>,
    ) -> Result<SearchResponse> {
        let started = Instant::now();
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("query must not be empty".to_string()));
        }
        let max_results = max_results.unwrap_or(self.config.retrieval.default_k);
        if max_results == 0 || max_results > self.config.retrieval.max_results_cap {
            return Err(Error::InvalidInput(format!(
                "max_results must be in 1..={}",
                self.config.retrieval.max_results_cap
            )));
        }

        let planner = QueryPlanner::new(self.llm, self.embeddings, self.store, self.config.cache.clone());
        let (mut plan, plan_metrics) = planner.plan(query).await;
        if let Some(overrides) = filters {
            plan.filters = merge_filters(plan.filters, overrides);
        }

        let retrieval = RetrievalEngine::new(self.store, self.embeddings, self.config.retrieval.clone());
        // Exactness and lexical matching run against the planner's corrected
        // text, not the literal keystrokes, so a typo query still dominates
        // once the planner has fixed the spelling.
        let (candidates, retrieval_metrics) = retrieval
            .retrieve(&plan.expanded_text, &plan, max_results)
            .await
            .map_err(|e| Error::ServiceUnavailable(e.to_string()))?;

        let results = group_and_rank(candidates, &plan.expanded_text, &plan, max_results);

        let mut metrics = Metrics {
            from_cache: plan.from_cache,
            tokens: crate::metrics::TokenUsage {
                input_tokens: plan_metrics.usage.input_tokens,
                output_tokens: plan_metrics.usage.output_tokens,
            },
            embedding_calls: plan_metrics.embedding_calls + retrieval_metrics.embedding_calls,
            latencies: crate::metrics::StageLatencies {
                llm_ms: plan_metrics.llm_latency_ms,
                embedding_ms: plan_metrics.embedding_latency_ms + retrieval_metrics.embedding_ms,
                index_ms: retrieval_metrics.index_ms,
                total_ms: 0,
            },
            ..Default::default()
        };
        metrics.latencies.total_ms = started.elapsed().as_millis() as u64;
        metrics.estimate_cost(&crate::metrics::PriceConfig::default());

        Ok(SearchResponse {
            results,
            query: QueryEcho {
                original: query.to_string(),
                expanded: plan.expanded_text,
                corrections: plan.corrections,
            },
            metrics,
        })
    }

    #[instrument(skip(self))]
    pub fn drug(&self, ndc: &str) -> Result<DrugResponse> {
        let started = Instant::now();
        if ndc.trim().is_empty() {
            return Err(Error::InvalidInput("ndc must not be empty".to_string()));
        }
        let document = DetailService::new(self.store).get_detail(ndc)?;
        let mut metrics = Metrics::default();
        metrics.latencies.total_ms = started.elapsed().as_millis() as u64;
        Ok(DrugResponse { document, metrics })
    }

    #[instrument(skip(self))]
    pub fn alternatives(&self, ndc: &str) -> Result<AlternativesResponse> {
        let started = Instant::now();
        if ndc.trim().is_empty() {
            return Err(Error::InvalidInput("ndc must not be empty".to_string()));
        }
        let service = DetailService::new(self.store);
        let drug = service.get_detail(ndc)?;
        let alternatives = service.get_alternatives(ndc)?;
        let mut metrics = Metrics::default();
        metrics.latencies.total_ms = started.elapsed().as_millis() as u64;
        Ok(AlternativesResponse {
            drug,
            alternatives,
            metrics,
        })
    }
}

/// Caller-supplied filters narrow, never widen, the planner's own filters:
/// a caller value wins wherever both are set.
fn merge_filters(planner: QueryFilters, caller: QueryFilters) -> QueryFilters {
    QueryFilters {
        drug_class: caller.drug_class.or(planner.drug_class),
        therapeutic_class: caller.therapeutic_class.or(planner.therapeutic_class),
        indication: caller.indication.or(planner.indication),
        dosage_form: caller.dosage_form.or(planner.dosage_form),
        is_generic: caller.is_generic.or(planner.is_generic),
        dea_schedule: caller.dea_schedule.or(planner.dea_schedule),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DrugDocument;
    use crate::embeddings::MockEmbeddingClient;
    use crate::llm::{MockBehavior, MockLlmClient};
    use crate::store::SqliteIndexStore;

    fn doc(ndc: &str, name: &str, brand: &str, generic: bool) -> DrugDocument {
        DrugDocument {
            ndc: ndc.to_string(),
            drug_name: name.to_string(),
            brand_name: brand.to_string(),
            generic_name: name.to_lowercase(),
            drug_class: "ROSUVASTATIN CALCIUM".to_string(),
            therapeutic_class: "HMG-COA REDUCTASE INHIBITORS".to_string(),
            gcn_seqno: 12345,
            dosage_form: "TABLET".to_string(),
            strength: "10 MG".to_string(),
            route: "ORAL".to_string(),
            manufacturer_name: "Labs".to_string(),
            is_generic: generic,
            is_active: true,
            dea_schedule: String::new(),
            embedding: vec![0.1, 0.2, 0.3, 0.4],
        }
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let llm = MockLlmClient::new(MockBehavior::AlwaysFail);
        let embeddings = MockEmbeddingClient::new(4);
        let store = SqliteIndexStore::open_in_memory(4).unwrap();
        let service = SearchService::new(&llm, &embeddings, &store, Config::default());

        let err = service.search("   ", None, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn search_degrades_to_lexical_when_llm_is_down() {
        let llm = MockLlmClient::new(MockBehavior::AlwaysFail);
        let embeddings = MockEmbeddingClient::new(4);
        let store = SqliteIndexStore::open_in_memory(4).unwrap();
        store.put(&doc("00310075139", "CRESTOR 10 MG TABLET", "CRESTOR", false)).unwrap();

        let service = SearchService::new(&llm, &embeddings, &store, Config::default());
        let response = service.search("crestor", None, None).await.unwrap();

        assert!(!response.results.is_empty());
        assert_eq!(response.results[0].match_type, crate::domain::MatchType::Exact);
    }

    #[test]
    fn unknown_ndc_returns_not_found() {
        let llm = MockLlmClient::new(MockBehavior::AlwaysFail);
        let embeddings = MockEmbeddingClient::new(4);
        let store = SqliteIndexStore::open_in_memory(4).unwrap();
        let service = SearchService::new(&llm, &embeddings, &store, Config::default());

        assert!(matches!(service.drug("00000000000"), Err(Error::NotFound(_))));
    }
}
