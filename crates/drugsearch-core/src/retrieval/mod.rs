//! Retrieval engine (component F)
//!
//! Builds a prefilter from the planner's filters, embeds the expanded query
//! text, and fuses a vector KNN pass with a parallel lexical pass into one
//! scored candidate list per NDC - the input [`crate::grouping`] folds into
//! families.

use std::collections::HashMap;
use std::time::Instant;

use crate::config::RetrievalConfig;
use crate::domain::{PlannerResult, QueryFilters, ScoredCandidate};
use crate::embeddings::EmbeddingClient;
use crate::store::{FilterExpr, IndexQuery, IndexStore, KnnQuery, NumericFilter, TagFilter, TagField, TextMatch};

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum RetrievalError {
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
}

/// Usage/latency accounting for a single [`RetrievalEngine::retrieve`] call,
/// folded into the response's metrics envelope by the facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetrievalMetrics {
    pub embedding_ms: u64,
    pub embedding_calls: u32,
    pub index_ms: u64,
}

/// Builds the index prefilter from a planner's tag-vocabulary filters.
/// Pipe-separated values in a single field OR together; distinct fields AND.
fn build_filter_expr(filters: &QueryFilters, text: Option<TextMatch>) -> FilterExpr {
    let mut tags = Vec::new();

    if let Some(is_generic) = filters.is_generic {
        tags.push(TagFilter {
            field: TagField::IsGeneric,
            values: vec![if is_generic { "1" } else { "0" }.to_string()],
        });
    }
    if let Some(dosage_form) = &filters.dosage_form {
        tags.push(pipe_separated(TagField::DosageForm, dosage_form));
    }
    if let Some(dea_schedule) = &filters.dea_schedule {
        tags.push(pipe_separated(TagField::DeaSchedule, dea_schedule));
    }
    if let Some(drug_class) = &filters.drug_class {
        tags.push(pipe_separated(TagField::DrugClass, drug_class));
    }
    if let Some(therapeutic_class) = &filters.therapeutic_class {
        tags.push(pipe_separated(TagField::TherapeuticClass, therapeutic_class));
    }

    FilterExpr {
        tags,
        gcn_seqno: None,
        text,
    }
}

fn pipe_separated(field: TagField, raw: &str) -> TagFilter {
    TagFilter {
        field,
        values: raw.split('|').map(|v| v.trim().to_string()).collect(),
    }
}

/// Whitespace-collapsed, case-insensitive containment of the raw query -
/// the rule that forces a candidate's score to 1.0. Uses "contains" rather
/// than strict equality so it agrees with the grouper's own Exact
/// classification (a document whose name merely contains the raw query
/// must still land its family at best_score=1.0, not just literal matches).
fn is_exact_name_match(name: &str, raw_query: &str) -> bool {
    fn normalize(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }
    let raw = normalize(raw_query);
    !name.is_empty() && !raw.is_empty() && normalize(name).contains(&raw)
}

pub struct RetrievalEngine<'a> {
    store: &'a dyn IndexStore,
    embeddings: &'a dyn EmbeddingClient,
    config: RetrievalConfig,
}

impl<'a> RetrievalEngine<'a> {
    pub fn new(
        store: &'a dyn IndexStore,
        embeddings: &'a dyn EmbeddingClient,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embeddings,
            config,
        }
    }

    /// `raw_query` drives the lexical pass and the exact-match scoring rule;
    /// callers pass the planner's corrected `expanded_text` so a typo'd
    /// query still dominates once the planner has fixed the spelling.
    pub async fn retrieve(
        &self,
        raw_query: &str,
        plan: &PlannerResult,
        max_results: usize,
    ) -> Result<(Vec<ScoredCandidate>, RetrievalMetrics), RetrievalError> {
        let max_results = max_results.clamp(1, self.config.max_results_cap);
        let k = std::cmp::max(2 * max_results, 40);

        let lexical_query = IndexQuery {
            filter: Some(build_filter_expr(&plan.filters, Some(TextMatch::names(raw_query)))),
            knn: None,
            limit: max_results,
        };

        // The two passes are independent: a remote embedding call and a
        // local filter query. Joined rather than sequenced so total latency
        // tracks the slower of the two, per the concurrency contract. Each
        // branch times itself so the join's wall-clock overlap doesn't get
        // attributed to both stages.
        let (embed_result, lexical_result) = tokio::join!(
            self.embeddings.embed(&plan.expanded_text),
            async {
                let started = Instant::now();
                let hits = self.store.query(&lexical_query);
                (hits, started.elapsed().as_millis() as u64)
            },
        );

        let (lexical_hits, lexical_ms) = lexical_result;
        let lexical_hits = lexical_hits.map_err(|e| RetrievalError::IndexUnavailable(e.to_string()))?;

        let mut metrics = RetrievalMetrics {
            embedding_calls: 1,
            index_ms: lexical_ms,
            ..Default::default()
        };

        // Embedding failure degrades to lexical-only retrieval rather
        // than failing the whole search.
        let vector_hits = match embed_result {
            Ok((embedding, embed_metrics)) => {
                metrics.embedding_ms = embed_metrics.latency_ms;
                let vector_query = IndexQuery {
                    filter: if plan.filters.is_empty() {
                        None
                    } else {
                        Some(build_filter_expr(&plan.filters, None))
                    },
                    knn: Some(KnnQuery {
                        vector: embedding.vector,
                        k,
                    }),
                    limit: k,
                };
                let started = Instant::now();
                let hits = self
                    .store
                    .query(&vector_query)
                    .map_err(|e| RetrievalError::IndexUnavailable(e.to_string()))?;
                metrics.index_ms += started.elapsed().as_millis() as u64;
                hits
            }
            Err(_) => Vec::new(),
        };

        let mut fused: HashMap<String, ScoredCandidate> = HashMap::new();

        for hit in vector_hits {
            // `vector_score` is already a cosine similarity (`1 - distance`),
            // computed once at the store boundary.
            let score = hit.vector_score.unwrap_or(0.0).clamp(0.0, 1.0);
            fused.insert(
                hit.document.ndc.clone(),
                ScoredCandidate {
                    document: hit.document,
                    score,
                    lexical_hit: false,
                },
            );
        }

        for hit in lexical_hits {
            fused
                .entry(hit.document.ndc.clone())
                .and_modify(|existing| {
                    existing.lexical_hit = true;
                    existing.score = (existing.score + self.config.lexical_boost).min(1.0);
                })
                .or_insert_with(|| ScoredCandidate {
                    document: hit.document,
                    score: self.config.lexical_boost.min(1.0),
                    lexical_hit: true,
                });
        }

        for candidate in fused.values_mut() {
            if is_exact_name_match(&candidate.document.drug_name, raw_query)
                || is_exact_name_match(&candidate.document.brand_name, raw_query)
            {
                candidate.score = 1.0;
            }
        }

        let mut candidates: Vec<ScoredCandidate> = fused.into_values().collect();
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok((candidates, metrics))
    }
}
