//! Domain types - the document schema and query/response shapes shared by
//! every pipeline stage.
//!
//! Mirrors the drug document contract: one document per active NDC, a
//! structured planner result, and the family/variant shape the grouper
//! emits.

use serde::{Deserialize, Serialize};

/// A single NDC-level drug document as loaded by the (external) nightly
/// loader. The online path treats this as read-only.
///
/// Invariants enforced by [`DrugDocument::validate`]:
/// - `ndc` is non-empty and is the document's unique key suffix.
/// - `embedding` has exactly `dimensions` entries when present.
/// - `drug_class` is present for every generic row.
/// - `brand_name` is present for every non-generic row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugDocument {
    pub ndc: String,
    pub drug_name: String,
    #[serde(default)]
    pub brand_name: String,
    pub generic_name: String,
    pub drug_class: String,
    pub therapeutic_class: String,
    pub gcn_seqno: i64,
    pub dosage_form: String,
    pub strength: String,
    pub route: String,
    pub manufacturer_name: String,
    pub is_generic: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub dea_schedule: String,
    /// Dense embedding, float32, dimension fixed by [`crate::config::EmbeddingConfig::dim`].
    #[serde(default)]
    pub embedding: Vec<f32>,
}

fn default_true() -> bool {
    true
}

/// A document-shape invariant was violated.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DocumentError {
    #[error("ndc must be non-empty")]
    EmptyNdc,
    #[error("embedding has {actual} dimensions, expected {expected}")]
    BadEmbeddingDim { expected: usize, actual: usize },
    #[error("generic document {ndc} is missing drug_class")]
    MissingDrugClass { ndc: String },
    #[error("branded document {ndc} is missing brand_name")]
    MissingBrandName { ndc: String },
}

impl DrugDocument {
    /// The storage key this document is addressed by: `drug:{ndc}`.
    pub fn key(&self) -> String {
        format!("drug:{}", self.ndc)
    }

    /// Validate the drug-document invariants: embedding dimension, NDC
    /// format, and the generic/brand field-presence rules.
    /// `expected_dim` is `0` to skip the embedding dimension check (e.g. for
    /// documents that failed embedding and fell back to lexical-only rows).
    pub fn validate(&self, expected_dim: usize) -> Result<(), DocumentError> {
        if self.ndc.trim().is_empty() {
            return Err(DocumentError::EmptyNdc);
        }
        if expected_dim > 0 && !self.embedding.is_empty() && self.embedding.len() != expected_dim
        {
            return Err(DocumentError::BadEmbeddingDim {
                expected: expected_dim,
                actual: self.embedding.len(),
            });
        }
        if self.is_generic && self.drug_class.trim().is_empty() {
            return Err(DocumentError::MissingDrugClass {
                ndc: self.ndc.clone(),
            });
        }
        if !self.is_generic && self.brand_name.trim().is_empty() {
            return Err(DocumentError::MissingBrandName {
                ndc: self.ndc.clone(),
            });
        }
        Ok(())
    }
}

/// Tag/attribute/text filters a search may be narrowed by. Pipe-separated
/// values on a single field are OR'd; distinct fields are AND'd.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryFilters {
    pub drug_class: Option<String>,
    pub therapeutic_class: Option<String>,
    pub indication: Option<String>,
    pub dosage_form: Option<String>,
    pub is_generic: Option<bool>,
    pub dea_schedule: Option<String>,
}

impl QueryFilters {
    pub fn is_empty(&self) -> bool {
        self.drug_class.is_none()
            && self.therapeutic_class.is_none()
            && self.indication.is_none()
            && self.dosage_form.is_none()
            && self.is_generic.is_none()
            && self.dea_schedule.is_none()
    }
}

/// The structured output of the query planner (component D).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlannerResult {
    pub expanded_text: String,
    #[serde(default)]
    pub filters: QueryFilters,
    #[serde(default)]
    pub corrections: Vec<String>,
    pub confidence: f32,
    /// Observability only: not used downstream for fusion or ranking (open
    /// question: treated as observability only unless fusion is revisited).
    #[serde(default)]
    pub from_cache: bool,
}

impl PlannerResult {
    /// The fallback used when the LLM call fails or its output can't be
    /// parsed. Never fails the search.
    pub fn null_plan(raw_query: &str) -> Self {
        Self {
            expanded_text: raw_query.to_string(),
            filters: QueryFilters::default(),
            corrections: Vec::new(),
            confidence: 0.0,
            from_cache: false,
        }
    }
}

/// How a [`Family`] relates to the raw user query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    Exact,
    #[serde(rename = "Therapeutic_Equivalent")]
    TherapeuticEquivalent,
    Alternative,
}

impl MatchType {
    /// Rank bucket: lower sorts first in the final family ordering.
    pub fn rank(self) -> u8 {
        match self {
            MatchType::Exact => 0,
            MatchType::TherapeuticEquivalent => 1,
            MatchType::Alternative => 2,
        }
    }
}

/// A single NDC within a grouped family, as returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub ndc: String,
    pub label: String,
    pub strength: String,
    pub manufacturer: String,
    pub dosage_form: String,
    pub is_generic: bool,
    pub score: f32,
    pub dea_schedule: String,
}

/// A brand- or generic-drug family folded from one or more NDC hits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub group_key: String,
    pub display_name: String,
    pub match_type: MatchType,
    pub match_reason: String,
    pub representative: Variant,
    pub variants: Vec<Variant>,
    pub best_score: f32,
}

/// A candidate NDC emerging from retrieval, before grouping.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub document: DrugDocument,
    pub score: f32,
    pub lexical_hit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_generic() -> DrugDocument {
        DrugDocument {
            ndc: "00310075139".into(),
            drug_name: "ROSUVASTATIN CALCIUM 10 MG TABLET".into(),
            brand_name: String::new(),
            generic_name: "rosuvastatin calcium".into(),
            drug_class: "ROSUVASTATIN CALCIUM".into(),
            therapeutic_class: "HMG-COA REDUCTASE INHIBITORS".into(),
            gcn_seqno: 12345,
            dosage_form: "TABLET".into(),
            strength: "10 MG".into(),
            route: "ORAL".into(),
            manufacturer_name: "Generic Labs".into(),
            is_generic: true,
            is_active: true,
            dea_schedule: String::new(),
            embedding: vec![0.0; 4],
        }
    }

    #[test]
    fn validate_rejects_generic_without_drug_class() {
        let mut doc = sample_generic();
        doc.drug_class.clear();
        assert!(matches!(
            doc.validate(4),
            Err(DocumentError::MissingDrugClass { .. })
        ));
    }

    #[test]
    fn validate_rejects_branded_without_brand_name() {
        let mut doc = sample_generic();
        doc.is_generic = false;
        assert!(matches!(
            doc.validate(4),
            Err(DocumentError::MissingBrandName { .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_embedding_dim() {
        let doc = sample_generic();
        assert!(matches!(
            doc.validate(8),
            Err(DocumentError::BadEmbeddingDim { .. })
        ));
    }

    #[test]
    fn key_is_namespaced_by_ndc() {
        let doc = sample_generic();
        assert_eq!(doc.key(), "drug:00310075139");
    }

    #[test]
    fn null_plan_never_fails() {
        let plan = PlannerResult::null_plan("crestor");
        assert_eq!(plan.expanded_text, "crestor");
        assert_eq!(plan.confidence, 0.0);
        assert!(plan.filters.is_empty());
    }
}
