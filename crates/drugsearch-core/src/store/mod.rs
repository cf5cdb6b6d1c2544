//! Vector+attribute index store (component E)
//!
//! The store contract: document put/get/delete by key, hybrid query
//! combining tag/numeric/text filters with KNN on the embedding, and a
//! distinct namespace for semantic-cache entries. The reference
//! implementation embeds SQLite (FTS5 for text, plain columns for tags and
//! `gcn_seqno`) alongside an HNSW vector index per namespace; a remote index
//! service can implement the same [`IndexStore`] trait without touching the
//! online pipeline.

mod filter;
mod migrations;
mod sqlite;
#[cfg(feature = "vector-search")]
mod vector_index;

pub use filter::{FilterExpr, KnnQuery, NumericFilter, NumericOp, TagFilter, TagField, TextMatch};
pub use sqlite::SqliteIndexStore;

use crate::domain::DrugDocument;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("index unreachable: {0}")]
    Unavailable(String),
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// A query against [`IndexStore::query`]: an optional prefilter, an optional
/// KNN branch, and a result limit. Either branch may be empty.
#[derive(Debug, Clone, Default)]
pub struct IndexQuery {
    pub filter: Option<FilterExpr>,
    pub knn: Option<KnnQuery>,
    pub limit: usize,
}

/// One result row: the document, its vector similarity score when the query
/// had a KNN branch, and whether it also satisfied the filter/text branch.
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub document: DrugDocument,
    pub vector_score: Option<f32>,
    pub lexical_hit: bool,
}

/// A stored semantic-cache row, keyed by surrogate id and searched by cosine
/// similarity on `query_embedding`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub id: String,
    pub query_text: String,
    pub stored_output: String,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCacheEntry {
    pub query_text: String,
    pub query_embedding: Vec<f32>,
    pub stored_output: String,
}

/// Narrow capability surface E is pluggable behind: put/get/query
/// for documents, lookup/store for the semantic-cache namespace.
pub trait IndexStore: Send + Sync {
    fn put(&self, document: &DrugDocument) -> Result<(), StoreError>;
    fn get(&self, ndc: &str) -> Result<Option<DrugDocument>, StoreError>;
    fn delete(&self, ndc: &str) -> Result<bool, StoreError>;
    fn query(&self, query: &IndexQuery) -> Result<Vec<IndexHit>, StoreError>;

    /// KNN=1 against the cache namespace; callers apply the similarity
    /// threshold and TTL themselves so the store stays policy-free.
    fn cache_nearest(&self, embedding: &[f32]) -> Result<Option<(CacheEntry, f32)>, StoreError>;
    fn cache_store(&self, entry: NewCacheEntry) -> Result<(), StoreError>;
}
