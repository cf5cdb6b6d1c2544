//! # drugsearch-core
//!
//! Hybrid retrieval and ranking engine for free-text drug search over an
//! NDC corpus. A query is expanded and filtered by an LLM-backed planner
//! (with a semantic cache in front of it), retrieved by fusing a vector KNN
//! pass with a lexical FTS5 pass, then folded into brand/generic families
//! and ranked deterministically.
//!
//! ## Pipeline
//!
//! - [`embeddings`] (A) - text to dense vector, black-box network service.
//! - [`llm`] (B) - query expansion/correction, same black-box contract.
//! - [`store`] (C, E) - semantic cache lookup and the vector+attribute index.
//! - [`planner`] (D) - cache-then-LLM-then-null-plan.
//! - [`retrieval`] (F) - vector/lexical fusion into scored candidates.
//! - [`grouping`] (G) - brand/generic family folding and final ranking.
//! - [`detail`] (H) - single-document lookup and therapeutic alternatives.
//!
//! [`SearchService`] wires all of the above into the three public
//! operations: `search`, `drug`, `alternatives`.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use drugsearch_core::{Config, SearchService};
//! use drugsearch_core::llm::HttpLlmClient;
//! use drugsearch_core::embeddings::HttpEmbeddingClient;
//! use drugsearch_core::store::SqliteIndexStore;
//!
//! let config = Config::from_env();
//! let llm = HttpLlmClient::new(config.llm.clone());
//! let embeddings = HttpEmbeddingClient::new(config.embedding.clone());
//! let store = SqliteIndexStore::open("drugsearch.db".into(), config.embedding.dim)?;
//!
//! let service = SearchService::new(&llm, &embeddings, &store, config);
//! let response = service.search("crestor", None, None).await?;
//! # Ok::<(), drugsearch_core::error::Error>(())
//! ```
//!
//! ## Feature flags
//!
//! - `vector-search` (default): enable HNSW vector search via `usearch`.
//! - `bundled-sqlite` (default): statically link SQLite rather than
//!   requiring a system library.

pub mod config;
pub mod detail;
pub mod embeddings;
pub mod error;
pub mod domain;
pub mod grouping;
pub mod llm;
pub mod metrics;
pub mod planner;
pub mod retrieval;
mod service;
pub mod store;

pub use config::Config;
pub use domain::{DrugDocument, Family, MatchType, PlannerResult, QueryFilters, ScoredCandidate, Variant};
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use service::{AlternativesResponse, DrugResponse, QueryEcho, SearchResponse, SearchService};

/// Crate version, surfaced for diagnostics and the CLI's `--version` flag.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
