//! Centralized configuration: model identity and every tunable threshold
//! are an explicit value threaded through each component constructor,
//! never a module-level singleton.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub model_id: String,
    pub dim: usize,
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: env_or("DRUGSEARCH_EMBEDDING_MODEL_ID", "text-embedding-3-large"),
            dim: env_or("DRUGSEARCH_EMBEDDING_DIM", "1024")
                .parse()
                .unwrap_or(1024),
            endpoint: env_or(
                "DRUGSEARCH_EMBEDDING_ENDPOINT",
                "https://api.embeddings.example/v1/embeddings",
            ),
            api_key: std::env::var("DRUGSEARCH_EMBEDDING_API_KEY").ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub endpoint: String,
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_id: env_or("DRUGSEARCH_LLM_MODEL_ID", "claude-query-planner"),
            max_tokens: env_or("DRUGSEARCH_LLM_MAX_TOKENS", "512")
                .parse()
                .unwrap_or(512),
            temperature: env_or("DRUGSEARCH_LLM_TEMPERATURE", "0.0")
                .parse()
                .unwrap_or(0.0),
            endpoint: env_or(
                "DRUGSEARCH_LLM_ENDPOINT",
                "https://api.llm.example/v1/messages",
            ),
            api_key: std::env::var("DRUGSEARCH_LLM_API_KEY").ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Delta: max cosine distance accepted as a cache hit.
    pub similarity_threshold: f32,
    pub ttl_seconds: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: env_or("DRUGSEARCH_CACHE_SIMILARITY_THRESHOLD", "0.05")
                .parse()
                .unwrap_or(0.05),
            ttl_seconds: env_or("DRUGSEARCH_CACHE_TTL_SECONDS", "604800")
                .parse()
                .unwrap_or(604_800),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub default_k: usize,
    pub max_results_cap: usize,
    /// Beta: additive score boost for lexical hits.
    pub lexical_boost: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: env_or("DRUGSEARCH_RETRIEVAL_DEFAULT_K", "20")
                .parse()
                .unwrap_or(20),
            max_results_cap: env_or("DRUGSEARCH_RETRIEVAL_MAX_RESULTS_CAP", "100")
                .parse()
                .unwrap_or(100),
            lexical_boost: env_or("DRUGSEARCH_RETRIEVAL_LEXICAL_BOOST", "0.15")
                .parse()
                .unwrap_or(0.15),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Reference to a secret store entry, never the secret value itself.
    pub auth_secret_ref: Option<String>,
    /// Path to the embedded store file when running the bundled reference
    /// implementation instead of a remote index service.
    pub local_path: Option<std::path::PathBuf>,
}

impl Default for IndexConnectionConfig {
    fn default() -> Self {
        Self {
            host: env_or("DRUGSEARCH_INDEX_HOST", "localhost"),
            port: env_or("DRUGSEARCH_INDEX_PORT", "0").parse().unwrap_or(0),
            auth_secret_ref: std::env::var("DRUGSEARCH_INDEX_AUTH_SECRET_REF").ok(),
            local_path: std::env::var("DRUGSEARCH_INDEX_LOCAL_PATH")
                .ok()
                .map(std::path::PathBuf::from),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeadlinesConfig {
    pub planner_ms: u64,
    pub embedding_ms: u64,
    pub index_ms: u64,
    pub total_ms: u64,
}

impl Default for DeadlinesConfig {
    fn default() -> Self {
        Self {
            planner_ms: env_or("DRUGSEARCH_DEADLINE_PLANNER_MS", "3000")
                .parse()
                .unwrap_or(3000),
            embedding_ms: env_or("DRUGSEARCH_DEADLINE_EMBEDDING_MS", "1000")
                .parse()
                .unwrap_or(1000),
            index_ms: env_or("DRUGSEARCH_DEADLINE_INDEX_MS", "2000")
                .parse()
                .unwrap_or(2000),
            total_ms: env_or("DRUGSEARCH_DEADLINE_TOTAL_MS", "6000")
                .parse()
                .unwrap_or(6000),
        }
    }
}

impl DeadlinesConfig {
    pub fn planner(&self) -> Duration {
        Duration::from_millis(self.planner_ms)
    }
    pub fn embedding(&self) -> Duration {
        Duration::from_millis(self.embedding_ms)
    }
    pub fn index(&self) -> Duration {
        Duration::from_millis(self.index_ms)
    }
    pub fn total(&self) -> Duration {
        Duration::from_millis(self.total_ms)
    }
}

/// The full configuration surface, constructed once at
/// startup and threaded through every component constructor.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub cache: CacheConfig,
    pub retrieval: RetrievalConfig,
    pub index: IndexConnectionConfig,
    pub deadlines: DeadlinesConfig,
}

impl Config {
    /// Build configuration from environment variables, falling back to the
    /// documented defaults for anything unset.
    pub fn from_env() -> Self {
        Self::default()
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
