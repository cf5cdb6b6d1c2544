//! In-process HNSW index (via `usearch`), gated behind the `vector-search`
//! feature. One instance backs the drug-document namespace, driven entirely
//! by [`super::sqlite::SqliteIndexStore`]. The semantic-cache namespace is
//! small enough to search with a linear cosine scan instead (see
//! `sqlite.rs`'s `cache_nearest`), so it never instantiates a second index.

use std::collections::HashMap;

use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum VectorIndexError {
    #[error("failed to create index: {0}")]
    Creation(String),
    #[error("failed to add vector: {0}")]
    Add(String),
    #[error("failed to search: {0}")]
    Search(String),
    #[error("expected {expected} dimensions, got {actual}")]
    InvalidDimensions { expected: usize, actual: usize },
}

#[derive(Debug, Clone)]
pub struct VectorIndexConfig {
    pub dimensions: usize,
    pub connectivity: usize,
    pub expansion_add: usize,
    pub expansion_search: usize,
}

impl VectorIndexConfig {
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            connectivity: 16,
            expansion_add: 128,
            expansion_search: 64,
        }
    }
}

/// HNSW index over string keys, cosine metric. Distances returned by
/// `usearch` are converted to similarity scores (`1.0 - distance`) at the
/// boundary so callers never deal with raw cosine distance.
pub struct VectorIndex {
    index: Index,
    dimensions: usize,
    key_to_id: HashMap<String, u64>,
    id_to_key: HashMap<u64, String>,
    next_id: u64,
}

impl VectorIndex {
    pub fn new(config: VectorIndexConfig) -> Result<Self, VectorIndexError> {
        let options = IndexOptions {
            dimensions: config.dimensions,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: config.connectivity,
            expansion_add: config.expansion_add,
            expansion_search: config.expansion_search,
            multi: false,
        };
        let index = Index::new(&options).map_err(|e| VectorIndexError::Creation(e.to_string()))?;
        Ok(Self {
            index,
            dimensions: config.dimensions,
            key_to_id: HashMap::new(),
            id_to_key: HashMap::new(),
            next_id: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.index.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_dims(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimensions {
            return Err(VectorIndexError::InvalidDimensions {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    fn ensure_capacity(&self) -> Result<(), VectorIndexError> {
        let capacity = self.index.capacity();
        let size = self.index.size();
        if size >= capacity {
            let new_capacity = std::cmp::max(capacity * 2, 16);
            self.index
                .reserve(new_capacity)
                .map_err(|e| VectorIndexError::Creation(e.to_string()))?;
        }
        Ok(())
    }

    /// Upserts by key: an existing key's vector is replaced in place.
    pub fn upsert(&mut self, key: &str, vector: &[f32]) -> Result<(), VectorIndexError> {
        self.check_dims(vector)?;

        if let Some(&existing_id) = self.key_to_id.get(key) {
            self.index
                .remove(existing_id)
                .map_err(|e| VectorIndexError::Add(e.to_string()))?;
            self.ensure_capacity()?;
            self.index
                .add(existing_id, vector)
                .map_err(|e| VectorIndexError::Add(e.to_string()))?;
            return Ok(());
        }

        self.ensure_capacity()?;
        let id = self.next_id;
        self.next_id += 1;
        self.index
            .add(id, vector)
            .map_err(|e| VectorIndexError::Add(e.to_string()))?;
        self.key_to_id.insert(key.to_string(), id);
        self.id_to_key.insert(id, key.to_string());
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<bool, VectorIndexError> {
        if let Some(id) = self.key_to_id.remove(key) {
            self.id_to_key.remove(&id);
            self.index
                .remove(id)
                .map_err(|e| VectorIndexError::Add(e.to_string()))?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>, VectorIndexError> {
        self.check_dims(query)?;
        if self.is_empty() {
            return Ok(vec![]);
        }
        let results = self
            .index
            .search(query, k)
            .map_err(|e| VectorIndexError::Search(e.to_string()))?;

        let mut hits = Vec::with_capacity(results.keys.len());
        for (id, distance) in results.keys.iter().zip(results.distances.iter()) {
            if let Some(key) = self.id_to_key.get(id) {
                hits.push((key.clone(), 1.0 - distance));
            }
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_search_returns_self_as_top_hit() {
        let mut index = VectorIndex::new(VectorIndexConfig::with_dimensions(4)).unwrap();
        index.upsert("drug:0001", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        index.upsert("drug:0002", &[0.0, 1.0, 0.0, 0.0]).unwrap();

        let hits = index.search(&[1.0, 0.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].0, "drug:0001");
        assert!(hits[0].1 > 0.99);
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let index = VectorIndex::new(VectorIndexConfig::with_dimensions(4)).unwrap();
        let err = index.search(&[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, VectorIndexError::InvalidDimensions { .. }));
    }

    #[test]
    fn remove_makes_key_unsearchable() {
        let mut index = VectorIndex::new(VectorIndexConfig::with_dimensions(4)).unwrap();
        index.upsert("drug:0001", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(index.remove("drug:0001").unwrap());
        assert!(index.is_empty());
    }
}
