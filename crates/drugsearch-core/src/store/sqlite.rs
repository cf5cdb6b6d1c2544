//! SQLite-backed [`IndexStore`]: FTS5 for text, plain columns for tags and
//! `gcn_seqno`, and (with the `vector-search` feature) an in-process HNSW
//! index over the embedding column. Semantic-cache rows live in their own
//! table and are searched by a linear cosine scan - the cache is small
//! enough that an ANN index would be overhead, not a speedup.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

#[cfg(feature = "vector-search")]
use super::vector_index::{VectorIndex, VectorIndexConfig};
use super::filter::{FilterExpr, NumericOp, TagField};
use super::{CacheEntry, IndexHit, IndexQuery, IndexStore, NewCacheEntry, StoreError};
use crate::domain::DrugDocument;
use crate::embeddings::cosine_similarity;

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn blob_to_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Quotes each token for FTS5 MATCH and appends a prefix wildcard, so stray
/// punctuation in user input can't break the query syntax.
fn sanitize_fts5_query(query: &str) -> Option<String> {
    let sanitized: Vec<String> = query
        .split_whitespace()
        .map(|tok| tok.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|tok: &String| !tok.is_empty())
        .map(|tok| format!("\"{tok}\"*"))
        .collect();
    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized.join(" "))
    }
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<DrugDocument> {
    let embedding_blob: Option<Vec<u8>> = row.get("embedding")?;
    Ok(DrugDocument {
        ndc: row.get("ndc")?,
        drug_name: row.get("drug_name")?,
        brand_name: row.get("brand_name")?,
        generic_name: row.get("generic_name")?,
        drug_class: row.get("drug_class")?,
        therapeutic_class: row.get("therapeutic_class")?,
        gcn_seqno: row.get("gcn_seqno")?,
        dosage_form: row.get("dosage_form")?,
        strength: row.get("strength")?,
        route: row.get("route")?,
        manufacturer_name: row.get("manufacturer_name")?,
        is_generic: row.get("is_generic")?,
        is_active: row.get("is_active")?,
        dea_schedule: row.get("dea_schedule")?,
        embedding: embedding_blob.map(|b| blob_to_vector(&b)).unwrap_or_default(),
    })
}

pub struct SqliteIndexStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    #[cfg(feature = "vector-search")]
    documents_index: Mutex<VectorIndex>,
}

impl SqliteIndexStore {
    fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA mmap_size = 268435456;",
        )
    }

    pub fn open(path: PathBuf, embedding_dim: usize) -> Result<Self, StoreError> {
        let writer_conn =
            Connection::open(&path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let reader_conn =
            Connection::open(&path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::from_connections(writer_conn, reader_conn, embedding_dim)
    }

    /// An in-memory store, backed by a uniquely-named shared-cache database
    /// so the writer and reader handles see the same data - a bare
    /// `:memory:` connection is private to the connection that opened it.
    pub fn open_in_memory(embedding_dim: usize) -> Result<Self, StoreError> {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::Relaxed);
        let uri = format!("file:drugsearch_mem_{id}?mode=memory&cache=shared");
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI;

        let writer_conn = Connection::open_with_flags(&uri, flags)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let reader_conn = Connection::open_with_flags(&uri, flags)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::from_connections(writer_conn, reader_conn, embedding_dim)
    }

    fn from_connections(
        writer_conn: Connection,
        reader_conn: Connection,
        embedding_dim: usize,
    ) -> Result<Self, StoreError> {
        Self::configure_connection(&writer_conn)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        super::migrations::apply_migrations(&writer_conn)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::configure_connection(&reader_conn)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let store = Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            #[cfg(feature = "vector-search")]
            documents_index: Mutex::new(
                VectorIndex::new(VectorIndexConfig::with_dimensions(embedding_dim))
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?,
            ),
        };

        #[cfg(feature = "vector-search")]
        store.load_documents_into_index()?;

        Ok(store)
    }

    #[cfg(feature = "vector-search")]
    fn load_documents_into_index(&self) -> Result<(), StoreError> {
        let reader = self.reader.lock().expect("reader lock poisoned");
        let mut stmt = reader
            .prepare("SELECT ndc, embedding FROM drug_documents WHERE embedding IS NOT NULL")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let rows: Vec<(String, Vec<u8>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        drop(stmt);
        drop(reader);

        let mut index = self.documents_index.lock().expect("index lock poisoned");
        for (ndc, blob) in rows {
            let vector = blob_to_vector(&blob);
            if let Err(e) = index.upsert(&format!("drug:{ndc}"), &vector) {
                tracing::warn!(ndc, error = %e, "failed to load embedding into index");
            }
        }
        Ok(())
    }

    fn build_filter_sql(filter: &FilterExpr) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut clauses: Vec<String> = vec!["is_active = 1".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        for tag in &filter.tags {
            let placeholders: Vec<String> = tag
                .values
                .iter()
                .map(|v| {
                    params.push(Box::new(v.clone()));
                    "?".to_string()
                })
                .collect();
            clauses.push(format!(
                "{} IN ({})",
                tag.field.column(),
                placeholders.join(", ")
            ));
        }

        if let Some(numeric) = &filter.gcn_seqno {
            match numeric.op {
                NumericOp::Eq => {
                    clauses.push("gcn_seqno = ?".to_string());
                    params.push(Box::new(numeric.low));
                }
                NumericOp::Ne => {
                    clauses.push("gcn_seqno != ?".to_string());
                    params.push(Box::new(numeric.low));
                }
                NumericOp::Range => {
                    clauses.push("gcn_seqno BETWEEN ? AND ?".to_string());
                    params.push(Box::new(numeric.low));
                    params.push(Box::new(numeric.high));
                }
            }
        }

        (clauses.join(" AND "), params)
    }
}

impl IndexStore for SqliteIndexStore {
    fn put(&self, document: &DrugDocument) -> Result<(), StoreError> {
        let blob = if document.embedding.is_empty() {
            None
        } else {
            Some(vector_to_blob(&document.embedding))
        };

        {
            let writer = self.writer.lock().expect("writer lock poisoned");
            writer
                .execute(
                    "INSERT INTO drug_documents (
                        ndc, drug_name, brand_name, generic_name, drug_class,
                        therapeutic_class, gcn_seqno, dosage_form, strength, route,
                        manufacturer_name, is_generic, is_active, dea_schedule, embedding
                    ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)
                    ON CONFLICT(ndc) DO UPDATE SET
                        drug_name=excluded.drug_name, brand_name=excluded.brand_name,
                        generic_name=excluded.generic_name, drug_class=excluded.drug_class,
                        therapeutic_class=excluded.therapeutic_class, gcn_seqno=excluded.gcn_seqno,
                        dosage_form=excluded.dosage_form, strength=excluded.strength,
                        route=excluded.route, manufacturer_name=excluded.manufacturer_name,
                        is_generic=excluded.is_generic, is_active=excluded.is_active,
                        dea_schedule=excluded.dea_schedule, embedding=excluded.embedding",
                    params![
                        document.ndc,
                        document.drug_name,
                        document.brand_name,
                        document.generic_name,
                        document.drug_class,
                        document.therapeutic_class,
                        document.gcn_seqno,
                        document.dosage_form,
                        document.strength,
                        document.route,
                        document.manufacturer_name,
                        document.is_generic,
                        document.is_active,
                        document.dea_schedule,
                        blob,
                    ],
                )
                .map_err(|e| StoreError::InvalidDocument(e.to_string()))?;
        }

        #[cfg(feature = "vector-search")]
        if !document.embedding.is_empty() {
            let mut index = self.documents_index.lock().expect("index lock poisoned");
            index
                .upsert(&document.key(), &document.embedding)
                .map_err(|e| StoreError::InvalidDocument(e.to_string()))?;
        }

        Ok(())
    }

    fn get(&self, ndc: &str) -> Result<Option<DrugDocument>, StoreError> {
        let reader = self.reader.lock().expect("reader lock poisoned");
        reader
            .query_row(
                "SELECT * FROM drug_documents WHERE ndc = ?1",
                params![ndc],
                row_to_document,
            )
            .optional()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn delete(&self, ndc: &str) -> Result<bool, StoreError> {
        let changed = {
            let writer = self.writer.lock().expect("writer lock poisoned");
            writer
                .execute("DELETE FROM drug_documents WHERE ndc = ?1", params![ndc])
                .map_err(|e| StoreError::Unavailable(e.to_string()))?
        };

        #[cfg(feature = "vector-search")]
        {
            let mut index = self.documents_index.lock().expect("index lock poisoned");
            let _ = index.remove(&format!("drug:{ndc}"));
        }

        Ok(changed > 0)
    }

    fn query(&self, query: &IndexQuery) -> Result<Vec<IndexHit>, StoreError> {
        use std::collections::HashMap;

        let mut hits: HashMap<String, IndexHit> = HashMap::new();

        if let Some(filter) = &query.filter {
            let (predicate, params) = Self::build_filter_sql(filter);
            let match_expr = filter.text.as_ref().and_then(|t| sanitize_fts5_query(&t.query));

            let sql = if match_expr.is_some() {
                format!(
                    "SELECT d.* FROM drug_documents d
                     JOIN drug_documents_fts fts ON d.rowid = fts.rowid
                     WHERE {predicate} AND drug_documents_fts MATCH ?"
                )
            } else {
                format!("SELECT d.* FROM drug_documents d WHERE {predicate}")
            };

            let mut bound: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
            if let Some(expr) = &match_expr {
                bound.push(expr);
            }

            let reader = self.reader.lock().expect("reader lock poisoned");
            let mut stmt = reader
                .prepare(&sql)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let rows = stmt
                .query_map(bound.as_slice(), row_to_document)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            for row in rows {
                let document = row.map_err(|e| StoreError::Unavailable(e.to_string()))?;
                hits.insert(
                    document.key(),
                    IndexHit {
                        document,
                        vector_score: None,
                        lexical_hit: true,
                    },
                );
            }
        }

        #[cfg(feature = "vector-search")]
        if let Some(knn) = &query.knn {
            let nearest = {
                let index = self.documents_index.lock().expect("index lock poisoned");
                index
                    .search(&knn.vector, knn.k)
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?
            };
            for (key, score) in nearest {
                let ndc = key.trim_start_matches("drug:");
                if let Some(existing) = hits.get_mut(&key) {
                    existing.vector_score = Some(score);
                } else if let Some(document) = self.get(ndc)? {
                    hits.insert(
                        key,
                        IndexHit {
                            document,
                            vector_score: Some(score),
                            lexical_hit: false,
                        },
                    );
                }
            }
        }

        let mut results: Vec<IndexHit> = hits.into_values().collect();
        results.sort_by(|a, b| {
            let score_a = a.vector_score.unwrap_or(0.0);
            let score_b = b.vector_score.unwrap_or(0.0);
            score_b
                .partial_cmp(&score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if query.limit > 0 {
            results.truncate(query.limit);
        }
        Ok(results)
    }

    fn cache_nearest(&self, embedding: &[f32]) -> Result<Option<(CacheEntry, f32)>, StoreError> {
        let reader = self.reader.lock().expect("reader lock poisoned");
        let mut stmt = reader
            .prepare("SELECT id, query_text, query_embedding, stored_output, stored_at FROM semantic_cache")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let blob: Vec<u8> = row.get(2)?;
                Ok((
                    CacheEntry {
                        id: row.get(0)?,
                        query_text: row.get(1)?,
                        stored_output: row.get(3)?,
                        stored_at: row
                            .get::<_, String>(4)?
                            .parse::<chrono::DateTime<Utc>>()
                            .unwrap_or_else(|_| Utc::now()),
                    },
                    blob_to_vector(&blob),
                ))
            })
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut best: Option<(CacheEntry, f32)> = None;
        for row in rows {
            let (entry, vector) = row.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let similarity = cosine_similarity(embedding, &vector);
            if best.as_ref().is_none_or(|(_, s)| similarity > *s) {
                best = Some((entry, similarity));
            }
        }
        Ok(best)
    }

    fn cache_store(&self, entry: NewCacheEntry) -> Result<(), StoreError> {
        let writer = self.writer.lock().expect("writer lock poisoned");
        writer
            .execute(
                "INSERT INTO semantic_cache (id, query_text, query_embedding, stored_output, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    entry.query_text,
                    vector_to_blob(&entry.query_embedding),
                    entry.stored_output,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DrugDocument;

    fn doc(ndc: &str, name: &str, gcn: i64, embedding: Vec<f32>) -> DrugDocument {
        DrugDocument {
            ndc: ndc.to_string(),
            drug_name: name.to_string(),
            brand_name: String::new(),
            generic_name: name.to_lowercase(),
            drug_class: "STATIN".to_string(),
            therapeutic_class: "HMG-COA REDUCTASE INHIBITORS".to_string(),
            gcn_seqno: gcn,
            dosage_form: "TABLET".to_string(),
            strength: "10 MG".to_string(),
            route: "ORAL".to_string(),
            manufacturer_name: "Generic Labs".to_string(),
            is_generic: true,
            is_active: true,
            dea_schedule: String::new(),
            embedding,
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = SqliteIndexStore::open_in_memory(4).unwrap();
        store.put(&doc("0001", "ROSUVASTATIN", 111, vec![1.0, 0.0, 0.0, 0.0])).unwrap();
        let fetched = store.get("0001").unwrap().unwrap();
        assert_eq!(fetched.drug_name, "ROSUVASTATIN");
        assert_eq!(fetched.embedding.len(), 4);
    }

    #[test]
    fn delete_removes_document() {
        let store = SqliteIndexStore::open_in_memory(4).unwrap();
        store.put(&doc("0001", "ROSUVASTATIN", 111, vec![1.0, 0.0, 0.0, 0.0])).unwrap();
        assert!(store.delete("0001").unwrap());
        assert!(store.get("0001").unwrap().is_none());
    }

    #[test]
    fn cache_nearest_returns_most_similar() {
        let store = SqliteIndexStore::open_in_memory(4).unwrap();
        store
            .cache_store(NewCacheEntry {
                query_text: "crestor".to_string(),
                query_embedding: vec![1.0, 0.0, 0.0, 0.0],
                stored_output: "{}".to_string(),
            })
            .unwrap();
        let (entry, score) = store.cache_nearest(&[1.0, 0.0, 0.0, 0.0]).unwrap().unwrap();
        assert_eq!(entry.query_text, "crestor");
        assert!(score > 0.99);
    }
}
