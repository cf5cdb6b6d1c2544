//! Shared fixtures for the end-to-end scenario suite: a small statin corpus
//! seeded into an in-memory store, mirroring the seed scenarios table.

use drugsearch_core::embeddings::MockEmbeddingClient;
use drugsearch_core::llm::{MockBehavior, MockLlmClient};
use drugsearch_core::store::{IndexStore, SqliteIndexStore};
use drugsearch_core::{Config, DrugDocument, SearchService};

pub const EMBEDDING_DIM: usize = 8;

#[allow(clippy::too_many_arguments)]
pub fn doc(
    ndc: &str,
    drug_name: &str,
    brand_name: &str,
    generic_name: &str,
    drug_class: &str,
    therapeutic_class: &str,
    gcn_seqno: i64,
    strength: &str,
    is_generic: bool,
    embedding: Vec<f32>,
) -> DrugDocument {
    DrugDocument {
        ndc: ndc.to_string(),
        drug_name: drug_name.to_string(),
        brand_name: brand_name.to_string(),
        generic_name: generic_name.to_string(),
        drug_class: drug_class.to_string(),
        therapeutic_class: therapeutic_class.to_string(),
        gcn_seqno,
        dosage_form: "TABLET".to_string(),
        strength: strength.to_string(),
        route: "ORAL".to_string(),
        manufacturer_name: "Example Labs".to_string(),
        is_generic,
        is_active: true,
        dea_schedule: String::new(),
        embedding,
    }
}

/// One NDC per fixture document, clustered so the mock 8-dim embeddings
/// differ across therapeutic classes but land close within a class - enough
/// for the fixed-size KNN pass over this tiny corpus to return everything.
pub fn seed_statin_corpus(store: &SqliteIndexStore) {
    const ROSUVASTATIN_GCN: i64 = 12345;
    const ATORVASTATIN_GCN: i64 = 22345;
    const HMG: &str = "HMG-COA REDUCTASE INHIBITORS";

    let crestor = [
        ("00310075135", "5 MG", [0.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ("00310075139", "10 MG", [0.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.1]),
        ("00310075140", "20 MG", [0.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.2]),
        ("00310075141", "40 MG", [0.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.3]),
    ];
    for (ndc, strength, vector) in crestor {
        store
            .put(&doc(
                ndc,
                &format!("CRESTOR {strength} TABLET"),
                "CRESTOR",
                "rosuvastatin calcium",
                "ROSUVASTATIN CALCIUM",
                HMG,
                ROSUVASTATIN_GCN,
                strength,
                false,
                vector.to_vec(),
            ))
            .unwrap();
    }

    let generic_rosuvastatin = [
        ("00185012301", "5 MG", [0.85, 0.15, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ("00185012302", "10 MG", [0.85, 0.15, 0.0, 0.0, 0.0, 0.0, 0.0, 0.1]),
        ("00185012303", "20 MG", [0.85, 0.15, 0.0, 0.0, 0.0, 0.0, 0.0, 0.2]),
        ("00185012304", "40 MG", [0.85, 0.15, 0.0, 0.0, 0.0, 0.0, 0.0, 0.3]),
    ];
    for (ndc, strength, vector) in generic_rosuvastatin {
        store
            .put(&doc(
                ndc,
                &format!("ROSUVASTATIN CALCIUM {strength} TABLET"),
                "",
                "rosuvastatin calcium",
                "ROSUVASTATIN CALCIUM",
                HMG,
                ROSUVASTATIN_GCN,
                strength,
                true,
                vector.to_vec(),
            ))
            .unwrap();
    }

    store
        .put(&doc(
            "00071015523",
            "LIPITOR 10 MG TABLET",
            "LIPITOR",
            "atorvastatin calcium",
            "ATORVASTATIN CALCIUM",
            HMG,
            ATORVASTATIN_GCN,
            "10 MG",
            false,
            vec![0.1, 0.9, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ))
        .unwrap();
    store
        .put(&doc(
            "00071015524",
            "ATORVASTATIN CALCIUM 10 MG TABLET",
            "",
            "atorvastatin calcium",
            "ATORVASTATIN CALCIUM",
            HMG,
            ATORVASTATIN_GCN,
            "10 MG",
            true,
            vec![0.1, 0.85, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ))
        .unwrap();
}

pub fn new_store() -> SqliteIndexStore {
    let store = SqliteIndexStore::open_in_memory(EMBEDDING_DIM).unwrap();
    seed_statin_corpus(&store);
    store
}

pub fn null_llm() -> MockLlmClient {
    MockLlmClient::new(MockBehavior::AlwaysFail)
}

pub fn llm_responding(body: &str) -> MockLlmClient {
    MockLlmClient::new(MockBehavior::Respond(body.to_string()))
}

pub fn mock_embeddings() -> MockEmbeddingClient {
    MockEmbeddingClient::new(EMBEDDING_DIM)
}

pub fn service<'a>(
    llm: &'a MockLlmClient,
    embeddings: &'a MockEmbeddingClient,
    store: &'a SqliteIndexStore,
) -> SearchService<'a> {
    SearchService::new(llm, embeddings, store, Config::default())
}
