//! End-to-end search scenarios over a small statin corpus.

mod common;

use drugsearch_core::MatchType;

#[tokio::test]
async fn brand_query_ranks_brand_exact_then_generic_equivalent() {
    let store = common::new_store();
    let llm = common::null_llm();
    let embeddings = common::mock_embeddings();
    let service = common::service(&llm, &embeddings, &store);

    let response = service.search("crestor", None, None).await.unwrap();

    assert_eq!(response.results[0].display_name, "CRESTOR");
    assert_eq!(response.results[0].match_type, MatchType::Exact);
    assert_eq!(response.results[0].variants.len(), 4);

    let generic = response
        .results
        .iter()
        .find(|f| f.display_name == "ROSUVASTATIN CALCIUM")
        .expect("generic family present");
    assert_eq!(generic.match_type, MatchType::TherapeuticEquivalent);
    assert!(generic.match_reason.contains("CRESTOR"));
}

#[tokio::test]
async fn generic_query_ranks_generic_exact_then_brand_equivalent() {
    let store = common::new_store();
    let llm = common::null_llm();
    let embeddings = common::mock_embeddings();
    let service = common::service(&llm, &embeddings, &store);

    let response = service.search("rosuvastatin", None, None).await.unwrap();

    assert_eq!(response.results[0].display_name, "ROSUVASTATIN CALCIUM");
    assert_eq!(response.results[0].match_type, MatchType::Exact);

    let brand = response
        .results
        .iter()
        .find(|f| f.display_name == "CRESTOR")
        .expect("brand family present");
    assert_eq!(brand.match_type, MatchType::TherapeuticEquivalent);
}

#[tokio::test]
async fn indication_query_returns_class_alternatives_ordered_by_score() {
    let store = common::new_store();
    let llm = common::llm_responding(
        r#"{"expandedText":"statin for cholesterol","filters":{"therapeuticClass":"HMG-COA REDUCTASE INHIBITORS"},"corrections":[],"confidence":0.7}"#,
    );
    let embeddings = common::mock_embeddings();
    let service = common::service(&llm, &embeddings, &store);

    let response = service.search("statin for cholesterol", None, None).await.unwrap();

    assert!(response.results.len() >= 2);
    assert!(response
        .results
        .iter()
        .all(|f| f.match_type == MatchType::Alternative));

    let scores: Vec<f32> = response.results.iter().map(|f| f.best_score).collect();
    let mut sorted = scores.clone();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
    assert_eq!(scores, sorted);
}

#[tokio::test]
async fn typo_is_corrected_and_still_ranks_exact() {
    let store = common::new_store();
    let llm = common::llm_responding(
        r#"{"expandedText":"crestor","filters":{},"corrections":["crestor"],"confidence":0.8}"#,
    );
    let embeddings = common::mock_embeddings();
    let service = common::service(&llm, &embeddings, &store);

    let response = service.search("crestr", None, None).await.unwrap();

    assert!(response.query.corrections.contains(&"crestor".to_string()));
    assert_eq!(response.results[0].display_name, "CRESTOR");
    assert_eq!(response.results[0].match_type, MatchType::Exact);
}

#[tokio::test]
async fn llm_outage_still_returns_lexical_matches() {
    let store = common::new_store();
    let llm = common::null_llm();
    let embeddings = common::mock_embeddings();
    let service = common::service(&llm, &embeddings, &store);

    let response = service.search("crestor", None, None).await.unwrap();

    assert!(!response.results.is_empty());
    assert_eq!(response.results[0].match_type, MatchType::Exact);
}

#[tokio::test]
async fn empty_query_is_invalid_input() {
    let store = common::new_store();
    let llm = common::null_llm();
    let embeddings = common::mock_embeddings();
    let service = common::service(&llm, &embeddings, &store);

    let err = service.search("", None, None).await.unwrap_err();
    assert_eq!(err.code(), "invalid_input");
}

#[tokio::test]
async fn out_of_range_max_results_is_invalid_input() {
    let store = common::new_store();
    let llm = common::null_llm();
    let embeddings = common::mock_embeddings();
    let service = common::service(&llm, &embeddings, &store);

    let err = service.search("crestor", Some(0), None).await.unwrap_err();
    assert_eq!(err.code(), "invalid_input");
}
