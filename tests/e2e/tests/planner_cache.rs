//! Planner cache invariants exercised through the public search surface:
//! repeated queries hit the cache and call the LLM at most once, while
//! distinct queries each call it.

mod common;

#[tokio::test]
async fn repeated_query_hits_cache_and_calls_llm_once() {
    let store = common::new_store();
    let llm = common::llm_responding(
        r#"{"expandedText":"crestor","filters":{},"corrections":[],"confidence":0.9}"#,
    );
    let embeddings = common::mock_embeddings();
    let service = common::service(&llm, &embeddings, &store);

    service.search("crestor", None, None).await.unwrap();
    service.search("crestor", None, None).await.unwrap();

    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn distinct_queries_each_call_the_llm() {
    let store = common::new_store();
    let llm = common::llm_responding(
        r#"{"expandedText":"crestor","filters":{},"corrections":[],"confidence":0.9}"#,
    );
    let embeddings = common::mock_embeddings();
    let service = common::service(&llm, &embeddings, &store);

    service.search("crestor", None, None).await.unwrap();
    service.search("rosuvastatin", None, None).await.unwrap();

    assert_eq!(llm.calls(), 2);
}
