//! Detail and alternatives lookup scenarios.

mod common;

#[test]
fn drug_lookup_returns_the_seeded_document() {
    let store = common::new_store();
    let llm = common::null_llm();
    let embeddings = common::mock_embeddings();
    let service = common::service(&llm, &embeddings, &store);

    let response = service.drug("00310075139").unwrap();
    assert_eq!(response.document.drug_name, "CRESTOR 10 MG TABLET");
    assert_eq!(response.document.brand_name, "CRESTOR");
    assert!(!response.document.is_generic);
    assert!(response.document.gcn_seqno > 0);
}

#[test]
fn unknown_ndc_is_not_found() {
    let store = common::new_store();
    let llm = common::null_llm();
    let embeddings = common::mock_embeddings();
    let service = common::service(&llm, &embeddings, &store);

    let err = service.drug("99999999999").unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[test]
fn alternatives_split_generic_and_brand_and_exclude_self() {
    let store = common::new_store();
    let llm = common::null_llm();
    let embeddings = common::mock_embeddings();
    let service = common::service(&llm, &embeddings, &store);

    let response = service.alternatives("00310075139").unwrap();

    assert!(response
        .alternatives
        .generic_options
        .iter()
        .flat_map(|f| &f.variants)
        .all(|v| v.is_generic));
    assert!(response
        .alternatives
        .brand_options
        .iter()
        .flat_map(|f| &f.variants)
        .all(|v| !v.is_generic && v.ndc != "00310075139"));

    let generic_count: usize = response.alternatives.generic_options.iter().map(|f| f.variants.len()).sum();
    let brand_count: usize = response.alternatives.brand_options.iter().map(|f| f.variants.len()).sum();
    assert_eq!(response.alternatives.total_count, generic_count + brand_count);

    assert!(response
        .alternatives
        .generic_options
        .iter()
        .flat_map(|f| &f.variants)
        .any(|v| v.label.contains("ROSUVASTATIN")));
}
