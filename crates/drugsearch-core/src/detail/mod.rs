//! Detail and alternatives lookup (component H)

use crate::domain::{DrugDocument, Family, PlannerResult, ScoredCandidate};
use crate::error::{Error, Result};
use crate::grouping::group_and_rank;
use crate::store::{FilterExpr, IndexQuery, IndexStore, NumericFilter, TagField, TagFilter};

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alternatives {
    pub generic_options: Vec<Family>,
    pub brand_options: Vec<Family>,
    pub total_count: usize,
}

pub struct DetailService<'a> {
    store: &'a dyn IndexStore,
}

impl<'a> DetailService<'a> {
    pub fn new(store: &'a dyn IndexStore) -> Self {
        Self { store }
    }

    pub fn get_detail(&self, ndc: &str) -> Result<DrugDocument> {
        self.store
            .get(ndc)
            .map_err(|e| Error::ServiceUnavailable(e.to_string()))?
            .ok_or_else(|| Error::NotFound(format!("no document for ndc {ndc}")))
    }

    pub fn get_alternatives(&self, ndc: &str) -> Result<Alternatives> {
        let document = self.get_detail(ndc)?;

        let therapeutic_equivalents = self
            .store
            .query(&IndexQuery {
                filter: Some(FilterExpr {
                    tags: Vec::new(),
                    gcn_seqno: Some(NumericFilter::eq(document.gcn_seqno)),
                    text: None,
                }),
                knn: None,
                limit: 0,
            })
            .map_err(|e| Error::ServiceUnavailable(e.to_string()))?
            .into_iter()
            .filter(|hit| hit.document.ndc != ndc)
            .map(|hit| ScoredCandidate {
                document: hit.document,
                score: 1.0,
                lexical_hit: true,
            })
            .collect::<Vec<_>>();

        let class_alternatives = self
            .store
            .query(&IndexQuery {
                filter: Some(FilterExpr {
                    tags: vec![TagFilter {
                        field: TagField::TherapeuticClass,
                        values: vec![document.therapeutic_class.clone()],
                    }],
                    gcn_seqno: Some(NumericFilter::ne(document.gcn_seqno)),
                    text: None,
                }),
                knn: None,
                limit: 0,
            })
            .map_err(|e| Error::ServiceUnavailable(e.to_string()))?
            .into_iter()
            .map(|hit| ScoredCandidate {
                document: hit.document,
                score: 0.5,
                lexical_hit: false,
            })
            .collect::<Vec<_>>();

        let plan = PlannerResult::null_plan(&document.drug_name);
        let generic_families: Vec<Family> = group_and_rank(
            therapeutic_equivalents
                .into_iter()
                .filter(|c| c.document.is_generic)
                .collect(),
            &document.drug_name,
            &plan,
            usize::MAX,
        );
        let brand_families: Vec<Family> = group_and_rank(
            class_alternatives
                .into_iter()
                .filter(|c| !c.document.is_generic)
                .collect(),
            &document.drug_name,
            &plan,
            usize::MAX,
        );

        let total_count = generic_families
            .iter()
            .map(|f| f.variants.len())
            .sum::<usize>()
            + brand_families.iter().map(|f| f.variants.len()).sum::<usize>();

        Ok(Alternatives {
            generic_options: generic_families,
            brand_options: brand_families,
            total_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DrugDocument;
    use crate::store::SqliteIndexStore;

    fn doc(ndc: &str, generic: bool, brand: &str, gcn: i64, class: &str) -> DrugDocument {
        DrugDocument {
            ndc: ndc.to_string(),
            drug_name: format!("DRUG {ndc}"),
            brand_name: brand.to_string(),
            generic_name: "rosuvastatin calcium".to_string(),
            drug_class: "ROSUVASTATIN CALCIUM".to_string(),
            therapeutic_class: class.to_string(),
            gcn_seqno: gcn,
            dosage_form: "TABLET".to_string(),
            strength: "10 MG".to_string(),
            route: "ORAL".to_string(),
            manufacturer_name: "Labs".to_string(),
            is_generic: generic,
            is_active: true,
            dea_schedule: String::new(),
            embedding: vec![],
        }
    }

    #[test]
    fn detail_returns_not_found_for_unknown_ndc() {
        let store = SqliteIndexStore::open_in_memory(4).unwrap();
        let service = DetailService::new(&store);
        assert!(matches!(service.get_detail("00000"), Err(Error::NotFound(_))));
    }

    #[test]
    fn alternatives_excludes_self_and_splits_by_is_generic() {
        let store = SqliteIndexStore::open_in_memory(4).unwrap();
        store.put(&doc("1", false, "CRESTOR", 100, "HMG-COA REDUCTASE INHIBITORS")).unwrap();
        store.put(&doc("2", true, "", 100, "HMG-COA REDUCTASE INHIBITORS")).unwrap();
        store.put(&doc("3", false, "LIVALO", 200, "HMG-COA REDUCTASE INHIBITORS")).unwrap();

        let service = DetailService::new(&store);
        let alternatives = service.get_alternatives("1").unwrap();

        assert!(alternatives
            .generic_options
            .iter()
            .flat_map(|f| &f.variants)
            .all(|v| v.is_generic));
        assert!(alternatives
            .brand_options
            .iter()
            .flat_map(|f| &f.variants)
            .all(|v| !v.is_generic && v.ndc != "1"));
    }
}
