//! Grouper/ranker (component G)
//!
//! Folds a flat, scored candidate list into brand/generic families, assigns
//! each family a [`MatchType`], and produces the final deterministic
//! ranking returned to callers.

use std::collections::HashMap;

use crate::domain::{Family, MatchType, PlannerResult, ScoredCandidate, Variant};

fn group_key(candidate: &ScoredCandidate) -> String {
    let doc = &candidate.document;
    if !doc.is_generic && !doc.brand_name.trim().is_empty() {
        format!("brand:{}", doc.brand_name.trim().to_uppercase())
    } else if !doc.drug_class.trim().is_empty() {
        format!("generic:{}", doc.drug_class.trim().to_uppercase())
    } else if !doc.generic_name.trim().is_empty() {
        format!("generic:{}", doc.generic_name.trim().to_uppercase())
    } else {
        doc.ndc.clone()
    }
}

/// Leading numeric portion of a strength string (`"10 MG"` -> `10.0`); used
/// only as the within-group tiebreaker, never shown to callers.
fn strength_numeric(strength: &str) -> f64 {
    let digits: String = strength
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().unwrap_or(f64::MAX)
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn contains_raw_query(haystack: &str, raw_query: &str) -> bool {
    !haystack.is_empty() && !raw_query.is_empty() && normalize(haystack).contains(&normalize(raw_query))
}

fn to_variant(candidate: &ScoredCandidate) -> Variant {
    let doc = &candidate.document;
    Variant {
        ndc: doc.ndc.clone(),
        label: doc.drug_name.clone(),
        strength: doc.strength.clone(),
        manufacturer: doc.manufacturer_name.clone(),
        dosage_form: doc.dosage_form.clone(),
        is_generic: doc.is_generic,
        score: candidate.score,
        dea_schedule: doc.dea_schedule.clone(),
    }
}

struct PendingGroup {
    key: String,
    candidates: Vec<ScoredCandidate>,
    is_exact: bool,
}

/// Groups, classifies, and ranks a flat candidate list into the families
/// returned to callers. Deterministic: identical input always yields
/// identical family and variant order.
pub fn group_and_rank(
    mut candidates: Vec<ScoredCandidate>,
    raw_query: &str,
    _plan: &PlannerResult,
    max_results: usize,
) -> Vec<Family> {
    candidates.sort_by(|a, b| a.document.ndc.cmp(&b.document.ndc));

    let mut groups: HashMap<String, Vec<ScoredCandidate>> = HashMap::new();
    for candidate in candidates {
        groups.entry(group_key(&candidate)).or_default().push(candidate);
    }

    let mut pending: Vec<PendingGroup> = groups
        .into_iter()
        .map(|(key, mut members)| {
            members.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| {
                        strength_numeric(&a.document.strength)
                            .partial_cmp(&strength_numeric(&b.document.strength))
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .then_with(|| a.document.ndc.cmp(&b.document.ndc))
            });

            // Deliberately narrower than retrieval's `lexical_hit` flag, which
            // also fires on a `generic_name` match (needed there for recall).
            // A brand document sharing a generic's ingredient name would
            // otherwise get marked Exact on a pure-generic query; substring
            // containment against the display fields is what the seed
            // scenarios actually expect.
            let representative = &members[0];
            let is_exact = contains_raw_query(&representative.document.drug_name, raw_query)
                || contains_raw_query(&representative.document.brand_name, raw_query);

            PendingGroup {
                key,
                candidates: members,
                is_exact,
            }
        })
        .collect();

    pending.sort_by(|a, b| a.key.cmp(&b.key));

    let exact_signatures: Vec<(i64, String, String)> = pending
        .iter()
        .filter(|g| g.is_exact)
        .map(|g| {
            let rep = &g.candidates[0].document;
            (rep.gcn_seqno, rep.therapeutic_class.clone(), display_name(g))
        })
        .collect();

    let mut families: Vec<Family> = pending
        .into_iter()
        .map(|group| {
            let representative_doc = &group.candidates[0].document;
            let (match_type, match_reason) = if group.is_exact {
                (MatchType::Exact, format!("Name contains '{raw_query}'"))
            } else if let Some((_, _, exact_name)) = exact_signatures
                .iter()
                .find(|(gcn, _, _)| *gcn == representative_doc.gcn_seqno)
            {
                (
                    MatchType::TherapeuticEquivalent,
                    format!("Same therapeutic class as {exact_name}"),
                )
            } else if let Some((_, _, exact_name)) = exact_signatures
                .iter()
                .find(|(_, class, _)| *class == representative_doc.therapeutic_class && !class.is_empty())
            {
                (
                    MatchType::Alternative,
                    format!("Same therapeutic class as {exact_name}"),
                )
            } else {
                (
                    MatchType::Alternative,
                    format!("Semantic match to '{raw_query}'"),
                )
            };

            let display = display_name(&group);
            let variants: Vec<Variant> = group.candidates.iter().map(to_variant).collect();
            let best_score = variants.iter().map(|v| v.score).fold(0.0_f32, f32::max);

            Family {
                group_key: group.key,
                display_name: display,
                match_type,
                match_reason,
                representative: variants[0].clone(),
                variants,
                best_score,
            }
        })
        .collect();

    families.sort_by(|a, b| {
        a.match_type
            .rank()
            .cmp(&b.match_type.rank())
            .then_with(|| b.best_score.partial_cmp(&a.best_score).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.group_key.cmp(&b.group_key))
    });

    families.truncate(max_results);
    families
}

fn display_name(group: &PendingGroup) -> String {
    let rep = &group.candidates[0].document;
    if !rep.is_generic && !rep.brand_name.trim().is_empty() {
        rep.brand_name.trim().to_string()
    } else if !rep.drug_class.trim().is_empty() {
        rep.drug_class.trim().to_string()
    } else {
        rep.generic_name.trim().to_string()
    }
}
