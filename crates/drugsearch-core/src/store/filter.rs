//! Prefilter expression builder: exact-tag match, numeric equality/range, and
//! phonetic-tolerant text match, ANDed together.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    IsGeneric,
    DosageForm,
    DeaSchedule,
    Route,
    DrugClass,
    TherapeuticClass,
}

impl TagField {
    pub fn column(self) -> &'static str {
        match self {
            TagField::IsGeneric => "is_generic",
            TagField::DosageForm => "dosage_form",
            TagField::DeaSchedule => "dea_schedule",
            TagField::Route => "route",
            TagField::DrugClass => "drug_class",
            TagField::TherapeuticClass => "therapeutic_class",
        }
    }
}

/// Values within one filter are OR'd (pipe-separated in the planner's raw
/// filter string); distinct filters in a [`FilterExpr`] are AND'd.
#[derive(Debug, Clone)]
pub struct TagFilter {
    pub field: TagField,
    pub values: Vec<String>,
}

impl TagFilter {
    pub fn single(field: TagField, value: impl Into<String>) -> Self {
        Self {
            field,
            values: vec![value.into()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Eq,
    Ne,
    Range,
}

#[derive(Debug, Clone)]
pub struct NumericFilter {
    pub op: NumericOp,
    pub low: i64,
    pub high: i64,
}

impl NumericFilter {
    pub fn eq(value: i64) -> Self {
        Self {
            op: NumericOp::Eq,
            low: value,
            high: value,
        }
    }

    pub fn ne(value: i64) -> Self {
        Self {
            op: NumericOp::Ne,
            low: value,
            high: value,
        }
    }

    pub fn range(low: i64, high: i64) -> Self {
        Self {
            op: NumericOp::Range,
            low,
            high,
        }
    }
}

/// Phonetic-tolerant text match against one or more name fields.
#[derive(Debug, Clone)]
pub struct TextMatch {
    pub fields: Vec<&'static str>,
    pub query: String,
}

impl TextMatch {
    pub fn names(query: impl Into<String>) -> Self {
        Self {
            fields: vec!["drug_name", "brand_name", "generic_name"],
            query: query.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KnnQuery {
    pub vector: Vec<f32>,
    pub k: usize,
}

/// A composed prefilter: tag equality, `gcn_seqno` equality/range, and an
/// optional text match, all ANDed together.
#[derive(Debug, Clone, Default)]
pub struct FilterExpr {
    pub tags: Vec<TagFilter>,
    pub gcn_seqno: Option<NumericFilter>,
    pub text: Option<TextMatch>,
}

impl FilterExpr {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.gcn_seqno.is_none() && self.text.is_none()
    }
}
