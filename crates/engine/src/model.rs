//! Result model shared across the pipeline stages.

use reclink_core::RecordIdx;
use serde::Serialize;

/// One candidate pair of record indices. In deduplication runs both
/// indices address the same dataset and `left < right` always holds; in
/// linkage runs `left` addresses dataset A and `right` dataset B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CandidatePair {
    pub left: RecordIdx,
    pub right: RecordIdx,
}

impl CandidatePair {
    pub fn new(left: RecordIdx, right: RecordIdx) -> Self {
        Self { left, right }
    }
}

/// Per-field similarity scores for one pair, in configured comparator
/// order. `None` marks a comparison that could not be made because a
/// value was missing or had the wrong type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonVector {
    pub scores: Vec<Option<f64>>,
}

impl ComparisonVector {
    pub fn new(scores: Vec<Option<f64>>) -> Self {
        Self { scores }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Match,
    PossibleMatch,
    NonMatch,
}

/// A classified pair with its total weight. External record ids are
/// carried so reports stay meaningful without the source datasets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedPair {
    pub left: RecordIdx,
    pub right: RecordIdx,
    pub left_id: String,
    pub right_id: String,
    pub weight: f64,
    pub decision: Decision,
}

/// One-to-one matching produced by the assignment stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    /// Matched (left, right) index pairs, sorted by left index.
    pub pairs: Vec<(RecordIdx, RecordIdx)>,
    pub unmatched_left: Vec<RecordIdx>,
    pub unmatched_right: Vec<RecordIdx>,
    pub total_weight: f64,
}

impl Assignment {
    pub fn right_of(&self, left: RecordIdx) -> Option<RecordIdx> {
        self.pairs
            .binary_search_by_key(&left, |&(l, _)| l)
            .ok()
            .map(|i| self.pairs[i].1)
    }
}

/// A non-fatal data problem observed during a run, e.g. a type mismatch
/// between a comparator and a field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub field: String,
    pub detail: String,
    /// External ids of the affected pair, when the problem is pair-scoped.
    pub records: Option<(String, String)>,
}

impl Diagnostic {
    pub fn config(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            detail: detail.into(),
            records: None,
        }
    }

    pub fn pair(
        field: impl Into<String>,
        detail: impl Into<String>,
        left_id: &str,
        right_id: &str,
    ) -> Self {
        Self {
            field: field.into(),
            detail: detail.into(),
            records: Some((left_id.to_string(), right_id.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkSummary {
    pub records_left: usize,
    pub records_right: usize,
    pub candidate_pairs: usize,
    pub matches: usize,
    pub possible_matches: usize,
    /// Pairs classified below the lower threshold are counted here and
    /// dropped from the pair list.
    pub non_matches: usize,
    pub assigned: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkMeta {
    pub config_name: String,
    pub mode: String,
    pub engine_version: String,
    pub run_at: String,
}

/// Full output of a linkage run.
#[derive(Debug, Clone, Serialize)]
pub struct LinkOutput {
    pub meta: LinkMeta,
    pub summary: LinkSummary,
    pub pairs: Vec<ClassifiedPair>,
    pub assignment: Option<Assignment>,
    pub diagnostics: Vec<Diagnostic>,
}
