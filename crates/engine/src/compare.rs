//! Pairwise record comparison.
//!
//! A `RecordComparator` turns a candidate pair into a comparison vector
//! by running every configured field comparator. Each worker owns its own
//! instance, so the phonetic code memo needs no locking.

use std::collections::HashMap;

use reclink_core::{Dataset, Record, Value};
use reclink_compare::{date, numeric, string, PhoneticCode};

use crate::config::{CompareMethod, ComparatorDef};
use crate::model::{CandidatePair, ComparisonVector, Diagnostic};

pub struct RecordComparator<'a> {
    comparators: &'a [ComparatorDef],
    left: &'a Dataset,
    right: &'a Dataset,
    code_cache: HashMap<(PhoneticCode, usize, String), String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> RecordComparator<'a> {
    /// For deduplication runs pass the same dataset for both sides.
    pub fn new(comparators: &'a [ComparatorDef], left: &'a Dataset, right: &'a Dataset) -> Self {
        Self {
            comparators,
            left,
            right,
            code_cache: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn compare(&mut self, pair: CandidatePair) -> ComparisonVector {
        let comparators = self.comparators;
        let ra = self.left.record(pair.left);
        let rb = self.right.record(pair.right);
        let scores = comparators
            .iter()
            .map(|c| self.score(c, ra, rb))
            .collect();
        ComparisonVector::new(scores)
    }

    /// Data problems observed so far, drained by the caller after a shard.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    fn score(&mut self, comparator: &ComparatorDef, ra: &Record, rb: &Record) -> Option<f64> {
        let va = ra.field(&comparator.field);
        let vb = rb.field(&comparator.field);
        if va.is_missing() || vb.is_missing() {
            return None;
        }

        match &comparator.method {
            CompareMethod::Exact => match (va, vb) {
                (Value::Text(a), Value::Text(b)) => Some(eq_score(a == b)),
                (Value::Number(a), Value::Number(b)) => Some(eq_score(a == b)),
                (Value::Date(a), Value::Date(b)) => Some(eq_score(a == b)),
                _ => self.mismatch(comparator, ra, rb, va, vb),
            },
            CompareMethod::Truncate { len } => {
                let (a, b) = self.texts(comparator, ra, rb, va, vb)?;
                Some(string::truncated_eq(a, b, *len))
            }
            CompareMethod::EditDistance => {
                let (a, b) = self.texts(comparator, ra, rb, va, vb)?;
                Some(string::edit_similarity(a, b))
            }
            CompareMethod::Jaro => {
                let (a, b) = self.texts(comparator, ra, rb, va, vb)?;
                Some(string::jaro(a, b))
            }
            CompareMethod::JaroWinkler { max_prefix, scale } => {
                let (a, b) = self.texts(comparator, ra, rb, va, vb)?;
                Some(string::jaro_winkler(a, b, *max_prefix, *scale))
            }
            CompareMethod::Qgram { q, coefficient } => {
                let (a, b) = self.texts(comparator, ra, rb, va, vb)?;
                Some(string::qgram_similarity(a, b, *q, *coefficient))
            }
            CompareMethod::Lcs => {
                let (a, b) = self.texts(comparator, ra, rb, va, vb)?;
                Some(string::lcs_similarity(a, b))
            }
            CompareMethod::Phonetic {
                code,
                max_len,
                edit_fallback,
            } => {
                let (a, b) = self.texts(comparator, ra, rb, va, vb)?;
                let (a, b) = (a.to_string(), b.to_string());
                let ca = self.encoded(*code, *max_len, &a);
                let cb = self.encoded(*code, *max_len, &b);
                if !ca.is_empty() && ca == cb {
                    Some(1.0)
                } else if *edit_fallback {
                    Some(string::edit_similarity(&a, &b))
                } else {
                    Some(0.0)
                }
            }
            CompareMethod::KeyDiff { max_diff } => {
                let (a, b) = self.texts(comparator, ra, rb, va, vb)?;
                Some(string::key_diff_similarity(a, b, *max_diff))
            }
            CompareMethod::NumericAbs { tolerance } => {
                let (a, b) = self.numbers(comparator, ra, rb, va, vb)?;
                Some(numeric::tolerance_similarity(a, b, *tolerance))
            }
            CompareMethod::NumericPerc { max_percent } => {
                let (a, b) = self.numbers(comparator, ra, rb, va, vb)?;
                Some(numeric::percent_similarity(a, b, *max_percent))
            }
            CompareMethod::DateComponents => {
                let (da, db) = self.dates(comparator, ra, rb, va, vb)?;
                Some(date::components_similarity(
                    (da.day, da.month, da.year),
                    (db.day, db.month, db.year),
                ))
            }
            CompareMethod::DayWindow {
                max_left_before_right,
                max_right_before_left,
            } => {
                let (ea, eb) = self.epochs(comparator, ra, rb, va, vb)?;
                Some(date::day_window_similarity(
                    ea,
                    eb,
                    *max_left_before_right,
                    *max_right_before_left,
                ))
            }
            CompareMethod::AgeDecay { half_life_days } => {
                let (ea, eb) = self.epochs(comparator, ra, rb, va, vb)?;
                Some(date::age_decay_similarity(ea, eb, *half_life_days))
            }
        }
    }

    fn texts<'v>(
        &mut self,
        comparator: &ComparatorDef,
        ra: &Record,
        rb: &Record,
        va: &'v Value,
        vb: &'v Value,
    ) -> Option<(&'v str, &'v str)> {
        match (va.as_text(), vb.as_text()) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => {
                self.mismatch(comparator, ra, rb, va, vb);
                None
            }
        }
    }

    fn numbers(
        &mut self,
        comparator: &ComparatorDef,
        ra: &Record,
        rb: &Record,
        va: &Value,
        vb: &Value,
    ) -> Option<(f64, f64)> {
        match (va.as_number(), vb.as_number()) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => {
                self.mismatch(comparator, ra, rb, va, vb);
                None
            }
        }
    }

    fn dates<'v>(
        &mut self,
        comparator: &ComparatorDef,
        ra: &Record,
        rb: &Record,
        va: &'v Value,
        vb: &'v Value,
    ) -> Option<(&'v reclink_core::DateParts, &'v reclink_core::DateParts)> {
        match (va.as_date(), vb.as_date()) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => {
                self.mismatch(comparator, ra, rb, va, vb);
                None
            }
        }
    }

    fn epochs(
        &mut self,
        comparator: &ComparatorDef,
        ra: &Record,
        rb: &Record,
        va: &Value,
        vb: &Value,
    ) -> Option<(i64, i64)> {
        let (da, db) = self.dates(comparator, ra, rb, va, vb)?;
        match (da.epoch_days(), db.epoch_days()) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => {
                self.diagnostics.push(Diagnostic::pair(
                    &comparator.field,
                    "not a valid calendar date",
                    &ra.id,
                    &rb.id,
                ));
                None
            }
        }
    }

    /// Records a type-mismatch diagnostic and yields the missing sentinel.
    fn mismatch(
        &mut self,
        comparator: &ComparatorDef,
        ra: &Record,
        rb: &Record,
        va: &Value,
        vb: &Value,
    ) -> Option<f64> {
        self.diagnostics.push(Diagnostic::pair(
            &comparator.field,
            format!(
                "comparator expects matching value types, got {} and {}",
                va.kind(),
                vb.kind()
            ),
            &ra.id,
            &rb.id,
        ));
        None
    }

    fn encoded(&mut self, code: PhoneticCode, max_len: usize, s: &str) -> String {
        if let Some(hit) = self.code_cache.get(&(code, max_len, s.to_string())) {
            return hit.clone();
        }
        let encoded = code.encode(s, max_len);
        self.code_cache
            .insert((code, max_len, s.to_string()), encoded.clone());
        encoded
    }
}

fn eq_score(equal: bool) -> f64 {
    if equal {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reclink_core::DateParts;

    fn comparator(field: &str, method: CompareMethod) -> ComparatorDef {
        ComparatorDef {
            field: field.into(),
            method,
        }
    }

    fn pair_of(a: Record, b: Record) -> (Dataset, Dataset, CandidatePair) {
        (
            Dataset::new("a", vec![a]),
            Dataset::new("b", vec![b]),
            CandidatePair::new(0, 0),
        )
    }

    #[test]
    fn vector_follows_comparator_order() {
        let comparators = vec![
            comparator("surname", CompareMethod::JaroWinkler { max_prefix: 4, scale: 0.1 }),
            comparator("age", CompareMethod::NumericAbs { tolerance: 2.0 }),
        ];
        let (da, db, pair) = pair_of(
            Record::new("a1")
                .with_field("surname", Value::text("smith"))
                .with_field("age", Value::Number(42.0)),
            Record::new("b1")
                .with_field("surname", Value::text("smith"))
                .with_field("age", Value::Number(43.0)),
        );
        let mut rc = RecordComparator::new(&comparators, &da, &db);
        let v = rc.compare(pair);
        assert_eq!(v.scores[0], Some(1.0));
        let numeric = v.scores[1].unwrap();
        assert!(numeric > 0.0 && numeric < 1.0);
        assert!(rc.take_diagnostics().is_empty());
    }

    #[test]
    fn missing_value_yields_missing_score() {
        let comparators = vec![comparator("surname", CompareMethod::Exact)];
        let (da, db, pair) = pair_of(
            Record::new("a1").with_field("surname", Value::text("smith")),
            Record::new("b1"),
        );
        let mut rc = RecordComparator::new(&comparators, &da, &db);
        assert_eq!(rc.compare(pair).scores, vec![None]);
        // Missing is expected, not a data problem.
        assert!(rc.take_diagnostics().is_empty());
    }

    #[test]
    fn type_mismatch_is_missing_plus_diagnostic() {
        let comparators = vec![comparator("age", CompareMethod::Jaro)];
        let (da, db, pair) = pair_of(
            Record::new("a1").with_field("age", Value::Number(42.0)),
            Record::new("b1").with_field("age", Value::text("forty-two")),
        );
        let mut rc = RecordComparator::new(&comparators, &da, &db);
        assert_eq!(rc.compare(pair).scores, vec![None]);
        let diags = rc.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].field, "age");
        assert_eq!(diags[0].records, Some(("a1".into(), "b1".into())));
    }

    #[test]
    fn phonetic_equal_codes_score_full() {
        let comparators = vec![comparator(
            "surname",
            CompareMethod::Phonetic {
                code: PhoneticCode::Soundex,
                max_len: 4,
                edit_fallback: false,
            },
        )];
        let (da, db, pair) = pair_of(
            Record::new("a1").with_field("surname", Value::text("smith")),
            Record::new("b1").with_field("surname", Value::text("smyth")),
        );
        let mut rc = RecordComparator::new(&comparators, &da, &db);
        assert_eq!(rc.compare(pair).scores, vec![Some(1.0)]);
    }

    #[test]
    fn phonetic_edit_fallback_scores_near_misses() {
        let comparators = vec![comparator(
            "surname",
            CompareMethod::Phonetic {
                code: PhoneticCode::Soundex,
                max_len: 4,
                edit_fallback: true,
            },
        )];
        let (da, db, pair) = pair_of(
            Record::new("a1").with_field("surname", Value::text("miller")),
            Record::new("b1").with_field("surname", Value::text("muller")),
        );
        let mut rc = RecordComparator::new(&comparators, &da, &db);
        let score = rc.compare(pair).scores[0].unwrap();
        assert!(score > 0.0 && score < 1.0);
    }

    #[test]
    fn invalid_date_yields_missing_plus_diagnostic() {
        let comparators = vec![comparator(
            "dob",
            CompareMethod::AgeDecay { half_life_days: 3650.0 },
        )];
        let (da, db, pair) = pair_of(
            Record::new("a1").with_field("dob", Value::Date(DateParts::new(31, 4, 1990))),
            Record::new("b1").with_field("dob", Value::Date(DateParts::new(1, 4, 1990))),
        );
        let mut rc = RecordComparator::new(&comparators, &da, &db);
        assert_eq!(rc.compare(pair).scores, vec![None]);
        assert_eq!(rc.take_diagnostics().len(), 1);
    }

    #[test]
    fn swapped_day_month_gets_component_credit() {
        let comparators = vec![comparator("dob", CompareMethod::DateComponents)];
        let (da, db, pair) = pair_of(
            Record::new("a1").with_field("dob", Value::Date(DateParts::new(12, 11, 1968))),
            Record::new("b1").with_field("dob", Value::Date(DateParts::new(11, 12, 1968))),
        );
        let mut rc = RecordComparator::new(&comparators, &da, &db);
        assert_eq!(rc.compare(pair).scores, vec![Some(0.5)]);
    }
}
