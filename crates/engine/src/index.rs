//! Blocking indexes.
//!
//! An index maps a derived blocking key to the records that share it.
//! Only records inside the same block (or window of blocks) become
//! candidate pairs, so the index bounds the quadratic comparison space.

use std::collections::BTreeMap;

use reclink_core::{Dataset, LinkError, Record, RecordIdx, Value};
use reclink_compare::string::{gram_set, qgram_similarity, GramCoefficient};

use crate::config::{IndexDef, IndexMethod};

/// Bucket for records missing any blocking field. The NUL prefix keeps it
/// out of the way of real keys and first in iteration order.
pub const MISSING_KEY: &str = "\u{0}missing";

#[derive(Debug, Clone)]
pub struct Index {
    pub def: IndexDef,
    /// Block key to ascending record indices. BTreeMap so iteration order
    /// is stable and sorted-neighbourhood windows see keys in sort order.
    pub blocks: BTreeMap<String, Vec<RecordIdx>>,
}

impl Index {
    /// Checks the definition's fields against the dataset. Skipped for an
    /// empty dataset, which trivially yields an empty index.
    pub fn validate_fields(def: &IndexDef, dataset: &Dataset) -> Result<(), LinkError> {
        if dataset.is_empty() {
            return Ok(());
        }
        for field in &def.fields {
            if !dataset.has_field(field) {
                return Err(LinkError::UnknownField {
                    scope: format!("index '{}'", def.name),
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn build(def: &IndexDef, dataset: &Dataset) -> Result<Self, LinkError> {
        Self::validate_fields(def, dataset)?;
        Ok(Self::build_range(def, dataset, 0, dataset.len()))
    }

    /// Builds the index over `[start, end)` of the dataset. Ranges from
    /// disjoint ascending shards merge back into the full index; canopy
    /// groups depend on insertion order, so canopy indexes must be built
    /// over the full range.
    pub fn build_range(def: &IndexDef, dataset: &Dataset, start: usize, end: usize) -> Self {
        let mut blocks: BTreeMap<String, Vec<RecordIdx>> = BTreeMap::new();
        let mut insert = |key: String, idx: RecordIdx| {
            blocks.entry(key).or_default().push(idx);
        };

        match &def.method {
            IndexMethod::Canopy { q, threshold } => {
                let mut centers: Vec<String> = Vec::new();
                for idx in start..end {
                    let record = dataset.record(idx as RecordIdx);
                    let Some(key) = joined_key(record, &def.fields) else {
                        insert(MISSING_KEY.to_string(), idx as RecordIdx);
                        continue;
                    };
                    let mut placed = false;
                    for center in &centers {
                        if qgram_similarity(&key, center, *q, GramCoefficient::Jaccard)
                            >= *threshold
                        {
                            insert(center.clone(), idx as RecordIdx);
                            placed = true;
                        }
                    }
                    if !placed {
                        insert(key.clone(), idx as RecordIdx);
                        centers.push(key);
                    }
                }
            }
            method => {
                for idx in start..end {
                    let record = dataset.record(idx as RecordIdx);
                    match method_keys(method, record, &def.fields) {
                        Some(keys) => {
                            for key in keys {
                                insert(key, idx as RecordIdx);
                            }
                        }
                        None => insert(MISSING_KEY.to_string(), idx as RecordIdx),
                    }
                }
            }
        }

        Self {
            def: def.clone(),
            blocks,
        }
    }

    /// Folds another shard of the same definition into this one. Shards
    /// must arrive in ascending record order so per-block index lists
    /// stay sorted.
    pub fn merge(mut self, other: Index) -> Index {
        for (key, mut indices) in other.blocks {
            self.blocks.entry(key).or_default().append(&mut indices);
        }
        self
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

/// Keys a record lands under, or `None` for the missing bucket. A record
/// missing any of the blocking fields goes to the missing bucket whole.
fn method_keys(method: &IndexMethod, record: &Record, fields: &[String]) -> Option<Vec<String>> {
    match method {
        IndexMethod::Exact | IndexMethod::SortedNeighbourhood { .. } => {
            joined_key(record, fields).map(|k| vec![k])
        }
        IndexMethod::Prefix { len } => {
            joined_key(record, fields).map(|k| vec![k.chars().take(*len).collect()])
        }
        IndexMethod::Phonetic { code, max_len } => {
            let mut key = String::new();
            for field in fields {
                key.push_str(&code.encode(&normalize(record.field(field))?, *max_len));
            }
            Some(vec![key])
        }
        IndexMethod::Qgram { q, threshold } => {
            let key = joined_key(record, fields)?;
            let grams = gram_set(&key, *q);
            if grams.is_empty() {
                // Key shorter than q characters; block on the key itself.
                return Some(vec![key]);
            }
            let needed = ((grams.len() as f64 * threshold) as usize).max(1);
            Some(sublists(&grams, needed).iter().map(|s| s.concat()).collect())
        }
        IndexMethod::Canopy { .. } => unreachable!("canopy keys are batch-derived"),
    }
}

/// Concatenated normalized field values, `None` if any field is missing.
fn joined_key(record: &Record, fields: &[String]) -> Option<String> {
    let mut key = String::new();
    for field in fields {
        key.push_str(&normalize(record.field(field))?);
    }
    Some(key)
}

pub(crate) fn normalize(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.to_lowercase().split_whitespace().collect()),
        Value::Number(n) => Some(format!("{n}")),
        Value::Date(d) => Some(format!("{:04}{:02}{:02}", d.year, d.month, d.day)),
        Value::Missing => None,
    }
}

/// All sorted sublists of exactly `len` elements. Any two gram lists that
/// share at least `len` grams share at least one sublist, which is what
/// gives the q-gram index its recall guarantee.
fn sublists(items: &[String], len: usize) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(len);
    pick(items, len, 0, &mut current, &mut out);
    out
}

fn pick<'a>(
    items: &'a [String],
    len: usize,
    from: usize,
    current: &mut Vec<&'a String>,
    out: &mut Vec<Vec<String>>,
) {
    if current.len() == len {
        out.push(current.iter().map(|s| (*s).clone()).collect());
        return;
    }
    let still_needed = len - current.len();
    for i in from..=items.len().saturating_sub(still_needed) {
        current.push(&items[i]);
        pick(items, len, i + 1, current, out);
        current.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reclink_core::Record;

    fn person(id: &str, surname: &str) -> Record {
        Record::new(id).with_field("surname", Value::text(surname))
    }

    fn dataset(records: Vec<Record>) -> Dataset {
        Dataset::new("test", records)
    }

    fn def(method: IndexMethod) -> IndexDef {
        IndexDef {
            name: "surname".into(),
            fields: vec!["surname".into()],
            method,
            fallback: None,
        }
    }

    #[test]
    fn exact_blocks_group_equal_keys() {
        let ds = dataset(vec![
            person("a", "Smith"),
            person("b", "smith"),
            person("c", "Jones"),
        ]);
        let index = Index::build(&def(IndexMethod::Exact), &ds).unwrap();
        assert_eq!(index.blocks["smith"], vec![0, 1]);
        assert_eq!(index.blocks["jones"], vec![2]);
    }

    #[test]
    fn missing_field_lands_in_missing_bucket() {
        let ds = dataset(vec![person("a", "Smith"), person("b", "")]);
        let index = Index::build(&def(IndexMethod::Exact), &ds).unwrap();
        assert_eq!(index.blocks[MISSING_KEY], vec![1]);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let ds = dataset(vec![person("a", "Smith")]);
        let mut bad = def(IndexMethod::Exact);
        bad.fields = vec!["given_name".into()];
        assert!(matches!(
            Index::build(&bad, &ds),
            Err(LinkError::UnknownField { .. })
        ));
    }

    #[test]
    fn phonetic_blocks_collide_spelling_variants() {
        let ds = dataset(vec![person("a", "Smith"), person("b", "Smyth")]);
        let index = Index::build(
            &def(IndexMethod::Phonetic {
                code: reclink_compare::PhoneticCode::Soundex,
                max_len: 4,
            }),
            &ds,
        )
        .unwrap();
        assert_eq!(index.blocks["S530"], vec![0, 1]);
    }

    #[test]
    fn qgram_sublists_share_a_bucket() {
        let ds = dataset(vec![person("a", "peter"), person("b", "petra")]);
        let index = Index::build(&def(IndexMethod::Qgram { q: 2, threshold: 0.5 }), &ds).unwrap();
        let shared = index
            .blocks
            .values()
            .any(|indices| indices.contains(&0) && indices.contains(&1));
        assert!(shared);
    }

    #[test]
    fn shard_merge_matches_full_build() {
        let ds = dataset(vec![
            person("a", "Smith"),
            person("b", "Jones"),
            person("c", "Smith"),
            person("d", "Brown"),
        ]);
        let d = def(IndexMethod::Exact);
        let full = Index::build(&d, &ds).unwrap();
        let merged = Index::build_range(&d, &ds, 0, 2).merge(Index::build_range(&d, &ds, 2, 4));
        assert_eq!(full.blocks, merged.blocks);
    }
}
