use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::Value;

/// Position of a record inside its dataset. Downstream stages (blocking,
/// candidate sets, assignment) only ever carry these compact indices; the
/// external string id is looked up again at reporting time.
pub type RecordIdx = u32;

/// One standardized record. Immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    /// External identifier, owned by the caller's id space.
    pub id: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Insert a field value. Builder style, used by loaders and tests.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Field value, or `Missing` for fields the record never had.
    pub fn field(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&Value::Missing)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

/// A named, ordered collection of records. The index of a record in
/// `records` is its `RecordIdx`; insertion order is the caller's order and
/// never changes after construction.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, idx: RecordIdx) -> &Record {
        &self.records[idx as usize]
    }

    /// True if any record in the dataset carries the field. Used for eager
    /// config validation before pairwise work starts.
    pub fn has_field(&self, name: &str) -> bool {
        self.records.iter().any(|r| r.has_field(name))
    }
}
