//! Candidate pair generation from built indexes.
//!
//! Pairs are deduplicated across blocks and across indexes, so a pair
//! surfaced by several q-gram buckets or by two different index
//! definitions is compared once. Output order is sorted by (left, right)
//! and independent of how the indexes were built.

use std::collections::{BTreeMap, HashSet};

use reclink_core::{Dataset, RecordIdx};
use tracing::warn;

use crate::config::{FallbackConfig, FallbackPolicy, IndexMethod};
use crate::index::{normalize, Index, MISSING_KEY};
use crate::model::CandidatePair;

/// Generates candidate pairs. `right_side` present means a linkage run:
/// left indexes are zipped with right indexes built from the same
/// definitions, and blocks join on equal keys. Absent means deduplication
/// within `left`, emitting pairs with `left < right`.
pub fn generate(
    left_indexes: &[Index],
    left: &Dataset,
    right_side: Option<(&[Index], &Dataset)>,
) -> Vec<CandidatePair> {
    let mut sink = PairSink::new();
    match right_side {
        None => {
            for index in left_indexes {
                dedup_index(index, left, &mut sink);
            }
        }
        Some((right_indexes, right)) => {
            for (il, ir) in left_indexes.iter().zip(right_indexes) {
                link_index(il, ir, left, right, &mut sink);
            }
        }
    }
    let mut pairs = sink.pairs;
    pairs.sort_unstable_by_key(|p| (p.left, p.right));
    pairs
}

struct PairSink {
    seen: HashSet<u64>,
    pairs: Vec<CandidatePair>,
}

impl PairSink {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            pairs: Vec::new(),
        }
    }

    fn push(&mut self, left: RecordIdx, right: RecordIdx) {
        let key = (left as u64) << 32 | right as u64;
        if self.seen.insert(key) {
            self.pairs.push(CandidatePair::new(left, right));
        }
    }
}

// ---------------------------------------------------------------------------
// Deduplication

fn dedup_index(index: &Index, dataset: &Dataset, sink: &mut PairSink) {
    match index.def.method {
        IndexMethod::SortedNeighbourhood { window } => {
            if let Some(recs) = index.blocks.get(MISSING_KEY) {
                within_block(index, MISSING_KEY, recs, dataset, sink);
            }
            for block in windows(index, window) {
                within_block(index, "<window>", &block, dataset, sink);
            }
        }
        _ => {
            for (key, recs) in &index.blocks {
                within_block(index, key, recs, dataset, sink);
            }
        }
    }
}

fn within_block(
    index: &Index,
    key: &str,
    recs: &[RecordIdx],
    dataset: &Dataset,
    sink: &mut PairSink,
) {
    match oversize(index.fallback(), recs.len()) {
        None => emit_within(recs, 1, sink),
        Some(FallbackPolicy::Split { discriminator }) => {
            warn!(
                index = %index.def.name,
                block = %display_key(key),
                size = recs.len(),
                %discriminator,
                "block over size cap, splitting"
            );
            for sub in split_groups(recs, dataset, discriminator).values() {
                emit_within(sub, 1, sink);
            }
        }
        Some(FallbackPolicy::Sample { max_pairs }) => {
            let total = recs.len() * (recs.len() - 1) / 2;
            let stride = total.div_ceil(*max_pairs);
            warn!(
                index = %index.def.name,
                block = %display_key(key),
                size = recs.len(),
                total_pairs = total,
                kept = max_pairs,
                "block over size cap, sampling pairs"
            );
            emit_within(recs, stride, sink);
        }
    }
}

/// Every i < j pair from an ascending index list, keeping each
/// `stride`-th pair of the enumeration.
fn emit_within(recs: &[RecordIdx], stride: usize, sink: &mut PairSink) {
    let mut counter = 0usize;
    for (i, &a) in recs.iter().enumerate() {
        for &b in &recs[i + 1..] {
            if counter % stride == 0 {
                sink.push(a, b);
            }
            counter += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Linkage

fn link_index(
    left_index: &Index,
    right_index: &Index,
    left: &Dataset,
    right: &Dataset,
    sink: &mut PairSink,
) {
    match left_index.def.method {
        IndexMethod::SortedNeighbourhood { window } => {
            if let (Some(la), Some(lb)) = (
                left_index.blocks.get(MISSING_KEY),
                right_index.blocks.get(MISSING_KEY),
            ) {
                cross_block(left_index, MISSING_KEY, la, lb, left, right, sink);
            }
            // Window over the union of both key sets so near keys meet even
            // when one side never produced the exact key.
            let keys: Vec<&String> = merged_keys(left_index, right_index);
            let wlen = window.min(keys.len());
            if wlen == 0 {
                return;
            }
            for start in 0..=keys.len() - wlen {
                let window_keys = &keys[start..start + wlen];
                let la = union_of(left_index, window_keys);
                let lb = union_of(right_index, window_keys);
                if !la.is_empty() && !lb.is_empty() {
                    cross_block(left_index, "<window>", &la, &lb, left, right, sink);
                }
            }
        }
        _ => {
            for (key, la) in &left_index.blocks {
                if let Some(lb) = right_index.blocks.get(key) {
                    cross_block(left_index, key, la, lb, left, right, sink);
                }
            }
        }
    }
}

fn cross_block(
    index: &Index,
    key: &str,
    la: &[RecordIdx],
    lb: &[RecordIdx],
    left: &Dataset,
    right: &Dataset,
    sink: &mut PairSink,
) {
    match oversize(index.fallback(), la.len() + lb.len()) {
        None => emit_cross(la, lb, 1, sink),
        Some(FallbackPolicy::Split { discriminator }) => {
            warn!(
                index = %index.def.name,
                block = %display_key(key),
                size = la.len() + lb.len(),
                %discriminator,
                "block over size cap, splitting"
            );
            let ga = split_groups(la, left, discriminator);
            let gb = split_groups(lb, right, discriminator);
            for (sub_key, sub_a) in &ga {
                if let Some(sub_b) = gb.get(sub_key) {
                    emit_cross(sub_a, sub_b, 1, sink);
                }
            }
        }
        Some(FallbackPolicy::Sample { max_pairs }) => {
            let total = la.len() * lb.len();
            let stride = total.div_ceil(*max_pairs);
            warn!(
                index = %index.def.name,
                block = %display_key(key),
                size = la.len() + lb.len(),
                total_pairs = total,
                kept = max_pairs,
                "block over size cap, sampling pairs"
            );
            emit_cross(la, lb, stride, sink);
        }
    }
}

fn emit_cross(la: &[RecordIdx], lb: &[RecordIdx], stride: usize, sink: &mut PairSink) {
    let mut counter = 0usize;
    for &a in la {
        for &b in lb {
            if counter % stride == 0 {
                sink.push(a, b);
            }
            counter += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers

impl Index {
    fn fallback(&self) -> Option<&FallbackConfig> {
        self.def.fallback.as_ref()
    }
}

/// The policy to apply, or `None` when the block fits under the cap.
fn oversize(fallback: Option<&FallbackConfig>, size: usize) -> Option<&FallbackPolicy> {
    fallback
        .filter(|fb| size > fb.max_block_size)
        .map(|fb| &fb.policy)
}

/// Groups block members by the normalized discriminator value. Members
/// missing the discriminator share their own group.
fn split_groups(
    recs: &[RecordIdx],
    dataset: &Dataset,
    discriminator: &str,
) -> BTreeMap<String, Vec<RecordIdx>> {
    let mut groups: BTreeMap<String, Vec<RecordIdx>> = BTreeMap::new();
    for &idx in recs {
        let key = normalize(dataset.record(idx).field(discriminator))
            .unwrap_or_else(|| MISSING_KEY.to_string());
        groups.entry(key).or_default().push(idx);
    }
    groups
}

/// Sorted-neighbourhood windows for a single index: each run of `window`
/// consecutive sort keys forms one block.
fn windows(index: &Index, window: usize) -> Vec<Vec<RecordIdx>> {
    let keys: Vec<&String> = index.blocks.keys().filter(|k| *k != MISSING_KEY).collect();
    let wlen = window.min(keys.len());
    if wlen == 0 {
        return Vec::new();
    }
    (0..=keys.len() - wlen)
        .map(|start| union_of(index, &keys[start..start + wlen]))
        .collect()
}

fn union_of(index: &Index, keys: &[&String]) -> Vec<RecordIdx> {
    let mut out: Vec<RecordIdx> = keys
        .iter()
        .filter_map(|k| index.blocks.get(*k))
        .flatten()
        .copied()
        .collect();
    out.sort_unstable();
    out
}

fn merged_keys<'a>(left: &'a Index, right: &'a Index) -> Vec<&'a String> {
    let mut keys: Vec<&String> = left
        .blocks
        .keys()
        .chain(right.blocks.keys())
        .filter(|k| *k != MISSING_KEY)
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

fn display_key(key: &str) -> &str {
    if key == MISSING_KEY {
        "<missing>"
    } else {
        key
    }
}
