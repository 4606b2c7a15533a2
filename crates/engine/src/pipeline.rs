//! End-to-end run coordination.
//!
//! Stages run in a fixed order: build indexes, generate candidates,
//! compare, classify, assign. Indexing and comparison fan out over a
//! worker pool in record/pair order shards; merges happen in shard
//! order, so the full run is deterministic for a given config and input
//! regardless of worker count.

use chrono::Utc;
use reclink_core::{Dataset, LinkError};
use tracing::debug;

use crate::assign::{self, Edge};
use crate::candidates;
use crate::classify::Classifier;
use crate::compare::RecordComparator;
use crate::config::{IndexMethod, LinkConfig, Mode};
use crate::index::Index;
use crate::model::{
    ClassifiedPair, ComparisonVector, Decision, LinkMeta, LinkOutput, LinkSummary,
};
use crate::parallel::{build_pool, map_ranges, shard_map, CancelToken};

pub fn run(
    config: &LinkConfig,
    left: &Dataset,
    right: Option<&Dataset>,
) -> Result<LinkOutput, LinkError> {
    run_with_cancel(config, left, right, &CancelToken::new())
}

pub fn run_with_cancel(
    config: &LinkConfig,
    left: &Dataset,
    right: Option<&Dataset>,
    cancel: &CancelToken,
) -> Result<LinkOutput, LinkError> {
    config.validate()?;
    match (config.mode, right) {
        (Mode::Link, None) => {
            return Err(LinkError::ConfigValidation(
                "link mode needs a second dataset".into(),
            ));
        }
        (Mode::Dedup, Some(_)) => {
            return Err(LinkError::ConfigValidation(
                "dedup mode takes a single dataset".into(),
            ));
        }
        _ => {}
    }
    validate_comparator_fields(config, left)?;
    if let Some(right) = right {
        validate_comparator_fields(config, right)?;
    }

    let (classifier, mut diagnostics) =
        Classifier::from_config(&config.classifier, &config.comparators)?;
    let pool = build_pool(config.parallel.workers)?;

    debug!(
        config = %config.name,
        mode = config.mode.as_str(),
        records_left = left.len(),
        records_right = right.map(Dataset::len).unwrap_or(0),
        "starting run"
    );

    let left_indexes = build_indexes(&pool, config, left, cancel)?;
    let right_indexes = match right {
        Some(ds) => Some(build_indexes(&pool, config, ds, cancel)?),
        None => None,
    };

    if cancel.is_cancelled() {
        return Err(LinkError::Cancelled);
    }
    let right_side = right_indexes
        .as_ref()
        .and_then(|indexes| right.map(|ds| (indexes.as_slice(), ds)));
    let pairs = candidates::generate(&left_indexes, left, right_side);
    debug!(candidates = pairs.len(), "generated candidate pairs");

    let compare_target = right.unwrap_or(left);
    let shards = shard_map(&pool, &pairs, cancel, |shard| {
        let mut comparator = RecordComparator::new(&config.comparators, left, compare_target);
        let vectors: Vec<ComparisonVector> =
            shard.iter().map(|&pair| comparator.compare(pair)).collect();
        (vectors, comparator.take_diagnostics())
    })?;
    let mut vectors = Vec::with_capacity(pairs.len());
    for (shard_vectors, shard_diagnostics) in shards {
        vectors.extend(shard_vectors);
        diagnostics.extend(shard_diagnostics);
    }
    debug!(vectors = vectors.len(), "compared candidate pairs");

    if cancel.is_cancelled() {
        return Err(LinkError::Cancelled);
    }
    let classified = classifier.classify_all(&vectors)?;

    let mut out_pairs: Vec<ClassifiedPair> = Vec::new();
    let mut matches = 0usize;
    let mut possible_matches = 0usize;
    let mut non_matches = 0usize;
    for (pair, &(weight, decision)) in pairs.iter().zip(&classified) {
        match decision {
            Decision::NonMatch => non_matches += 1,
            Decision::Match | Decision::PossibleMatch => {
                if decision == Decision::Match {
                    matches += 1;
                } else {
                    possible_matches += 1;
                }
                out_pairs.push(ClassifiedPair {
                    left: pair.left,
                    right: pair.right,
                    left_id: left.record(pair.left).id.clone(),
                    right_id: compare_target.record(pair.right).id.clone(),
                    weight,
                    decision,
                });
            }
        }
    }
    debug!(matches, possible_matches, non_matches, "classified pairs");

    let assignment = if config.assignment.enabled {
        if cancel.is_cancelled() {
            return Err(LinkError::Cancelled);
        }
        let edges: Vec<Edge> = out_pairs
            .iter()
            .filter(|p| {
                (p.decision == Decision::Match
                    || (config.assignment.include_possible
                        && p.decision == Decision::PossibleMatch))
                    && p.weight >= config.assignment.threshold
            })
            .map(|p| Edge {
                left: p.left,
                right: p.right,
                weight: p.weight,
            })
            .collect();
        let right_len = right.map(Dataset::len).unwrap_or(0);
        let solved = assign::solve(&edges, left.len(), right_len)?;
        debug!(
            edges = edges.len(),
            assigned = solved.pairs.len(),
            "solved assignment"
        );
        Some(solved)
    } else {
        None
    };

    let summary = LinkSummary {
        records_left: left.len(),
        records_right: right.map(Dataset::len).unwrap_or(0),
        candidate_pairs: pairs.len(),
        matches,
        possible_matches,
        non_matches,
        assigned: assignment.as_ref().map(|a| a.pairs.len()).unwrap_or(0),
    };
    Ok(LinkOutput {
        meta: LinkMeta {
            config_name: config.name.clone(),
            mode: config.mode.as_str().to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: Utc::now().to_rfc3339(),
        },
        summary,
        pairs: out_pairs,
        assignment,
        diagnostics,
    })
}

/// A comparator field no record in the dataset carries is a config typo,
/// surfaced before any pairwise work. Empty datasets are exempt.
fn validate_comparator_fields(config: &LinkConfig, dataset: &Dataset) -> Result<(), LinkError> {
    if dataset.is_empty() {
        return Ok(());
    }
    for comparator in &config.comparators {
        if !dataset.has_field(&comparator.field) {
            return Err(LinkError::UnknownField {
                scope: format!("comparator on dataset '{}'", dataset.name),
                field: comparator.field.clone(),
            });
        }
    }
    Ok(())
}

/// Builds all configured indexes. Keyed methods shard over the record
/// range and merge in order; canopy grouping depends on insertion order
/// and runs over the full range in one piece.
fn build_indexes(
    pool: &rayon::ThreadPool,
    config: &LinkConfig,
    dataset: &Dataset,
    cancel: &CancelToken,
) -> Result<Vec<Index>, LinkError> {
    let mut out = Vec::with_capacity(config.indexes.len());
    for def in &config.indexes {
        Index::validate_fields(def, dataset)?;
        let index = match def.method {
            IndexMethod::Canopy { .. } => {
                if cancel.is_cancelled() {
                    return Err(LinkError::Cancelled);
                }
                Index::build_range(def, dataset, 0, dataset.len())
            }
            _ => map_ranges(pool, dataset.len(), cancel, |start, end| {
                Index::build_range(def, dataset, start, end)
            })?
            .into_iter()
            .reduce(Index::merge)
            .unwrap_or_else(|| Index::build_range(def, dataset, 0, 0)),
        };
        debug!(
            dataset = %dataset.name,
            index = %def.name,
            blocks = index.block_count(),
            "built index"
        );
        out.push(index);
    }
    Ok(out)
}
