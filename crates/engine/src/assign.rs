//! Optimal one-to-one assignment over a sparse edge list.
//!
//! Maximum-weight bipartite matching via successive shortest augmenting
//! paths with dual potentials. Each left node gets a private zero-weight
//! skip edge, so leaving a node unmatched is a valid terminal outcome and
//! a left-perfect minimum-cost assignment on the extended graph is
//! exactly the maximum-weight matching on the real one. Runs in
//! O(V * E log E) and never materializes a dense matrix.
//!
//! Determinism: left nodes are processed in ascending order and equal
//! path costs resolve toward the lower right index, so equal-weight
//! solutions always come out the same way.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use ordered_float::OrderedFloat;
use reclink_core::{LinkError, RecordIdx};

use crate::model::Assignment;

#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub left: RecordIdx,
    pub right: RecordIdx,
    pub weight: f64,
}

pub fn solve(edges: &[Edge], n_left: usize, n_right: usize) -> Result<Assignment, LinkError> {
    // Dedup and sanity-check the edge list. Edges with non-positive weight
    // can never beat leaving both nodes unmatched, so they are dropped.
    let mut seen: HashMap<(RecordIdx, RecordIdx), f64> = HashMap::new();
    let mut weights: HashMap<(RecordIdx, RecordIdx), f64> = HashMap::new();
    for edge in edges {
        if (edge.left as usize) >= n_left || (edge.right as usize) >= n_right {
            return Err(LinkError::InconsistentIds {
                left: edge.left,
                right: edge.right,
            });
        }
        if let Some(&existing) = seen.get(&(edge.left, edge.right)) {
            if existing != edge.weight {
                return Err(LinkError::ConflictingEdge {
                    left: edge.left,
                    right: edge.right,
                });
            }
            continue;
        }
        seen.insert((edge.left, edge.right), edge.weight);
        if edge.weight > 0.0 {
            weights.insert((edge.left, edge.right), edge.weight);
        }
    }

    let mut adj: Vec<Vec<(u32, f64)>> = vec![Vec::new(); n_left];
    let mut max_weight = 0.0f64;
    for (&(l, r), &w) in &weights {
        adj[l as usize].push((r, w));
        max_weight = max_weight.max(w);
    }
    for list in &mut adj {
        list.sort_unstable_by_key(|&(r, _)| r);
    }

    let mut match_l: Vec<Option<u32>> = vec![None; n_left];
    let mut match_r: Vec<Option<u32>> = vec![None; n_right];

    // Fast path from degree counting: an edge whose endpoints both have
    // degree one is in some optimum, commit it without touching the solver.
    let mut deg_r = vec![0usize; n_right];
    for &(r, _) in adj.iter().flatten() {
        deg_r[r as usize] += 1;
    }
    for (l, list) in adj.iter().enumerate() {
        if let [(r, _)] = list[..] {
            if deg_r[r as usize] == 1 {
                match_l[l] = Some(r);
                match_r[r as usize] = Some(l as u32);
            }
        }
    }

    solve_remaining(&adj, max_weight, &mut match_l, &mut match_r, n_right);

    let mut pairs = Vec::new();
    let mut unmatched_left = Vec::new();
    let mut total_weight = 0.0;
    for (l, matched) in match_l.iter().enumerate() {
        match matched {
            Some(r) if (*r as usize) < n_right => {
                pairs.push((l as RecordIdx, *r));
                total_weight += weights[&(l as RecordIdx, *r)];
            }
            _ => unmatched_left.push(l as RecordIdx),
        }
    }
    let unmatched_right = match_r
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_none())
        .map(|(r, _)| r as RecordIdx)
        .collect();

    Ok(Assignment {
        pairs,
        unmatched_left,
        unmatched_right,
        total_weight,
    })
}

/// Augments every uncommitted left node with at least one edge. Costs are
/// `max_weight - weight`, skip edges cost `max_weight`, so all costs are
/// non-negative and minimizing cost maximizes kept weight.
fn solve_remaining(
    adj: &[Vec<(u32, f64)>],
    max_weight: f64,
    match_l: &mut [Option<u32>],
    match_r: &mut [Option<u32>],
    n_right: usize,
) {
    let n_left = adj.len();
    // Right potentials cover real columns plus one skip column per left.
    let mut u = vec![0.0f64; n_left];
    let mut v = vec![0.0f64; n_right + n_left];
    // Skip columns for committed lefts stay free; matched_to tracks the
    // extended column space.
    let mut col_match: Vec<Option<u32>> = vec![None; n_right + n_left];
    for (l, m) in match_l.iter().enumerate() {
        if let Some(r) = m {
            col_match[*r as usize] = Some(l as u32);
        }
    }

    for s in 0..n_left {
        if match_l[s].is_some() || adj[s].is_empty() {
            continue;
        }

        let mut dist: HashMap<u32, f64> = HashMap::new();
        let mut pred: HashMap<u32, u32> = HashMap::new();
        let mut done: HashSet<u32> = HashSet::new();
        let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, u32)>> = BinaryHeap::new();

        let relax = |from: u32,
                     base: f64,
                     dist: &mut HashMap<u32, f64>,
                     pred: &mut HashMap<u32, u32>,
                     heap: &mut BinaryHeap<Reverse<(OrderedFloat<f64>, u32)>>,
                     done: &HashSet<u32>,
                     u: &[f64],
                     v: &[f64]| {
            let skip = (n_right + from as usize) as u32;
            let columns = adj[from as usize]
                .iter()
                .map(|&(r, w)| (r, max_weight - w))
                .chain(std::iter::once((skip, max_weight)));
            for (col, cost) in columns {
                if done.contains(&col) {
                    continue;
                }
                let next = base + cost - u[from as usize] - v[col as usize];
                if next < *dist.get(&col).unwrap_or(&f64::INFINITY) {
                    dist.insert(col, next);
                    pred.insert(col, from);
                    heap.push(Reverse((OrderedFloat(next), col)));
                }
            }
        };

        relax(s as u32, 0.0, &mut dist, &mut pred, &mut heap, &done, &u, &v);

        let mut target = None;
        while let Some(Reverse((OrderedFloat(d), col))) = heap.pop() {
            if !done.insert(col) {
                continue;
            }
            match col_match[col as usize] {
                None => {
                    target = Some((col, d));
                    break;
                }
                Some(l2) => {
                    relax(l2, d, &mut dist, &mut pred, &mut heap, &done, &u, &v);
                }
            }
        }
        // The skip column of `s` is always free, so a target always exists.
        let Some((target, total)) = target else {
            continue;
        };

        u[s] += total;
        for &col in &done {
            if col == target {
                continue;
            }
            let slack = total - dist[&col];
            v[col as usize] -= slack;
            if let Some(l2) = col_match[col as usize] {
                u[l2 as usize] += slack;
            }
        }

        // Walk the predecessor chain back to `s`, flipping matches.
        let mut col = target;
        loop {
            let l = pred[&col];
            let previous = match_l[l as usize];
            col_match[col as usize] = Some(l);
            match_l[l as usize] = Some(col);
            match previous {
                Some(prev_col) => col = prev_col,
                None => break,
            }
        }
    }

    for (col, m) in col_match.iter().enumerate().take(n_right) {
        match_r[col] = *m;
    }
}
