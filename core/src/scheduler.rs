//! Outer search loop: initialization, embedding search, chainlength
//! reduction, restarts, patience and timeout bookkeeping.

use std::time::{Duration, Instant};

use chainweld_types::{Completion, DenseId};
use itertools::Itertools;

use crate::chain::{Chain, ChainStore};
use crate::dijkstra::restrict_violation_penalty;
use crate::graph::{Graph, RestrictSets};
use crate::placement::{place_vertex, PlacementOutcome, PlacementScratch};
use crate::rng::Rng;

/// Numeric, dense-id-level configuration the scheduler drives on. Built by
/// `setup` from the caller-facing `Options<L>`; this is the part of
/// `Options` that survives label translation and clamping.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_no_improvement: usize,
    pub timeout: Duration,
    pub max_beta: f64,
    pub tries: usize,
    pub inner_rounds: usize,
    pub chainlength_patience: usize,
    pub max_fill: u32,
    pub threads: usize,
    pub skip_initialization: bool,
}

/// Initial overlap-penalty base and its per-pass growth factor during
/// phase (ii). Neither is specified numerically by the algorithm
/// description beyond "grows across passes, reset between restarts", so
/// these are this implementation's chosen schedule (see DESIGN.md).
const INITIAL_BETA: f64 = 2.0;
const BETA_GROWTH: f64 = 1.1;

/// Lexicographic ordering key for comparing embeddings, smallest wins.
/// Smaller is better. Field order doubles as priority order: `state`, then
/// overlap histogram, then chain-length histogram, each a descending
/// `(value, count)` list compared element-by-element — identical to
/// comparing the flattened sequences the spec describes.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct QualityKey {
    pub state: u8,
    pub restrict_violations: u32,
    pub overlap_histogram: Vec<(u32, u32)>,
    pub length_histogram: Vec<(u32, u32)>,
}

fn histogram(mut values: Vec<u32>) -> Vec<(u32, u32)> {
    values.sort_unstable_by(|a, b| b.cmp(a));
    values
        .into_iter()
        .group_by(|&v| v)
        .into_iter()
        .map(|(v, group)| (v, group.count() as u32))
        .collect()
}

fn chains_touch(target: &Graph, a: &Chain, b: &Chain) -> bool {
    let (small, big) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .members()
        .any(|m| target.neighbors(m).iter().any(|n| big.contains(*n)))
}

fn is_edge_covered(source: &Graph, target: &Graph, source_count: usize, chains: &ChainStore) -> bool {
    for raw_v in 0..source_count as u32 {
        let v = DenseId(raw_v);
        for &u in source.neighbors(v) {
            if u.0 <= v.0 {
                continue; // each undirected edge checked once
            }
            let (cv, cu) = (chains.chain(v), chains.chain(u));
            if cv.is_empty() || cu.is_empty() || !chains_touch(target, cv, cu) {
                return false;
            }
        }
    }
    true
}

/// Count of restricted source vertices whose chain isn't fully contained in
/// its restrict set. Restrict is enforced only as a soft Dijkstra penalty
/// (`dijkstra::restrict_violation_penalty`) during search, so a nonzero
/// count here is the hard check at the success boundary: it must be zero
/// for `quality_key` to ever report a proper embedding.
fn restrict_violation_count(source_count: usize, chains: &ChainStore, restrict: &RestrictSets) -> u32 {
    (0..source_count as u32)
        .map(DenseId)
        .filter(|&v| {
            restrict
                .get(v)
                .is_some_and(|allowed| chains.chain(v).members().any(|t| !allowed.contains(&t)))
        })
        .count() as u32
}

pub fn quality_key(
    source: &Graph,
    target: &Graph,
    source_count: usize,
    chains: &ChainStore,
    restrict: &RestrictSets,
) -> QualityKey {
    let lengths: Vec<u32> = (0..source_count as u32)
        .map(|i| chains.chain(DenseId(i)).len() as u32)
        .collect();
    let all_empty = lengths.iter().all(|&l| l == 0);
    let overlaps: Vec<u32> = chains.use_counts().iter().copied().filter(|&c| c > 1).collect();
    let restrict_violations = restrict_violation_count(source_count, chains, restrict);

    let state = if all_empty {
        2
    } else if overlaps.is_empty() && restrict_violations == 0 && is_edge_covered(source, target, source_count, chains) {
        0
    } else {
        1
    };

    QualityKey {
        state,
        restrict_violations,
        overlap_histogram: histogram(overlaps),
        length_histogram: histogram(lengths),
    }
}

fn shuffled_movable_vertices(source_count: usize, chains: &ChainStore, rng: &mut Rng) -> Vec<DenseId> {
    let mut order: Vec<DenseId> = (0..source_count as u32)
        .map(DenseId)
        .filter(|&v| !chains.chain(v).is_fixed() && !chains.chain(v).is_pinned())
        .collect();
    rng.shuffle(&mut order);
    order
}

#[allow(clippy::too_many_arguments)]
fn run_one_pass(
    order: &[DenseId],
    source: &Graph,
    target: &Graph,
    chains: &mut ChainStore,
    restrict: &RestrictSets,
    beta: f64,
    max_fill: u32,
    scratch: &mut PlacementScratch,
    rng: &mut Rng,
    cancelled: &dyn Fn() -> bool,
) -> bool {
    let restrict_penalty = restrict_violation_penalty(target.len(), beta, max_fill);
    for &v in order {
        if cancelled() {
            return true;
        }
        let _ = chains.tear(v);
        place_vertex(
            v,
            source,
            target,
            chains,
            restrict.get(v),
            beta,
            max_fill,
            restrict_penalty,
            scratch,
            rng,
        );
    }
    false
}

/// Every target node adjacent to some neighbor's chain — the set `prune`
/// must not remove a touching node from, or the edge to that neighbor
/// would go uncovered. Computed into an owned set up front so `prune`'s
/// `&mut ChainStore` borrow doesn't have to coexist with one over `chains`.
fn touching_set(v: DenseId, source: &Graph, target: &Graph, chains: &ChainStore) -> ahash::AHashSet<DenseId> {
    let mut touching = ahash::AHashSet::new();
    for &u in source.neighbors(v) {
        let cu = chains.chain(u);
        if cu.is_empty() {
            continue;
        }
        for m in cu.members() {
            touching.extend(target.neighbors(m).iter().copied());
        }
    }
    touching
}

/// Drive the outer loop to completion for one already-set-up problem.
/// `restrict` gates `place_vertex`'s soft containment penalty; `cancelled`
/// is polled between vertex placements and passes.
#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip_all, fields(source_count = source.len(), target_count = target.len(), tries = config.tries))]
pub fn run(
    source: &Graph,
    target: &Graph,
    chains: &mut ChainStore,
    restrict: &RestrictSets,
    config: &EngineConfig,
    rng: &mut Rng,
    cancelled: &dyn Fn() -> bool,
) -> Completion {
    let source_count = source.len();
    let started = Instant::now();
    let max_degree = (0..source_count as u32)
        .map(|v| source.degree(DenseId(v)))
        .max()
        .unwrap_or(0);
    let mut scratch = PlacementScratch::new(config.threads, max_degree, target.len());

    let mut best_key = quality_key(source, target, source_count, chains, restrict);
    let mut best_chains = chains.clone();
    let mut was_cancelled = false;

    'tries: for try_idx in 0..config.tries.max(1) {
        if try_idx > 0 {
            tracing::warn!(try_idx, best_state = best_key.state, "restarting search from a fresh initialization");
            for raw_v in 0..source_count as u32 {
                let v = DenseId(raw_v);
                if !chains.chain(v).is_fixed() && !chains.chain(v).is_pinned() {
                    let _ = chains.tear(v);
                }
            }
        }

        // Phase (i): initialization.
        if !config.skip_initialization || try_idx > 0 {
            let order = shuffled_movable_vertices(source_count, chains, rng);
            let to_place: Vec<DenseId> = order.into_iter().filter(|&v| chains.chain(v).is_empty()).collect();
            let cancel_hit = run_one_pass(
                &to_place, source, target, chains, restrict, INITIAL_BETA, config.max_fill, &mut scratch, rng, cancelled,
            );
            if cancel_hit {
                was_cancelled = true;
                break 'tries;
            }
        }

        let key = quality_key(source, target, source_count, chains, restrict);
        if key < best_key {
            best_key = key.clone();
            best_chains = chains.clone();
        }

        // Phase (ii): embedding search.
        let mut beta = INITIAL_BETA;
        let mut stall = 0usize;
        let mut rounds = 0usize;
        let mut phase_key = key;
        while phase_key.state != 0 {
            if stall >= config.max_no_improvement || rounds >= config.inner_rounds {
                break;
            }
            if started.elapsed() >= config.timeout {
                break 'tries;
            }
            let order = shuffled_movable_vertices(source_count, chains, rng);
            let cancel_hit = run_one_pass(
                &order, source, target, chains, restrict, beta, config.max_fill, &mut scratch, rng, cancelled,
            );
            if cancel_hit {
                was_cancelled = true;
                break 'tries;
            }
            rounds += 1;
            let new_key = quality_key(source, target, source_count, chains, restrict);
            tracing::debug!(
                try_idx,
                round = rounds,
                beta,
                overlap_count = new_key.overlap_histogram.iter().map(|(_, c)| c).sum::<u32>(),
                state = new_key.state,
                best_state = best_key.state,
                "completed one search pass"
            );
            if new_key.restrict_violations > 0 {
                tracing::warn!(
                    try_idx,
                    round = rounds,
                    violations = new_key.restrict_violations,
                    "restrict set violated under soft enforcement"
                );
            }
            if new_key < best_key {
                best_key = new_key.clone();
                best_chains = chains.clone();
                stall = 0;
            } else {
                stall += 1;
            }
            phase_key = new_key;
            beta = (beta * BETA_GROWTH).min(config.max_beta);
        }

        // Phase (iii): chainlength reduction, once a proper embedding
        // exists (or the caller started from a semi-valid one).
        if phase_key.state == 0 || config.skip_initialization {
            let mut patience = 0usize;
            while patience < config.chainlength_patience {
                if started.elapsed() >= config.timeout {
                    break 'tries;
                }
                if cancelled() {
                    was_cancelled = true;
                    break 'tries;
                }
                let snapshot = chains.clone();
                let order = shuffled_movable_vertices(source_count, chains, rng);
                for &v in &order {
                    let _ = chains.tear(v);
                    let outcome = place_vertex(
                        v,
                        source,
                        target,
                        chains,
                        restrict.get(v),
                        beta,
                        config.max_fill,
                        restrict_violation_penalty(target.len(), beta, config.max_fill),
                        &mut scratch,
                        rng,
                    );
                    if outcome == PlacementOutcome::Installed {
                        let touching = touching_set(v, source, target, chains);
                        let _ = chains.prune(v, |t| touching.contains(&t));
                    }
                }
                let new_key = quality_key(source, target, source_count, chains, restrict);
                if new_key.state <= phase_key.state
                    && new_key.length_histogram < snapshot_key_length(&snapshot, source, target, source_count, restrict)
                {
                    if new_key < best_key {
                        best_key = new_key.clone();
                        best_chains = chains.clone();
                    }
                    phase_key = new_key;
                    patience = 0;
                } else {
                    *chains = snapshot;
                    patience += 1;
                }
            }
        }

        if best_key.state == 0 {
            break 'tries;
        }
    }

    *chains = best_chains;

    if was_cancelled {
        Completion::Cancelled
    } else {
        match best_key.state {
            0 => Completion::Proper,
            2 => Completion::Empty,
            _ => {
                if best_key.state == 1 && started.elapsed() < config.timeout {
                    Completion::Overlapping
                } else {
                    Completion::Exhausted
                }
            }
        }
    }
}

fn snapshot_key_length(
    snapshot: &ChainStore,
    source: &Graph,
    target: &Graph,
    source_count: usize,
    restrict: &RestrictSets,
) -> Vec<(u32, u32)> {
    quality_key(source, target, source_count, snapshot, restrict).length_histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainStore;

    fn id(n: u32) -> DenseId {
        DenseId(n)
    }

    fn triangle() -> Graph {
        let mut g = Graph::with_vertex_count(3);
        g.add_edge(id(0), id(1));
        g.add_edge(id(1), id(2));
        g.add_edge(id(0), id(2));
        g
    }

    #[test]
    fn quality_key_orders_proper_below_overlapping_below_empty() {
        let source = triangle();
        let target = triangle();

        let mut proper = ChainStore::new(3, 3);
        proper.install(id(0), id(0), &[vec![id(0)]]).unwrap();
        proper.install(id(1), id(1), &[vec![id(1)]]).unwrap();
        proper.install(id(2), id(2), &[vec![id(2)]]).unwrap();
        let restrict = RestrictSets::with_source_count(3);
        let proper_key = quality_key(&source, &target, 3, &proper, &restrict);
        assert_eq!(proper_key.state, 0);

        let mut overlapping = ChainStore::new(3, 3);
        overlapping.install(id(0), id(0), &[vec![id(0)]]).unwrap();
        overlapping.install(id(1), id(0), &[vec![id(0)]]).unwrap();
        let overlap_key = quality_key(&source, &target, 3, &overlapping, &restrict);
        assert_eq!(overlap_key.state, 1);

        let empty = ChainStore::new(3, 3);
        let empty_key = quality_key(&source, &target, 3, &empty, &restrict);
        assert_eq!(empty_key.state, 2);

        assert!(proper_key < overlap_key);
        assert!(overlap_key < empty_key);
    }

    #[test]
    fn finds_a_proper_embedding_on_a_triangle() {
        let source = triangle();
        let target = triangle();
        let mut chains = ChainStore::new(3, 3);
        let restrict = RestrictSets::with_source_count(3);
        let config = EngineConfig {
            max_no_improvement: 10,
            timeout: Duration::from_secs(5),
            max_beta: 1000.0,
            tries: 5,
            inner_rounds: 100,
            chainlength_patience: 5,
            max_fill: 63,
            threads: 1,
            skip_initialization: false,
        };
        let mut rng = Rng::new(42);
        let completion = run(&source, &target, &mut chains, &restrict, &config, &mut rng, &|| false);
        assert_eq!(completion, Completion::Proper);
        for v in 0..3u32 {
            assert_eq!(chains.chain(id(v)).len(), 1);
        }
    }
}
