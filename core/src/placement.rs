//! One-vertex placement heuristic.
//!
//! Precondition: chain(v) has already been torn; every other chain
//! (possibly overlapping) is left in place. This module only ever reads
//! chain membership through a `&ChainStore` borrow and installs the result
//! through a separate `&mut ChainStore` borrow once the read phase is done,
//! so the parallel neighbor-distance fan-out never has to share mutable
//! state.

use ahash::AHashSet;
use chainweld_types::DenseId;
use rayon::prelude::*;

use crate::chain::ChainStore;
use crate::dijkstra::DijkstraScratch;
use crate::graph::Graph;
use crate::rng::Rng;

/// Reusable, allocation-free working memory for placements: one
/// [`DijkstraScratch`] slot per possible neighbor (sized to the source
/// graph's maximum degree) plus the worker pool the slots are dispatched
/// on.
pub struct PlacementScratch {
    slots: Vec<DijkstraScratch>,
    pool: rayon::ThreadPool,
}

impl PlacementScratch {
    pub fn new(threads: usize, max_source_degree: usize, target_count: usize) -> Self {
        let slots = (0..max_source_degree.max(1))
            .map(|_| DijkstraScratch::with_capacity(target_count))
            .collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .build()
            .expect("failed to build the placement worker pool");
        Self { slots, pool }
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

/// Outcome of attempting to place one source vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// chain(v) was installed (possibly from only a subset of reachable
    /// neighbors — see the "no valid path" edge case below).
    Installed,
    /// No candidate target node was reachable or permitted at all; chain(v)
    /// is left empty.
    Failed,
}

/// Place source vertex `v`. `restrict_v` is `v`'s restrict set, if
/// any. `rng` drives the shuffle used to break equal-score ties and the
/// cold-start root choice.
#[allow(clippy::too_many_arguments)]
pub fn place_vertex(
    v: DenseId,
    source: &Graph,
    target: &Graph,
    chains: &mut ChainStore,
    restrict_v: Option<&AHashSet<DenseId>>,
    beta: f64,
    max_fill: u32,
    restrict_penalty: f64,
    scratch: &mut PlacementScratch,
    rng: &mut Rng,
) -> PlacementOutcome {
    let neighbors: Vec<DenseId> = source
        .neighbors(v)
        .iter()
        .copied()
        .filter(|&u| !chains.chain(u).is_empty())
        .collect();

    if neighbors.is_empty() {
        return cold_start(v, target, chains, restrict_v, rng);
    }

    compute_neighbor_distances(&neighbors, chains, target, restrict_v, beta, max_fill, restrict_penalty, scratch);

    let n = neighbors.len();
    let t_count = target.len();
    let mut score = vec![0.0f64; t_count];
    for slot in &scratch.slots[..n] {
        for t in 0..t_count {
            score[t] += slot.dist[t];
        }
    }

    let min_score = score.iter().copied().fold(f64::INFINITY, f64::min);
    if !min_score.is_finite() {
        tracing::warn!(source_vertex = v.0, "no target node reachable from any neighbor chain");
        return PlacementOutcome::Failed;
    }

    let mut tied: Vec<DenseId> = (0..t_count as u32)
        .map(DenseId)
        .filter(|t| score[t.index()] == min_score)
        .collect();
    rng.shuffle(&mut tied);
    tied.sort_by_key(|t| t.0);
    let t_star = tied[0];

    let mut paths = Vec::with_capacity(n);
    for (slot, &u) in scratch.slots[..n].iter().zip(neighbors.iter()) {
        if !slot.dist[t_star.index()].is_finite() {
            tracing::warn!(
                source_vertex = v.0,
                neighbor = u.0,
                "no path from neighbor's chain to the chosen root; edge temporarily unsatisfied"
            );
            continue;
        }
        paths.push(reconstruct_path(t_star, chains.chain(u), &slot.parent));
    }

    if paths.is_empty() {
        tracing::warn!(source_vertex = v.0, "chosen root unreachable from every neighbor");
        return PlacementOutcome::Failed;
    }

    chains
        .install(v, t_star, &paths)
        .expect("install target is not fixed: chain(v) was torn before placement");
    PlacementOutcome::Installed
}

fn compute_neighbor_distances(
    neighbors: &[DenseId],
    chains: &ChainStore,
    target: &Graph,
    restrict_v: Option<&AHashSet<DenseId>>,
    beta: f64,
    max_fill: u32,
    restrict_penalty: f64,
    scratch: &mut PlacementScratch,
) {
    let n = neighbors.len();
    let use_count = chains.use_counts();
    let PlacementScratch { pool, slots } = scratch;

    if n >= 2 && pool.current_num_threads() > 1 {
        pool.install(|| {
            slots[..n]
                .par_iter_mut()
                .zip(neighbors.par_iter())
                .for_each(|(slot, &u)| {
                    let own_chain = chains.chain(u);
                    slot.run(target, use_count, beta, max_fill, own_chain, restrict_v, restrict_penalty);
                });
        });
    } else {
        for (slot, &u) in slots[..n].iter_mut().zip(neighbors.iter()) {
            let own_chain = chains.chain(u);
            slot.run(target, use_count, beta, max_fill, own_chain, restrict_v, restrict_penalty);
        }
    }
}

/// Walk `parent_u` from `t_star` back to the first node already in
/// `chain_u`, then reverse so the path ends at `t_star` (the chain-store
/// `install` convention).
fn reconstruct_path(t_star: DenseId, chain_u: &crate::chain::Chain, parent_u: &[Option<DenseId>]) -> Vec<DenseId> {
    let mut path = vec![t_star];
    let mut cur = t_star;
    while !chain_u.contains(cur) {
        match parent_u[cur.index()] {
            Some(p) => {
                path.push(p);
                cur = p;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

fn cold_start(
    v: DenseId,
    target: &Graph,
    chains: &mut ChainStore,
    restrict_v: Option<&AHashSet<DenseId>>,
    rng: &mut Rng,
) -> PlacementOutcome {
    // Hash-set iteration order is not stable across runs; sort so the
    // candidate pool (and therefore the RNG draw over it) is deterministic.
    let mut base: Vec<DenseId> = match restrict_v {
        Some(set) => set.iter().copied().collect(),
        None => (0..target.len() as u32).map(DenseId).collect(),
    };
    base.sort_by_key(|t| t.0);

    if base.is_empty() {
        tracing::warn!(source_vertex = v.0, "cold start has no permitted target node");
        return PlacementOutcome::Failed;
    }

    let use_count = chains.use_counts();
    let unused: Vec<DenseId> = base.iter().copied().filter(|t| use_count[t.index()] == 0).collect();
    let candidates = if unused.is_empty() { &base } else { &unused };

    let t_star = candidates[rng.choose_index(candidates.len())];
    chains
        .install(v, t_star, &[vec![t_star]])
        .expect("install target is not fixed: chain(v) was torn before placement");
    PlacementOutcome::Installed
}
