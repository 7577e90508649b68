//! Multi-source weighted Dijkstra over the target graph.
//!
//! Operates entirely on caller-supplied scratch slices so a placement's
//! parallel neighbor-distance fan-out can give each task its
//! own disjoint buffers without allocating inside the hot path.

use ahash::AHashSet;
use chainweld_types::DenseId;

use crate::chain::Chain;
use crate::graph::{overlap_weight, Graph};
use crate::heap::PairingHeap;

/// Per-slot working memory for one Dijkstra run, sized `|T|` (plus the
/// heap's own `|T|`-sized arena). Reused across placements and across
/// passes; never reallocated once built.
pub struct DijkstraScratch {
    pub heap: PairingHeap,
    pub dist: Vec<f64>,
    pub hops: Vec<u32>,
    pub parent: Vec<Option<DenseId>>,
    pub finalized: Vec<bool>,
}

impl DijkstraScratch {
    pub fn with_capacity(target_count: usize) -> Self {
        Self {
            heap: PairingHeap::with_capacity(target_count),
            dist: vec![f64::INFINITY; target_count],
            hops: vec![u32::MAX; target_count],
            parent: vec![None; target_count],
            finalized: vec![false; target_count],
        }
    }

    pub fn run(
        &mut self,
        target: &Graph,
        use_count: &[u32],
        beta: f64,
        max_fill: u32,
        own_chain: &Chain,
        restrict: Option<&AHashSet<DenseId>>,
        restrict_penalty: f64,
    ) {
        multi_source_shortest_paths(
            target,
            use_count,
            beta,
            max_fill,
            own_chain,
            restrict,
            restrict_penalty,
            &mut self.heap,
            &mut self.dist,
            &mut self.hops,
            &mut self.parent,
            &mut self.finalized,
        );
    }
}

/// Run multi-source Dijkstra seeded from `own_chain`'s members, writing
/// results into the caller's scratch slices (all length `target.len()`,
/// except `heap` whose capacity must be `>= target.len()`).
///
/// Tie-breaking when two predecessors offer the same distance to a node:
/// fewer hops from the seed set wins, then lower target id.
#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip_all, fields(target_count = target.len(), beta, seeds = own_chain.len()))]
pub fn multi_source_shortest_paths(
    target: &Graph,
    use_count: &[u32],
    beta: f64,
    max_fill: u32,
    own_chain: &Chain,
    restrict: Option<&AHashSet<DenseId>>,
    restrict_penalty: f64,
    heap: &mut PairingHeap,
    dist: &mut [f64],
    hops: &mut [u32],
    parent: &mut [Option<DenseId>],
    finalized: &mut [bool],
) {
    heap.reset();
    dist.fill(f64::INFINITY);
    hops.fill(u32::MAX);
    parent.fill(None);
    finalized.fill(false);

    for seed in own_chain.members() {
        dist[seed.index()] = 0.0;
        hops[seed.index()] = 0;
        heap.set_value(seed.0, 0.0);
    }

    while let Some(raw) = heap.pop_min() {
        let t = DenseId(raw);
        if finalized[t.index()] {
            continue;
        }
        finalized[t.index()] = true;
        let d = dist[t.index()];
        let h = hops[t.index()];

        for &next in target.neighbors(t) {
            if finalized[next.index()] {
                continue;
            }
            let in_own_chain = own_chain.contains(next);
            if !in_own_chain && use_count[next.index()] >= max_fill {
                continue;
            }

            let mut w = if in_own_chain {
                0.0
            } else {
                overlap_weight(use_count[next.index()], beta)
            };
            if let Some(allowed) = restrict {
                if !allowed.contains(&next) {
                    w += restrict_penalty;
                }
            }

            let candidate = d + w;
            let candidate_hops = h + 1;
            let slot = next.index();

            if candidate < dist[slot] {
                dist[slot] = candidate;
                hops[slot] = candidate_hops;
                parent[slot] = Some(t);
                heap.check_decrease_value(next.0, candidate);
            } else if candidate == dist[slot]
                && (candidate_hops, t.0)
                    < (hops[slot], parent[slot].map(|p| p.0).unwrap_or(u32::MAX))
            {
                hops[slot] = candidate_hops;
                parent[slot] = Some(t);
            }
        }
    }
}

/// The additive penalty applied to a restrict-set violation: strictly
/// larger than the most expensive possible legal path, so restricted
/// placements are always preferred over out-of-set ones when both are
/// feasible.
pub fn restrict_violation_penalty(target_count: usize, beta: f64, max_fill: u32) -> f64 {
    let worst_hop = max_fill.min(63) as i32;
    let worst_edge = if beta.is_finite() {
        beta.powi(worst_hop) - 1.0
    } else {
        f64::MAX / (target_count as f64 + 1.0)
    };
    (target_count as f64 + 1.0) * worst_edge
}
