//! Target/source graph structure and overlap weighting.
//!
//! Both S and T are plain adjacency-list graphs over dense ids; what makes a
//! target graph "the target graph" is the extra bookkeeping layered on top
//! in [`ChainStore`](crate::chain::ChainStore) (use-counts) and the restrict
//! masks kept here.

use ahash::AHashSet;
use chainweld_types::DenseId;
use smallvec::SmallVec;

/// Most source and target graphs this engine is aimed at (annealer
/// topologies, small gadget graphs) have low fixed degree; inlining a
/// handful of neighbors avoids a heap allocation per vertex for the common
/// case while still spilling to the heap for hub vertices.
type AdjacencyList = SmallVec<[DenseId; 6]>;

/// Plain undirected adjacency-list graph over dense ids `[0, len())`.
/// Used for both S and T; edges are deduplicated on insert so `neighbors`
/// never yields the same id twice.
#[derive(Debug, Clone)]
pub struct Graph {
    adjacency: Vec<AdjacencyList>,
}

impl Graph {
    pub fn with_vertex_count(n: usize) -> Self {
        Self {
            adjacency: vec![SmallVec::new(); n],
        }
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn add_edge(&mut self, a: DenseId, b: DenseId) {
        if a == b {
            return;
        }
        if !self.adjacency[a.index()].contains(&b) {
            self.adjacency[a.index()].push(b);
        }
        if !self.adjacency[b.index()].contains(&a) {
            self.adjacency[b.index()].push(a);
        }
    }

    pub fn neighbors(&self, v: DenseId) -> &[DenseId] {
        &self.adjacency[v.index()]
    }

    pub fn degree(&self, v: DenseId) -> usize {
        self.adjacency[v.index()].len()
    }

    pub fn has_edge(&self, a: DenseId, b: DenseId) -> bool {
        self.adjacency[a.index()].contains(&b)
    }
}

/// Per-source-vertex permitted-target-node sets ("restrict set"). Absent
/// entries mean the constraint is inactive for that source vertex.
#[derive(Debug, Clone)]
pub struct RestrictSets {
    sets: Vec<Option<AHashSet<DenseId>>>,
}

impl RestrictSets {
    pub fn with_source_count(n: usize) -> Self {
        Self {
            sets: vec![None; n],
        }
    }

    pub fn set(&mut self, v: DenseId, allowed: AHashSet<DenseId>) {
        self.sets[v.index()] = if allowed.is_empty() { None } else { Some(allowed) };
    }

    pub fn is_restricted(&self, v: DenseId) -> bool {
        self.sets[v.index()].is_some()
    }

    pub fn permits(&self, v: DenseId, t: DenseId) -> bool {
        match &self.sets[v.index()] {
            Some(allowed) => allowed.contains(&t),
            None => true,
        }
    }

    pub fn get(&self, v: DenseId) -> Option<&AHashSet<DenseId>> {
        self.sets[v.index()].as_ref()
    }
}

/// Overlap-penalized edge weight entering a target node with the given
/// use-count, under base `beta`: `w(t) = beta^u(t) - 1`.
#[inline]
pub fn overlap_weight(use_count: u32, beta: f64) -> f64 {
    if use_count == 0 {
        0.0
    } else {
        beta.powi(use_count as i32) - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> DenseId {
        DenseId(n)
    }

    #[test]
    fn add_edge_is_symmetric_and_deduped() {
        let mut g = Graph::with_vertex_count(3);
        g.add_edge(id(0), id(1));
        g.add_edge(id(1), id(0));
        assert_eq!(g.neighbors(id(0)), &[id(1)]);
        assert_eq!(g.neighbors(id(1)), &[id(0)]);
        assert_eq!(g.degree(id(0)), 1);
    }

    #[test]
    fn self_loops_are_ignored() {
        let mut g = Graph::with_vertex_count(2);
        g.add_edge(id(0), id(0));
        assert_eq!(g.degree(id(0)), 0);
    }

    #[test]
    fn restrict_sets_default_to_unrestricted() {
        let mut sets = RestrictSets::with_source_count(2);
        assert!(sets.permits(id(0), id(5)));
        let mut allowed = AHashSet::new();
        allowed.insert(id(3));
        sets.set(id(0), allowed);
        assert!(sets.is_restricted(id(0)));
        assert!(sets.permits(id(0), id(3)));
        assert!(!sets.permits(id(0), id(4)));
        assert!(sets.permits(id(1), id(4)));
    }

    #[test]
    fn overlap_weight_is_zero_when_unused() {
        assert_eq!(overlap_weight(0, 2.0), 0.0);
        assert!(overlap_weight(1, 2.0) > 0.0);
        assert!(overlap_weight(2, 2.0) > overlap_weight(1, 2.0));
    }
}
