//! Chain bookkeeping: membership, parent-pointer tree, anchor, and the
//! target-node use-counts chains collectively own.

use ahash::{AHashMap, AHashSet};
use chainweld_types::{DenseId, Error, LogicFailure, Result};

/// A nonempty connected vertex set in T assigned to one source vertex, plus
/// the spanning tree (rooted at `anchor`) used to walk from any member to
/// the root in O(|chain|).
#[derive(Debug, Clone, Default)]
pub struct Chain {
    members: AHashSet<DenseId>,
    parent: AHashMap<DenseId, DenseId>,
    anchor: Option<DenseId>,
    fixed: bool,
    pinned: bool,
}

impl Chain {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn anchor(&self) -> Option<DenseId> {
        self.anchor
    }

    pub fn contains(&self, t: DenseId) -> bool {
        self.members.contains(&t)
    }

    pub fn members(&self) -> impl Iterator<Item = DenseId> + '_ {
        self.members.iter().copied()
    }

    pub fn parent_of(&self, t: DenseId) -> Option<DenseId> {
        self.parent.get(&t).copied()
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    fn is_immutable(&self) -> bool {
        self.fixed || self.pinned
    }
}

/// Owns every source vertex's [`Chain`] plus the shared per-target
/// use-count vector: a target node knows how many chains reference
/// it. Use-counts live here, not on the target graph, because every
/// mutation that changes them (`install`/`tear`/`prune`) is a chain-store
/// operation.
#[derive(Clone)]
pub struct ChainStore {
    chains: Vec<Chain>,
    use_count: Vec<u32>,
}

impl ChainStore {
    pub fn new(source_count: usize, target_count: usize) -> Self {
        Self {
            chains: vec![Chain::default(); source_count],
            use_count: vec![0; target_count],
        }
    }

    pub fn chain(&self, v: DenseId) -> &Chain {
        &self.chains[v.index()]
    }

    pub fn use_count(&self, t: DenseId) -> u32 {
        self.use_count[t.index()]
    }

    pub fn use_counts(&self) -> &[u32] {
        &self.use_count
    }

    pub fn mark_fixed(&mut self, v: DenseId) {
        self.chains[v.index()].fixed = true;
    }

    pub fn mark_pinned(&mut self, v: DenseId) {
        self.chains[v.index()].pinned = true;
    }

    /// Replace chain(v) with the union of `paths`, each a target-node
    /// sequence ending at `root`. Use-counts are decremented for members
    /// leaving the chain and incremented for members entering it.
    pub fn install(&mut self, v: DenseId, root: DenseId, paths: &[Vec<DenseId>]) -> Result<()> {
        if self.chains[v.index()].is_immutable() {
            return Err(Error::Logic(LogicFailure::MutatedImmutableChain(v.0)));
        }

        let old_members: Vec<DenseId> = self.chains[v.index()].members().collect();
        for t in old_members {
            self.use_count[t.index()] = self.use_count[t.index()].saturating_sub(1);
        }

        let mut members = AHashSet::new();
        members.insert(root);
        let mut parent = AHashMap::new();
        for path in paths {
            for &t in path {
                members.insert(t);
            }
            for window in path.windows(2) {
                parent.insert(window[0], window[1]);
            }
        }
        parent.remove(&root);

        for &t in &members {
            self.use_count[t.index()] += 1;
        }

        let slot = &mut self.chains[v.index()];
        slot.members = members;
        slot.parent = parent;
        slot.anchor = Some(root);

        debug_assert!(
            self.is_connected(v),
            "install produced a disconnected chain for source vertex {}",
            v.0
        );
        Ok(())
    }

    /// Fully empty chain(v), releasing its use-count claims. A no-op
    /// target: fixed and pinned chains reject this with `LogicFailure`.
    pub fn tear(&mut self, v: DenseId) -> Result<()> {
        let slot = &self.chains[v.index()];
        if slot.is_immutable() {
            return Err(Error::Logic(LogicFailure::MutatedImmutableChain(v.0)));
        }
        let members: Vec<DenseId> = slot.members().collect();
        for t in members {
            self.use_count[t.index()] = self.use_count[t.index()].saturating_sub(1);
        }
        self.chains[v.index()] = Chain::default();
        Ok(())
    }

    /// Drop chain-tree leaves that are neither the anchor nor required to
    /// stay, per `is_required`, repeating until no leaf qualifies. Used
    /// during chainlength reduction.
    pub fn prune(&mut self, v: DenseId, is_required: impl Fn(DenseId) -> bool) -> Result<()> {
        if self.chains[v.index()].is_immutable() {
            return Err(Error::Logic(LogicFailure::MutatedImmutableChain(v.0)));
        }
        loop {
            let chain = &self.chains[v.index()];
            let anchor = match chain.anchor {
                Some(a) => a,
                None => return Ok(()),
            };
            let mut child_count: AHashMap<DenseId, u32> = AHashMap::new();
            for &parent in chain.parent.values() {
                *child_count.entry(parent).or_insert(0) += 1;
            }
            // `members` is a hash set; its iteration order is not stable
            // across runs, so pick the lowest id among qualifying leaves
            // rather than the first one found, to keep pruning deterministic.
            let leaf = chain
                .members()
                .filter(|&t| {
                    t != anchor && child_count.get(&t).copied().unwrap_or(0) == 0 && !is_required(t)
                })
                .min_by_key(|t| t.0);
            match leaf {
                Some(t) => {
                    let slot = &mut self.chains[v.index()];
                    slot.members.remove(&t);
                    slot.parent.remove(&t);
                    self.use_count[t.index()] = self.use_count[t.index()].saturating_sub(1);
                }
                None => return Ok(()),
            }
        }
    }

    /// Walk every member to the anchor and confirm the parent map actually
    /// gets there in at most `|chain|` hops. Used only from `debug_assert!`.
    fn is_connected(&self, v: DenseId) -> bool {
        let chain = &self.chains[v.index()];
        if chain.members.is_empty() {
            return true;
        }
        let anchor = match chain.anchor {
            Some(a) => a,
            None => return false,
        };
        for m in chain.members() {
            let mut cur = m;
            let mut hops = 0;
            while cur != anchor {
                cur = match chain.parent_of(cur) {
                    Some(p) => p,
                    None => return false,
                };
                hops += 1;
                if hops > chain.members.len() {
                    return false;
                }
            }
        }
        true
    }
}
