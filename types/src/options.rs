use std::collections::HashMap;
use std::hash::Hash;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-source suspension blobs: `suspend_chains[v] = [B_1, .., B_k]`, each
/// `B_i` a list of target labels at least one of which must land in
/// `chain(v)`.
pub type SuspendChains<L> = HashMap<L, Vec<Vec<L>>>;
pub type ChainSeed<L> = HashMap<L, Vec<L>>;

/// Tuning knobs for `find_embedding`. Field-for-field, this mirrors the
/// options table in the engine's specification; defaults match the
/// documented column there.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = ""))]
pub struct Options<L: Hash + Eq + Clone> {
    pub max_no_improvement: usize,
    pub random_seed: Option<u64>,
    pub timeout_seconds: f64,
    pub max_beta: f64,
    pub tries: usize,
    pub inner_rounds: usize,
    pub chainlength_patience: usize,
    /// Hard cap on chain-count per target node during search. Clamped to 63
    /// by setup regardless of what's requested here.
    pub max_fill: u32,
    pub threads: usize,
    /// When set, `find_embedding`'s third return value is
    /// `Some(true)`/`Some(false)` reporting whether the mapping is a
    /// proper embedding, instead of `None`.
    pub return_overlap: bool,
    pub skip_initialization: bool,
    pub verbose: u8,
    pub initial_chains: ChainSeed<L>,
    pub fixed_chains: ChainSeed<L>,
    pub restrict_chains: ChainSeed<L>,
    pub suspend_chains: SuspendChains<L>,
}

impl<L: Hash + Eq + Clone> Default for Options<L> {
    fn default() -> Self {
        Self {
            max_no_improvement: 10,
            random_seed: None,
            timeout_seconds: 1000.0,
            max_beta: f64::INFINITY,
            tries: 10,
            inner_rounds: usize::MAX,
            chainlength_patience: 10,
            max_fill: u32::MAX,
            threads: 1,
            return_overlap: false,
            skip_initialization: false,
            verbose: 0,
            initial_chains: HashMap::new(),
            fixed_chains: HashMap::new(),
            restrict_chains: HashMap::new(),
            suspend_chains: HashMap::new(),
        }
    }
}

/// How the returned mapping relates to a full embedding. Mirrors the
/// `state` component of the scheduler's ordering key plus the Exhaustion /
/// Cancelled surfaces (both of which return `Ok` with this tag
/// rather than an error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Completion {
    /// Chains are pairwise disjoint and every source edge is covered.
    Proper,
    /// An embedding exists but chains overlap or an edge is uncovered.
    Overlapping,
    /// No non-fixed chain could be placed, or the source graph was empty.
    Empty,
    /// Ran out of tries/inner_rounds/timeout before converging.
    Exhausted,
    /// The caller's cancellation predicate fired.
    Cancelled,
}
