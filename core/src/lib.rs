//! Heuristic graph minor-embedding engine (Cai-Macready-Roy placement
//! heuristic): given a source graph S and a target graph T, find a mapping
//! from each vertex of S to a connected, (ideally) vertex-disjoint chain of
//! T-vertices such that every S-edge is witnessed by a T-edge between the
//! two endpoints' chains.
//!
//! [`find_embedding`] is the public entry point; everything else is the
//! machinery it wires together: a seeded PRNG ([`rng`]), a pairing heap
//! ([`heap`]) for the weighted multi-source shortest-path search
//! ([`dijkstra`]) that drives one-vertex placement ([`placement`]), chain
//! bookkeeping ([`chain`]) over the target graph ([`graph`]), the outer
//! search loop ([`scheduler`]), and option/label translation ([`setup`]).

pub mod chain;
pub mod dijkstra;
pub mod graph;
pub mod heap;
pub mod placement;
pub mod rng;
pub mod scheduler;
pub mod setup;

use std::fmt::Debug;
use std::hash::Hash;

use chainweld_types::{ChainSeed, Completion, DenseId, Options, Result};

pub use scheduler::EngineConfig;
pub use setup::Built;

/// Find a minor embedding of `source_edges` into `target_edges` under
/// `options`. Never blocks on anything other than CPU time and the
/// `timeout_seconds`/`tries`/`inner_rounds` budgets in `options`; for a
/// search that can be aborted early from another thread, use
/// [`find_embedding_cancellable`].
///
/// Returns the mapping (each source label to its assigned chain, in no
/// particular member order), a [`Completion`] describing how the search
/// ended, and — only when `options.return_overlap` is set — a `Some(bool)`
/// that is true iff the mapping is a proper (overlap-free, edge-covering)
/// embedding; `None` when the option is off. Suspension-pin auxiliaries
/// never appear in either the mapping's keys or its values.
#[tracing::instrument(skip_all)]
pub fn find_embedding<L, SI, TI>(
    source_edges: SI,
    target_edges: TI,
    options: &Options<L>,
) -> Result<(ChainSeed<L>, Completion, Option<bool>)>
where
    L: Hash + Eq + Clone + Debug,
    SI: IntoIterator<Item = (L, L)>,
    TI: IntoIterator<Item = (L, L)>,
{
    find_embedding_cancellable(source_edges, target_edges, options, &|| false)
}

/// As [`find_embedding`], but `cancelled` is polled between vertex
/// placements and between passes; the first `true` it returns ends
/// the search and yields [`Completion::Cancelled`] over whatever the best
/// embedding found so far was.
#[tracing::instrument(skip_all)]
pub fn find_embedding_cancellable<L, SI, TI>(
    source_edges: SI,
    target_edges: TI,
    options: &Options<L>,
    cancelled: &dyn Fn() -> bool,
) -> Result<(ChainSeed<L>, Completion, Option<bool>)>
where
    L: Hash + Eq + Clone + Debug,
    SI: IntoIterator<Item = (L, L)>,
    TI: IntoIterator<Item = (L, L)>,
{
    let mut built = setup::build(source_edges, target_edges, options)?;
    let source_count = built.source.len();

    if source_count == 0 {
        let success = options.return_overlap.then_some(false);
        return Ok((ChainSeed::new(), Completion::Empty, success));
    }

    let mut prng = rng::Rng::new(options.random_seed.unwrap_or_else(entropy_seed));

    let completion = scheduler::run(
        &built.source,
        &built.target,
        &mut built.chains,
        &built.restrict,
        &built.config,
        &mut prng,
        cancelled,
    );

    let mut mapping = ChainSeed::with_capacity(source_count);
    for raw_v in 0..source_count as u32 {
        let v = DenseId(raw_v);
        let Some(label) = built.source_label(v) else {
            continue; // suspension pin auxiliary
        };
        let members: Vec<L> = built
            .chains
            .chain(v)
            .members()
            .filter_map(|t| built.target_label(t).cloned())
            .collect();
        mapping.insert(label.clone(), members);
    }

    let success = options.return_overlap.then_some(completion == Completion::Proper);
    Ok((mapping, completion, success))
}

/// A seed for when the caller didn't supply `random_seed`. Not part of the
/// determinism guarantee — that guarantee is conditioned on a caller
/// providing a fixed seed in the first place.
fn entropy_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9E37_79B9_7F4A_7C15)
}
