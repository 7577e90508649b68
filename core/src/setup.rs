//! Translate caller-facing `Options<L>` into dense-id structures the rest
//! of the engine operates on: option validation and clamping, label
//! interning, pin/suspension auxiliary construction, and application of
//! `initial_chains` / `fixed_chains` / `restrict_chains`.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use ahash::AHashSet;
use chainweld_types::{ChainSeed, DenseId, Error, LabelTable, Options, Result, UsageError};

use crate::chain::ChainStore;
use crate::graph::{Graph, RestrictSets};
use crate::scheduler::EngineConfig;

/// Every label the engine interns internally is either a caller-supplied
/// label or a synthetic pin auxiliary. Keeping the two in separate enum
/// variants (rather than trying to mint a "fresh" `L` the caller could
/// collide with) means a pin auxiliary can never alias a user label: the
/// two live in disjoint branches of a sum type, not a shared namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum InternalLabel<L> {
    User(L),
    Pin(u64),
}

/// Everything `scheduler::run` needs for one problem, plus what `lib.rs`
/// needs afterward to translate the result back into caller labels.
pub struct Built<L: Hash + Eq + Clone> {
    pub source: Graph,
    pub target: Graph,
    pub chains: ChainStore,
    pub restrict: RestrictSets,
    pub config: EngineConfig,
    source_labels: LabelTable<InternalLabel<L>>,
    target_labels: LabelTable<InternalLabel<L>>,
}

impl<L: Hash + Eq + Clone + Debug> Built<L> {
    /// `v`'s source label, or `None` if `v` is a suspension pin auxiliary
    /// that must not appear in the returned mapping.
    pub fn source_label(&self, v: DenseId) -> Option<&L> {
        match self.source_labels.label(v) {
            Some(InternalLabel::User(l)) => Some(l),
            _ => None,
        }
    }

    /// `t`'s target label, or `None` if `t` is a suspension pin auxiliary
    /// that must be filtered out of a chain's member list before it is
    /// handed back to the caller.
    pub fn target_label(&self, t: DenseId) -> Option<&L> {
        match self.target_labels.label(t) {
            Some(InternalLabel::User(l)) => Some(l),
            _ => None,
        }
    }
}

/// `HashMap` iteration order is randomized per instance, so any order this
/// engine's output could depend on (pin dense-id assignment, in
/// particular) has to be fixed before it is walked. There's no `Ord` bound
/// on `L`, so the label's `Debug` text stands in as a stable sort key.
fn sorted_by_label<L: Debug, V>(map: &std::collections::HashMap<L, V>) -> Vec<(&L, &V)> {
    let mut entries: Vec<(&L, &V)> = map.iter().collect();
    entries.sort_by(|a, b| format!("{:?}", a.0).cmp(&format!("{:?}", b.0)));
    entries
}

fn validate_options<L: Hash + Eq + Clone>(options: &Options<L>) -> Result<()> {
    if options.threads == 0 {
        return Err(Error::Usage(UsageError::OptionOutOfRange {
            name: "threads",
            reason: "must be at least 1".into(),
        }));
    }
    if !(options.max_beta > 1.0) {
        return Err(Error::Usage(UsageError::OptionOutOfRange {
            name: "max_beta",
            reason: "must be greater than 1".into(),
        }));
    }
    if !options.timeout_seconds.is_finite() || options.timeout_seconds < 0.0 {
        return Err(Error::Usage(UsageError::OptionOutOfRange {
            name: "timeout_seconds",
            reason: "must be finite and non-negative".into(),
        }));
    }
    Ok(())
}

fn lookup<L: Hash + Eq + Clone + Debug>(
    table: &LabelTable<InternalLabel<L>>,
    graph: &'static str,
    label: &L,
    context: &'static str,
) -> Result<DenseId> {
    table
        .get(&InternalLabel::User(label.clone()))
        .ok_or_else(|| {
            Error::Usage(UsageError::UnknownLabel {
                graph,
                label: format!("{label:?}"),
                context,
            })
        })
}

/// Build the dense-id problem described by `source_edges`/`target_edges`
/// and `options`. Validation is eager: every `UsageError` variant this
/// function can detect is raised here, before any heuristic work starts.
pub fn build<L, SI, TI>(source_edges: SI, target_edges: TI, options: &Options<L>) -> Result<Built<L>>
where
    L: Hash + Eq + Clone + Debug,
    SI: IntoIterator<Item = (L, L)>,
    TI: IntoIterator<Item = (L, L)>,
{
    validate_options(options)?;

    let mut source_labels: LabelTable<InternalLabel<L>> = LabelTable::new();
    let mut target_labels: LabelTable<InternalLabel<L>> = LabelTable::new();

    let mut source_edges_dense = Vec::new();
    for (a, b) in source_edges {
        let ia = source_labels.intern(InternalLabel::User(a));
        let ib = source_labels.intern(InternalLabel::User(b));
        source_edges_dense.push((ia, ib));
    }
    let mut target_edges_dense = Vec::new();
    for (a, b) in target_edges {
        let ia = target_labels.intern(InternalLabel::User(a));
        let ib = target_labels.intern(InternalLabel::User(b));
        target_edges_dense.push((ia, ib));
    }

    // Suspension pins: a fresh auxiliary source vertex per blob, fixed
    // to a fresh auxiliary target vertex, wired so that vertex can only
    // ever be reached through the blob's candidate targets. Collected here,
    // before the graphs are sized, so both auxiliary vertices get a dense
    // id alongside everything else rather than requiring the graphs to
    // grow after the fact.
    let mut pin_counter = 0u64;
    let mut pin_source_edges = Vec::new();
    let mut pin_fixed_chains = Vec::new();
    let mut pin_target_edges = Vec::new();

    for (v_label, blobs) in sorted_by_label(&options.suspend_chains) {
        let v = lookup(&source_labels, "source", v_label, "suspend_chains")?;
        for blob in blobs {
            let z = source_labels.intern(InternalLabel::Pin(pin_counter));
            let z_prime = target_labels.intern(InternalLabel::Pin(pin_counter));
            pin_counter += 1;
            pin_source_edges.push((v, z));
            pin_fixed_chains.push((z, z_prime));
            for q_label in blob {
                let q = lookup(&target_labels, "target", q_label, "suspend_chains")?;
                pin_target_edges.push((z_prime, q));
            }
        }
    }

    let mut source = Graph::with_vertex_count(source_labels.len());
    for (a, b) in source_edges_dense {
        source.add_edge(a, b);
    }
    for &(v, z) in &pin_source_edges {
        source.add_edge(v, z);
    }

    let mut target = Graph::with_vertex_count(target_labels.len());
    for (a, b) in target_edges_dense {
        target.add_edge(a, b);
    }
    for &(z_prime, q) in &pin_target_edges {
        target.add_edge(z_prime, q);
    }

    let mut chains = ChainStore::new(source.len(), target.len());
    for (z, z_prime) in pin_fixed_chains {
        chains
            .install(z, z_prime, &[vec![z_prime]])
            .expect("a freshly minted pin vertex cannot already be fixed");
        chains.mark_fixed(z);
        chains.mark_pinned(z);
    }

    apply_initial_chains(&options.initial_chains, &source_labels, &target_labels, &mut chains)?;
    apply_fixed_chains(&options.fixed_chains, &source_labels, &target_labels, &mut chains)?;

    let mut restrict = RestrictSets::with_source_count(source.len());
    apply_restrict_chains(&options.restrict_chains, &source_labels, &target_labels, &mut restrict)?;

    let max_fill = options.max_fill.min(63);
    let config = EngineConfig {
        max_no_improvement: options.max_no_improvement,
        timeout: Duration::from_secs_f64(options.timeout_seconds),
        max_beta: options.max_beta,
        tries: options.tries,
        inner_rounds: options.inner_rounds,
        chainlength_patience: options.chainlength_patience,
        max_fill,
        threads: options.threads,
        skip_initialization: options.skip_initialization,
    };

    Ok(Built {
        source,
        target,
        chains,
        restrict,
        config,
        source_labels,
        target_labels,
    })
}

/// A caller-supplied seed path is installed verbatim: the first listed
/// target label becomes the chain's anchor, the rest its tree, regardless
/// of whether the sequence happens to follow target-graph adjacency.
fn seed_path<L: Hash + Eq + Clone + Debug>(
    target_labels: &LabelTable<InternalLabel<L>>,
    members: &[L],
    context: &'static str,
) -> Result<(DenseId, Vec<DenseId>)> {
    let mut ids = Vec::with_capacity(members.len());
    for m in members {
        ids.push(lookup(target_labels, "target", m, context)?);
    }
    let root = ids[0];
    let mut path = ids.clone();
    path.reverse();
    Ok((root, path))
}

fn apply_initial_chains<L: Hash + Eq + Clone + Debug>(
    seeds: &ChainSeed<L>,
    source_labels: &LabelTable<InternalLabel<L>>,
    target_labels: &LabelTable<InternalLabel<L>>,
    chains: &mut ChainStore,
) -> Result<()> {
    for (v_label, members) in sorted_by_label(seeds) {
        if members.is_empty() {
            continue;
        }
        let v = lookup(source_labels, "source", v_label, "initial_chains")?;
        let (root, path) = seed_path(target_labels, members, "initial_chains")?;
        chains.install(v, root, &[path])?;
    }
    Ok(())
}

fn apply_fixed_chains<L: Hash + Eq + Clone + Debug>(
    seeds: &ChainSeed<L>,
    source_labels: &LabelTable<InternalLabel<L>>,
    target_labels: &LabelTable<InternalLabel<L>>,
    chains: &mut ChainStore,
) -> Result<()> {
    let mut owner: ahash::AHashMap<DenseId, L> = ahash::AHashMap::new();
    for (v_label, members) in sorted_by_label(seeds) {
        if members.is_empty() {
            continue;
        }
        let v = lookup(source_labels, "source", v_label, "fixed_chains")?;
        let (root, path) = seed_path(target_labels, members, "fixed_chains")?;
        for &t in &path {
            if let Some(other) = owner.get(&t) {
                return Err(Error::Usage(UsageError::FixedChainOverlap {
                    a: format!("{other:?}"),
                    b: format!("{v_label:?}"),
                    shared: format!("{:?}", target_labels.label(t)),
                }));
            }
        }
        for &t in &path {
            owner.insert(t, (*v_label).clone());
        }
        chains.install(v, root, &[path])?;
        chains.mark_fixed(v);
    }
    Ok(())
}

fn apply_restrict_chains<L: Hash + Eq + Clone + Debug>(
    seeds: &ChainSeed<L>,
    source_labels: &LabelTable<InternalLabel<L>>,
    target_labels: &LabelTable<InternalLabel<L>>,
    restrict: &mut RestrictSets,
) -> Result<()> {
    for (v_label, members) in sorted_by_label(seeds) {
        let v = lookup(source_labels, "source", v_label, "restrict_chains")?;
        let mut allowed = AHashSet::with_capacity(members.len());
        for m in members {
            allowed.insert(lookup(target_labels, "target", m, "restrict_chains")?);
        }
        restrict.set(v, allowed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(&str, &str)]) -> Vec<(&'static str, &'static str)> {
        pairs.to_vec()
    }

    #[test]
    fn translates_labels_into_a_dense_graph() {
        let options: Options<&str> = Options::default();
        let built = build(edges(&[("a", "b"), ("b", "c")]), edges(&[("x", "y"), ("y", "z")]), &options).unwrap();
        assert_eq!(built.source.len(), 3);
        assert_eq!(built.target.len(), 3);
    }

    #[test]
    fn unknown_label_in_fixed_chains_is_rejected() {
        let mut options: Options<&str> = Options::default();
        options.fixed_chains.insert("a", vec!["q"]); // "q" never appears in the target edges
        let err = build(edges(&[("a", "b")]), edges(&[("x", "y")]), &options).unwrap_err();
        assert!(matches!(err, Error::Usage(UsageError::UnknownLabel { .. })));
    }

    #[test]
    fn overlapping_fixed_chains_are_rejected() {
        let mut options: Options<&str> = Options::default();
        options.fixed_chains.insert("a", vec!["x"]);
        options.fixed_chains.insert("b", vec!["x"]);
        let err = build(edges(&[("a", "b")]), edges(&[("x", "y")]), &options).unwrap_err();
        assert!(matches!(err, Error::Usage(UsageError::FixedChainOverlap { .. })));
    }

    #[test]
    fn max_fill_is_clamped_to_63() {
        let mut options: Options<&str> = Options::default();
        options.max_fill = 10_000;
        let built = build(edges(&[("a", "b")]), edges(&[("x", "y")]), &options).unwrap();
        assert_eq!(built.config.max_fill, 63);
    }

    #[test]
    fn zero_threads_is_rejected() {
        let mut options: Options<&str> = Options::default();
        options.threads = 0;
        let err = build(edges(&[("a", "b")]), edges(&[("x", "y")]), &options).unwrap_err();
        assert!(matches!(err, Error::Usage(UsageError::OptionOutOfRange { name: "threads", .. })));
    }

    #[test]
    fn suspend_chains_add_a_pinned_auxiliary_chain() {
        let mut options: Options<&str> = Options::default();
        options.suspend_chains.insert("a", vec![vec!["x", "y"]]);
        let built = build(edges(&[("a", "b")]), edges(&[("x", "y")]), &options).unwrap();
        // one extra source vertex (the pin) and one extra target vertex (its anchor)
        assert_eq!(built.source.len(), 3);
        assert_eq!(built.target.len(), 3);
        let pin_source = DenseId(2);
        assert!(built.source_label(pin_source).is_none());
        assert!(!built.chains.chain(pin_source).is_empty());
        assert!(built.chains.chain(pin_source).is_fixed());
    }
}
