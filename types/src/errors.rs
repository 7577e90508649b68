use thiserror::Error;

/// Pre-run validation failures. Always raised eagerly, before any heuristic
/// work starts — never surfaced mid-search.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum UsageError {
    #[error("unrecognized option `{0}`")]
    UnknownOption(String),

    #[error("option `{name}` out of range: {reason}")]
    OptionOutOfRange { name: &'static str, reason: String },

    #[error("{graph} graph label `{label}` referenced by {context} is not an endpoint of any edge in that graph")]
    UnknownLabel {
        graph: &'static str,
        label: String,
        context: &'static str,
    },

    #[error("fixed chains for `{a}` and `{b}` share target vertex `{shared}`")]
    FixedChainOverlap { a: String, b: String, shared: String },
}

/// Internal invariant breach. Should never happen; when it does, the call
/// is aborted rather than silently returning a corrupt mapping.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum LogicFailure {
    #[error("chain for source vertex {0} became disconnected")]
    ChainDisconnected(u32),

    #[error("pairing heap arena index {0} out of bounds")]
    HeapArenaOutOfBounds(u32),

    #[error("attempted to tear or prune a fixed/pinned chain for source vertex {0}")]
    MutatedImmutableChain(u32),
}

#[derive(Error, Debug, Eq, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Logic(#[from] LogicFailure),
}

pub type Result<T> = std::result::Result<T, Error>;
