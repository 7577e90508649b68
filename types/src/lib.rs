pub mod errors;
pub mod labels;
pub mod options;

pub use errors::{Error, LogicFailure, Result, UsageError};
pub use labels::{DenseId, LabelTable};
pub use options::{ChainSeed, Completion, Options, SuspendChains};
