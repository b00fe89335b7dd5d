//! Error taxonomy (C14). Matches the design's propagation policy: internal
//! invariants and configuration problems are the only things that become a
//! structured `Result` error; everything dataflow-level (division by zero,
//! unresolved dispatch) is folded into the lattice instead. Follows the
//! IR's own `ParseError` shape: a `Display`-able newtype plus a manual
//! `std::error::Error` impl, no panics on well-formed input.

use derive_more::Display;

/// Missing entry method, unknown analysis id, or any other problem the
/// caller handed us before an analysis even started.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub struct ConfigError(pub String);
impl std::error::Error for ConfigError {}

/// A documented invariant was violated by the IR or by the core itself:
/// an unknown `CallKind` tag, a `dispatch` contract violation, a request
/// to add a self-loop PFG edge. Always a bug, never a property of valid
/// input data — fail fast and discard the result.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub struct InternalError(pub String);
impl std::error::Error for InternalError {}

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum AnalysisError {
    #[display(fmt = "{_0}")]
    Config(ConfigError),
    #[display(fmt = "{_0}")]
    Internal(InternalError),
}
impl std::error::Error for AnalysisError {}

impl From<ConfigError> for AnalysisError {
    fn from(e: ConfigError) -> Self {
        AnalysisError::Config(e)
    }
}

impl From<InternalError> for AnalysisError {
    fn from(e: InternalError) -> Self {
        AnalysisError::Internal(e)
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
