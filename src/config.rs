//! Analysis configuration and cooperative cancellation (C16).
//!
//! Nothing in this module reads a file or parses an environment variable —
//! configuration of this core is in-process only, a plain `Default`-able
//! struct a caller builds and threads through. File/CLI configuration is
//! the collaborator layer's job (see the purpose/scope notes).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cooperative cancellation flag, checked by the solver at worklist-pop
/// boundaries. Cloning shares the same underlying flag, so a caller can
/// hold one end and cancel an in-flight analysis from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run configuration shared by every entry point in this crate.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    /// Optional wall-clock budget; exceeding it stops the solver and
    /// returns a partial result flagged `complete = false`.
    pub budget: Option<Duration>,
    pub cancellation: CancellationToken,
    /// CHA closure policy for virtual/interface calls: `true` resolves
    /// only direct subclasses/subinterfaces/implementors (the reference
    /// behavior); `false` closes over the full subtype relation
    /// transitively. See the open question this decision resolves.
    pub direct_subtypes_only: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            budget: None,
            cancellation: CancellationToken::new(),
            direct_subtypes_only: true,
        }
    }
}

/// Tracks elapsed time against `AnalysisConfig::budget` for a single solver
/// run; `expired()` is checked alongside the cancellation token.
pub struct Budget {
    deadline: Option<Instant>,
}

impl Budget {
    pub fn start(config: &AnalysisConfig) -> Self {
        Budget {
            deadline: config.budget.map(|d| Instant::now() + d),
        }
    }

    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
