//! Reconciliation against the remote source and periodic scheduling.
//!
//! # Responsibility
//! - Merge a fetched batch into the local quote list (`reconcile`).
//! - Drive `QuoteStore::sync` on a cancellable timer (`SyncScheduler`).
//!
//! # Invariants
//! - Server wins on conflict; the replaced local version is kept in the
//!   conflict record for manual override.
//! - A failed fetch never mutates local state.

use crate::model::conflict::ConflictRecord;

pub mod merge;
pub mod scheduler;

pub use merge::{reconcile, MergeOutcome};
pub use scheduler::SyncScheduler;

/// How one sync cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Batch applied without conflicts.
    Synced,
    /// Batch applied; at least one local quote was overwritten.
    Conflicted,
    /// Fetch failed; nothing was applied.
    RemoteUnavailable(String),
}

/// Result of one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Quotes appended or overwritten.
    pub applied: usize,
    /// Conflicts detected in this cycle.
    pub conflicts: Vec<ConflictRecord>,
    pub outcome: SyncOutcome,
    /// Clock time when the cycle finished.
    pub finished_at_ms: i64,
}

impl SyncReport {
    pub fn is_remote_unavailable(&self) -> bool {
        matches!(self.outcome, SyncOutcome::RemoteUnavailable(_))
    }
}
