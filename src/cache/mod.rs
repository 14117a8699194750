//! Client-side cache building blocks composed by the engine.
//!
//! - [`entities`] - deduplicated per-feed entity storage
//! - [`pagination`] - page cursors and load planning
//! - [`freshness`] - staleness and TTL decisions
//! - [`guard`] - per-entity in-flight flags
//! - [`reconcile`] - optimistic create insertion and settlement
//! - [`connectivity`] - online/offline flag with change notification
//! - [`queue`] - mutations recorded while offline
//! - [`filter`] - pure read projections

pub mod connectivity;
pub mod entities;
pub mod filter;
pub mod freshness;
pub mod guard;
pub mod pagination;
pub mod queue;
pub mod reconcile;

pub use connectivity::{ConnectivityMonitor, Transition};
pub use entities::EntityStore;
pub use filter::{project_posts, project_stories, PostFilter, StoryFilter};
pub use freshness::{CacheInvalidator, Freshness};
pub use guard::{OperationGuard, OperationKind};
pub use pagination::{PagePlan, PageRequest, PaginationState, PaginationTracker};
pub use queue::{OfflineQueue, PendingMutation};
pub use reconcile::{is_temporary_id, temporary_id, Commit, OptimisticReconciler};

use std::fmt;

/// Result of an engine intent that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The request ran and its result was applied.
    Applied(T),
    /// Nothing was sent.
    Skipped(SkipReason),
    /// Recorded while offline; replayed on reconnect.
    Queued,
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Applied(value) => Outcome::Applied(f(value)),
            Outcome::Skipped(reason) => Outcome::Skipped(reason),
            Outcome::Queued => Outcome::Queued,
        }
    }
}

/// Why an intent was a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The feed already has a page request in flight.
    AlreadyLoading,
    /// Page 1 is cached and fresh.
    AlreadyLoaded,
    /// The feed has no further pages.
    Exhausted,
    /// Load-more for a page that does not follow the last one loaded.
    OutOfSequence { expected: u32, requested: u32 },
    /// The same (kind, id) already has an outstanding request.
    AlreadyInFlight,
    /// The engine was reset while the request was in flight; its result was dropped.
    Superseded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyLoading => f.write_str("already loading"),
            SkipReason::AlreadyLoaded => f.write_str("already loaded"),
            SkipReason::Exhausted => f.write_str("no more pages"),
            SkipReason::OutOfSequence {
                expected,
                requested,
            } => write!(f, "page {requested} requested, expected {expected}"),
            SkipReason::AlreadyInFlight => f.write_str("already in flight"),
            SkipReason::Superseded => f.write_str("superseded by reset"),
        }
    }
}
