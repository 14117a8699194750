use std::collections::{HashMap, HashSet};
use std::fmt;

/// Mutation kinds tracked by the [`OperationGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Like,
    Comment,
    Delete,
    /// Keyed by feed name rather than entity id.
    Create,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Like => "like",
            OperationKind::Comment => "comment",
            OperationKind::Delete => "delete",
            OperationKind::Create => "create",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-flight flags: at most one outstanding request per (kind, key).
#[derive(Debug, Clone, Default)]
pub struct OperationGuard {
    in_flight: HashMap<OperationKind, HashSet<String>>,
}

impl OperationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `(kind, key)`. Returns `false` if it is already claimed.
    pub fn begin(&mut self, kind: OperationKind, key: &str) -> bool {
        self.in_flight
            .entry(kind)
            .or_default()
            .insert(key.to_string())
    }

    /// Release `(kind, key)`. Releasing an unclaimed pair is a no-op.
    pub fn end(&mut self, kind: OperationKind, key: &str) {
        if let Some(keys) = self.in_flight.get_mut(&kind) {
            keys.remove(key);
        }
    }

    pub fn is_in_flight(&self, kind: OperationKind, key: &str) -> bool {
        self.in_flight
            .get(&kind)
            .is_some_and(|keys| keys.contains(key))
    }

    /// Number of claimed pairs across all kinds.
    pub fn len(&self) -> usize {
        self.in_flight.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.in_flight.clear();
    }
}
