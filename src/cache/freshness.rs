use chrono::{DateTime, Duration, Utc};

/// When a feed was last loaded and whether that load has been invalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Freshness {
    last_fetched_at: Option<DateTime<Utc>>,
    stale: bool,
}

impl Freshness {
    pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.last_fetched_at
    }

    pub fn is_marked_stale(&self) -> bool {
        self.stale
    }

    /// Record a successful first-page load.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_fetched_at = Some(now);
        self.stale = false;
    }
}

/// Decides when a loaded feed must be refetched instead of served from cache.
///
/// Invalidation never clears content: the feed keeps rendering what it has
/// while the forced refresh is in flight.
#[derive(Debug, Clone, Default)]
pub struct CacheInvalidator {
    ttl: Option<Duration>,
}

impl CacheInvalidator {
    /// `ttl` of `None` means a loaded feed stays fresh until invalidated.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self { ttl }
    }

    /// Mark the feed stale so the next first-page fetch bypasses the cache.
    pub fn invalidate(&self, freshness: &mut Freshness) {
        freshness.stale = true;
    }

    /// True when a first-page request must hit the network.
    pub fn needs_refresh(&self, freshness: &Freshness, now: DateTime<Utc>) -> bool {
        let Some(fetched_at) = freshness.last_fetched_at else {
            return true;
        };
        if freshness.stale {
            return true;
        }
        match self.ttl {
            Some(ttl) => now.signed_duration_since(fetched_at) > ttl,
            None => false,
        }
    }
}
