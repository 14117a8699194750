use super::freshness::{CacheInvalidator, Freshness};
use super::SkipReason;
use crate::model::Feed;
use chrono::{DateTime, Utc};

/// A caller's request for one page of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Discard the loaded window and start again from page 1.
    pub refresh: bool,
}

impl PageRequest {
    /// Initial load; served from cache when the feed is already loaded and fresh.
    pub fn first() -> Self {
        Self {
            page: 1,
            refresh: false,
        }
    }

    /// Forced reload of page 1.
    pub fn refresh() -> Self {
        Self {
            page: 1,
            refresh: true,
        }
    }

    pub fn page(page: u32) -> Self {
        Self {
            page,
            refresh: false,
        }
    }
}

/// Cursor state of one feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    page: u32,
    page_size: u32,
    has_more: bool,
    loading: bool,
    freshness: Freshness,
}

impl PaginationState {
    fn new(page_size: u32) -> Self {
        Self {
            page: 0,
            page_size: page_size.max(1),
            has_more: true,
            loading: false,
            freshness: Freshness::default(),
        }
    }

    /// Last page that landed; 0 before the first fetch completes.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn freshness(&self) -> &Freshness {
        &self.freshness
    }

    pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.freshness.last_fetched_at()
    }
}

/// What the engine should fetch for an accepted [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlan {
    pub page: u32,
    /// The landing page replaces the feed's confirmed contents.
    pub replace: bool,
}

/// Per-feed cursor state for the posts and stories feeds.
///
/// A plan marks the feed as loading; exactly one of [`complete`](Self::complete)
/// or [`abort`](Self::abort) must follow it.
#[derive(Debug, Clone)]
pub struct PaginationTracker {
    posts: PaginationState,
    stories: PaginationState,
    invalidator: CacheInvalidator,
}

impl PaginationTracker {
    pub fn new(posts_page_size: u32, stories_page_size: u32, invalidator: CacheInvalidator) -> Self {
        Self {
            posts: PaginationState::new(posts_page_size),
            stories: PaginationState::new(stories_page_size),
            invalidator,
        }
    }

    pub fn state(&self, feed: Feed) -> &PaginationState {
        match feed {
            Feed::Posts => &self.posts,
            Feed::Stories => &self.stories,
        }
    }

    fn state_mut(&mut self, feed: Feed) -> &mut PaginationState {
        match feed {
            Feed::Posts => &mut self.posts,
            Feed::Stories => &mut self.stories,
        }
    }

    /// Decide whether `request` hits the network, and for which page.
    pub fn plan(
        &mut self,
        feed: Feed,
        request: PageRequest,
        now: DateTime<Utc>,
    ) -> Result<PagePlan, SkipReason> {
        let needs_refresh = self
            .invalidator
            .needs_refresh(&self.state(feed).freshness, now);
        let state = self.state_mut(feed);

        if state.loading {
            return Err(SkipReason::AlreadyLoading);
        }

        if request.refresh || request.page <= 1 {
            if !request.refresh && !needs_refresh {
                return Err(SkipReason::AlreadyLoaded);
            }
            if request.refresh {
                state.has_more = true;
            }
            state.loading = true;
            return Ok(PagePlan {
                page: 1,
                replace: true,
            });
        }

        if !state.has_more {
            return Err(SkipReason::Exhausted);
        }

        let expected = state.page + 1;
        if request.page != expected {
            return Err(SkipReason::OutOfSequence {
                expected,
                requested: request.page,
            });
        }

        state.loading = true;
        Ok(PagePlan {
            page: request.page,
            replace: false,
        })
    }

    /// Record a landed page.
    ///
    /// `has_more` stays true only while batches come back full and the
    /// backend (when it says anything) agrees there is more.
    pub fn complete(
        &mut self,
        feed: Feed,
        plan: PagePlan,
        batch_len: usize,
        server_has_more: Option<bool>,
        now: DateTime<Utc>,
    ) {
        let state = self.state_mut(feed);
        state.loading = false;
        state.page = plan.page;
        state.has_more = batch_len >= state.page_size as usize && server_has_more.unwrap_or(true);
        if plan.replace {
            state.freshness.touch(now);
        }
    }

    /// Release the loading flag after a failed fetch. Nothing else changes.
    pub fn abort(&mut self, feed: Feed) {
        self.state_mut(feed).loading = false;
    }

    /// Mark `feed` stale without touching its content or cursor.
    pub fn invalidate(&mut self, feed: Feed) {
        let invalidator = self.invalidator.clone();
        invalidator.invalidate(&mut self.state_mut(feed).freshness);
    }

    /// Back to the state of a freshly constructed tracker.
    pub fn reset(&mut self) {
        self.posts = PaginationState::new(self.posts.page_size);
        self.stories = PaginationState::new(self.stories.page_size);
    }
}
