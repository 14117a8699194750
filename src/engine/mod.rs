//! The feed cache engine.
//!
//! [`FeedCacheEngine`] owns the posts and stories caches and is the only way
//! to change them. Every intent follows the same shape:
//!
//! 1. Take the state lock, check guards and pagination, apply any optimistic
//!    change, claim a flag through a [`Ticket`](ticket::Ticket). Release the lock.
//! 2. Await the transport.
//! 3. Take the lock again, settle the ticket, apply the authoritative result.
//!
//! The lock is a `std::sync::Mutex` and is never held across an `.await`, so
//! each of steps 1 and 3 is atomic with respect to every other task.

mod dispatch;
mod error;
mod mutations;
mod offline;
mod ticket;


pub use error::{EngineError, ErrorKind, FeedError};
pub use offline::ReplayReport;

use crate::api::FeedApi;
use crate::cache::{
    project_posts, project_stories, CacheInvalidator, ConnectivityMonitor, EntityStore,
    OfflineQueue, OperationGuard, OperationKind, OptimisticReconciler, Outcome, PageRequest,
    PaginationTracker, PendingMutation, PostFilter, SkipReason, StoryFilter,
};
use crate::config::Config;
use crate::model::{Author, Entry, Feed, FeedEntity, Post, Story};
use chrono::{DateTime, Utc};
use dispatch::Cached;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use ticket::{lock, SharedState, Ticket};
use tokio::sync::watch;

// ============================================================================
// Settings
// ============================================================================

/// Construction parameters for [`FeedCacheEngine`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub posts_page_size: u32,
    pub stories_page_size: u32,
    /// `None` keeps a loaded feed fresh until it is invalidated or refreshed.
    pub cache_ttl: Option<chrono::Duration>,
    pub story_cache_capacity: usize,
    /// Author of optimistic entities and subject of delete permission checks.
    pub viewer: Author,
}

impl EngineSettings {
    pub fn new(viewer: Author) -> Self {
        Self {
            posts_page_size: 10,
            stories_page_size: 9,
            cache_ttl: None,
            story_cache_capacity: 32,
            viewer,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            posts_page_size: config.page_size(Feed::Posts),
            stories_page_size: config.page_size(Feed::Stories),
            cache_ttl: config.cache_ttl(),
            story_cache_capacity: config.story_cache_capacity,
            viewer: config.viewer.to_author(),
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Everything the engine caches. Only touched under the engine's lock.
pub(crate) struct EngineState {
    posts: EntityStore<Post>,
    stories: EntityStore<Story>,
    pagination: PaginationTracker,
    guard: OperationGuard,
    story_details: LruCache<String, Story>,
    queue: OfflineQueue,
    error: Option<FeedError>,
    /// Bumped by `reset`; results of requests issued before it are dropped.
    generation: u64,
}

impl EngineState {
    fn new(settings: &EngineSettings) -> Self {
        let capacity = NonZeroUsize::new(settings.story_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            posts: EntityStore::new(),
            stories: EntityStore::new(),
            pagination: PaginationTracker::new(
                settings.posts_page_size,
                settings.stories_page_size,
                CacheInvalidator::new(settings.cache_ttl),
            ),
            guard: OperationGuard::new(),
            story_details: LruCache::new(capacity),
            queue: OfflineQueue::new(),
            error: None,
            generation: 0,
        }
    }

    /// Record `err` in the shared slot and hand it back for returning.
    fn fail(&mut self, err: EngineError) -> EngineError {
        self.error = Some(err.to_feed_error());
        err
    }
}

/// What a landed page did to its feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLoaded {
    pub page: u32,
    /// Entities in the batch.
    pub received: usize,
    /// Entities not already in the feed.
    pub inserted: usize,
    pub has_more: bool,
}

// ============================================================================
// Engine
// ============================================================================

/// Paginated, deduplicated posts and stories caches with optimistic writes.
///
/// Share it between tasks behind an `Arc`; every method takes `&self`.
pub struct FeedCacheEngine<A> {
    api: Arc<A>,
    state: SharedState,
    connectivity: ConnectivityMonitor,
    reconciler: OptimisticReconciler,
    settings: EngineSettings,
    /// Serializes offline-queue replays.
    replay: tokio::sync::Mutex<()>,
}

impl<A: FeedApi> FeedCacheEngine<A> {
    pub fn new(api: Arc<A>, settings: EngineSettings) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(EngineState::new(&settings))),
            connectivity: ConnectivityMonitor::default(),
            reconciler: OptimisticReconciler::new(settings.viewer.clone()),
            settings,
            replay: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        lock(&self.state)
    }

    /// Drop every cached entity, flag, queued mutation and error.
    ///
    /// Requests already in flight settle into nothing.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.posts.clear();
        state.stories.clear();
        state.pagination.reset();
        state.guard.clear();
        state.story_details.clear();
        state.queue.clear();
        state.error = None;
        tracing::info!(generation = state.generation, "Feed cache reset");
    }

    pub fn viewer(&self) -> &Author {
        self.reconciler.viewer()
    }

    // ========================================================================
    // Selectors
    // ========================================================================

    pub fn visible_posts(&self, filter: &PostFilter) -> Vec<Entry<Post>> {
        let state = self.lock();
        project_posts(&state.posts.list(), filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn visible_stories(&self, filter: &StoryFilter) -> Vec<Entry<Story>> {
        let state = self.lock();
        project_stories(&state.stories.list(), filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn has_more(&self, feed: Feed) -> bool {
        self.lock().pagination.state(feed).has_more()
    }

    pub fn page(&self, feed: Feed) -> u32 {
        self.lock().pagination.state(feed).page()
    }

    pub fn is_loading(&self, feed: Feed) -> bool {
        self.lock().pagination.state(feed).is_loading()
    }

    pub fn last_fetched_at(&self, feed: Feed) -> Option<DateTime<Utc>> {
        self.lock().pagination.state(feed).last_fetched_at()
    }

    /// Whether `(kind, key)` has an outstanding request. `key` is an entity id,
    /// or the feed name for [`OperationKind::Create`].
    pub fn is_in_flight(&self, kind: OperationKind, key: &str) -> bool {
        self.lock().guard.is_in_flight(kind, key)
    }

    pub fn error(&self) -> Option<FeedError> {
        self.lock().error.clone()
    }

    pub fn post(&self, id: &str) -> Option<Entry<Post>> {
        self.lock().posts.get(id).cloned()
    }

    /// A story from the feed, or from the detail cache when the feed does not hold it.
    pub fn story(&self, id: &str) -> Option<Entry<Story>> {
        let mut state = self.lock();
        if let Some(entry) = state.stories.get(id) {
            return Some(entry.clone());
        }
        state.story_details.get(id).cloned().map(Entry::Confirmed)
    }

    pub fn pending_mutations(&self) -> Vec<PendingMutation> {
        self.lock().queue.iter().cloned().collect()
    }

    /// Owner or admin. `false` when the post is not cached.
    pub fn can_delete_post(&self, id: &str) -> bool {
        self.lock()
            .posts
            .get(id)
            .is_some_and(|e| self.viewer().can_delete(e.value().author()))
    }

    /// Owner or admin. `false` when the story is not cached.
    pub fn can_delete_story(&self, id: &str) -> bool {
        let state = self.lock();
        let author = state
            .stories
            .get(id)
            .map(|e| e.value().author())
            .or_else(|| state.story_details.peek(id).map(|s| &s.author));
        author.is_some_and(|a| self.viewer().can_delete(a))
    }

    // ========================================================================
    // Connectivity
    // ========================================================================

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Receiver for a connectivity banner. Wakes only on changes.
    pub fn subscribe_connectivity(&self) -> watch::Receiver<bool> {
        self.connectivity.subscribe()
    }

    // ========================================================================
    // Cache control
    // ========================================================================

    pub fn invalidate_posts_cache(&self) {
        self.lock().pagination.invalidate(Feed::Posts);
        tracing::debug!(feed = %Feed::Posts, "Cache invalidated");
    }

    /// Also drops single-story lookups.
    pub fn invalidate_stories_cache(&self) {
        let mut state = self.lock();
        state.pagination.invalidate(Feed::Stories);
        state.story_details.clear();
        tracing::debug!(feed = %Feed::Stories, "Cache invalidated");
    }

    pub fn clear_error(&self) {
        self.lock().error = None;
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn fetch_posts(&self, request: PageRequest) -> Result<Outcome<PageLoaded>, EngineError> {
        self.fetch_feed::<Post>(request).await
    }

    pub async fn fetch_stories(
        &self,
        request: PageRequest,
    ) -> Result<Outcome<PageLoaded>, EngineError> {
        self.fetch_feed::<Story>(request).await
    }

    pub async fn load_more_posts(&self) -> Result<Outcome<PageLoaded>, EngineError> {
        let next = self.page(Feed::Posts) + 1;
        self.fetch_posts(PageRequest::page(next)).await
    }

    pub async fn load_more_stories(&self) -> Result<Outcome<PageLoaded>, EngineError> {
        let next = self.page(Feed::Stories) + 1;
        self.fetch_stories(PageRequest::page(next)).await
    }

    pub async fn refresh_posts(&self) -> Result<Outcome<PageLoaded>, EngineError> {
        self.fetch_posts(PageRequest::refresh()).await
    }

    pub async fn refresh_stories(&self) -> Result<Outcome<PageLoaded>, EngineError> {
        self.fetch_stories(PageRequest::refresh()).await
    }

    async fn fetch_feed<T: Cached>(
        &self,
        request: PageRequest,
    ) -> Result<Outcome<PageLoaded>, EngineError> {
        let feed = T::FEED;

        let (plan, limit, ticket) = {
            let mut state = self.lock();
            let plan = match state.pagination.plan(feed, request, Utc::now()) {
                Ok(plan) => plan,
                Err(reason) => {
                    tracing::debug!(feed = %feed, page = request.page, %reason, "Fetch skipped");
                    return Ok(Outcome::Skipped(reason));
                }
            };
            state.error = None;
            let limit = state.pagination.state(feed).page_size();
            let ticket = Ticket::loading(&self.state, state.generation, feed);
            (plan, limit, ticket)
        };

        tracing::debug!(feed = %feed, page = plan.page, limit, replace = plan.replace, "Fetching page");
        let result = T::list(self.api.as_ref(), plan.page, limit).await;

        let mut state = self.lock();
        if !ticket.settle(&mut state) {
            tracing::debug!(feed = %feed, page = plan.page, "Discarding page requested before reset");
            return Ok(Outcome::Skipped(SkipReason::Superseded));
        }

        match result {
            Ok(page) => {
                let received = page.items.len();
                let store = T::store_mut(&mut state);
                let inserted = page.items.iter().filter(|e| !store.contains(e.id())).count();
                if plan.replace {
                    let discarded = store.replace_confirmed(page.items);
                    tracing::debug!(feed = %feed, discarded, "Replaced confirmed entries");
                } else {
                    store.upsert_many(page.items);
                }
                state
                    .pagination
                    .complete(feed, plan, received, page.has_more, Utc::now());
                let has_more = state.pagination.state(feed).has_more();

                tracing::info!(feed = %feed, page = plan.page, received, has_more, "Feed page loaded");
                Ok(Outcome::Applied(PageLoaded {
                    page: plan.page,
                    received,
                    inserted,
                    has_more,
                }))
            }
            Err(e) => {
                tracing::warn!(feed = %feed, page = plan.page, error = %e, "Feed fetch failed");
                Err(state.fail(e.into()))
            }
        }
    }

    /// Load one story without touching pagination.
    ///
    /// Served from the feed or the detail cache when present; temporary
    /// stories are never requested from the server.
    pub async fn fetch_story_by_id(&self, id: &str) -> Result<Outcome<Story>, EngineError> {
        {
            let mut state = self.lock();
            if let Some(entry) = state.stories.get(id).filter(|e| e.is_temporary()) {
                return Ok(Outcome::Applied(entry.value().clone()));
            }
            if let Some(story) = state.story_details.get(id) {
                tracing::debug!(story_id = %id, "Story served from detail cache");
                return Ok(Outcome::Applied(story.clone()));
            }
        }

        tracing::debug!(story_id = %id, "Fetching story");
        let result = self.api.get_story(id).await;

        let mut state = self.lock();
        match result {
            Ok(story) => {
                if state.stories.contains(&story.id) {
                    state.stories.upsert_many([story.clone()]);
                }
                state.story_details.put(story.id.clone(), story.clone());
                Ok(Outcome::Applied(story))
            }
            Err(e) => {
                tracing::warn!(story_id = %id, error = %e, "Story fetch failed");
                Err(state.fail(e.into()))
            }
        }
    }
}

impl<A> std::fmt::Debug for FeedCacheEngine<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("FeedCacheEngine")
            .field("posts", &state.posts.len())
            .field("stories", &state.stories.len())
            .field("pending", &state.queue.len())
            .field("online", &self.connectivity.is_online())
            .finish()
    }
}
