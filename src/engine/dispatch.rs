//! Per-entity wiring: which store, which endpoints, which draft type.

use super::EngineState;
use crate::api::{ApiError, DraftError, FeedApi, Page, PostDraft, StoryDraft};
use crate::cache::{EntityStore, OptimisticReconciler, PendingMutation};
use crate::model::{FeedEntity, Post, Story};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub(super) trait Cached: FeedEntity + Send + Sync + 'static {
    type Draft: Clone + Send + Sync;

    fn store(state: &EngineState) -> &EntityStore<Self>;
    fn store_mut(state: &mut EngineState) -> &mut EntityStore<Self>;

    fn validate(draft: &Self::Draft) -> Result<(), DraftError>;
    fn synthesize(reconciler: &OptimisticReconciler, draft: &Self::Draft, now: DateTime<Utc>)
        -> Self;
    fn queued_create(temp_id: String, draft: Self::Draft) -> PendingMutation;

    async fn list<A: FeedApi + ?Sized>(api: &A, page: u32, limit: u32)
        -> Result<Page<Self>, ApiError>;
    async fn create<A: FeedApi + ?Sized>(api: &A, draft: &Self::Draft) -> Result<Self, ApiError>;
    async fn like<A: FeedApi + ?Sized>(api: &A, id: &str) -> Result<Vec<String>, ApiError>;
    async fn delete<A: FeedApi + ?Sized>(api: &A, id: &str) -> Result<(), ApiError>;

    /// Hook run after a settled like replaced the voter list of `id`.
    fn after_likes(_state: &mut EngineState, _id: &str, _likes: &[String]) {}

    /// Hook run after `id` was deleted on the server.
    fn after_remove(_state: &mut EngineState, _id: &str) {}
}

#[async_trait]
impl Cached for Post {
    type Draft = PostDraft;

    fn store(state: &EngineState) -> &EntityStore<Self> {
        &state.posts
    }

    fn store_mut(state: &mut EngineState) -> &mut EntityStore<Self> {
        &mut state.posts
    }

    fn validate(draft: &PostDraft) -> Result<(), DraftError> {
        draft.validate()
    }

    fn synthesize(reconciler: &OptimisticReconciler, draft: &PostDraft, now: DateTime<Utc>) -> Self {
        reconciler.synthesize_post(draft, now)
    }

    fn queued_create(temp_id: String, draft: PostDraft) -> PendingMutation {
        PendingMutation::CreatePost { temp_id, draft }
    }

    async fn list<A: FeedApi + ?Sized>(api: &A, page: u32, limit: u32) -> Result<Page<Self>, ApiError> {
        api.list_posts(page, limit).await
    }

    async fn create<A: FeedApi + ?Sized>(api: &A, draft: &PostDraft) -> Result<Self, ApiError> {
        api.create_post(draft).await
    }

    async fn like<A: FeedApi + ?Sized>(api: &A, id: &str) -> Result<Vec<String>, ApiError> {
        api.like_post(id).await
    }

    async fn delete<A: FeedApi + ?Sized>(api: &A, id: &str) -> Result<(), ApiError> {
        api.delete_post(id).await
    }
}

#[async_trait]
impl Cached for Story {
    type Draft = StoryDraft;

    fn store(state: &EngineState) -> &EntityStore<Self> {
        &state.stories
    }

    fn store_mut(state: &mut EngineState) -> &mut EntityStore<Self> {
        &mut state.stories
    }

    fn validate(draft: &StoryDraft) -> Result<(), DraftError> {
        draft.validate()
    }

    fn synthesize(reconciler: &OptimisticReconciler, draft: &StoryDraft, now: DateTime<Utc>) -> Self {
        reconciler.synthesize_story(draft, now)
    }

    fn queued_create(temp_id: String, draft: StoryDraft) -> PendingMutation {
        PendingMutation::CreateStory { temp_id, draft }
    }

    async fn list<A: FeedApi + ?Sized>(api: &A, page: u32, limit: u32) -> Result<Page<Self>, ApiError> {
        api.list_stories(page, limit).await
    }

    async fn create<A: FeedApi + ?Sized>(api: &A, draft: &StoryDraft) -> Result<Self, ApiError> {
        api.create_story(draft).await
    }

    async fn like<A: FeedApi + ?Sized>(api: &A, id: &str) -> Result<Vec<String>, ApiError> {
        api.like_story(id).await
    }

    async fn delete<A: FeedApi + ?Sized>(api: &A, id: &str) -> Result<(), ApiError> {
        api.delete_story(id).await
    }

    // The detail cache holds its own copies; keep them in step with the feed.

    fn after_likes(state: &mut EngineState, id: &str, likes: &[String]) {
        if let Some(story) = state.story_details.peek_mut(id) {
            story.likes = likes.to_vec();
        }
    }

    fn after_remove(state: &mut EngineState, id: &str) {
        state.story_details.pop(id);
    }
}
