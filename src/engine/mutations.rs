use super::dispatch::Cached;
use super::ticket::Ticket;
use super::{EngineError, EngineState, FeedCacheEngine};
use crate::api::{ApiError, DraftError, FeedApi, PostDraft, StoryDraft};
use crate::cache::{is_temporary_id, OperationKind, Outcome, PendingMutation, SkipReason};
use crate::model::{Comment, Post, Story};
use crate::util::strip_control_chars;
use chrono::Utc;

impl<A: FeedApi> FeedCacheEngine<A> {
    // ========================================================================
    // Creates
    // ========================================================================

    /// Publish a post. A temporary post is at the head of the feed before this
    /// first yields; it is replaced by the server's post or removed on failure.
    pub async fn create_post(&self, draft: PostDraft) -> Result<Outcome<Post>, EngineError> {
        self.create::<Post>(draft).await
    }

    pub async fn create_story(&self, draft: StoryDraft) -> Result<Outcome<Story>, EngineError> {
        self.create::<Story>(draft).await
    }

    async fn create<T: Cached>(&self, draft: T::Draft) -> Result<Outcome<T>, EngineError> {
        let feed = T::FEED;

        let (temp_id, ticket) = {
            let mut state = self.lock();
            if let Err(e) = T::validate(&draft) {
                tracing::debug!(feed = %feed, error = %e, "Draft rejected");
                return Err(state.fail(e.into()));
            }

            if !self.is_online() {
                let entity = T::synthesize(&self.reconciler, &draft, Utc::now());
                let temp_id = self.reconciler.insert(T::store_mut(&mut state), entity);
                tracing::info!(feed = %feed, temp_id = %temp_id, "Offline, create queued");
                state.queue.push(T::queued_create(temp_id, draft));
                return Ok(Outcome::Queued);
            }

            if !state.guard.begin(OperationKind::Create, feed.as_str()) {
                tracing::debug!(feed = %feed, "Create already in flight, skipping");
                return Ok(Outcome::Skipped(SkipReason::AlreadyInFlight));
            }
            let entity = T::synthesize(&self.reconciler, &draft, Utc::now());
            let temp_id = self.reconciler.insert(T::store_mut(&mut state), entity);
            let ticket = Ticket::create(&self.state, state.generation, feed, &temp_id);
            (temp_id, ticket)
        };

        tracing::debug!(feed = %feed, temp_id = %temp_id, "Sending create");
        let result = T::create(self.api.as_ref(), &draft).await;

        let (entity, waiting) = {
            let mut state = self.lock();
            if !ticket.settle(&mut state) {
                tracing::debug!(feed = %feed, temp_id = %temp_id, "Discarding create settled after reset");
                return Ok(Outcome::Skipped(SkipReason::Superseded));
            }
            let entity = self.finish_create::<T>(&mut state, &temp_id, result)?;
            let waiting = state.queue.has_targeting(feed, entity.id());
            (entity, waiting)
        };

        // Mutations queued offline while this create was in flight were held
        // back by replay; they now point at the server id.
        if waiting && self.is_online() {
            self.replay_pending().await;
        }
        Ok(Outcome::Applied(entity))
    }

    /// Send a create recorded while offline. Replays run one at a time, so the
    /// feed's create flag is not taken.
    pub(super) async fn send_queued_create<T: Cached>(
        &self,
        temp_id: &str,
        draft: &T::Draft,
    ) -> Result<T, EngineError> {
        let result = T::create(self.api.as_ref(), draft).await;
        let mut state = self.lock();
        self.finish_create::<T>(&mut state, temp_id, result)
    }

    /// Fold a settled create back into the store and the offline queue.
    ///
    /// The returned entity is authoritative. The feed is only marked stale;
    /// nothing is refetched here.
    fn finish_create<T: Cached>(
        &self,
        state: &mut EngineState,
        temp_id: &str,
        result: Result<T, ApiError>,
    ) -> Result<T, EngineError> {
        let feed = T::FEED;
        match result {
            Ok(entity) => {
                let commit = self
                    .reconciler
                    .commit(T::store_mut(state), temp_id, entity.clone());
                let remapped = state.queue.remap(feed, temp_id, entity.id());
                state.pagination.invalidate(feed);
                tracing::info!(
                    feed = %feed,
                    temp_id = %temp_id,
                    id = %entity.id(),
                    commit = ?commit,
                    remapped,
                    "Create confirmed"
                );
                Ok(entity)
            }
            Err(e) => {
                self.reconciler.rollback(T::store_mut(state), temp_id);
                let dropped = state.queue.drop_targeting(feed, temp_id);
                tracing::warn!(
                    feed = %feed,
                    temp_id = %temp_id,
                    dropped,
                    error = %e,
                    "Create failed, rolled back"
                );
                Err(state.fail(e.into()))
            }
        }
    }

    // ========================================================================
    // Likes
    // ========================================================================

    /// Toggle the viewer's like. Returns the server's voter list.
    pub async fn like_post(&self, id: &str) -> Result<Outcome<Vec<String>>, EngineError> {
        self.like::<Post>(id).await
    }

    pub async fn like_story(&self, id: &str) -> Result<Outcome<Vec<String>>, EngineError> {
        self.like::<Story>(id).await
    }

    async fn like<T: Cached>(&self, id: &str) -> Result<Outcome<Vec<String>>, EngineError> {
        let feed = T::FEED;

        let ticket = {
            let mut state = self.lock();
            if !self.is_online() {
                return Ok(enqueue(
                    &mut state,
                    PendingMutation::Like {
                        feed,
                        id: id.to_string(),
                    },
                ));
            }
            if let Some(err) = unconfirmed::<T>(&state, id) {
                return Err(state.fail(err));
            }
            match self.claim(&mut state, OperationKind::Like, id) {
                Some(ticket) => ticket,
                None => return Ok(Outcome::Skipped(SkipReason::AlreadyInFlight)),
            }
        };

        let result = T::like(self.api.as_ref(), id).await;

        let mut state = self.lock();
        ticket.settle(&mut state);
        match result {
            Ok(likes) => {
                if let Some(entry) = T::store_mut(&mut state).get_mut(id) {
                    entry.value_mut().set_likes(likes.clone());
                }
                T::after_likes(&mut state, id, &likes);
                tracing::debug!(feed = %feed, id = %id, likes = likes.len(), "Like settled");
                Ok(Outcome::Applied(likes))
            }
            Err(e) => {
                tracing::warn!(feed = %feed, id = %id, error = %e, "Like failed");
                Err(state.fail(e.into()))
            }
        }
    }

    // ========================================================================
    // Comments
    // ========================================================================

    pub async fn add_comment(
        &self,
        post_id: &str,
        content: &str,
    ) -> Result<Outcome<Comment>, EngineError> {
        let content = strip_control_chars(content.trim()).into_owned();

        let ticket = {
            let mut state = self.lock();
            if content.is_empty() {
                return Err(state.fail(DraftError::EmptyContent.into()));
            }
            if !self.is_online() {
                return Ok(enqueue(
                    &mut state,
                    PendingMutation::Comment {
                        post_id: post_id.to_string(),
                        content,
                    },
                ));
            }
            if let Some(err) = unconfirmed::<Post>(&state, post_id) {
                return Err(state.fail(err));
            }
            match self.claim(&mut state, OperationKind::Comment, post_id) {
                Some(ticket) => ticket,
                None => return Ok(Outcome::Skipped(SkipReason::AlreadyInFlight)),
            }
        };

        let result = self.api.add_comment(post_id, &content).await;

        let mut state = self.lock();
        ticket.settle(&mut state);
        match result {
            Ok(comment) => {
                if let Some(entry) = state.posts.get_mut(post_id) {
                    entry.value_mut().push_comment(comment.clone());
                }
                tracing::debug!(post_id = %post_id, comment_id = %comment.id, "Comment added");
                Ok(Outcome::Applied(comment))
            }
            Err(e) => {
                tracing::warn!(post_id = %post_id, error = %e, "Comment failed");
                Err(state.fail(e.into()))
            }
        }
    }

    // ========================================================================
    // Deletes
    // ========================================================================

    /// Delete a post. The post stays in the feed until the server confirms.
    pub async fn delete_post(&self, id: &str) -> Result<Outcome<()>, EngineError> {
        self.delete::<Post>(id).await
    }

    pub async fn delete_story(&self, id: &str) -> Result<Outcome<()>, EngineError> {
        self.delete::<Story>(id).await
    }

    async fn delete<T: Cached>(&self, id: &str) -> Result<Outcome<()>, EngineError> {
        let feed = T::FEED;

        let ticket = {
            let mut state = self.lock();

            // Never sent: withdraw the create and everything queued behind it.
            if state.queue.cancel_create(feed, id) {
                T::store_mut(&mut state).remove(id);
                tracing::info!(feed = %feed, temp_id = %id, "Queued create withdrawn");
                return Ok(Outcome::Applied(()));
            }

            if !self.is_online() {
                return Ok(enqueue(
                    &mut state,
                    PendingMutation::Delete {
                        feed,
                        id: id.to_string(),
                    },
                ));
            }
            if let Some(err) = unconfirmed::<T>(&state, id) {
                return Err(state.fail(err));
            }
            match self.claim(&mut state, OperationKind::Delete, id) {
                Some(ticket) => ticket,
                None => return Ok(Outcome::Skipped(SkipReason::AlreadyInFlight)),
            }
        };

        let result = T::delete(self.api.as_ref(), id).await;

        let mut state = self.lock();
        ticket.settle(&mut state);
        match result {
            Ok(()) => {
                T::store_mut(&mut state).remove(id);
                T::after_remove(&mut state, id);
                state.queue.drop_targeting(feed, id);
                tracing::info!(feed = %feed, id = %id, "Deleted");
                Ok(Outcome::Applied(()))
            }
            Err(e) => {
                tracing::warn!(feed = %feed, id = %id, error = %e, "Delete failed, entry kept");
                Err(state.fail(e.into()))
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Claim `(kind, key)` for one request, or `None` if it is already in flight.
    fn claim(&self, state: &mut EngineState, kind: OperationKind, key: &str) -> Option<Ticket> {
        if !state.guard.begin(kind, key) {
            tracing::debug!(kind = %kind, key = %key, "Already in flight, skipping");
            return None;
        }
        Some(Ticket::operation(&self.state, state.generation, kind, key))
    }
}

/// Like/comment/delete act on confirmed entities only.
fn unconfirmed<T: Cached>(state: &EngineState, id: &str) -> Option<EngineError> {
    let temporary = is_temporary_id(id) || T::store(state).get(id).is_some_and(|e| e.is_temporary());
    temporary.then(|| EngineError::Unconfirmed {
        feed: T::FEED,
        id: id.to_string(),
    })
}

/// Record a mutation for replay. A like or delete already waiting for the same
/// entity is not queued twice.
fn enqueue<T>(state: &mut EngineState, mutation: PendingMutation) -> Outcome<T> {
    let kind = mutation.kind();
    let (feed, id) = mutation.target();
    if kind != OperationKind::Comment && state.queue.contains(kind, feed, id) {
        tracing::debug!(kind = %kind, feed = %feed, id = %id, "Already queued, skipping");
        return Outcome::Skipped(SkipReason::AlreadyInFlight);
    }
    tracing::info!(kind = %kind, feed = %feed, id = %id, "Offline, mutation queued");
    state.queue.push(mutation);
    Outcome::Queued
}
