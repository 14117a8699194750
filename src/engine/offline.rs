use super::{EngineError, EngineState, ErrorKind, FeedCacheEngine};
use crate::api::FeedApi;
use crate::cache::{EntityStore, OperationKind, Outcome, PendingMutation, Transition};
use crate::model::{Entry, Feed, Post, Story};

/// Summary of one offline-queue replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Mutations the server accepted.
    pub applied: usize,
    /// Mutations the server (or local validation) rejected.
    pub failed: usize,
    /// Mutations that turned into no-ops, e.g. the same like already in flight.
    pub skipped: usize,
    /// Mutations still queued: connectivity dropped during replay, or their
    /// target's create is still in flight.
    pub remaining: usize,
}

enum Replayed {
    Applied,
    Skipped,
}

impl<T> From<Outcome<T>> for Replayed {
    fn from(outcome: Outcome<T>) -> Self {
        match outcome {
            Outcome::Applied(_) => Replayed::Applied,
            Outcome::Skipped(_) | Outcome::Queued => Replayed::Skipped,
        }
    }
}

impl<A: FeedApi> FeedCacheEngine<A> {
    /// Feed a platform connectivity signal into the engine.
    ///
    /// Going back online replays the offline queue in order before returning.
    pub async fn set_online(&self, online: bool) -> ReplayReport {
        match self.connectivity.set_online(online) {
            Transition::WentOnline => {
                tracing::info!(pending = self.lock().queue.len(), "Back online");
                self.replay_pending().await
            }
            Transition::WentOffline => {
                tracing::info!("Connectivity lost, queueing mutations");
                ReplayReport {
                    remaining: self.lock().queue.len(),
                    ..ReplayReport::default()
                }
            }
            Transition::Unchanged => ReplayReport {
                remaining: self.lock().queue.len(),
                ..ReplayReport::default()
            },
        }
    }

    /// Drain the offline queue front to back.
    ///
    /// Each mutation's dependents are rewritten as it settles: a confirmed
    /// create remaps later mutations to the server id, a failed one drops them.
    /// Mutations on an entity whose create is still in flight stay queued for
    /// that create to settle. Stops early when connectivity is lost again.
    pub async fn replay_pending(&self) -> ReplayReport {
        let _replaying = self.replay.lock().await;
        let mut report = ReplayReport::default();

        while self.is_online() {
            let next = {
                let mut state = self.lock();
                let EngineState {
                    queue,
                    posts,
                    stories,
                    ..
                } = &mut *state;
                let (posts, stories) = (&*posts, &*stories);
                queue.pop_first(|m| !awaits_create(posts, stories, m))
            };
            let Some(mutation) = next else {
                break;
            };
            tracing::debug!(kind = %mutation.kind(), "Replaying queued mutation");

            let result = self.replay_one(&mutation).await;
            match result {
                Ok(Replayed::Applied) => report.applied += 1,
                Ok(Replayed::Skipped) => report.skipped += 1,
                Err(e) if e.kind() == ErrorKind::Network && !self.is_online() => {
                    // Lost connectivity mid-request; keep it for the next replay.
                    self.lock().queue.push_front(mutation);
                    break;
                }
                Err(e) => {
                    tracing::warn!(kind = %mutation.kind(), error = %e, "Queued mutation failed");
                    report.failed += 1;
                }
            }
        }

        report.remaining = self.lock().queue.len();
        tracing::info!(
            applied = report.applied,
            failed = report.failed,
            skipped = report.skipped,
            remaining = report.remaining,
            "Offline queue replayed"
        );
        report
    }

    async fn replay_one(&self, mutation: &PendingMutation) -> Result<Replayed, EngineError> {
        match mutation {
            PendingMutation::CreatePost { temp_id, draft } => self
                .send_queued_create::<Post>(temp_id, draft)
                .await
                .map(|_| Replayed::Applied),
            PendingMutation::CreateStory { temp_id, draft } => self
                .send_queued_create::<Story>(temp_id, draft)
                .await
                .map(|_| Replayed::Applied),
            PendingMutation::Like {
                feed: Feed::Posts,
                id,
            } => self.like_post(id).await.map(Replayed::from),
            PendingMutation::Like {
                feed: Feed::Stories,
                id,
            } => self.like_story(id).await.map(Replayed::from),
            PendingMutation::Comment { post_id, content } => {
                self.add_comment(post_id, content).await.map(Replayed::from)
            }
            PendingMutation::Delete {
                feed: Feed::Posts,
                id,
            } => self.delete_post(id).await.map(Replayed::from),
            PendingMutation::Delete {
                feed: Feed::Stories,
                id,
            } => self.delete_story(id).await.map(Replayed::from),
        }
    }
}

/// A like, comment or delete aimed at a temporary entity whose create was sent
/// online and has not settled. Its create will remap or drop it.
fn awaits_create(
    posts: &EntityStore<Post>,
    stories: &EntityStore<Story>,
    mutation: &PendingMutation,
) -> bool {
    if mutation.kind() == OperationKind::Create {
        return false;
    }
    let (feed, id) = mutation.target();
    match feed {
        Feed::Posts => posts.get(id).is_some_and(Entry::is_temporary),
        Feed::Stories => stories.get(id).is_some_and(Entry::is_temporary),
    }
}

