use super::EngineState;
use crate::cache::OperationKind;
use crate::model::Feed;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub(super) type SharedState = Arc<Mutex<EngineState>>;

/// Lock engine state. A panic while the lock was held leaves the state as the
/// panicking task left it; the engine keeps going rather than poisoning every caller.
pub(super) fn lock(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
enum Claim {
    Operation(OperationKind, String),
    Loading(Feed),
    /// The feed's create flag plus the temporary entry shown for it.
    Create { feed: Feed, temp_id: String },
}

impl Claim {
    /// The request settled; its result is applied by the caller.
    fn release(self, state: &mut EngineState) {
        match self {
            Claim::Operation(kind, key) => state.guard.end(kind, &key),
            Claim::Loading(feed) => state.pagination.abort(feed),
            Claim::Create { feed, .. } => state.guard.end(OperationKind::Create, feed.as_str()),
        }
    }

    /// The request will never settle. A create takes its temporary entry
    /// and anything queued against it along.
    fn abandon(self, state: &mut EngineState) {
        if let Claim::Create { feed, temp_id } = &self {
            let removed = match feed {
                Feed::Posts => state.posts.remove(temp_id).is_some(),
                Feed::Stories => state.stories.remove(temp_id).is_some(),
            };
            let dropped = state.queue.drop_targeting(*feed, temp_id);
            tracing::debug!(feed = %feed, temp_id = %temp_id, removed, dropped, "Abandoned create rolled back");
        }
        self.release(state);
    }
}

/// Holds an in-flight or loading flag for the lifetime of one request.
///
/// The normal path is [`settle`](Self::settle), called while the caller holds
/// the state lock. If the request future is dropped instead, `Drop` takes the
/// lock itself and releases the flag, so a cancelled task never leaves a stuck
/// flag or an orphaned temporary entry. Claims taken before a
/// [`reset`](super::FeedCacheEngine::reset) are not released afterwards; the
/// reset already cleared them and the same key may have been claimed again since.
pub(super) struct Ticket {
    state: SharedState,
    generation: u64,
    claim: Option<Claim>,
}

impl Ticket {
    pub(super) fn operation(
        state: &SharedState,
        generation: u64,
        kind: OperationKind,
        key: &str,
    ) -> Self {
        Self {
            state: Arc::clone(state),
            generation,
            claim: Some(Claim::Operation(kind, key.to_string())),
        }
    }

    pub(super) fn create(state: &SharedState, generation: u64, feed: Feed, temp_id: &str) -> Self {
        Self {
            state: Arc::clone(state),
            generation,
            claim: Some(Claim::Create {
                feed,
                temp_id: temp_id.to_string(),
            }),
        }
    }

    pub(super) fn loading(state: &SharedState, generation: u64, feed: Feed) -> Self {
        Self {
            state: Arc::clone(state),
            generation,
            claim: Some(Claim::Loading(feed)),
        }
    }

    /// Release the claim inside the caller's critical section.
    ///
    /// Returns `false` if the engine was reset while the request was in flight.
    pub(super) fn settle(mut self, state: &mut EngineState) -> bool {
        let current = state.generation == self.generation;
        if let Some(claim) = self.claim.take() {
            if current {
                claim.release(state);
            }
        }
        current
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let Some(claim) = self.claim.take() else {
            return;
        };
        let mut state = lock(&self.state);
        if state.generation == self.generation {
            tracing::debug!(claim = ?claim, "Releasing claim of abandoned request");
            claim.abandon(&mut state);
        }
    }
}

impl std::fmt::Debug for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ticket")
            .field("generation", &self.generation)
            .field("claim", &self.claim)
            .finish()
    }
}
