use super::guard::OperationKind;
use crate::api::{PostDraft, StoryDraft};
use crate::model::Feed;
use std::collections::VecDeque;

/// A mutation recorded while offline, replayed in order on reconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingMutation {
    CreatePost { temp_id: String, draft: PostDraft },
    CreateStory { temp_id: String, draft: StoryDraft },
    Like { feed: Feed, id: String },
    Comment { post_id: String, content: String },
    Delete { feed: Feed, id: String },
}

impl PendingMutation {
    pub fn kind(&self) -> OperationKind {
        match self {
            PendingMutation::CreatePost { .. } | PendingMutation::CreateStory { .. } => {
                OperationKind::Create
            }
            PendingMutation::Like { .. } => OperationKind::Like,
            PendingMutation::Comment { .. } => OperationKind::Comment,
            PendingMutation::Delete { .. } => OperationKind::Delete,
        }
    }

    /// Feed and entity id the mutation acts on. For creates, the temporary id.
    pub fn target(&self) -> (Feed, &str) {
        match self {
            PendingMutation::CreatePost { temp_id, .. } => (Feed::Posts, temp_id),
            PendingMutation::CreateStory { temp_id, .. } => (Feed::Stories, temp_id),
            PendingMutation::Like { feed, id } | PendingMutation::Delete { feed, id } => {
                (*feed, id)
            }
            PendingMutation::Comment { post_id, .. } => (Feed::Posts, post_id),
        }
    }

    fn targets(&self, feed: Feed, id: &str) -> bool {
        self.target() == (feed, id)
    }

    /// Point a like/comment/delete at `to` if it currently targets `from`.
    /// Creates are never retargeted.
    fn retarget(&mut self, feed: Feed, from: &str, to: &str) -> bool {
        if self.kind() == OperationKind::Create || !self.targets(feed, from) {
            return false;
        }
        match self {
            PendingMutation::Like { id, .. } | PendingMutation::Delete { id, .. } => {
                *id = to.to_string();
            }
            PendingMutation::Comment { post_id, .. } => *post_id = to.to_string(),
            PendingMutation::CreatePost { .. } | PendingMutation::CreateStory { .. } => {}
        }
        true
    }
}

/// FIFO of mutations awaiting connectivity.
#[derive(Debug, Clone, Default)]
pub struct OfflineQueue {
    pending: VecDeque<PendingMutation>,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingMutation> {
        self.pending.iter()
    }

    pub fn push(&mut self, mutation: PendingMutation) {
        self.pending.push_back(mutation);
    }

    pub fn pop_front(&mut self) -> Option<PendingMutation> {
        self.pending.pop_front()
    }

    /// Remove the first mutation `ready` accepts, leaving the rest in order.
    pub fn pop_first(&mut self, ready: impl FnMut(&PendingMutation) -> bool) -> Option<PendingMutation> {
        let index = self.pending.iter().position(ready)?;
        self.pending.remove(index)
    }

    /// Put a mutation back at the head, e.g. when replay is interrupted.
    pub fn push_front(&mut self, mutation: PendingMutation) {
        self.pending.push_front(mutation);
    }

    /// Whether a mutation of `kind` on `(feed, id)` is already waiting.
    pub fn contains(&self, kind: OperationKind, feed: Feed, id: &str) -> bool {
        self.pending
            .iter()
            .any(|m| m.kind() == kind && m.targets(feed, id))
    }

    pub fn has_pending_create(&self, feed: Feed, temp_id: &str) -> bool {
        self.contains(OperationKind::Create, feed, temp_id)
    }

    /// Whether any mutation is waiting on `(feed, id)`.
    pub fn has_targeting(&self, feed: Feed, id: &str) -> bool {
        self.pending.iter().any(|m| m.targets(feed, id))
    }

    /// After a create settles, point mutations queued against its temporary id
    /// at the server id. Returns how many were rewritten.
    pub fn remap(&mut self, feed: Feed, from: &str, to: &str) -> usize {
        self.pending
            .iter_mut()
            .map(|m| m.retarget(feed, from, to))
            .filter(|changed| *changed)
            .count()
    }

    /// Drop every non-create mutation targeting `(feed, id)`. Returns how many went.
    pub fn drop_targeting(&mut self, feed: Feed, id: &str) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|m| m.kind() == OperationKind::Create || !m.targets(feed, id));
        before - self.pending.len()
    }

    /// Withdraw a queued create together with everything queued against it.
    ///
    /// Returns `false` when no create for `temp_id` was waiting.
    pub fn cancel_create(&mut self, feed: Feed, temp_id: &str) -> bool {
        if !self.has_pending_create(feed, temp_id) {
            return false;
        }
        self.pending.retain(|m| !m.targets(feed, temp_id));
        true
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn like(id: &str) -> PendingMutation {
        PendingMutation::Like {
            feed: Feed::Posts,
            id: id.into(),
        }
    }

    fn create(temp_id: &str) -> PendingMutation {
        PendingMutation::CreatePost {
            temp_id: temp_id.into(),
            draft: PostDraft::new("offline post"),
        }
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = OfflineQueue::new();
        queue.push(like("a"));
        queue.push(like("b"));
        assert_eq!(queue.pop_front(), Some(like("a")));
        assert_eq!(queue.pop_front(), Some(like("b")));
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn test_pop_first_skips_unready() {
        let mut queue = OfflineQueue::new();
        queue.push(like("temp-1"));
        queue.push(like("a"));
        queue.push(like("b"));

        let ready = |m: &PendingMutation| m.target().1 != "temp-1";
        assert_eq!(queue.pop_first(ready), Some(like("a")));
        assert_eq!(queue.pop_first(ready), Some(like("b")));
        assert_eq!(queue.pop_first(ready), None);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remap_rewrites_dependents_only() {
        let mut queue = OfflineQueue::new();
        queue.push(create("temp-1"));
        queue.push(like("temp-1"));
        queue.push(PendingMutation::Comment {
            post_id: "temp-1".into(),
            content: "first".into(),
        });
        queue.push(PendingMutation::Like {
            feed: Feed::Stories,
            id: "temp-1".into(),
        });

        assert_eq!(queue.remap(Feed::Posts, "temp-1", "srv-1"), 2);
        let targets: Vec<(Feed, String)> = queue
            .iter()
            .map(|m| (m.target().0, m.target().1.to_string()))
            .collect();
        assert_eq!(
            targets,
            vec![
                (Feed::Posts, "temp-1".to_string()),
                (Feed::Posts, "srv-1".to_string()),
                (Feed::Posts, "srv-1".to_string()),
                (Feed::Stories, "temp-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_drop_targeting_keeps_creates() {
        let mut queue = OfflineQueue::new();
        queue.push(create("temp-1"));
        queue.push(like("temp-1"));
        queue.push(like("other"));

        assert_eq!(queue.drop_targeting(Feed::Posts, "temp-1"), 1);
        assert_eq!(queue.len(), 2);
        assert!(queue.has_pending_create(Feed::Posts, "temp-1"));
    }

    #[test]
    fn test_cancel_create_removes_dependents() {
        let mut queue = OfflineQueue::new();
        queue.push(create("temp-1"));
        queue.push(like("temp-1"));
        queue.push(like("other"));

        assert!(queue.cancel_create(Feed::Posts, "temp-1"));
        assert_eq!(queue.iter().cloned().collect::<Vec<_>>(), vec![like("other")]);
        assert!(!queue.cancel_create(Feed::Posts, "temp-1"));
    }

    #[test]
    fn test_contains_by_kind() {
        let mut queue = OfflineQueue::new();
        queue.push(like("a"));
        assert!(queue.contains(OperationKind::Like, Feed::Posts, "a"));
        assert!(!queue.contains(OperationKind::Delete, Feed::Posts, "a"));
        assert!(!queue.contains(OperationKind::Like, Feed::Stories, "a"));
        assert!(queue.has_targeting(Feed::Posts, "a"));
        assert!(!queue.has_targeting(Feed::Posts, "b"));
    }
}
