use super::entities::EntityStore;
use crate::api::{PostDraft, StoryDraft};
use crate::model::{Author, Entry, FeedEntity, Post, Story};
use chrono::{DateTime, Utc};
use uuid::Uuid;

const TEMP_PREFIX: &str = "temp-";

/// Fresh client-side id for an optimistic entity.
pub fn temporary_id() -> String {
    format!("{}{}", TEMP_PREFIX, Uuid::new_v4())
}

pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMP_PREFIX)
}

/// How a settled create was folded back into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// The temporary entry was swapped for the server entity at the same position.
    Replaced,
    /// A refresh had already delivered the server entity; only the temporary entry went.
    AlreadyPresent,
    /// The temporary entry was gone (feed reset meanwhile); nothing changed.
    TemporaryMissing,
}

/// Builds temporary entities for creates and settles them afterwards.
#[derive(Debug, Clone)]
pub struct OptimisticReconciler {
    viewer: Author,
}

impl OptimisticReconciler {
    pub fn new(viewer: Author) -> Self {
        Self { viewer }
    }

    pub fn viewer(&self) -> &Author {
        &self.viewer
    }

    /// Temporary post authored by the viewer.
    ///
    /// Images are referenced by their local file names until the server
    /// returns hosted URLs.
    pub fn synthesize_post(&self, draft: &PostDraft, now: DateTime<Utc>) -> Post {
        Post {
            id: temporary_id(),
            author: self.viewer.clone(),
            content: draft.content.trim().to_string(),
            images: draft.images.iter().map(|i| i.file_name.clone()).collect(),
            category: draft.category.clone(),
            location: draft.location.clone(),
            privacy: draft.privacy.clone(),
            tags: draft.tags.clone(),
            created_at: now,
            likes: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn synthesize_story(&self, draft: &StoryDraft, now: DateTime<Utc>) -> Story {
        Story {
            id: temporary_id(),
            author: self.viewer.clone(),
            title: draft.title.trim().to_string(),
            content: draft.content.trim().to_string(),
            excerpt: draft.excerpt.clone(),
            category: draft.category.clone(),
            cover_image: draft.cover_image.as_ref().map(|i| i.file_name.clone()),
            tags: draft.tags.clone(),
            achievements: draft.achievements.clone(),
            timeline: draft.timeline.clone(),
            likes: Vec::new(),
            created_at: now,
        }
    }

    /// Put a temporary entity at the head of the feed. Returns its id.
    pub fn insert<T: FeedEntity>(&self, store: &mut EntityStore<T>, entity: T) -> String {
        let id = entity.id().to_string();
        store.prepend(Entry::Temporary(entity));
        id
    }

    /// Swap the temporary entry `temp_id` for the server's entity.
    pub fn commit<T: FeedEntity>(
        &self,
        store: &mut EntityStore<T>,
        temp_id: &str,
        confirmed: T,
    ) -> Commit {
        let Some((index, _)) = store.remove(temp_id) else {
            return Commit::TemporaryMissing;
        };
        if store.contains(confirmed.id()) {
            return Commit::AlreadyPresent;
        }
        store.insert_at(index, Entry::Confirmed(confirmed));
        Commit::Replaced
    }

    /// Drop the temporary entry after a failed create. Returns whether it was present.
    pub fn rollback<T: FeedEntity>(&self, store: &mut EntityStore<T>, temp_id: &str) -> bool {
        store.remove(temp_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ImageUpload;
    use crate::model::Role;
    use pretty_assertions::assert_eq;

    fn viewer() -> Author {
        Author {
            id: "me".into(),
            name: "Viewer".into(),
            avatar: None,
            verified: true,
            role: Role::User,
        }
    }

    fn confirmed_post(id: &str) -> Post {
        Post {
            id: id.into(),
            ..OptimisticReconciler::new(viewer()).synthesize_post(&PostDraft::new("x"), Utc::now())
        }
    }

    fn ids(store: &EntityStore<Post>) -> Vec<String> {
        store.list().iter().map(|e| e.id().to_string()).collect()
    }

    #[test]
    fn test_temporary_ids_are_unique_and_prefixed() {
        let a = temporary_id();
        let b = temporary_id();
        assert_ne!(a, b);
        assert!(is_temporary_id(&a));
        assert!(!is_temporary_id("65f0c2"));
    }

    #[test]
    fn test_synthesized_post_belongs_to_viewer() {
        let reconciler = OptimisticReconciler::new(viewer());
        let draft = PostDraft::new("  Rain at last ")
            .with_tag("weather")
            .with_image(ImageUpload::new("field.jpg", "image/jpeg", vec![1]));
        let post = reconciler.synthesize_post(&draft, Utc::now());

        assert!(is_temporary_id(&post.id));
        assert_eq!(post.author.id, "me");
        assert_eq!(post.content, "Rain at last");
        assert_eq!(post.images, vec!["field.jpg".to_string()]);
        assert!(post.likes.is_empty());
    }

    #[test]
    fn test_synthesized_story_carries_lists() {
        let reconciler = OptimisticReconciler::new(viewer());
        let draft = StoryDraft::new("Title", "Body")
            .with_achievement("Yield", "+40%")
            .with_timeline_entry("2021", "Started");
        let story = reconciler.synthesize_story(&draft, Utc::now());

        assert_eq!(story.achievements.len(), 1);
        assert_eq!(story.timeline.len(), 1);
        assert!(story.cover_image.is_none());
    }

    #[test]
    fn test_commit_replaces_at_same_position() {
        let reconciler = OptimisticReconciler::new(viewer());
        let mut store = EntityStore::new();
        store.upsert_many(vec![confirmed_post("a")]);
        let temp = reconciler.synthesize_post(&PostDraft::new("new"), Utc::now());
        let temp_id = reconciler.insert(&mut store, temp);

        let outcome = reconciler.commit(&mut store, &temp_id, confirmed_post("srv-1"));
        assert_eq!(outcome, Commit::Replaced);
        assert_eq!(ids(&store), vec!["srv-1", "a"]);
        assert_eq!(store.temporary_count(), 0);
    }

    #[test]
    fn test_commit_after_refresh_delivered_server_entity() {
        let reconciler = OptimisticReconciler::new(viewer());
        let mut store = EntityStore::new();
        let temp = reconciler.synthesize_post(&PostDraft::new("new"), Utc::now());
        let temp_id = reconciler.insert(&mut store, temp);
        store.replace_confirmed(vec![confirmed_post("srv-1"), confirmed_post("a")]);

        let outcome = reconciler.commit(&mut store, &temp_id, confirmed_post("srv-1"));
        assert_eq!(outcome, Commit::AlreadyPresent);
        assert_eq!(ids(&store), vec!["srv-1", "a"]);
    }

    #[test]
    fn test_commit_without_temporary_is_noop() {
        let reconciler = OptimisticReconciler::new(viewer());
        let mut store: EntityStore<Post> = EntityStore::new();
        let outcome = reconciler.commit(&mut store, "temp-gone", confirmed_post("srv-1"));
        assert_eq!(outcome, Commit::TemporaryMissing);
        assert!(store.is_empty());
    }

    #[test]
    fn test_rollback_removes_temporary() {
        let reconciler = OptimisticReconciler::new(viewer());
        let mut store = EntityStore::new();
        let temp = reconciler.synthesize_post(&PostDraft::new("new"), Utc::now());
        let temp_id = reconciler.insert(&mut store, temp);

        assert!(reconciler.rollback(&mut store, &temp_id));
        assert!(!reconciler.rollback(&mut store, &temp_id));
        assert!(store.is_empty());
    }
}
