use crate::model::{Entry, FeedEntity};
use std::collections::HashSet;

/// Ordered, id-deduplicated collection of one feed's entities.
///
/// Order is insertion/fetch order: fetched pages append at the tail,
/// optimistic creates are prepended at the head. The store never sorts;
/// recency ordering is a projection concern (see [`crate::cache::filter`]).
#[derive(Debug, Clone)]
pub struct EntityStore<T> {
    entries: Vec<Entry<T>>,
    ids: HashSet<String>,
}

impl<T> Default for EntityStore<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            ids: HashSet::new(),
        }
    }
}

impl<T: FeedEntity> EntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        if !self.ids.contains(id) {
            return None;
        }
        self.entries.iter().position(|e| e.id() == id)
    }

    pub fn get(&self, id: &str) -> Option<&Entry<T>> {
        self.position(id).map(|i| &self.entries[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Entry<T>> {
        let index = self.position(id)?;
        Some(&mut self.entries[index])
    }

    /// Insert confirmed entities, replacing existing ids in place.
    ///
    /// New ids are appended in the order given. Returns how many were new.
    pub fn upsert_many(&mut self, entities: impl IntoIterator<Item = T>) -> usize {
        let mut inserted = 0;
        for entity in entities {
            match self.position(entity.id()) {
                Some(i) => self.entries[i] = Entry::Confirmed(entity),
                None => {
                    self.ids.insert(entity.id().to_string());
                    self.entries.push(Entry::Confirmed(entity));
                    inserted += 1;
                }
            }
        }
        inserted
    }

    /// Insert an entry at the head, displacing any entry with the same id.
    pub fn prepend(&mut self, entry: Entry<T>) {
        self.insert_at(0, entry);
    }

    /// Insert an entry at `index` (clamped), displacing any entry with the same id.
    pub fn insert_at(&mut self, index: usize, entry: Entry<T>) {
        self.remove(entry.id());
        let index = index.min(self.entries.len());
        self.ids.insert(entry.id().to_string());
        self.entries.insert(index, entry);
    }

    /// Remove an entity. No-op returning `None` when absent.
    pub fn remove(&mut self, id: &str) -> Option<(usize, Entry<T>)> {
        let index = self.position(id)?;
        self.ids.remove(id);
        Some((index, self.entries.remove(index)))
    }

    /// Replace every confirmed entity with `batch`, keeping temporary ones.
    ///
    /// Temporary entries stay at the head in their current order so an
    /// optimistic create survives a refresh that lands before it settles.
    /// Returns how many confirmed entities were discarded.
    pub fn replace_confirmed(&mut self, batch: impl IntoIterator<Item = T>) -> usize {
        let before = self.entries.len();
        self.entries.retain(Entry::is_temporary);
        let discarded = before - self.entries.len();
        self.ids = self.entries.iter().map(|e| e.id().to_string()).collect();
        self.upsert_many(batch);
        discarded
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.ids.clear();
    }

    /// The listing view. Never yields two entries with the same id.
    pub fn list(&self) -> Vec<&Entry<T>> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        self.entries
            .iter()
            .filter(|e| seen.insert(e.id()))
            .collect()
    }

    pub fn temporary_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_temporary()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, Post, Role};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn post(id: &str) -> Post {
        Post {
            id: id.to_string(),
            author: Author {
                id: "u1".into(),
                name: "Asha".into(),
                avatar: None,
                verified: false,
                role: Role::User,
            },
            content: format!("content {id}"),
            images: vec![],
            category: None,
            location: None,
            privacy: None,
            tags: vec![],
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            likes: vec![],
            comments: vec![],
        }
    }

    fn ids(store: &EntityStore<Post>) -> Vec<String> {
        store.list().iter().map(|e| e.id().to_string()).collect()
    }

    #[test]
    fn test_upsert_appends_in_fetch_order() {
        let mut store = EntityStore::new();
        assert_eq!(store.upsert_many(vec![post("a"), post("b")]), 2);
        assert_eq!(store.upsert_many(vec![post("c")]), 1);
        assert_eq!(ids(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_overlapping_pages_do_not_duplicate() {
        let mut store = EntityStore::new();
        store.upsert_many(vec![post("a"), post("b"), post("c")]);
        let inserted = store.upsert_many(vec![post("c"), post("d")]);
        assert_eq!(inserted, 1);
        assert_eq!(ids(&store), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut store = EntityStore::new();
        store.upsert_many(vec![post("a"), post("b")]);
        let mut updated = post("a");
        updated.content = "edited".into();
        store.upsert_many(vec![updated]);

        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(store.get("a").unwrap().value().content, "edited");
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut store: EntityStore<Post> = EntityStore::new();
        assert!(store.remove("missing").is_none());
        store.upsert_many(vec![post("a")]);
        assert_eq!(store.remove("a").map(|(i, _)| i), Some(0));
        assert!(store.is_empty());
        assert!(!store.contains("a"));
    }

    #[test]
    fn test_prepend_puts_entry_at_head() {
        let mut store = EntityStore::new();
        store.upsert_many(vec![post("a")]);
        store.prepend(Entry::Temporary(post("temp-1")));
        assert_eq!(ids(&store), vec!["temp-1", "a"]);
        assert_eq!(store.temporary_count(), 1);
    }

    #[test]
    fn test_replace_confirmed_keeps_temporaries() {
        let mut store = EntityStore::new();
        store.upsert_many(vec![post("a"), post("b")]);
        store.prepend(Entry::Temporary(post("temp-1")));

        let discarded = store.replace_confirmed(vec![post("c"), post("a")]);
        assert_eq!(discarded, 2);
        assert_eq!(ids(&store), vec!["temp-1", "c", "a"]);
        assert!(!store.contains("b"));
    }

    proptest! {
        #[test]
        fn prop_listing_never_has_duplicate_ids(
            pages in prop::collection::vec(prop::collection::vec(0u8..20, 0..12), 1..8),
            refresh_at in prop::option::of(0usize..8),
        ) {
            let mut store = EntityStore::new();
            for (i, page) in pages.iter().enumerate() {
                let batch: Vec<Post> = page.iter().map(|n| post(&format!("p{n}"))).collect();
                if Some(i) == refresh_at {
                    store.replace_confirmed(batch);
                } else {
                    store.upsert_many(batch);
                }
            }

            let listed = ids(&store);
            let unique: HashSet<&String> = listed.iter().collect();
            prop_assert_eq!(unique.len(), listed.len());
            prop_assert_eq!(listed.len(), store.len());
        }
    }
}
