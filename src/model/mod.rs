//! Client-side shapes of the records the engine caches.
//!
//! - [`Post`], [`Story`] and [`Comment`] mirror the backend's JSON (camelCase,
//!   `_id` accepted as an alias of `id`).
//! - [`Entry`] tags a cached record as temporary (optimistic) or confirmed.
//! - [`FeedEntity`] is the surface the generic cache components work against.

mod entry;
mod types;

pub use entry::Entry;
pub use types::{
    Achievement, Author, Comment, Feed, FeedEntity, Post, Role, Story, TimelineEntry,
};
