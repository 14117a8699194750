//! Backend transport for the posts and stories feeds.
//!
//! The engine talks to the backend only through the [`FeedApi`] trait, so the
//! cache logic can be exercised against an in-process fake while production
//! uses [`HttpFeedApi`]:
//!
//! - [`client`] - reqwest-based REST transport with read retries
//! - [`request`] - typed multipart builders for creates ([`PostDraft`], [`StoryDraft`])
//! - [`response`] - response envelopes

mod client;
mod error;
mod request;
mod response;

pub use client::HttpFeedApi;
pub use error::ApiError;
pub use request::{DraftError, ImageUpload, PostDraft, StoryDraft, MAX_IMAGES};

use crate::model::{Comment, Post, Story};
use async_trait::async_trait;

/// One page of a feed as delivered by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The backend's own `hasMore`, when it reports one.
    pub has_more: Option<bool>,
}

/// Network effects the engine needs from the backend.
#[async_trait]
pub trait FeedApi: Send + Sync {
    async fn list_posts(&self, page: u32, limit: u32) -> Result<Page<Post>, ApiError>;

    async fn list_stories(&self, page: u32, limit: u32) -> Result<Page<Story>, ApiError>;

    async fn get_story(&self, id: &str) -> Result<Story, ApiError>;

    async fn create_post(&self, draft: &PostDraft) -> Result<Post, ApiError>;

    async fn create_story(&self, draft: &StoryDraft) -> Result<Story, ApiError>;

    /// Toggle the caller's like; returns the authoritative voter list.
    async fn like_post(&self, id: &str) -> Result<Vec<String>, ApiError>;

    /// Toggle the caller's like; returns the authoritative voter list.
    async fn like_story(&self, id: &str) -> Result<Vec<String>, ApiError>;

    async fn add_comment(&self, post_id: &str, content: &str) -> Result<Comment, ApiError>;

    async fn delete_post(&self, id: &str) -> Result<(), ApiError>;

    async fn delete_story(&self, id: &str) -> Result<(), ApiError>;
}
