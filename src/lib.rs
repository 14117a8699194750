//! Client-side feed cache for the Farm Connect posts and stories feeds.
//!
//! The [`FeedCacheEngine`] keeps both feeds paginated and deduplicated,
//! shows creates before the server confirms them, guards likes, comments and
//! deletes against double submission, and queues mutations while offline.
//!
//! ```no_run
//! use farmfeed::{Config, EngineSettings, FeedCacheEngine, HttpFeedApi, PageRequest, PostFilter};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let api = Arc::new(HttpFeedApi::from_config(&config)?);
//! let engine = FeedCacheEngine::new(api, EngineSettings::from_config(&config));
//!
//! engine.fetch_posts(PageRequest::first()).await?;
//! for entry in engine.visible_posts(&PostFilter::new().search("maize")) {
//!     println!("{}", entry.value().content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod model;
pub mod util;

pub use api::{ApiError, FeedApi, HttpFeedApi, ImageUpload, PostDraft, StoryDraft};
pub use cache::{OperationKind, Outcome, PageRequest, PostFilter, SkipReason, StoryFilter};
pub use config::Config;
pub use engine::{
    EngineError, EngineSettings, ErrorKind, FeedCacheEngine, FeedError, PageLoaded, ReplayReport,
};
pub use model::{Author, Comment, Entry, Feed, Post, Story};
