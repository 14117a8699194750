use crate::util::read_time_minutes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Feeds
// ============================================================================

/// One of the two paginated collections the engine caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Posts,
    Stories,
}

impl Feed {
    /// Name used in logs, guard keys and endpoint paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Feed::Posts => "posts",
            Feed::Stories => "stories",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Authors
// ============================================================================

/// Community role of an author. Unknown roles from the backend map to `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    #[serde(other)]
    User,
}

/// Author reference embedded in posts, stories and comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub avatar: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub role: Role,
}

impl Author {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this author may delete content written by `owner`.
    pub fn can_delete(&self, owner: &Author) -> bool {
        self.is_admin() || self.id == owner.id
    }
}

// ============================================================================
// Posts
// ============================================================================

/// A comment on a post. Comments are append-only and never reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(alias = "_id")]
    pub id: String,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A community post as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(alias = "_id")]
    pub id: String,
    pub author: Author,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub privacy: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Voter ids. Membership, not a counter.
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    /// Append a comment unless one with the same id is already present.
    ///
    /// Returns `false` when the comment was a duplicate.
    pub fn push_comment(&mut self, comment: Comment) -> bool {
        if self.comments.iter().any(|c| c.id == comment.id) {
            return false;
        }
        self.comments.push(comment);
        true
    }
}

// ============================================================================
// Stories
// ============================================================================

/// Label/value pair shown on a story ("Yield increase" / "30%").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub label: String,
    pub value: String,
}

/// One milestone on a story's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub date: String,
    pub event: String,
}

/// A long-form success story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    #[serde(alias = "_id")]
    pub id: String,
    pub author: Author,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    #[serde(default)]
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Story {
    /// Estimated reading time in minutes, derived from the content.
    ///
    /// Never persisted; recomputed on every call so edits are reflected.
    pub fn read_time(&self) -> u32 {
        read_time_minutes(&self.content)
    }
}

// ============================================================================
// Entity Trait
// ============================================================================

/// Common surface of the records held in an [`EntityStore`](crate::cache::EntityStore).
pub trait FeedEntity: Clone {
    /// The feed this entity type belongs to.
    const FEED: Feed;

    fn id(&self) -> &str;
    fn author(&self) -> &Author;
    fn created_at(&self) -> DateTime<Utc>;
    fn likes(&self) -> &[String];
    fn set_likes(&mut self, likes: Vec<String>);

    fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes().iter().any(|id| id == user_id)
    }
}

impl FeedEntity for Post {
    const FEED: Feed = Feed::Posts;

    fn id(&self) -> &str {
        &self.id
    }

    fn author(&self) -> &Author {
        &self.author
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn likes(&self) -> &[String] {
        &self.likes
    }

    fn set_likes(&mut self, likes: Vec<String>) {
        self.likes = likes;
    }
}

impl FeedEntity for Story {
    const FEED: Feed = Feed::Stories;

    fn id(&self) -> &str {
        &self.id
    }

    fn author(&self) -> &Author {
        &self.author
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn likes(&self) -> &[String] {
        &self.likes
    }

    fn set_likes(&mut self, likes: Vec<String>) {
        self.likes = likes;
    }
}
