//! Read-side projections over a feed's entries.
//!
//! Everything here is pure: the same entries and filter always produce the
//! same list, and the store is never touched.

use crate::model::{Entry, Post, Story};
use crate::util::contains_ignore_case;

/// Search applied to the posts feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub search: Option<String>,
}

impl PostFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }
}

/// Search and category applied to the stories feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}

impl StoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

fn search_term(search: &Option<String>) -> String {
    search
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_lowercase()
}

/// Posts matching the search in content or author name, in arrival order.
pub fn project_posts<'a>(entries: &[&'a Entry<Post>], filter: &PostFilter) -> Vec<&'a Entry<Post>> {
    let term = search_term(&filter.search);
    entries
        .iter()
        .copied()
        .filter(|entry| {
            let post = entry.value();
            contains_ignore_case(&post.content, &term)
                || contains_ignore_case(&post.author.name, &term)
        })
        .collect()
}

/// Stories matching search and category, newest first.
///
/// The sort is stable, so stories with equal timestamps keep arrival order.
pub fn project_stories<'a>(
    entries: &[&'a Entry<Story>],
    filter: &StoryFilter,
) -> Vec<&'a Entry<Story>> {
    let term = search_term(&filter.search);
    let category = filter.category.as_deref().filter(|c| !c.is_empty());

    let mut stories: Vec<&Entry<Story>> = entries
        .iter()
        .copied()
        .filter(|entry| story_matches(entry.value(), &term))
        .filter(|entry| match category {
            Some(category) => entry.value().category.as_deref() == Some(category),
            None => true,
        })
        .collect();

    stories.sort_by(|a, b| b.value().created_at.cmp(&a.value().created_at));
    stories
}

fn story_matches(story: &Story, term: &str) -> bool {
    contains_ignore_case(&story.title, term)
        || contains_ignore_case(&story.content, term)
        || story
            .excerpt
            .as_deref()
            .is_some_and(|e| contains_ignore_case(e, term))
        || contains_ignore_case(&story.author.name, term)
        || story.tags.iter().any(|t| contains_ignore_case(t, term))
}
