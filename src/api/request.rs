//! Typed create-request builders.
//!
//! Each draft has a fixed multipart schema: plain text fields, list-valued
//! fields serialized as JSON strings inside the same body, and zero or more
//! image file parts. Drafts are validated before the engine inserts an
//! optimistic entity, so obviously invalid submissions never appear in a feed.

use super::error::ApiError;
use crate::model::{Achievement, TimelineEntry};
use crate::util::strip_control_chars;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Maximum number of images attached to one post.
pub const MAX_IMAGES: usize = 5;

/// Client-side validation failures for drafts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("Content cannot be empty")]
    EmptyContent,
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Too many images: {0} (max {max})", max = MAX_IMAGES)]
    TooManyImages(usize),
    #[error("Unsupported image type for {file_name}: {content_type}")]
    UnsupportedImage {
        file_name: String,
        content_type: String,
    },
}

// ============================================================================
// Images
// ============================================================================

/// An image file attached to a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read an image from disk, inferring the content type from its extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let content_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "application/octet-stream",
        };
        Ok(Self::new(file_name, content_type, bytes))
    }

    fn validate(&self) -> Result<(), DraftError> {
        if !self.content_type.starts_with("image/") {
            return Err(DraftError::UnsupportedImage {
                file_name: self.file_name.clone(),
                content_type: self.content_type.clone(),
            });
        }
        Ok(())
    }

    fn to_part(&self) -> Result<Part, ApiError> {
        Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.content_type)
            .map_err(|e| ApiError::Request(format!("image {}: {}", self.file_name, e)))
    }
}

// ============================================================================
// Post Draft
// ============================================================================

/// Form data for a new post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub content: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub privacy: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<ImageUpload>,
}

impl PostDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_privacy(mut self, privacy: impl Into<String>) -> Self {
        self.privacy = Some(privacy.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_image(mut self, image: ImageUpload) -> Self {
        self.images.push(image);
        self
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.content.trim().is_empty() {
            return Err(DraftError::EmptyContent);
        }
        if self.images.len() > MAX_IMAGES {
            return Err(DraftError::TooManyImages(self.images.len()));
        }
        self.images.iter().try_for_each(ImageUpload::validate)
    }

    /// Text parts of the multipart body, in the order they are sent.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("content", clean(&self.content))];
        push_optional(&mut fields, "category", &self.category);
        push_optional(&mut fields, "location", &self.location);
        push_optional(&mut fields, "privacy", &self.privacy);
        if !self.tags.is_empty() {
            fields.push(("tags", json_list(&self.tags)));
        }
        fields
    }

    pub fn to_form(&self) -> Result<Form, ApiError> {
        let files = self.images.iter().map(|image| ("images", image));
        build_form(self.text_fields(), files)
    }
}

// ============================================================================
// Story Draft
// ============================================================================

/// Form data for a new story.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryDraft {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub achievements: Vec<Achievement>,
    pub timeline: Vec<TimelineEntry>,
    pub cover_image: Option<ImageUpload>,
}

impl StoryDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_achievement(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.achievements.push(Achievement {
            label: label.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_timeline_entry(mut self, date: impl Into<String>, event: impl Into<String>) -> Self {
        self.timeline.push(TimelineEntry {
            date: date.into(),
            event: event.into(),
        });
        self
    }

    pub fn with_cover_image(mut self, image: ImageUpload) -> Self {
        self.cover_image = Some(image);
        self
    }

    pub fn validate(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        if self.content.trim().is_empty() {
            return Err(DraftError::EmptyContent);
        }
        match &self.cover_image {
            Some(image) => image.validate(),
            None => Ok(()),
        }
    }

    /// Text parts of the multipart body, in the order they are sent.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("title", clean(&self.title)),
            ("content", clean(&self.content)),
        ];
        push_optional(&mut fields, "excerpt", &self.excerpt);
        push_optional(&mut fields, "category", &self.category);
        if !self.tags.is_empty() {
            fields.push(("tags", json_list(&self.tags)));
        }
        if !self.achievements.is_empty() {
            fields.push(("achievements", json_list(&self.achievements)));
        }
        if !self.timeline.is_empty() {
            fields.push(("timeline", json_list(&self.timeline)));
        }
        fields
    }

    pub fn to_form(&self) -> Result<Form, ApiError> {
        let files = self.cover_image.iter().map(|image| ("coverImage", image));
        build_form(self.text_fields(), files)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn clean(s: &str) -> String {
    strip_control_chars(s.trim()).into_owned()
}

fn push_optional(
    fields: &mut Vec<(&'static str, String)>,
    name: &'static str,
    value: &Option<String>,
) {
    if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        fields.push((name, strip_control_chars(v).into_owned()));
    }
}

fn json_list<T: Serialize>(items: &[T]) -> String {
    // Plain string/struct lists always serialize.
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn build_form<'a>(
    fields: Vec<(&'static str, String)>,
    files: impl Iterator<Item = (&'static str, &'a ImageUpload)>,
) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for (name, value) in fields {
        form = form.text(name, value);
    }
    for (name, image) in files {
        form = form.part(name, image.to_part()?);
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn jpeg(name: &str) -> ImageUpload {
        ImageUpload::new(name, "image/jpeg", vec![0xff, 0xd8, 0xff])
    }

    #[test]
    fn test_empty_post_content_rejected() {
        assert_eq!(PostDraft::new("   ").validate(), Err(DraftError::EmptyContent));
    }

    #[test]
    fn test_too_many_images_rejected() {
        let mut draft = PostDraft::new("field photos");
        for i in 0..=MAX_IMAGES {
            draft = draft.with_image(jpeg(&format!("{i}.jpg")));
        }
        assert_eq!(
            draft.validate(),
            Err(DraftError::TooManyImages(MAX_IMAGES + 1))
        );
    }

    #[test]
    fn test_non_image_upload_rejected() {
        let draft = PostDraft::new("report").with_image(ImageUpload::new(
            "report.pdf",
            "application/pdf",
            vec![],
        ));
        assert!(matches!(
            draft.validate(),
            Err(DraftError::UnsupportedImage { .. })
        ));
    }

    #[test]
    fn test_post_fields_serialize_tags_as_json() {
        let draft = PostDraft::new("  New tractor  ")
            .with_category("equipment")
            .with_location("  ")
            .with_tag("tractor")
            .with_tag("john-deere");

        assert_eq!(
            draft.text_fields(),
            vec![
                ("content", "New tractor".to_string()),
                ("category", "equipment".to_string()),
                ("tags", r#"["tractor","john-deere"]"#.to_string()),
            ]
        );
    }

    #[test]
    fn test_story_requires_title_and_content() {
        assert_eq!(
            StoryDraft::new("", "body").validate(),
            Err(DraftError::EmptyTitle)
        );
        assert_eq!(
            StoryDraft::new("Title", " ").validate(),
            Err(DraftError::EmptyContent)
        );
        assert_eq!(StoryDraft::new("Title", "body").validate(), Ok(()));
    }

    #[test]
    fn test_story_fields_serialize_lists_as_json() {
        let draft = StoryDraft::new("From 2 to 10 acres", "It started...")
            .with_excerpt("How we grew")
            .with_achievement("Yield", "+40%")
            .with_timeline_entry("2021", "First harvest");

        assert_eq!(
            draft.text_fields(),
            vec![
                ("title", "From 2 to 10 acres".to_string()),
                ("content", "It started...".to_string()),
                ("excerpt", "How we grew".to_string()),
                (
                    "achievements",
                    r#"[{"label":"Yield","value":"+40%"}]"#.to_string()
                ),
                (
                    "timeline",
                    r#"[{"date":"2021","event":"First harvest"}]"#.to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_form_builds_with_images() {
        let draft = PostDraft::new("photos").with_image(jpeg("a.jpg"));
        assert!(draft.to_form().is_ok());
    }
}
