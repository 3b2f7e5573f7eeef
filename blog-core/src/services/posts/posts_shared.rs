use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{CategoryRef, Post, PostChanges, PostView};
use crate::validation::non_blank;

pub const POST_FIELDS_REQUIRED: &str = "Title, content and category are required";
pub const INVALID_POST_UPDATE: &str = "Invalid post update";
pub const POST_NOT_FOUND: &str = "Post not found";

/// Multipart field carrying the cover image file.
pub const COVER_IMAGE_FIELD: &str = "coverImage";

/// Tags arrive as a JSON array or as one comma-delimited string (form posts).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Delimited(String),
}

impl TagsInput {
    /// Trimmed, non-empty, first occurrence wins.
    pub fn into_tags(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            TagsInput::List(items) => items,
            TagsInput::Delimited(s) => s.split(',').map(str::to_string).collect(),
        };

        let mut out: Vec<String> = Vec::with_capacity(raw.len());
        for tag in raw {
            let tag = tag.trim();
            if !tag.is_empty() && !out.iter().any(|t| t == tag) {
                out.push(tag.to_string());
            }
        }
        out
    }
}

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreatePostInput {
    #[serde(default, deserialize_with = "non_blank")]
    #[validate(required(message = "title is required"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "non_blank")]
    #[validate(required(message = "content is required"))]
    pub content: Option<String>,

    /// Category name; created when unknown.
    #[serde(default, deserialize_with = "non_blank")]
    #[validate(required(message = "category is required"))]
    pub category: Option<String>,

    #[serde(default, deserialize_with = "non_blank")]
    pub excerpt: Option<String>,

    #[serde(default, deserialize_with = "non_blank")]
    pub author: Option<String>,

    #[serde(default)]
    pub tags: Option<TagsInput>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdatePostInput {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: Option<String>,

    pub excerpt: Option<String>,

    pub author: Option<String>,

    /// Stored as given: id-shaped values as a reference, anything else as
    /// a plain string. Not checked against existing categories.
    #[serde(default, deserialize_with = "non_blank")]
    pub category: Option<String>,

    #[serde(default)]
    pub tags: Option<TagsInput>,
}

impl UpdatePostInput {
    pub fn into_changes(self) -> PostChanges {
        PostChanges {
            title: self.title,
            content: self.content,
            excerpt: self.excerpt,
            author: self.author,
            category: self.category.as_deref().map(CategoryRef::from_raw),
            tags: self.tags.map(TagsInput::into_tags),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PostPage {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub posts: Vec<PostView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SearchResults {
    pub total: u64,
    pub posts: Vec<PostView>,
}

impl SearchResults {
    pub fn empty() -> Self {
        Self {
            total: 0,
            posts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreatedPost {
    pub message: String,
    pub post: Post,
}
