use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::ids::DocId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Canonical stored form of a category name: trimmed and lowercased.
    pub fn normalize_name(raw: &str) -> String {
        raw.trim().to_lowercase()
    }
}

/// How a post points at its category in storage.
///
/// Older records hold the category name inline; newer ones hold a
/// reference to a [`Category`]. Both serialize as a plain string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryRef {
    Id(DocId),
    Legacy(String),
}

impl CategoryRef {
    /// Raw values supplied on update: id-shaped strings become references.
    pub fn from_raw(raw: &str) -> Self {
        match DocId::parse(raw) {
            Some(id) => CategoryRef::Id(id),
            None => CategoryRef::Legacy(raw.to_string()),
        }
    }

    pub fn as_id(&self) -> Option<&DocId> {
        match self {
            CategoryRef::Id(id) => Some(id),
            CategoryRef::Legacy(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CategoryRef::Id(id) => id.as_str(),
            CategoryRef::Legacy(name) => name,
        }
    }
}

impl Serialize for CategoryRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub category: Option<CategoryRef>,
    pub tags: Vec<String>,
    #[serde(rename = "coverImage", skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// The `{_id, name}` projection attached to posts on read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CategorySummary {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CategoryView {
    Populated(CategorySummary),
    /// Legacy strings and dangling references are passed through as-is.
    Raw(String),
}

/// A post with its category populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PostView {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub category: Option<CategoryView>,
    pub tags: Vec<String>,
    #[serde(rename = "coverImage", skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl PostView {
    pub fn populate(post: Post, categories: &HashMap<DocId, Category>) -> Self {
        let category = post.category.map(|c| match &c {
            CategoryRef::Id(id) => match categories.get(id) {
                Some(found) => CategoryView::Populated(CategorySummary {
                    id: found.id.clone(),
                    name: found.name.clone(),
                }),
                None => CategoryView::Raw(id.to_string()),
            },
            CategoryRef::Legacy(name) => CategoryView::Raw(name.clone()),
        });

        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            excerpt: post.excerpt,
            author: post.author,
            category,
            tags: post.tags,
            cover_image: post.cover_image,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: DocId,
    #[serde(rename = "postId")]
    pub post_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub comment: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a post; the store assigns id and timestamps.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub category: Option<CategoryRef>,
    pub tags: Vec<String>,
    pub cover_image: Option<String>,
}

/// Partial update of a post. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub category: Option<CategoryRef>,
    pub tags: Option<Vec<String>>,
}

impl PostChanges {
    pub fn apply(self, post: &mut Post, now: DateTime<Utc>) {
        if let Some(v) = self.title {
            post.title = v;
        }
        if let Some(v) = self.content {
            post.content = v;
        }
        if let Some(v) = self.excerpt {
            post.excerpt = Some(v);
        }
        if let Some(v) = self.author {
            post.author = Some(v);
        }
        if let Some(v) = self.category {
            post.category = Some(v);
        }
        if let Some(v) = self.tags {
            post.tags = v;
        }
        post.updated_at = now;
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: String,
    pub name: String,
    pub email: Option<String>,
    pub comment: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post_with(category: Option<CategoryRef>) -> Post {
        let now = Utc::now();
        Post {
            id: DocId::generate(),
            title: "A".into(),
            content: "B".into(),
            excerpt: None,
            author: None,
            category,
            tags: vec![],
            cover_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn category_ref_serializes_as_string() {
        let id = DocId::generate();
        let post = post_with(Some(CategoryRef::Id(id.clone())));
        let v = serde_json::to_value(&post).unwrap();
        assert_eq!(v["category"], json!(id.as_str()));
        assert!(v.get("excerpt").is_none());
    }

    #[test]
    fn populate_resolves_known_ids_and_passes_through_the_rest() {
        let now = Utc::now();
        let cat = Category {
            id: DocId::generate(),
            name: "tech".into(),
            created_at: now,
            updated_at: now,
        };
        let mut lookup = HashMap::new();
        lookup.insert(cat.id.clone(), cat.clone());

        let known = PostView::populate(post_with(Some(CategoryRef::Id(cat.id.clone()))), &lookup);
        let v = serde_json::to_value(&known).unwrap();
        assert_eq!(v["category"]["name"], "tech");
        assert_eq!(v["category"]["_id"], json!(cat.id.as_str()));

        let dangling = DocId::generate();
        let view = PostView::populate(post_with(Some(CategoryRef::Id(dangling.clone()))), &lookup);
        assert_eq!(view.category, Some(CategoryView::Raw(dangling.to_string())));

        let legacy = PostView::populate(post_with(Some(CategoryRef::Legacy("tech".into()))), &lookup);
        assert_eq!(legacy.category, Some(CategoryView::Raw("tech".into())));
    }

    #[test]
    fn raw_category_on_update_is_classified_by_shape() {
        assert!(CategoryRef::from_raw("6650c0ffee0ddba11deadbee").as_id().is_some());
        assert_eq!(CategoryRef::from_raw("news"), CategoryRef::Legacy("news".into()));
    }
}
