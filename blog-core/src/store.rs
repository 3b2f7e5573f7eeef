//! Document store contract.
//!
//! Backends implement one trait per collection plus [`StoreBackend`] for
//! lifecycle. Services never see a concrete backend: they receive a
//! [`Stores`] bundle built once at startup.
//!
//! Reads of many posts are always ordered newest first (`createdAt`
//! descending).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::ids::DocId;
use crate::models::{Category, Comment, NewComment, NewPost, Post, PostChanges};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("duplicate {collection} record: {key}")]
    Duplicate { collection: &'static str, key: String },

    /// A stored document could not be mapped onto the model.
    #[error("invalid {collection} document: {message}")]
    InvalidDocument {
        collection: &'static str,
        message: String,
    },

    #[error("storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    pub fn duplicate(collection: &'static str, key: impl Into<String>) -> Self {
        Self::Duplicate {
            collection,
            key: key.into(),
        }
    }

    pub fn invalid_document(collection: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            collection,
            message: message.into(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

/// Filterable post fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostField {
    Title,
    Content,
    Category,
    /// Array field: equality means "any element equals".
    Tags,
}

impl PostField {
    /// Stored field name.
    pub fn key(&self) -> &'static str {
        match self {
            PostField::Title => "title",
            PostField::Content => "content",
            PostField::Category => "category",
            PostField::Tags => "tags",
        }
    }
}

/// A comparison operand: a plain string, or an id reference. The two never
/// compare equal to each other, even when the string is id-shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Str(String),
    Id(DocId),
}

/// Filter over the posts collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    All,
    Eq(PostField, FieldValue),
    /// Case-insensitive literal substring match.
    ContainsIgnoreCase(PostField, String),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn or(preds: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(preds.into_iter().collect())
    }
}

/// Skip/limit window over an ordered read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub limit: Option<u64>,
}

impl Window {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn page(skip: u64, limit: u64) -> Self {
        Self {
            skip,
            limit: Some(limit),
        }
    }
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Insert a category whose name is already normalized. Fails with
    /// [`StoreError::Duplicate`] when the name is taken.
    async fn insert_category(&self, name: &str) -> StoreResult<Category>;

    /// Case-insensitive lookup by name.
    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>>;

    /// All categories, name ascending.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;

    async fn categories_by_ids(&self, ids: &[DocId]) -> StoreResult<Vec<Category>>;

    async fn delete_category(&self, id: &DocId) -> StoreResult<Option<Category>>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post>;

    async fn get_post(&self, id: &DocId) -> StoreResult<Option<Post>>;

    async fn find_posts(&self, filter: &Predicate, window: Window) -> StoreResult<Vec<Post>>;

    async fn count_posts(&self, filter: &Predicate) -> StoreResult<u64>;

    /// Returns the post after the update, `None` when absent.
    async fn update_post(&self, id: &DocId, changes: PostChanges) -> StoreResult<Option<Post>>;

    async fn delete_post(&self, id: &DocId) -> StoreResult<Option<Post>>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment>;

    /// Comments of a post, newest first.
    async fn comments_for_post(&self, post_id: &str) -> StoreResult<Vec<Comment>>;

    async fn delete_comment(&self, id: &DocId) -> StoreResult<Option<Comment>>;
}

#[async_trait]
pub trait StoreBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Release connections. Called once after the server stops.
    async fn shutdown(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Explicitly constructed store handles, injected into every service.
#[derive(Clone)]
pub struct Stores {
    pub categories: Arc<dyn CategoryStore>,
    pub posts: Arc<dyn PostStore>,
    pub comments: Arc<dyn CommentStore>,
    pub backend: Arc<dyn StoreBackend>,
}

impl Stores {
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: CategoryStore + PostStore + CommentStore + StoreBackend + 'static,
    {
        Self {
            categories: backend.clone(),
            posts: backend.clone(),
            comments: backend.clone(),
            backend,
        }
    }

    pub async fn shutdown(&self) -> StoreResult<()> {
        tracing::info!(backend = self.backend.name(), "shutting down document store");
        self.backend.shutdown().await
    }
}
