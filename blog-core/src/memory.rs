//! In-memory document store.
//!
//! Same contract as the MongoDB backend, kept in `RwLock`ed maps. Used by
//! tests and by `STORE_BACKEND=memory` for local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::ids::DocId;
use crate::models::{Category, CategoryRef, Comment, NewComment, NewPost, Post, PostChanges};
use crate::store::{
    CategoryStore, CommentStore, FieldValue, PostField, PostStore, Predicate, StoreBackend, StoreError,
    StoreResult, Window,
};

/// A stored record plus its insertion sequence, used to break `createdAt`
/// ties so "newest first" stays deterministic.
#[derive(Debug, Clone)]
struct Row<T> {
    seq: u64,
    value: T,
}

#[derive(Default)]
pub struct MemoryStore {
    seq: AtomicU64,
    categories: RwLock<HashMap<DocId, Row<Category>>>,
    posts: RwLock<HashMap<DocId, Row<Post>>>,
    comments: RwLock<HashMap<DocId, Row<Comment>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Store a post exactly as given. Lets callers seed records that the
    /// API itself can no longer produce, such as legacy string categories.
    pub async fn put_post(&self, post: Post) {
        let seq = self.next_seq();
        self.posts.write().await.insert(post.id.clone(), Row { seq, value: post });
    }

    pub async fn category_count(&self) -> usize {
        self.categories.read().await.len()
    }

    pub async fn comment_count(&self) -> usize {
        self.comments.read().await.len()
    }
}

fn newest_first<T, F>(rows: &mut [&Row<T>], created_at: F)
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    rows.sort_by(|a, b| {
        created_at(&b.value)
            .cmp(&created_at(&a.value))
            .then(b.seq.cmp(&a.seq))
    });
}

fn field_eq(post: &Post, field: PostField, value: &FieldValue) -> bool {
    match (field, value) {
        (PostField::Title, FieldValue::Str(s)) => &post.title == s,
        (PostField::Content, FieldValue::Str(s)) => &post.content == s,
        (PostField::Tags, FieldValue::Str(s)) => post.tags.iter().any(|t| t == s),
        (PostField::Category, FieldValue::Str(s)) => {
            matches!(&post.category, Some(CategoryRef::Legacy(name)) if name == s)
        }
        (PostField::Category, FieldValue::Id(id)) => {
            matches!(&post.category, Some(CategoryRef::Id(stored)) if stored == id)
        }
        (_, FieldValue::Id(_)) => false,
    }
}

fn field_contains(post: &Post, field: PostField, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    match field {
        PostField::Title => post.title.to_lowercase().contains(&needle),
        PostField::Content => post.content.to_lowercase().contains(&needle),
        PostField::Tags => post.tags.iter().any(|t| t.to_lowercase().contains(&needle)),
        PostField::Category => match &post.category {
            Some(CategoryRef::Legacy(name)) => name.to_lowercase().contains(&needle),
            _ => false,
        },
    }
}

pub(crate) fn matches(post: &Post, filter: &Predicate) -> bool {
    match filter {
        Predicate::All => true,
        Predicate::Eq(field, value) => field_eq(post, *field, value),
        Predicate::ContainsIgnoreCase(field, needle) => field_contains(post, *field, needle),
        Predicate::Or(preds) => preds.iter().any(|p| matches(post, p)),
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn insert_category(&self, name: &str) -> StoreResult<Category> {
        let mut categories = self.categories.write().await;
        let normalized = Category::normalize_name(name);

        if categories.values().any(|row| row.value.name == normalized) {
            return Err(StoreError::duplicate("categories", normalized));
        }

        let now = Utc::now();
        let category = Category {
            id: DocId::generate(),
            name: normalized,
            created_at: now,
            updated_at: now,
        };
        let seq = self.next_seq();
        categories.insert(
            category.id.clone(),
            Row {
                seq,
                value: category.clone(),
            },
        );
        Ok(category)
    }

    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let normalized = Category::normalize_name(name);
        let categories = self.categories.read().await;
        Ok(categories
            .values()
            .find(|row| row.value.name == normalized)
            .map(|row| row.value.clone()))
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = self.categories.read().await;
        let mut out: Vec<Category> = categories.values().map(|row| row.value.clone()).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn categories_by_ids(&self, ids: &[DocId]) -> StoreResult<Vec<Category>> {
        let categories = self.categories.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| categories.get(id).map(|row| row.value.clone()))
            .collect())
    }

    async fn delete_category(&self, id: &DocId) -> StoreResult<Option<Category>> {
        Ok(self.categories.write().await.remove(id).map(|row| row.value))
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let now = Utc::now();
        let post = Post {
            id: DocId::generate(),
            title: post.title,
            content: post.content,
            excerpt: post.excerpt,
            author: post.author,
            category: post.category,
            tags: post.tags,
            cover_image: post.cover_image,
            created_at: now,
            updated_at: now,
        };
        self.put_post(post.clone()).await;
        Ok(post)
    }

    async fn get_post(&self, id: &DocId) -> StoreResult<Option<Post>> {
        Ok(self.posts.read().await.get(id).map(|row| row.value.clone()))
    }

    async fn find_posts(&self, filter: &Predicate, window: Window) -> StoreResult<Vec<Post>> {
        let posts = self.posts.read().await;
        let mut rows: Vec<&Row<Post>> = posts.values().filter(|row| matches(&row.value, filter)).collect();
        newest_first(&mut rows, |p| p.created_at);

        let skip = usize::try_from(window.skip).unwrap_or(usize::MAX);
        let take = window
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(rows.into_iter().skip(skip).take(take).map(|row| row.value.clone()).collect())
    }

    async fn count_posts(&self, filter: &Predicate) -> StoreResult<u64> {
        let posts = self.posts.read().await;
        Ok(posts.values().filter(|row| matches(&row.value, filter)).count() as u64)
    }

    async fn update_post(&self, id: &DocId, changes: PostChanges) -> StoreResult<Option<Post>> {
        let mut posts = self.posts.write().await;
        let Some(row) = posts.get_mut(id) else {
            return Ok(None);
        };
        changes.apply(&mut row.value, Utc::now());
        Ok(Some(row.value.clone()))
    }

    async fn delete_post(&self, id: &DocId) -> StoreResult<Option<Post>> {
        Ok(self.posts.write().await.remove(id).map(|row| row.value))
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let comment = Comment {
            id: DocId::generate(),
            post_id: comment.post_id,
            name: comment.name,
            email: comment.email,
            comment: comment.comment,
            created_at: Utc::now(),
        };
        let seq = self.next_seq();
        self.comments.write().await.insert(
            comment.id.clone(),
            Row {
                seq,
                value: comment.clone(),
            },
        );
        Ok(comment)
    }

    async fn comments_for_post(&self, post_id: &str) -> StoreResult<Vec<Comment>> {
        let comments = self.comments.read().await;
        let mut rows: Vec<&Row<Comment>> = comments.values().filter(|row| row.value.post_id == post_id).collect();
        newest_first(&mut rows, |c| c.created_at);
        Ok(rows.into_iter().map(|row| row.value.clone()).collect())
    }

    async fn delete_comment(&self, id: &DocId) -> StoreResult<Option<Comment>> {
        Ok(self.comments.write().await.remove(id).map(|row| row.value))
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }
}
