use async_trait::async_trait;
use blog_core::ids::DocId;
use blog_core::models::{Category, Comment, NewComment, NewPost, Post, PostChanges};
use blog_core::store::{
    CategoryStore, CommentStore, PostStore, Predicate, StoreBackend, StoreError, StoreResult, Window,
};
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{Collation, CollationStrength, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Cursor, Database, IndexModel};

use crate::documents::{self, CATEGORIES, COMMENTS, POSTS};
use crate::filter::{object_id, to_document};

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed store for posts, categories and comments.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Connect and make sure the indexes the store relies on exist.
    pub async fn connect(uri: &str, database: &str) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        let store = Self { client, db };
        store.ensure_indexes().await?;
        tracing::info!(database, "connected to MongoDB");
        Ok(store)
    }

    fn posts(&self) -> Collection<Document> {
        self.db.collection(POSTS)
    }

    fn categories(&self) -> Collection<Document> {
        self.db.collection(CATEGORIES)
    }

    fn comments(&self) -> Collection<Document> {
        self.db.collection(COMMENTS)
    }

    async fn ensure_indexes(&self) -> StoreResult<()> {
        let unique_name = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .collation(name_collation())
                    .build(),
            )
            .build();
        self.categories().create_index(unique_name).await.map_err(StoreError::backend)?;

        let newest_first = IndexModel::builder().keys(doc! { "createdAt": -1, "_id": -1 }).build();
        self.posts().create_index(newest_first).await.map_err(StoreError::backend)?;

        let by_post = IndexModel::builder().keys(doc! { "postId": 1, "createdAt": -1 }).build();
        self.comments().create_index(by_post).await.map_err(StoreError::backend)?;
        Ok(())
    }
}

/// Category names compare case-insensitively.
fn name_collation() -> Collation {
    Collation::builder()
        .locale("en")
        .strength(CollationStrength::Secondary)
        .build()
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY,
        ErrorKind::Command(ce) => ce.code == DUPLICATE_KEY,
        _ => false,
    }
}

async fn collect<T>(
    mut cursor: Cursor<Document>,
    map: impl Fn(&Document) -> StoreResult<T>,
) -> StoreResult<Vec<T>> {
    let mut out = Vec::new();
    while cursor.advance().await.map_err(StoreError::backend)? {
        let raw = cursor.deserialize_current().map_err(StoreError::backend)?;
        out.push(map(&raw)?);
    }
    Ok(out)
}

fn id_filter(id: &DocId) -> StoreResult<Document> {
    Ok(doc! { "_id": object_id(id)? })
}

/// Mongo limits are signed.
fn find_limit(window: Window) -> Option<i64> {
    window.limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX))
}

#[async_trait]
impl CategoryStore for MongoStore {
    async fn insert_category(&self, name: &str) -> StoreResult<Category> {
        let oid = ObjectId::new();
        let raw = documents::new_category_doc(oid, name, Utc::now());
        match self.categories().insert_one(&raw).await {
            Ok(_) => documents::category_from_doc(&raw),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::duplicate(CATEGORIES, name)),
            Err(e) => Err(StoreError::backend(e)),
        }
    }

    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        let found = self
            .categories()
            .find_one(doc! { "name": name })
            .collation(name_collation())
            .await
            .map_err(StoreError::backend)?;
        found.as_ref().map(documents::category_from_doc).transpose()
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let cursor = self
            .categories()
            .find(doc! {})
            .sort(doc! { "name": 1 })
            .await
            .map_err(StoreError::backend)?;
        collect(cursor, documents::category_from_doc).await
    }

    async fn categories_by_ids(&self, ids: &[DocId]) -> StoreResult<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let oids = ids
            .iter()
            .map(|id| object_id(id).map(Bson::ObjectId))
            .collect::<StoreResult<Vec<_>>>()?;
        let cursor = self
            .categories()
            .find(doc! { "_id": { "$in": oids } })
            .await
            .map_err(StoreError::backend)?;
        collect(cursor, documents::category_from_doc).await
    }

    async fn delete_category(&self, id: &DocId) -> StoreResult<Option<Category>> {
        let removed = self
            .categories()
            .find_one_and_delete(id_filter(id)?)
            .await
            .map_err(StoreError::backend)?;
        removed.as_ref().map(documents::category_from_doc).transpose()
    }
}

#[async_trait]
impl PostStore for MongoStore {
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let raw = documents::new_post_doc(ObjectId::new(), &post, Utc::now())?;
        self.posts().insert_one(&raw).await.map_err(StoreError::backend)?;
        documents::post_from_doc(&raw)
    }

    async fn get_post(&self, id: &DocId) -> StoreResult<Option<Post>> {
        let found = self
            .posts()
            .find_one(id_filter(id)?)
            .await
            .map_err(StoreError::backend)?;
        found.as_ref().map(documents::post_from_doc).transpose()
    }

    async fn find_posts(&self, filter: &Predicate, window: Window) -> StoreResult<Vec<Post>> {
        let posts = self.posts();
        let mut find = posts
            .find(to_document(filter)?)
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .skip(window.skip);
        if let Some(limit) = find_limit(window) {
            find = find.limit(limit);
        }
        let cursor = find.await.map_err(StoreError::backend)?;
        collect(cursor, documents::post_from_doc).await
    }

    async fn count_posts(&self, filter: &Predicate) -> StoreResult<u64> {
        self.posts()
            .count_documents(to_document(filter)?)
            .await
            .map_err(StoreError::backend)
    }

    async fn update_post(&self, id: &DocId, changes: PostChanges) -> StoreResult<Option<Post>> {
        let update = documents::post_update_doc(&changes, Utc::now())?;
        let updated = self
            .posts()
            .find_one_and_update(id_filter(id)?, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(StoreError::backend)?;
        updated.as_ref().map(documents::post_from_doc).transpose()
    }

    async fn delete_post(&self, id: &DocId) -> StoreResult<Option<Post>> {
        let removed = self
            .posts()
            .find_one_and_delete(id_filter(id)?)
            .await
            .map_err(StoreError::backend)?;
        removed.as_ref().map(documents::post_from_doc).transpose()
    }
}

#[async_trait]
impl CommentStore for MongoStore {
    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let raw = documents::new_comment_doc(ObjectId::new(), &comment, Utc::now());
        self.comments().insert_one(&raw).await.map_err(StoreError::backend)?;
        documents::comment_from_doc(&raw)
    }

    async fn comments_for_post(&self, post_id: &str) -> StoreResult<Vec<Comment>> {
        let cursor = self
            .comments()
            .find(doc! { "postId": post_id })
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .await
            .map_err(StoreError::backend)?;
        collect(cursor, documents::comment_from_doc).await
    }

    async fn delete_comment(&self, id: &DocId) -> StoreResult<Option<Comment>> {
        let removed = self
            .comments()
            .find_one_and_delete(id_filter(id)?)
            .await
            .map_err(StoreError::backend)?;
        removed.as_ref().map(documents::comment_from_doc).transpose()
    }
}

#[async_trait]
impl StoreBackend for MongoStore {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn shutdown(&self) -> StoreResult<()> {
        self.client.clone().shutdown().await;
        tracing::info!("MongoDB client closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_limit_saturates_and_passes_unbounded_windows_through() {
        assert_eq!(find_limit(Window::all()), None);
        assert_eq!(find_limit(Window::page(20, 10)), Some(10));
        assert_eq!(find_limit(Window::page(0, u64::MAX)), Some(i64::MAX));
    }
}
