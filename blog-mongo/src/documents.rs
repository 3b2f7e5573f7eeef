//! BSON <-> model mapping.
//!
//! Documents are mapped by hand because `category` has two encodings in
//! the same collection: an ObjectId reference or a legacy name string.

use blog_core::ids::DocId;
use blog_core::models::{Category, CategoryRef, Comment, NewComment, NewPost, Post, PostChanges};
use blog_core::store::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, doc, Bson, Document};

use crate::filter::object_id;

pub const POSTS: &str = "posts";
pub const CATEGORIES: &str = "categories";
pub const COMMENTS: &str = "comments";

pub fn to_bson_date(dt: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(dt.timestamp_millis())
}

fn from_bson_date(doc: &Document, key: &str) -> DateTime<Utc> {
    match doc.get(key) {
        Some(Bson::DateTime(d)) => DateTime::<Utc>::from_timestamp_millis(d.timestamp_millis()).unwrap_or_default(),
        _ => DateTime::<Utc>::UNIX_EPOCH,
    }
}

pub fn doc_id(oid: &ObjectId) -> StoreResult<DocId> {
    DocId::parse(&oid.to_hex()).ok_or_else(|| StoreError::invalid_document("_id", oid.to_hex()))
}

fn read_id(collection: &'static str, doc: &Document) -> StoreResult<DocId> {
    match doc.get("_id") {
        Some(Bson::ObjectId(oid)) => doc_id(oid),
        Some(Bson::String(s)) => {
            DocId::parse(s).ok_or_else(|| StoreError::invalid_document(collection, format!("unexpected _id {s}")))
        }
        other => Err(StoreError::invalid_document(
            collection,
            format!("missing or unsupported _id: {other:?}"),
        )),
    }
}

fn opt_str(doc: &Document, key: &str) -> Option<String> {
    match doc.get(key) {
        Some(Bson::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn str_or_default(doc: &Document, key: &str) -> String {
    opt_str(doc, key).unwrap_or_default()
}

pub fn category_bson(category: &CategoryRef) -> StoreResult<Bson> {
    Ok(match category {
        CategoryRef::Id(id) => Bson::ObjectId(object_id(id)?),
        CategoryRef::Legacy(name) => Bson::String(name.clone()),
    })
}

fn read_category(doc: &Document) -> Option<CategoryRef> {
    match doc.get("category") {
        Some(Bson::ObjectId(oid)) => DocId::parse(&oid.to_hex()).map(CategoryRef::Id),
        Some(Bson::String(s)) if !s.is_empty() => Some(CategoryRef::Legacy(s.clone())),
        _ => None,
    }
}

fn read_tags(doc: &Document) -> Vec<String> {
    match doc.get("tags") {
        Some(Bson::Array(items)) => items
            .iter()
            .filter_map(|b| b.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn category_from_doc(doc: &Document) -> StoreResult<Category> {
    Ok(Category {
        id: read_id(CATEGORIES, doc)?,
        name: str_or_default(doc, "name"),
        created_at: from_bson_date(doc, "createdAt"),
        updated_at: from_bson_date(doc, "updatedAt"),
    })
}

pub fn new_category_doc(oid: ObjectId, name: &str, now: DateTime<Utc>) -> Document {
    doc! {
        "_id": oid,
        "name": name,
        "createdAt": to_bson_date(now),
        "updatedAt": to_bson_date(now),
    }
}

pub fn post_from_doc(doc: &Document) -> StoreResult<Post> {
    Ok(Post {
        id: read_id(POSTS, doc)?,
        title: str_or_default(doc, "title"),
        content: str_or_default(doc, "content"),
        excerpt: opt_str(doc, "excerpt"),
        author: opt_str(doc, "author"),
        category: read_category(doc),
        tags: read_tags(doc),
        cover_image: opt_str(doc, "coverImage"),
        created_at: from_bson_date(doc, "createdAt"),
        updated_at: from_bson_date(doc, "updatedAt"),
    })
}

pub fn new_post_doc(oid: ObjectId, post: &NewPost, now: DateTime<Utc>) -> StoreResult<Document> {
    let mut d = doc! {
        "_id": oid,
        "title": &post.title,
        "content": &post.content,
        "tags": post.tags.clone(),
        "createdAt": to_bson_date(now),
        "updatedAt": to_bson_date(now),
    };
    if let Some(excerpt) = &post.excerpt {
        d.insert("excerpt", excerpt);
    }
    if let Some(author) = &post.author {
        d.insert("author", author);
    }
    if let Some(category) = &post.category {
        d.insert("category", category_bson(category)?);
    }
    if let Some(cover) = &post.cover_image {
        d.insert("coverImage", cover);
    }
    Ok(d)
}

/// `$set` document for a partial update; always bumps `updatedAt`.
pub fn post_update_doc(changes: &PostChanges, now: DateTime<Utc>) -> StoreResult<Document> {
    let mut set = doc! { "updatedAt": to_bson_date(now) };
    if let Some(v) = &changes.title {
        set.insert("title", v);
    }
    if let Some(v) = &changes.content {
        set.insert("content", v);
    }
    if let Some(v) = &changes.excerpt {
        set.insert("excerpt", v);
    }
    if let Some(v) = &changes.author {
        set.insert("author", v);
    }
    if let Some(v) = &changes.category {
        set.insert("category", category_bson(v)?);
    }
    if let Some(v) = &changes.tags {
        set.insert("tags", v.clone());
    }
    Ok(doc! { "$set": set })
}

pub fn comment_from_doc(doc: &Document) -> StoreResult<Comment> {
    Ok(Comment {
        id: read_id(COMMENTS, doc)?,
        post_id: str_or_default(doc, "postId"),
        name: str_or_default(doc, "name"),
        email: opt_str(doc, "email"),
        comment: str_or_default(doc, "comment"),
        created_at: from_bson_date(doc, "createdAt"),
    })
}

pub fn new_comment_doc(oid: ObjectId, comment: &NewComment, now: DateTime<Utc>) -> Document {
    let mut d = doc! {
        "_id": oid,
        "postId": &comment.post_id,
        "name": &comment.name,
        "comment": &comment.comment,
        "createdAt": to_bson_date(now),
        "updatedAt": to_bson_date(now),
    };
    if let Some(email) = &comment.email {
        d.insert("email", email);
    }
    d
}
