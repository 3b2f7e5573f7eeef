use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{BlogError, BlogResult};
use crate::ids::DocId;
use crate::models::{CategoryRef, NewPost, Post, PostView};
use crate::services::categories::CategoryResolver;
use crate::services::types::MessageResponse;
use crate::store::{CategoryStore, PostStore, Predicate, Stores, Window};
use crate::uploads::{StoredUpload, UploadStore, UploadedFiles};
use crate::validation::validate;

use super::posts_query::{self, PageRequest, Paging};
use super::posts_shared::{
    CreatePostInput, CreatedPost, PostPage, SearchResults, UpdatePostInput, COVER_IMAGE_FIELD,
    INVALID_POST_UPDATE, POST_FIELDS_REQUIRED, POST_NOT_FOUND,
};

pub struct PostsService {
    posts: Arc<dyn PostStore>,
    categories: Arc<dyn CategoryStore>,
    resolver: Arc<dyn CategoryResolver>,
    uploads: UploadStore,
    paging: Paging,
}

impl PostsService {
    pub fn new(stores: &Stores, resolver: Arc<dyn CategoryResolver>, uploads: UploadStore, paging: Paging) -> Self {
        Self {
            posts: stores.posts.clone(),
            categories: stores.categories.clone(),
            resolver,
            uploads,
            paging,
        }
    }

    pub async fn find(&self, page: Option<&str>, limit: Option<&str>) -> BlogResult<PostPage> {
        let request = PageRequest::parse(page, limit, &self.paging);
        let all = Predicate::All;

        // Independent reads: the total may drift from the page under writes.
        let (posts, total) = tokio::try_join!(
            self.posts.find_posts(&all, request.window()),
            self.posts.count_posts(&all),
        )?;

        Ok(PostPage {
            total,
            page: request.page,
            limit: request.limit,
            posts: self.populate(posts).await?,
        })
    }

    pub async fn get(&self, id: &str) -> BlogResult<PostView> {
        let post = match DocId::parse(id) {
            Some(id) => self.posts.get_post(&id).await?,
            None => None,
        };
        let Some(post) = post else {
            return Err(BlogError::not_found(POST_NOT_FOUND).into_anyhow());
        };
        Ok(self.populate_one(post).await?)
    }

    /// Create a post, storing an uploaded cover image when one was sent.
    pub async fn create(&self, data: Value, mut files: UploadedFiles) -> BlogResult<CreatedPost> {
        let input: CreatePostInput = match validate(&data, POST_FIELDS_REQUIRED) {
            Ok(input) => input,
            Err(e) => {
                files.cleanup().await;
                return Err(e);
            }
        };

        let cover = files.take(COVER_IMAGE_FIELD);
        files.cleanup().await;

        let stored = match cover {
            Some(file) => Some(self.uploads.persist(&file).await?),
            None => None,
        };

        match self.insert(input, stored.as_ref()).await {
            Ok(post) => {
                tracing::info!(post = %post.id, "created post");
                Ok(CreatedPost {
                    message: "Post created successfully".to_string(),
                    post,
                })
            }
            Err(e) => {
                if let Some(stored) = &stored {
                    self.uploads.discard(stored).await;
                }
                Err(e)
            }
        }
    }

    async fn insert(&self, input: CreatePostInput, cover: Option<&StoredUpload>) -> BlogResult<Post> {
        let token = input.category.unwrap_or_default();
        let category = self.resolver.resolve_or_create(&token).await?;

        let post = NewPost {
            title: input.title.unwrap_or_default(),
            content: input.content.unwrap_or_default(),
            excerpt: input.excerpt,
            author: input.author,
            category: Some(CategoryRef::Id(category)),
            tags: input.tags.map(|t| t.into_tags()).unwrap_or_default(),
            cover_image: cover.map(|c| c.public_path.clone()),
        };

        Ok(self.posts.insert_post(post).await?)
    }

    pub async fn update(&self, id: &str, data: Value) -> BlogResult<PostView> {
        let Some(id) = DocId::parse(id) else {
            return Err(BlogError::not_found(POST_NOT_FOUND).into_anyhow());
        };
        let input: UpdatePostInput = validate(&data, INVALID_POST_UPDATE)?;

        match self.posts.update_post(&id, input.into_changes()).await? {
            Some(post) => Ok(self.populate_one(post).await?),
            None => Err(BlogError::not_found(POST_NOT_FOUND).into_anyhow()),
        }
    }

    /// Comments of the post are left in place.
    pub async fn remove(&self, id: &str) -> BlogResult<MessageResponse> {
        let removed = match DocId::parse(id) {
            Some(id) => self.posts.delete_post(&id).await?,
            None => None,
        };
        match removed {
            Some(post) => {
                tracing::info!(post = %post.id, "deleted post");
                Ok(MessageResponse::new("Post deleted successfully"))
            }
            None => Err(BlogError::not_found(POST_NOT_FOUND).into_anyhow()),
        }
    }

    pub async fn by_category(&self, token: &str) -> BlogResult<Vec<PostView>> {
        let filter = self.resolver.resolve_for_query(token).await?;
        let posts = self.posts.find_posts(&filter, Window::all()).await?;
        self.populate(posts).await
    }

    pub async fn by_tag(&self, tag: &str) -> BlogResult<Vec<PostView>> {
        let posts = self
            .posts
            .find_posts(&posts_query::tag_predicate(tag), Window::all())
            .await?;
        self.populate(posts).await
    }

    pub async fn search(&self, keyword: Option<&str>) -> BlogResult<SearchResults> {
        let Some(filter) = posts_query::keyword_predicate(keyword.unwrap_or_default()) else {
            return Ok(SearchResults::empty());
        };

        let posts = self.posts.find_posts(&filter, Window::all()).await?;
        let posts = self.populate(posts).await?;
        Ok(SearchResults {
            total: posts.len() as u64,
            posts,
        })
    }

    async fn populate_one(&self, post: Post) -> BlogResult<PostView> {
        let mut views = self.populate(vec![post]).await?;
        views
            .pop()
            .ok_or_else(|| BlogError::general_error("post population returned nothing").into_anyhow())
    }

    /// Attach `{_id, name}` for every category reference that resolves.
    async fn populate(&self, posts: Vec<Post>) -> BlogResult<Vec<PostView>> {
        let mut ids: Vec<DocId> = posts
            .iter()
            .filter_map(|p| p.category.as_ref().and_then(CategoryRef::as_id).cloned())
            .collect();
        ids.sort();
        ids.dedup();

        let lookup: HashMap<DocId, _> = if ids.is_empty() {
            HashMap::new()
        } else {
            self.categories
                .categories_by_ids(&ids)
                .await?
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect()
        };

        Ok(posts.into_iter().map(|p| PostView::populate(p, &lookup)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::memory::MemoryStore;
    use crate::models::CategoryView;
    use crate::services::categories::StoreCategoryResolver;
    use crate::uploads::UploadedFile;
    use chrono::Utc;
    use serde_json::json;

    struct Fixture {
        store: Arc<MemoryStore>,
        svc: PostsService,
        dir: tempfile::TempDir,
        uploads_dir: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let stores = Stores::from_backend(store.clone());
        let resolver = Arc::new(StoreCategoryResolver::new(stores.categories.clone()));
        let dir = tempfile::tempdir().unwrap();
        let uploads_dir = dir.path().join("uploads");
        let svc = PostsService::new(&stores, resolver, UploadStore::new(&uploads_dir), Paging::default());
        Fixture {
            store,
            svc,
            dir,
            uploads_dir,
        }
    }

    async fn create(svc: &PostsService, body: Value) -> Post {
        svc.create(body, UploadedFiles::default()).await.unwrap().post
    }

    #[tokio::test]
    async fn create_resolves_category_case_insensitively() {
        let f = fixture();
        let first = create(&f.svc, json!({ "title": "A", "content": "B", "category": "Tech" })).await;
        let second = create(&f.svc, json!({ "title": "C", "content": "D", "category": "TECH" })).await;

        assert_eq!(f.store.category_count().await, 1);
        assert_eq!(first.category, second.category);
        let id = first.category.as_ref().and_then(CategoryRef::as_id).unwrap();
        let stored = f.store.categories_by_ids(&[id.clone()]).await.unwrap();
        assert_eq!(stored[0].name, "tech");
    }

    #[tokio::test]
    async fn create_reports_missing_fields() {
        let f = fixture();
        let err = f
            .svc
            .create(json!({ "title": "A", "content": " " }), UploadedFiles::default())
            .await
            .unwrap_err();
        let blog = BlogError::from_anyhow(&err).unwrap();
        assert_eq!(blog.kind, ErrorKind::BadRequest);
        assert_eq!(blog.message, POST_FIELDS_REQUIRED);
        let errors = blog.errors.as_ref().unwrap();
        assert!(errors.get("content").is_some());
        assert!(errors.get("category").is_some());
        assert!(errors.get("title").is_none());
    }

    #[tokio::test]
    async fn create_stores_cover_image() {
        let f = fixture();
        let temp = f.dir.path().join("part");
        tokio::fs::write(&temp, b"png").await.unwrap();
        let files = UploadedFiles(vec![UploadedFile {
            field: COVER_IMAGE_FIELD.into(),
            temp_path: temp,
            filename: Some("cover.png".into()),
            content_type: Some("image/png".into()),
            size: 3,
        }]);

        let created = f
            .svc
            .create(json!({ "title": "A", "content": "B", "category": "art", "tags": "x, y" }), files)
            .await
            .unwrap();

        let cover = created.post.cover_image.unwrap();
        assert!(cover.starts_with("/uploads/"));
        let name = cover.trim_start_matches("/uploads/");
        assert!(f.uploads_dir.join(name).exists());
        assert_eq!(created.post.tags, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn list_clamps_limit_and_counts_everything() {
        let f = fixture();
        for i in 0..3 {
            create(&f.svc, json!({ "title": format!("t{i}"), "content": "c", "category": "misc" })).await;
        }

        let page = f.svc.find(Some("1"), Some("500")).await.unwrap();
        assert_eq!(page.limit, 100);
        assert_eq!(page.total, 3);
        assert_eq!(page.posts[0].title, "t2");

        let page = f.svc.find(Some("2"), Some("2")).await.unwrap();
        assert_eq!(page.posts.len(), 1);
        assert_eq!(page.posts[0].title, "t0");
    }

    #[tokio::test]
    async fn reads_populate_category() {
        let f = fixture();
        let post = create(&f.svc, json!({ "title": "A", "content": "B", "category": "Tech" })).await;

        let view = f.svc.get(post.id.as_str()).await.unwrap();
        match view.category {
            Some(CategoryView::Populated(summary)) => assert_eq!(summary.name, "tech"),
            other => panic!("expected populated category, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn by_category_includes_legacy_string_posts() {
        let f = fixture();
        let modern = create(&f.svc, json!({ "title": "new", "content": "x", "category": "Tech" })).await;

        let now = Utc::now();
        f.store
            .put_post(Post {
                id: DocId::generate(),
                title: "old".into(),
                content: "y".into(),
                excerpt: None,
                author: None,
                category: Some(CategoryRef::Legacy("tech".into())),
                tags: vec![],
                cover_image: None,
                created_at: now,
                updated_at: now,
            })
            .await;

        let found = f.svc.by_category("tech").await.unwrap();
        let titles: Vec<_> = found.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["old", "new"]);
        assert!(found.iter().any(|p| p.id == modern.id));

        assert!(f.svc.by_category("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_is_literal_and_case_insensitive() {
        let f = fixture();
        create(&f.svc, json!({ "title": "Rust (2024)", "content": "x", "category": "c" })).await;
        create(&f.svc, json!({ "title": "Go", "content": "about RUST", "category": "c" })).await;
        create(&f.svc, json!({ "title": "Zig", "content": "nothing", "category": "c" })).await;

        let res = f.svc.search(Some("rust")).await.unwrap();
        assert_eq!(res.total, 2);

        let res = f.svc.search(Some("(2024)")).await.unwrap();
        assert_eq!(res.total, 1);

        assert_eq!(f.svc.search(Some("  ")).await.unwrap(), SearchResults::empty());
        assert_eq!(f.svc.search(None).await.unwrap(), SearchResults::empty());
    }

    #[tokio::test]
    async fn update_is_partial_and_missing_posts_are_not_found() {
        let f = fixture();
        let post = create(&f.svc, json!({ "title": "A", "content": "B", "category": "Tech", "tags": ["a"] })).await;

        let updated = f
            .svc
            .update(post.id.as_str(), json!({ "title": "A2", "category": "legacy-name" }))
            .await
            .unwrap();
        assert_eq!(updated.title, "A2");
        assert_eq!(updated.content, "B");
        assert_eq!(updated.tags, vec!["a"]);
        assert_eq!(updated.category, Some(CategoryView::Raw("legacy-name".into())));
        assert!(updated.updated_at >= post.updated_at);

        let err = f.svc.update(&DocId::generate().to_string(), json!({})).await.unwrap_err();
        assert_eq!(BlogError::kind_of(&err), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn get_and_remove_treat_malformed_ids_as_missing() {
        let f = fixture();
        let missing = DocId::generate().to_string();
        for id in ["nope", missing.as_str()] {
            let err = f.svc.get(id).await.unwrap_err();
            assert_eq!(BlogError::kind_of(&err), ErrorKind::NotFound);
            let err = f.svc.remove(id).await.unwrap_err();
            assert_eq!(BlogError::kind_of(&err), ErrorKind::NotFound);
        }
    }

    #[tokio::test]
    async fn by_tag_is_exact_membership() {
        let f = fixture();
        create(&f.svc, json!({ "title": "A", "content": "B", "category": "c", "tags": "rust,web" })).await;
        create(&f.svc, json!({ "title": "C", "content": "D", "category": "c", "tags": ["Rust"] })).await;

        let found = f.svc.by_tag("rust").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "A");
    }
}
