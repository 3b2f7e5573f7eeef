use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use blog_axum::middlewares::MultipartToJson;
use blog_axum::params::RestParams;
use blog_axum::{map_json_rejection, BlogAxumError};
use blog_core::models::PostView;
use blog_core::services::posts::posts_shared::{CreatedPost, PostPage, SearchResults};
use blog_core::services::{MessageResponse, PostsService};
use blog_core::uploads::UploadedFiles;
use serde_json::Value;

pub fn router(posts: Arc<PostsService>, uploads: MultipartToJson) -> Router {
    Router::new()
        .route("/", get(find_posts).merge(post(create_post).layer(uploads)))
        .route("/search", get(search_posts))
        .route("/category/{category}", get(posts_by_category))
        .route("/tag/{tag}", get(posts_by_tag))
        .route("/{id}", get(get_post).put(update_post).delete(delete_post))
        .with_state(posts)
}

#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "Posts",
    params(
        ("page" = Option<u64>, Query, description = "Page number, 1-based"),
        ("limit" = Option<u64>, Query, description = "Posts per page, capped at paginate.max"),
    ),
    responses((status = 200, description = "One page of posts, newest first", body = PostPage))
)]
pub async fn find_posts(
    State(posts): State<Arc<PostsService>>,
    params: RestParams,
) -> Result<Json<PostPage>, BlogAxumError> {
    let page = posts.find(params.query("page"), params.query("limit")).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/posts/search",
    tag = "Posts",
    params(("keyword" = Option<String>, Query, description = "Case-insensitive match on title or content")),
    responses((status = 200, description = "Matching posts", body = SearchResults))
)]
pub async fn search_posts(
    State(posts): State<Arc<PostsService>>,
    params: RestParams,
) -> Result<Json<SearchResults>, BlogAxumError> {
    Ok(Json(posts.search(params.query("keyword")).await?))
}

#[utoipa::path(
    get,
    path = "/api/posts/category/{category}",
    tag = "Posts",
    params(("category" = String, Path, description = "Category name or id")),
    responses((status = 200, description = "Posts in the category", body = [PostView]))
)]
pub async fn posts_by_category(
    State(posts): State<Arc<PostsService>>,
    Path(category): Path<String>,
) -> Result<Json<Vec<PostView>>, BlogAxumError> {
    Ok(Json(posts.by_category(&category).await?))
}

#[utoipa::path(
    get,
    path = "/api/posts/tag/{tag}",
    tag = "Posts",
    params(("tag" = String, Path, description = "Exact tag")),
    responses((status = 200, description = "Posts carrying the tag", body = [PostView]))
)]
pub async fn posts_by_tag(
    State(posts): State<Arc<PostsService>>,
    Path(tag): Path<String>,
) -> Result<Json<Vec<PostView>>, BlogAxumError> {
    Ok(Json(posts.by_tag(&tag).await?))
}

/// Accepts JSON or multipart form data; a `coverImage` file part is stored
/// under the uploads directory.
#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "Posts",
    request_body(
        content = blog_core::services::posts::posts_shared::CreatePostInput,
        description = "JSON body, or multipart/form-data with an optional coverImage file",
    ),
    responses(
        (status = 201, description = "Post created", body = CreatedPost),
        (status = 400, description = "Missing title, content or category"),
    )
)]
pub async fn create_post(
    State(posts): State<Arc<PostsService>>,
    files: Option<Extension<UploadedFiles>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedPost>), BlogAxumError> {
    let files = files.map(|Extension(files)| files).unwrap_or_default();
    let data = match body {
        Ok(Json(data)) => data,
        Err(rejection) => {
            files.cleanup().await;
            return Err(map_json_rejection(rejection));
        }
    };
    let created = posts.create(data, files).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    tag = "Posts",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "The post", body = PostView),
        (status = 404, description = "Post not found"),
    )
)]
pub async fn get_post(
    State(posts): State<Arc<PostsService>>,
    Path(id): Path<String>,
) -> Result<Json<PostView>, BlogAxumError> {
    Ok(Json(posts.get(&id).await?))
}

#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    tag = "Posts",
    params(("id" = String, Path, description = "Post id")),
    request_body = blog_core::services::posts::posts_shared::UpdatePostInput,
    responses(
        (status = 200, description = "The updated post", body = PostView),
        (status = 404, description = "Post not found"),
    )
)]
pub async fn update_post(
    State(posts): State<Arc<PostsService>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PostView>, BlogAxumError> {
    let Json(data) = body.map_err(map_json_rejection)?;
    Ok(Json(posts.update(&id, data).await?))
}

#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "Posts",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post deleted", body = MessageResponse),
        (status = 404, description = "Post not found"),
    )
)]
pub async fn delete_post(
    State(posts): State<Arc<PostsService>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, BlogAxumError> {
    Ok(Json(posts.remove(&id).await?))
}
