use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use blog_axum::{map_json_rejection, BlogAxumError};
use blog_core::services::comments::comments_shared::{CommentList, CreateCommentInput, CreatedComment};
use blog_core::services::{CommentsService, MessageResponse};
use serde_json::Value;

pub fn router(comments: Arc<CommentsService>) -> Router {
    Router::new()
        .route("/", post(create_comment))
        // GET takes a post id, DELETE a comment id.
        .route("/{id}", get(comments_for_post).delete(delete_comment))
        .with_state(comments)
}

#[utoipa::path(
    post,
    path = "/api/comments",
    tag = "Comments",
    request_body = CreateCommentInput,
    responses(
        (status = 201, description = "Comment created", body = CreatedComment),
        (status = 400, description = "Missing postId, name or comment"),
        (status = 404, description = "Post not found"),
    )
)]
pub async fn create_comment(
    State(comments): State<Arc<CommentsService>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedComment>), BlogAxumError> {
    let Json(data) = body.map_err(map_json_rejection)?;
    let created = comments.create(data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/comments/{postId}",
    tag = "Comments",
    params(("postId" = String, Path, description = "Post id")),
    responses((status = 200, description = "Comments of the post, newest first", body = CommentList))
)]
pub async fn comments_for_post(
    State(comments): State<Arc<CommentsService>>,
    Path(post_id): Path<String>,
) -> Result<Json<CommentList>, BlogAxumError> {
    Ok(Json(comments.find_by_post(&post_id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/comments/{id}",
    tag = "Comments",
    params(("id" = String, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment deleted", body = MessageResponse),
        (status = 404, description = "Comment not found"),
    )
)]
pub async fn delete_comment(
    State(comments): State<Arc<CommentsService>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, BlogAxumError> {
    Ok(Json(comments.remove(&id).await?))
}
