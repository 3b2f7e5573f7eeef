use std::sync::Arc;

use serde_json::Value;

use crate::errors::{BlogError, BlogResult};
use crate::ids::DocId;
use crate::models::NewComment;
use crate::services::posts::posts_shared::POST_NOT_FOUND;
use crate::services::types::MessageResponse;
use crate::store::{CommentStore, PostStore, Stores};
use crate::validation::validate;

use super::comments_shared::{
    CommentList, CreateCommentInput, CreatedComment, COMMENT_FIELDS_REQUIRED, COMMENT_NOT_FOUND,
};

pub struct CommentsService {
    comments: Arc<dyn CommentStore>,
    posts: Arc<dyn PostStore>,
}

impl CommentsService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            comments: stores.comments.clone(),
            posts: stores.posts.clone(),
        }
    }

    /// The post must exist when the comment is written; nothing ties them
    /// together afterwards.
    pub async fn create(&self, data: Value) -> BlogResult<CreatedComment> {
        let input: CreateCommentInput = validate(&data, COMMENT_FIELDS_REQUIRED)?;
        let post_id = input.post_id.unwrap_or_default();

        let post = match DocId::parse(&post_id) {
            Some(id) => self.posts.get_post(&id).await?,
            None => None,
        };
        let Some(post) = post else {
            return Err(BlogError::not_found(POST_NOT_FOUND).into_anyhow());
        };

        let comment = self
            .comments
            .insert_comment(NewComment {
                post_id: post.id.to_string(),
                name: input.name.unwrap_or_default(),
                email: input.email,
                comment: input.comment.unwrap_or_default(),
            })
            .await?;

        tracing::info!(comment = %comment.id, post = %comment.post_id, "added comment");

        Ok(CreatedComment {
            message: "Comment added successfully".to_string(),
            new_comment: comment,
        })
    }

    pub async fn find_by_post(&self, post_id: &str) -> BlogResult<CommentList> {
        let comments = self.comments.comments_for_post(post_id).await?;
        Ok(CommentList {
            total: comments.len() as u64,
            comments,
        })
    }

    pub async fn remove(&self, id: &str) -> BlogResult<MessageResponse> {
        let removed = match DocId::parse(id) {
            Some(id) => self.comments.delete_comment(&id).await?,
            None => None,
        };
        match removed {
            Some(_) => Ok(MessageResponse::new("Comment deleted successfully")),
            None => Err(BlogError::not_found(COMMENT_NOT_FOUND).into_anyhow()),
        }
    }
}
