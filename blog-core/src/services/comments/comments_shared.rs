use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::Comment;
use crate::validation::non_blank;

pub const COMMENT_FIELDS_REQUIRED: &str = "All fields are required";
pub const COMMENT_NOT_FOUND: &str = "Comment not found";

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateCommentInput {
    #[serde(rename = "postId", default, deserialize_with = "non_blank")]
    #[validate(required(message = "postId is required"))]
    pub post_id: Option<String>,

    #[serde(default, deserialize_with = "non_blank")]
    #[validate(required(message = "name is required"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "non_blank")]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "non_blank")]
    #[validate(required(message = "comment is required"))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreatedComment {
    pub message: String,
    #[serde(rename = "newComment")]
    pub new_comment: Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CommentList {
    pub total: u64,
    pub comments: Vec<Comment>,
}
