use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use blog_core::models::{Category, Comment, Post, PostView};
use blog_core::services::comments::comments_shared::{CommentList, CreatedComment};
use blog_core::services::posts::posts_shared::{CreatedPost, PostPage, SearchResults};
use blog_core::services::MessageResponse;

use crate::routes::{categories, comments, posts};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Blog API",
        version = "1.0.0",
        description = "Posts, categories and comments for a blog front end"
    ),
    paths(
        categories::create_category,
        categories::list_categories,
        categories::delete_category,
        posts::find_posts,
        posts::search_posts,
        posts::posts_by_category,
        posts::posts_by_tag,
        posts::create_post,
        posts::get_post,
        posts::update_post,
        posts::delete_post,
        comments::create_comment,
        comments::comments_for_post,
        comments::delete_comment,
    ),
    components(schemas(
        Category,
        Post,
        PostView,
        PostPage,
        SearchResults,
        CreatedPost,
        Comment,
        CommentList,
        CreatedComment,
        MessageResponse,
    )),
    tags(
        (name = "Posts", description = "Blog post management"),
        (name = "Categories", description = "Category management"),
        (name = "Comments", description = "Comments on posts"),
    )
)]
pub struct ApiDoc;

/// Swagger UI at `/api-docs/`, backed by the generated document.
pub fn router() -> Router {
    Router::new().merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
