use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use blog_axum::{map_json_rejection, BlogAxumError};
use blog_core::models::Category;
use blog_core::services::categories::categories_shared::CreateCategoryInput;
use blog_core::services::{CategoriesService, MessageResponse};
use serde_json::Value;

pub fn router(categories: Arc<CategoriesService>) -> Router {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/{id}", delete(delete_category))
        .with_state(categories)
}

#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "Categories",
    request_body = CreateCategoryInput,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Missing name"),
    )
)]
pub async fn create_category(
    State(categories): State<Arc<CategoriesService>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>), BlogAxumError> {
    let Json(data) = body.map_err(map_json_rejection)?;
    let created = categories.create(data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "Categories",
    responses((status = 200, description = "All categories", body = [Category]))
)]
pub async fn list_categories(
    State(categories): State<Arc<CategoriesService>>,
) -> Result<Json<Vec<Category>>, BlogAxumError> {
    Ok(Json(categories.find().await?))
}

/// Succeeds whether or not the category existed.
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    tag = "Categories",
    params(("id" = String, Path, description = "Category id")),
    responses((status = 200, description = "Category deleted", body = MessageResponse))
)]
pub async fn delete_category(
    State(categories): State<Arc<CategoriesService>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, BlogAxumError> {
    Ok(Json(categories.remove(&id).await?))
}
