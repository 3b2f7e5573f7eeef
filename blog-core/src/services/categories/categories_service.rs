use std::sync::Arc;

use serde_json::Value;

use crate::errors::{BlogError, BlogResult};
use crate::ids::DocId;
use crate::models::Category;
use crate::services::types::MessageResponse;
use crate::store::CategoryStore;
use crate::validation::validate;

use super::categories_shared::{CreateCategoryInput, CATEGORY_NAME_REQUIRED};

pub struct CategoriesService {
    categories: Arc<dyn CategoryStore>,
}

impl CategoriesService {
    pub fn new(categories: Arc<dyn CategoryStore>) -> Self {
        Self { categories }
    }

    pub async fn create(&self, data: Value) -> BlogResult<Category> {
        let input: CreateCategoryInput = validate(&data, CATEGORY_NAME_REQUIRED)?;
        let name = Category::normalize_name(&input.name.unwrap_or_default());

        match self.categories.insert_category(&name).await {
            Ok(category) => Ok(category),
            Err(err) if err.is_duplicate() => Err(BlogError::conflict(format!("Category '{name}' already exists"))
                .with_source(err.into())
                .into_anyhow()),
            Err(other) => Err(other.into()),
        }
    }

    pub async fn find(&self) -> BlogResult<Vec<Category>> {
        Ok(self.categories.list_categories().await?)
    }

    /// Deleting an unknown id still reports success.
    pub async fn remove(&self, id: &str) -> BlogResult<MessageResponse> {
        if let Some(id) = DocId::parse(id) {
            if self.categories.delete_category(&id).await?.is_none() {
                tracing::debug!(%id, "delete of unknown category");
            }
        }
        Ok(MessageResponse::new("Category deleted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::memory::MemoryStore;
    use serde_json::json;

    fn service() -> (Arc<MemoryStore>, CategoriesService) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), CategoriesService::new(store))
    }

    #[tokio::test]
    async fn create_normalizes_and_rejects_duplicates() {
        let (_, svc) = service();
        let created = svc.create(json!({ "name": "  Rust " })).await.unwrap();
        assert_eq!(created.name, "rust");

        let err = svc.create(json!({ "name": "RUST" })).await.unwrap_err();
        assert_eq!(BlogError::kind_of(&err), ErrorKind::Conflict);

        // The store error stays in the chain for logs but never reaches clients.
        let blog = BlogError::from_anyhow(&err).unwrap();
        assert!(blog.source.is_some());
        assert!(blog.sanitize_for_client().source.is_none());
    }

    #[tokio::test]
    async fn create_requires_a_name() {
        let (_, svc) = service();
        let err = svc.create(json!({})).await.unwrap_err();
        let blog = BlogError::from_anyhow(&err).unwrap();
        assert_eq!(blog.kind, ErrorKind::BadRequest);
        assert_eq!(blog.message, "Category name is required");
    }

    #[tokio::test]
    async fn find_is_sorted_by_name() {
        let (_, svc) = service();
        for name in ["web", "ai", "rust"] {
            svc.create(json!({ "name": name })).await.unwrap();
        }
        let names: Vec<_> = svc.find().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["ai", "rust", "web"]);
    }

    #[tokio::test]
    async fn remove_reports_success_for_unknown_ids() {
        let (store, svc) = service();
        let created = svc.create(json!({ "name": "rust" })).await.unwrap();

        let res = svc.remove(created.id.as_str()).await.unwrap();
        assert_eq!(res.message, "Category deleted");
        assert_eq!(store.category_count().await, 0);

        assert!(svc.remove(created.id.as_str()).await.is_ok());
        assert!(svc.remove("not-an-id").await.is_ok());
    }
}
