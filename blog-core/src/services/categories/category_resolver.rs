use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::errors::{BlogError, BlogResult};
use crate::ids::DocId;
use crate::models::Category;
use crate::store::{CategoryStore, Predicate, StoreError};

use super::legacy;

/// Maps a category token onto stored categories.
#[async_trait]
pub trait CategoryResolver: Send + Sync {
    /// Find a category by name (case-insensitive) or create it.
    async fn resolve_or_create(&self, token: &str) -> BlogResult<DocId>;

    /// Build the posts filter for "posts in this category". Never fails
    /// because nothing matched.
    async fn resolve_for_query(&self, token: &str) -> BlogResult<Predicate>;
}

pub struct StoreCategoryResolver {
    categories: Arc<dyn CategoryStore>,
}

impl StoreCategoryResolver {
    pub fn new(categories: Arc<dyn CategoryStore>) -> Self {
        Self { categories }
    }
}

#[async_trait]
impl CategoryResolver for StoreCategoryResolver {
    async fn resolve_or_create(&self, token: &str) -> BlogResult<DocId> {
        let name = Category::normalize_name(token);
        if name.is_empty() {
            return Err(BlogError::bad_request("Category is required")
                .with_errors(json!({ "category": ["category is required"] }))
                .into_anyhow());
        }

        if let Some(existing) = self.categories.find_category_by_name(&name).await? {
            return Ok(existing.id);
        }

        match self.categories.insert_category(&name).await {
            Ok(created) => {
                tracing::info!(category = %created.name, id = %created.id, "created category");
                Ok(created.id)
            }
            Err(StoreError::Duplicate { .. }) => {
                // Lost a concurrent create; the winner's record should be visible now.
                tracing::debug!(category = %name, "category created concurrently, re-fetching");
                match self.categories.find_category_by_name(&name).await? {
                    Some(existing) => Ok(existing.id),
                    None => Err(BlogError::conflict(format!("Category '{name}' could not be resolved, retry"))
                        .into_anyhow()),
                }
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn resolve_for_query(&self, token: &str) -> BlogResult<Predicate> {
        let token = token.trim();
        let found = self.categories.find_category_by_name(token).await?;
        Ok(legacy::category_predicate(token, found.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::memory::MemoryStore;
    use crate::store::StoreResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports "not found" on the first lookup, as if another request
    /// inserted the same name between our lookup and our insert.
    struct RacingStore {
        inner: MemoryStore,
        stale_lookups: AtomicUsize,
        hide_forever: bool,
    }

    impl RacingStore {
        fn new(hide_forever: bool) -> Self {
            Self {
                inner: MemoryStore::new(),
                stale_lookups: AtomicUsize::new(1),
                hide_forever,
            }
        }
    }

    #[async_trait]
    impl CategoryStore for RacingStore {
        async fn insert_category(&self, name: &str) -> StoreResult<Category> {
            self.inner.insert_category(name).await
        }

        async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
            if self.hide_forever {
                return Ok(None);
            }
            if self
                .stale_lookups
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Ok(None);
            }
            self.inner.find_category_by_name(name).await
        }

        async fn list_categories(&self) -> StoreResult<Vec<Category>> {
            self.inner.list_categories().await
        }

        async fn categories_by_ids(&self, ids: &[DocId]) -> StoreResult<Vec<Category>> {
            self.inner.categories_by_ids(ids).await
        }

        async fn delete_category(&self, id: &DocId) -> StoreResult<Option<Category>> {
            self.inner.delete_category(id).await
        }
    }

    /// Case-insensitive but otherwise exact name matching, no trimming.
    struct ExactNameStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl CategoryStore for ExactNameStore {
        async fn insert_category(&self, name: &str) -> StoreResult<Category> {
            self.inner.insert_category(name).await
        }

        async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
            let all = self.inner.list_categories().await?;
            Ok(all.into_iter().find(|c| c.name.eq_ignore_ascii_case(name)))
        }

        async fn list_categories(&self) -> StoreResult<Vec<Category>> {
            self.inner.list_categories().await
        }

        async fn categories_by_ids(&self, ids: &[DocId]) -> StoreResult<Vec<Category>> {
            self.inner.categories_by_ids(ids).await
        }

        async fn delete_category(&self, id: &DocId) -> StoreResult<Option<Category>> {
            self.inner.delete_category(id).await
        }
    }

    #[tokio::test]
    async fn creates_once_and_reuses_across_casing() {
        let store = Arc::new(MemoryStore::new());
        let resolver = StoreCategoryResolver::new(store.clone());

        let first = resolver.resolve_or_create("Tech").await.unwrap();
        let second = resolver.resolve_or_create("  TECH ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.category_count().await, 1);
        let stored = store.find_category_by_name("tech").await.unwrap().unwrap();
        assert_eq!(stored.name, "tech");
    }

    #[tokio::test]
    async fn blank_token_is_rejected() {
        let resolver = StoreCategoryResolver::new(Arc::new(MemoryStore::new()));
        let err = resolver.resolve_or_create("   ").await.unwrap_err();
        assert_eq!(BlogError::kind_of(&err), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn lost_race_is_resolved_by_refetch() {
        let store = Arc::new(RacingStore::new(false));
        let winner = store.inner.insert_category("tech").await.unwrap();

        let resolver = StoreCategoryResolver::new(store.clone());
        let id = resolver.resolve_or_create("Tech").await.unwrap();

        assert_eq!(id, winner.id);
        assert_eq!(store.inner.category_count().await, 1);
    }

    #[tokio::test]
    async fn unresolvable_race_is_a_conflict() {
        let store = Arc::new(RacingStore::new(true));
        store.inner.insert_category("tech").await.unwrap();

        let resolver = StoreCategoryResolver::new(store);
        let err = resolver.resolve_or_create("tech").await.unwrap_err();
        assert_eq!(BlogError::kind_of(&err), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn query_for_known_name_uses_the_record_id() {
        let store = Arc::new(MemoryStore::new());
        let tech = store.insert_category("tech").await.unwrap();
        let resolver = StoreCategoryResolver::new(store);

        let pred = resolver.resolve_for_query("TECH").await.unwrap();
        let Predicate::Or(branches) = pred else {
            panic!("expected an Or predicate");
        };
        assert!(branches.contains(&Predicate::Eq(
            crate::store::PostField::Category,
            crate::store::FieldValue::Id(tech.id)
        )));
    }

    #[tokio::test]
    async fn query_token_is_trimmed_before_lookup() {
        let store = Arc::new(ExactNameStore {
            inner: MemoryStore::new(),
        });
        let tech = store.insert_category("tech").await.unwrap();
        let resolver = StoreCategoryResolver::new(store);

        let padded = resolver.resolve_for_query("  Tech ").await.unwrap();
        assert_eq!(padded, resolver.resolve_for_query("Tech").await.unwrap());
        let Predicate::Or(branches) = padded else {
            panic!("expected an Or predicate");
        };
        assert!(branches.contains(&Predicate::Eq(
            crate::store::PostField::Category,
            crate::store::FieldValue::Id(tech.id)
        )));
    }
}
