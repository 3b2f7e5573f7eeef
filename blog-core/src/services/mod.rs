use std::sync::Arc;

use crate::config::BlogConfig;
use crate::store::Stores;
use crate::uploads::UploadStore;

pub mod categories;
pub mod comments;
pub mod posts;
pub mod types;

pub use categories::{CategoriesService, CategoryResolver, StoreCategoryResolver};
pub use comments::CommentsService;
pub use posts::{Paging, PostsService};
pub use types::MessageResponse;

/// Every service, wired to one set of store handles.
#[derive(Clone)]
pub struct BlogServices {
    pub categories: Arc<CategoriesService>,
    pub posts: Arc<PostsService>,
    pub comments: Arc<CommentsService>,
}

pub fn configure(stores: &Stores, config: &BlogConfig, uploads: UploadStore) -> BlogServices {
    let resolver: Arc<dyn CategoryResolver> = Arc::new(StoreCategoryResolver::new(stores.categories.clone()));

    BlogServices {
        categories: Arc::new(CategoriesService::new(stores.categories.clone())),
        posts: Arc::new(PostsService::new(
            stores,
            resolver,
            uploads,
            Paging::from_config(config),
        )),
        comments: Arc::new(CommentsService::new(stores)),
    }
}
