pub mod categories_service;
pub mod categories_shared;
pub mod category_resolver;
pub mod legacy;

pub use categories_service::CategoriesService;
pub use category_resolver::{CategoryResolver, StoreCategoryResolver};
pub use legacy::CategoryToken;
