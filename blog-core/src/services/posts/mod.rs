pub mod posts_query;
pub mod posts_service;
pub mod posts_shared;

pub use posts_query::{PageRequest, Paging};
pub use posts_service::PostsService;
