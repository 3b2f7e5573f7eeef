//! blog-mongo: MongoDB backend for the blog store traits.
//!
//! Collections and field names match the documents the API has always
//! written (`posts`, `categories`, `comments`, camelCase fields), so an
//! existing database can be pointed at directly.

mod documents;
pub mod filter;
mod store;

pub use store::MongoStore;
