//! blog-core: models, store contract and services for the blog API.
//!
//! Nothing in here knows about HTTP. The axum layer hands services JSON
//! payloads and uploaded files, and gets back typed responses or a
//! [`BlogError`] inside `anyhow::Error`.

pub mod config;
pub mod errors;
pub mod ids;
pub mod memory;
pub mod models;
pub mod services;
pub mod store;
pub mod uploads;
pub mod validation;

pub use config::BlogConfig;
pub use errors::{BlogError, BlogResult, ErrorKind};
pub use ids::DocId;
pub use memory::MemoryStore;
pub use services::{configure, BlogServices};
pub use store::{Stores, StoreError, StoreResult};
