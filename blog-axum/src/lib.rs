//! blog-axum: Axum adapter for the blog API.
//!
//! Builds the router shell (tracing, request ids, CORS, static files),
//! translates `anyhow` errors carrying a `BlogError` into JSON responses,
//! and turns multipart form posts into JSON bodies plus uploaded files.

pub mod app;
pub mod middlewares;
pub mod params;
mod error;
pub use error::{map_json_rejection, BlogAxumError};

pub use app::{axum, AxumApp};
