//! blog-server: wires the stores, services and HTTP routes together.

pub mod config;
pub mod openapi;
pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use blog_axum::middlewares::{MultipartConfig, MultipartToJson};
use blog_axum::{axum, AxumApp};
use blog_core::services::posts::posts_shared::COVER_IMAGE_FIELD;
use blog_core::uploads::UploadStore;
use blog_core::{configure, BlogConfig, MemoryStore, Stores};
use blog_mongo::MongoStore;

const COVER_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Connect the configured store backend and build the app on top of it.
pub async fn build(config: BlogConfig) -> Result<(AxumApp, Stores)> {
    let stores = connect_stores(&config).await?;
    let app = build_with_stores(config, stores.clone()).await?;
    Ok((app, stores))
}

pub async fn connect_stores(config: &BlogConfig) -> Result<Stores> {
    match config.get("store.backend").unwrap_or("mongo") {
        "memory" => {
            tracing::warn!("using the in-memory store; data is lost on restart");
            Ok(Stores::from_backend(Arc::new(MemoryStore::new())))
        }
        "mongo" => {
            let uri = config.get("store.mongo.uri").context("Missing MONGO_URI")?;
            let database = config.get("store.mongo.database").unwrap_or("blog");
            let store = MongoStore::connect(uri, database)
                .await
                .context("failed to connect to MongoDB")?;
            Ok(Stores::from_backend(Arc::new(store)))
        }
        other => bail!("Unknown STORE_BACKEND '{other}'"),
    }
}

/// Build the full router over already-connected stores.
pub async fn build_with_stores(config: BlogConfig, stores: Stores) -> Result<AxumApp> {
    let uploads = UploadStore::new(config.get("uploads.dir").unwrap_or("uploads"));
    uploads.ensure_root().await?;

    let svcs = configure(&stores, &config, uploads.clone());
    let multipart = MultipartToJson::with_config(multipart_config(&config));

    let ax = axum(config)
        .service("/", || async { "Hai there, API is running..." })
        .service("/health", || async { "ok" })
        .use_router("/api/categories", routes::categories::router(svcs.categories))
        .use_router("/api/posts", routes::posts::router(svcs.posts, multipart))
        .use_router("/api/comments", routes::comments::router(svcs.comments))
        .merge(openapi::router())
        .serve_dir("/uploads", uploads.root())
        .with_http_layers()?;

    Ok(ax)
}

fn multipart_config(config: &BlogConfig) -> MultipartConfig {
    let max_mb = config.get_u64("uploads.max_file_size_mb").unwrap_or(5);
    let temp_dir = config
        .get("uploads.tmp_dir")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);

    COVER_IMAGE_TYPES.iter().fold(
        MultipartConfig::new()
            .max_file_size(max_mb * 1024 * 1024)
            .max_total_size((max_mb + 2) * 1024 * 1024)
            .file_field(COVER_IMAGE_FIELD)
            .temp_dir(temp_dir),
        |cfg, ct| cfg.allow_content_type(ct),
    )
}
