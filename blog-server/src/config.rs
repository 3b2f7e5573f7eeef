use std::env;

use anyhow::{bail, Result};
use blog_core::BlogConfig;

/// Build the application configuration from the process environment.
pub fn from_env() -> Result<BlogConfig> {
    let mut config = BlogConfig::new();
    configure(&mut config, env::vars().collect())?;
    Ok(config)
}

/// Populate `config` from `vars`, then apply `BLOG__A__B` overrides.
pub fn configure(config: &mut BlogConfig, vars: Vec<(String, String)>) -> Result<()> {
    let lookup = |key: &str| {
        vars.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    configure_http(config, &lookup);
    configure_store(config, &lookup);
    configure_uploads(config, &lookup);
    configure_paginate(config);

    config.load_env_overrides("BLOG__", vars.iter().cloned());
    validate(config)
}

fn configure_http(config: &mut BlogConfig, lookup: &dyn Fn(&str) -> Option<String>) {
    let host = lookup("HTTP_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
    let port = lookup("PORT").unwrap_or_else(|| "3001".to_string());
    let origin = lookup("FRONT_END_URL").unwrap_or_else(|| "http://localhost:3000".to_string());
    let env = lookup("APP_ENV")
        .or_else(|| lookup("NODE_ENV"))
        .unwrap_or_else(|| "development".to_string());

    config.set("http.host", host);
    config.set("http.port", port);
    config.set("http.cors.origin", origin);
    config.set("app.env", env);
}

fn configure_store(config: &mut BlogConfig, lookup: &dyn Fn(&str) -> Option<String>) {
    let backend = lookup("STORE_BACKEND").unwrap_or_else(|| "mongo".to_string());
    config.set("store.backend", backend.to_lowercase());

    if let Some(uri) = lookup("MONGO_URI") {
        config.set("store.mongo.uri", uri);
    }
    config.set(
        "store.mongo.database",
        lookup("MONGO_DB").unwrap_or_else(|| "blog".to_string()),
    );
}

fn configure_uploads(config: &mut BlogConfig, lookup: &dyn Fn(&str) -> Option<String>) {
    config.set("uploads.dir", lookup("UPLOADS_DIR").unwrap_or_else(|| "uploads".to_string()));
    if let Some(tmp) = lookup("UPLOADS_TMP_DIR") {
        config.set("uploads.tmp_dir", tmp);
    }
    config.set(
        "uploads.max_file_size_mb",
        lookup("UPLOADS_MAX_FILE_SIZE_MB").unwrap_or_else(|| "5".to_string()),
    );
}

fn configure_paginate(config: &mut BlogConfig) {
    config.set_default("paginate.default", "20");
    config.set_default("paginate.max", "100");
}

fn validate(config: &BlogConfig) -> Result<()> {
    match config.get("store.backend") {
        Some("memory") => {}
        Some("mongo") => {
            if config.get("store.mongo.uri").is_none() {
                bail!("Missing MONGO_URI (required when STORE_BACKEND=mongo)");
            }
        }
        other => bail!("Unknown STORE_BACKEND '{}'", other.unwrap_or_default()),
    }

    if config.get_u64("http.port").is_none() {
        bail!("Invalid PORT '{}'", config.get("http.port").unwrap_or_default());
    }
    if config.get_u64("uploads.max_file_size_mb").is_none() {
        bail!(
            "Invalid UPLOADS_MAX_FILE_SIZE_MB '{}'",
            config.get("uploads.max_file_size_mb").unwrap_or_default()
        );
    }
    Ok(())
}
