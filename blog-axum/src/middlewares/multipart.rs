use std::collections::HashSet;
use std::path::PathBuf;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use blog_core::errors::BlogError;
use blog_core::uploads::{UploadedFile, UploadedFiles};
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tower::{Layer, Service};

use crate::BlogAxumError;

/// Configuration for multipart to JSON conversion
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Maximum size of a single file in bytes (None = unlimited)
    pub max_file_size: Option<u64>,
    /// Maximum size of a single text part in bytes (None = unlimited)
    pub max_field_size: Option<u64>,
    /// Maximum size of the whole multipart body in bytes (None = unlimited)
    pub max_total_size: Option<u64>,
    /// Allowed content types for files (empty = all allowed)
    pub allowed_content_types: HashSet<String>,
    /// Field names accepted as files (empty = any part with a filename)
    pub file_fields: HashSet<String>,
    /// Where file parts are streamed before a service claims them
    pub temp_dir: PathBuf,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_file_size: Some(5 * 1024 * 1024),
            max_field_size: Some(1024 * 1024),
            max_total_size: Some(8 * 1024 * 1024),
            allowed_content_types: HashSet::new(),
            file_fields: HashSet::new(),
            temp_dir: std::env::temp_dir(),
        }
    }
}

impl MultipartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum file size in bytes
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = Some(size);
        self
    }

    /// Set maximum text part size in bytes
    pub fn max_field_size(mut self, size: u64) -> Self {
        self.max_field_size = Some(size);
        self
    }

    /// Set maximum size of the whole body in bytes
    pub fn max_total_size(mut self, size: u64) -> Self {
        self.max_total_size = Some(size);
        self
    }

    /// Add allowed content type for files
    pub fn allow_content_type(mut self, content_type: &str) -> Self {
        self.allowed_content_types.insert(content_type.to_string());
        self
    }

    /// Add field name to treat as file
    pub fn file_field(mut self, field_name: &str) -> Self {
        self.file_fields.insert(field_name.to_string());
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }
}

/// Middleware that converts multipart/form-data requests to JSON.
///
/// Text parts become the JSON body (repeated names collect into an array).
/// File parts are streamed to `temp_dir` and attached to the request as an
/// [`UploadedFiles`] extension. Temp files nobody claimed are removed once
/// the inner service has answered.
#[derive(Clone)]
pub struct MultipartToJson {
    config: MultipartConfig,
}

impl MultipartToJson {
    pub fn new() -> Self {
        Self {
            config: MultipartConfig::default(),
        }
    }

    pub fn with_config(config: MultipartConfig) -> Self {
        Self { config }
    }
}

impl Default for MultipartToJson {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for MultipartToJson {
    type Service = MultipartToJsonService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MultipartToJsonService {
            inner,
            config: self.config.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MultipartToJsonService<S> {
    inner: S,
    config: MultipartConfig,
}

impl<S> Service<Request<Body>> for MultipartToJsonService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = self.config.clone();

        Box::pin(async move {
            let is_multipart = req
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|ct| ct.starts_with("multipart/form-data"))
                .unwrap_or(false);

            if !is_multipart {
                return inner.call(req).await;
            }

            let mut written = Vec::new();
            match convert_multipart_to_json(req, &config, &mut written).await {
                Ok(json_req) => {
                    let res = inner.call(json_req).await;
                    remove_unclaimed(&written).await;
                    res
                }
                Err(e) => {
                    remove_unclaimed(&written).await;
                    tracing::debug!(error = %e, "rejected multipart body");
                    Ok(BlogAxumError::from(e).into_response())
                }
            }
        })
    }
}

async fn remove_unclaimed(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed unclaimed upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove temp upload"),
        }
    }
}

fn bad_multipart(message: impl Into<String>) -> anyhow::Error {
    BlogError::bad_request(message).into_anyhow()
}

async fn convert_multipart_to_json(
    req: Request<Body>,
    config: &MultipartConfig,
    written: &mut Vec<PathBuf>,
) -> anyhow::Result<Request<Body>> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| bad_multipart(format!("Failed to parse multipart data: {e}")))?;

    let (mut parts, body) = req.into_parts();
    let mut limits = multer::SizeLimit::new();
    if let Some(total) = config.max_total_size {
        limits = limits.whole_stream(total);
    }
    let constraints = multer::Constraints::new().size_limit(limits);
    let mut multipart = multer::Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut fields = Map::new();
    let mut files = UploadedFiles::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_multipart(format!("Failed to parse multipart data: {e}")))?
    {
        let name = field.name().unwrap_or("unknown").to_string();
        let filename = field.file_name().map(|f| f.to_string());
        let field_type = field.content_type().map(|ct| ct.essence_str().to_string());

        let is_file_field = filename.is_some() || config.file_fields.contains(&name);
        if !is_file_field {
            let value = read_text(&mut field, &name, config.max_field_size).await?;
            push_text(&mut fields, name, value);
            continue;
        }

        if !config.file_fields.is_empty() && !config.file_fields.contains(&name) {
            return Err(bad_multipart(format!("Unexpected file field '{name}'")));
        }

        if !config.allowed_content_types.is_empty() {
            let allowed = field_type
                .as_ref()
                .map(|ct| config.allowed_content_types.contains(ct))
                .unwrap_or(false);
            if !allowed {
                return Err(bad_multipart(format!(
                    "Content type '{}' not allowed for file '{name}'",
                    field_type.as_deref().unwrap_or("unknown")
                )));
            }
        }

        tokio::fs::create_dir_all(&config.temp_dir).await?;
        let temp_path = config
            .temp_dir
            .join(format!("multipart_{}_{}", name, uuid::Uuid::new_v4().simple()));
        written.push(temp_path.clone());

        let mut temp_file = tokio::fs::File::create(&temp_path).await?;
        let mut total_size = 0u64;

        // Stream chunks directly to disk
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| bad_multipart(format!("Failed to read file '{name}': {e}")))?
        {
            total_size += chunk.len() as u64;
            if let Some(max) = config.max_file_size {
                if total_size > max {
                    return Err(bad_multipart(format!(
                        "File '{name}' exceeds maximum size of {max} bytes"
                    )));
                }
            }
            temp_file.write_all(&chunk).await?;
        }
        temp_file.flush().await?;
        drop(temp_file);

        tracing::debug!(field = %name, size = total_size, "streamed file part to disk");

        files.0.push(UploadedFile {
            field: name,
            temp_path,
            filename,
            content_type: field_type,
            size: total_size,
        });
    }

    let json_bytes = serde_json::to_vec(&Value::Object(fields))?;

    // Same method, uri and extensions; only the body changes.
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(json_bytes.len()));
    parts.extensions.insert(files);

    Ok(Request::from_parts(parts, Body::from(json_bytes)))
}

async fn read_text(field: &mut multer::Field<'_>, name: &str, max: Option<u64>) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| bad_multipart(format!("Failed to read field '{name}': {e}")))?
    {
        if let Some(max) = max {
            if (buf.len() + chunk.len()) as u64 > max {
                return Err(bad_multipart(format!(
                    "Field '{name}' exceeds maximum size of {max} bytes"
                )));
            }
        }
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf).map_err(|_| bad_multipart(format!("Field '{name}' is not valid UTF-8")))
}

fn push_text(fields: &mut Map<String, Value>, name: String, value: String) {
    match fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(Value::String(value)),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, Value::String(value)]);
        }
        None => {
            fields.insert(name, Value::String(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_text_fields_collect_into_arrays() {
        let mut fields = Map::new();
        push_text(&mut fields, "tags".into(), "a".into());
        push_text(&mut fields, "title".into(), "t".into());
        push_text(&mut fields, "tags".into(), "b".into());
        push_text(&mut fields, "tags".into(), "c".into());

        assert_eq!(fields["title"], Value::String("t".into()));
        assert_eq!(fields["tags"], serde_json::json!(["a", "b", "c"]));
    }

    #[tokio::test]
    async fn layered_service_future_can_be_spawned() {
        let inner = tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, std::convert::Infallible>(Response::new(Body::from("ok")))
        });
        let mut svc = MultipartToJson::new().layer(inner);

        let req = Request::builder()
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let res = tokio::spawn(svc.call(req)).await.unwrap().unwrap();

        assert_eq!(res.status().as_u16(), 200);
    }
}
