use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, Request};
use axum::routing::post;
use axum::{Extension, Json, Router};
use blog_axum::middlewares::{MultipartConfig, MultipartToJson};
use blog_axum::{axum, map_json_rejection, BlogAxumError};
use blog_core::errors::BlogError;
use blog_core::uploads::UploadedFiles;
use blog_core::BlogConfig;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn not_found() -> Result<Json<Value>, BlogAxumError> {
    Err(BlogError::not_found("Post not found").into_anyhow().into())
}

async fn boom() -> Result<Json<Value>, BlogAxumError> {
    Err(anyhow::anyhow!("boom").context("while loading posts").into())
}

async fn echo(data: Result<Json<Value>, JsonRejection>) -> Result<Json<Value>, BlogAxumError> {
    let Json(data) = data.map_err(map_json_rejection)?;
    Ok(Json(data))
}

async fn echo_with_files(
    files: Option<Extension<UploadedFiles>>,
    Json(data): Json<Value>,
) -> Json<Value> {
    let files: Vec<Value> = files
        .map(|Extension(f)| f.0)
        .unwrap_or_default()
        .into_iter()
        .map(|f| {
            json!({
                "field": f.field,
                "filename": f.filename,
                "size": f.size,
                "exists": f.temp_path.exists(),
            })
        })
        .collect();
    Json(json!({ "body": data, "files": files }))
}

fn router(env: &str, temp_dir: &std::path::Path) -> Router {
    let mut config = BlogConfig::new();
    config.set("app.env", env);

    let uploads = MultipartToJson::with_config(
        MultipartConfig::new()
            .max_file_size(16)
            .max_field_size(32)
            .max_total_size(1024)
            .allow_content_type("image/png")
            .file_field("coverImage")
            .temp_dir(temp_dir),
    );

    axum(config)
        .merge(
            Router::new()
                .route("/missing", post(not_found))
                .route("/boom", post(boom))
                .route("/echo", post(echo))
                .route("/upload", post(echo_with_files).layer(uploads)),
        )
        .with_http_layers()
        .unwrap()
        .router
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart(parts: &[(&str, Option<(&str, &str)>, &str)]) -> Request<Body> {
    let boundary = "X-BLOG-BOUNDARY";
    let mut body = String::new();
    for (name, file, value) in parts {
        body.push_str(&format!("--{boundary}\r\n"));
        match file {
            Some((filename, content_type)) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )),
            None => body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")),
        }
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{boundary}--\r\n"));

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn malformed_json_returns_bad_request() {
    let tmp = tempfile::tempdir().unwrap();
    let res = router("development", tmp.path())
        .oneshot(post_json("/echo", "{\"title\":\"x\""))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    assert!(res.headers().get("x-request-id").is_some());
    let body = json_body(res).await;
    assert_eq!(body["name"], "BadRequest");
    assert_eq!(body["code"], 400);
    assert_eq!(body["className"], "bad-request");
    assert!(body["errors"]["_schema"].is_array());
    assert!(body.get("stack").is_none());
}

#[tokio::test]
async fn request_id_is_preserved_when_provided() {
    let tmp = tempfile::tempdir().unwrap();
    let provided = HeaderValue::from_static("req-test-123");
    let mut req = post_json("/echo", "{\"title\":\"ok\"}");
    req.headers_mut().insert("x-request-id", provided.clone());

    let res = router("development", tmp.path()).oneshot(req).await.unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.headers().get("x-request-id").unwrap(), &provided);
}

#[tokio::test]
async fn blog_error_keeps_status_and_shape() {
    let tmp = tempfile::tempdir().unwrap();
    let res = router("development", tmp.path())
        .oneshot(post_json("/missing", "{}"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 404);
    let body = json_body(res).await;
    assert_eq!(body["name"], "NotFound");
    assert_eq!(body["className"], "not-found");
    assert_eq!(body["message"], "Post not found");
}

#[tokio::test]
async fn foreign_errors_are_general_errors_with_stack_outside_production() {
    let tmp = tempfile::tempdir().unwrap();
    let res = router("development", tmp.path())
        .oneshot(post_json("/boom", "{}"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert_eq!(body["name"], "GeneralError");
    assert_eq!(body["className"], "general-error");
    assert!(body["stack"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn stack_is_hidden_in_production() {
    let tmp = tempfile::tempdir().unwrap();
    let res = router("production", tmp.path())
        .oneshot(post_json("/boom", "{}"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert_eq!(body["code"], 500);
    assert!(body.get("stack").is_none());
}

#[tokio::test]
async fn multipart_becomes_json_plus_files() {
    let tmp = tempfile::tempdir().unwrap();
    let req = multipart(&[
        ("title", None, "Hello"),
        ("tags", None, "a"),
        ("tags", None, "b"),
        ("coverImage", Some(("cover.png", "image/png")), "PNGDATA"),
    ]);

    let res = router("development", tmp.path()).oneshot(req).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let body = json_body(res).await;
    assert_eq!(body["body"]["title"], "Hello");
    assert_eq!(body["body"]["tags"], json!(["a", "b"]));
    assert_eq!(body["files"][0]["field"], "coverImage");
    assert_eq!(body["files"][0]["filename"], "cover.png");
    assert_eq!(body["files"][0]["size"], 7);
    assert_eq!(body["files"][0]["exists"], true);

    // Nobody claimed the file, so it is gone once the response is out.
    let mut leftovers = tokio::fs::read_dir(tmp.path()).await.unwrap();
    assert!(leftovers.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn disallowed_file_type_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let req = multipart(&[("coverImage", Some(("notes.txt", "text/plain")), "hello")]);

    let res = router("development", tmp.path()).oneshot(req).await.unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let body = json_body(res).await;
    assert!(body["message"].as_str().unwrap().contains("not allowed"));
}

#[tokio::test]
async fn oversized_file_is_rejected_and_removed() {
    let tmp = tempfile::tempdir().unwrap();
    let req = multipart(&[("coverImage", Some(("big.png", "image/png")), "0123456789abcdefXYZ")]);

    let res = router("development", tmp.path()).oneshot(req).await.unwrap();
    assert_eq!(res.status().as_u16(), 400);

    let mut leftovers = tokio::fs::read_dir(tmp.path()).await.unwrap();
    assert!(leftovers.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn oversized_text_part_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let long_title = "t".repeat(64);
    let req = multipart(&[("title", None, long_title.as_str())]);

    let res = router("development", tmp.path()).oneshot(req).await.unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let body = json_body(res).await;
    assert_eq!(body["name"], "BadRequest");
    assert!(body["message"].as_str().unwrap().contains("'title' exceeds"));
}

#[tokio::test]
async fn body_over_total_limit_is_rejected_and_nothing_is_left_behind() {
    let tmp = tempfile::tempdir().unwrap();
    let mut parts: Vec<(&str, Option<(&str, &str)>, &str)> = vec![("coverImage", Some(("c.png", "image/png")), "PNG")];
    parts.extend(std::iter::repeat(("tags", None, "short-tag")).take(40));

    let res = router("development", tmp.path()).oneshot(multipart(&parts)).await.unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let body = json_body(res).await;
    assert_eq!(body["className"], "bad-request");

    let mut leftovers = tokio::fs::read_dir(tmp.path()).await.unwrap();
    assert!(leftovers.next_entry().await.unwrap().is_none());
}
