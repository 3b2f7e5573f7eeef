use axum::{
    body::Body,
    extract::rejection::JsonRejection,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use blog_core::errors::BlogError;
use serde_json::{json, Value};

#[derive(Debug)]
pub struct BlogAxumError(pub anyhow::Error);

impl From<anyhow::Error> for BlogAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

/// Error chain of a failed request, carried on the response until
/// [`attach_error_stack`] decides whether clients may see it.
#[derive(Debug, Clone)]
pub(crate) struct ErrorStack(pub String);

pub fn map_json_rejection(rejection: JsonRejection) -> BlogAxumError {
    BlogError::bad_request("Failed to parse the request body as JSON")
        .with_errors(json!({"_schema": [rejection.body_text()]}))
        .into_anyhow()
        .into()
}

impl IntoResponse for BlogAxumError {
    fn into_response(self) -> Response {
        // A BlogError anywhere in the chain keeps its kind; anything else is a GeneralError.
        let safe = match BlogError::from_anyhow(&self.0) {
            Some(blog) => blog.sanitize_for_client(),
            None => BlogError::general_error(self.0.to_string()),
        };

        let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = ?self.0, kind = safe.name(), "request failed");
        } else {
            tracing::debug!(error = %self.0, kind = safe.name(), "request rejected");
        }

        let mut res = (status, Json(safe.to_json())).into_response();
        if status.is_server_error() {
            res.extensions_mut().insert(ErrorStack(format!("{:?}", self.0)));
        }
        res
    }
}

/// Response mapper installed by [`crate::AxumApp`]: adds `stack` to server
/// error bodies when `expose` is set, and always drops the carried chain.
pub(crate) async fn attach_error_stack(State(expose): State<bool>, mut res: Response) -> Response {
    let Some(ErrorStack(stack)) = res.extensions_mut().remove::<ErrorStack>() else {
        return res;
    };
    if !expose {
        return res;
    }

    let (mut parts, body) = res.into_parts();
    let bytes = match axum::body::to_bytes(body, 64 * 1024).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "could not buffer error body");
            return Response::from_parts(parts, Body::empty());
        }
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(mut obj)) => {
            obj.insert("stack".to_string(), Value::String(stack));
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(Value::Object(obj).to_string()))
        }
        _ => Response::from_parts(parts, Body::from(bytes)),
    }
}
