use std::collections::HashMap;

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use blog_core::errors::BlogError;
use serde_json::json;

use crate::BlogAxumError;

/// Query string parameters handed to handlers.
#[derive(Debug, Clone, Default)]
pub struct RestParams {
    pub query: HashMap<String, String>,
}

impl RestParams {
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }
}

impl<S> FromRequestParts<S> for RestParams
where
    S: Send + Sync,
{
    type Rejection = BlogAxumError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri).map_err(|e| {
            BlogAxumError::from(
                BlogError::bad_request("Failed to parse the query string")
                    .with_errors(json!({"_query": [e.body_text()]}))
                    .into_anyhow(),
            )
        })?;

        Ok(Self { query })
    }
}
