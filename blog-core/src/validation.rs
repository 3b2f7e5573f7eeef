use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use validator::Validate;

use crate::errors::BlogError;

fn friendly_message(code: &str) -> Option<&'static str> {
    match code {
        "required" => Some("is required"),
        "email" => Some("must be a valid email"),
        "length" => Some("has invalid length"),
        _ => None,
    }
}

/// Field -> list of messages, the shape clients get under `errors`.
#[derive(Debug, Default)]
pub struct FieldErrors {
    map: Map<String, Value>,
}

impl FieldErrors {
    pub fn push_field(&mut self, field: &str, msg: impl Into<String>) {
        let msg = Value::String(msg.into());
        match self.map.get_mut(field) {
            Some(Value::Array(arr)) => arr.push(msg),
            _ => {
                self.map.insert(field.to_string(), Value::Array(vec![msg]));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn into_bad_request(self, message: &str) -> anyhow::Error {
        BlogError::bad_request(message)
            .with_errors(Value::Object(self.map))
            .into_anyhow()
    }
}

fn push_validation_errors(out: &mut FieldErrors, prefix: &str, errs: &validator::ValidationErrors) {
    for (field, kind) in errs.errors() {
        let key = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            validator::ValidationErrorsKind::Field(field_errors) => {
                for e in field_errors {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .or_else(|| friendly_message(&e.code).map(|m| m.to_string()))
                        .unwrap_or_else(|| e.code.to_string());
                    out.push_field(&key, msg);
                }
            }
            validator::ValidationErrorsKind::Struct(nested) => {
                push_validation_errors(out, &key, nested.as_ref());
            }
            validator::ValidationErrorsKind::List(list) => {
                for (idx, nested) in list {
                    push_validation_errors(out, &format!("{key}[{idx}]"), nested.as_ref());
                }
            }
        }
    }
}

/// Parse a JSON payload into `T` and run its `validator` rules.
///
/// Both failure modes become a `BadRequest` carrying `message`; shape
/// errors are reported under `errors._schema`, rule violations per field.
pub fn validate<T>(data: &Value, message: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = serde_json::from_value(data.clone()).map_err(|e| {
        BlogError::bad_request(message)
            .with_errors(json!({ "_schema": [e.to_string()] }))
            .into_anyhow()
    })?;

    parsed.validate().map_err(|e| {
        let mut out = FieldErrors::default();
        push_validation_errors(&mut out, "", &e);
        out.into_bad_request(message)
    })?;

    Ok(parsed)
}

/// `deserialize_with` helper: whitespace-only strings count as absent, so
/// `#[validate(required)]` rejects them too. Other values are kept as sent.
pub fn non_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Payload {
        #[serde(default, deserialize_with = "non_blank")]
        #[validate(required(message = "name is required"))]
        name: Option<String>,

        #[serde(default, deserialize_with = "non_blank")]
        #[validate(email)]
        email: Option<String>,
    }

    #[test]
    fn blank_required_fields_are_reported_per_field() {
        let err = validate::<Payload>(&json!({ "name": "   ", "email": "nope" }), "Invalid payload").unwrap_err();
        let blog = BlogError::from_anyhow(&err).expect("must be BlogError");

        assert_eq!(blog.kind, ErrorKind::BadRequest);
        assert_eq!(blog.message, "Invalid payload");
        let errors = blog.errors.as_ref().unwrap();
        assert_eq!(errors["name"], json!(["name is required"]));
        assert_eq!(errors["email"], json!(["must be a valid email"]));
    }

    #[test]
    fn shape_errors_land_under_schema() {
        let err = validate::<Payload>(&json!({ "name": 42 }), "Invalid payload").unwrap_err();
        let blog = BlogError::from_anyhow(&err).unwrap();
        assert!(blog.errors.as_ref().unwrap()["_schema"].is_array());
    }

    #[test]
    fn present_values_are_kept_as_sent() {
        let ok = validate::<Payload>(&json!({ "name": "  Ada " }), "Invalid payload").unwrap();
        assert_eq!(ok.name.as_deref(), Some("  Ada "));
        assert!(ok.email.is_none());
    }
}
