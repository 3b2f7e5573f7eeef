use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a stored document: 24 lowercase hexadecimal characters,
/// the same shape as a MongoDB ObjectId.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", schema(value_type = String, example = "6650c0ffee0ddba11deadbee"))]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    pub const LEN: usize = 24;

    /// Generate a fresh id.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(hex[..Self::LEN].to_string())
    }

    /// Accept only id-shaped input: exactly 24 hex characters.
    pub fn parse(raw: &str) -> Option<Self> {
        if Self::is_id_shaped(raw) {
            Some(Self(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn is_id_shaped(raw: &str) -> bool {
        raw.len() == Self::LEN && raw.bytes().all(|b| b.is_ascii_hexdigit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for DocId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DocId::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid document id: {raw}")))
    }
}
