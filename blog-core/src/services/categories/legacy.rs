//! Category matching for posts written before categories became references.
//!
//! Older posts carry the category name inline. Until those records are
//! backfilled, filtering by category has to match both encodings. Once no
//! legacy strings remain, `resolve_for_query` can collapse to a plain id
//! lookup and this module can go.

use crate::ids::DocId;
use crate::models::Category;
use crate::store::{FieldValue, PostField, Predicate};

/// A user-supplied category token, classified by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryToken {
    ByName(String),
    ById(DocId),
}

impl CategoryToken {
    pub fn classify(raw: &str) -> Self {
        match DocId::parse(raw) {
            Some(id) => CategoryToken::ById(id),
            None => CategoryToken::ByName(raw.to_string()),
        }
    }
}

/// Posts filter for a category token. `found` is the category whose name
/// matched the token, if any.
///
/// 1. known name: the record's id, or the token as a legacy string
/// 2. id-shaped token: the token as a string, or as a reference
/// 3. anything else: the token as a legacy string
pub fn category_predicate(raw: &str, found: Option<&Category>) -> Predicate {
    let legacy = Predicate::Eq(PostField::Category, FieldValue::Str(raw.to_string()));

    if let Some(category) = found {
        return Predicate::or([
            Predicate::Eq(PostField::Category, FieldValue::Id(category.id.clone())),
            legacy,
        ]);
    }

    match CategoryToken::classify(raw) {
        CategoryToken::ById(id) => Predicate::or([legacy, Predicate::Eq(PostField::Category, FieldValue::Id(id))]),
        CategoryToken::ByName(_) => legacy,
    }
}
