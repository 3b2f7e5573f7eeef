//! Translation of store predicates into MongoDB query documents.

use blog_core::ids::DocId;
use blog_core::store::{FieldValue, Predicate, StoreError, StoreResult};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};

pub fn object_id(id: &DocId) -> StoreResult<ObjectId> {
    ObjectId::parse_str(id.as_str()).map_err(StoreError::backend)
}

fn operand(value: &FieldValue) -> StoreResult<Bson> {
    Ok(match value {
        FieldValue::Str(s) => Bson::String(s.clone()),
        FieldValue::Id(id) => Bson::ObjectId(object_id(id)?),
    })
}

/// Equality on an array field matches any element, which is exactly the
/// tag-membership semantics posts need.
pub fn to_document(filter: &Predicate) -> StoreResult<Document> {
    Ok(match filter {
        Predicate::All => doc! {},
        Predicate::Eq(field, value) => {
            let mut d = Document::new();
            d.insert(field.key(), operand(value)?);
            d
        }
        Predicate::ContainsIgnoreCase(field, needle) => {
            let mut d = Document::new();
            d.insert(field.key(), doc! { "$regex": regex::escape(needle), "$options": "i" });
            d
        }
        Predicate::Or(branches) if branches.is_empty() => doc! { "_id": { "$in": [] } },
        Predicate::Or(branches) => {
            let branches = branches
                .iter()
                .map(|b| to_document(b).map(Bson::Document))
                .collect::<StoreResult<Vec<_>>>()?;
            doc! { "$or": branches }
        }
    })
}
