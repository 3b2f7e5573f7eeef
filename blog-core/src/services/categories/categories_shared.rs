use serde::Deserialize;
use validator::Validate;

use crate::validation::non_blank;

pub const CATEGORY_NAME_REQUIRED: &str = "Category name is required";

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateCategoryInput {
    #[serde(default, deserialize_with = "non_blank")]
    #[validate(required(message = "name is required"))]
    pub name: Option<String>,
}
