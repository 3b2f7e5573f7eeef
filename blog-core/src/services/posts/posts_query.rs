//! Filters and paging for post reads.

use crate::config::BlogConfig;
use crate::store::{FieldValue, PostField, Predicate, Window};

/// Configured page sizes (`paginate.default`, `paginate.max`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl Paging {
    pub fn from_config(config: &BlogConfig) -> Self {
        let defaults = Self::default();
        let max_limit = config
            .get_u64("paginate.max")
            .filter(|v| *v > 0)
            .unwrap_or(defaults.max_limit);
        let default_limit = config
            .get_u64("paginate.default")
            .filter(|v| *v > 0)
            .unwrap_or(defaults.default_limit)
            .min(max_limit);
        Self {
            default_limit,
            max_limit,
        }
    }
}

/// A clamped page request. Out-of-range input is corrected, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn parse(page: Option<&str>, limit: Option<&str>, paging: &Paging) -> Self {
        let page = match parse_int(page) {
            Some(p) if p >= 1 => p as u64,
            _ => 1,
        };

        let limit = match parse_int(limit) {
            None | Some(0) => paging.default_limit,
            Some(l) if l < 0 => 1,
            Some(l) => (l as u64).min(paging.max_limit),
        };

        Self { page, limit }
    }

    /// Skip is capped at `i64::MAX`; stores encode it signed.
    pub fn window(&self) -> Window {
        let skip = (self.page - 1).saturating_mul(self.limit).min(i64::MAX as u64);
        Window::page(skip, self.limit)
    }
}

fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
}

/// Exact, case-sensitive membership in the tag set.
pub fn tag_predicate(tag: &str) -> Predicate {
    Predicate::Eq(PostField::Tags, FieldValue::Str(tag.to_string()))
}

/// `None` for a blank keyword: callers answer with an empty result without
/// querying the store.
pub fn keyword_predicate(keyword: &str) -> Option<Predicate> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return None;
    }
    Some(Predicate::or([
        Predicate::ContainsIgnoreCase(PostField::Title, keyword.to_string()),
        Predicate::ContainsIgnoreCase(PostField::Content, keyword.to_string()),
    ]))
}
