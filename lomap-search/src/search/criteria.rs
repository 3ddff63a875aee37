//! Structured filter criteria for the map search

use serde::{Deserialize, Serialize};

/// Category sentinel meaning "any category"
pub const ALL_CATEGORIES: &str = "all";

/// Keyword, category and radius tuple driving product selection
///
/// Built fresh for every search submission and replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Substring to look for in name or description; empty matches all
    #[serde(default)]
    pub keyword: String,
    /// Exact category label, or [`ALL_CATEGORIES`] / empty for any
    #[serde(default = "default_category")]
    pub category: String,
    /// Maximum distance from the user in kilometers; `None` is unbounded
    #[serde(default)]
    pub radius_km: Option<f64>,
}

fn default_category() -> String {
    ALL_CATEGORIES.to_string()
}

impl FilterCriteria {
    /// Criteria that match the whole catalog
    pub fn match_all() -> Self {
        Self {
            keyword: String::new(),
            category: default_category(),
            radius_km: None,
        }
    }

    /// Plain substring search on `keyword`, any category, any distance
    pub fn keyword_only(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            ..Self::match_all()
        }
    }

    pub fn matches_any_category(&self) -> bool {
        self.category.is_empty() || self.category == ALL_CATEGORIES
    }

    /// True when the distance predicate is active and needs a user location
    pub fn needs_location(&self) -> bool {
        self.radius_km.is_some()
    }

    /// A radius, when present, must be a finite non-negative distance
    pub fn has_usable_radius(&self) -> bool {
        self.radius_km.map_or(true, |r| r.is_finite() && r >= 0.0)
    }
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self::match_all()
    }
}
