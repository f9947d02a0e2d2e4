//! Filter guard.
//!
//! Ranks are only meaningful relative to the whole collection, so reordering
//! is allowed only while the list is unfiltered. A narrowed view silently
//! disarms ranking mode; it is never reported as an error.

use serde::{Deserialize, Serialize};

/// Categorical filter applied to a list view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryFilter {
    /// No narrowing.
    #[default]
    All,

    /// Only items in the named category.
    Only(String),
}

impl CategoryFilter {
    /// Parse a UI/CLI value; `""` and `"all"` mean no narrowing.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Only(value.to_string())
        }
    }

    /// Category name, if narrowing.
    pub fn as_option(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Only(name) => Some(name.as_str()),
        }
    }
}

/// Active search and filter state of a list view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Free-text search.
    pub search: String,

    /// Categorical filter.
    pub category: CategoryFilter,
}

impl FilterState {
    /// Unfiltered view.
    pub fn unfiltered() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    /// Search text with surrounding whitespace removed, if any.
    pub fn search_text(&self) -> Option<&str> {
        let trimmed = self.search.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Whether the view shows the full collection order.
///
/// Whitespace-only search text counts as empty.
pub fn can_rank(filter: &FilterState) -> bool {
    filter.search_text().is_none() && filter.category == CategoryFilter::All
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfiltered_can_rank() {
        assert!(can_rank(&FilterState::unfiltered()));
        assert!(can_rank(&FilterState::unfiltered().with_search("   ")));
    }

    #[test]
    fn test_search_blocks_ranking() {
        assert!(!can_rank(&FilterState::unfiltered().with_search("beach")));
    }

    #[test]
    fn test_category_blocks_ranking() {
        let filter = FilterState::unfiltered().with_category(CategoryFilter::Only("north".into()));
        assert!(!can_rank(&filter));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(CategoryFilter::parse(""), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse("ALL"), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse(" hiking "),
            CategoryFilter::Only("hiking".into())
        );
        assert_eq!(CategoryFilter::parse("hiking").as_option(), Some("hiking"));
    }
}
