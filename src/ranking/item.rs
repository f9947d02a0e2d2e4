//! Items and fetched pages.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{RankingError, Result};

/// Stable, opaque identifier of a rankable item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create an identifier from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An item as seen by the ranking layer: an id and its persisted rank.
///
/// Every other field of the entity is owned by the content type and never
/// touched here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier.
    pub id: ItemId,

    /// Persisted rank (name of the underlying field is set by the policy).
    pub rank: i64,
}

impl Item {
    /// Create a new item.
    pub fn new(id: impl Into<ItemId>, rank: i64) -> Self {
        Self { id: id.into(), rank }
    }
}

/// One fetched window of a paginated collection.
///
/// Items are in ascending rank order, ids are unique and the page never
/// holds more than `page_size` items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    number: u32,
    page_size: u32,
    total_pages: u32,
    items: Vec<Item>,
}

impl Page {
    /// Build a page from a fetch result, validating its invariants.
    ///
    /// `number` is 1-based.
    pub fn new(number: u32, page_size: u32, total_pages: u32, items: Vec<Item>) -> Result<Self> {
        if number == 0 {
            return Err(RankingError::InvalidPage("page numbers start at 1".to_string()));
        }
        if items.len() > page_size as usize {
            return Err(RankingError::InvalidPage(format!(
                "{} items exceed page size {}",
                items.len(),
                page_size
            )));
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(&item.id) {
                return Err(RankingError::InvalidPage(format!("duplicate item id {}", item.id)));
            }
        }

        if let Some(pair) = items.windows(2).find(|w| w[0].rank > w[1].rank) {
            return Err(RankingError::InvalidPage(format!(
                "items not in ascending rank order ({} at {} before {} at {})",
                pair[0].id, pair[0].rank, pair[1].id, pair[1].rank
            )));
        }

        Ok(Self {
            number,
            page_size,
            total_pages,
            items,
        })
    }

    /// An empty page, used as the empty state after a failed fetch.
    pub fn empty(number: u32, page_size: u32) -> Self {
        Self {
            number: number.max(1),
            page_size,
            total_pages: 0,
            items: Vec::new(),
        }
    }

    /// 1-based page number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Requested page size.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Total number of pages reported by the fetcher.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Items in canonical (fetched) order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Ids in canonical order.
    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.items.iter().map(|item| &item.id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
