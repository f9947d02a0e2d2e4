//! Diff engine.
//!
//! Compares the order buffer with the fetched page slot by slot. Any slot
//! whose id differs gets a new rank for the id now sitting in it, so a
//! single move rewrites every item it shifted, not just the endpoints.
//! Previously persisted rank values are never consulted.

use serde::Serialize;

use super::buffer::OrderBuffer;
use super::item::{ItemId, Page};
use super::policy::RankingPolicy;

/// One rank write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankChange {
    /// Item to update.
    pub id: ItemId,

    /// New rank value.
    pub rank: i64,
}

/// Minimal set of rank writes for one save, ordered by slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Changeset {
    changes: Vec<RankChange>,
}

impl Changeset {
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankChange> {
        self.changes.iter()
    }

    /// New rank for `id`, if it changed.
    pub fn rank_of(&self, id: &ItemId) -> Option<i64> {
        self.changes.iter().find(|c| &c.id == id).map(|c| c.rank)
    }

    /// Changes as `(id, rank)` pairs.
    pub fn pairs(&self) -> Vec<(ItemId, i64)> {
        self.changes.iter().map(|c| (c.id.clone(), c.rank)).collect()
    }
}

impl IntoIterator for Changeset {
    type Item = RankChange;
    type IntoIter = std::vec::IntoIter<RankChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a Changeset {
    type Item = &'a RankChange;
    type IntoIter = std::slice::Iter<'a, RankChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

impl FromIterator<RankChange> for Changeset {
    fn from_iter<T: IntoIterator<Item = RankChange>>(iter: T) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

/// Compute the changeset turning `page` order into `buffer` order.
pub fn diff(
    page: &Page,
    buffer: &OrderBuffer,
    policy: &RankingPolicy,
    page_base_offset: i64,
) -> Changeset {
    debug_assert_eq!(page.len(), buffer.len(), "buffer and page out of sync");

    buffer
        .current()
        .iter()
        .zip(page.ids())
        .enumerate()
        .filter(|(_, (buffered, fetched))| buffered != fetched)
        .map(|(index, (buffered, _))| RankChange {
            id: buffered.clone(),
            rank: policy.rank_for(page_base_offset, index),
        })
        .collect()
}
