//! Order buffer: the live, locally mutated id order of one page.

use super::item::{ItemId, Page};

/// Mutable ordered sequence of item ids, seeded from a page.
///
/// Only reorders are possible once seeded; the buffer always holds the same
/// set of ids as the page it was seeded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBuffer {
    ids: Vec<ItemId>,
}

impl OrderBuffer {
    /// Buffer holding a copy of the page's id order.
    pub fn from_page(page: &Page) -> Self {
        let mut buffer = Self::default();
        buffer.seed(page);
        buffer
    }

    /// Replace the contents with the page's id order, discarding any moves.
    pub fn seed(&mut self, page: &Page) {
        self.ids.clear();
        self.ids.extend(page.ids().cloned());
    }

    /// Live order, for rendering.
    pub fn current(&self) -> &[ItemId] {
        &self.ids
    }

    /// Current index of `id`.
    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.ids.iter().position(|candidate| candidate == id)
    }

    /// Array-move: remove the id at `from` and reinsert it at `to`.
    ///
    /// Every id between the two positions shifts by one slot. Returns
    /// `false` (and leaves the buffer untouched) if either index is out of
    /// range.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.ids.len() || to >= self.ids.len() {
            return false;
        }
        if from < to {
            self.ids[from..=to].rotate_left(1);
        } else if from > to {
            self.ids[to..=from].rotate_right(1);
        }
        true
    }

    /// Whether the buffer still has the page's canonical order.
    pub fn matches(&self, page: &Page) -> bool {
        self.ids.len() == page.len() && self.ids.iter().zip(page.ids()).all(|(a, b)| a == b)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
