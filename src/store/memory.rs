//! In-memory collection.
//!
//! Behaves like the CMS listing endpoint (rank order, search, category,
//! pagination) and records every rank write. Individual ids can be made to
//! reject writes, and writes can be slowed down to observe concurrency.

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::{CollectionFetcher, FetchedPage, ListQuery, RankWriter};
use crate::dispatch::WriteError;
use crate::ranking::{Item, ItemId};

#[derive(Debug, Clone)]
struct Entry {
    id: ItemId,
    rank: i64,
    category: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Entry>,
    failing: HashSet<ItemId>,
    writes: Vec<(ItemId, i64)>,
}

/// Shared in-memory collection. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    inner: Arc<Mutex<Inner>>,
    write_delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MemoryCollection {
    /// Collection with the given ids ranked in order, starting at `first_rank`.
    pub fn with_ids<I, S>(ids: I, first_rank: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        let entries = ids
            .into_iter()
            .enumerate()
            .map(|(i, id)| Entry {
                id: id.into(),
                rank: first_rank + i as i64,
                category: None,
            })
            .collect();
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries,
                ..Default::default()
            })),
            ..Default::default()
        }
    }

    /// Delay every write by `delay`.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Put `id` in `category`.
    pub async fn set_category(&self, id: &ItemId, category: impl Into<String>) {
        let mut inner = self.inner.lock().await;
        if let Some(entry) = inner.entries.iter_mut().find(|e| &e.id == id) {
            entry.category = Some(category.into());
        }
    }

    /// Make writes to `id` fail.
    pub async fn fail_writes_for(&self, id: impl Into<ItemId>) {
        self.inner.lock().await.failing.insert(id.into());
    }

    /// Let writes to `id` through again.
    pub async fn allow_writes_for(&self, id: &ItemId) {
        self.inner.lock().await.failing.remove(id);
    }

    /// Every write received so far, in arrival order.
    pub async fn writes(&self) -> Vec<(ItemId, i64)> {
        self.inner.lock().await.writes.clone()
    }

    /// Persisted rank of `id`.
    pub async fn rank_of(&self, id: &ItemId) -> Option<i64> {
        let inner = self.inner.lock().await;
        inner.entries.iter().find(|e| &e.id == id).map(|e| e.rank)
    }

    /// Highest number of writes observed in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl CollectionFetcher for MemoryCollection {
    type Error = Infallible;

    async fn list(&self, query: &ListQuery) -> Result<FetchedPage, Infallible> {
        let inner = self.inner.lock().await;
        let search = query.filter.search_text().map(str::to_lowercase);
        let category = query.filter.category.as_option();

        let mut matching: Vec<&Entry> = inner
            .entries
            .iter()
            .filter(|e| {
                search
                    .as_deref()
                    .map_or(true, |s| e.id.as_str().to_lowercase().contains(s))
            })
            .filter(|e| category.map_or(true, |c| e.category.as_deref() == Some(c)))
            .collect();
        matching.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.id.cmp(&b.id)));

        let limit = query.limit.max(1) as usize;
        let total_pages = matching.len().div_ceil(limit) as u32;
        let start = (query.page.max(1) as usize - 1) * limit;
        let items = matching
            .into_iter()
            .skip(start)
            .take(limit)
            .map(|e| Item::new(e.id.clone(), e.rank))
            .collect();

        Ok(FetchedPage { items, total_pages })
    }
}

/// Counts one write as in flight until dropped, including when the write
/// future is abandoned.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RankWriter for MemoryCollection {
    async fn update_rank(&self, id: &ItemId, rank: i64) -> Result<(), WriteError> {
        let _in_flight = InFlight::enter(&self.in_flight, &self.peak_in_flight);

        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().await;
        if inner.failing.contains(id) {
            Err(WriteError::Rejected(format!("write to {id} refused")))
        } else if let Some(entry) = inner.entries.iter_mut().find(|e| &e.id == id) {
            entry.rank = rank;
            inner.writes.push((id.clone(), rank));
            Ok(())
        } else {
            Err(WriteError::Rejected(format!("no item {id}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{CategoryFilter, FilterState};

    fn query(page: u32, limit: u32) -> ListQuery {
        ListQuery {
            page,
            limit,
            filter: FilterState::unfiltered(),
        }
    }

    #[tokio::test]
    async fn test_list_paginates_in_rank_order() {
        let store = MemoryCollection::with_ids(["a", "b", "c", "d", "e"], 0);
        let page = store.list(&query(2, 2)).await.unwrap();
        let ids: Vec<_> = page.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d"]);
        assert_eq!(page.total_pages, 3);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let store = MemoryCollection::with_ids(["lake-1", "beach-1", "lake-2"], 1);
        store.set_category(&"lake-2".into(), "north").await;

        let mut q = query(1, 10);
        q.filter = FilterState::unfiltered().with_search("LAKE");
        assert_eq!(store.list(&q).await.unwrap().items.len(), 2);

        q.filter = FilterState::unfiltered().with_category(CategoryFilter::Only("north".into()));
        let page = store.list(&q).await.unwrap();
        assert_eq!(page.items, vec![Item::new("lake-2", 3)]);
    }

    #[tokio::test]
    async fn test_abandoned_write_leaves_flight() {
        let store = MemoryCollection::with_ids(["a", "b"], 0)
            .with_write_delay(Duration::from_secs(30));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            store.update_rank(&"a".into(), 5),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(store.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(store.peak_in_flight(), 1);
        assert_eq!(store.rank_of(&"a".into()).await, Some(0));
    }

    #[tokio::test]
    async fn test_writes_apply_and_fail() {
        let store = MemoryCollection::with_ids(["a", "b"], 0);
        store.fail_writes_for("b").await;

        store.update_rank(&"a".into(), 7).await.unwrap();
        assert!(store.update_rank(&"b".into(), 8).await.is_err());
        assert!(store.update_rank(&"zzz".into(), 1).await.is_err());

        assert_eq!(store.rank_of(&"a".into()).await, Some(7));
        assert_eq!(store.rank_of(&"b".into()).await, Some(1));
        assert_eq!(store.writes().await, vec![(ItemId::from("a"), 7)]);
    }
}
