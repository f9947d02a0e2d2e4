//! Persistence dispatcher.
//!
//! Issues one rank write per changeset entry, concurrently, and waits for
//! all of them to settle. Concurrency is capped by
//! [`DispatcherConfig::max_concurrent`] (`None` puts the whole changeset in
//! flight at once).
//!
//! Partial failure policy: writes that succeeded stay applied. Nothing is
//! rolled back and nothing is retried; the report carries every item's
//! outcome so the caller can decide what to surface.

pub mod cancel;

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ranking::{Changeset, ItemId};
use crate::store::RankWriter;

pub use cancel::{CancellationSource, CancellationToken};

/// Why a single rank write did not land.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Write cancelled")]
    Cancelled,
}

/// When the page is refetched after a dispatch settles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Refetch only when every write succeeded. On failure the buffer keeps
    /// the curator's order so the save can be retried.
    #[default]
    OnSuccess,

    /// Refetch regardless of outcome. After a partial failure the page then
    /// shows whatever mix of old and new ranks the server holds.
    Always,
}

impl RefreshPolicy {
    pub fn should_refresh(&self, succeeded: bool) -> bool {
        match self {
            Self::OnSuccess => succeeded,
            Self::Always => true,
        }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Maximum writes in flight. `None` = unbounded.
    pub max_concurrent: Option<usize>,

    /// Refetch policy after the batch settles.
    pub refresh: RefreshPolicy,
}

/// Outcome of one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub id: ItemId,
    pub rank: i64,
    pub result: Result<(), WriteError>,
}

impl ItemOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-item results of one dispatch, in changeset order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    outcomes: Vec<ItemOutcome>,
}

impl DispatchReport {
    pub fn outcomes(&self) -> &[ItemOutcome] {
        &self.outcomes
    }

    /// Every write landed.
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().all(ItemOutcome::is_ok)
    }

    /// Writes that landed.
    pub fn applied(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| o.is_ok())
    }

    /// Writes that did not land.
    pub fn failed(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    /// Whether any write was abandoned because of cancellation.
    pub fn was_cancelled(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.result == Err(WriteError::Cancelled))
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Fans a changeset out to a [`RankWriter`].
pub struct Dispatcher<W> {
    writer: W,
    config: DispatcherConfig,
}

impl<W: RankWriter + Sync> Dispatcher<W> {
    pub fn new(writer: W, config: DispatcherConfig) -> Self {
        Self { writer, config }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Write every change and wait for all writes to settle.
    ///
    /// Once `cancel` fires, writes still pending settle as
    /// [`WriteError::Cancelled`] and writes not yet started are skipped.
    pub async fn dispatch(&self, changeset: &Changeset, cancel: &CancellationToken) -> DispatchReport {
        let limit = self
            .config
            .max_concurrent
            .unwrap_or(changeset.len())
            .max(1);

        info!(changes = changeset.len(), max_concurrent = limit, "Dispatching rank writes");

        let mut settled: Vec<(usize, ItemOutcome)> = stream::iter(changeset.iter().enumerate())
            .map(|(slot, change)| async move {
                let result = if cancel.is_cancelled() {
                    Err(WriteError::Cancelled)
                } else {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(WriteError::Cancelled),
                        result = self.writer.update_rank(&change.id, change.rank) => result,
                    }
                };

                match &result {
                    Ok(()) => debug!(item = %change.id, rank = change.rank, "Rank written"),
                    Err(e) => warn!(item = %change.id, rank = change.rank, error = %e, "Rank write failed"),
                }

                (
                    slot,
                    ItemOutcome {
                        id: change.id.clone(),
                        rank: change.rank,
                        result,
                    },
                )
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        settled.sort_by_key(|(slot, _)| *slot);
        let report = DispatchReport {
            outcomes: settled.into_iter().map(|(_, outcome)| outcome).collect(),
        };

        info!(
            applied = report.applied().count(),
            failed = report.failed().count(),
            "Rank writes settled"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::ranking::RankChange;
    use crate::store::MemoryCollection;

    fn changeset(pairs: &[(&str, i64)]) -> Changeset {
        pairs
            .iter()
            .map(|(id, rank)| RankChange {
                id: (*id).into(),
                rank: *rank,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_all_writes_succeed() {
        let store = MemoryCollection::with_ids(["a", "b", "c"], 0);
        let dispatcher = Dispatcher::new(store.clone(), DispatcherConfig::default());

        let report = dispatcher
            .dispatch(&changeset(&[("a", 2), ("c", 0)]), &CancellationToken::never())
            .await;

        assert!(report.succeeded());
        assert_eq!(report.len(), 2);
        assert_eq!(store.rank_of(&"a".into()).await, Some(2));
        assert_eq!(store.rank_of(&"c".into()).await, Some(0));
    }

    #[tokio::test]
    async fn test_empty_changeset_succeeds_without_writes() {
        let store = MemoryCollection::with_ids(["a"], 0);
        let dispatcher = Dispatcher::new(store.clone(), DispatcherConfig::default());

        let report = dispatcher.dispatch(&Changeset::default(), &CancellationToken::never()).await;
        assert!(report.is_empty());
        assert!(report.succeeded());
        assert!(store.writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_leaves_applied_writes() {
        let store = MemoryCollection::with_ids(["A", "B", "C", "D", "E", "F"], 1);
        store.fail_writes_for("C").await;
        let dispatcher = Dispatcher::new(store.clone(), DispatcherConfig::default());

        let changes = changeset(&[("E", 2), ("B", 3), ("C", 4), ("D", 5)]);
        let report = dispatcher.dispatch(&changes, &CancellationToken::never()).await;

        assert!(!report.succeeded());
        let failed: Vec<_> = report.failed().map(|o| o.id.as_str()).collect();
        assert_eq!(failed, vec!["C"]);
        assert_eq!(report.applied().count(), 3);

        // Mixed state: the three successful writes are not rolled back.
        assert_eq!(store.rank_of(&"E".into()).await, Some(2));
        assert_eq!(store.rank_of(&"B".into()).await, Some(3));
        assert_eq!(store.rank_of(&"D".into()).await, Some(5));
        assert_eq!(store.rank_of(&"C".into()).await, Some(3));
        assert_eq!(store.writes().await.len(), 3);
    }

    #[tokio::test]
    async fn test_report_keeps_changeset_order() {
        let store = MemoryCollection::with_ids(["a", "b", "c", "d"], 0)
            .with_write_delay(Duration::from_millis(5));
        let dispatcher = Dispatcher::new(store, DispatcherConfig::default());

        let changes = changeset(&[("d", 0), ("a", 1), ("b", 2), ("c", 3)]);
        let report = dispatcher.dispatch(&changes, &CancellationToken::never()).await;
        let ids: Vec<_> = report.outcomes().iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_concurrency_cap() {
        let ids: Vec<String> = (0..8).map(|i| format!("item-{i}")).collect();
        let store = MemoryCollection::with_ids(ids.clone(), 0)
            .with_write_delay(Duration::from_millis(20));
        let dispatcher = Dispatcher::new(
            store.clone(),
            DispatcherConfig {
                max_concurrent: Some(2),
                ..Default::default()
            },
        );

        let changes: Changeset = ids
            .iter()
            .enumerate()
            .map(|(index, id)| RankChange {
                id: id.as_str().into(),
                rank: 100 + index as i64,
            })
            .collect();
        let report = dispatcher.dispatch(&changes, &CancellationToken::never()).await;

        assert!(report.succeeded());
        assert_eq!(store.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_unbounded_puts_everything_in_flight() {
        let ids: Vec<String> = (0..6).map(|i| format!("item-{i}")).collect();
        let store = MemoryCollection::with_ids(ids.clone(), 0)
            .with_write_delay(Duration::from_millis(20));
        let dispatcher = Dispatcher::new(store.clone(), DispatcherConfig::default());

        let changes: Changeset = ids
            .iter()
            .enumerate()
            .map(|(index, id)| RankChange {
                id: id.as_str().into(),
                rank: 10 + index as i64,
            })
            .collect();
        dispatcher.dispatch(&changes, &CancellationToken::never()).await;
        assert_eq!(store.peak_in_flight(), 6);
    }

    #[tokio::test]
    async fn test_cancel_abandons_pending_writes() {
        let store = MemoryCollection::with_ids(["a", "b", "c"], 0)
            .with_write_delay(Duration::from_secs(30));
        let dispatcher = Dispatcher::new(store.clone(), DispatcherConfig::default());
        let source = CancellationSource::new();
        let token = source.token();

        let changes = changeset(&[("a", 2), ("b", 1), ("c", 0)]);
        let (report, ()) = tokio::join!(dispatcher.dispatch(&changes, &token), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            source.cancel();
        });

        assert!(report.was_cancelled());
        assert!(!report.succeeded());
        assert_eq!(report.failed().count(), 3);
        assert!(store.writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_writes_release_their_slots() {
        let store = MemoryCollection::with_ids(["a", "b", "c"], 0)
            .with_write_delay(Duration::from_millis(50));
        let source = CancellationSource::new();
        let token = source.token();

        let unbounded = Dispatcher::new(store.clone(), DispatcherConfig::default());
        let changes = changeset(&[("a", 2), ("b", 1), ("c", 0)]);
        let (report, ()) = tokio::join!(unbounded.dispatch(&changes, &token), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            source.cancel();
        });
        assert!(report.was_cancelled());
        assert_eq!(store.peak_in_flight(), 3);

        let serial = Dispatcher::new(
            store.clone(),
            DispatcherConfig {
                max_concurrent: Some(1),
                ..Default::default()
            },
        );
        let report = serial.dispatch(&changes, &CancellationToken::never()).await;
        assert!(report.succeeded());
        // Abandoned writes no longer count, so one-at-a-time stays under the old peak.
        assert_eq!(store.peak_in_flight(), 3);
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_all_writes() {
        let store = MemoryCollection::with_ids(["a", "b"], 0);
        let dispatcher = Dispatcher::new(store.clone(), DispatcherConfig::default());
        let source = CancellationSource::new();
        source.cancel();

        let report = dispatcher
            .dispatch(&changeset(&[("a", 1), ("b", 0)]), &source.token())
            .await;
        assert!(report.outcomes().iter().all(|o| o.result == Err(WriteError::Cancelled)));
        assert!(store.writes().await.is_empty());
    }

    #[test]
    fn test_refresh_policy() {
        assert!(RefreshPolicy::OnSuccess.should_refresh(true));
        assert!(!RefreshPolicy::OnSuccess.should_refresh(false));
        assert!(RefreshPolicy::Always.should_refresh(false));
    }
}
