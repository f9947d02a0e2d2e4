//! Curator - drag-to-rank for paginated content lists.
//!
//! Curators reorder regions, photo collections and activities one fetched
//! page at a time. Curator keeps the reordered page consistent with the
//! single integer rank the public listing is sorted by, writing back only
//! the items whose position changed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   page (ascending rank)   ┌──────────────────────┐
//! │  CollectionFetcher   │ ────────────────────────▶ │   RankingSession     │
//! │  (cms / memory)      │                           │  page + OrderBuffer  │
//! └──────────▲───────────┘                           │  filter guard        │
//!            │ refetch                               │  drag coordinator    │
//!            │                                       └──────────┬───────────┘
//!            │                                                  │ diff
//! ┌──────────┴───────────┐   one write per change    ┌──────────▼───────────┐
//! │     RankWriter       │ ◀──────────────────────── │     Dispatcher       │
//! │  (cms / memory)      │                           │  capped fan-out      │
//! └──────────────────────┘                           └──────────────────────┘
//! ```
//!
//! # Key Properties
//!
//! - **Unfiltered only**: reordering is refused while search or a category
//!   filter narrows the view
//! - **Positional diff**: every slot whose id changed is rewritten
//! - **No rollback**: a partially failed save keeps the writes that landed
//! - **One save per view**: saves are serialized and tagged with the page
//!   generation they were computed against

/// Ordered buffer, filter guard, drag handling, diff and state machine.
pub mod ranking;

/// Fetcher and writer contracts, plus an in-memory collection.
pub mod store;

/// Concurrent rank-write dispatch.
pub mod dispatch;

/// End-to-end ranking loop for one list view.
pub mod reconcile;

/// CMS REST client.
pub mod cms;

/// Configuration.
pub mod config;

// === Re-exports ===

pub use cms::{CmsClient, CmsError};
pub use config::CuratorConfig;
pub use dispatch::{
    CancellationSource, CancellationToken, DispatchReport, Dispatcher, DispatcherConfig,
    ItemOutcome, RefreshPolicy, WriteError,
};
pub use ranking::{
    Changeset, EntityKind, FilterState, Item, ItemId, Page, RankingError, RankingPolicy,
    RankingSession, RankingState,
};
pub use reconcile::{Reconciler, SaveOutcome};
pub use store::{CollectionFetcher, FetchedPage, ListQuery, MemoryCollection, RankWriter};
