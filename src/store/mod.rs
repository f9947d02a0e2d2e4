//! Collaborators consumed by the ranking loop.
//!
//! The loop needs exactly two things from storage: a paged, rank-ordered
//! listing and a single-item rank write. There is no batch write.

pub mod memory;

use std::future::Future;

use crate::dispatch::WriteError;
use crate::ranking::{FilterState, Item, ItemId};

pub use memory::MemoryCollection;

/// Parameters of one list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: u32,

    /// Page size.
    pub limit: u32,

    /// Active search/filter state.
    pub filter: FilterState,
}

/// Raw fetch result, items in ascending rank order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    pub items: Vec<Item>,
    pub total_pages: u32,
}

/// Paged, rank-ordered listing of a collection.
pub trait CollectionFetcher {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch one page.
    fn list(&self, query: &ListQuery) -> impl Future<Output = Result<FetchedPage, Self::Error>> + Send;
}

/// Single-item "set rank" write.
pub trait RankWriter {
    /// Persist `rank` for `id`.
    fn update_rank(&self, id: &ItemId, rank: i64) -> impl Future<Output = Result<(), WriteError>> + Send;
}
