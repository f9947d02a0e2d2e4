//! Drag-to-rank over a single fetched page.
//!
//! A page is fetched in ascending rank order, copied into an
//! [`OrderBuffer`], reordered by drag gestures, and diffed back against the
//! page to produce the [`Changeset`] of rank writes. Reordering is only
//! possible on an unfiltered view (see [`can_rank`]).

pub mod buffer;
pub mod diff;
pub mod drag;
pub mod filter;
pub mod item;
pub mod policy;
pub mod session;

use thiserror::Error;

pub use buffer::OrderBuffer;
pub use diff::{diff, Changeset, RankChange};
pub use drag::{Direction, DragEffect, Ignored};
pub use filter::{can_rank, CategoryFilter, FilterState};
pub use item::{Item, ItemId, Page};
pub use policy::{EntityKind, RankingPolicy};
pub use session::{PendingSave, RankingSession, RankingState, SavePlan};

/// Errors raised by the ranking layer.
#[derive(Error, Debug)]
pub enum RankingError {
    #[error("Invalid page: {0}")]
    InvalidPage(String),

    #[error("Ranking refused: the view is filtered or searched")]
    GuardViolation,

    #[error("Ranking mode is not enabled")]
    NotArmed,

    #[error("A save is already in progress for this page")]
    SaveInProgress,

    #[error("Failed to fetch page: {0}")]
    Fetch(String),
}

pub type Result<T> = std::result::Result<T, RankingError>;
