//! Ranking state machine.
//!
//! ```text
//!            enable (guard ok)        drag (differs)        begin_save
//! Disabled ───────────────────▶ Idle ───────────────▶ Dirty ──────────▶ Saving
//!     ▲                          ▲  ◀─────────────────  │                │  │
//!     │                          │   drag (matches)     │ drag           │  │ failed
//!     │                          │                      ▼                │  ▼
//!     │                          └──── succeeded ───────────────────────┘ Error
//!     │
//!     └── navigate / narrowing filter / disable (from any state)
//! ```
//!
//! The session owns the fetched page and the order buffer as plain values,
//! so it can be driven and inspected without any UI.

use tracing::{debug, info};

use super::buffer::OrderBuffer;
use super::diff::{diff, Changeset};
use super::drag::{self, Direction, DragEffect, Ignored};
use super::filter::{can_rank, FilterState};
use super::item::{ItemId, Page};
use super::policy::RankingPolicy;
use super::{RankingError, Result};

/// Ranking mode state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingState {
    /// Reordering not possible (toggle off or view narrowed).
    Disabled,

    /// Armed, buffer matches the page.
    Idle,

    /// Armed, buffer has unsaved moves.
    Dirty,

    /// A changeset is being written.
    Saving,

    /// Last save failed; the buffer still holds the unsaved order.
    Error,
}

/// A changeset handed out by [`RankingSession::begin_save`].
///
/// Tagged with the page generation it was computed against so a late
/// completion for a page that has since been replaced can be discarded.
#[derive(Debug, Clone)]
pub struct PendingSave {
    /// Page generation at save time.
    pub generation: u64,

    /// Writes to perform.
    pub changeset: Changeset,
}

/// What a save request turned into.
#[derive(Debug, Clone)]
pub enum SavePlan {
    /// Buffer already matches the page; nothing to write.
    NoChanges,

    /// Writes to dispatch; the session is now `Saving`.
    Dispatch(PendingSave),
}

/// Ranking session for one list view.
#[derive(Debug, Clone)]
pub struct RankingSession {
    policy: RankingPolicy,
    page: Page,
    generation: u64,
    buffer: OrderBuffer,
    filter: FilterState,
    enabled: bool,
    state: RankingState,
}

impl RankingSession {
    /// New session on an empty page.
    pub fn new(policy: RankingPolicy, page_size: u32) -> Self {
        Self {
            policy,
            page: Page::empty(1, page_size),
            generation: 0,
            buffer: OrderBuffer::default(),
            filter: FilterState::unfiltered(),
            enabled: false,
            state: RankingState::Disabled,
        }
    }

    pub fn policy(&self) -> &RankingPolicy {
        &self.policy
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn buffer(&self) -> &OrderBuffer {
        &self.buffer
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn state(&self) -> RankingState {
        self.state
    }

    /// Generation of the current page; bumps on every page replacement.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether drags are currently accepted.
    pub fn is_armed(&self) -> bool {
        self.enabled && can_rank(&self.filter) && self.state != RankingState::Saving
    }

    /// Rank offset of the current page under the session's policy.
    pub fn page_base_offset(&self) -> i64 {
        self.policy
            .page_base_offset(self.page.number(), self.page.page_size())
    }

    /// Switch ranking mode on.
    ///
    /// Returns `false` without raising anything when the view is narrowed.
    /// Already armed sessions keep their buffer and state.
    pub fn enable(&mut self) -> bool {
        if !can_rank(&self.filter) {
            debug!("Ranking toggle ignored - view is filtered");
            return false;
        }
        if self.enabled && self.state != RankingState::Disabled {
            return true;
        }
        self.enabled = true;
        self.buffer.seed(&self.page);
        self.state = RankingState::Idle;
        debug!(page = self.page.number(), "Ranking mode enabled");
        true
    }

    /// Switch ranking mode off, discarding unsaved moves.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.buffer.seed(&self.page);
        self.state = RankingState::Disabled;
    }

    /// Change the active filter.
    ///
    /// A narrowing filter forces ranking mode off and discards unsaved
    /// moves. The caller is expected to fetch the page for the new filter.
    pub fn set_filter(&mut self, filter: FilterState) {
        let narrowed = !can_rank(&filter);
        self.filter = filter;
        if narrowed {
            if self.state == RankingState::Dirty {
                info!("Unsaved ranking discarded - view filtered");
            }
            self.enabled = false;
            self.buffer.seed(&self.page);
            self.state = RankingState::Disabled;
        }
    }

    /// Replace the page after navigation or a filter change.
    ///
    /// Always lands in `Disabled`; unsaved moves are lost.
    pub fn navigate(&mut self, page: Page) {
        if self.state == RankingState::Dirty {
            info!(
                from_page = self.page.number(),
                to_page = page.number(),
                "Unsaved ranking discarded by navigation"
            );
        }
        self.replace_page(page);
        self.enabled = false;
        self.state = RankingState::Disabled;
    }

    /// Replace the page with a refetch of the same view (after a save).
    ///
    /// Keeps ranking mode armed if it was.
    pub fn refresh(&mut self, page: Page) {
        self.replace_page(page);
        self.state = if self.enabled && can_rank(&self.filter) {
            RankingState::Idle
        } else {
            RankingState::Disabled
        };
    }

    fn replace_page(&mut self, page: Page) {
        self.page = page;
        self.generation += 1;
        self.buffer.seed(&self.page);
    }

    /// Finish a drag of `active` onto `over`.
    pub fn on_drag_end(&mut self, active: &ItemId, over: &ItemId) -> DragEffect {
        if !self.is_armed() {
            return DragEffect::Ignored(Ignored::NotArmed);
        }
        let effect = drag::on_drag_end(&mut self.buffer, active, over);
        self.after_move(&effect);
        effect
    }

    /// Keyboard move of `id` by one slot.
    pub fn nudge(&mut self, id: &ItemId, direction: Direction) -> DragEffect {
        if !self.is_armed() {
            return DragEffect::Ignored(Ignored::NotArmed);
        }
        let effect = drag::nudge(&mut self.buffer, id, direction);
        self.after_move(&effect);
        effect
    }

    fn after_move(&mut self, effect: &DragEffect) {
        if let DragEffect::Moved { id, from, to } = effect {
            self.state = if self.buffer.matches(&self.page) {
                RankingState::Idle
            } else {
                RankingState::Dirty
            };
            debug!(item = %id, from, to, state = ?self.state, "Buffer reordered");
        }
    }

    /// Compute the changeset for a save and enter `Saving`.
    ///
    /// Refuses while the view is narrowed, while ranking mode is off, or
    /// while another save for this page is in flight.
    pub fn begin_save(&mut self) -> Result<SavePlan> {
        if self.state == RankingState::Saving {
            return Err(RankingError::SaveInProgress);
        }
        if !can_rank(&self.filter) {
            return Err(RankingError::GuardViolation);
        }
        if !self.enabled {
            return Err(RankingError::NotArmed);
        }

        let changeset = diff(&self.page, &self.buffer, &self.policy, self.page_base_offset());
        if changeset.is_empty() {
            self.state = RankingState::Idle;
            return Ok(SavePlan::NoChanges);
        }

        self.state = RankingState::Saving;
        info!(
            page = self.page.number(),
            changes = changeset.len(),
            field = %self.policy.field_name,
            "Saving ranking"
        );
        Ok(SavePlan::Dispatch(PendingSave {
            generation: self.generation,
            changeset,
        }))
    }

    /// Record the outcome of a dispatched save.
    ///
    /// Returns `false` if the page was replaced while the save was in
    /// flight; the outcome is then discarded.
    pub fn complete_save(&mut self, generation: u64, succeeded: bool) -> bool {
        if generation != self.generation || self.state != RankingState::Saving {
            debug!(
                generation,
                current = self.generation,
                "Discarding save outcome for replaced page"
            );
            return false;
        }
        // Success leaves the buffer ahead of the page until the refetch lands.
        self.state = if succeeded {
            RankingState::Idle
        } else {
            RankingState::Error
        };
        true
    }
}
