//! Fetch → reorder → diff → dispatch → refetch.
//!
//! [`Reconciler`] owns one list view: its fetcher, its dispatcher and the
//! [`RankingSession`] holding the page and order buffer. Saves take
//! `&mut self`, so at most one save per view is ever in flight.

use tracing::{error, info, warn};

use crate::config::CuratorConfig;
use crate::dispatch::{CancellationToken, DispatchReport, Dispatcher};
use crate::ranking::{
    Direction, DragEffect, FilterState, ItemId, Page, RankingError, RankingPolicy,
    RankingSession, Result, SavePlan,
};
use crate::store::{CollectionFetcher, ListQuery, RankWriter};

/// User-facing result of a save.
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    /// Buffer matched the page; zero writes.
    NoChanges,

    /// Every write landed.
    Saved(DispatchReport),

    /// At least one write failed. Writes that landed were kept.
    Failed(DispatchReport),

    /// The view was torn down while writes were in flight.
    Cancelled(DispatchReport),

    /// Writes settled but the page could not be refetched; the view is on
    /// an empty page. `report.succeeded()` tells whether every write landed.
    RefreshFailed { report: DispatchReport, error: String },

    /// The view is filtered or searched; zero writes.
    GuardRejected,

    /// Ranking mode is off; zero writes.
    NotArmed,
}

impl SaveOutcome {
    /// Single notification line for the curator.
    pub fn notification(&self) -> String {
        match self {
            Self::NoChanges => "No changes to save".to_string(),
            Self::Saved(report) => format!("Ranking saved ({} items updated)", report.len()),
            Self::Failed(_) => "Failed to save ranking".to_string(),
            Self::Cancelled(_) => "Ranking save cancelled".to_string(),
            Self::RefreshFailed { report, error } if report.succeeded() => {
                format!("Ranking saved, but the page could not be reloaded: {}", error)
            }
            Self::RefreshFailed { error, .. } => {
                format!("Failed to save ranking, and the page could not be reloaded: {}", error)
            }
            Self::GuardRejected => "Clear search and filters to change the ranking".to_string(),
            Self::NotArmed => "Ranking mode is off".to_string(),
        }
    }
}

/// Ranking loop for one list view.
pub struct Reconciler<F, W> {
    fetcher: F,
    dispatcher: Dispatcher<W>,
    session: RankingSession,
    cancel: CancellationToken,
}

impl<F, W> Reconciler<F, W>
where
    F: CollectionFetcher + Sync,
    W: RankWriter + Sync,
{
    /// Create a reconciler on an empty page. Call [`load_page`](Self::load_page) next.
    pub fn new(fetcher: F, writer: W, policy: RankingPolicy, config: &CuratorConfig) -> Self {
        Self {
            fetcher,
            dispatcher: Dispatcher::new(writer, config.dispatcher()),
            session: RankingSession::new(policy, config.page_size),
            cancel: CancellationToken::never(),
        }
    }

    /// Abandon in-flight writes when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn session(&self) -> &RankingSession {
        &self.session
    }

    pub fn dispatcher(&self) -> &Dispatcher<W> {
        &self.dispatcher
    }

    async fn fetch(&self, number: u32) -> Result<Page> {
        let page_size = self.session.page().page_size();
        let query = ListQuery {
            page: number,
            limit: page_size,
            filter: self.session.filter().clone(),
        };
        let fetched = self
            .fetcher
            .list(&query)
            .await
            .map_err(|e| RankingError::Fetch(e.to_string()))?;
        Page::new(number, page_size, fetched.total_pages, fetched.items)
    }

    /// Fetch and show page `number`. Ranking mode ends; unsaved moves are lost.
    ///
    /// On failure the view falls back to an empty page.
    pub async fn load_page(&mut self, number: u32) -> Result<()> {
        match self.fetch(number).await {
            Ok(page) => {
                info!(page = number, items = page.len(), total_pages = page.total_pages(), "Page loaded");
                self.session.navigate(page);
                Ok(())
            }
            Err(e) => {
                error!(page = number, error = %e, "Failed to load page");
                let page_size = self.session.page().page_size();
                self.session.navigate(Page::empty(number, page_size));
                Err(e)
            }
        }
    }

    /// Apply a new filter and show its first page.
    pub async fn set_filter(&mut self, filter: FilterState) -> Result<()> {
        self.open(filter, 1).await
    }

    /// Apply a filter and show page `number` of the result.
    pub async fn open(&mut self, filter: FilterState, number: u32) -> Result<()> {
        self.session.set_filter(filter);
        self.load_page(number).await
    }

    /// Refetch the current page, keeping ranking mode armed.
    pub async fn refresh(&mut self) -> Result<()> {
        let number = self.session.page().number();
        match self.fetch(number).await {
            Ok(page) => {
                self.session.refresh(page);
                Ok(())
            }
            Err(e) => {
                error!(page = number, error = %e, "Failed to refresh page");
                let page_size = self.session.page().page_size();
                self.session.navigate(Page::empty(number, page_size));
                Err(e)
            }
        }
    }

    pub fn enable_ranking(&mut self) -> bool {
        self.session.enable()
    }

    pub fn disable_ranking(&mut self) {
        self.session.disable();
    }

    pub fn on_drag_end(&mut self, active: &ItemId, over: &ItemId) -> DragEffect {
        self.session.on_drag_end(active, over)
    }

    pub fn nudge(&mut self, id: &ItemId, direction: Direction) -> DragEffect {
        self.session.nudge(id, direction)
    }

    /// Persist the buffer order.
    ///
    /// Refusals (filtered view, ranking off) are outcomes, not errors. A
    /// failed refetch after the writes leaves the view on an empty page and
    /// is reported as [`SaveOutcome::RefreshFailed`].
    pub async fn save(&mut self) -> Result<SaveOutcome> {
        let pending = match self.session.begin_save() {
            Ok(SavePlan::Dispatch(pending)) => pending,
            Ok(SavePlan::NoChanges) => {
                info!("No ranking changes to save");
                return Ok(SaveOutcome::NoChanges);
            }
            Err(RankingError::GuardViolation) => {
                warn!(filter = ?self.session.filter(), "Save refused - view is filtered");
                return Ok(SaveOutcome::GuardRejected);
            }
            Err(RankingError::NotArmed) => return Ok(SaveOutcome::NotArmed),
            Err(e) => return Err(e),
        };

        let report = self.dispatcher.dispatch(&pending.changeset, &self.cancel).await;

        if report.was_cancelled() {
            // Owner is gone; record nothing beyond ending the save.
            self.session.complete_save(pending.generation, false);
            info!("Ranking save cancelled");
            return Ok(SaveOutcome::Cancelled(report));
        }

        let succeeded = report.succeeded();
        self.session.complete_save(pending.generation, succeeded);
        if succeeded {
            info!(updated = report.len(), "Ranking saved");
        } else {
            error!(
                failed = report.failed().count(),
                applied = report.applied().count(),
                "Ranking save failed - applied writes were kept"
            );
        }

        if self.dispatcher.config().refresh.should_refresh(succeeded) {
            if let Err(e) = self.refresh().await {
                return Ok(SaveOutcome::RefreshFailed {
                    report,
                    error: e.to_string(),
                });
            }
        }

        Ok(if succeeded {
            SaveOutcome::Saved(report)
        } else {
            SaveOutcome::Failed(report)
        })
    }
}
