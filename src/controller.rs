//! Incremental detail feed.
//!
//! One controller per open detail page. It owns the accepted entries, decides
//! when the next entry may be requested, drops responses that belong to an
//! earlier route, and keeps the document head pointed at the entry in view.
//!
//! ```text
//! Init -> LoadingFirst -> Ready <-> LoadingMore -> Exhausted
//!              |
//!              +-> Failed --retry--> LoadingFirst
//! ```
//!
//! Fetching is split in two halves so the host's event loop stays in charge:
//! an event hands out a [`FetchTicket`], the host awaits the fetch, then passes
//! the result back to [`FeedController::complete`]. At most one ticket is
//! outstanding, and a ticket issued before the last route change is ignored.
//!
//! Time is supplied by the host on every call; the controller never reads the
//! clock itself.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::config::{PortalConfig, SectionConfig};
use crate::feed::Fetcher;
use crate::meta::{MetaSynchronizer, PageMetadataSink};
use crate::models::{FeedEntry, Fetched};
use crate::store::{AppendOutcome, FeedStore};
use crate::viewport::{near_bottom, Layout, Viewport, ViewportTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    LoadingFirst,
    Ready,
    LoadingMore,
    Exhausted,
    /// The entry the route points at could not be loaded.
    Failed,
}

/// Status banner shown under the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    EndOfFeed,
    DuplicateContent,
    InitialLoadFailed,
}

/// Permission to run one fetch. Hand it back to `complete` with the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    id: i64,
    first: bool,
}

impl FetchTicket {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn is_first(&self) -> bool {
        self.first
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollOutcome {
    pub promoted: Option<i64>,
    pub ticket: Option<FetchTicket>,
}

/// What `complete` did with a fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Response for a superseded route or ticket; dropped.
    Stale,
    Appended(i64),
    Rejected(AppendOutcome),
    /// Mid-feed fetch came back empty.
    Ended,
    /// The first entry could not be loaded.
    Failed,
}

pub struct FeedController<F: Fetcher, S> {
    fetcher: F,
    sink: S,
    store: FeedStore<F::Entry>,
    tracker: ViewportTracker,
    meta: MetaSynchronizer,
    phase: Phase,
    start_id: Option<i64>,
    generation: u64,
    in_flight: Option<FetchTicket>,
    rescan_at: Option<Instant>,
    rescan_delay: Duration,
    scroll_threshold: f64,
}

impl<F: Fetcher, S: PageMetadataSink> FeedController<F, S> {
    pub fn new(fetcher: F, sink: S, config: &PortalConfig, section: &SectionConfig) -> Self {
        Self {
            fetcher,
            sink,
            store: FeedStore::new(),
            tracker: ViewportTracker::new(config.scroll_throttle()),
            meta: MetaSynchronizer::new(config, section),
            phase: Phase::Init,
            start_id: None,
            generation: 0,
            in_flight: None,
            rescan_at: None,
            rescan_delay: config.rescan_delay(),
            scroll_threshold: config.scroll_threshold,
        }
    }

    /// Route entered with `start_id`. An entry already in the feed just becomes
    /// active; anything else starts a fresh feed.
    pub fn open(&mut self, start_id: i64) -> Option<FetchTicket> {
        if self.store.contains(start_id) {
            debug!("Entry {} already loaded, keeping feed", start_id);
            self.start_id = Some(start_id);
            self.promote(start_id);
            return None;
        }

        info!("Opening feed at entry {}", start_id);
        self.store.reset();
        self.tracker.reset();
        self.generation += 1;
        self.start_id = Some(start_id);
        self.rescan_at = None;
        Some(self.issue(start_id, true))
    }

    /// Try the first entry again after `Failed`.
    pub fn retry(&mut self) -> Option<FetchTicket> {
        match (self.phase, self.start_id) {
            (Phase::Failed, Some(start_id)) => {
                info!("Retrying entry {}", start_id);
                Some(self.issue(start_id, true))
            }
            _ => None,
        }
    }

    pub fn on_scroll(&mut self, now: Instant, viewport: &Viewport, layout: &Layout) -> ScrollOutcome {
        let promoted = self
            .tracker
            .on_scroll(now, viewport, layout, self.store.active_id())
            .and_then(|id| self.promote(id));

        let ticket = if near_bottom(viewport, layout.document_height, self.scroll_threshold) {
            self.request_next()
        } else {
            None
        };

        ScrollOutcome { promoted, ticket }
    }

    /// An entry element crossed an intersection threshold.
    pub fn on_intersection(&mut self, id: i64, ratio: f64) -> Option<i64> {
        self.tracker
            .on_intersection(id, ratio, self.store.active_id())
            .and_then(|id| self.promote(id))
    }

    /// Timer work: the scroll position the throttle dropped, then the deferred
    /// rescan once its delay after an append has passed.
    pub fn tick(&mut self, now: Instant, viewport: &Viewport, layout: &Layout) -> Option<i64> {
        let trailing = self
            .tracker
            .flush(now, self.store.active_id())
            .and_then(|id| self.promote(id));

        let rescanned = match self.rescan_at {
            Some(at) if now >= at => {
                self.rescan_at = None;
                self.tracker
                    .rescan(viewport, layout, self.store.active_id())
                    .and_then(|id| self.promote(id))
            }
            _ => None,
        };

        rescanned.or(trailing)
    }

    /// Ticket for the next entry, if the feed has one and nothing is in flight.
    pub fn request_next(&mut self) -> Option<FetchTicket> {
        if self.phase != Phase::Ready || self.in_flight.is_some() || !self.store.has_more() {
            return None;
        }
        let next_id = self.store.next_id()?;
        Some(self.issue(next_id, false))
    }

    /// Commit a fetch result. `now` is when it arrived; the deferred rescan is
    /// scheduled relative to it.
    pub fn complete(&mut self, ticket: FetchTicket, result: Option<Fetched<F::Entry>>, now: Instant) -> Commit {
        if ticket.generation != self.generation || self.in_flight != Some(ticket) {
            debug!("Dropping stale response for entry {}", ticket.id);
            return Commit::Stale;
        }
        self.in_flight = None;

        let Some(fetched) = result else {
            return if ticket.first {
                info!("Could not load entry {}", ticket.id);
                self.phase = Phase::Failed;
                Commit::Failed
            } else {
                info!("No entry after {:?}, end of feed", self.store.last_id());
                self.store.mark_exhausted();
                self.phase = Phase::Exhausted;
                Commit::Ended
            };
        };

        let id = fetched.entry.id();
        match self.store.append(fetched.entry, fetched.next_id) {
            AppendOutcome::Accepted => {
                self.phase = if self.store.has_more() {
                    Phase::Ready
                } else {
                    Phase::Exhausted
                };
                self.rescan_at = Some(now + self.rescan_delay);
                if self.store.active_id().is_none() {
                    self.promote(id);
                }
                Commit::Appended(id)
            }
            rejected => {
                self.phase = Phase::Exhausted;
                Commit::Rejected(rejected)
            }
        }
    }

    /// Run a ticket's fetch and commit the result.
    pub async fn load(&mut self, ticket: FetchTicket, now: Instant) -> Commit {
        let result = self.fetcher.fetch(ticket.id).await;
        self.complete(ticket, result, now)
    }

    pub async fn open_and_load(&mut self, start_id: i64, now: Instant) -> Option<Commit> {
        let ticket = self.open(start_id)?;
        Some(self.load(ticket, now).await)
    }

    pub async fn retry_and_load(&mut self, now: Instant) -> Option<Commit> {
        let ticket = self.retry()?;
        Some(self.load(ticket, now).await)
    }

    pub async fn load_more(&mut self, now: Instant) -> Option<Commit> {
        let ticket = self.request_next()?;
        Some(self.load(ticket, now).await)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn notice(&self) -> Option<Notice> {
        match self.phase {
            Phase::Failed => Some(Notice::InitialLoadFailed),
            Phase::Exhausted if self.store.duplicate_detected() => Some(Notice::DuplicateContent),
            Phase::Exhausted => Some(Notice::EndOfFeed),
            _ => None,
        }
    }

    pub fn entries(&self) -> &[F::Entry] {
        self.store.entries()
    }

    pub fn store(&self) -> &FeedStore<F::Entry> {
        &self.store
    }

    pub fn active_id(&self) -> Option<i64> {
        self.store.active_id()
    }

    pub fn active_entry(&self) -> Option<&F::Entry> {
        self.store.active_id().and_then(|id| self.store.get(id))
    }

    pub fn has_more(&self) -> bool {
        self.store.has_more()
    }

    pub fn in_flight(&self) -> Option<FetchTicket> {
        self.in_flight
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn synchronizer(&self) -> &MetaSynchronizer {
        &self.meta
    }

    fn issue(&mut self, id: i64, first: bool) -> FetchTicket {
        let ticket = FetchTicket {
            generation: self.generation,
            id,
            first,
        };
        self.phase = if first { Phase::LoadingFirst } else { Phase::LoadingMore };
        self.in_flight = Some(ticket);
        debug!("Requesting entry {}", id);
        ticket
    }

    fn promote(&mut self, id: i64) -> Option<i64> {
        let entry = self.store.set_active(id)?;
        debug!("Entry {} is now active", id);
        self.meta.sync(entry, &mut self.sink);
        Some(id)
    }
}
