//! Paginated list state shared by every feed screen.
//!
//! A [`Feed`] owns the records of one list, its [`Pager`], the tri-state
//! [`Emptiness`] flag and the server-reported total. Every request is issued
//! through [`Feed::begin_refresh`] or [`Feed::begin_load_more`], which hand out
//! a [`FetchTicket`]; only the response carrying the latest ticket is applied,
//! so a slow response can never overwrite a newer one.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::pager::{PageCursor, Pager};

/// A list item with a stable identifier.
pub trait Record {
    type Id: Copy + Eq + Hash + fmt::Debug;

    fn id(&self) -> Self::Id;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emptiness {
    /// No successful refresh yet.
    #[default]
    Unknown,
    HasData,
    IsEmpty,
}

impl Emptiness {
    #[must_use]
    pub const fn from_len(len: usize) -> Self {
        if len == 0 {
            Self::IsEmpty
        } else {
            Self::HasData
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    Refresh,
    LoadMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FetchTicket(u64);

impl FetchTicket {
    #[must_use]
    pub const fn seq(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FetchTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues monotonically increasing tickets and remembers which one is in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sequencer {
    last_issued: u64,
    in_flight: Option<FetchTicket>,
}

impl Sequencer {
    /// Issue a new ticket, superseding whatever was in flight.
    pub fn issue(&mut self) -> FetchTicket {
        self.last_issued += 1;
        let ticket = FetchTicket(self.last_issued);
        self.in_flight = Some(ticket);
        ticket
    }

    #[must_use]
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.in_flight == Some(ticket)
    }

    /// Clear the in-flight ticket if `ticket` is it. Returns whether it was.
    pub fn settle(&mut self, ticket: FetchTicket) -> bool {
        if self.is_current(ticket) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    /// Forget the in-flight ticket without settling it. The counter keeps
    /// going, so no later ticket can equal one issued before.
    pub fn cancel(&mut self) -> Option<FetchTicket> {
        self.in_flight.take()
    }

    #[must_use]
    pub const fn in_flight(&self) -> Option<FetchTicket> {
        self.in_flight
    }
}

/// What the caller should put on the wire for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub cursor: PageCursor,
    pub mode: FetchMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Outcome {
    Applied,
    /// The response belongs to a superseded request and was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feed<T> {
    records: Vec<T>,
    emptiness: Emptiness,
    total_count: u64,
    pager: Pager,
    sequencer: Sequencer,
    in_flight: Option<FetchMode>,
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self::with_pager(Pager::default())
    }
}

impl<T> Feed<T> {
    #[must_use]
    pub fn new(limit: NonZeroU32) -> Self {
        Self::with_pager(Pager::new(limit))
    }

    fn with_pager(pager: Pager) -> Self {
        Self {
            records: Vec::new(),
            emptiness: Emptiness::Unknown,
            total_count: 0,
            pager,
            sequencer: Sequencer::default(),
            in_flight: None,
        }
    }

    /// Empty the feed for a new page size or a new user. Responses to
    /// requests issued before the reset stay stale.
    pub fn reset(&mut self, limit: NonZeroU32) {
        let mut sequencer = std::mem::take(&mut self.sequencer);
        if let Some(ticket) = sequencer.cancel() {
            debug!(%ticket, "cancelled by reset");
        }
        *self = Self::new(limit);
        self.sequencer = sequencer;
    }

    /// Drop everything and start over from the first page.
    pub fn begin_refresh(&mut self) -> FetchRequest {
        self.records.clear();
        self.emptiness = Emptiness::Unknown;
        self.total_count = 0;
        self.pager.reset();
        self.issue(FetchMode::Refresh)
    }

    /// Request the next page, or `None` when there is nothing more to load or
    /// a load-more is already running.
    pub fn begin_load_more(&mut self) -> Option<FetchRequest> {
        if !self.can_load_more() {
            return None;
        }
        self.pager.advance();
        Some(self.issue(FetchMode::LoadMore))
    }

    fn issue(&mut self, mode: FetchMode) -> FetchRequest {
        let ticket = self.sequencer.issue();
        self.in_flight = Some(mode);
        FetchRequest {
            ticket,
            cursor: self.pager.cursor(),
            mode,
        }
    }

    /// Settle a failed request. The list is left as it was; a failed load-more
    /// rewinds the pager so the same page is fetched next time.
    pub fn fail(&mut self, ticket: FetchTicket) -> Outcome {
        if !self.sequencer.settle(ticket) {
            return Outcome::Stale;
        }
        if self.in_flight.take() == Some(FetchMode::LoadMore) {
            self.pager.rewind();
        }
        Outcome::Applied
    }

    #[must_use]
    pub fn can_load_more(&self) -> bool {
        self.total_count != 0
            && (self.records.len() as u64) < self.total_count
            && !self.is_loading_more()
    }

    #[must_use]
    pub fn is_loading_more(&self) -> bool {
        self.in_flight == Some(FetchMode::LoadMore)
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.in_flight == Some(FetchMode::Refresh)
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<FetchTicket> {
        self.sequencer.in_flight()
    }

    #[must_use]
    pub fn records(&self) -> &[T] {
        &self.records
    }

    #[must_use]
    pub const fn emptiness(&self) -> Emptiness {
        self.emptiness
    }

    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    #[must_use]
    pub const fn pager(&self) -> &Pager {
        &self.pager
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T: Record> Feed<T> {
    /// Apply a page for the in-flight request identified by `ticket`.
    pub fn complete(&mut self, ticket: FetchTicket, records: Vec<T>, total: u64) -> Outcome {
        if !self.sequencer.settle(ticket) {
            debug!(%ticket, "dropping stale page");
            return Outcome::Stale;
        }
        let mode = self.in_flight.take().unwrap_or(FetchMode::Refresh);
        self.apply_page(records, total, mode);
        Outcome::Applied
    }

    /// Refresh replaces the list; load-more appends to it.
    ///
    /// Load-more performs no de-duplication: if the server shifts its pages
    /// between requests the overlap shows up twice. Overlaps are logged.
    pub fn apply_page(&mut self, records: Vec<T>, total: u64, mode: FetchMode) {
        match mode {
            FetchMode::Refresh => {
                self.emptiness = Emptiness::from_len(records.len());
                self.records = records;
            }
            FetchMode::LoadMore => {
                let existing: HashSet<T::Id> = self.records.iter().map(|r| r.id()).collect();
                let overlap = records.iter().filter(|r| existing.contains(&r.id())).count();
                if overlap > 0 {
                    warn!(overlap, "load-more page overlaps records already in the list");
                }
                self.records.extend(records);
            }
        }
        self.total_count = total;
    }

    /// Remove a record after the server confirmed a destructive action.
    pub fn remove_by_id(&mut self, id: T::Id) -> Option<T> {
        let index = self.records.iter().position(|r| r.id() == id)?;
        let removed = self.records.remove(index);
        self.total_count = self.total_count.saturating_sub(1);
        self.emptiness = Emptiness::from_len(self.records.len());
        Some(removed)
    }

    #[must_use]
    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }
}
