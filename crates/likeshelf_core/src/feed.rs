/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! The feed state machine.
//!
//! `FeedController` owns the one `PageState` of a feed: the current query, its
//! cursor and the ordered, deduplicated items fetched for it. It performs no
//! I/O. Every reaction that needs the network returns a [`FetchTicket`]; the
//! caller runs the fetch and hands the ticket back with the result. At most
//! one ticket is outstanding at a time, and a result whose ticket has been
//! superseded by a query change is dropped.

use likeshelf_protocol::{Item, ItemId, ListParams, SortDirection};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::cursor::PageCursor;
use crate::dedup;
use crate::error::SyncError;
use crate::query::QuerySpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Loading { spec: QuerySpec, page_index: u32 },
    Loaded { spec: QuerySpec },
    Error { spec: QuerySpec, page_index: u32, message: String },
}

impl FeedState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub spec: QuerySpec,
    pub page_index: u32,
    pub params: ListParams,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { appended: usize, exhausted: bool },
    Failed,
    Stale,
}

/// Read-only view handed to presentation code.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub spec: QuerySpec,
    pub state: FeedState,
    pub items: Arc<Vec<Item>>,
    pub page_index: u32,
    pub page_size: u32,
    pub exhausted: bool,
    pub fetch_in_flight: bool,
    pub generation: u64,
}

impl FeedSnapshot {
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            FeedState::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }
}

pub struct FeedController {
    spec: QuerySpec,
    cursor: PageCursor,
    items: Arc<Vec<Item>>,
    state: FeedState,
    generation: u64,
    in_flight: Option<FetchTicket>,
}

impl FeedController {
    pub fn new(initial: QuerySpec, page_size: NonZeroU32) -> Self {
        Self {
            spec: initial,
            cursor: PageCursor::new(page_size),
            items: Arc::new(Vec::new()),
            state: FeedState::Idle,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight(&self) -> Option<&FetchTicket> {
        self.in_flight.as_ref()
    }

    /// First load of the initial query.
    pub fn start(&mut self) -> Option<FetchTicket> {
        if self.state != FeedState::Idle {
            return None;
        }
        Some(self.reset_to(self.spec.clone()))
    }

    /// Switches to `spec`. An equal spec is a no-op once the feed has started.
    pub fn set_query(&mut self, spec: QuerySpec) -> Option<FetchTicket> {
        if spec == self.spec && self.state != FeedState::Idle {
            return None;
        }
        Some(self.reset_to(spec))
    }

    pub fn toggle_tag(&mut self, name: &str) -> Option<FetchTicket> {
        let next = self.spec.toggle_tag(name);
        self.set_query(next)
    }

    pub fn set_sort(&mut self, sort: SortDirection) -> Option<FetchTicket> {
        let next = self.spec.with_sort(sort);
        self.set_query(next)
    }

    pub fn clear_tags(&mut self) -> Option<FetchTicket> {
        let next = self.spec.cleared();
        self.set_query(next)
    }

    /// Starts over with the current query even though it did not change.
    pub fn reload(&mut self) -> Option<FetchTicket> {
        Some(self.reset_to(self.spec.clone()))
    }

    /// Scroll reached the end of the visible list.
    ///
    /// Only `Loaded` with pages left, or `Error`, react. Everything else is
    /// dropped, which keeps a fast scroller from stacking requests.
    pub fn near_end(&mut self) -> Option<FetchTicket> {
        if self.in_flight.is_some() {
            return None;
        }
        match &self.state {
            FeedState::Loaded { .. } => {
                if !self.cursor.advance() {
                    return None;
                }
            }
            // The cursor still points at the page that failed.
            FeedState::Error { .. } => {}
            FeedState::Idle | FeedState::Loading { .. } => return None,
        }
        Some(self.issue())
    }

    /// Applies the result of `ticket`'s fetch.
    pub fn on_fetch_result(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Item>, SyncError>,
    ) -> FetchOutcome {
        if self.is_stale(ticket) {
            return FetchOutcome::Stale;
        }
        self.in_flight = None;
        match result {
            Ok(page) => {
                let fetched = page.len();
                let appended = if ticket.page_index == 1 {
                    let mut fresh = Vec::with_capacity(fetched);
                    let n = dedup::merge_into(&mut fresh, page);
                    self.items = Arc::new(fresh);
                    n
                } else {
                    dedup::merge_into(Arc::make_mut(&mut self.items), page)
                };
                let exhausted = self.cursor.mark_exhausted(fetched);
                self.state = FeedState::Loaded {
                    spec: self.spec.clone(),
                };
                FetchOutcome::Applied {
                    appended,
                    exhausted,
                }
            }
            Err(e) => {
                self.state = FeedState::Error {
                    spec: self.spec.clone(),
                    page_index: ticket.page_index,
                    message: e.to_string(),
                };
                FetchOutcome::Failed
            }
        }
    }

    pub fn is_stale(&self, ticket: &FetchTicket) -> bool {
        ticket.spec != self.spec
            || self
                .in_flight
                .as_ref()
                .map(|cur| cur.generation != ticket.generation || cur.page_index != ticket.page_index)
                .unwrap_or(true)
    }

    /// Point update of one item by id. Other items are left alone.
    pub fn replace_item(&mut self, item: Item) -> bool {
        let Some(pos) = self.items.iter().position(|i| i.id == item.id) else {
            return false;
        };
        Arc::make_mut(&mut self.items)[pos] = item;
        true
    }

    /// Optimistic insertion of a freshly created item at the head of the list.
    pub fn prepend(&mut self, item: Item) -> bool {
        if self.items.iter().any(|i| i.id == item.id) {
            return false;
        }
        Arc::make_mut(&mut self.items).insert(0, item);
        true
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            spec: self.spec.clone(),
            state: self.state.clone(),
            items: self.items.clone(),
            page_index: self.cursor.page_index(),
            page_size: self.cursor.limit(),
            exhausted: self.cursor.is_exhausted(),
            fetch_in_flight: self.in_flight.is_some(),
            generation: self.generation,
        }
    }

    fn reset_to(&mut self, spec: QuerySpec) -> FetchTicket {
        self.generation = self.generation.wrapping_add(1);
        self.spec = spec;
        self.cursor.reset();
        self.items = Arc::new(Vec::new());
        self.issue()
    }

    fn issue(&mut self) -> FetchTicket {
        let q = self.spec.to_params();
        let ticket = FetchTicket {
            generation: self.generation,
            spec: self.spec.clone(),
            page_index: self.cursor.page_index(),
            params: ListParams {
                skip: self.cursor.skip(),
                limit: self.cursor.limit(),
                tag_names: q.tag_names,
                sort_order: q.sort_order,
            },
        };
        self.state = FeedState::Loading {
            spec: self.spec.clone(),
            page_index: ticket.page_index,
        };
        self.in_flight = Some(ticket.clone());
        ticket
    }
}
