/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::num::NonZeroU32;

/// Offset pagination state for one query. Exhaustion is inferred from a short
/// page; the remote is never asked for a total count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    page_index: u32,
    page_size: NonZeroU32,
    exhausted: bool,
}

impl PageCursor {
    pub fn new(page_size: NonZeroU32) -> Self {
        Self {
            page_index: 1,
            page_size,
            exhausted: false,
        }
    }

    pub fn reset(&mut self) {
        self.page_index = 1;
        self.exhausted = false;
    }

    /// Moves to the next page. Refused once the query is exhausted.
    pub fn advance(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        self.page_index = self.page_index.saturating_add(1);
        true
    }

    /// A page shorter than `page_size` ends the query. A full page never does,
    /// even if the next one turns out to be empty.
    pub fn mark_exhausted(&mut self, fetched: usize) -> bool {
        self.exhausted = fetched < self.page_size.get() as usize;
        self.exhausted
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page_index.saturating_sub(1)) * u64::from(self.page_size.get())
    }

    pub fn limit(&self) -> u32 {
        self.page_size.get()
    }
}
