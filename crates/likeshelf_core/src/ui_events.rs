/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use likeshelf_protocol::ItemId;
use serde::Serialize;

fn now_ms_u64() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

pub const FEED_RESET: &str = "feed_reset";
pub const PAGE_LOADED: &str = "page_loaded";
pub const PAGE_FAILED: &str = "page_failed";
pub const STALE_DISCARDED: &str = "stale_discarded";
pub const ITEM_UPDATED: &str = "item_updated";
pub const ITEM_PREPENDED: &str = "item_prepended";

#[derive(Clone, Debug, Serialize)]
pub struct UiEvent {
    pub kind: String,
    pub ts_ms: u64,
    pub generation: u64,
    pub page_index: Option<u32>,
    pub item_id: Option<ItemId>,
}

impl UiEvent {
    pub fn new(kind: &str, generation: u64, page_index: Option<u32>, item_id: Option<ItemId>) -> Self {
        Self {
            kind: kind.to_string(),
            ts_ms: now_ms_u64(),
            generation,
            page_index,
            item_id,
        }
    }

    pub fn page(kind: &str, generation: u64, page_index: u32) -> Self {
        Self::new(kind, generation, Some(page_index), None)
    }

    pub fn item(kind: &str, generation: u64, item_id: ItemId) -> Self {
        Self::new(kind, generation, None, Some(item_id))
    }
}
