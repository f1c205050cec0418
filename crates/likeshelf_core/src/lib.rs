/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod api;
pub mod config;
pub mod cursor;
pub mod dedup;
pub mod error;
pub mod feed;
pub mod feed_worker;
pub mod http_retry;
pub mod net_metrics;
pub mod query;
pub mod tags;
pub mod ui_events;

pub use likeshelf_protocol as protocol;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
