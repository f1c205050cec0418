/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use likeshelf_protocol::ItemId;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("item {0} not found")]
    NotFound(ItemId),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid input: {0}")]
    Validation(String),

    /// Result of a superseded fetch. Never shown to the user.
    #[error("stale result discarded")]
    Stale,
}

impl SyncError {
    /// Transport or remote failures, as opposed to local input problems and stale results.
    pub fn is_network(&self) -> bool {
        !matches!(self, Self::Validation(_) | Self::Stale)
    }

    pub(crate) fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            Self::Timeout(timeout)
        } else if e.is_decode() {
            Self::Decode(format!("{e:#}"))
        } else {
            Self::Network(format!("{e:#}"))
        }
    }
}
