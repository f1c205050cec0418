/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::sync::atomic::{AtomicU64, Ordering};

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Default)]
pub struct NetMetrics {
    pub http_requests: AtomicU64,
    pub http_timeouts: AtomicU64,
    pub http_errors: AtomicU64,
    pub http_rtt_ema_ms: AtomicU64,

    pub pages_applied: AtomicU64,
    pub stale_discards: AtomicU64,
    pub fetch_failures: AtomicU64,
    pub fetches_cancelled: AtomicU64,
    pub item_updates: AtomicU64,
}

impl NetMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn http_request(&self) {
        self.http_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn http_timeout(&self) {
        self.http_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn http_error(&self) {
        self.http_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn http_rtt_update(&self, ms: u64) {
        if ms == 0 {
            return;
        }
        let prev = self.http_rtt_ema_ms.load(Ordering::Relaxed);
        let next = if prev == 0 {
            ms
        } else {
            (prev.saturating_mul(7).saturating_add(ms)) / 8
        };
        self.http_rtt_ema_ms.store(next, Ordering::Relaxed);
    }

    pub fn page_applied(&self) {
        self.pages_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stale_discard(&self) {
        self.stale_discards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_cancelled(&self) {
        self.fetches_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn item_update(&self) {
        self.item_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot_json(&self) -> serde_json::Value {
        serde_json::json!({
            "ts_ms": now_ms(),
            "http": {
                "requests": self.http_requests.load(Ordering::Relaxed),
                "timeouts": self.http_timeouts.load(Ordering::Relaxed),
                "errors": self.http_errors.load(Ordering::Relaxed),
                "rtt_ms": self.http_rtt_ema_ms.load(Ordering::Relaxed),
            },
            "feed": {
                "pages_applied": self.pages_applied.load(Ordering::Relaxed),
                "stale_discards": self.stale_discards.load(Ordering::Relaxed),
                "fetch_failures": self.fetch_failures.load(Ordering::Relaxed),
                "fetches_cancelled": self.fetches_cancelled.load(Ordering::Relaxed),
                "item_updates": self.item_updates.load(Ordering::Relaxed),
            },
        })
    }
}
