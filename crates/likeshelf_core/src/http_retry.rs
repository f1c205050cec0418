/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use rand::{thread_rng, Rng};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::net_metrics::NetMetrics;

/// Sends the request built by `build`, retrying transport errors, 429 and 5xx
/// with jittered exponential backoff. Only for idempotent requests.
pub async fn send_with_retry<F>(
    mut build: F,
    attempts: u32,
    metrics: &NetMetrics,
) -> reqwest::Result<Response>
where
    F: FnMut() -> RequestBuilder,
{
    let max_attempts = attempts.clamp(1, 5);
    let mut backoff = Duration::from_millis(200);
    for attempt in 0..max_attempts {
        match send_once(build(), metrics).await {
            Ok(resp) => {
                let status = resp.status();
                if should_retry_status(status) {
                    metrics.http_error();
                    if attempt + 1 < max_attempts {
                        debug!("retrying after status {status} (attempt {})", attempt + 1);
                        sleep_with_jitter(backoff).await;
                        backoff = backoff.saturating_mul(2).min(Duration::from_secs(5));
                        continue;
                    }
                }
                return Ok(resp);
            }
            Err(e) => {
                if attempt + 1 >= max_attempts {
                    return Err(e);
                }
                debug!("retrying after transport error (attempt {}): {e}", attempt + 1);
                sleep_with_jitter(backoff).await;
                backoff = backoff.saturating_mul(2).min(Duration::from_secs(5));
            }
        }
    }
    unreachable!("retry loop should return or error");
}

/// Single attempt, counted in `metrics`.
pub async fn send_once(req: RequestBuilder, metrics: &NetMetrics) -> reqwest::Result<Response> {
    metrics.http_request();
    let started = Instant::now();
    match req.send().await {
        Ok(resp) => {
            metrics.http_rtt_update(started.elapsed().as_millis() as u64);
            Ok(resp)
        }
        Err(e) => {
            if e.is_timeout() {
                metrics.http_timeout();
            } else {
                metrics.http_error();
            }
            Err(e)
        }
    }
}

fn should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

async fn sleep_with_jitter(base: Duration) {
    let jitter_ms: u64 = thread_rng().gen_range(0..=200);
    let jitter = Duration::from_millis(jitter_ms);
    tokio::time::sleep(base + jitter).await;
}
