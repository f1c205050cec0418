/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use likeshelf_core::api::HttpCollectionApi;
use likeshelf_core::config::{default_config_path, FeedConfig};
use likeshelf_core::feed::{FeedSnapshot, FeedState};
use likeshelf_core::feed_worker::{FeedHandle, FeedSettings};
use likeshelf_core::net_metrics::NetMetrics;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse()?),
        )
        .init();

    let path = match std::env::args().nth(1) {
        Some(p) => PathBuf::from(p),
        None => default_config_path()?,
    };
    let cfg = FeedConfig::load(Some(path.as_path()))?;
    let max_pages: u32 = std::env::var("LIKESHELF_MAX_PAGES")
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(5);
    info!("feed from {} (config {})", cfg.api_base_url, path.display());

    let metrics = Arc::new(NetMetrics::new());
    let api = Arc::new(HttpCollectionApi::from_config(&cfg, metrics.clone())?);
    let feed = FeedHandle::spawn(
        api,
        FeedSettings::from_config(&cfg)?,
        cfg.initial_spec(),
        metrics.clone(),
    );

    match feed.load_tags().await {
        Ok(tags) => info!(
            "tag vocabulary: {}",
            tags.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ")
        ),
        Err(e) => warn!("tag vocabulary unavailable: {e}"),
    }

    let mut rx = feed.subscribe();
    let run = async {
        let mut snap = settled(&mut rx, 1).await?;
        for _ in 1..max_pages {
            if let FeedState::Error { message, .. } = &snap.state {
                warn!("feed error: {message}");
                break;
            }
            if snap.exhausted {
                break;
            }
            let page = snap.page_index;
            feed.near_end();
            snap = settled(&mut rx, page + 1).await?;
        }
        Ok::<_, anyhow::Error>(snap)
    };

    let snap = tokio::select! {
        snap = run => snap?,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            feed.snapshot()
        }
    };

    for item in snap.items.iter() {
        println!("{}", serde_json::to_string(item)?);
    }
    info!(
        "{} items for {} (exhausted={})",
        snap.items.len(),
        snap.spec,
        snap.exhausted
    );
    info!("metrics: {}", metrics.snapshot_json());

    feed.shutdown().await;
    Ok(())
}

async fn settled(rx: &mut watch::Receiver<FeedSnapshot>, min_page: u32) -> Result<FeedSnapshot> {
    let snap = tokio::time::timeout(
        Duration::from_secs(120),
        rx.wait_for(|s| {
            matches!(s.state, FeedState::Loaded { .. } | FeedState::Error { .. })
                && s.page_index >= min_page
        }),
    )
    .await
    .context("feed did not settle")?
    .context("feed worker stopped")?
    .clone();
    Ok(snap)
}
