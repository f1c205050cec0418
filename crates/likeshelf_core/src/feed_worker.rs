/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Runs a [`FeedController`] on one tokio task.
//!
//! User commands and fetch completions are queued on channels and applied one
//! at a time by the worker loop, so controller transitions never interleave.
//! Fetches run on their own tasks and only report back through the loop.
//! Presentation code reads the latest [`FeedSnapshot`] from a `watch` channel.

use likeshelf_protocol::{Item, ItemCreate, SortDirection, Tag};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::api::{validate_create, CollectionApi};
use crate::config::FeedConfig;
use crate::error::SyncError;
use crate::feed::{FeedController, FeedSnapshot, FetchOutcome, FetchTicket};
use crate::net_metrics::NetMetrics;
use crate::query::QuerySpec;
use crate::ui_events::{self, UiEvent};

#[derive(Clone, Copy, Debug)]
pub struct FeedSettings {
    pub page_size: NonZeroU32,
    pub fetch_timeout: Option<Duration>,
    pub cancel_superseded: bool,
}

impl FeedSettings {
    pub fn new(page_size: NonZeroU32) -> Self {
        Self {
            page_size,
            fetch_timeout: None,
            cancel_superseded: false,
        }
    }

    pub fn from_config(cfg: &FeedConfig) -> anyhow::Result<Self> {
        Ok(Self {
            page_size: cfg.page_size()?,
            fetch_timeout: cfg.fetch_timeout(),
            cancel_superseded: cfg.cancel_superseded,
        })
    }
}

#[derive(Debug)]
enum Command {
    SetQuery(QuerySpec),
    ToggleTag(String),
    SetSort(SortDirection),
    ClearTags,
    NearEnd,
    Reload,
    ReplaceItem(Item),
    Prepend(Item),
}

struct FetchDone {
    ticket: FetchTicket,
    result: Result<Vec<Item>, SyncError>,
}

/// Cloneable sender for point updates coming from outside the feed view.
#[derive(Clone)]
pub struct FeedUpdater {
    tx: mpsc::UnboundedSender<Command>,
}

impl FeedUpdater {
    pub fn replace_item(&self, item: Item) -> bool {
        self.tx.send(Command::ReplaceItem(item)).is_ok()
    }

    pub fn prepend(&self, item: Item) -> bool {
        self.tx.send(Command::Prepend(item)).is_ok()
    }
}

pub struct FeedHandle {
    cmd: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<FeedSnapshot>,
    events: broadcast::Sender<UiEvent>,
    shutdown: watch::Sender<bool>,
    metrics: Arc<NetMetrics>,
    api: Arc<dyn CollectionApi>,
    join: JoinHandle<()>,
}

impl FeedHandle {
    /// Starts the worker and issues the first page of `initial`.
    pub fn spawn(
        api: Arc<dyn CollectionApi>,
        settings: FeedSettings,
        initial: QuerySpec,
        metrics: Arc<NetMetrics>,
    ) -> Self {
        let controller = FeedController::new(initial, settings.page_size);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (snap_tx, snap_rx) = watch::channel(controller.snapshot());
        let (events, _) = broadcast::channel::<UiEvent>(128);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = FeedWorker {
            controller,
            api: api.clone(),
            settings,
            metrics: metrics.clone(),
            events: events.clone(),
            snapshots: snap_tx,
            done_tx,
            running: None,
        };
        let join = tokio::spawn(worker.run(cmd_rx, done_rx, shutdown_rx));

        Self {
            cmd: cmd_tx,
            snapshots: snap_rx,
            events,
            shutdown: shutdown_tx,
            metrics,
            api,
            join,
        }
    }

    pub fn toggle_tag(&self, name: &str) -> bool {
        self.send(Command::ToggleTag(name.to_string()))
    }

    pub fn set_sort(&self, sort: SortDirection) -> bool {
        self.send(Command::SetSort(sort))
    }

    pub fn set_query(&self, spec: QuerySpec) -> bool {
        self.send(Command::SetQuery(spec))
    }

    pub fn clear_tags(&self) -> bool {
        self.send(Command::ClearTags)
    }

    /// Edge-triggered "near the end of the visible list" signal.
    pub fn near_end(&self) -> bool {
        self.send(Command::NearEnd)
    }

    pub fn reload(&self) -> bool {
        self.send(Command::Reload)
    }

    pub fn replace_item(&self, item: Item) -> bool {
        self.send(Command::ReplaceItem(item))
    }

    pub fn prepend(&self, item: Item) -> bool {
        self.send(Command::Prepend(item))
    }

    pub fn updater(&self) -> FeedUpdater {
        FeedUpdater {
            tx: self.cmd.clone(),
        }
    }

    /// Creates an item remotely and puts the stored copy at the top of the feed.
    pub async fn create_item(&self, payload: &ItemCreate) -> Result<Item, SyncError> {
        let payload = validate_create(payload)?;
        let item = self.api.create(&payload).await?;
        self.prepend(item.clone());
        Ok(item)
    }

    /// Global tag vocabulary, sorted by name.
    pub async fn load_tags(&self) -> Result<Vec<Tag>, SyncError> {
        let mut tags = self.api.list_tags().await?;
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshots.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    pub fn metrics(&self) -> &Arc<NetMetrics> {
        &self.metrics
    }

    /// Stops the worker. In-flight fetches are left to finish on their own.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            warn!("feed worker join failed: {e}");
        }
    }

    fn send(&self, cmd: Command) -> bool {
        self.cmd.send(cmd).is_ok()
    }
}

struct Running {
    generation: u64,
    page_index: u32,
    abort: AbortHandle,
}

struct FeedWorker {
    controller: FeedController,
    api: Arc<dyn CollectionApi>,
    settings: FeedSettings,
    metrics: Arc<NetMetrics>,
    events: broadcast::Sender<UiEvent>,
    snapshots: watch::Sender<FeedSnapshot>,
    done_tx: mpsc::UnboundedSender<FetchDone>,
    running: Option<Running>,
}

impl FeedWorker {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut done_rx: mpsc::UnboundedReceiver<FetchDone>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let first = self.controller.start();
        self.dispatch(first, true);
        self.publish();

        loop {
            tokio::select! {
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() { break; }
                }
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    self.handle_command(cmd);
                }
                Some(done) = done_rx.recv() => {
                    self.handle_done(done);
                }
            }
            self.publish();
        }

        if let Some(r) = self.running.take() {
            if self.settings.cancel_superseded {
                r.abort.abort();
            }
        }
        debug!("feed worker stopped ({})", self.controller.spec());
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetQuery(spec) => {
                let t = self.controller.set_query(spec);
                self.dispatch(t, true);
            }
            Command::ToggleTag(name) => {
                let t = self.controller.toggle_tag(&name);
                self.dispatch(t, true);
            }
            Command::SetSort(sort) => {
                let t = self.controller.set_sort(sort);
                self.dispatch(t, true);
            }
            Command::ClearTags => {
                let t = self.controller.clear_tags();
                self.dispatch(t, true);
            }
            Command::Reload => {
                let t = self.controller.reload();
                self.dispatch(t, true);
            }
            Command::NearEnd => {
                let t = self.controller.near_end();
                self.dispatch(t, false);
            }
            Command::ReplaceItem(item) => {
                let id = item.id;
                if self.controller.replace_item(item) {
                    self.metrics.item_update();
                    self.emit(UiEvent::item(
                        ui_events::ITEM_UPDATED,
                        self.controller.generation(),
                        id,
                    ));
                }
            }
            Command::Prepend(item) => {
                let id = item.id;
                if self.controller.prepend(item) {
                    self.emit(UiEvent::item(
                        ui_events::ITEM_PREPENDED,
                        self.controller.generation(),
                        id,
                    ));
                }
            }
        }
    }

    fn handle_done(&mut self, done: FetchDone) {
        let FetchDone { ticket, result } = done;
        if self
            .running
            .as_ref()
            .map(|r| r.generation == ticket.generation && r.page_index == ticket.page_index)
            .unwrap_or(false)
        {
            self.running = None;
        }
        let err = result.as_ref().err().map(|e| e.to_string());

        match self.controller.on_fetch_result(&ticket, result) {
            FetchOutcome::Applied { appended, exhausted } => {
                self.metrics.page_applied();
                info!(
                    "feed page {} applied for {}: +{appended} items, total {}, exhausted={exhausted}",
                    ticket.page_index,
                    ticket.spec,
                    self.controller.items().len()
                );
                self.emit(UiEvent::page(
                    ui_events::PAGE_LOADED,
                    ticket.generation,
                    ticket.page_index,
                ));
            }
            FetchOutcome::Failed => {
                self.metrics.fetch_failure();
                warn!(
                    "feed page {} failed for {}: {}",
                    ticket.page_index,
                    ticket.spec,
                    err.unwrap_or_default()
                );
                self.emit(UiEvent::page(
                    ui_events::PAGE_FAILED,
                    ticket.generation,
                    ticket.page_index,
                ));
            }
            FetchOutcome::Stale => {
                self.metrics.stale_discard();
                debug!(
                    "discarding stale page {} for {} (generation {}, current {})",
                    ticket.page_index,
                    ticket.spec,
                    ticket.generation,
                    self.controller.generation()
                );
                self.emit(UiEvent::page(
                    ui_events::STALE_DISCARDED,
                    ticket.generation,
                    ticket.page_index,
                ));
            }
        }
    }

    fn dispatch(&mut self, ticket: Option<FetchTicket>, reset: bool) {
        let Some(ticket) = ticket else {
            return;
        };
        if let Some(prev) = self.running.take() {
            if self.settings.cancel_superseded && !prev.abort.is_finished() {
                prev.abort.abort();
                self.metrics.fetch_cancelled();
                debug!(
                    "cancelled superseded fetch (generation {}, page {})",
                    prev.generation, prev.page_index
                );
            }
        }
        if reset {
            self.emit(UiEvent::page(
                ui_events::FEED_RESET,
                ticket.generation,
                ticket.page_index,
            ));
        }
        debug!(
            "fetching page {} for {} (skip={}, limit={})",
            ticket.page_index, ticket.spec, ticket.params.skip, ticket.params.limit
        );

        let generation = ticket.generation;
        let page_index = ticket.page_index;
        let api = self.api.clone();
        let done_tx = self.done_tx.clone();
        let fetch_timeout = self.settings.fetch_timeout;
        let join = tokio::spawn(async move {
            let result = match fetch_timeout {
                Some(limit) => tokio::time::timeout(limit, api.list(&ticket.params))
                    .await
                    .unwrap_or(Err(SyncError::Timeout(limit))),
                None => api.list(&ticket.params).await,
            };
            let _ = done_tx.send(FetchDone { ticket, result });
        });
        self.running = Some(Running {
            generation,
            page_index,
            abort: join.abort_handle(),
        });
    }

    fn emit(&self, ev: UiEvent) {
        let _ = self.events.send(ev);
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.controller.snapshot());
    }
}
