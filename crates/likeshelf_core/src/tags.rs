/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Editing the tag set of one item.
//!
//! Edits stay local until [`TagReconciler::save`], which submits the whole
//! working list. The item the remote returns is authoritative: it replaces the
//! detail copy and, through a [`FeedUpdater`], the matching entry of the feed.

use likeshelf_protocol::{Item, ItemId, Tag};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::CollectionApi;
use crate::error::SyncError;
use crate::feed_worker::FeedUpdater;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TagEditor {
    item_id: ItemId,
    original: BTreeSet<String>,
    working: Vec<String>,
    saving: bool,
    last_error: Option<String>,
}

impl TagEditor {
    pub fn from_item(item: &Item) -> Self {
        let mut editor = Self {
            item_id: item.id,
            original: BTreeSet::new(),
            working: Vec::new(),
            saving: false,
            last_error: None,
        };
        editor.reseed(item);
        editor
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Tags in the order the user sees them.
    pub fn working(&self) -> &[String] {
        &self.working
    }

    pub fn original(&self) -> &BTreeSet<String> {
        &self.original
    }

    pub fn contains(&self, name: &str) -> bool {
        self.working.iter().any(|t| t == name.trim())
    }

    pub fn add(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return false;
        }
        self.working.push(name.to_string());
        true
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.working.len();
        self.working.retain(|t| t != name.trim());
        self.working.len() != before
    }

    /// Vocabulary entries not already on the item.
    pub fn suggestions<'a>(&self, vocabulary: &'a [Tag]) -> Vec<&'a Tag> {
        vocabulary.iter().filter(|t| !self.contains(&t.name)).collect()
    }

    pub fn diff(&self) -> TagDiff {
        let working: BTreeSet<&str> = self.working.iter().map(String::as_str).collect();
        TagDiff {
            added: working
                .iter()
                .filter(|t| !self.original.contains(**t))
                .map(|t| t.to_string())
                .collect(),
            removed: self
                .original
                .iter()
                .filter(|t| !working.contains(t.as_str()))
                .cloned()
                .collect(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.diff().is_empty()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn reseed(&mut self, item: &Item) {
        self.original = item.tag_names();
        self.working.clear();
        for t in &item.tags {
            if !self.working.contains(&t.name) {
                self.working.push(t.name.clone());
            }
        }
        self.last_error = None;
    }
}

pub struct TagReconciler {
    api: Arc<dyn CollectionApi>,
    feed: Option<FeedUpdater>,
}

impl TagReconciler {
    pub fn new(api: Arc<dyn CollectionApi>) -> Self {
        Self { api, feed: None }
    }

    /// Also push confirmed items into a running feed.
    pub fn with_feed(mut self, feed: FeedUpdater) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Fetches one item for a detail view and prepares its editor.
    pub async fn load_detail(&self, id: ItemId) -> Result<(Item, TagEditor), SyncError> {
        let item = self.api.get(id).await?;
        let editor = TagEditor::from_item(&item);
        Ok((item, editor))
    }

    /// Submits the working list as the item's complete tag set.
    ///
    /// On failure nothing but the editor's error changes, so the user's edits
    /// can be saved again.
    pub async fn save(
        &self,
        editor: &mut TagEditor,
        detail: Option<&mut Item>,
    ) -> Result<Item, SyncError> {
        editor.saving = true;
        let submitted = editor.working.clone();
        let result = self.api.update_tags(editor.item_id, &submitted).await;
        editor.saving = false;

        let item = match result {
            Ok(item) if item.id == editor.item_id => item,
            Ok(other) => {
                let e = SyncError::Decode(format!(
                    "update of item {} returned item {}",
                    editor.item_id, other.id
                ));
                return Err(record_failure(editor, e));
            }
            Err(e) => return Err(record_failure(editor, e)),
        };

        editor.reseed(&item);
        if let Some(d) = detail {
            *d = item.clone();
        }
        if let Some(feed) = &self.feed {
            feed.replace_item(item.clone());
        }
        info!("tags of item {} saved: {:?}", item.id, editor.working);
        Ok(item)
    }
}

fn record_failure(editor: &mut TagEditor, e: SyncError) -> SyncError {
    warn!("saving tags of item {} failed: {e}", editor.item_id);
    editor.last_error = Some(e.to_string());
    e
}
