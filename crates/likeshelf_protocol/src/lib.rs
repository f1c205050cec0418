/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: i64,
    pub name: String,
}

/// Display-only fields of a bookmarked post. The feed engine never looks inside.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ItemPayload {
    #[serde(default)]
    pub tweet_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_screen_name: Option<String>,
    #[serde(default)]
    pub author_avatar_url: Option<String>,
    #[serde(default)]
    pub media_urls: Option<Vec<String>>,
    #[serde(default)]
    pub favorite_count: Option<i64>,
    #[serde(default)]
    pub embed_html: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub url: String,
    #[serde(default)]
    pub folder_id: Option<i64>,
    #[serde(default)]
    pub folder: Option<Folder>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub created_at: String,
    #[serde(default)]
    pub posted_at: Option<String>,
    #[serde(flatten)]
    pub payload: ItemPayload,
}

impl Item {
    pub fn tag_names(&self) -> BTreeSet<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    /// Ordering key used by the remote: posting time when known, else creation time.
    pub fn ordering_key(&self) -> &str {
        self.posted_at.as_deref().unwrap_or(&self.created_at)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ItemCreate {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TagsUpdate {
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn from_str(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "oldest" => Some(Self::Asc),
            "desc" | "descending" | "newest" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Query string of `GET /posts/`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub skip: u64,
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_names: Option<String>,
    pub sort_order: SortDirection,
}
