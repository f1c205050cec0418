/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Filter and sort criteria of a feed.
//!
//! Tags are kept in a `BTreeSet`, so two specs built from the same names in a
//! different order compare equal and serialize to the same query string. The
//! remote applies AND semantics across the selected tags.

use likeshelf_protocol::SortDirection;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QuerySpec {
    selected_tags: BTreeSet<String>,
    sort: SortDirection,
}

/// Spec-derived part of the list query; the cursor supplies skip/limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub tag_names: Option<String>,
    pub sort_order: SortDirection,
}

impl QuerySpec {
    pub fn new<I, S>(tags: I, sort: SortDirection) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected_tags = tags
            .into_iter()
            .filter_map(|t| normalize_tag(t.as_ref()))
            .collect();
        Self { selected_tags, sort }
    }

    /// Parses the comma list used in links (`?tags=a,b`).
    pub fn from_tag_list(list: &str, sort: SortDirection) -> Self {
        Self::new(list.split(','), sort)
    }

    pub fn selected_tags(&self) -> &BTreeSet<String> {
        &self.selected_tags
    }

    pub fn sort(&self) -> SortDirection {
        self.sort
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected_tags.contains(name.trim())
    }

    /// Adds the tag if absent, removes it if present. Names the remote cannot
    /// express as a filter (blank, or containing a comma) leave the spec unchanged.
    pub fn toggle_tag(&self, name: &str) -> Self {
        let mut next = self.clone();
        let Some(name) = normalize_tag(name) else {
            return next;
        };
        if !next.selected_tags.remove(&name) {
            next.selected_tags.insert(name);
        }
        next
    }

    pub fn with_sort(&self, sort: SortDirection) -> Self {
        Self {
            selected_tags: self.selected_tags.clone(),
            sort,
        }
    }

    pub fn cleared(&self) -> Self {
        Self {
            selected_tags: BTreeSet::new(),
            sort: self.sort,
        }
    }

    pub fn to_params(&self) -> QueryParams {
        let tag_names = if self.selected_tags.is_empty() {
            None
        } else {
            Some(self.selected_tags.iter().map(String::as_str).collect::<Vec<_>>().join(","))
        };
        QueryParams {
            tag_names,
            sort_order: self.sort,
        }
    }

    pub fn canonical_key(&self) -> String {
        let tags = self.to_params().tag_names.unwrap_or_default();
        format!("tags={tags};sort={}", self.sort.as_str())
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_key())
    }
}

fn normalize_tag(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() || name.contains(',') {
        return None;
    }
    Some(name.to_string())
}
