/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use likeshelf_protocol::{Item, ItemId};
use std::collections::HashSet;

/// Keeps `existing` as is and appends the incoming items whose id is not yet
/// present, in their incoming order. Offset pagination can shift items across
/// page boundaries when the remote gains new entries, so a continuation page
/// may repeat items already shown.
pub fn merge(existing: &[Item], incoming: Vec<Item>) -> Vec<Item> {
    let mut out = existing.to_vec();
    merge_into(&mut out, incoming);
    out
}

/// In-place form of [`merge`]. Returns how many items were appended.
pub fn merge_into(existing: &mut Vec<Item>, incoming: Vec<Item>) -> usize {
    let mut seen: HashSet<ItemId> = existing.iter().map(|i| i.id).collect();
    let before = existing.len();
    for item in incoming {
        if seen.insert(item.id) {
            existing.push(item);
        }
    }
    existing.len() - before
}
