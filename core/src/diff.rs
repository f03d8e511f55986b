// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

/// Work computed from the remote and local etag sets of one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EtagDiff {
    /// Remote `etag -> href` pairs missing locally.
    pub to_fetch: BTreeMap<String, String>,

    /// Local `etag -> uri` pairs missing remotely.
    pub to_delete: BTreeMap<String, String>,
}

impl EtagDiff {
    pub fn is_empty(&self) -> bool {
        self.to_fetch.is_empty() && self.to_delete.is_empty()
    }
}

/// Diffs two etag maps by etag value.
///
/// An object that moved but kept its etag is unchanged. An edited object carries a new etag, so
/// its old row lands in `to_delete` and its new content in `to_fetch`. Both maps must belong to
/// the same connection.
pub fn diff_etags(remote: &BTreeMap<String, String>, local: &BTreeMap<String, String>) -> EtagDiff {
    let to_fetch = remote
        .iter()
        .filter(|(etag, _)| !local.contains_key(*etag))
        .map(|(etag, href)| (etag.clone(), href.clone()))
        .collect();

    let to_delete = local
        .iter()
        .filter(|(etag, _)| !remote.contains_key(*etag))
        .map(|(etag, uri)| (etag.clone(), uri.clone()))
        .collect();

    EtagDiff {
        to_fetch,
        to_delete,
    }
}
